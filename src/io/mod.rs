// src/io/mod.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::{fs, fs::File, path::Path};
use tracing::{debug, info, warn};

pub mod dates;

/// Create `path` and any missing parents. A no-op when it already exists.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).with_context(|| format!("creating directory {}", path.display()))
}

/// Read a headed CSV file into a [`DataFrame`].
///
/// Column types are inferred over the whole file. Every column named in
/// `parse_dates` is converted to a `Date` column; values that do not parse
/// become null rather than failing the read. A named date column that is not
/// in the file is skipped with a warning.
///
/// A missing file or malformed CSV is returned as an error.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_tabular(path: impl AsRef<Path>, parse_dates: &[&str]) -> Result<DataFrame> {
    let path = path.as_ref();
    info!("Loading CSV from {}", path.display());

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("opening CSV {}", path.display()))?
        .finish()
        .with_context(|| format!("parsing CSV {}", path.display()))?;

    for &name in parse_dates {
        if !has_columns(&df, &[name]) {
            warn!(column = name, "date column not present; left unparsed");
            continue;
        }
        parse_date_column(&mut df, name)?;
    }

    debug!(rows = df.height(), columns = df.width(), "table loaded");
    Ok(df)
}

/// Write `df` to `path` as CSV with a header row and no index column,
/// creating the parent directory first.
pub fn write_tabular(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    info!("Writing CSV to {}", path.display());
    let mut file =
        File::create(path).with_context(|| format!("creating CSV file {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("writing CSV {}", path.display()))?;
    Ok(())
}

/// Replace the column `name` with a `Date` column; unparseable values become null.
fn parse_date_column(df: &mut DataFrame, name: &str) -> Result<()> {
    let raw = df.column(name)?.cast(&DataType::String)?;
    let present = raw.len() - raw.null_count();

    let days: Vec<Option<i32>> = raw
        .str()?
        .into_iter()
        .map(|v| v.and_then(dates::parse_date).map(dates::days_since_epoch))
        .collect();

    let parsed = days.iter().filter(|d| d.is_some()).count();
    if parsed < present {
        warn!(
            column = name,
            unparsed = present - parsed,
            "unparseable date values set to missing"
        );
    }

    let parsed_col = Series::new(name.into(), days)
        .cast(&DataType::Date)
        .with_context(|| format!("casting {} to Date", name))?;
    df.with_column(parsed_col)?;
    Ok(())
}

/// True when every name in `names` is a column of `df`.
pub fn has_columns(df: &DataFrame, names: &[&str]) -> bool {
    names.iter().all(|name| df.column(name).is_ok())
}

/// Column `name` as floats. Values that cannot be cast are `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(name)?
        .cast(&DataType::Float64)
        .with_context(|| format!("casting {} to Float64", name))?;
    Ok(col.f64()?.into_iter().collect())
}

/// Column `name` rendered as strings, the representation group keys are compared in.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let col = df
        .column(name)?
        .cast(&DataType::String)
        .with_context(|| format!("casting {} to String", name))?;
    Ok(col
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

/// Column `name` as dates, whether it was parsed on read or is still text.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let col = df
        .column(name)?
        .cast(&DataType::String)
        .with_context(|| format!("casting {} to String", name))?;
    Ok(col
        .str()?
        .into_iter()
        .map(|v| v.and_then(dates::parse_date))
        .collect())
}

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

use crate::columns::{LOSS_RATIO, PROVINCE};
use crate::io::{self, dates};

/// Label used for rows whose province is missing.
pub const MISSING_PROVINCE: &str = "(missing)";

/// One bar of the loss-ratio-by-province chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvinceLossRatio {
    pub province: String,
    /// `None` when every loss ratio in the group is missing.
    pub mean_loss_ratio: Option<f64>,
    /// Rows with a non-missing loss ratio.
    pub count: u64,
}

/// Mean loss ratio and row count per province, highest mean first.
///
/// Missing provinces form their own group. NaN loss ratios count as missing.
/// Groups without any loss ratio sort last.
pub fn loss_ratio_by_province(df: &DataFrame) -> Result<Vec<ProvinceLossRatio>> {
    let loss_ratio = || {
        col(LOSS_RATIO)
            .cast(DataType::Float64)
            .fill_nan(lit(NULL))
    };
    let agg = df
        .clone()
        .lazy()
        .group_by([col(PROVINCE)])
        .agg([
            loss_ratio().mean().alias(LOSS_RATIO),
            loss_ratio().count().alias("n"),
        ])
        .sort(
            [LOSS_RATIO, PROVINCE],
            SortMultipleOptions::default()
                .with_order_descending_multi([true, false])
                .with_nulls_last(true),
        )
        .collect()
        .context("aggregating loss ratio by province")?;

    let provinces = io::string_values(&agg, PROVINCE)?;
    let means = io::f64_values(&agg, LOSS_RATIO)?;
    let counts = agg.column("n")?.cast(&DataType::Int64)?;
    let counts = counts.i64()?;

    Ok(provinces
        .into_iter()
        .zip(means)
        .zip(counts.into_iter())
        .map(|((province, mean), count)| ProvinceLossRatio {
            province: province.unwrap_or_else(|| MISSING_PROVINCE.to_string()),
            mean_loss_ratio: mean,
            count: count.unwrap_or(0).max(0) as u64,
        })
        .collect())
}

/// Histogram of claim amounts with log10-spaced bins.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimsHistogram {
    /// `counts.len() + 1` bin boundaries, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
    /// Non-missing values left out because they cannot sit on a log axis (zero, negative, non-finite).
    pub excluded: usize,
}

/// Bin the positive values of `values` into `bins` bins equally wide in log10 space.
///
/// Missing values are dropped; zero, negative and non-finite values are counted
/// in `excluded`. Returns `None` when no positive value is left.
pub fn claims_histogram(values: &[Option<f64>], bins: usize) -> Option<ClaimsHistogram> {
    let bins = bins.max(1);
    let mut excluded = 0;
    let positive: Vec<f64> = values
        .iter()
        .flatten()
        .filter_map(|&v| {
            if v.is_finite() && v > 0.0 {
                Some(v.log10())
            } else {
                excluded += 1;
                None
            }
        })
        .collect();

    let lo = positive.iter().copied().reduce(f64::min)?;
    let hi = positive.iter().copied().reduce(f64::max)?;
    // a single distinct value still gets a decade-wide axis
    let (lo, hi) = if hi - lo < 1e-12 {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0u64; bins];
    for v in &positive {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let edges = (0..=bins)
        .map(|i| 10f64.powf(lo + i as f64 * width))
        .collect();

    Some(ClaimsHistogram {
        edges,
        counts,
        excluded,
    })
}

/// Sum of claims for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyClaims {
    /// First day of the month.
    pub month: NaiveDate,
    pub total_claims: f64,
}

/// Calendar-month sums of `claims`, keyed by the month of `months`.
///
/// Rows without a date are excluded; missing claim amounts count as zero. Every
/// month from the first to the last observed one is returned, in order, with
/// empty months summing to zero.
pub fn monthly_claims(months: &[Option<NaiveDate>], claims: &[Option<f64>]) -> Vec<MonthlyClaims> {
    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (month, claim) in months.iter().zip(claims) {
        let Some(month) = month else { continue };
        let amount = claim.filter(|c| !c.is_nan()).unwrap_or(0.0);
        *sums.entry(dates::month_start(*month)).or_insert(0.0) += amount;
    }

    let (Some(&first), Some(&last)) = (sums.keys().next(), sums.keys().next_back()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut month = first;
    while month <= last {
        out.push(MonthlyClaims {
            month,
            total_claims: sums.get(&month).copied().unwrap_or(0.0),
        });
        month = dates::next_month(month);
    }
    out
}

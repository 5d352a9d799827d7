// src/eda/mod.rs
//! Descriptive figures for the claims table.
//!
//! Each generator checks for the columns it needs, logs a warning and returns
//! [`PlotOutcome::Skipped`] when one is missing, and otherwise writes exactly one
//! PNG to the path it was given.

pub mod aggregate;
pub mod render;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::columns::{LOSS_RATIO, PROVINCE, TOTAL_CLAIMS, TRANSACTION_MONTH};
use crate::io;

pub use aggregate::{ClaimsHistogram, MonthlyClaims, ProvinceLossRatio};
pub use render::PlotError;

pub const LOSS_RATIO_BY_PROVINCE_PNG: &str = "loss_ratio_by_province.png";
pub const TOTALCLAIMS_DISTRIBUTION_PNG: &str = "totalclaims_distribution.png";
pub const MONTHLY_CLAIMS_TREND_PNG: &str = "monthly_claims_trend.png";

/// Bin count of the TotalClaims histogram.
pub const HISTOGRAM_BINS: usize = 80;

/// Whether a generator wrote its figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotOutcome {
    Written,
    Skipped,
}

/// Horizontal bar chart of the mean loss ratio per province, highest first.
pub fn plot_loss_ratio_by_province(df: &DataFrame, outpath: &Path) -> Result<PlotOutcome> {
    if !io::has_columns(df, &[PROVINCE, LOSS_RATIO]) {
        warn!("Province or loss_ratio missing; skipping plot");
        return Ok(PlotOutcome::Skipped);
    }

    let groups = aggregate::loss_ratio_by_province(df)?;
    for g in &groups {
        debug!(province = %g.province, mean = ?g.mean_loss_ratio, n = g.count, "province group");
    }

    let bars: Vec<(String, f64)> = groups
        .into_iter()
        .filter_map(|g| match g.mean_loss_ratio {
            Some(mean) if mean.is_finite() => Some((g.province, mean)),
            other => {
                warn!(province = %g.province, mean = ?other, "province has no finite mean loss ratio; not drawn");
                None
            }
        })
        .collect();
    if bars.is_empty() {
        warn!("no province has a usable loss ratio; skipping plot");
        return Ok(PlotOutcome::Skipped);
    }

    render::horizontal_bar_chart(
        &bars,
        "Loss Ratio by Province",
        "Average Loss Ratio (TotalClaims / TotalPremium)",
        outpath,
    )
    .with_context(|| format!("rendering {}", outpath.display()))?;
    info!("Saved plot to {}", outpath.display());
    Ok(PlotOutcome::Written)
}

/// Histogram of TotalClaims over 80 log-spaced bins.
///
/// Zero and negative claims cannot be placed on the log axis and are left out.
pub fn plot_totalclaims_distribution(df: &DataFrame, outpath: &Path) -> Result<PlotOutcome> {
    if !io::has_columns(df, &[TOTAL_CLAIMS]) {
        warn!("TotalClaims missing; skipping plot");
        return Ok(PlotOutcome::Skipped);
    }

    let values = io::f64_values(df, TOTAL_CLAIMS)?;
    let Some(hist) = aggregate::claims_histogram(&values, HISTOGRAM_BINS) else {
        warn!("TotalClaims has no positive values; skipping plot");
        return Ok(PlotOutcome::Skipped);
    };
    if hist.excluded > 0 {
        info!(
            excluded = hist.excluded,
            "non-positive TotalClaims left out of the log-scale histogram"
        );
    }

    render::log_histogram(
        &hist.edges,
        &hist.counts,
        "Distribution of TotalClaims",
        "TotalClaims (log scale on x)",
        outpath,
    )
    .with_context(|| format!("rendering {}", outpath.display()))?;
    info!("Saved plot to {}", outpath.display());
    Ok(PlotOutcome::Written)
}

/// Line chart of TotalClaims summed per calendar month of TransactionMonth.
pub fn plot_monthly_claims_trend(df: &DataFrame, outpath: &Path) -> Result<PlotOutcome> {
    if !io::has_columns(df, &[TRANSACTION_MONTH, TOTAL_CLAIMS]) {
        warn!("TransactionMonth or TotalClaims missing; skipping plot");
        return Ok(PlotOutcome::Skipped);
    }

    let months = io::date_values(df, TRANSACTION_MONTH)?;
    let undated = months.iter().filter(|m| m.is_none()).count();
    if undated > 0 {
        warn!(rows = undated, "rows without a valid TransactionMonth excluded");
    }
    let claims = io::f64_values(df, TOTAL_CLAIMS)?;

    let monthly = aggregate::monthly_claims(&months, &claims);
    if monthly.is_empty() {
        warn!("no row has a valid TransactionMonth; skipping plot");
        return Ok(PlotOutcome::Skipped);
    }

    let points: Vec<(String, f64)> = monthly
        .iter()
        .map(|m| (m.month.format("%Y-%m").to_string(), m.total_claims))
        .collect();
    render::line_chart_with_markers(&points, "Monthly Total Claims", "TotalClaims", outpath)
        .with_context(|| format!("rendering {}", outpath.display()))?;
    info!("Saved plot to {}", outpath.display());
    Ok(PlotOutcome::Written)
}

/// Run all three generators into `outdir`, creating it first.
pub fn run_eda(df: &DataFrame, outdir: &Path) -> Result<()> {
    io::ensure_dir(outdir)?;
    plot_loss_ratio_by_province(df, &outdir.join(LOSS_RATIO_BY_PROVINCE_PNG))?;
    plot_totalclaims_distribution(df, &outdir.join(TOTALCLAIMS_DISTRIBUTION_PNG))?;
    plot_monthly_claims_trend(df, &outdir.join(MONTHLY_CLAIMS_TREND_PNG))?;
    info!("EDA done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture_logs;
    use polars::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn province_plot_skips_without_columns() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join(LOSS_RATIO_BY_PROVINCE_PNG);
        let df = df!("Province" => ["Gauteng", "Limpopo"])?;

        let (outcome, logs) = capture_logs(|| plot_loss_ratio_by_province(&df, &out));
        assert_eq!(outcome?, PlotOutcome::Skipped);
        assert!(!out.exists());
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("Province or loss_ratio missing; skipping plot"), "{logs}");
        Ok(())
    }

    #[test]
    fn distribution_plot_skips_without_positive_claims() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join(TOTALCLAIMS_DISTRIBUTION_PNG);
        let df = df!("TotalClaims" => [0.0, 0.0, 0.0])?;

        let (outcome, logs) = capture_logs(|| plot_totalclaims_distribution(&df, &out));
        assert_eq!(outcome?, PlotOutcome::Skipped);
        assert!(!out.exists());
        assert!(logs.contains("TotalClaims has no positive values; skipping plot"), "{logs}");
        Ok(())
    }

    #[test]
    fn trend_plot_skips_without_dates() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join(MONTHLY_CLAIMS_TREND_PNG);
        let df = df!(
            "TransactionMonth" => ["n/a", "unknown"],
            "TotalClaims" => [1.0, 2.0],
        )?;

        let (outcome, logs) = capture_logs(|| plot_monthly_claims_trend(&df, &out));
        assert_eq!(outcome?, PlotOutcome::Skipped);
        assert!(!out.exists());
        assert!(logs.contains("no row has a valid TransactionMonth; skipping plot"), "{logs}");
        Ok(())
    }

    #[test]
    fn trend_plot_skips_without_columns() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let out = tmp.path().join(MONTHLY_CLAIMS_TREND_PNG);
        let df = df!("TotalClaims" => [1.0, 2.0])?;

        let (outcome, logs) = capture_logs(|| plot_monthly_claims_trend(&df, &out));
        assert_eq!(outcome?, PlotOutcome::Skipped);
        assert!(logs.contains("TransactionMonth or TotalClaims missing; skipping plot"), "{logs}");
        Ok(())
    }
}

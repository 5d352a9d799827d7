// src/hypothesis/mod.rs
//! Group-wise hypothesis tests over the claims table.
//!
//! The statistical cores (`anova`, `chi_square`, `welch`, `tukey`) work on
//! plain slices and return [`HypothesisError`]. The functions in this module
//! pull the columns they need out of a [`DataFrame`] and hand them over.

pub mod anova;
pub mod chi_square;
pub mod studentized_range;
pub mod tukey;
pub mod welch;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;
use std::{collections::BTreeMap, str::FromStr};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::columns::{HAS_CLAIM, LOSS_RATIO, PROVINCE, TOTAL_CLAIMS};
use crate::io;

pub use anova::{one_way_anova, Anova};
pub use chi_square::{chi2_contingency, ChiSquare, ContingencyTable};
pub use tukey::{tukey_hsd, PairComparison, TukeyHsd};
pub use welch::{welch_t_test, Welch};

/// Significance level used when none is given.
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Error, Debug)]
pub enum HypothesisError {
    #[error("need at least two non-empty groups, got {0}")]
    NotEnoughGroups(usize),

    #[error("group '{group}' has {n} observations, at least {min} required")]
    TooFewObservations { group: String, n: usize, min: usize },

    #[error("no residual degrees of freedom: every group has a single observation")]
    NoDegreesOfFreedom,

    #[error("{df} residual degrees of freedom, at least {min} required")]
    TooFewDegreesOfFreedom { df: usize, min: usize },

    #[error("contingency table is empty")]
    EmptyTable,

    #[error("contingency table has a zero expected frequency at row {row}, column {col}")]
    ZeroExpected { row: usize, col: usize },

    #[error("invalid comparison '{0}', expected COLUMN=A,B")]
    InvalidComparison(String),

    #[error("reference distribution: {0}")]
    Distribution(#[from] statrs::StatsError),
}

/// Statistic and p-value of one test, as printed in the results mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    #[serde(rename = "p")]
    pub p_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dof: Option<f64>,
}

/// Test name to outcome, in name order.
pub type TestResults = BTreeMap<String, TestOutcome>;

/// A two-group comparison request, written `COLUMN=A,B` on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupComparison {
    pub column: String,
    pub group_a: String,
    pub group_b: String,
}

impl GroupComparison {
    /// Key of this comparison in the results mapping.
    pub fn result_key(&self) -> String {
        format!("ttest_{}_{}_vs_{}", self.column, self.group_a, self.group_b)
    }
}

impl FromStr for GroupComparison {
    type Err = HypothesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HypothesisError::InvalidComparison(s.to_string());
        let (column, groups) = s.split_once('=').ok_or_else(invalid)?;
        let (a, b) = groups.split_once(',').ok_or_else(invalid)?;
        let (column, a, b) = (column.trim(), a.trim(), b.trim());
        if column.is_empty() || a.is_empty() || b.is_empty() || b.contains(',') {
            return Err(invalid());
        }
        Ok(Self {
            column: column.to_string(),
            group_a: a.to_string(),
            group_b: b.to_string(),
        })
    }
}

/// Which tests [`run_all_tests`] runs beyond the province ANOVA.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlan {
    /// Significance level for the ANOVA gate on Tukey HSD and the HSD itself.
    pub alpha: f64,
    /// Columns to test for claim-frequency association against `has_claim`.
    pub frequency_by: Vec<String>,
    /// Welch comparisons of `value_column` between two groups.
    pub comparisons: Vec<GroupComparison>,
    pub value_column: String,
}

impl Default for TestPlan {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            frequency_by: Vec::new(),
            comparisons: Vec::new(),
            value_column: LOSS_RATIO.to_string(),
        }
    }
}

/// Add the boolean `has_claim` column (`TotalClaims > 0`, missing counted as 0).
///
/// Returns `false` and leaves `df` alone when `TotalClaims` is absent.
pub fn add_claim_indicator(df: &mut DataFrame) -> Result<bool> {
    if !io::has_columns(df, &[TOTAL_CLAIMS]) {
        return Ok(false);
    }
    let has_claim: Vec<bool> = io::f64_values(df, TOTAL_CLAIMS)?
        .into_iter()
        .map(|v| v.unwrap_or(0.0) > 0.0)
        .collect();
    df.with_column(Series::new(HAS_CLAIM.into(), has_claim))
        .context("adding has_claim column")?;
    Ok(true)
}

/// Non-missing values of `value_col` per non-missing key of `group_col`,
/// keys compared as strings. A key whose values are all missing maps to an
/// empty vector.
pub fn grouped_values(
    df: &DataFrame,
    group_col: &str,
    value_col: &str,
) -> Result<BTreeMap<String, Vec<f64>>> {
    let keys = io::string_values(df, group_col)?;
    let values = io::f64_values(df, value_col)?;

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (key, value) in keys.into_iter().zip(values) {
        let Some(key) = key else { continue };
        let bucket = groups.entry(key).or_default();
        if let Some(v) = value.filter(|v| !v.is_nan()) {
            bucket.push(v);
        }
    }
    Ok(groups)
}

/// One-way ANOVA of `value_col` across the groups of `group_col`.
#[tracing::instrument(level = "debug", skip(df))]
pub fn anova_test(df: &DataFrame, group_col: &str, value_col: &str) -> Result<Anova> {
    let groups = grouped_values(df, group_col, value_col)?;
    for (key, values) in &groups {
        debug!(group = %key, n = values.len(), "partition");
    }
    let groups: Vec<Vec<f64>> = groups.into_values().collect();
    Ok(one_way_anova(&groups)?)
}

/// Chi-square independence test of `group_col` against the binary `event_col`.
/// Rows missing either value are left out.
#[tracing::instrument(level = "debug", skip(df))]
pub fn chi2_test_frequency(df: &DataFrame, group_col: &str, event_col: &str) -> Result<ChiSquare> {
    let groups = io::string_values(df, group_col)?;
    let events = io::string_values(df, event_col)?;
    let table = ContingencyTable::from_pairs(
        groups
            .into_iter()
            .zip(events)
            .filter_map(|(g, e)| Some((g?, e?))),
    );
    debug!(
        rows = table.row_labels.len(),
        cols = table.col_labels.len(),
        total = table.total(),
        "contingency table"
    );
    Ok(chi2_contingency(&table)?)
}

/// Welch t-test of `value_col` between the rows whose `group_col` equals
/// `group_a` and those equal to `group_b`.
#[tracing::instrument(level = "debug", skip(df))]
pub fn compare_two_groups_ttest(
    df: &DataFrame,
    group_col: &str,
    value_col: &str,
    group_a: &str,
    group_b: &str,
) -> Result<Welch> {
    let mut groups = grouped_values(df, group_col, value_col)?;
    let a = groups.remove(group_a).unwrap_or_default();
    let b = groups.remove(group_b).unwrap_or_default();
    welch_t_test(&a, &b).with_context(|| {
        format!(
            "{} '{}' ({} values) vs '{}' ({} values)",
            group_col,
            group_a,
            a.len(),
            group_b,
            b.len()
        )
    })
}

/// Turn a statistical precondition failure into a logged skip.
fn skip_untestable<T>(name: &str, res: Result<T>) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.downcast_ref::<HypothesisError>().is_some() => {
            warn!("{} skipped: {:#}", name, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run every test the table supports.
///
/// The province ANOVA of `loss_ratio` runs whenever both columns exist; when
/// its p-value is below `plan.alpha` a Tukey HSD across provinces is logged.
/// Frequency and two-group requests in `plan` run only if their columns exist.
pub fn run_all_tests(df: &DataFrame, plan: &TestPlan) -> Result<TestResults> {
    let mut results = TestResults::new();

    if io::has_columns(df, &[PROVINCE, LOSS_RATIO]) {
        let res = anova_test(df, PROVINCE, LOSS_RATIO);
        if let Some(anova) = skip_untestable("province_anova", res)? {
            results.insert(
                "province_anova".to_string(),
                TestOutcome {
                    statistic: anova.f_statistic,
                    p_value: anova.p_value,
                    dof: None,
                },
            );
            info!("Province ANOVA p-value: {:.4}", anova.p_value);

            if anova.p_value < plan.alpha {
                let res = province_tukey(df, plan.alpha);
                if let Some(tukey) = skip_untestable("province_tukey", res)? {
                    info!("\n{}", tukey.summary());
                    for pair in tukey.rejected() {
                        info!(
                            "Mean loss ratio differs between {} and {} (p-adj {:.4})",
                            pair.group1, pair.group2, pair.p_adj
                        );
                    }
                }
            }
        }
    } else {
        warn!("Province or loss_ratio missing; skipping province ANOVA");
    }

    for col in &plan.frequency_by {
        if !io::has_columns(df, &[col.as_str(), HAS_CLAIM]) {
            warn!("{} or {} missing; skipping frequency test", col, HAS_CLAIM);
            continue;
        }
        let key = format!("frequency_{}", col);
        if let Some(chi) = skip_untestable(&key, chi2_test_frequency(df, col, HAS_CLAIM))? {
            info!("{} p-value: {:.4}", key, chi.p_value);
            results.insert(
                key,
                TestOutcome {
                    statistic: chi.statistic,
                    p_value: chi.p_value,
                    dof: Some(chi.dof as f64),
                },
            );
        }
    }

    for cmp in &plan.comparisons {
        if !io::has_columns(df, &[cmp.column.as_str(), plan.value_column.as_str()]) {
            warn!(
                "{} or {} missing; skipping comparison",
                cmp.column, plan.value_column
            );
            continue;
        }
        let key = cmp.result_key();
        let res = compare_two_groups_ttest(
            df,
            &cmp.column,
            &plan.value_column,
            &cmp.group_a,
            &cmp.group_b,
        );
        if let Some(welch) = skip_untestable(&key, res)? {
            info!("{} p-value: {:.4}", key, welch.p_value);
            results.insert(
                key,
                TestOutcome {
                    statistic: welch.t_statistic,
                    p_value: welch.p_value,
                    dof: Some(welch.df),
                },
            );
        }
    }

    Ok(results)
}

/// Tukey HSD of `loss_ratio` by province over the rows that have both.
fn province_tukey(df: &DataFrame, alpha: f64) -> Result<TukeyHsd> {
    let (values, labels): (Vec<f64>, Vec<String>) = grouped_values(df, PROVINCE, LOSS_RATIO)?
        .into_iter()
        .flat_map(|(province, vs)| vs.into_iter().map(move |v| (v, province.clone())))
        .unzip();
    Ok(tukey_hsd(&values, &labels, alpha)?)
}

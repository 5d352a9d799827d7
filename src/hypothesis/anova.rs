use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use super::HypothesisError;

/// One-way analysis of variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anova {
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_between: f64,
    pub df_within: f64,
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of squared deviations from the mean.
pub(crate) fn sum_sq_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum()
}

/// F test that every group shares one mean. Empty groups are ignored.
///
/// When the groups have no spread at all the statistic is infinite (distinct
/// means, p = 0) or undefined (identical means, `NaN`).
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<Anova, HypothesisError> {
    let groups: Vec<&[f64]> = groups
        .iter()
        .filter(|g| !g.is_empty())
        .map(Vec::as_slice)
        .collect();
    let k = groups.len();
    if k < 2 {
        return Err(HypothesisError::NotEnoughGroups(k));
    }

    let n: usize = groups.iter().map(|g| g.len()).sum();
    if n <= k {
        return Err(HypothesisError::NoDegreesOfFreedom);
    }
    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;

    let ss_between: f64 = groups
        .iter()
        .map(|g| g.len() as f64 * (mean(g) - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups.iter().map(|g| sum_sq_dev(g)).sum();

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    let ms_between = ss_between / df_between;
    let ms_within = ss_within / df_within;

    let (f_statistic, p_value) = if ms_within == 0.0 {
        if ms_between == 0.0 {
            (f64::NAN, f64::NAN)
        } else {
            (f64::INFINITY, 0.0)
        }
    } else {
        let f = ms_between / ms_within;
        (f, FisherSnedecor::new(df_between, df_within)?.sf(f))
    };

    Ok(Anova {
        f_statistic,
        p_value,
        df_between,
        df_within,
    })
}

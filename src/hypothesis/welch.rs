use statrs::distribution::{ContinuousCDF, StudentsT};

use super::anova::{mean, sum_sq_dev};
use super::HypothesisError;

/// Welch's unequal-variance two-sample t-test, two-sided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Welch {
    pub t_statistic: f64,
    pub p_value: f64,
    /// Welch-Satterthwaite degrees of freedom.
    pub df: f64,
}

fn check_len(name: &str, values: &[f64]) -> Result<(), HypothesisError> {
    if values.len() < 2 {
        return Err(HypothesisError::TooFewObservations {
            group: name.to_string(),
            n: values.len(),
            min: 2,
        });
    }
    Ok(())
}

/// Test whether `a` and `b` have the same mean without assuming equal variances.
///
/// The statistic is positive when `a` has the larger mean.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<Welch, HypothesisError> {
    check_len("a", a)?;
    check_len("b", b)?;

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let se_a = sum_sq_dev(a) / (na - 1.0) / na;
    let se_b = sum_sq_dev(b) / (nb - 1.0) / nb;
    let se2 = se_a + se_b;
    let diff = mean(a) - mean(b);

    if se2 == 0.0 {
        // both samples constant
        return Ok(if diff == 0.0 {
            Welch {
                t_statistic: f64::NAN,
                p_value: f64::NAN,
                df: f64::NAN,
            }
        } else {
            Welch {
                t_statistic: diff.signum() * f64::INFINITY,
                p_value: 0.0,
                df: f64::NAN,
            }
        });
    }

    let t_statistic = diff / se2.sqrt();
    let df = se2.powi(2) / (se_a.powi(2) / (na - 1.0) + se_b.powi(2) / (nb - 1.0));
    let p_value = (2.0 * StudentsT::new(0.0, 1.0, df)?.sf(t_statistic.abs())).min(1.0);

    Ok(Welch {
        t_statistic,
        p_value,
        df,
    })
}

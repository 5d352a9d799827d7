use prettytable::{format, Cell, Row, Table};
use std::{collections::BTreeMap, fmt};

use super::anova::{mean, sum_sq_dev};
use super::studentized_range::{ptukey, qtukey};
use super::HypothesisError;

const MIN_RESIDUAL_DF: usize = 2;

/// One row of a Tukey HSD result.
#[derive(Debug, Clone, PartialEq)]
pub struct PairComparison {
    pub group1: String,
    pub group2: String,
    /// Mean of `group2` minus mean of `group1`.
    pub mean_diff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// All pairwise comparisons of a Tukey honestly-significant-difference test.
#[derive(Debug, Clone, PartialEq)]
pub struct TukeyHsd {
    pub alpha: f64,
    /// Pairs in group order: (g0, g1), (g0, g2), ..., (g1, g2), ...
    pub comparisons: Vec<PairComparison>,
    /// Studentized range critical value at `1 - alpha`.
    pub q_crit: f64,
    pub df: f64,
}

/// Tukey HSD over `values` grouped by `labels`, family-wise error rate `alpha`.
///
/// Groups are ordered by label. The pooled within-group variance serves every
/// pair, so unequal group sizes are handled Tukey-Kramer style. The studentized
/// range needs at least two residual degrees of freedom.
pub fn tukey_hsd(values: &[f64], labels: &[String], alpha: f64) -> Result<TukeyHsd, HypothesisError> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (v, label) in values.iter().zip(labels) {
        groups.entry(label.as_str()).or_default().push(*v);
    }
    let k = groups.len();
    if k < 2 {
        return Err(HypothesisError::NotEnoughGroups(k));
    }

    let n: usize = groups.values().map(Vec::len).sum();
    if n <= k {
        return Err(HypothesisError::NoDegreesOfFreedom);
    }
    if n - k < MIN_RESIDUAL_DF {
        return Err(HypothesisError::TooFewDegreesOfFreedom {
            df: n - k,
            min: MIN_RESIDUAL_DF,
        });
    }
    let df = (n - k) as f64;
    let mse = groups.values().map(|g| sum_sq_dev(g)).sum::<f64>() / df;
    let q_crit = qtukey(1.0 - alpha, k as f64, df);

    let stats: Vec<(&str, f64, f64)> = groups
        .iter()
        .map(|(label, g)| (*label, mean(g), g.len() as f64))
        .collect();

    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for (i, &(label_i, mean_i, n_i)) in stats.iter().enumerate() {
        for &(label_j, mean_j, n_j) in &stats[i + 1..] {
            let mean_diff = mean_j - mean_i;
            let std_pair = (mse / 2.0 * (1.0 / n_i + 1.0 / n_j)).sqrt();
            let q = mean_diff.abs() / std_pair;
            let p_adj = (1.0 - ptukey(q, 1.0, k as f64, df)).clamp(0.0, 1.0);
            let half_width = q_crit * std_pair;

            comparisons.push(PairComparison {
                group1: label_i.to_string(),
                group2: label_j.to_string(),
                mean_diff,
                p_adj,
                lower: mean_diff - half_width,
                upper: mean_diff + half_width,
                reject: mean_diff.abs() > half_width,
            });
        }
    }

    Ok(TukeyHsd {
        alpha,
        comparisons,
        q_crit,
        df,
    })
}

impl TukeyHsd {
    /// Text table of every comparison under a
    /// `Multiple Comparison of Means - Tukey HSD, FWER=<alpha>` heading.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Comparisons whose interval excludes zero.
    pub fn rejected(&self) -> impl Iterator<Item = &PairComparison> {
        self.comparisons.iter().filter(|c| c.reject)
    }
}

impl fmt::Display for TukeyHsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(Row::new(
            ["group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"]
                .iter()
                .map(|h| Cell::new(h).style_spec("b"))
                .collect(),
        ));
        for c in &self.comparisons {
            table.add_row(Row::new(vec![
                Cell::new(&c.group1),
                Cell::new(&c.group2),
                Cell::new(&format!("{:.4}", c.mean_diff)).style_spec("r"),
                Cell::new(&format!("{:.4}", c.p_adj)).style_spec("r"),
                Cell::new(&format!("{:.4}", c.lower)).style_spec("r"),
                Cell::new(&format!("{:.4}", c.upper)).style_spec("r"),
                Cell::new(if c.reject { "True" } else { "False" }),
            ]));
        }

        writeln!(
            f,
            "Multiple Comparison of Means - Tukey HSD, FWER={:.2}",
            self.alpha
        )?;
        write!(f, "{}", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped(groups: &[(&str, &[f64])]) -> (Vec<f64>, Vec<String>) {
        groups
            .iter()
            .flat_map(|(label, vs)| vs.iter().map(move |v| (*v, label.to_string())))
            .unzip()
    }

    #[test]
    fn only_the_outlying_group_differs() {
        let (values, labels) = grouped(&[
            ("C", &[20.0, 21.0, 22.0, 21.0, 20.0]),
            ("A", &[10.0, 11.0, 12.0, 11.0, 10.0]),
            ("B", &[10.5, 11.5, 12.0, 10.5, 11.0]),
        ]);
        let res = tukey_hsd(&values, &labels, 0.05).unwrap();

        assert_eq!(res.df, 12.0);
        assert!((res.q_crit - 3.772_928_966).abs() < 1e-6);

        let pairs: Vec<(&str, &str, bool)> = res
            .comparisons
            .iter()
            .map(|c| (c.group1.as_str(), c.group2.as_str(), c.reject))
            .collect();
        assert_eq!(
            pairs,
            vec![("A", "B", false), ("A", "C", true), ("B", "C", true)]
        );

        let ab = &res.comparisons[0];
        assert!((ab.mean_diff - 0.3).abs() < 1e-12);
        assert!((ab.p_adj - 0.818_440_426_8).abs() < 1e-6);
        assert!((ab.lower + 1.016_025_891).abs() < 1e-6);
        assert!((ab.upper - 1.616_025_891).abs() < 1e-6);

        let ac = &res.comparisons[1];
        assert!((ac.mean_diff - 10.0).abs() < 1e-12);
        assert!(ac.p_adj < 1e-6);
        assert_eq!(res.rejected().count(), 2);
    }

    #[test]
    fn summary_lists_every_pair() {
        let (values, labels) = grouped(&[
            ("Gauteng", &[1.0, 1.2, 0.9]),
            ("Limpopo", &[0.4, 0.5, 0.6]),
        ]);
        let text = tukey_hsd(&values, &labels, 0.05).unwrap().summary();

        assert!(text.starts_with("Multiple Comparison of Means - Tukey HSD, FWER=0.05"));
        for header in ["group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"] {
            assert!(text.contains(header), "missing {header}");
        }
        assert!(text.contains("Gauteng") && text.contains("Limpopo"));
    }

    #[test]
    fn one_residual_degree_is_not_enough() {
        let (values, labels) = grouped(&[("A", &[1.0, 1.01]), ("B", &[5.0])]);
        let err = tukey_hsd(&values, &labels, 0.05).unwrap_err();
        assert!(matches!(
            err,
            HypothesisError::TooFewDegreesOfFreedom { df: 1, min: 2 }
        ));
    }

    #[test]
    fn one_group_is_not_enough() {
        let (values, labels) = grouped(&[("only", &[1.0, 2.0, 3.0])]);
        let err = tukey_hsd(&values, &labels, 0.05).unwrap_err();
        assert!(matches!(err, HypothesisError::NotEnoughGroups(1)));
    }
}

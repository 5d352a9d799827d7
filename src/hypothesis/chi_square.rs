use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;

use super::HypothesisError;

/// Cross-tabulated counts, rows and columns in label order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `counts[row][col]`.
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    /// Count every `(row, col)` pair. Labels are sorted.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cells: BTreeMap<(String, String), u64> = BTreeMap::new();
        for pair in pairs {
            *cells.entry(pair).or_insert(0) += 1;
        }

        let mut row_labels: Vec<String> = cells.keys().map(|(r, _)| r.clone()).collect();
        row_labels.dedup();
        let mut col_labels: Vec<String> = cells.keys().map(|(_, c)| c.clone()).collect();
        col_labels.sort();
        col_labels.dedup();

        let mut counts = vec![vec![0u64; col_labels.len()]; row_labels.len()];
        for ((r, c), n) in cells {
            // both labels came from these lists
            if let (Ok(i), Ok(j)) = (row_labels.binary_search(&r), col_labels.binary_search(&c)) {
                counts[i][j] = n;
            }
        }

        Self {
            row_labels,
            col_labels,
            counts,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

/// Pearson chi-square test of independence.
#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquare {
    pub statistic: f64,
    pub p_value: f64,
    pub dof: usize,
    /// Expected counts under independence, same shape as the table.
    pub expected: Vec<Vec<f64>>,
}

/// Chi-square test of independence on `table`.
///
/// With one degree of freedom Yates' continuity correction is applied: every
/// observed count moves half a unit towards its expectation, or all the way
/// when it is closer than that. A table with zero degrees of freedom has
/// statistic 0 and p-value 1.
pub fn chi2_contingency(table: &ContingencyTable) -> Result<ChiSquare, HypothesisError> {
    let rows = table.counts.len();
    let cols = table.col_labels.len();
    let total = table.total() as f64;
    if rows == 0 || cols == 0 || total == 0.0 {
        return Err(HypothesisError::EmptyTable);
    }

    let row_sums: Vec<f64> = table
        .counts
        .iter()
        .map(|r| r.iter().sum::<u64>() as f64)
        .collect();
    let col_sums: Vec<f64> = (0..cols)
        .map(|j| table.counts.iter().map(|r| r[j]).sum::<u64>() as f64)
        .collect();

    let expected: Vec<Vec<f64>> = row_sums
        .iter()
        .map(|r| col_sums.iter().map(|c| r * c / total).collect())
        .collect();
    for (i, row) in expected.iter().enumerate() {
        if let Some(j) = row.iter().position(|&e| e == 0.0) {
            return Err(HypothesisError::ZeroExpected { row: i, col: j });
        }
    }

    let dof = (rows - 1) * (cols - 1);
    if dof == 0 {
        return Ok(ChiSquare {
            statistic: 0.0,
            p_value: 1.0,
            dof,
            expected,
        });
    }

    let mut statistic = 0.0;
    for (obs_row, exp_row) in table.counts.iter().zip(&expected) {
        for (&obs, &exp) in obs_row.iter().zip(exp_row) {
            let mut obs = obs as f64;
            if dof == 1 {
                let diff = exp - obs;
                obs += diff.signum() * diff.abs().min(0.5);
            }
            statistic += (obs - exp).powi(2) / exp;
        }
    }
    let p_value = ChiSquared::new(dof as f64)?.sf(statistic);

    Ok(ChiSquare {
        statistic,
        p_value,
        dof,
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(counts: Vec<Vec<u64>>) -> ContingencyTable {
        ContingencyTable {
            row_labels: (0..counts.len()).map(|i| i.to_string()).collect(),
            col_labels: (0..counts[0].len()).map(|j| j.to_string()).collect(),
            counts,
        }
    }

    #[test]
    fn two_by_two_uses_yates() {
        let res = chi2_contingency(&table(vec![vec![10, 20], vec![20, 10]])).unwrap();
        assert_eq!(res.dof, 1);
        assert!((res.statistic - 5.4).abs() < 1e-12);
        assert!((res.p_value - 0.020_136_751_550_346_34).abs() < 1e-9);
        assert_eq!(res.expected, vec![vec![15.0, 15.0], vec![15.0, 15.0]]);
    }

    #[test]
    fn yates_never_overshoots_the_expectation() {
        // |obs - exp| is under 0.5 in every cell
        let res = chi2_contingency(&table(vec![vec![5, 5], vec![4, 5]])).unwrap();
        assert!(res.statistic < 1e-20);
        assert!((res.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn larger_tables_are_uncorrected() {
        let res = chi2_contingency(&table(vec![vec![10, 20], vec![20, 10], vec![15, 15]])).unwrap();
        assert_eq!(res.dof, 2);
        assert!((res.statistic - 20.0 / 3.0).abs() < 1e-12);
        assert!((res.p_value - 0.035_673_993_347_252_39).abs() < 1e-9);
    }

    #[test]
    fn single_column_has_no_freedom() {
        let res = chi2_contingency(&table(vec![vec![3], vec![7]])).unwrap();
        assert_eq!(res.dof, 0);
        assert_eq!(res.statistic, 0.0);
        assert_eq!(res.p_value, 1.0);
    }

    #[test]
    fn empty_margin_is_an_error() {
        let err = chi2_contingency(&table(vec![vec![0, 4], vec![0, 6]])).unwrap_err();
        assert!(matches!(err, HypothesisError::ZeroExpected { row: 0, col: 0 }));
    }

    #[test]
    fn from_pairs_counts_sorted_labels() {
        let pairs = [("b", "true"), ("a", "false"), ("b", "true"), ("a", "true")]
            .iter()
            .map(|(r, c)| (r.to_string(), c.to_string()));
        let t = ContingencyTable::from_pairs(pairs);
        assert_eq!(t.row_labels, vec!["a", "b"]);
        assert_eq!(t.col_labels, vec!["false", "true"]);
        assert_eq!(t.counts, vec![vec![1, 1], vec![0, 2]]);
        assert_eq!(t.total(), 4);
    }
}

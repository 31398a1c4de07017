//! Per-row admit/drop decisions for the body of the sheet.

use crate::error::{Result, SheetcastError};
use regex::Regex;

/// How multiple row-filter predicates combine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowFilterStrategy {
    /// A row passes when at least one filter column is non-blank.
    #[default]
    Or,
    /// A row passes only when every filter column is non-blank.
    And,
    /// One operator per adjacent predicate pair, folded left-to-right.
    /// Must contain exactly `predicates - 1` entries.
    PerPair(Vec<FilterOp>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    And,
    Or,
}

/// The row-gate: owns the compiled filters, the take limit, and the
/// keep-empty behavior. Filter regexes bind to concrete columns once the
/// header has been resolved; binding fails when a regex names no column.
#[derive(Debug)]
pub(crate) struct RowGate {
    filters: Vec<Regex>,
    strategy: RowFilterStrategy,
    /// Bound predicate columns, in sheet order. Empty until `bind`.
    predicate_cols: Vec<u32>,
    bound: bool,
    take_rows: Option<u64>,
    take_rows_non_empty: bool,
    admitted: u64,
}

impl RowGate {
    pub fn new(
        filters: &[String],
        strategy: RowFilterStrategy,
        take_rows: Option<u64>,
        take_rows_non_empty: bool,
    ) -> Result<Self> {
        let filters = filters
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| SheetcastError::config(format!("invalid row filter {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RowGate {
            filters,
            strategy,
            predicate_cols: Vec::new(),
            bound: false,
            take_rows,
            take_rows_non_empty,
            admitted: 0,
        })
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn is_bound(&self) -> bool {
        self.bound || self.filters.is_empty()
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Resolve each filter against the final column names. Every matched
    /// column becomes one predicate; predicates keep sheet order.
    pub fn bind(&mut self, columns: &[(u32, String)]) -> Result<()> {
        for filter in &self.filters {
            let mut matched = false;
            for (col, name) in columns {
                if filter.find(name).is_some_and(|m| m.start() == 0) {
                    matched = true;
                    if !self.predicate_cols.contains(col) {
                        self.predicate_cols.push(*col);
                    }
                }
            }
            if !matched {
                return Err(SheetcastError::config(format!(
                    "row filter {:?} matches no column name",
                    filter.as_str()
                )));
            }
        }
        self.predicate_cols.sort_unstable();

        if let RowFilterStrategy::PerPair(ops) = &self.strategy {
            let needed = self.predicate_cols.len().saturating_sub(1);
            if ops.len() != needed {
                return Err(SheetcastError::config(format!(
                    "row_filters_strategy needs {needed} operators for {} filter columns, got {}",
                    self.predicate_cols.len(),
                    ops.len()
                )));
            }
        }
        self.bound = true;
        Ok(())
    }

    /// Whether the take limit is already exhausted.
    pub fn exhausted(&self) -> bool {
        self.take_rows.is_some_and(|limit| self.admitted >= limit)
    }

    /// Decide the in-flight row. `nonblank_cols` lists columns that carried
    /// a non-blank cell this row, ascending.
    pub fn admit(&mut self, nonblank_cols: &[u32]) -> bool {
        if self.exhausted() {
            return false;
        }
        let verdict = if self.predicate_cols.is_empty() {
            !self.take_rows_non_empty || !nonblank_cols.is_empty()
        } else {
            let truths: Vec<bool> = self
                .predicate_cols
                .iter()
                .map(|col| nonblank_cols.binary_search(col).is_ok())
                .collect();
            match &self.strategy {
                RowFilterStrategy::Or => truths.iter().any(|&t| t),
                RowFilterStrategy::And => truths.iter().all(|&t| t),
                RowFilterStrategy::PerPair(ops) => {
                    let mut iter = truths.iter().copied();
                    let first = iter.next().unwrap_or(false);
                    ops.iter()
                        .zip(iter)
                        .fold(first, |acc, (op, t)| match op {
                            FilterOp::And => acc && t,
                            FilterOp::Or => acc || t,
                        })
                }
            }
        };
        if verdict {
            self.admitted += 1;
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(cols: &[(u32, &str)]) -> Vec<(u32, String)> {
        cols.iter().map(|(c, n)| (*c, (*n).to_owned())).collect()
    }

    #[test]
    fn default_gate_admits_everything() {
        let mut gate = RowGate::new(&[], RowFilterStrategy::Or, None, false).unwrap();
        assert!(gate.admit(&[]));
        assert!(gate.admit(&[0, 1]));
        assert_eq!(gate.admitted(), 2);
    }

    #[test]
    fn non_empty_gate_drops_blank_rows() {
        let mut gate = RowGate::new(&[], RowFilterStrategy::Or, None, true).unwrap();
        assert!(!gate.admit(&[]));
        assert!(gate.admit(&[2]));
        assert_eq!(gate.admitted(), 1);
    }

    #[test]
    fn take_limit_counts_admitted_rows() {
        let mut gate = RowGate::new(&[], RowFilterStrategy::Or, Some(2), true).unwrap();
        assert!(gate.admit(&[0]));
        assert!(!gate.admit(&[]));
        assert!(gate.admit(&[0]));
        assert!(gate.exhausted());
        assert!(!gate.admit(&[0]));
    }

    #[test]
    fn and_strategy_requires_all_filter_columns() {
        let mut gate =
            RowGate::new(&["^R".into(), "^C".into()], RowFilterStrategy::And, None, false)
                .unwrap();
        gate.bind(&named(&[(0, "R1"), (1, "C1"), (2, "other")]))
            .unwrap();
        assert!(gate.admit(&[0, 1]));
        assert!(!gate.admit(&[0]));
        assert!(!gate.admit(&[1, 2]));
        assert!(!gate.admit(&[2]));
    }

    #[test]
    fn or_strategy_requires_any_filter_column() {
        let mut gate =
            RowGate::new(&["^R".into(), "^C".into()], RowFilterStrategy::Or, None, false)
                .unwrap();
        gate.bind(&named(&[(0, "R1"), (1, "C1")])).unwrap();
        assert!(gate.admit(&[1]));
        assert!(!gate.admit(&[]));
    }

    #[test]
    fn filters_anchor_at_name_start() {
        let mut gate = RowGate::new(&["id".into()], RowFilterStrategy::Or, None, false).unwrap();
        let err = gate.bind(&named(&[(0, "uid")])).unwrap_err();
        assert!(matches!(err, SheetcastError::Config(_)));
    }

    #[test]
    fn unmatched_filter_is_config_error() {
        let mut gate = RowGate::new(&["^zz".into()], RowFilterStrategy::Or, None, false).unwrap();
        assert!(gate.bind(&named(&[(0, "id")])).is_err());
    }

    #[test]
    fn per_pair_strategy_folds_left_to_right() {
        let mut gate = RowGate::new(
            &["^a$".into(), "^b$".into(), "^c$".into()],
            RowFilterStrategy::PerPair(vec![FilterOp::Or, FilterOp::And]),
            None,
            false,
        )
        .unwrap();
        gate.bind(&named(&[(0, "a"), (1, "b"), (2, "c")])).unwrap();
        // (a | b) & c
        assert!(gate.admit(&[0, 2]));
        assert!(gate.admit(&[1, 2]));
        assert!(!gate.admit(&[0, 1]));
    }

    #[test]
    fn per_pair_length_mismatch_is_config_error() {
        let mut gate = RowGate::new(
            &["^a$".into(), "^b$".into()],
            RowFilterStrategy::PerPair(vec![]),
            None,
            false,
        )
        .unwrap();
        assert!(gate.bind(&named(&[(0, "a"), (1, "b")])).is_err());
    }
}

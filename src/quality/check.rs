//! Row-level quality detection
//!
//! Pure functions over an in-memory row sequence. Nothing here touches the
//! store, so the detection logic is testable on literal rows.
//!
//! Duplicate policy: a group of `k` identical rows counts as `k - 1`
//! duplicates. The first occurrence is the original; every later one is
//! reported. Inserting one more copy of an existing row therefore raises
//! `duplicate_count` by exactly one.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::value::{Row, Value};
use crate::{Error, Result};

/// Maximum offending identifiers kept per finding
pub const SAMPLE_LIMIT: usize = 20;

/// Additional per-value rules applied on top of duplicate/missing detection.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Non-null values must be numeric and inside `[min, max]`
    Range { column: String, min: f64, max: f64 },
    /// Non-null values must look like `YYYY-Fall` or `YYYY-Spring`
    TermFormat { column: String },
}

impl Rule {
    pub fn column(&self) -> &str {
        match self {
            Rule::Range { column, .. } | Rule::TermFormat { column } => column,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Rule::Range { min, max, .. } if *max == f64::MAX => format!(">= {}", min),
            Rule::Range { min, max, .. } => format!("within [{}, {}]", min, max),
            Rule::TermFormat { .. } => "term format YYYY-Fall|YYYY-Spring".to_string(),
        }
    }

    fn violated_by(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            Rule::Range { min, max, .. } => match value.as_f64() {
                Some(n) => n < *min || n > *max,
                None => true,
            },
            Rule::TermFormat { .. } => match value.as_str() {
                Some(s) => !term_pattern().is_match(s),
                None => true,
            },
        }
    }
}

fn term_pattern() -> &'static Regex {
    static TERM: OnceLock<Regex> = OnceLock::new();
    TERM.get_or_init(|| Regex::new(r"^\d{4}-(Fall|Spring)$").expect("static term pattern"))
}

#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Column used to name offending rows; defaults to the first column
    pub identifier: Option<String>,
    pub sample_limit: usize,
    pub rules: Vec<Rule>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            identifier: None,
            sample_limit: SAMPLE_LIMIT,
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub count: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub column: String,
    pub rule: String,
    pub count: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanCheck {
    pub column: String,
    pub parent: String,
    pub count: usize,
    pub samples: Vec<String>,
}

/// Findings for one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCheck {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub duplicate_count: usize,
    pub duplicate_groups: usize,
    pub duplicate_samples: Vec<String>,
    /// One entry per required column, in the order requested
    pub missing: Vec<ColumnMissing>,
    pub anomalies: Vec<Anomaly>,
    pub orphans: Vec<OrphanCheck>,
}

impl TableCheck {
    pub fn missing_value_count(&self, column: &str) -> Option<usize> {
        self.missing.iter().find(|m| m.column == column).map(|m| m.count)
    }

    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|m| m.count).sum()
    }

    pub fn total_anomalies(&self) -> usize {
        self.anomalies.iter().map(|a| a.count).sum()
    }

    pub fn total_orphans(&self) -> usize {
        self.orphans.iter().map(|o| o.count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.duplicate_count == 0
            && self.total_missing() == 0
            && self.total_anomalies() == 0
            && self.total_orphans() == 0
    }
}

/// Detect duplicates, missing required values and rule violations.
///
/// Rows are visited in the order given; samples are first-encountered and
/// capped at `options.sample_limit`. Required and rule columns must appear
/// in `columns`, else `ColumnNotFound`. An identifier column that is absent
/// falls back to the first column.
pub fn check_rows(
    table: &str,
    columns: &[String],
    rows: &[Row],
    required: &[&str],
    options: &CheckOptions,
) -> Result<TableCheck> {
    let position = |name: &str| -> Result<usize> {
        columns.iter().position(|c| c == name).ok_or_else(|| Error::ColumnNotFound {
            table: table.to_string(),
            column: name.to_string(),
        })
    };

    let required_idx = required
        .iter()
        .map(|name| position(name))
        .collect::<Result<Vec<_>>>()?;
    let rule_idx = options
        .rules
        .iter()
        .map(|rule| position(rule.column()))
        .collect::<Result<Vec<_>>>()?;
    let id_idx = match options.identifier.as_deref().and_then(|name| columns.iter().position(|c| c == name)) {
        Some(idx) => Some(idx),
        None if columns.is_empty() => None,
        None => Some(0),
    };

    let limit = options.sample_limit;
    let identify = |pos: usize, row: &Row| -> String {
        match id_idx.and_then(|i| row.get(i)) {
            Some(value) if !value.is_missing() => value.render(),
            _ => format!("row {}", pos + 1),
        }
    };

    // Duplicates
    let mut seen: HashMap<&Row, usize> = HashMap::with_capacity(rows.len());
    let mut duplicate_count = 0;
    let mut duplicate_groups = 0;
    let mut duplicate_samples = Vec::new();

    // Missing values, per required column
    let mut missing: Vec<ColumnMissing> = required
        .iter()
        .map(|name| ColumnMissing {
            column: name.to_string(),
            count: 0,
            samples: Vec::new(),
        })
        .collect();

    let mut anomalies: Vec<Anomaly> = options
        .rules
        .iter()
        .map(|rule| Anomaly {
            column: rule.column().to_string(),
            rule: rule.describe(),
            count: 0,
            samples: Vec::new(),
        })
        .collect();

    for (pos, row) in rows.iter().enumerate() {
        let occurrences = seen.entry(row).or_insert(0);
        *occurrences += 1;
        if *occurrences > 1 {
            duplicate_count += 1;
            if *occurrences == 2 {
                duplicate_groups += 1;
            }
            push_sample(&mut duplicate_samples, limit, || identify(pos, row));
        }

        for (slot, &col) in missing.iter_mut().zip(&required_idx) {
            if row.get(col).is_none_or(Value::is_missing) {
                slot.count += 1;
                push_sample(&mut slot.samples, limit, || identify(pos, row));
            }
        }

        for ((slot, rule), &col) in anomalies.iter_mut().zip(&options.rules).zip(&rule_idx) {
            if row.get(col).is_some_and(|v| rule.violated_by(v)) {
                slot.count += 1;
                push_sample(&mut slot.samples, limit, || identify(pos, row));
            }
        }
    }

    tracing::debug!(
        "checked {}: {} rows, {} duplicates in {} groups",
        table,
        rows.len(),
        duplicate_count,
        duplicate_groups
    );

    Ok(TableCheck {
        table: table.to_string(),
        rows: rows.len(),
        columns: columns.to_vec(),
        duplicate_count,
        duplicate_groups,
        duplicate_samples,
        missing,
        anomalies,
        orphans: Vec::new(),
    })
}

fn push_sample(samples: &mut Vec<String>, limit: usize, make: impl FnOnce() -> String) {
    if samples.len() < limit {
        samples.push(make());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(id: i64, name: &str) -> Row {
        vec![Value::from(id), Value::from(name)]
    }

    #[test]
    fn test_no_duplicates() {
        let rows = vec![row(1, "A"), row(2, "B"), row(3, "C")];
        let check = check_rows("t", &cols(&["id", "name"]), &rows, &[], &CheckOptions::default()).unwrap();
        assert_eq!(check.duplicate_count, 0);
        assert_eq!(check.duplicate_groups, 0);
        assert!(check.is_clean());
    }

    #[test]
    fn test_single_duplicate_pair() {
        let rows = vec![row(1, "A"), row(1, "A"), row(2, "B")];
        let check = check_rows("t", &cols(&["id", "name"]), &rows, &[], &CheckOptions::default()).unwrap();
        assert_eq!(check.duplicate_count, 1);
        assert_eq!(check.duplicate_samples, vec!["1"]);
    }

    #[test]
    fn test_each_extra_copy_adds_one() {
        let mut rows = vec![row(1, "A"), row(2, "B")];
        let columns = cols(&["id", "name"]);
        let opts = CheckOptions::default();

        let before = check_rows("t", &columns, &rows, &[], &opts).unwrap().duplicate_count;
        rows.push(row(1, "A"));
        let after_one = check_rows("t", &columns, &rows, &[], &opts).unwrap();
        rows.push(row(1, "A"));
        let after_two = check_rows("t", &columns, &rows, &[], &opts).unwrap();

        assert_eq!(after_one.duplicate_count, before + 1);
        assert_eq!(after_two.duplicate_count, before + 2);
        // still a single group of identical rows
        assert_eq!(after_two.duplicate_groups, 1);
    }

    #[test]
    fn test_partial_match_is_not_duplicate() {
        let rows = vec![row(1, "A"), row(1, "B")];
        let check = check_rows("t", &cols(&["id", "name"]), &rows, &[], &CheckOptions::default()).unwrap();
        assert_eq!(check.duplicate_count, 0);
    }

    #[test]
    fn test_missing_score_counted_once() {
        let columns = cols(&["id", "score"]);
        let rows: Vec<Row> = (1..=10)
            .map(|i| {
                let score = if i == 7 { Value::Null } else { Value::from(50.0 + i as f64) };
                vec![Value::from(i as i64), score]
            })
            .collect();
        let check = check_rows("scores", &columns, &rows, &["score"], &CheckOptions::default()).unwrap();
        assert_eq!(check.missing_value_count("score"), Some(1));
        assert_eq!(check.missing[0].samples, vec!["7"]);
    }

    #[test]
    fn test_empty_string_is_missing() {
        let rows = vec![row(1, ""), row(2, "B")];
        let check = check_rows("t", &cols(&["id", "name"]), &rows, &["name", "id"], &CheckOptions::default()).unwrap();
        assert_eq!(check.missing_value_count("name"), Some(1));
        assert_eq!(check.missing_value_count("id"), Some(0));
        // order follows the request
        assert_eq!(check.missing[0].column, "name");
    }

    #[test]
    fn test_null_identifier_falls_back_to_position() {
        let rows = vec![
            vec![Value::Null, Value::from("x")],
            vec![Value::Null, Value::from("x")],
        ];
        let check = check_rows("t", &cols(&["id", "name"]), &rows, &["id"], &CheckOptions::default()).unwrap();
        assert_eq!(check.duplicate_samples, vec!["row 2"]);
        assert_eq!(check.missing[0].samples, vec!["row 1", "row 2"]);
    }

    #[test]
    fn test_unknown_required_column() {
        let err = check_rows("t", &cols(&["id"]), &[], &["score"], &CheckOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { column, .. } if column == "score"));
    }

    #[test]
    fn test_samples_are_capped() {
        let rows: Vec<Row> = (0..50).map(|_| row(9, "same")).collect();
        let opts = CheckOptions {
            sample_limit: 5,
            ..CheckOptions::default()
        };
        let check = check_rows("t", &cols(&["id", "name"]), &rows, &[], &opts).unwrap();
        assert_eq!(check.duplicate_count, 49);
        assert_eq!(check.duplicate_samples.len(), 5);
    }

    #[test]
    fn test_range_and_term_rules() {
        let columns = cols(&["id", "term", "rate"]);
        let rows = vec![
            vec![Value::from(1i64), Value::from("2019-Fall"), Value::from(0.9)],
            vec![Value::from(2i64), Value::from("Fall 19"), Value::from(1.4)],
            vec![Value::from(3i64), Value::from("2020-Spring"), Value::Null],
        ];
        let opts = CheckOptions {
            rules: vec![
                Rule::Range { column: "rate".into(), min: 0.0, max: 1.0 },
                Rule::TermFormat { column: "term".into() },
            ],
            ..CheckOptions::default()
        };
        let check = check_rows("t", &columns, &rows, &[], &opts).unwrap();
        assert_eq!(check.anomalies[0].count, 1);
        assert_eq!(check.anomalies[0].samples, vec!["2"]);
        assert_eq!(check.anomalies[1].count, 1);
        assert_eq!(check.total_anomalies(), 2);
    }

    #[test]
    fn test_explicit_identifier() {
        let columns = cols(&["rowkey", "student_id"]);
        let rows = vec![
            vec![Value::from("a"), Value::from(42i64)],
            vec![Value::from("a"), Value::from(42i64)],
        ];
        let opts = CheckOptions {
            identifier: Some("student_id".into()),
            ..CheckOptions::default()
        };
        let check = check_rows("t", &columns, &rows, &[], &opts).unwrap();
        assert_eq!(check.duplicate_samples, vec!["42"]);
    }

    #[test]
    fn test_absent_identifier_uses_first_column() {
        let rows = vec![row(7, "A"), row(7, "A")];
        let opts = CheckOptions {
            identifier: Some("student_id".into()),
            ..CheckOptions::default()
        };
        let check = check_rows("t", &cols(&["id", "name"]), &rows, &["name"], &opts).unwrap();
        assert_eq!(check.duplicate_samples, vec!["7"]);
    }
}

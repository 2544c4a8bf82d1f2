//! Quality Checker - duplicate, missing-value and integrity scans
//!
//! Detection lives in [`check`] as pure functions over rows. This module
//! wires it to the record store:
//! - [`check_table`] answers the single-table question for arbitrary
//!   required columns
//! - [`check_schema`] applies everything a catalog descriptor knows
//!   (required flags, ranges, term format, foreign references)
//! - [`check_catalog`] runs the whole catalog, recording failures per table
//!
//! Rendering and writing the markdown report is in [`report`].

pub mod check;
pub mod report;

use serde::Serialize;

use crate::schema::{self, TableSchema};
use crate::storage::Store;
use crate::{Error, Result};

pub use check::{Anomaly, CheckOptions, ColumnMissing, OrphanCheck, Rule, SAMPLE_LIMIT, TableCheck, check_rows};
pub use report::{render_markdown, write_report};

/// Check one table for duplicates and missing required values.
///
/// Fails with `TableNotFound` or `ColumnNotFound` before reading any rows.
/// Catalog tables report offending rows by their identifier column, other
/// tables by their first column.
pub fn check_table(store: &Store, table: &str, required: &[&str]) -> Result<TableCheck> {
    let options = CheckOptions {
        identifier: schema::table(table).map(|t| t.identifier.to_string()),
        ..CheckOptions::default()
    };
    check_table_with(store, table, required, &options)
}

pub fn check_table_with(
    store: &Store,
    table: &str,
    required: &[&str],
    options: &CheckOptions,
) -> Result<TableCheck> {
    store.require_columns(table, required)?;
    let set = store.read_table(table, None)?;
    check_rows(table, &set.columns, &set.rows, required, options)
}

/// Rules implied by a descriptor
pub fn rules_for(table: &TableSchema) -> Vec<Rule> {
    let mut rules: Vec<Rule> = table
        .columns
        .iter()
        .filter_map(|c| {
            c.range.map(|(min, max)| Rule::Range {
                column: c.name.to_string(),
                min,
                max,
            })
        })
        .collect();
    if table.column("term").is_some() {
        rules.push(Rule::TermFormat {
            column: "term".to_string(),
        });
    }
    rules
}

/// Full check of a catalog table, including the orphan scan.
pub fn check_schema(store: &Store, table: &TableSchema, sample_limit: usize) -> Result<TableCheck> {
    // Optional columns may be absent; their rules have nothing to check
    let present = store.columns(table.name)?;
    let rules = rules_for(table)
        .into_iter()
        .filter(|rule| present.iter().any(|c| c == rule.column()))
        .collect();
    let options = CheckOptions {
        identifier: Some(table.identifier.to_string()),
        sample_limit,
        rules,
    };
    let mut result = check_table_with(store, table.name, &table.required_columns(), &options)?;

    for (column, fk) in table.foreign_refs() {
        if !store.table_exists(fk.table)? {
            tracing::warn!(
                "skipping orphan scan of {}.{}: parent table {} is missing",
                table.name,
                column,
                fk.table
            );
            continue;
        }
        let (count, samples) = store.orphans(table.name, column, fk.table, fk.column, sample_limit)?;
        result.orphans.push(OrphanCheck {
            column: column.to_string(),
            parent: format!("{}.{}", fk.table, fk.column),
            count,
            samples,
        });
    }

    Ok(result)
}

/// Outcome of checking one table within a multi-table run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Checked(TableCheck),
    Failed { table: String, error: String },
}

impl TableOutcome {
    pub fn table(&self) -> &str {
        match self {
            TableOutcome::Checked(check) => &check.table,
            TableOutcome::Failed { table, .. } => table,
        }
    }
}

/// Findings across every checked table
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub database: String,
    pub tables: Vec<TableOutcome>,
}

impl QualityReport {
    pub fn checks(&self) -> impl Iterator<Item = &TableCheck> {
        self.tables.iter().filter_map(|t| match t {
            TableOutcome::Checked(check) => Some(check),
            TableOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().filter_map(|t| match t {
            TableOutcome::Failed { table, error } => Some((table.as_str(), error.as_str())),
            TableOutcome::Checked(_) => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_failures() && self.checks().all(TableCheck::is_clean)
    }
}

/// Check every catalog table. A table that cannot be checked is recorded
/// as a failure and the remaining tables are still checked; only an
/// unusable store aborts the run.
pub fn check_catalog(store: &Store, tables: &[TableSchema], sample_limit: usize) -> Result<QualityReport> {
    let mut outcomes = Vec::with_capacity(tables.len());

    for table in tables {
        match check_schema(store, table, sample_limit) {
            Ok(check) => {
                tracing::info!(
                    "{}: {} rows, {} duplicates, {} missing",
                    table.name,
                    check.rows,
                    check.duplicate_count,
                    check.total_missing()
                );
                outcomes.push(TableOutcome::Checked(check));
            }
            Err(err @ (Error::TableNotFound(_) | Error::ColumnNotFound { .. })) => {
                tracing::warn!("{}: {}", table.name, err);
                outcomes.push(TableOutcome::Failed {
                    table: table.name.to_string(),
                    error: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(QualityReport {
        database: store
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string()),
        tables: outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn pairs_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql(
                "CREATE TABLE pairs (id INTEGER, label TEXT);
                 INSERT INTO pairs VALUES (1, 'A'), (1, 'A'), (2, 'B');",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_check_table_duplicates() {
        let store = pairs_store();
        let check = check_table(&store, "pairs", &[]).unwrap();
        assert_eq!(check.duplicate_count, 1);
        assert_eq!(check.duplicate_samples, vec!["1"]);
        assert_eq!(check.rows, 3);
    }

    #[test]
    fn test_inserting_copy_increments_by_one() {
        let store = pairs_store();
        let before = check_table(&store, "pairs", &[]).unwrap().duplicate_count;
        store
            .insert_rows("pairs", &["id", "label"], &[vec![Value::from(2i64), Value::from("B")]])
            .unwrap();
        let after = check_table(&store, "pairs", &[]).unwrap().duplicate_count;
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_check_missing_table() {
        let store = pairs_store();
        let err = check_table(&store, "nonexistent_table", &["id"]).unwrap_err();
        assert!(matches!(err, Error::TableNotFound(t) if t == "nonexistent_table"));
    }

    #[test]
    fn test_check_missing_column() {
        let store = pairs_store();
        let err = check_table(&store, "pairs", &["score"]).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[test]
    fn test_one_null_score_in_ten() {
        let store = Store::open_in_memory().unwrap();
        store.execute_sql("CREATE TABLE results (id INTEGER, score REAL)").unwrap();
        let rows: Vec<_> = (1..=10)
            .map(|i| {
                let score = if i == 4 { Value::Null } else { Value::from(60.0 + i as f64) };
                vec![Value::from(i as i64), score]
            })
            .collect();
        store.insert_rows("results", &["id", "score"], &rows).unwrap();

        let check = check_table(&store, "results", &["score"]).unwrap();
        assert_eq!(check.missing_value_count("score"), Some(1));
        assert_eq!(check.duplicate_count, 0);
    }

    #[test]
    fn test_catalog_run_reports_missing_tables_per_table() {
        let store = Store::open_in_memory().unwrap();
        let students = schema::table(schema::STUDENTS).unwrap();
        store.create_table(&students).unwrap();
        store
            .execute_sql(
                "INSERT INTO students VALUES (1, 'Ana Lee', 'Nursing', '2019-Sep', 20, 'F', '2019-09-01');",
            )
            .unwrap();

        let tables = vec![students, schema::table(schema::ATTENDANCE).unwrap()];
        let report = check_catalog(&store, &tables, SAMPLE_LIMIT).unwrap();

        assert_eq!(report.tables.len(), 2);
        assert!(report.has_failures());
        assert_eq!(report.checks().count(), 1);
        let (failed, _) = report.failures().next().unwrap();
        assert_eq!(failed, "attendance");
    }

    #[test]
    fn test_schema_check_finds_orphans_and_ranges() {
        let store = Store::open_in_memory().unwrap();
        let students = schema::table(schema::STUDENTS).unwrap();
        let assessments = schema::table(schema::ASSESSMENTS).unwrap();
        store.create_table(&students).unwrap();
        store.create_table(&assessments).unwrap();
        store
            .execute_sql(
                "INSERT INTO students VALUES (1, 'Ana Lee', 'Nursing', '2019-Sep', 20, 'F', '2019-09-01');
                 INSERT INTO assessments VALUES (1, 'midterm', '2019-Fall', 71.5, '2019-10-27');
                 INSERT INTO assessments VALUES (5, 'final', '2019-Fall', 140.0, '2019-12-31');",
            )
            .unwrap();

        let check = check_schema(&store, &assessments, SAMPLE_LIMIT).unwrap();
        assert_eq!(check.total_orphans(), 1);
        assert_eq!(check.orphans[0].samples, vec!["5"]);
        let score = check.anomalies.iter().find(|a| a.column == "score").unwrap();
        assert_eq!(score.count, 1);
        assert!(!check.is_clean());
    }

    #[test]
    fn test_catalog_table_without_identifier_column() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql(
                "CREATE TABLE students (id INTEGER, name TEXT);
                 INSERT INTO students VALUES (3, NULL), (3, NULL);",
            )
            .unwrap();

        let check = check_table(&store, "students", &["name"]).unwrap();
        assert_eq!(check.duplicate_samples, vec!["3"]);
        assert_eq!(check.missing_value_count("name"), Some(2));
    }

    #[test]
    fn test_schema_check_skips_absent_optional_columns() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql(
                "CREATE TABLE students (student_id INTEGER, full_name TEXT, program TEXT, intake TEXT, enrol_date TEXT);
                 INSERT INTO students VALUES (1, 'Ana Lee', 'Nursing', '2019-Sep', '2019-09-01');",
            )
            .unwrap();

        let students = schema::table(schema::STUDENTS).unwrap();
        let check = check_schema(&store, &students, SAMPLE_LIMIT).unwrap();
        assert!(check.anomalies.iter().all(|a| a.column != "age"));
        assert!(check.is_clean());
    }
}

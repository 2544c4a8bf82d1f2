//! Exporter - tables and analytic queries to delimited files
//!
//! One CSV per table, header row first, columns in schema order and rows
//! in insertion order. NULL is written as an empty field, and an empty
//! field is read back as NULL by [`import_table`].

pub mod queries;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::storage::{RowSet, Store};
use crate::value::{Row, Value};
use crate::{Error, Result};

pub use queries::{NamedQuery, analytic_queries};

/// Where an export went and how big it is
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

/// Export one table to `<dir>/<table>.csv`.
pub fn export_table(store: &Store, table: &str, dir: &Path) -> Result<ExportOutcome> {
    let set = store.read_table(table, None)?;
    let path = dir.join(format!("{}.csv", table));
    write_set(table, &path, &set)
}

/// Export the first `limit` rows of a table to an explicit path.
pub fn export_preview(store: &Store, table: &str, limit: usize, path: &Path) -> Result<ExportOutcome> {
    let set = store.read_table(table, Some(limit))?;
    write_set(table, path, &set)
}

/// Export the result of a named query to `<dir>/<name>.csv`.
pub fn export_query(store: &Store, query: &NamedQuery, dir: &Path) -> Result<ExportOutcome> {
    let set = store.query(query.sql)?;
    let path = dir.join(format!("{}.csv", query.name));
    write_set(query.name, &path, &set)
}

/// Export several tables, one outcome per table.
///
/// A failing table does not stop the others; the caller decides what a
/// partial export means.
pub fn export_all(store: &Store, tables: &[String], dir: &Path) -> Vec<(String, Result<ExportOutcome>)> {
    tables
        .iter()
        .map(|table| {
            let outcome = export_table(store, table, dir);
            if let Err(err) = &outcome {
                tracing::warn!("export of {} failed: {}", table, err);
            }
            (table.clone(), outcome)
        })
        .collect()
}

fn write_set(name: &str, path: &Path, set: &RowSet) -> Result<ExportOutcome> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let bytes = write_csv(path, &set.columns, &set.rows)?;
    tracing::info!("exported {} rows of {} to {}", set.len(), name, path.display());
    Ok(ExportOutcome {
        name: name.to_string(),
        path: path.to_path_buf(),
        rows: set.len(),
        bytes,
    })
}

/// Write a header and rows as CSV, returning the bytes written.
pub fn write_csv(path: &Path, columns: &[String], rows: &[Row]) -> Result<u64> {
    let file = File::create(path)?;
    let counting = CountingWriter::new(BufWriter::new(file));
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(row.iter().map(Value::render))?;
    }

    writer.flush()?;
    let mut counting = writer.into_inner().map_err(|err| Error::Io(err.into_error()))?;
    counting.flush()?;
    Ok(counting.bytes_written())
}

/// Load a CSV produced by the exporter back into an existing table.
///
/// The header must name the table's columns in schema order. Returns the
/// number of rows inserted.
pub fn import_table(store: &Store, table: &str, path: &Path) -> Result<usize> {
    let columns = store.columns(table)?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;

    let header: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if header != columns {
        return Err(Error::HeaderMismatch {
            table: table.to_string(),
            expected: columns.join(", "),
            found: header.join(", "),
        });
    }

    // Typed columns convert text through SQLite affinity; untyped ones do not
    let untyped: Vec<bool> = store.declared_types(table)?.iter().map(|t| t.is_empty()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .zip(&untyped)
                .map(|(field, &untyped)| parse_field(field, untyped))
                .collect::<Row>(),
        );
    }

    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    let inserted = store.in_transaction(|s| s.insert_rows(table, &names, &rows))?;
    tracing::info!("imported {} rows into {} from {}", inserted, table, path.display());
    Ok(inserted)
}

/// Inverse of [`Value::render`] for a field read back from CSV.
fn parse_field(field: &str, untyped: bool) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if untyped {
        if let Ok(i) = field.parse::<i64>() {
            if i.to_string() == field {
                return Value::from(i);
            }
        }
        if let Ok(f) = field.parse::<f64>() {
            if f.to_string() == field {
                return Value::from(f);
            }
        }
    }
    Value::from(field)
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{self, GeneratorConfig};

    fn scores_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql(
                "CREATE TABLE scores (student_id INTEGER, assessment TEXT, score REAL, note TEXT);
                 INSERT INTO scores VALUES (3, 'midterm', 61.5, 'comma, inside');
                 INSERT INTO scores VALUES (1, 'final', 88.0, 'quote \"here\"');
                 INSERT INTO scores VALUES (2, 'midterm', 47.25, 'line
break');",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_export_writes_header_in_schema_order() {
        let store = scores_store();
        let dir = tempfile::tempdir().unwrap();
        let outcome = export_table(&store, "scores", dir.path()).unwrap();

        assert_eq!(outcome.rows, 3);
        assert_eq!(outcome.path, dir.path().join("scores.csv"));
        let text = std::fs::read_to_string(&outcome.path).unwrap();
        assert_eq!(outcome.bytes, text.len() as u64);
        assert!(text.starts_with("student_id,assessment,score,note\n3,midterm,61.5,\"comma, inside\"\n"));
    }

    #[test]
    fn test_export_then_import_round_trips() {
        let store = scores_store();
        let original = store.read_table("scores", None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let outcome = export_table(&store, "scores", dir.path()).unwrap();

        store.execute_sql("DELETE FROM scores").unwrap();
        let inserted = import_table(&store, "scores", &outcome.path).unwrap();

        assert_eq!(inserted, 3);
        assert_eq!(store.read_table("scores", None).unwrap(), original);
    }

    #[test]
    fn test_null_exports_as_empty_and_imports_as_null() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql("CREATE TABLE t (id INTEGER, score REAL); INSERT INTO t VALUES (1, NULL);")
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let outcome = export_table(&store, "t", dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&outcome.path).unwrap(), "id,score\n1,\n");

        store.execute_sql("DELETE FROM t").unwrap();
        import_table(&store, "t", &outcome.path).unwrap();
        let set = store.read_table("t", None).unwrap();
        assert_eq!(set.rows, vec![vec![Value::from(1i64), Value::Null]]);
    }

    #[test]
    fn test_import_rejects_reordered_header() {
        let store = scores_store();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, "assessment,student_id,score,note\nfinal,1,50,x\n").unwrap();

        let err = import_table(&store, "scores", &path).unwrap_err();
        assert!(matches!(err, Error::HeaderMismatch { .. }));
        assert_eq!(store.count_rows("scores").unwrap(), 3);
    }

    #[test]
    fn test_export_missing_table() {
        let store = scores_store();
        let dir = tempfile::tempdir().unwrap();
        let results = export_all(&store, &["scores".to_string(), "ghost".to_string()], dir.path());
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(Error::TableNotFound(_))));
    }

    #[test]
    fn test_preview_and_analytic_queries() {
        let store = Store::open_in_memory().unwrap();
        let config = GeneratorConfig {
            students: 12,
            sessions_per_term: 4,
            activity_events_per_term: 3,
            ..GeneratorConfig::default()
        };
        generate::generate(&store, &config).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let preview = export_preview(&store, "students", 5, &dir.path().join("preview.csv")).unwrap();
        assert_eq!(preview.rows, 5);

        for query in analytic_queries() {
            let outcome = export_query(&store, query, dir.path()).unwrap();
            assert!(outcome.rows > 0, "{} is empty", query.name);
            assert!(outcome.path.ends_with(format!("{}.csv", query.name)));
        }
    }

    #[test]
    fn test_round_trip_through_untyped_columns() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql("CREATE TABLE loose (a, b, c); INSERT INTO loose VALUES (1, 2.5, '007');")
            .unwrap();
        let original = store.read_table("loose", None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let outcome = export_table(&store, "loose", dir.path()).unwrap();

        store.execute_sql("DELETE FROM loose").unwrap();
        import_table(&store, "loose", &outcome.path).unwrap();

        let reloaded = store.read_table("loose", None).unwrap();
        assert_eq!(reloaded, original);
        assert_eq!(reloaded.rows[0][0], Value::from(1i64));
    }
}


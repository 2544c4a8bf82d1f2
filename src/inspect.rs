//! Store inspection: connectivity probe, table listing and sample rows

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::Result;
use crate::storage::{RowSet, Store};

/// Result of a successful connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub path: PathBuf,
    pub sqlite_version: String,
    pub tables: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub rows: usize,
}

/// Open the store at `path`, run a trivial query and close it again.
///
/// Never creates the file: a missing path is `StoreUnavailable`.
pub fn probe(path: &Path) -> Result<Probe> {
    let store = Store::open_existing(path)?;
    let sqlite_version = store.sqlite_version()?;
    let tables = store.table_names()?.len();
    store.close()?;

    tracing::debug!("probe of {} ok (sqlite {})", path.display(), sqlite_version);
    Ok(Probe {
        path: path.to_path_buf(),
        sqlite_version,
        tables,
    })
}

/// Every user table with its row count, sorted by name.
pub fn list_tables(store: &Store) -> Result<Vec<TableInfo>> {
    store
        .table_names()?
        .into_iter()
        .map(|name| {
            let rows = store.count_rows(&name)?;
            Ok(TableInfo { name, rows })
        })
        .collect()
}

/// First `limit` rows of a table in insertion order.
pub fn sample_rows(store: &Store, table: &str, limit: usize) -> Result<RowSet> {
    store.read_table(table, Some(limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::value::Value;

    #[test]
    fn test_probe_missing_file_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");

        let err = probe(&path).unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_probe_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engagement.db");
        {
            let store = Store::open(&path).unwrap();
            store.execute_sql("CREATE TABLE a (x INTEGER); CREATE TABLE b (y TEXT);").unwrap();
        }

        let result = probe(&path).unwrap();
        assert_eq!(result.tables, 2);
        assert!(result.sqlite_version.starts_with('3'));
    }

    #[test]
    fn test_list_tables_sorted_with_counts() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql(
                "CREATE TABLE zeta (x INTEGER); INSERT INTO zeta VALUES (1), (2);
                 CREATE TABLE alpha (x INTEGER);",
            )
            .unwrap();

        let tables = list_tables(&store).unwrap();
        assert_eq!(
            tables,
            vec![
                TableInfo { name: "alpha".to_string(), rows: 0 },
                TableInfo { name: "zeta".to_string(), rows: 2 },
            ]
        );
    }

    #[test]
    fn test_sample_rows_respects_limit_and_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute_sql("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (9), (3), (7);")
            .unwrap();

        let set = sample_rows(&store, "t", 2).unwrap();
        assert_eq!(set.rows, vec![vec![Value::from(9i64)], vec![Value::from(3i64)]]);
        assert!(matches!(sample_rows(&store, "missing", 2), Err(Error::TableNotFound(_))));
    }
}

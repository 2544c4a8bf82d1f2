//! SQLite storage implementation

use std::path::{Path, PathBuf};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params_from_iter};
use crate::{Error, Result};
use crate::schema::TableSchema;
use crate::value::{Row, Value};
use super::schema::{self as ddl, quote_ident};

/// Column names plus the rows read under them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// SQLite-backed record store.
///
/// The connection is owned by the store and closed when it is dropped,
/// so every exit path releases it. Use [`Store::close`] to observe close
/// errors explicitly.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| unavailable(path, e))?;
        tracing::debug!("opened record store {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a database that must already exist.
    ///
    /// Fails with `StoreUnavailable` for a missing file or one that is not
    /// a SQLite database.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::StoreUnavailable {
                path: path.display().to_string(),
                reason: "database file does not exist".to_string(),
            });
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| unavailable(path, e))?;

        // SQLite reads the header lazily; force it so a corrupt file fails here.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| unavailable(path, e))?;

        tracing::debug!("opened existing record store {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::StoreUnavailable {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::QueryFailed(e))
    }

    /// Run one or more raw SQL statements
    pub fn execute_sql(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn sqlite_version(&self) -> Result<String> {
        let version = self.conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
        Ok(version)
    }

    // ========== Schema lookup ==========

    /// User tables, sorted by name
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Column names in schema order; `TableNotFound` if the table is absent
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let columns = stmt
            .query_map([], |row| row.get(1))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(columns)
    }

    /// Declared column types in schema order; empty for untyped columns
    pub fn declared_types(&self, table: &str) -> Result<Vec<String>> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let types = stmt
            .query_map([], |row| row.get(2))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(types)
    }

    /// Verify that every named column exists, returning the full column list.
    pub fn require_columns(&self, table: &str, required: &[&str]) -> Result<Vec<String>> {
        let columns = self.columns(table)?;
        for name in required {
            if !columns.iter().any(|c| c == name) {
                return Err(Error::ColumnNotFound {
                    table: table.to_string(),
                    column: name.to_string(),
                });
            }
        }
        Ok(columns)
    }

    pub fn count_rows(&self, table: &str) -> Result<usize> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== Row access ==========

    /// Read a table in insertion (rowid) order
    pub fn read_table(&self, table: &str, limit: Option<usize>) -> Result<RowSet> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let mut sql = format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table));
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        self.query(&sql)
    }

    /// Run an arbitrary read query
    pub fn query(&self, sql: &str) -> Result<RowSet> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        Ok(RowSet { columns, rows })
    }

    // ========== Bulk operations ==========

    /// Drop and recreate a table from its descriptor
    pub fn recreate_table(&self, table: &TableSchema) -> Result<()> {
        self.conn.execute(&ddl::drop_table_sql(table.name), [])?;
        self.conn.execute(&ddl::create_table_sql(table), [])?;
        Ok(())
    }

    pub fn create_table(&self, table: &TableSchema) -> Result<()> {
        self.conn.execute(&ddl::create_table_sql(table), [])?;
        Ok(())
    }

    pub fn create_indexes(&self, table: &TableSchema) -> Result<()> {
        for stmt in ddl::index_statements(table) {
            self.conn.execute(&stmt, [])?;
        }
        Ok(())
    }

    /// Insert rows under the given columns, returning the number inserted
    pub fn insert_rows(&self, table: &str, columns: &[&str], rows: &[Row]) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(&ddl::insert_sql(table, columns))?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
        tracing::debug!("inserted {} rows into {}", rows.len(), table);
        Ok(rows.len())
    }

    /// Run `f` inside a transaction; any error rolls everything back.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // ========== Integrity ==========

    /// Rows of `table` whose `column` has no match in `parent.parent_column`.
    ///
    /// Returns the orphan count and up to `limit` offending values in rowid
    /// order.
    pub fn orphans(
        &self,
        table: &str,
        column: &str,
        parent: &str,
        parent_column: &str,
        limit: usize,
    ) -> Result<(usize, Vec<String>)> {
        self.require_columns(table, &[column])?;
        self.require_columns(parent, &[parent_column])?;

        let sql = format!(
            "SELECT c.{col} FROM {t} AS c \
             WHERE c.{col} IS NOT NULL \
             AND NOT EXISTS (SELECT 1 FROM {p} AS p WHERE p.{pc} = c.{col}) \
             ORDER BY c.rowid",
            col = quote_ident(column),
            t = quote_ident(table),
            p = quote_ident(parent),
            pc = quote_ident(parent_column),
        );
        let found = self.query(&sql)?;
        let samples = found
            .rows
            .iter()
            .take(limit)
            .filter_map(|row| row.first().map(Value::render))
            .collect();
        Ok((found.len(), samples))
    }
}

fn unavailable(path: &Path, err: rusqlite::Error) -> Error {
    Error::StoreUnavailable {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

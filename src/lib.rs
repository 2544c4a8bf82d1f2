//! # engagement-etl - ETL utilities for student-engagement data
//!
//! A small suite of batch operations over one SQLite record store:
//! - Synthetic data generation and bulk load, plus the per-term rollup
//! - CSV export (tables and analytic queries) and re-import
//! - Data quality checks: duplicate rows, missing required values,
//!   out-of-range values and orphaned foreign references
//! - Inspection: connectivity probe, table listing, sample rows
//!
//! Every component takes the store (or its path) explicitly; nothing is
//! configured through process-wide state.

pub mod value;
pub mod schema;
pub mod storage;
pub mod generate;
pub mod export;
pub mod quality;
pub mod inspect;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use value::{Row, Value};
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use storage::{RowSet, Store};
pub use quality::{QualityReport, TableCheck};
pub use generate::GeneratorConfig;
pub use config::EtlConfig;

/// Result type alias for ETL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ETL operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store unavailable at {path}: {reason}")]
    StoreUnavailable { path: String, reason: String },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Header mismatch for {table}: expected [{expected}], found [{found}]")]
    HeaderMismatch {
        table: String,
        expected: String,
        found: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

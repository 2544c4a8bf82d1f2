use tabled::{Table, Tabled, builder::Builder, settings::Style};

use crate::inspect::TableInfo;
use crate::quality::{QualityReport, TableOutcome};
use crate::storage::RowSet;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Two-column metric/value table
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Tabled)]
struct TableListRow {
    #[tabled(rename = "Table")]
    name: String,
    #[tabled(rename = "Rows")]
    rows: usize,
}

pub fn table_list(tables: &[TableInfo]) -> String {
    if tables.is_empty() {
        return String::new();
    }
    let rows: Vec<TableListRow> = tables
        .iter()
        .map(|t| TableListRow {
            name: t.name.clone(),
            rows: t.rows,
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Rows as read from the store, NULL shown as an empty cell.
pub fn row_set(set: &RowSet) -> String {
    let mut builder = Builder::default();
    builder.push_record(set.columns.iter().cloned());
    for row in &set.rows {
        builder.push_record(row.iter().map(|v| v.render()));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// One line per table: counts for checked tables, the error for failed ones.
pub fn check_summary(report: &QualityReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(
        ["Table", "Rows", "Duplicates", "Missing", "Anomalies", "Orphans"].map(String::from),
    );
    for outcome in &report.tables {
        match outcome {
            TableOutcome::Checked(check) => builder.push_record([
                check.table.clone(),
                check.rows.to_string(),
                check.duplicate_count.to_string(),
                check.total_missing().to_string(),
                check.total_anomalies().to_string(),
                check.total_orphans().to_string(),
            ]),
            TableOutcome::Failed { table, error } => builder.push_record([
                table.clone(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                error.clone(),
            ]),
        }
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

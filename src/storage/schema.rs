//! DDL derived from the table descriptors

use crate::schema::TableSchema;

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` for a descriptor.
///
/// Required flags are not turned into NOT NULL constraints: the store
/// accepts whatever it is given and the quality checker reports gaps.
pub fn create_table_sql(table: &TableSchema) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {} {}", quote_ident(c.name), c.ty.sql_type()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_ident(table.name),
        columns.join(",\n")
    )
}

pub fn drop_table_sql(name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(name))
}

/// One `CREATE INDEX` per indexed column
pub fn index_statements(table: &TableSchema) -> Vec<String> {
    table
        .indexes
        .iter()
        .map(|col| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                quote_ident(&format!("idx_{}_{}", table.name, col)),
                quote_ident(table.name),
                quote_ident(col)
            )
        })
        .collect()
}

/// Parameterized insert covering every column in order
pub fn insert_sql(table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        params.join(", ")
    )
}

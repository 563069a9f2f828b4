//! Statement text derived from the schema field table.
//!
//! Both statements list columns in schema declaration order, which is also
//! the order [`logship_core::LogRecord::values`] yields values in.

use logship_core::Schema;

/// Surrogate key column.
pub const ID_COLUMN: &str = "id";
/// Ingestion time column, filled by the database.
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table(table: &str, schema: &Schema) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", quote_ident(table));
    sql.push_str(&format!("    {} BIGSERIAL PRIMARY KEY,\n", quote_ident(ID_COLUMN)));
    for field in schema.fields() {
        sql.push_str(&format!(
            "    {} {},\n",
            quote_ident(&field.column),
            field.kind.sql_type()
        ));
    }
    sql.push_str(&format!(
        "    {} TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP\n)",
        quote_ident(CREATED_AT_COLUMN)
    ));
    sql
}

pub fn insert(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema.columns().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

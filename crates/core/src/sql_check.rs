//! Textual sanity checks on generated SQL.
//!
//! These are substring heuristics, not a parser. They exist to catch obviously
//! broken output before it is sent downstream; false positives and negatives
//! are expected.

use thiserror::Error;

use crate::catalog::{schema, Schema};

/// Tables of the retail demo dataset (`public.products` and friends) that are
/// accepted alongside the warehouse catalog.
const DEMO_TABLES: &[&str] = &["products", "sales", "customers"];

/// Schema prefixes that always count as fully qualified.
const BASE_PREFIXES: &[&str] = &["public.", "demo_db."];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SqlSyntaxError {
    #[error("Empty SQL query")]
    Empty,
    #[error("Query must start with SELECT")]
    NotSelect,
    #[error("Query must reference at least one of the available tables")]
    NoKnownTable,
    #[error("Mismatched parentheses")]
    MismatchedParentheses,
    #[error("Tables should be fully qualified (e.g., public.table_name)")]
    Unqualified,
}

#[derive(Clone, Debug)]
pub struct SqlSyntaxCheck {
    expected_tables: Vec<String>,
    qualified_prefixes: Vec<String>,
}

impl Default for SqlSyntaxCheck {
    fn default() -> Self {
        Self::for_schema(&schema())
    }
}

impl SqlSyntaxCheck {
    pub fn for_schema(schema: &Schema) -> Self {
        let mut expected_tables =
            DEMO_TABLES.iter().map(|table| table.to_ascii_uppercase()).collect::<Vec<_>>();
        for table in &schema.tables {
            let short = table.short_name().to_ascii_uppercase();
            if !expected_tables.contains(&short) {
                expected_tables.push(short);
            }
        }

        let mut qualified_prefixes =
            BASE_PREFIXES.iter().map(|prefix| prefix.to_string()).collect::<Vec<_>>();
        for name in schema.schema_names() {
            let prefix = format!("{}.", name.to_ascii_lowercase());
            if !qualified_prefixes.contains(&prefix) {
                qualified_prefixes.push(prefix);
            }
        }

        Self { expected_tables, qualified_prefixes }
    }

    pub fn check(&self, sql: &str) -> Result<(), SqlSyntaxError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlSyntaxError::Empty);
        }

        let upper = sql.to_ascii_uppercase();
        if !upper.starts_with("SELECT") {
            return Err(SqlSyntaxError::NotSelect);
        }

        if !self.references_known_table(&upper) {
            return Err(SqlSyntaxError::NoKnownTable);
        }

        if sql.matches('(').count() != sql.matches(')').count() {
            return Err(SqlSyntaxError::MismatchedParentheses);
        }

        let lower = sql.to_ascii_lowercase();
        if !self.qualified_prefixes.iter().any(|prefix| lower.contains(prefix.as_str())) {
            return Err(SqlSyntaxError::Unqualified);
        }

        Ok(())
    }

    /// True when some `FROM x` / `JOIN x` target names an expected table,
    /// with or without a schema prefix.
    fn references_known_table(&self, upper_sql: &str) -> bool {
        let tokens = upper_sql.split_whitespace().collect::<Vec<_>>();
        tokens.windows(2).any(|pair| {
            let [keyword, target] = pair else {
                return false;
            };
            if *keyword != "FROM" && *keyword != "JOIN" {
                return false;
            }
            let target = target.trim_end_matches([',', ';', ')']);
            let table = target.rsplit('.').next().unwrap_or_default().trim_matches('"');
            self.expected_tables.iter().any(|expected| expected == table)
        })
    }
}

/// Checks `sql` against the shipped warehouse catalog.
pub fn validate_sql_syntax(sql: &str) -> Result<(), SqlSyntaxError> {
    SqlSyntaxCheck::default().check(sql)
}

/// Catalog tables whose name appears anywhere in `sql`, in catalog order.
///
/// Only looks when the text has a `FROM` or `JOIN` somewhere.
pub fn extract_table_names(sql: &str, schema: &Schema) -> Vec<String> {
    let upper = sql.to_ascii_uppercase();
    if !upper.contains("FROM") && !upper.contains("JOIN") {
        return Vec::new();
    }

    let mut tables = Vec::new();
    for table in &schema.tables {
        if upper.contains(&table.name.to_ascii_uppercase()) && !tables.contains(&table.name) {
            tables.push(table.name.clone());
        }
    }
    tables
}

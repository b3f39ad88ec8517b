//! Static description of the warehouse tables, columns and join paths.
//!
//! Everything here is built once at startup and only read afterwards. Tables and
//! relationships are kept in declaration order so every rendering of the catalog
//! is byte-stable.

mod warehouse;

use std::collections::BTreeSet;

use serde::Serialize;

pub use warehouse::schema;

/// Column types accepted by the warehouse. Lengths such as `VARCHAR(256)` are
/// allowed on top of the base name.
pub const WAREHOUSE_TYPES: &[&str] = &[
    "SMALLINT",
    "INTEGER",
    "BIGINT",
    "DECIMAL",
    "NUMERIC",
    "REAL",
    "DOUBLE PRECISION",
    "BOOLEAN",
    "CHAR",
    "VARCHAR",
    "DATE",
    "TIMESTAMP",
    "TIMESTAMPTZ",
    "TIME",
    "TIMETZ",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    /// `table.column` this column points at, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    pub description: String,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            foreign_key: None,
            description: description.into(),
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.foreign_key = Some(target.into());
        self
    }

    /// Whether the declared type is one of [`WAREHOUSE_TYPES`], ignoring any
    /// length/precision suffix.
    pub fn has_known_type(&self) -> bool {
        let upper = self.data_type.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        WAREHOUSE_TYPES.contains(&base)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Fully qualified `schema.table`.
    pub name: String,
    pub description: String,
    pub columns: Vec<Column>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub business_rules: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            columns: Vec::new(),
            business_rules: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.business_rules.push(rule.into());
        self
    }

    /// Unqualified table name (the part after the last `.`).
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Schema prefix, when the name is qualified.
    pub fn schema_name(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(schema, _)| schema)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub name: String,
    pub join_kind: String,
    /// Literal join expression, never executed by this crate.
    pub condition: String,
    pub description: String,
    /// The two fully qualified tables on either side of the join.
    pub tables: [String; 2],
}

impl Relationship {
    pub fn inner_join(
        name: impl Into<String>,
        tables: [&str; 2],
        condition: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            join_kind: "INNER JOIN".to_string(),
            condition: condition.into(),
            description: description.into(),
            tables: tables.map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelationshipIssue {
    UnknownTable { relationship: String, table: String },
    UnknownColumn { relationship: String, reference: String },
}

impl std::fmt::Display for RelationshipIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTable { relationship, table } => {
                write!(f, "relationship `{relationship}` joins unknown table `{table}`")
            }
            Self::UnknownColumn { relationship, reference } => write!(
                f,
                "relationship `{relationship}` references `{reference}`, which is not a column of either joined table"
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub database: String,
    pub default_schema: String,
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

impl Schema {
    pub fn new(database: impl Into<String>, default_schema: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            default_schema: default_schema.into(),
            tables: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name.eq_ignore_ascii_case(name))
    }

    /// Distinct schema prefixes in table declaration order.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.tables
            .iter()
            .filter_map(Table::schema_name)
            .filter(|schema| seen.insert(*schema))
            .collect()
    }

    /// Cross-checks every relationship against the tables it claims to join.
    ///
    /// Each `alias.column` reference in a join condition must name a column of
    /// one of the two joined tables. String literals are skipped.
    pub fn check_relationships(&self) -> Vec<RelationshipIssue> {
        let mut issues = Vec::new();

        for relationship in &self.relationships {
            let joined = relationship
                .tables
                .iter()
                .filter_map(|name| match self.find_table(name) {
                    Some(table) => Some(table),
                    None => {
                        issues.push(RelationshipIssue::UnknownTable {
                            relationship: relationship.name.clone(),
                            table: name.clone(),
                        });
                        None
                    }
                })
                .collect::<Vec<_>>();

            if joined.len() != relationship.tables.len() {
                continue;
            }

            for reference in qualified_references(&relationship.condition) {
                let column = reference.rsplit('.').next().unwrap_or_default();
                if !joined.iter().any(|table| table.has_column(column)) {
                    issues.push(RelationshipIssue::UnknownColumn {
                        relationship: relationship.name.clone(),
                        reference,
                    });
                }
            }
        }

        issues
    }
}

/// Pulls `alias.column` tokens out of a join expression.
fn qualified_references(condition: &str) -> Vec<String> {
    let mut references = Vec::new();
    let mut current = String::new();
    let mut in_literal = false;

    for character in condition.chars().chain(std::iter::once(' ')) {
        if character == '\'' {
            in_literal = !in_literal;
            current.clear();
            continue;
        }
        if in_literal {
            continue;
        }

        if character.is_ascii_alphanumeric() || character == '_' || character == '.' {
            current.push(character);
            continue;
        }

        if let Some((alias, column)) = current.split_once('.') {
            let alias_ok = alias.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
            if alias_ok && !column.is_empty() && !column.contains('.') {
                references.push(current.clone());
            }
        }
        current.clear();
    }

    references
}

#[cfg(test)]
mod tests {
    use super::{
        qualified_references, schema, Column, Relationship, RelationshipIssue, Schema, Table,
    };

    #[test]
    fn shipped_catalog_has_seven_tables_in_declared_order() {
        let catalog = schema();
        let names = catalog.tables.iter().map(|table| table.name.as_str()).collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                "bi_report.ordernumber_rs",
                "bi_report.shipmentnumber_rs",
                "mars__revolveclothing_com___db.orders",
                "mars__revolveclothing_com___db.product",
                "mars__revolveclothing_com___db.shipment",
                "mars__id.id_categorynames2",
                "mars__id.shipping_pickuptime",
            ]
        );
        assert_eq!(catalog.relationships.len(), 5);
    }

    #[test]
    fn shipped_catalog_uses_known_column_types() {
        let catalog = schema();
        for table in &catalog.tables {
            for column in &table.columns {
                assert!(
                    column.has_known_type(),
                    "{}.{} has unexpected type {}",
                    table.name,
                    column.name,
                    column.data_type
                );
            }
        }
    }

    #[test]
    fn shipped_relationships_reference_existing_columns() {
        assert_eq!(schema().check_relationships(), Vec::new());
    }

    #[test]
    fn schema_names_are_distinct_and_ordered() {
        assert_eq!(
            schema().schema_names(),
            vec!["bi_report", "mars__revolveclothing_com___db", "mars__id"]
        );
    }

    #[test]
    fn relationship_check_reports_unknown_columns_and_tables() {
        let catalog = Schema::new("demo", "public")
            .table(
                Table::new("public.sales", "Sales")
                    .column(Column::new("product_id", "INTEGER", "Product")),
            )
            .table(
                Table::new("public.products", "Products")
                    .column(Column::new("product_id", "INTEGER", "Id").primary_key()),
            )
            .relationship(Relationship::inner_join(
                "sales_to_products",
                ["public.sales", "public.products"],
                "s.product_sku = p.product_id",
                "Links sales to products",
            ))
            .relationship(Relationship::inner_join(
                "sales_to_customers",
                ["public.sales", "public.customers"],
                "s.customer_id = c.customer_id",
                "Links sales to customers",
            ));

        let issues = catalog.check_relationships();
        assert_eq!(
            issues,
            vec![
                RelationshipIssue::UnknownColumn {
                    relationship: "sales_to_products".to_string(),
                    reference: "s.product_sku".to_string(),
                },
                RelationshipIssue::UnknownTable {
                    relationship: "sales_to_customers".to_string(),
                    table: "public.customers".to_string(),
                },
            ]
        );
        assert!(issues[0].to_string().contains("s.product_sku"));
    }

    #[test]
    fn qualified_references_skip_literals_and_numbers() {
        let references =
            qualified_references("SUBSTRING(SPLIT_PART(p.code, '-', 2), 2, 1) = cn.lettercat");
        assert_eq!(references, vec!["p.code".to_string(), "cn.lettercat".to_string()]);

        assert!(qualified_references("x = 'a.b' AND 1.5 > 0").is_empty());
    }

    #[test]
    fn table_name_helpers_split_schema_prefix() {
        let table = Table::new("bi_report.ordernumber_rs", "Orders");
        assert_eq!(table.short_name(), "ordernumber_rs");
        assert_eq!(table.schema_name(), Some("bi_report"));

        let bare = Table::new("orders", "Orders");
        assert_eq!(bare.short_name(), "orders");
        assert_eq!(bare.schema_name(), None);
    }
}

use serde::{Deserialize, Serialize};

/// Routes source tables matching the patterns into `target-schema`.`target-table`.
///
/// Patterns use `*` and `?` wildcards. An empty `table-pattern` makes a
/// schema-level rule, which keeps the table name and only renames the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteRule {
    pub schema_pattern: String,

    #[serde(default)]
    pub table_pattern: String,

    pub target_schema: String,

    #[serde(default)]
    pub target_table: String,
}

impl RouteRule {
    pub fn new(schema_pattern: &str, table_pattern: &str, target_schema: &str, target_table: &str) -> Self {
        RouteRule {
            schema_pattern: schema_pattern.to_string(),
            table_pattern: table_pattern.to_string(),
            target_schema: target_schema.to_string(),
            target_table: target_table.to_string(),
        }
    }
}

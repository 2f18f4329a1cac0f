use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::db::Database;
use common::err::re_error::ReError;
use common::err::CResult;
use common::schema::QualifiedTable;

use crate::check::{query, Check, CheckResult};
use crate::fetch::{parse_columns, show_columns_sql, ColumnInfo};
use crate::sharding::InstanceTables;

/// All shards merged into one target table must share the column definitions.
pub struct ShardingTablesCheck {
    name: String,
    target: String,
    /// instance => source connection
    dbs: HashMap<String, Arc<dyn Database>>,
    shards: InstanceTables,
}

impl ShardingTablesCheck {
    pub fn new(target: &str, dbs: HashMap<String, Arc<dyn Database>>, shards: InstanceTables) -> Self {
        ShardingTablesCheck {
            name: format!("sharding table {} consistency checking", target),
            target: target.to_string(),
            dbs,
            shards,
        }
    }

    async fn columns(&self, instance: &str, table: &QualifiedTable, token: &CancellationToken) -> CResult<Vec<ColumnInfo>> {
        let db = self
            .dbs
            .get(instance)
            .ok_or_else(|| ReError::ConnectionError(format!("no connection to {}", instance)))?;
        let rows = query(db, token, &show_columns_sql(table)).await?;
        if rows.is_empty() {
            return Err(ReError::MysqlQueryErr(format!("table {} not found", table)));
        }

        Ok(parse_columns(&rows))
    }
}

fn definition(columns: &[ColumnInfo]) -> Vec<(&str, &str, bool)> {
    columns
        .iter()
        .map(|c| (c.field.as_str(), c.column_type.as_str(), c.nullable))
        .collect()
}

#[async_trait]
impl Check for ShardingTablesCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: &CancellationToken) -> CheckResult {
        let result = CheckResult::new(&self.name, "check consistency of sharding table structures");
        let instruction = "make the structure of every sharding table the same";

        let mut reference: Option<(String, Vec<ColumnInfo>)> = None;
        let mut auto_increment = vec![];
        for (instance, schemas) in &self.shards {
            for (schema, names) in schemas {
                for name in names {
                    let table = QualifiedTable::new(schema.as_str(), name.as_str());
                    let shard = format!("{} {}", instance, table);
                    let columns = match self.columns(instance, &table, token).await {
                        Ok(columns) => columns,
                        Err(e) => return result.fail(format!("sharding table {}: {}", shard, e), instruction),
                    };

                    if columns.iter().any(|c| c.is_auto_increment()) {
                        auto_increment.push(shard.clone());
                    }
                    match &reference {
                        None => reference = Some((shard, columns)),
                        Some((first, first_columns)) => {
                            if definition(first_columns) != definition(&columns) {
                                return result.fail(
                                    format!("sharding table {} is different from {} of target {}", shard, first, self.target),
                                    instruction,
                                );
                            }
                        }
                    }
                }
            }
        }

        if auto_increment.is_empty() {
            result
        } else {
            result.warn(
                format!("sharding tables {} have auto increment columns", auto_increment.join(", ")),
                "make sure the auto increment values of the shards do not conflict",
            )
        }
    }
}

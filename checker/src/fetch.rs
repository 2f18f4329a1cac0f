use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use common::db::{cell, Database};
use common::err::CResult;
use common::schema::QualifiedTable;
use filter::{is_system_schema, Filter, TableRouter};

/// Source tables to replicate grouped by the target table they route into, keyed by
/// `` `schema`.`table` `` of the target.
pub async fn fetch_target_do_tables(
    db: &Arc<dyn Database>,
    bw: &Filter,
    router: &dyn TableRouter,
) -> CResult<BTreeMap<String, Vec<QualifiedTable>>> {
    let mut source_tables = vec![];
    for row in db.query("SHOW DATABASES").await? {
        let schema = cell(&row, 0);
        if is_system_schema(schema) {
            continue;
        }

        let sql = format!("SHOW FULL TABLES IN `{}` WHERE Table_Type != 'VIEW'", schema);
        for table in db.query(&sql).await? {
            source_tables.push(QualifiedTable::new(schema, cell(&table, 0)));
        }
    }

    let mut mapping: BTreeMap<String, Vec<QualifiedTable>> = BTreeMap::new();
    for table in bw.apply_on(&source_tables) {
        let (schema, name) = router.route(&table.schema, &table.name)?;
        let target = QualifiedTable::new(schema, name).to_string();
        mapping.entry(target).or_default().push(table);
    }
    debug!("{} source tables route into {} targets", source_tables.len(), mapping.len());

    Ok(mapping)
}

/// A row of `SHOW COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub field: String,
    pub column_type: String,
    pub nullable: bool,
    pub key: String,
    pub extra: String,
}

impl ColumnInfo {
    pub fn is_key(&self) -> bool {
        self.key == "PRI" || self.key == "UNI"
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_lowercase().contains("auto_increment")
    }
}

pub fn show_columns_sql(table: &QualifiedTable) -> String {
    format!("SHOW COLUMNS FROM {}", table)
}

pub fn parse_columns(rows: &[Vec<Option<String>>]) -> Vec<ColumnInfo> {
    rows.iter()
        .map(|r| ColumnInfo {
            field: cell(r, 0).to_string(),
            column_type: cell(r, 1).to_lowercase(),
            nullable: cell(r, 2).eq_ignore_ascii_case("YES"),
            key: cell(r, 3).to_uppercase(),
            extra: cell(r, 5).to_string(),
        })
        .collect()
}

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::db::Database;
use common::schema::QualifiedTable;

use crate::check::{query, Check, CheckResult};
use crate::fetch::{parse_columns, show_columns_sql};

/// Every table to replicate must exist and should carry a primary or unique key.
pub struct TablesCheck {
    name: String,
    db: Arc<dyn Database>,
    /// schema => tables
    tables: BTreeMap<String, Vec<String>>,
}

impl TablesCheck {
    pub fn new(db: Arc<dyn Database>, instance_id: &str, tables: BTreeMap<String, Vec<String>>) -> Self {
        TablesCheck {
            name: format!("table structure compatibility check {}", instance_id),
            db,
            tables,
        }
    }
}

#[async_trait]
impl Check for TablesCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: &CancellationToken) -> CheckResult {
        let result = CheckResult::new(&self.name, "check compatibility of table structure");

        let mut errors = vec![];
        let mut warnings = vec![];
        for (schema, names) in &self.tables {
            for name in names {
                let table = QualifiedTable::new(schema.as_str(), name.as_str());
                match query(&self.db, token, &show_columns_sql(&table)).await {
                    Ok(rows) if rows.is_empty() => errors.push(format!("table {} not found", table)),
                    Ok(rows) => {
                        if !parse_columns(&rows).iter().any(|c| c.is_key()) {
                            warnings.push(format!("table {} has neither primary key nor unique key", table));
                        }
                    }
                    Err(e) => errors.push(format!("table {}: {}", table, e)),
                }
            }
        }

        if !errors.is_empty() {
            errors.extend(warnings);
            result.fail(errors.join("; "), "make sure the tables exist and are readable")
        } else if !warnings.is_empty() {
            result.warn(warnings.join("; "), "add a primary key or unique key to the tables")
        } else {
            result
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use common::db::mock::MockDatabase;

    use crate::check::table::TablesCheck;
    use crate::check::{Check, CheckState};

    fn tables(items: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        items
            .iter()
            .map(|(s, t)| (s.to_string(), t.iter().map(|n| n.to_string()).collect()))
            .collect()
    }

    #[tokio::test]
    async fn test_tables_check() {
        let db = Arc::new(
            MockDatabase::new()
                .with_rows(
                    "SHOW COLUMNS FROM `shop`.`orders`",
                    vec![vec!["id", "int", "NO", "PRI", "", ""]],
                )
                .with_rows("SHOW COLUMNS FROM `shop`.`log`", vec![vec!["msg", "text", "YES", "", "", ""]]),
        );
        let token = CancellationToken::new();

        let r = TablesCheck::new(db.clone(), "i", tables(&[("shop", &["orders"])])).run(&token).await;
        assert_eq!(*r.state(), CheckState::Success);

        let r = TablesCheck::new(db.clone(), "i", tables(&[("shop", &["orders", "log"])])).run(&token).await;
        assert_eq!(*r.state(), CheckState::Warning);
        assert!(r.error_msg().contains("`shop`.`log`"));

        let r = TablesCheck::new(db, "i", tables(&[("shop", &["log", "missing"])])).run(&token).await;
        assert_eq!(*r.state(), CheckState::Fail);
        assert!(r.error_msg().contains("`shop`.`missing`"));
    }
}

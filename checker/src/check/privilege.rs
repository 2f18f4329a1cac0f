use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::db::{cell, Database};

use crate::check::{query, Check, CheckResult};

const REQUIRED_PRIVILEGES: [&str; 4] = ["RELOAD", "SELECT", "REPLICATION SLAVE", "REPLICATION CLIENT"];

/// The replication user must be able to dump and to read the binlog.
pub struct SourcePrivilegeCheck {
    name: String,
    db: Arc<dyn Database>,
}

impl SourcePrivilegeCheck {
    pub fn new(db: Arc<dyn Database>, instance_id: &str) -> Self {
        SourcePrivilegeCheck {
            name: format!("source db privilege check {}", instance_id),
            db,
        }
    }
}

/// Required privileges missing from the `SHOW GRANTS` output.
fn lacked_privileges(grants: &[String]) -> Vec<&'static str> {
    let grants: Vec<String> = grants.iter().map(|g| g.to_uppercase()).collect();
    if grants.iter().any(|g| g.contains("ALL PRIVILEGES ON *.*")) {
        return vec![];
    }

    REQUIRED_PRIVILEGES
        .iter()
        .filter(|p| !grants.iter().any(|g| g.contains(*p)))
        .copied()
        .collect()
}

#[async_trait]
impl Check for SourcePrivilegeCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, token: &CancellationToken) -> CheckResult {
        let result = CheckResult::new(&self.name, "check privileges of source db");
        let instruction = "grant RELOAD, SELECT, REPLICATION SLAVE, REPLICATION CLIENT on *.* to the replication user";

        let rows = match query(&self.db, token, "SHOW GRANTS").await {
            Ok(rows) => rows,
            Err(e) => return result.fail(e.to_string(), instruction),
        };
        let grants: Vec<String> = rows.iter().map(|r| cell(r, 0).to_string()).collect();
        if grants.is_empty() {
            return result.fail("empty grant", instruction);
        }

        let lacked = lacked_privileges(&grants);
        if lacked.is_empty() {
            result
        } else {
            result.fail(format!("lack of {} privilege", lacked.join(", ")), instruction)
        }
    }
}

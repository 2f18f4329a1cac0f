//! Pre-flight checks run against source and target instances.

pub mod binlog;
pub mod privilege;
pub mod sharding;
pub mod table;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use getset::{Getters, Setters};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use common::db::{Database, Rows};
use common::err::re_error::ReError;
use common::err::CResult;

pub use self::binlog::{BinlogEnableCheck, BinlogFormatCheck, BinlogRowImageCheck};
pub use self::privilege::SourcePrivilegeCheck;
pub use self::sharding::ShardingTablesCheck;
pub use self::table::TablesCheck;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Success,
    Fail,
    Warning,
}

/// A single check. Each check owns the connections and names it inspects.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    /// Never fails: problems, including cancellation, are reported in the result.
    async fn run(&self, token: &CancellationToken) -> CheckResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
pub struct CheckResult {
    #[getset(get = "pub", set = "pub")]
    id: u64,

    #[getset(get = "pub")]
    name: String,

    #[getset(get = "pub")]
    desc: String,

    #[getset(get = "pub")]
    state: CheckState,

    #[getset(get = "pub")]
    error_msg: String,

    /// How to fix a failure.
    #[getset(get = "pub")]
    instruction: String,

    #[getset(get = "pub", set = "pub")]
    extra: String,
}

impl CheckResult {
    pub fn new(name: &str, desc: &str) -> Self {
        CheckResult {
            id: 0,
            name: name.to_string(),
            desc: desc.to_string(),
            state: CheckState::Success,
            error_msg: String::new(),
            instruction: String::new(),
            extra: String::new(),
        }
    }

    pub fn fail<S: Into<String>>(mut self, msg: S, instruction: &str) -> Self {
        self.state = CheckState::Fail;
        self.error_msg = msg.into();
        self.instruction = instruction.to_string();
        self
    }

    pub fn warn<S: Into<String>>(mut self, msg: S, instruction: &str) -> Self {
        self.state = CheckState::Warning;
        self.error_msg = msg.into();
        self.instruction = instruction.to_string();
        self
    }

    pub fn is_failed(&self) -> bool {
        self.state == CheckState::Fail
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub passed: bool,
    pub total: i32,
    pub successful: i32,
    pub failed: i32,
    pub warning: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Results {
    pub results: Vec<CheckResult>,
    pub summary: Summary,
}

impl Results {
    fn from_results(results: Vec<CheckResult>) -> Self {
        let mut summary = Summary {
            total: results.len() as i32,
            ..Default::default()
        };
        for r in &results {
            match r.state() {
                CheckState::Success => summary.successful += 1,
                CheckState::Fail => summary.failed += 1,
                CheckState::Warning => summary.warning += 1,
            }
        }
        // warnings do not fail the pre-check
        summary.passed = summary.failed == 0;

        Results { results, summary }
    }
}

/// Runs every check concurrently and waits for all of them. A failing check never
/// stops its siblings.
pub async fn do_checks(token: &CancellationToken, checks: &[Arc<dyn Check>]) -> Results {
    let futures = checks.iter().map(|c| c.run(token));
    let mut results = join_all(futures).await;
    for (id, r) in results.iter_mut().enumerate() {
        r.set_id(id as u64);
    }

    Results::from_results(results)
}

/// Runs `sql` unless the token is cancelled first.
pub(crate) async fn query(db: &Arc<dyn Database>, token: &CancellationToken, sql: &str) -> CResult<Rows> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ReError::Canceled(format!("query [{}]", sql))),
        rows = db.query(sql) => rows,
    }
}

/// Value of a global variable, `None` when the server does not have it.
pub(crate) async fn global_variable(
    db: &Arc<dyn Database>,
    token: &CancellationToken,
    name: &str,
) -> CResult<Option<String>> {
    let sql = format!("SHOW GLOBAL VARIABLES LIKE '{}'", name);
    let rows = query(db, token, &sql).await?;

    Ok(rows.first().map(|r| common::db::cell(r, 1).to_string()))
}

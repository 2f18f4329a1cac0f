use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DBConfig;
use crate::db::{Database, DatabaseProvider, Rows};
use crate::err::re_error::ReError;
use crate::err::CResult;

/// In-memory database answering canned SQL.
#[derive(Debug, Default)]
pub struct MockDatabase {
    responses: HashMap<String, Result<Rows, String>>,
    delay: Option<Duration>,
    fail_close: bool,
    queries: Mutex<Vec<String>>,
    close_count: AtomicUsize,
}

impl MockDatabase {
    pub fn new() -> Self {
        MockDatabase::default()
    }

    pub fn with_rows(mut self, sql: &str, rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(|c| Some(c.to_string())).collect())
            .collect();
        self.responses.insert(sql.to_string(), Ok(rows));
        self
    }

    pub fn with_error(mut self, sql: &str, msg: &str) -> Self {
        self.responses.insert(sql.to_string(), Err(msg.to_string()));
        self
    }

    /// Answers `SHOW GLOBAL VARIABLES LIKE '<name>'` with one row.
    pub fn with_variable(self, name: &str, value: &str) -> Self {
        let sql = format!("SHOW GLOBAL VARIABLES LIKE '{}'", name);
        self.with_rows(&sql, vec![vec![name, value]])
    }

    /// Every query sleeps `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `close` counts the call and then fails.
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Database for MockDatabase {
    async fn query(&self, sql: &str) -> CResult<Rows> {
        self.queries.lock()?.push(sql.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(sql) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(msg)) => Err(ReError::MysqlQueryErr(msg.clone())),
            None => Err(ReError::MysqlQueryErr(format!("unexpected query: {}", sql))),
        }
    }

    async fn close(&self) -> CResult<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ReError::ConnectionError("close on broken connection".to_string()));
        }
        Ok(())
    }
}

/// Hands out registered mock databases by `host:port`.
#[derive(Debug, Default)]
pub struct MockDatabaseProvider {
    instances: HashMap<String, Arc<MockDatabase>>,
}

impl MockDatabaseProvider {
    pub fn new() -> Self {
        MockDatabaseProvider::default()
    }

    pub fn with_instance(mut self, cfg: &DBConfig, db: Arc<MockDatabase>) -> Self {
        self.instances.insert(cfg.instance_id(), db);
        self
    }
}

#[async_trait]
impl DatabaseProvider for MockDatabaseProvider {
    async fn open(&self, cfg: &DBConfig) -> CResult<Arc<dyn Database>> {
        match self.instances.get(&cfg.instance_id()) {
            Some(db) => Ok(db.clone() as Arc<dyn Database>),
            None => Err(ReError::ConnectionError(format!("no route to {}", cfg.instance_id()))),
        }
    }
}

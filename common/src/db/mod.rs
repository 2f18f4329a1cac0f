//! Database collaborators. Connection handling lives outside this workspace;
//! units only see these traits.

#[cfg(any(test, feature = "mock_api"))]
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DBConfig;
use crate::err::CResult;

/// Rows of a text-protocol result set, `None` for SQL NULL.
pub type Rows = Vec<Vec<Option<String>>>;

#[async_trait]
pub trait Database: Send + Sync {
    async fn query(&self, sql: &str) -> CResult<Rows>;

    async fn close(&self) -> CResult<()>;
}

#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    async fn open(&self, cfg: &DBConfig) -> CResult<Arc<dyn Database>>;
}

/// Cell `idx` of a row as text, empty for NULL or a missing column.
pub fn cell(row: &[Option<String>], idx: usize) -> &str {
    row.get(idx).and_then(|c| c.as_deref()).unwrap_or("")
}

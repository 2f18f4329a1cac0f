use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use binlog::LogEventType;
use common::config::{DBConfig, EventType};
use common::db::Rows;
use common::err::re_error::ReError;
use common::err::CResult;
use common::schema::QualifiedTable;

/// `file:pos` in the upstream binlog. An empty file name means the current position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinlogPosition {
    pub name: String,
    pub pos: u32,
}

impl BinlogPosition {
    pub fn new(name: &str, pos: u32) -> Self {
        BinlogPosition {
            name: name.to_string(),
            pos,
        }
    }
}

impl fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.pos)
    }
}

impl FromStr for BinlogPosition {
    type Err = ReError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReError::String(format!("invalid binlog position {}, expect file:pos", s));
        let (name, pos) = s.rsplit_once(':').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        let pos = pos.trim().parse::<u32>().map_err(|_| invalid())?;

        Ok(BinlogPosition::new(name.trim(), pos))
    }
}

/// A decoded binlog event. `position` is where the event ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationEvent {
    Rotate {
        next: BinlogPosition,
    },
    Query {
        position: BinlogPosition,
        /// Default schema of the session that ran the statement.
        schema: String,
        sql: String,
    },
    Rows {
        position: BinlogPosition,
        event_type: LogEventType,
        schema: String,
        table: String,
        rows: Rows,
    },
    Xid {
        position: BinlogPosition,
    },
}

/// Work handed to the downstream executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Ddl {
        position: BinlogPosition,
        schema: String,
        sqls: Vec<String>,
    },
    Dml {
        position: BinlogPosition,
        event: EventType,
        source: QualifiedTable,
        target: QualifiedTable,
        rows: Rows,
    },
    /// Transaction boundary.
    Xid { position: BinlogPosition },
}

/// Pulls decoded events from the upstream binlog.
#[async_trait]
pub trait Streamer: Send {
    /// Next event, `Ok(None)` once upstream is exhausted. Must be cancel safe: a dropped
    /// call loses no event.
    async fn next_event(&mut self) -> CResult<Option<ReplicationEvent>>;
}

#[async_trait]
pub trait StreamerProvider: Send + Sync {
    async fn open(&self, cfg: &DBConfig, from: &BinlogPosition) -> CResult<Box<dyn Streamer>>;
}

/// Executes jobs against the target.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn execute(&self, job: Job) -> CResult<()>;

    async fn close(&self) -> CResult<()>;
}

#[async_trait]
pub trait SinkProvider: Send + Sync {
    async fn open(&self, cfg: &DBConfig) -> CResult<Arc<dyn EventSink>>;
}

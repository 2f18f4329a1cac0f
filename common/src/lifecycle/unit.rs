use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::SubTaskConfig;
use crate::err::re_error::ReError;
use crate::err::CResult;
use crate::model::process::ProcessResult;
use crate::model::rpc::SqlOp;
use crate::model::status::{UnitStatus, UnitType};

/// A long-running processing unit of a sub-task, like the pre-check or the binlog sync.
///
/// The owning sub-task drives it:
///
///   init -> process -> (pause -> resume)* -> close
///
/// `process` and `resume` send exactly one `ProcessResult` before returning. Cancelling
/// the token asks the unit to stop early; the unit notices it cooperatively and reports
/// `is_canceled`.
#[async_trait]
pub trait Unit: Send + Sync {
    /// Builds connections, filters and any other state `process` needs.
    async fn init(&self) -> CResult<()>;

    async fn process(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>);

    /// Releases every resource. Idempotent and safe while `process` is in flight.
    async fn close(&self);

    /// Called after the sub-task cancelled the running `process`.
    fn pause(&self);

    /// Continues after `pause`.
    async fn resume(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>);

    /// Applies a new config. Only called while paused.
    async fn update(&self, _cfg: &SubTaskConfig) -> CResult<()> {
        Err(ReError::Unsupported(format!("update of {:?} unit", self.unit_type())))
    }

    /// Registers a manual operator on a binlog position.
    fn handle_sql(&self, _op: SqlOp, _args: Vec<String>, _binlog_pos: &str) -> CResult<()> {
        Err(ReError::Unsupported(format!("handle sqls of {:?} unit", self.unit_type())))
    }

    fn unit_type(&self) -> UnitType;

    /// Bounded units finish on their own, unbounded ones only stop on request or error.
    fn is_bounded(&self) -> bool;

    /// Last known status, without re-running any work.
    fn status(&self) -> UnitStatus;
}

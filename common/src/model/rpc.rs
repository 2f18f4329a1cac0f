//! Request and response shapes of the worker operations.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::model::status::{RelayStatus, SubTaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSubTaskRequest {
    /// Sub-task config in TOML.
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSubTaskRequest {
    pub task: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum TaskOp {
    Stop = 1,
    Pause = 2,
    Resume = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperateSubTaskRequest {
    pub op: TaskOp,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperateSubTaskResponse {
    pub op: TaskOp,
    pub result: bool,
    pub worker: String,
    pub msg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatusRequest {
    /// Empty for every sub-task.
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatusResponse {
    pub result: bool,
    pub worker: String,
    pub msg: String,
    pub sub_task_status: Vec<SubTaskStatus>,
    /// `None` when the worker runs without a relay unit.
    pub relay_status: Option<RelayStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum SqlOp {
    Skip = 0,
    Replace = 1,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleSubTaskSqlsRequest {
    pub name: String,
    pub op: SqlOp,
    /// Replacement statements for `Replace`.
    #[serde(default)]
    pub args: Vec<String>,
    /// `file:pos` of the query event to operate on.
    pub binlog_pos: String,
}

/// `msg` is empty iff `result` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonWorkerResponse {
    pub result: bool,
    pub worker: String,
    pub msg: String,
}

impl CommonWorkerResponse {
    pub fn ok(worker: &str) -> Self {
        CommonWorkerResponse {
            result: true,
            worker: worker.to_string(),
            msg: String::new(),
        }
    }

    pub fn fail<S: Into<String>>(worker: &str, msg: S) -> Self {
        CommonWorkerResponse {
            result: false,
            worker: worker.to_string(),
            msg: msg.into(),
        }
    }
}

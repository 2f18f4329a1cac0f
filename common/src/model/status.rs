use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::model::process::ProcessResult;
use crate::model::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum UnitType {
    Check = 1,
    Dump = 2,
    Load = 3,
    Sync = 4,
    Relay = 100,
}

/// Aggregate of one pre-check run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatus {
    pub passed: bool,
    pub total: i32,
    pub successful: i32,
    pub failed: i32,
    pub warning: i32,
    /// JSON of the per-check results.
    pub detail: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpStatus {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStatus {
    pub finished_bytes: i64,
    pub total_bytes: i64,
    pub progress: String,
    pub meta_binlog: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub total_events: i64,
    pub skipped_events: i64,
    pub total_jobs: i64,
    /// Position of the last event pulled from upstream.
    pub sync_position: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    pub stage: Option<Stage>,
    pub relay_binlog: String,
}

/// Unit-specific status snapshot, keyed by the unit kind.
///
/// Adjacently tagged, so an all-default payload still names its variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "status", rename_all = "lowercase")]
pub enum UnitStatus {
    Msg(String),
    Check(CheckStatus),
    Dump(DumpStatus),
    Load(LoadStatus),
    Sync(SyncStatus),
}

impl Default for UnitStatus {
    fn default() -> Self {
        UnitStatus::Msg(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTaskStatus {
    pub name: String,
    pub stage: Stage,
    /// Unit currently owning the sub-task, `None` once every unit is done.
    pub unit: Option<UnitType>,
    /// Last result reported by the current unit.
    pub result: Option<ProcessResult>,
    pub status: UnitStatus,
}

use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use common::config::EventType;
use common::err::re_error::ReError;
use common::err::CResult;

/// Value of the `binlog_format` server variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinlogType {
    /// Statement-based replication: every data-changing statement is logged as text.
    Statement,

    /// Row-based replication: the changed rows are logged. Schema changes are still
    /// logged as statements.
    Row,

    /// The server picks statement or row per statement.
    Mixed,
}

impl FromStr for BinlogType {
    type Err = ReError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STATEMENT" => Ok(BinlogType::Statement),
            "ROW" => Ok(BinlogType::Row),
            "MIXED" => Ok(BinlogType::Mixed),
            other => Err(ReError::String(format!("unknown binlog format {}", other))),
        }
    }
}

/// Type code in the header of a binlog event.
///
/// @see https://dev.mysql.com/doc/dev/mysql-server/latest/namespacemysql_1_1binlog_1_1event.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LogEventType {
    UNKNOWN_EVENT = 0,
    /// Replaced by FORMAT_DESCRIPTION_EVENT in binlog v4.
    START_EVENT_V3 = 1,
    /// A statement, logged in both statement and row format.
    QUERY_EVENT = 2,
    STOP_EVENT = 3,
    /// Switch to the next binlog file.
    ROTATE_EVENT = 4,
    INTVAR_EVENT = 5,
    LOAD_EVENT = 6,
    SLAVE_EVENT = 7,
    CREATE_FILE_EVENT = 8,
    APPEND_BLOCK_EVENT = 9,
    EXEC_LOAD_EVENT = 10,
    DELETE_FILE_EVENT = 11,
    NEW_LOAD_EVENT = 12,
    RAND_EVENT = 13,
    USER_VAR_EVENT = 14,
    /// First event of every binlog v4 file.
    FORMAT_DESCRIPTION_EVENT = 15,
    /// Commit.
    XID_EVENT = 16,
    BEGIN_LOAD_QUERY_EVENT = 17,
    EXECUTE_LOAD_QUERY_EVENT = 18,
    /// Precedes row events and describes their table.
    TABLE_MAP_EVENT = 19,

    /// Row events v0, written by 5.1.0 to 5.1.15.
    PRE_GA_WRITE_ROWS_EVENT = 20,
    PRE_GA_UPDATE_ROWS_EVENT = 21,
    PRE_GA_DELETE_ROWS_EVENT = 22,

    /// Row events v1.
    WRITE_ROWS_EVENT_V1 = 23,
    UPDATE_ROWS_EVENT_V1 = 24,
    DELETE_ROWS_EVENT_V1 = 25,

    INCIDENT_EVENT = 26,
    HEARTBEAT_LOG_EVENT = 27,
    IGNORABLE_LOG_EVENT = 28,
    ROWS_QUERY_LOG_EVENT = 29,

    /// Row events v2.
    WRITE_ROWS_EVENT = 30,
    UPDATE_ROWS_EVENT = 31,
    DELETE_ROWS_EVENT = 32,

    GTID_LOG_EVENT = 33,
    ANONYMOUS_GTID_LOG_EVENT = 34,
    PREVIOUS_GTIDS_LOG_EVENT = 35,
    TRANSACTION_CONTEXT_EVENT = 36,
    VIEW_CHANGE_EVENT = 37,
    XA_PREPARE_LOG_EVENT = 38,
    PARTIAL_UPDATE_ROWS_EVENT = 39,
    TRANSACTION_PAYLOAD_EVENT = 40,
    HEARTBEAT_LOG_EVENT_V2 = 41,

    /* MariaDB events */
    ANNOTATE_ROWS_EVENT = 160,
    BINLOG_CHECKPOINT_EVENT = 161,
    GTID_EVENT = 162,
    GTID_LIST_EVENT = 163,
    START_ENCRYPTION_EVENT = 164,
}

impl LogEventType {
    /// The DML kind of a row event. Any other event type is an error.
    pub fn dml_event_type(self) -> CResult<EventType> {
        match self {
            LogEventType::PRE_GA_WRITE_ROWS_EVENT
            | LogEventType::WRITE_ROWS_EVENT_V1
            | LogEventType::WRITE_ROWS_EVENT => Ok(EventType::InsertEvent),
            LogEventType::PRE_GA_UPDATE_ROWS_EVENT
            | LogEventType::UPDATE_ROWS_EVENT_V1
            | LogEventType::UPDATE_ROWS_EVENT => Ok(EventType::UpdateEvent),
            LogEventType::PRE_GA_DELETE_ROWS_EVENT
            | LogEventType::DELETE_ROWS_EVENT_V1
            | LogEventType::DELETE_ROWS_EVENT => Ok(EventType::DeleteEvent),
            other => Err(ReError::InvalidEventType(format!("{:?}", other))),
        }
    }
}

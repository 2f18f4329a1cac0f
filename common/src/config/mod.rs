pub mod config;
pub mod event_rule;
pub mod route;

pub use config::{read_config, DBConfig, SubTaskConfig, DEFAULT_CHECK_TIMEOUT_SECS};
pub use event_rule::{Action, BinlogEventRule, EventType};
pub use route::RouteRule;

#![allow(non_camel_case_types)]

pub mod ast;
pub mod b_type;
pub mod event_filter;

pub use b_type::{BinlogType, LogEventType};
pub use event_filter::{BinlogEventFilter, EventFilter};

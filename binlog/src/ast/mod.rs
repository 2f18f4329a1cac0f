pub mod query_parser;

pub use query_parser::{ddl_event_type, QueryParser, QueryStatement};

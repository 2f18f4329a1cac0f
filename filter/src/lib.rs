pub mod filter;
pub mod glob;
pub mod router;
pub mod system;

pub use filter::Filter;
pub use glob::Glob;
pub use router::{RuleRouter, TableRouter};
pub use system::is_system_schema;

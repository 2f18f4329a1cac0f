pub mod check;
pub mod checker;
pub mod fetch;
pub mod sharding;

pub use checker::Checker;

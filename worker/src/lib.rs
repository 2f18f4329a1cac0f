pub mod factory;
pub mod subtask;
pub mod worker;

pub use factory::{DefaultUnitFactory, UnitFactory};
pub use subtask::SubTask;
pub use worker::Worker;

#[cfg(test)]
mod mock;

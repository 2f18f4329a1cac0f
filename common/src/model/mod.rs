pub mod process;
pub mod rpc;
pub mod stage;
pub mod status;

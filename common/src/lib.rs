pub mod config;
pub mod db;
pub mod err;
pub mod lifecycle;
pub mod log;
pub mod model;
pub mod schema;

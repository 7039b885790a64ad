pub mod config;
pub mod report;
pub mod sender;
pub mod server;

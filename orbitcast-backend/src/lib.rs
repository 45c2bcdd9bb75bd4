pub mod config;
pub mod iss;
pub mod logging;
pub mod server;

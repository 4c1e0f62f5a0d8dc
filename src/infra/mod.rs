pub mod config;
pub mod logging;
pub mod report;

pub use config::{AppConfig, ConfigManager};
pub use report::error_chain;

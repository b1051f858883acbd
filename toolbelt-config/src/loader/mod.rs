mod config;
mod manager;


pub use config::ToolbeltConfig;
pub use manager::{CONFIG_FILE_NAME, ConfigManager, ConfigSource};

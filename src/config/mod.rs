mod config;

pub use config::{ConfigError, ShellConfig, default_config_path};

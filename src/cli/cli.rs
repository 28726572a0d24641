use std::path::PathBuf;

use clap::Parser;

use crate::application::data::{ColorMode, LogLevel};

/// Interactive shell over a lazily cached directory tree
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Directory to open, defaults to the home directory
    pub root: Option<PathBuf>,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// YAML config file, defaults to ~/.canopy.yaml when present
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    #[clap(long, value_enum)]
    pub color: Option<ColorMode>,

    /// Include entries whose name starts with a dot
    #[clap(long)]
    pub show_hidden: bool,

    /// Read the whole tree up front instead of on demand
    #[clap(long)]
    pub preload: bool,

    /// Neither read nor write the command history file
    #[clap(long)]
    pub no_history: bool,
}

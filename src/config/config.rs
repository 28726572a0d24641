use clap::ValueEnum as _;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{application::data::ColorMode, ext::PathExt};

const CONFIG_FILE_NAME: &str = ".canopy.yaml";

/// Location of the per-user config file.
pub fn default_config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

/// Settings read from the YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfig {
    pub root: Option<PathBuf>,
    pub color: Option<ColorMode>,
    pub show_hidden: Option<bool>,
    pub preload: Option<bool>,
    pub history_file: Option<PathBuf>,
}

impl ShellConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!("Opening config file: {}", path.best_effort_display());
        let contents = fs::read_to_string(path).context(ReadSnafu {
            file_path: path.best_effort_display(),
        })?;
        debug!("Successfully read config file: {} bytes", contents.len());
        contents.as_str().try_into()
    }

    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn from_optional_path(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_path(path)
        } else {
            debug!("No config file at {}", path.best_effort_display());
            Ok(Self::default())
        }
    }

    fn parse_top_level(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Self, ConfigError> {
        let color = match string_value(top_level, "color")? {
            Some(value) => Some(ColorMode::from_str(value, true).map_err(|_| {
                ConfigError::InvalidValue {
                    key: "color",
                    expected: "one of auto, always, never",
                }
            })?),
            None => None,
        };

        Ok(Self {
            root: string_value(top_level, "root")?.map(PathBuf::from),
            color,
            show_hidden: bool_value(top_level, "show_hidden")?,
            preload: bool_value(top_level, "preload")?,
            history_file: string_value(top_level, "history_file")?.map(PathBuf::from),
        })
    }
}

fn lookup<'a>(
    top_level: &'a LinkedHashMap<Yaml, Yaml>,
    key: &'static str,
) -> Option<&'a Yaml<'a>> {
    top_level
        .get(&Yaml::Value(Scalar::String(Cow::Borrowed(key))))
        .filter(|value| !matches!(value, Yaml::Value(Scalar::Null)))
}

fn string_value<'a>(
    top_level: &'a LinkedHashMap<Yaml, Yaml>,
    key: &'static str,
) -> Result<Option<&'a str>, ConfigError> {
    lookup(top_level, key)
        .map(|value| {
            value.as_str().context(InvalidValueSnafu {
                key,
                expected: "a string",
            })
        })
        .transpose()
}

fn bool_value(
    top_level: &LinkedHashMap<Yaml, Yaml>,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match lookup(top_level, key) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::Boolean(value))) => Ok(Some(*value)),
        Some(_) => InvalidValueSnafu {
            key,
            expected: "a boolean",
        }
        .fail(),
    }
}

impl TryFrom<&str> for ShellConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents =
            Yaml::load_from_str(contents).map_err(|e| ConfigError::ParseError { source: e })?;
        let Some(document) = documents.first() else {
            return Ok(Self::default());
        };

        let top_level = document.as_mapping().ok_or(ConfigError::TopLevelNotMap)?;
        Self::parse_top_level(top_level)
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },
}

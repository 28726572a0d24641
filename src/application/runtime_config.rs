use std::path::{Path, PathBuf};

use crate::application::data::ColorMode;
use crate::cli::Cli;
use crate::config::{ConfigError, ShellConfig, default_config_path};
use crate::ext::PathExt;
use crate::filesystem::HiddenEntries;
use crate::shell::repl::default_history_path;

/// Settings the application runs with, after merging the command line over
/// the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub root: PathBuf,
    pub color: ColorMode,
    pub hidden: HiddenEntries,
    pub preload: bool,
    pub history_file: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Reads the config file named by the command line, or the per-user one.
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let home = dirs::home_dir();
        let file_config = match (&cli.config, &home) {
            (Some(path), _) => ShellConfig::from_path(&path.expand_home(home.as_deref()))?,
            (None, Some(home)) => ShellConfig::from_optional_path(&default_config_path(home))?,
            (None, None) => ShellConfig::default(),
        };
        Ok(Self::merge(cli, file_config, home.as_deref()))
    }

    pub fn merge(cli: Cli, file_config: ShellConfig, home: Option<&Path>) -> Self {
        let root = cli
            .root
            .or(file_config.root)
            .map(|root| root.expand_home(home))
            .or_else(|| home.map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        let history_file = if cli.no_history {
            None
        } else {
            file_config
                .history_file
                .map(|path| path.expand_home(home))
                .or_else(|| home.map(default_history_path))
        };

        Self {
            root,
            color: cli.color.or(file_config.color).unwrap_or_default(),
            hidden: (cli.show_hidden || file_config.show_hidden.unwrap_or(false)).into(),
            preload: cli.preload || file_config.preload.unwrap_or(false),
            history_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use rstest::*;

    const HOME: &str = "/home/user";

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("canopy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_point_at_home() {
        let config = RuntimeConfig::merge(cli(&[]), ShellConfig::default(), Some(Path::new(HOME)));

        assert_eq!(
            config,
            RuntimeConfig {
                root: PathBuf::from(HOME),
                color: ColorMode::Auto,
                hidden: HiddenEntries::Skip,
                preload: false,
                history_file: Some(PathBuf::from("/home/user/.canopy_history")),
            }
        );
    }

    #[test]
    fn without_home_the_working_directory_is_used() {
        let config = RuntimeConfig::merge(cli(&[]), ShellConfig::default(), None);

        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.history_file, None);
    }

    #[test]
    fn file_values_apply_when_cli_is_silent() {
        let file_config = ShellConfig {
            root: Some(PathBuf::from("~/src")),
            color: Some(ColorMode::Never),
            show_hidden: Some(true),
            preload: Some(true),
            history_file: Some(PathBuf::from("~/.cache/history")),
        };
        let config = RuntimeConfig::merge(cli(&[]), file_config, Some(Path::new(HOME)));

        assert_eq!(config.root, PathBuf::from("/home/user/src"));
        assert_eq!(config.color, ColorMode::Never);
        assert_eq!(config.hidden, HiddenEntries::Show);
        assert!(config.preload);
        assert_eq!(
            config.history_file,
            Some(PathBuf::from("/home/user/.cache/history"))
        );
    }

    #[rstest]
    #[case(&["/srv", "--color", "always"], "/srv", ColorMode::Always)]
    #[case(&["--color", "auto"], "/etc", ColorMode::Auto)]
    fn cli_overrides_file(
        #[case] args: &[&str],
        #[case] expected_root: &str,
        #[case] expected_color: ColorMode,
    ) {
        let file_config = ShellConfig {
            root: Some(PathBuf::from("/etc")),
            color: Some(ColorMode::Never),
            ..Default::default()
        };
        let config = RuntimeConfig::merge(cli(args), file_config, Some(Path::new(HOME)));

        assert_eq!(config.root, PathBuf::from(expected_root));
        assert_eq!(config.color, expected_color);
    }

    #[test]
    fn no_history_wins_over_the_file() {
        let file_config = ShellConfig {
            history_file: Some(PathBuf::from("/tmp/history")),
            ..Default::default()
        };
        let config = RuntimeConfig::merge(cli(&["--no-history"]), file_config, None);
        assert_eq!(config.history_file, None);
    }

    #[test]
    fn resolved_root_defaults_to_the_home_directory() {
        let file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let path = file.path().to_str().unwrap();

        let config = RuntimeConfig::resolve(cli(&["--config", path, "--no-history"])).unwrap();

        let expected = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        assert_eq!(config.root, expected);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let result = RuntimeConfig::resolve(cli(&["--config", "/definitely/missing.yaml"]));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}

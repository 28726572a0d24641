use snafu::Snafu;
use snafu::prelude::*;
use tracing::debug;

use crate::application::RuntimeConfig;
use crate::cli::Cli;
use crate::config::ConfigError;
use crate::shell::{Session, SessionError, Shell, repl, repl::ReplError};

pub struct Application;

impl Application {
    pub fn run(cli: Cli) -> Result<(), ApplicationError> {
        let config = RuntimeConfig::resolve(cli).context(ConfigurationSnafu)?;
        debug!("Runtime config: {:?}", config);

        colored::control::set_override(config.color.enabled());

        let session = Session::open(&config.root, config.hidden, config.preload)
            .context(SessionStartSnafu)?;
        let mut shell = Shell::new(session);
        repl::run(&mut shell, config.history_file.as_deref()).context(InteractionSnafu)?;

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigurationError { source: ConfigError },
    #[snafu(display("Critical failure encountered while opening the tree"))]
    SessionStartError { source: SessionError },
    #[snafu(display("Critical failure encountered while reading commands"))]
    InteractionError { source: ReplError },
}

//! Command-line configuration for the `snapkv` binary.

use crate::storage::DEFAULT_SNAPSHOT_PATH;
use std::path::PathBuf;
use thiserror::Error;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Snapshot file to load at startup and write on every mutation
    pub snapshot_path: PathBuf,
    /// A command to run once instead of starting a session
    pub command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            command: Vec::new(),
        }
    }
}

/// What the process should do after reading its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run(Config),
    Help,
    Version,
}

/// Errors from argument parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

impl Config {
    /// Parses configuration from command-line arguments (without the
    /// program name).
    ///
    /// Options are only recognised before the first command word, so
    /// `snapkv --snapshot s.json SET k v --ttl 5` passes `--ttl` through to
    /// the command.
    pub fn from_args<I, S>(args: I) -> Result<Action, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter().map(Into::<String>::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--snapshot" | "-s" => {
                    let path = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    config.snapshot_path = PathBuf::from(path);
                }
                "--help" | "-h" => return Ok(Action::Help),
                "--version" | "-v" => return Ok(Action::Version),
                _ => {
                    if let Some(path) = arg.strip_prefix("--snapshot=") {
                        config.snapshot_path = PathBuf::from(path);
                    } else if arg.starts_with('-') {
                        return Err(ConfigError::UnknownArgument(arg));
                    } else {
                        config.command.push(arg);
                        config.command.extend(args.by_ref());
                    }
                }
            }
        }

        Ok(Action::Run(config))
    }
}

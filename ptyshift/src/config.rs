//! Resolving the command line into what this run will do.

use crate::cli::Cli;
use crate::log::Level;
use ptyshift_attach::{AttachmentMode, PidError, TargetPid};
use ptyshift_pty::SpawnMode;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No pid specified to attach")]
    MissingPid,
    #[error(transparent)]
    Pid(#[from] PidError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Move an existing process onto this terminal.
    Attach {
        pid: TargetPid,
        mode: AttachmentMode,
        force_stdio: bool,
    },
    /// Open a fresh pty and optionally launch a command on it.
    Create { spawn: SpawnMode, command: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Applied once, as the default of the tracing filter installed by
    /// `main`. Library components log through `tracing` and never see it.
    pub verbosity: Level,
    pub invocation: Invocation,
}

impl TryFrom<Cli> for SessionConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let verbosity = if cli.verbose { Level::Debug } else { Level::Info };

        let invocation = if cli.create || cli.create_redirected {
            let spawn = match (cli.create_redirected, cli.args.is_empty()) {
                (_, true) => SpawnMode::None,
                (true, false) => SpawnMode::DetachedWithRedirectedStdio,
                (false, false) => SpawnMode::DetachedWithEnv,
            };
            Invocation::Create {
                spawn,
                command: cli.args,
            }
        } else {
            let pid = cli.args.first().ok_or(ConfigError::MissingPid)?.parse()?;
            let mode = if cli.steal {
                AttachmentMode::Steal
            } else {
                AttachmentMode::Normal
            };
            Invocation::Attach {
                pid,
                mode,
                force_stdio: cli.force_stdio,
            }
        };

        Ok(Self {
            verbosity,
            invocation,
        })
    }
}

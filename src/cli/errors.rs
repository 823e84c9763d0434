use std::io;

use thiserror::Error;

use crate::errors::FormError;

/// Fatal shell errors; the process exits with these.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("Input error: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

/// Per-command errors; reported and the shell keeps running.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No form is open. Use `open <form>` first.")]
    NoSession,
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("exit requested")]
    ExitRequested,
}

pub type CommandResult = Result<(), CommandError>;

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Input(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Input(err.to_string())
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Form(inner) => CliError::Form(inner),
            other => CliError::Command(other.to_string()),
        }
    }
}

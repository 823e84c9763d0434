//! Interactive console for filling and submitting master-data forms.

pub mod commands;
pub mod context;
pub mod errors;
pub mod help;
pub mod output;
pub mod registry;
pub mod shell;

pub use context::{CliMode, ShellContext};
pub use errors::{CliError, CommandError, CommandResult};
pub use shell::{run_cli, SCRIPT_ENV};

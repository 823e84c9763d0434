use strsim::levenshtein;

use crate::config::{ConfigManager, EngineConfig};
use crate::form::{FormModel, SteppedForm};
use crate::storage::JsonRecordStore;

use super::commands;
use super::errors::{CliError, CommandError};
use super::output;
use super::registry::{CommandEntry, CommandRegistry};

pub type Session = SteppedForm<Box<dyn FormModel>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub config: EngineConfig,
    pub store: JsonRecordStore,
    pub session: Option<Session>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config = ConfigManager::new()?.load()?;
        Self::with_config(mode, config)
    }

    pub fn with_config(mode: CliMode, config: EngineConfig) -> Result<Self, CliError> {
        let store = JsonRecordStore::from_config(&config)?;
        Ok(Self {
            mode,
            registry: CommandRegistry::new(commands::all_definitions()),
            config,
            store,
            session: None,
            last_command: None,
            running: true,
        })
    }

    pub fn prompt(&self) -> String {
        match &self.session {
            Some(session) => format!(
                "stepform[{} {}/{}]> ",
                session.model().name(),
                session.active_step() + 1,
                session.step_count()
            ),
            None => "stepform> ".to_string(),
        }
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn session(&self) -> Result<&Session, CommandError> {
        self.session.as_ref().ok_or(CommandError::NoSession)
    }

    pub(crate) fn session_mut(&mut self) -> Result<&mut Session, CommandError> {
        self.session.as_mut().ok_or(CommandError::NoSession)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let best = self
            .registry
            .names()
            .map(|key| (levenshtein(key, input), key))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{}`?", best));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::NoSession => {
                output::error("No form is open.");
                output::hint("Try `forms` to list forms, then `open part`.");
            }
            other => output::error(other),
        }
    }
}

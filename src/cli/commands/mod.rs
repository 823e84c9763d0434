pub mod collection;
pub mod records;
pub mod session;
pub mod system;

use super::errors::CommandError;
use super::registry::CommandEntry;

pub(crate) fn all_definitions() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(system::definitions());
    commands.extend(session::definitions());
    commands.extend(collection::definitions());
    commands.extend(records::definitions());
    commands
}

pub(crate) fn require<'a>(args: &[&'a str], index: usize, usage: &str) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {usage}")))
}

pub(crate) fn parse_index(raw: &str) -> Result<usize, CommandError> {
    raw.parse::<usize>()
        .map_err(|_| CommandError::InvalidArguments(format!("`{raw}` is not a valid item index")))
}

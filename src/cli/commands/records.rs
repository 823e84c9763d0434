use serde_json::Value;

use crate::cli::context::ShellContext;
use crate::cli::errors::CommandResult;
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::masters::MasterKind;
use crate::storage::{CREATED_AT, ID_FIELD, UPDATED_AT};

use super::require;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "list",
        "List stored records of a form",
        "list <form>",
        cmd_list,
    )]
}

fn cmd_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let kind: MasterKind = require(args, 0, "list <form>")?.parse()?;
    let records = context.store.list(kind.name())?;
    output::section(format!("{} records", kind.title()));
    if records.is_empty() {
        output::info("No records stored yet.");
        return Ok(());
    }
    for record in &records {
        let id = record.get(ID_FIELD).and_then(Value::as_str).unwrap_or("-");
        let stamp = record
            .get(UPDATED_AT)
            .or_else(|| record.get(CREATED_AT))
            .and_then(Value::as_str)
            .unwrap_or("");
        output::line(format!("  {id}  {}  {stamp}", summary(record)));
    }
    Ok(())
}

/// First plain text field other than the bookkeeping ones.
fn summary(record: &Value) -> String {
    record
        .as_object()
        .and_then(|fields| {
            fields
                .iter()
                .filter(|(key, _)| ![ID_FIELD, CREATED_AT, UPDATED_AT].contains(&key.as_str()))
                .find_map(|(_, value)| value.as_str().filter(|text| !text.is_empty()))
        })
        .unwrap_or("")
        .to_string()
}

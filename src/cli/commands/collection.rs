use crate::cli::context::ShellContext;
use crate::cli::errors::CommandResult;
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::form::{ErrorMap, FieldPath};

use super::{parse_index, require};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("add", "Append an item to a group", "add <group>", cmd_add),
        CommandEntry::new(
            "remove",
            "Remove an item from a group",
            "remove <group> <index>",
            cmd_remove,
        ),
        CommandEntry::new(
            "move",
            "Move an item within a group",
            "move <group> <from> <to>",
            cmd_move,
        ),
        CommandEntry::new(
            "toggle",
            "Expand or collapse an item",
            "toggle <group> <index>",
            cmd_toggle,
        ),
        CommandEntry::new("items", "List the items of a group", "items <group>", cmd_items),
    ]
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let group = require(args, 0, "add <group>")?;
    let session = context.session_mut()?;
    session.append(group)?;
    let count = session.items(group)?.len();
    output::success(format!("Added {group}[{}].", count - 1));
    Ok(())
}

fn cmd_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "remove <group> <index>";
    let group = require(args, 0, usage)?;
    let index = parse_index(require(args, 1, usage)?)?;
    context.session_mut()?.remove(group, index)?;
    output::success(format!("Removed {group}[{index}]."));
    Ok(())
}

fn cmd_move(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "move <group> <from> <to>";
    let group = require(args, 0, usage)?;
    let from = parse_index(require(args, 1, usage)?)?;
    let to = parse_index(require(args, 2, usage)?)?;
    context.session_mut()?.move_item(group, from, to)?;
    output::success(format!("Moved {group}[{from}] to position {to}."));
    Ok(())
}

fn cmd_toggle(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "toggle <group> <index>";
    let group = require(args, 0, usage)?;
    let index = parse_index(require(args, 1, usage)?)?;
    let expanded = context.session_mut()?.toggle(group, index)?;
    let state = if expanded { "expanded" } else { "collapsed" };
    output::info(format!("{group}[{index}] {state}."));
    Ok(())
}

fn cmd_items(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let group = require(args, 0, "items <group>")?;
    let session = context.session()?;
    let items = session.items(group)?;
    let group_path = FieldPath::parse(group)?;
    if items.is_empty() {
        output::info(format!("`{group}` has no items."));
        return Ok(());
    }
    for item in items {
        let state = match (item.expanded, item.manually_collapsed) {
            (true, _) => "expanded",
            (false, true) => "collapsed (manual)",
            (false, false) => "collapsed",
        };
        let errors = errors_within(session.errors(), &group_path.at(item.index));
        output::line(format!("  {group}[{}] {state}, {errors} error(s)", item.index));
    }
    Ok(())
}

fn errors_within(errors: &ErrorMap, item: &FieldPath) -> usize {
    errors.keys().filter(|path| item.covers(path)).count()
}

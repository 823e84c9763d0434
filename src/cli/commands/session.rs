use serde_json::Value;

use crate::cli::context::{Session, ShellContext};
use crate::cli::errors::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::form::{Banner, FormEvent, FormModel, SteppedForm};
use crate::masters::MasterKind;

use super::require;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("forms", "List available forms", "forms", cmd_forms),
        CommandEntry::new(
            "open",
            "Start a form, or edit a stored record",
            "open <form> [record-id]",
            cmd_open,
        ),
        CommandEntry::new("show", "Render the active step", "show", cmd_show),
        CommandEntry::new(
            "set",
            "Write a field value",
            "set <path> <value>",
            cmd_set,
        ),
        CommandEntry::new("errors", "List visible validation errors", "errors", cmd_errors),
        CommandEntry::new(
            "next",
            "Validate the step and advance, or submit from the last step",
            "next",
            cmd_next,
        ),
        CommandEntry::new("back", "Return to the previous step", "back", cmd_back),
        CommandEntry::new("close", "Discard the open form", "close", cmd_close),
    ]
}

fn cmd_forms(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::section("Forms");
    for kind in MasterKind::all() {
        output::line(format!("  {:<11} {}", kind.name(), kind.title()));
    }
    Ok(())
}

fn cmd_open(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let kind: MasterKind = require(args, 0, "open <form> [record-id]")?.parse()?;
    let mut session: Session = SteppedForm::new(kind.model(), &context.config)?;
    if let Some(id) = args.get(1) {
        session.load(&context.store, id)?;
    }

    if context.session.as_ref().is_some_and(|open| open.is_dirty()) {
        output::warning("Discarded unsaved changes of the previous form.");
    }
    match session.record_id() {
        Some(id) => output::success(format!("Editing {} `{}`.", kind.title(), id)),
        None => output::success(format!("New {}.", kind.title())),
    }
    context.session = Some(session);
    render(context.session()?)
}

fn cmd_show(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    render(context.session()?)
}

fn cmd_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "set <path> <value>";
    let path = require(args, 0, usage)?;
    require(args, 1, usage)?;
    let value = args[1..].join(" ");
    let session = context.session_mut()?;
    session.set_value(path, Value::String(value))?;
    let visible = session
        .errors()
        .iter()
        .find(|(field, _)| field.to_string() == path);
    if let Some((_, message)) = visible {
        output::warning(format!("{path}: {message}"));
    }
    Ok(())
}

fn cmd_errors(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let session = context.session()?;
    if session.errors().is_empty() {
        output::info("No validation errors.");
    } else {
        print_errors(session);
    }
    Ok(())
}

fn cmd_next(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let event = {
        let ShellContext { session, store, .. } = context;
        let session = session.as_mut().ok_or(CommandError::NoSession)?;
        session.next(store)?
    };

    match event {
        FormEvent::Advanced { .. } => render(context.session()?)?,
        FormEvent::Blocked { errors } => {
            output::error(format!("Step has {errors} error(s)."));
            print_errors(context.session()?);
        }
        FormEvent::Rejected { .. } => {
            let session = context.session()?;
            if let Some(banner) = session.banner() {
                output::error(banner.message());
            }
            print_errors(session);
        }
        FormEvent::Saved { data } => {
            let id = data
                .as_ref()
                .and_then(|data| data.get("id"))
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string();
            let message = context
                .session()?
                .banner()
                .map(|banner| banner.message().to_string())
                .unwrap_or_default();
            output::success(format!("{message} Record id: {id}"));
            context.session = None;
        }
        FormEvent::Failed { message } => output::error(message),
        FormEvent::Busy => output::warning("A submission is already in progress."),
    }
    Ok(())
}

fn cmd_back(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let session = context.session_mut()?;
    session.back();
    render(session)
}

fn cmd_close(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.session.take() {
        Some(session) => output::info(format!("Closed {}.", session.model().title())),
        None => output::info("No form is open."),
    }
    Ok(())
}

fn render(session: &Session) -> CommandResult {
    let step = session.current_step();
    output::section(format!(
        "{}: step {}/{} {}",
        session.model().title(),
        session.active_step() + 1,
        session.step_count(),
        step.title
    ));

    if let Some(banner) = session.banner() {
        match banner {
            Banner::Saved(message) => output::success(message),
            Banner::Rejected(message) | Banner::Failed(message) => output::error(message),
        }
    }

    if step.scope.is_empty() {
        let preview = session.payload_preview()?;
        output::line(pretty(&preview));
    } else {
        for path in &step.scope {
            let value = session.tree().get(path).cloned().unwrap_or(Value::Null);
            output::line(format!("{path} = {}", pretty(&value)));
        }
        for group in session.collection_paths() {
            if !step.scope.iter().any(|scope| scope.covers(&group)) {
                continue;
            }
            for item in session.items(&group.to_string())? {
                let marker = if item.expanded { "[-]" } else { "[+]" };
                output::line(format!("  {marker} {group}[{}]", item.index));
            }
        }
    }

    if !session.errors().is_empty() {
        print_errors(session);
    }
    Ok(())
}

fn print_errors(session: &Session) {
    for (path, message) in session.errors() {
        output::line(format!("  ! {path}: {message}"));
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

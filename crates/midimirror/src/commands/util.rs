//! Shared helpers for command handlers.

use std::io::IsTerminal;

use midimirror_core::ParentRef;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal on stdin there is nobody to ask, so the action is
/// refused instead.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

pub fn opt_or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_owned()
}

pub fn parent_label(parent: Option<ParentRef>) -> String {
    parent.map_or_else(|| "-".into(), |p| p.to_string())
}

//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};

use hvaclink_core::{Device, HvacSession};

use crate::error::CliError;

/// Load the device list and look up one device by serial.
pub async fn fetch_device(session: &HvacSession, serial: &str) -> Result<Device, CliError> {
    session.refresh().await?;
    session.device(serial).ok_or_else(|| CliError::NotFound {
        resource_type: "device".into(),
        identifier: serial.into(),
        list_command: "devices list".into(),
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal on stdin there is nobody to ask, so the operation is
/// refused instead.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(io::Error::other)?;
    Ok(confirmed)
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Format an optional float with one decimal, or "-".
pub fn opt_f64(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.1}{unit}"))
}

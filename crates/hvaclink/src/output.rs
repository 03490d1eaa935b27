//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use hvaclink_core::{Notification, NotificationLevel};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// One line per notification: `HH:MM:SS  level  message`.
pub fn format_notification(note: &Notification, color: bool) -> String {
    let time = note.at.format("%H:%M:%S");
    let level = match note.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Info => "info",
        NotificationLevel::Error => "error",
    };
    if !color {
        return format!("{time}  {level:<5}  {}", note.message);
    }
    let level = match note.level {
        NotificationLevel::Success => format!("{:<5}", level.green()),
        NotificationLevel::Info => format!("{:<5}", level.cyan()),
        NotificationLevel::Error => format!("{:<5}", level.red().bold()),
    };
    format!("{}  {level}  {}", time.dimmed(), note.message)
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item detail views don't use the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print a status line to stderr, respecting quiet mode.
pub fn print_status(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Item {
        serial: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Serial")]
        serial: &'static str,
    }

    fn items() -> Vec<Item> {
        vec![Item { serial: "A1" }, Item { serial: "B2" }]
    }

    #[test]
    fn plain_emits_one_id_per_line() {
        let out = render_list(
            &OutputFormat::Plain,
            &items(),
            |i| Row { serial: i.serial },
            |i| i.serial.to_owned(),
        )
        .unwrap();
        assert_eq!(out, "A1\nB2");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            &OutputFormat::JsonCompact,
            &items(),
            |i| Row { serial: i.serial },
            |i| i.serial.to_owned(),
        )
        .unwrap();
        assert_eq!(out, r#"[{"serial":"A1"},{"serial":"B2"}]"#);
    }

    #[test]
    fn table_has_header() {
        let out = render_list(
            &OutputFormat::Table,
            &items(),
            |i| Row { serial: i.serial },
            |i| i.serial.to_owned(),
        )
        .unwrap();
        assert!(out.contains("Serial"));
        assert!(out.contains("B2"));
    }

    #[test]
    fn uncolored_notification_line() {
        let note = Notification {
            level: NotificationLevel::Error,
            message: "Server is unreachable. Please try again later.".into(),
            at: chrono::Utc::now(),
        };
        let line = format_notification(&note, false);
        assert!(line.contains("error"));
        assert!(line.ends_with("Server is unreachable. Please try again later."));
    }
}

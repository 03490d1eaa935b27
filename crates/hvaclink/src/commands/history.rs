//! History command handler.

use tabled::Tabled;

use hvaclink_core::{HistoryEntry, HvacSession, RunMode};

use crate::cli::{GlobalOpts, HistoryArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Set")]
    set_point: String,
    #[tabled(rename = "Room")]
    room_temp: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Note")]
    note: String,
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v}"))
}

fn history_row(e: &HistoryEntry) -> HistoryRow {
    HistoryRow {
        timestamp: e.timestamp.clone(),
        serial: e.device_sn.clone().unwrap_or_else(|| "-".into()),
        mode: e
            .run_mode
            .map_or_else(|| "-".into(), |code| RunMode::from_code(code).to_string()),
        set_point: number(e.set_temperature),
        room_temp: number(e.inner_board_t1),
        fan: number(e.fan_speed),
        note: e
            .run_mode_reason_message
            .clone()
            .or_else(|| e.message.clone())
            .unwrap_or_default(),
    }
}

pub async fn handle(
    session: &HvacSession,
    args: HistoryArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session.load_history(&args.search, args.page).await?;
    if args.all {
        while session.next_history_page().await? {}
    }

    let entries = session.history().entries();
    let out = output::render_list(&global.output, &*entries, history_row, |e| e.id.to_string())?;
    output::print_output(&out, global.quiet);

    if let Some(p) = session.history().pagination() {
        if !args.all && p.has_next_page {
            output::print_status(
                &format!(
                    "Page {} of {} ({} entries). Use --page {} or --all for more.",
                    p.page,
                    p.total_pages,
                    p.total,
                    p.page.saturating_add(1)
                ),
                global.quiet,
            );
        }
    }
    Ok(())
}

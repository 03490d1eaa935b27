//! Watch command handler: follow the device channel until interrupted.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;

use hvaclink_core::HvacSession;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::devices::device_row;

pub async fn handle(
    session: &HvacSession,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if session.config().realtime_url.is_none() {
        return Err(CliError::NotConfigured {
            feature: "Realtime channel".into(),
            help: "Pass --realtime-url, set HVACLINK_REALTIME_URL, \
                   or add realtime_url to your profile."
                .into(),
        });
    }

    let color = output::should_color(&global.color);
    let mut notes = session.notifications();
    let mut devices = session.devices();
    session.start()?;

    let stop = tokio::time::sleep(Duration::from_secs(args.duration.unwrap_or_default()));
    tokio::pin!(stop);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            biased;

            _ = &mut interrupt => {
                tracing::debug!("interrupted");
                break;
            }

            () = &mut stop, if args.duration.is_some() => break,

            note = notes.recv() => match note {
                Ok(note) => {
                    if !global.quiet {
                        eprintln!("{}", output::format_notification(&note, color));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification stream lagged");
                }
                Err(RecvError::Closed) => break,
            },

            changed = devices.changed(), if !args.events_only => {
                let Some(snapshot) = changed else {
                    break;
                };
                let out = output::render_list(&global.output, &snapshot, device_row, |d| {
                    d.serial.to_string()
                })?;
                output::print_output(&out, global.quiet);
            }
        }
    }

    Ok(())
}

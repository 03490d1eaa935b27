//! Fleet-wide command handlers.

use hvaclink_core::HvacSession;

use crate::cli::{FleetArgs, FleetCommand, GlobalOpts, PowerState};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    session: &HvacSession,
    args: FleetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let message = match args.command {
        FleetCommand::Power { state } => {
            let on = matches!(state, PowerState::On);
            if !on && !util::confirm("Switch off every device?", "fleet power off", global.yes)? {
                output::print_status("Aborted.", global.quiet);
                return Ok(());
            }
            session.master_power(on).await?
        }
        FleetCommand::UnlockAll => {
            if !util::confirm("Release every lock on every device?", "fleet unlock-all", global.yes)? {
                output::print_status("Aborted.", global.quiet);
                return Ok(());
            }
            session.unlock_all().await?
        }
    };
    output::print_status(&message, global.quiet);
    Ok(())
}

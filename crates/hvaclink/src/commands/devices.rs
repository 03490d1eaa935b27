//! Device command handlers.

use std::fmt::Write as _;

use tabled::Tabled;

use hvaclink_core::{
    Command, CommandClass, CreateDeviceRequest, Device, DeviceSn, HvacSession, LockFlags,
};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, LockAction};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Online")]
    online: &'static str,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Set")]
    set_point: String,
    #[tabled(rename = "Room")]
    room_temp: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Locks")]
    locks: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            serial: d.serial.to_string(),
            name: d.name.clone(),
            online: util::yes_no(d.online),
            mode: d.run_mode.to_string(),
            set_point: format!("{} °C", d.set_temperature),
            room_temp: util::opt_f64(d.room_temperature, " °C"),
            fan: if d.auto_fan {
                "auto".into()
            } else {
                d.fan_speed.to_string()
            },
            locks: lock_summary(&d.locks),
        }
    }
}

pub(crate) fn device_row(d: &Device) -> DeviceRow {
    DeviceRow::from(d)
}

fn lock_summary(locks: &LockFlags) -> String {
    let engaged: Vec<&str> = [
        (locks.min_temp, "min-temp"),
        (locks.max_temp, "max-temp"),
        (locks.mode, "mode"),
        (locks.on_off, "on-off"),
        (locks.fan_speed, "fan-speed"),
        (locks.remote, "remote"),
        (locks.wired_control, "wired-control"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    if engaged.is_empty() {
        "-".into()
    } else {
        engaged.join(",")
    }
}

fn detail(d: &Device) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Serial:        {}", d.serial);
    let _ = writeln!(out, "Name:          {}", d.name);
    if let Some(id) = d.record_id {
        let _ = writeln!(out, "Record ID:     {id}");
    }
    let _ = writeln!(out, "Online:        {}", util::yes_no(d.online));
    let _ = writeln!(out, "Power:         {}", if d.is_on() { "on" } else { "off" });
    let _ = writeln!(out, "Mode:          {}", d.run_mode);
    let _ = writeln!(out, "Set point:     {} °C", d.set_temperature);
    let _ = writeln!(
        out,
        "Room temp:     {}",
        util::opt_f64(d.room_temperature, " °C")
    );
    let _ = writeln!(
        out,
        "Fan speed:     {}{}",
        d.fan_speed,
        if d.auto_fan { " (auto)" } else { "" }
    );
    let _ = writeln!(
        out,
        "Swing:         horizontal {}, vertical {}",
        util::yes_no(d.swing_horizontal),
        util::yes_no(d.swing_vertical)
    );
    if d.min_temp_limit.is_some() || d.max_temp_limit.is_some() {
        let _ = writeln!(
            out,
            "Limits:        {} .. {}",
            util::opt_f64(d.min_temp_limit, " °C"),
            util::opt_f64(d.max_temp_limit, " °C")
        );
    }
    let _ = writeln!(out, "Locks:         {}", lock_summary(&d.locks));
    if let Some(ref room) = d.room {
        let place: Vec<&str> = [&room.building, &room.floor, &room.room_name]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if !place.is_empty() {
            let _ = writeln!(out, "Location:      {}", place.join(" / "));
        }
    }
    out.trim_end().to_string()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &HvacSession,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { search } => {
            session.refresh().await?;
            let mut devices = session.registry().get_all();
            if let Some(ref needle) = search {
                let needle = needle.to_lowercase();
                devices.retain(|d| {
                    d.serial.as_str().to_lowercase().contains(&needle)
                        || d.name.to_lowercase().contains(&needle)
                });
            }
            let out = output::render_list(&global.output, &devices, device_row, |d| {
                d.serial.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { serial } => {
            let device = util::fetch_device(session, &serial).await?;
            let out = output::render_single(&global.output, &device, detail, |d| {
                d.serial.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Power { serial } => {
            run_command(session, &serial, Command::PowerToggle, global).await
        }

        DevicesCommand::Mode { serial, mode } => {
            run_command(session, &serial, Command::SetMode(mode), global).await
        }

        DevicesCommand::Temperature { serial, celsius } => {
            let command = Command::from_class(CommandClass::SetTemperature, celsius);
            run_command(session, &serial, command, global).await
        }

        DevicesCommand::Fan { serial, level } => {
            let command = Command::from_class(CommandClass::SetFanSpeed, level);
            run_command(session, &serial, command, global).await
        }

        DevicesCommand::Lock {
            serial,
            lock,
            action,
        } => {
            let command = Command::SetLock {
                lock,
                engaged: matches!(action, LockAction::Lock),
            };
            run_command(session, &serial, command, global).await
        }

        DevicesCommand::Create {
            serial,
            name,
            device_type,
        } => {
            let request = CreateDeviceRequest {
                device_sn: serial,
                name,
                device_type,
                ..CreateDeviceRequest::default()
            };
            let message = session.create_device(&request).await?;
            output::print_status(&message, global.quiet);
            Ok(())
        }

        DevicesCommand::Delete { serial } => {
            session.refresh().await?;
            let record_id = session.record_id(&serial)?;
            let prompt = format!("Delete device {serial}?");
            if !util::confirm(&prompt, "devices delete", global.yes)? {
                output::print_status("Aborted.", global.quiet);
                return Ok(());
            }
            let message = session.delete_device(record_id).await?;
            output::print_status(&message, global.quiet);
            Ok(())
        }
    }
}

/// Send one command immediately and report the backend's answer.
async fn run_command(
    session: &HvacSession,
    serial: &str,
    command: Command,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    tracing::debug!(serial, %command, "sending command");
    let message = session
        .execute_command(&DeviceSn::from(serial), command)
        .await?;
    output::print_status(&message, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_summary_lists_engaged_locks() {
        let locks = LockFlags {
            mode: true,
            remote: true,
            ..LockFlags::default()
        };
        assert_eq!(lock_summary(&locks), "mode,remote");
        assert_eq!(lock_summary(&LockFlags::default()), "-");
    }

    #[test]
    fn detail_shows_auto_fan() {
        let mut device = Device::new(DeviceSn::from("ABC123"));
        device.fan_speed = 3;
        device.auto_fan = true;
        let text = detail(&device);
        assert!(text.contains("Serial:        ABC123"));
        assert!(text.contains("Fan speed:     3 (auto)"));
    }
}

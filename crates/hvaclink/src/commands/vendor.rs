//! Manufacturer gateway command handlers.

use tabled::Tabled;

use hvaclink_core::{GroupSetting, HvacSession, IndoorUnit, UnitProperties};

use crate::cli::{GlobalOpts, VendorArgs, VendorCommand};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    unit_type: String,
}

fn unit_row(u: &IndoorUnit) -> UnitRow {
    UnitRow {
        serial: u.device_sn.clone(),
        name: u.name.clone(),
        unit_type: u.unit_type.clone(),
    }
}

#[derive(Tabled)]
struct PropertiesRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Readings")]
    readings: String,
}

/// Scalar readings as `key=value`, in key order; nested values are left to
/// the JSON output.
fn readings(p: &UnitProperties) -> String {
    let mut pairs: Vec<String> = p
        .properties
        .iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some(format!("{key}={s}")),
            serde_json::Value::Number(n) => Some(format!("{key}={n}")),
            serde_json::Value::Bool(b) => Some(format!("{key}={b}")),
            _ => None,
        })
        .collect();
    pairs.sort();
    if pairs.is_empty() {
        "-".into()
    } else {
        pairs.join(" ")
    }
}

fn properties_row(p: &UnitProperties) -> PropertiesRow {
    PropertiesRow {
        serial: p.device_sn.clone(),
        name: p.device_name.clone().unwrap_or_else(|| "-".into()),
        readings: readings(p),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &HvacSession,
    args: VendorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if session.config().vendor_url.is_none() {
        return Err(CliError::NotConfigured {
            feature: "Vendor gateway".into(),
            help: "Pass --vendor-url, set HVACLINK_VENDOR_URL, \
                   or add vendor_url to your profile."
                .into(),
        });
    }

    match args.command {
        VendorCommand::Units => {
            let units = session.vendor_units().await?;
            let out = output::render_list(&global.output, &units, unit_row, |u| {
                u.device_sn.clone()
            })?;
            output::print_output(&out, global.quiet);
        }

        VendorCommand::Properties { serials } => {
            let serials = if serials.is_empty() {
                session.vendor_units().await?;
                session.vendor().serials()
            } else {
                serials
            };
            let properties = session.unit_properties(&serials).await?;
            let out = output::render_list(&global.output, &properties, properties_row, |p| {
                p.device_sn.clone()
            })?;
            output::print_output(&out, global.quiet);
        }

        VendorCommand::Group {
            serials,
            fan_power,
            heat_power,
        } => {
            let count = serials.len();
            let setting = GroupSetting {
                device_sns: serials,
                fan_power,
                heat_power,
            };
            let system = session.apply_group_setting(&setting).await?;
            output::print_status(
                &format!("Group setting applied to {count} device(s)."),
                global.quiet,
            );
            let out = output::render_list(&global.output, &system.indoor_devices, unit_row, |u| {
                u.device_sn.clone()
            })?;
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}

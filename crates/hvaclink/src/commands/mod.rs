//! Command dispatch: bridges CLI args -> session operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod fleet;
pub mod history;
pub mod util;
pub mod vendor;
pub mod watch;
pub mod weather;

use secrecy::SecretString;

use hvaclink_core::{HvacSession, ReconnectConfig, SessionConfig, WeatherQuery};

use crate::cli::{Command, GlobalOpts};
use crate::config::{parse_url, parse_ws_url};
use crate::error::CliError;

/// Adjust the session configuration for one command before the session is
/// built. One-shot commands never open the realtime channels.
pub fn tailor_config(cmd: &Command, config: &mut SessionConfig) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => {
            if let Some(ref search) = args.search {
                config.search.clone_from(search);
            }
            if args.reconnect {
                config.reconnect = Some(ReconnectConfig::default());
            }
            config.weather_url = None;
        }
        Command::Weather(args) => {
            if let Some(ref raw) = args.weather_url {
                config.weather_url = Some(parse_ws_url("weather-url", raw)?);
            }
            if args.city.is_some() || args.lat.is_some() {
                config.weather_query = WeatherQuery {
                    search: args.city.clone(),
                    latitude: args.lat,
                    longitude: args.lon,
                };
            }
            config.realtime_url = None;
        }
        Command::Vendor(args) => {
            if let Some(ref raw) = args.vendor_url {
                config.vendor_url = Some(parse_url("vendor-url", raw)?);
            }
            if let Some(ref sign) = args.sign_token {
                config.sign_token = Some(SecretString::from(sign.clone()));
            }
            config.realtime_url = None;
            config.weather_url = None;
        }
        _ => {
            config.realtime_url = None;
            config.weather_url = None;
        }
    }
    Ok(())
}

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &HvacSession,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(session, args, global).await,
        Command::Fleet(args) => fleet::handle(session, args, global).await,
        Command::History(args) => history::handle(session, args, global).await,
        Command::Weather(args) => weather::handle(session, args, global).await,
        Command::Watch(args) => watch::handle(session, args, global).await,
        Command::Vendor(args) => vendor::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not reach the backend".into(),
        )),
    }
}

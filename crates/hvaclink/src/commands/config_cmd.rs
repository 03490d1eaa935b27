//! Config subcommand handlers.

use hvaclink_config::{self as cfgfile, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, parse_url, parse_ws_url};
use crate::error::{CliError, available_profiles};
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_value<T: std::str::FromStr>(
    field: &str,
    value: &str,
    expected: &str,
) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

fn render_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

/// Apply one `config set` key to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "api_url" | "api-url" => {
            parse_url("api_url", &value)?;
            profile.api_url = Some(value);
        }
        "realtime_url" | "realtime-url" => {
            parse_ws_url("realtime_url", &value)?;
            profile.realtime_url = Some(value);
        }
        "weather_url" | "weather-url" => {
            parse_ws_url("weather_url", &value)?;
            profile.weather_url = Some(value);
        }
        "vendor_url" | "vendor-url" => {
            parse_url("vendor_url", &value)?;
            profile.vendor_url = Some(value);
        }
        "bearer_token" | "bearer-token" => profile.bearer_token = Some(value),
        "bearer_token_env" | "bearer-token-env" => profile.bearer_token_env = Some(value),
        "sign_token" | "sign-token" => profile.sign_token = Some(value),
        "sign_token_env" | "sign-token-env" => profile.sign_token_env = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_value("insecure", &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value("timeout", &value, "a number (seconds)")?),
        "search" => profile.search = value,
        "reconnect" => {
            profile.reconnect = Some(parse_value("reconnect", &value, "'true' or 'false'")?);
        }
        "debounce.temperature_ms" => {
            profile.debounce.temperature_ms =
                Some(parse_value(key, &value, "a number (milliseconds)")?);
        }
        "debounce.fan_speed_ms" => {
            profile.debounce.fan_speed_ms =
                Some(parse_value(key, &value, "a number (milliseconds)")?);
        }
        "debounce.lock_ms" => {
            profile.debounce.lock_ms = Some(parse_value(key, &value, "a number (milliseconds)")?);
        }
        "weather.search" => profile.weather.search = Some(value),
        "weather.latitude" => {
            profile.weather.latitude = Some(parse_value(key, &value, "a number")?);
        }
        "weather.longitude" => {
            profile.weather.longitude = Some(parse_value(key, &value, "a number")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: api_url, realtime_url, \
                     weather_url, vendor_url, bearer_token, bearer_token_env, sign_token, sign_token_env, \
                     ca_cert, insecure, timeout, search, reconnect, debounce.temperature_ms, \
                     debounce.fan_speed_ms, debounce.lock_ms, weather.search, \
                     weather.latitude, weather.longitude"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init {
            name,
            api_url,
            realtime_url,
            weather_url,
            vendor_url,
            token_env,
        } => {
            let mut cfg = cfgfile::load_config_or_default();
            let mut profile = Profile::default();
            set_key(&mut profile, "api_url", api_url)?;
            if let Some(url) = realtime_url {
                set_key(&mut profile, "realtime_url", url)?;
            }
            if let Some(url) = weather_url {
                set_key(&mut profile, "weather_url", url)?;
            }
            if let Some(url) = vendor_url {
                set_key(&mut profile, "vendor_url", url)?;
            }
            profile.bearer_token_env = token_env;

            cfg.profiles.insert(name.clone(), profile);
            if cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            cfgfile::save_config(&cfg)?;

            output::print_status(
                &format!(
                    "✓ Profile '{name}' written to {}",
                    cfgfile::config_path().display()
                ),
                global.quiet,
            );
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = cfgfile::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, render_toml, |c| {
                c.default_profile.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&cfgfile::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = cfgfile::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_key(profile, &key, value)?;

            cfgfile::save_config(&cfg)?;
            output::print_status(&format!("✓ Set {key} on profile '{profile_name}'"), global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = cfgfile::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                output::print_status(
                    "No profiles configured. Run: hvaclink config init --api-url <URL>",
                    global.quiet,
                );
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = cfgfile::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            cfgfile::save_config(&cfg)?;
            output::print_status(&format!("✓ Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_key_validates_urls() {
        let mut profile = Profile::default();
        set_key(&mut profile, "realtime-url", "wss://bms.example.com/rt".into()).unwrap();
        assert_eq!(profile.realtime_url.as_deref(), Some("wss://bms.example.com/rt"));

        let err = set_key(&mut profile, "realtime_url", "https://nope".into()).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn set_key_parses_nested_numbers() {
        let mut profile = Profile::default();
        set_key(&mut profile, "debounce.lock_ms", "2500".into()).unwrap();
        set_key(&mut profile, "weather.latitude", "21.03".into()).unwrap();
        assert_eq!(profile.debounce.lock_ms, Some(2500));
        assert!((profile.weather.latitude.unwrap() - 21.03).abs() < 1e-9);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut profile = Profile::default();
        let err = set_key(&mut profile, "controller", "x".into()).unwrap_err();
        assert!(err.to_string().contains("controller"));
    }
}

//! Flag overrides on top of `hvaclink-config` profiles.
//!
//! Precedence: CLI flag > `HVACLINK_*` env var (via clap) > profile > defaults.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use hvaclink_config::{Config, Profile};
use hvaclink_core::{ReconnectConfig, SessionConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `SessionConfig` from the config file, the active profile and the
/// global flags.
pub fn build_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = hvaclink_config::load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut session = if let Some(profile) = cfg.profiles.get(&profile_name) {
        from_profile(profile, &profile_name, &cfg, global)?
    } else if global.profile.is_some() {
        // An explicitly requested profile must exist.
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: crate::error::available_profiles(&cfg),
        });
    } else {
        // No profile: build from flags / env vars alone.
        let raw = global.api_url.as_deref().ok_or_else(|| CliError::NoConfig {
            path: hvaclink_config::config_path().display().to_string(),
        })?;
        let mut session = SessionConfig::new(parse_url("api-url", raw)?);
        session.timeout = Duration::from_secs(cfg.defaults.timeout);
        if cfg.defaults.insecure {
            session.tls = TlsVerification::DangerAcceptInvalid;
        }
        session.reconnect = cfg.defaults.reconnect.then(ReconnectConfig::default);
        session
    };

    apply_overrides(&mut session, global)?;
    Ok(session)
}

fn from_profile(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<SessionConfig, CliError> {
    // The flag may stand in for a profile that has no api_url of its own.
    if profile.api_url.is_none() && global.api_url.is_some() {
        let patched = Profile {
            api_url: global.api_url.clone(),
            ..profile.clone()
        };
        return Ok(hvaclink_config::profile_to_session_config(
            &patched,
            profile_name,
            &cfg.defaults,
        )?);
    }
    Ok(hvaclink_config::profile_to_session_config(
        profile,
        profile_name,
        &cfg.defaults,
    )?)
}

fn apply_overrides(session: &mut SessionConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref raw) = global.api_url {
        session.api_url = parse_url("api-url", raw)?;
    }
    if let Some(ref raw) = global.realtime_url {
        session.realtime_url = Some(parse_ws_url("realtime-url", raw)?);
    }
    if let Some(ref token) = global.token {
        session.bearer_token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        session.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        session.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

pub fn parse_url(field: &str, raw: &str) -> Result<Url, CliError> {
    raw.parse().map_err(|e: url::ParseError| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

pub fn parse_ws_url(field: &str, raw: &str) -> Result<Url, CliError> {
    let url = parse_url(field, raw)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(CliError::Validation {
            field: field.into(),
            reason: format!("expected a ws:// or wss:// URL, got scheme '{other}'"),
        }),
    }
}

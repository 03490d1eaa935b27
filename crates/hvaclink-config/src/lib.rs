//! Shared configuration for hvaclink consumers.
//!
//! TOML profiles, token resolution (env + plaintext), and translation to
//! `hvaclink_core::SessionConfig`. The CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use hvaclink_core::{DebounceWindows, ReconnectConfig, SessionConfig, TlsVerification, WeatherQuery};

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "HVACLINK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("no control API URL configured for profile '{profile}'")]
    MissingApiUrl { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or(ConfigError::UnknownProfile { profile: name })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Reconnect dropped realtime channels.
    #[serde(default)]
    pub reconnect: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            reconnect: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Control API base URL (e.g., "https://bms.example.com/api/v1/").
    pub api_url: Option<String>,

    /// Device realtime channel URL (ws:// or wss://).
    pub realtime_url: Option<String>,

    /// Weather realtime channel URL.
    pub weather_url: Option<String>,

    /// Manufacturer gateway base URL (authorised with the `sign` token).
    pub vendor_url: Option<String>,

    /// Bearer token (plaintext; prefer `bearer_token_env`).
    pub bearer_token: Option<String>,

    /// Environment variable holding the bearer token.
    pub bearer_token_env: Option<String>,

    /// Vendor `sign` token (plaintext; prefer `sign_token_env`).
    pub sign_token: Option<String>,

    /// Environment variable holding the `sign` token.
    pub sign_token_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout, seconds.
    pub timeout: Option<u64>,

    /// Search filter sent with device snapshot requests.
    #[serde(default)]
    pub search: String,

    /// Override the reconnect default.
    pub reconnect: Option<bool>,

    #[serde(default)]
    pub debounce: DebounceOverrides,

    #[serde(default)]
    pub weather: WeatherSettings,
}

/// Debounce windows in milliseconds; unset fields keep the built-in values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DebounceOverrides {
    pub temperature_ms: Option<u64>,
    pub fan_speed_ms: Option<u64>,
    pub lock_ms: Option<u64>,
}

impl DebounceOverrides {
    pub fn apply(&self, windows: &mut DebounceWindows) {
        if let Some(ms) = self.temperature_ms {
            windows.set_temperature = Duration::from_millis(ms);
        }
        if let Some(ms) = self.fan_speed_ms {
            windows.set_fan_speed = Duration::from_millis(ms);
        }
        if let Some(ms) = self.lock_ms {
            windows.set_lock = Duration::from_millis(ms);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeatherSettings {
    pub search: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hvaclink", "hvaclink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hvaclink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is not
/// an error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve a token: the named env var wins, then the plaintext value.
pub fn resolve_token(plain: Option<&str>, env_name: Option<&str>) -> Option<SecretString> {
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            return Some(SecretString::from(val));
        }
    }
    plain.map(|t| SecretString::from(t.to_owned()))
}

// ── Translation to SessionConfig ────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e: url::ParseError| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

fn parse_ws_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = parse_url(field, raw)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected a ws:// or wss:// URL, got scheme '{other}'"),
        }),
    }
}

/// Build a `SessionConfig` from a profile plus global defaults; no CLI
/// flag overrides.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let raw_api = profile
        .api_url
        .as_deref()
        .ok_or_else(|| ConfigError::MissingApiUrl {
            profile: profile_name.into(),
        })?;

    let mut config = SessionConfig::new(parse_url("api_url", raw_api)?);
    config.realtime_url = profile
        .realtime_url
        .as_deref()
        .map(|raw| parse_ws_url("realtime_url", raw))
        .transpose()?;
    config.weather_url = profile
        .weather_url
        .as_deref()
        .map(|raw| parse_ws_url("weather_url", raw))
        .transpose()?;
    config.vendor_url = profile
        .vendor_url
        .as_deref()
        .map(|raw| parse_url("vendor_url", raw))
        .transpose()?;
    config.weather_query = WeatherQuery {
        search: profile.weather.search.clone(),
        latitude: profile.weather.latitude,
        longitude: profile.weather.longitude,
    };

    config.bearer_token = resolve_token(
        profile.bearer_token.as_deref(),
        profile.bearer_token_env.as_deref(),
    );
    config.sign_token = resolve_token(
        profile.sign_token.as_deref(),
        profile.sign_token_env.as_deref(),
    );

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.search.clone_from(&profile.search);
    config.reconnect = profile
        .reconnect
        .unwrap_or(defaults.reconnect)
        .then(ReconnectConfig::default);
    profile.debounce.apply(&mut config.debounce);

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
default_profile = "plant"

[defaults]
timeout = 10

[profiles.plant]
api_url = "https://bms.example.com/api/v1/"
realtime_url = "wss://bms.example.com/realtime"
vendor_url = "https://gateway.example.com/"
sign_token = "plain-sign"
search = "Tower A"

[profiles.plant.debounce]
temperature_ms = 250
"#;

    #[test]
    fn loads_profile_from_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;

            let config = load_config_from(Path::new("config.toml")).unwrap();
            let (name, profile) = config.profile(None).unwrap();
            assert_eq!(name, "plant");

            let session = profile_to_session_config(profile, &name, &config.defaults).unwrap();
            assert_eq!(session.api_url.as_str(), "https://bms.example.com/api/v1/");
            assert_eq!(
                session.realtime_url.unwrap().as_str(),
                "wss://bms.example.com/realtime"
            );
            assert_eq!(session.timeout, Duration::from_secs(10));
            assert_eq!(session.search, "Tower A");
            assert_eq!(session.debounce.set_temperature, Duration::from_millis(250));
            assert_eq!(session.debounce.set_fan_speed, Duration::from_secs(1));
            assert_eq!(
                session.vendor_url.unwrap().as_str(),
                "https://gateway.example.com/"
            );
            assert_eq!(session.sign_token.unwrap().expose_secret(), "plain-sign");
            assert!(session.reconnect.is_none());
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = load_config_from(Path::new("absent.toml")).unwrap();
            assert_eq!(config.defaults.timeout, 30);
            assert!(matches!(
                config.profile(None),
                Err(ConfigError::UnknownProfile { .. })
            ));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("HVACLINK_DEFAULTS__TIMEOUT", "5");
            jail.set_env("HVACLINK_PROFILES__PLANT__SEARCH", "Tower B");

            let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.defaults.timeout, 5);
            assert_eq!(config.profiles["plant"].search, "Tower B");
            Ok(())
        });
    }

    #[test]
    fn token_env_wins_over_plaintext() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("HVACLINK_TEST_BEARER", "from-env");
            let token = resolve_token(Some("plain"), Some("HVACLINK_TEST_BEARER")).unwrap();
            assert_eq!(token.expose_secret(), "from-env");

            let token = resolve_token(Some("plain"), Some("HVACLINK_TEST_UNSET")).unwrap();
            assert_eq!(token.expose_secret(), "plain");
            Ok(())
        });
    }

    #[test]
    fn realtime_url_must_be_websocket() {
        let profile = Profile {
            api_url: Some("https://bms.example.com/".into()),
            realtime_url: Some("https://bms.example.com/realtime".into()),
            ..Profile::default()
        };
        let err = profile_to_session_config(&profile, "p", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "realtime_url"));
    }

    #[test]
    fn missing_api_url_is_reported() {
        let err =
            profile_to_session_config(&Profile::default(), "empty", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiUrl { .. }));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                api_url: Some("http://localhost:3000/".into()),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        figment::Jail::expect_with(|_jail| {
            let loaded = load_config_from(&path).unwrap();
            assert_eq!(
                loaded.profiles["default"].api_url.as_deref(),
                Some("http://localhost:3000/")
            );
            Ok(())
        });
    }
}

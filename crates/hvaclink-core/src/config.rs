// ── Runtime session configuration ──
//
// These types describe *how* to reach the control API and realtime
// channels. They carry credentials and tuning but never touch disk; the
// CLI (via hvaclink-config) builds a `SessionConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use hvaclink_api::{ReconnectConfig, TlsMode, TransportConfig};

use crate::command::DebounceWindows;
use crate::event::WeatherQuery;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed gateways).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Everything an `HvacSession` needs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Control API base URL, e.g. `https://bms.example.com/api/v1/`.
    pub api_url: Url,
    /// Device realtime channel. `None` disables push updates.
    pub realtime_url: Option<Url>,
    /// Weather realtime channel. `None` disables the weather store feed.
    pub weather_url: Option<Url>,
    pub weather_query: WeatherQuery,
    /// Manufacturer gateway base URL. `None` disables the vendor calls.
    pub vendor_url: Option<Url>,
    pub bearer_token: Option<SecretString>,
    pub sign_token: Option<SecretString>,
    pub timeout: Duration,
    pub tls: TlsVerification,
    /// Search filter sent with every "request all devices" frame.
    pub search: String,
    /// `None` leaves a dropped channel closed until the next `start()`.
    pub reconnect: Option<ReconnectConfig>,
    pub debounce: DebounceWindows,
}

impl SessionConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            realtime_url: None,
            weather_url: None,
            weather_query: WeatherQuery::default(),
            vendor_url: None,
            bearer_token: None,
            sign_token: None,
            timeout: Duration::from_secs(30),
            tls: TlsVerification::default(),
            search: String::new(),
            reconnect: None,
            debounce: DebounceWindows::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
            bearer_token: self.bearer_token.clone(),
            sign_token: self.sign_token.clone(),
        }
    }
}

// ── Core error types ──
//
// User-facing errors from hvaclink-core. Consumers never see raw HTTP or
// JSON failures; the `From<hvaclink_api::Error>` impl sorts transport-layer
// errors into the notification taxonomy: unreachable, backend-reported,
// local validation, realtime disconnect.

use thiserror::Error;

/// Text shown when no response was received at all.
pub const UNREACHABLE_MESSAGE: &str = "Server is unreachable. Please try again later.";

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Server is unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Realtime channel disconnected: {reason}")]
    ChannelDisconnected { reason: String },

    #[error("Session is shut down")]
    SessionClosed,

    // ── Backend errors ───────────────────────────────────────────────
    /// Message reported by the backend, passed through verbatim.
    #[error("{message}")]
    Backend {
        message: String,
        status: Option<u16>,
    },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("{message}")]
    Validation { message: String },

    #[error("Device not found: {serial}")]
    DeviceNotFound { serial: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Text for the notification raised when this error reaches the
    /// dispatch boundary.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unreachable { .. } => UNREACHABLE_MESSAGE.to_owned(),
            Self::Backend { message, .. } | Self::Validation { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hvaclink_api::Error> for CoreError {
    fn from(err: hvaclink_api::Error) -> Self {
        if err.is_unreachable() {
            return CoreError::Unreachable {
                reason: err.to_string(),
            };
        }
        match err {
            hvaclink_api::Error::Backend { message, status } => {
                CoreError::Backend { message, status }
            }
            hvaclink_api::Error::Transport(ref e) => CoreError::Backend {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            hvaclink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            hvaclink_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            hvaclink_api::Error::RealtimeConnect(reason) => {
                CoreError::ChannelDisconnected { reason }
            }
            hvaclink_api::Error::RealtimeClosed { code, reason } => {
                CoreError::ChannelDisconnected {
                    reason: format!("closed with code {code}: {reason}"),
                }
            }
            hvaclink_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response: {message}"))
            }
        }
    }
}

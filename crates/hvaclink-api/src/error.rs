use thiserror::Error;

/// Top-level error type for the `hvaclink-api` crate.
///
/// Covers every failure mode across both API surfaces: the REST control
/// endpoints and the realtime WebSocket channel. `hvaclink-core` maps these
/// into user-facing notifications.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// Error reported by the backend, either as a non-2xx response or as an
    /// error status embedded in a success envelope. `message` is the text
    /// the backend supplied, unmodified.
    #[error("{message}")]
    Backend {
        message: String,
        status: Option<u16>,
    },

    // ── Realtime ────────────────────────────────────────────────────
    /// Realtime connection failed.
    #[error("Realtime connection failed: {0}")]
    RealtimeConnect(String),

    /// Realtime connection closed by the server.
    #[error("Realtime channel closed (code {code}): {reason}")]
    RealtimeClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` when no HTTP response was received at all
    /// (connection refused, DNS failure, timeout before headers).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.status().is_none() && !e.is_decode() && !e.is_body(),
            Self::RealtimeConnect(_) => true,
            _ => false,
        }
    }

    /// The backend-supplied message, if this error came from the backend.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Backend { message, .. } => Some(message),
            _ => None,
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Backend { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

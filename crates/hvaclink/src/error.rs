//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use hvaclink_config::ConfigError;
use hvaclink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Server is unreachable. Please try again later.")]
    #[diagnostic(
        code(hvaclink::unreachable),
        help(
            "No response from the control backend.\n\
             Reason: {reason}\n\
             Check --api-url, or try --insecure (-k) for self-signed certificates."
        )
    )]
    Unreachable { reason: String },

    #[error("Realtime channel disconnected: {reason}")]
    #[diagnostic(
        code(hvaclink::channel_disconnected),
        help("Check --realtime-url, or pass --reconnect to keep retrying.")
    )]
    ChannelDisconnected { reason: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(hvaclink::backend))]
    Backend {
        message: String,
        status: Option<u16>,
    },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(hvaclink::not_found),
        help("Run: hvaclink {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hvaclink::validation))]
    Validation { field: String, reason: String },

    #[error("{message}")]
    #[diagnostic(code(hvaclink::rejected))]
    Rejected { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(hvaclink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: hvaclink config init --api-url <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No control API configured")]
    #[diagnostic(
        code(hvaclink::no_config),
        help(
            "Create a profile with: hvaclink config init --api-url <URL>\n\
             Or pass --api-url / set HVACLINK_API_URL.\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("{feature} is not configured")]
    #[diagnostic(code(hvaclink::not_configured), help("{help}"))]
    NotConfigured { feature: String, help: String },

    #[error(transparent)]
    #[diagnostic(code(hvaclink::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(hvaclink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s waiting for {what}")]
    #[diagnostic(
        code(hvaclink::timeout),
        help("Increase the wait time or check that the backend is pushing updates.")
    )]
    Timeout { what: String, seconds: u64 },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(hvaclink::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(hvaclink::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::ChannelDisconnected { .. } => exit_code::CONNECTION,
            Self::NotFound { .. }
            | Self::ProfileNotFound { .. }
            | Self::Backend {
                status: Some(404),
                ..
            } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::Rejected { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unreachable { reason } => CliError::Unreachable { reason },

            CoreError::ChannelDisconnected { reason } => CliError::ChannelDisconnected { reason },

            CoreError::SessionClosed => CliError::Internal("session was shut down".into()),

            CoreError::Backend { message, status } => CliError::Backend { message, status },

            CoreError::Validation { message } => CliError::Rejected { message },

            CoreError::DeviceNotFound { serial } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: serial,
                list_command: "devices list".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => {
                let cfg = hvaclink_config::load_config_or_default();
                CliError::ProfileNotFound {
                    name: profile,
                    available: available_profiles(&cfg),
                }
            }
            ConfigError::MissingApiUrl { .. } => CliError::NoConfig {
                path: hvaclink_config::config_path().display().to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(cfg: &hvaclink_config::Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

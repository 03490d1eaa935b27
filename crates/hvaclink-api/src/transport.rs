// Shared transport configuration for building reqwest::Client instances.
//
// The control client and any auxiliary HTTP consumers share TLS, timeout,
// and auth-header settings through this module.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("hvaclink/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed building gateways).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    /// Sent as `Authorization: Bearer <token>` on every request.
    pub bearer_token: Option<SecretString>,
    /// Sent as the vendor `sign` header on every request.
    pub sign_token: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            bearer_token: None,
            sign_token: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(self.default_headers()?);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    fn default_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();

        if let Some(ref token) = self.bearer_token {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(|e| Error::Tls(format!("invalid bearer token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(ref sign) = self.sign_token {
            let mut value = HeaderValue::from_str(sign.expose_secret())
                .map_err(|e| Error::Tls(format!("invalid sign token: {e}")))?;
            value.set_sensitive(true);
            headers.insert("sign", value);
        }

        Ok(headers)
    }
}

// Control API HTTP client
//
// Wraps `reqwest::Client` with URL construction against the control API
// base and `{ status, message, data }` envelope unwrapping. Endpoint groups
// (devices, fleet, history) are implemented as inherent methods in sibling
// files to keep this module focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::control::models::Envelope;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Shape of an error body on non-2xx responses.
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
}

/// Raw HTTP client for the HVAC control API.
///
/// Every request method returns the parsed envelope after checking both the
/// HTTP status and the status embedded in the body.
pub struct ControlClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ControlClient {
    /// Create a new control client from a `TransportConfig`.
    ///
    /// `base_url` is the API root (e.g. `https://bms.example.com/api/v1`);
    /// endpoint paths are appended to it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a control client with a pre-built `reqwest::Client`.
    ///
    /// Used by tests and by callers that share one HTTP client.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The control API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL: `{base}/{path}` with the given query pairs.
    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<Envelope<T>, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        parse_envelope(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<Envelope<T>, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(resp).await
    }

    /// Send a PUT request, with a JSON body if one is given.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<Envelope<T>, Error> {
        debug!("PUT {}", url);

        let mut builder = self.http.put(url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(Error::Transport)?;

        parse_envelope(resp).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Envelope<T>, Error> {
        debug!("DELETE {}", url);

        let resp = self.http.delete(url).send().await.map_err(Error::Transport)?;

        parse_envelope(resp).await
    }
}

impl<T> Envelope<T> {
    /// Take `data`, failing if the backend omitted it.
    pub fn into_data(self) -> Result<T, Error> {
        self.data.ok_or_else(|| Error::Deserialization {
            message: "response envelope has no `data` field".into(),
            body: self.message.unwrap_or_default(),
        })
    }
}

/// Turn a non-2xx response into `Error::Backend`, carrying the body's
/// `message` (or `HTTP <code>` if there is none).
pub(crate) async fn backend_error(resp: reqwest::Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| match m {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    Error::Backend {
        message,
        status: Some(status.as_u16()),
    }
}

/// Parse the `{ status, message, data }` envelope.
///
/// Non-2xx responses become `Error::Backend` carrying the body's `message`
/// (or `HTTP <code>` if there is none). A 2xx response whose body carries
/// `status >= 400` is also a backend error.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Envelope<T>, Error> {
    if !resp.status().is_success() {
        return Err(backend_error(resp).await);
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    trace!(len = body.len(), "control API response body");

    if body.trim().is_empty() {
        return Ok(Envelope {
            status: None,
            message: None,
            data: None,
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })?;

    match envelope.status {
        Some(code) if code >= 400 => Err(Error::Backend {
            message: envelope
                .message
                .unwrap_or_else(|| format!("backend status {code}")),
            status: Some(code),
        }),
        _ => Ok(envelope),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_path_and_query() {
        let client = ControlClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://bms.example.com/api/v1/").unwrap(),
        );
        let url = client
            .endpoint("/hvacs/midea/power-on-off", &[("device_sn", "ABC 123")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://bms.example.com/api/v1/hvacs/midea/power-on-off?device_sn=ABC+123"
        );
    }
}

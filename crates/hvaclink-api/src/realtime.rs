//! Realtime push channel over WebSocket.
//!
//! The backend pushes named events as JSON text frames of the shape
//! `{ "event": "<name>", "data": <payload> }` and accepts request frames of
//! the same shape. [`RealtimeHandle`] owns one background connection task,
//! fans incoming frames out through a [`tokio::sync::broadcast`] channel,
//! and re-sends the handshake frames every time a connection is
//! established.
//!
//! # Example
//!
//! ```rust,ignore
//! use hvaclink_api::realtime::{Frame, RealtimeHandle, RealtimeMessage};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let url = Url::parse("wss://bms.example.com/realtime")?;
//! let hello = Frame::new("getAllMideaData", serde_json::json!({ "search": "" }));
//!
//! let handle = RealtimeHandle::connect(url, vec![hello], None, CancellationToken::new());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(msg) = rx.recv().await {
//!     if let RealtimeMessage::Frame(frame) = msg.as_ref() {
//!         println!("{}", frame.event);
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

const MESSAGE_CHANNEL_CAPACITY: usize = 1024;

// ── Frame ────────────────────────────────────────────────────────────

/// One named event on the wire, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// What subscribers observe on the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeMessage {
    /// A connection was established and the handshake frames were sent.
    Connected,
    /// An event pushed by the backend.
    Frame(Frame),
    /// The connection dropped or could not be established.
    Disconnected { reason: String },
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── RealtimeHandle ───────────────────────────────────────────────────

/// Handle to a running realtime connection task.
pub struct RealtimeHandle {
    message_tx: broadcast::Sender<Arc<RealtimeMessage>>,
    /// Receiver created before the task started, handed to the first
    /// subscriber so it sees everything from the first `Connected` on.
    first_rx: Mutex<Option<broadcast::Receiver<Arc<RealtimeMessage>>>>,
    outgoing: mpsc::UnboundedSender<Frame>,
    cancel: CancellationToken,
}

impl RealtimeHandle {
    /// Spawn the connection task and return immediately.
    ///
    /// `handshake` frames are sent, in order, right after every successful
    /// connect. With `reconnect: None` the task ends after the first
    /// disconnect; otherwise it reconnects with exponential backoff.
    pub fn connect(
        url: Url,
        handshake: Vec<Frame>,
        reconnect: Option<ReconnectConfig>,
        cancel: CancellationToken,
    ) -> Self {
        let (message_tx, first_rx) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();

        let task_tx = message_tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            realtime_loop(url, handshake, task_tx, outgoing_rx, reconnect, task_cancel).await;
        });

        Self {
            message_tx,
            first_rx: Mutex::new(Some(first_rx)),
            outgoing,
            cancel,
        }
    }

    /// Get a receiver for the message stream.
    ///
    /// The first call returns a receiver positioned at the very start of the
    /// stream; later calls only see messages sent after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RealtimeMessage>> {
        if let Ok(mut slot) = self.first_rx.lock() {
            if let Some(rx) = slot.take() {
                return rx;
            }
        }
        self.message_tx.subscribe()
    }

    /// Queue a request frame. Frames queued while disconnected are sent
    /// after the next handshake.
    pub fn emit(&self, frame: Frame) -> Result<(), Error> {
        self.outgoing
            .send(frame)
            .map_err(|_| Error::RealtimeConnect("realtime task has stopped".into()))
    }

    /// Signal the background task to close the connection and exit.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled() || self.outgoing.is_closed()
    }
}

impl Drop for RealtimeHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background loop ──────────────────────────────────────────────────

/// connect → read/write → on drop, backoff → reconnect (if enabled).
async fn realtime_loop(
    url: Url,
    handshake: Vec<Frame>,
    message_tx: broadcast::Sender<Arc<RealtimeMessage>>,
    mut outgoing: mpsc::UnboundedReceiver<Frame>,
    reconnect: Option<ReconnectConfig>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_run(&url, &handshake, &message_tx, &mut outgoing, &cancel) => result,
        };

        let reason = match result {
            Ok(reason) => {
                attempt = 0;
                reason
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "realtime connection error");
                e.to_string()
            }
        };
        if cancel.is_cancelled() {
            break;
        }
        let _ = message_tx.send(Arc::new(RealtimeMessage::Disconnected { reason }));

        let Some(ref policy) = reconnect else {
            tracing::info!("realtime channel closed, reconnect disabled");
            break;
        };

        if let Some(max) = policy.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "realtime reconnection limit reached");
                break;
            }
        }

        let delay = calculate_backoff(attempt, policy);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    tracing::debug!("realtime loop exiting");
}

/// Run one connection until it drops. `Ok` carries the reason for a clean
/// close; transport failures are `Err`.
async fn connect_and_run(
    url: &Url,
    handshake: &[Frame],
    message_tx: &broadcast::Sender<Arc<RealtimeMessage>>,
    outgoing: &mut mpsc::UnboundedReceiver<Frame>,
    cancel: &CancellationToken,
) -> Result<String, Error> {
    tracing::info!(url = %url, "connecting realtime channel");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::RealtimeConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri))
        .await
        .map_err(|e| Error::RealtimeConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    for frame in handshake {
        write
            .send(encode(frame)?)
            .await
            .map_err(|e| Error::RealtimeConnect(e.to_string()))?;
    }

    tracing::info!("realtime channel connected");
    let _ = message_tx.send(Arc::new(RealtimeMessage::Connected));

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok("closed by client".into());
            }
            Some(frame) = outgoing.recv() => {
                tracing::debug!(event = %frame.event, "emitting realtime frame");
                write
                    .send(encode(&frame)?)
                    .await
                    .map_err(|e| Error::RealtimeConnect(e.to_string()))?;
            }
            message = read.next() => {
                match message {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(text.as_str(), message_tx);
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        let reason = match frame {
                            Some(cf) => Error::RealtimeClosed {
                                code: u16::from(cf.code),
                                reason: cf.reason.as_str().to_owned(),
                            }
                            .to_string(),
                            None => "server closed the connection".into(),
                        };
                        tracing::info!(%reason, "realtime close frame received");
                        return Ok(reason);
                    }
                    Some(Err(e)) => return Err(Error::RealtimeConnect(e.to_string())),
                    None => return Ok("stream ended".into()),
                    // Ping is answered by tungstenite; binary/pong ignored
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

fn encode(frame: &Frame) -> Result<tungstenite::Message, Error> {
    let text = serde_json::to_string(frame).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: frame.event.clone(),
    })?;
    Ok(tungstenite::Message::Text(text.into()))
}

/// Parse a text frame and broadcast it. Malformed frames are logged and
/// dropped.
fn parse_and_broadcast(text: &str, message_tx: &broadcast::Sender<Arc<RealtimeMessage>>) {
    match serde_json::from_str::<Frame>(text) {
        Ok(frame) => {
            tracing::trace!(event = %frame.event, "realtime frame received");
            // No subscribers is fine
            let _ = message_tx.send(Arc::new(RealtimeMessage::Frame(frame)));
        }
        Err(e) => tracing::debug!(error = %e, "failed to parse realtime frame"),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic spread seeded from the attempt number
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────

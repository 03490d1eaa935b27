// ── Realtime channel lifecycle ──
//
// Wraps a `RealtimeHandle` with open/close semantics: at most one live
// connection per channel, one listener task delivering messages to the
// owner's callback, and teardown that removes the listener before the
// connection goes away.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use hvaclink_api::{Frame, RealtimeHandle, RealtimeMessage, ReconnectConfig};

use crate::error::CoreError;

struct OpenChannel {
    handle: RealtimeHandle,
    listener: JoinHandle<()>,
}

/// One lazily-opened realtime connection.
pub struct RealtimeChannel {
    name: &'static str,
    url: Url,
    handshake: Vec<Frame>,
    reconnect: Option<ReconnectConfig>,
    cancel: CancellationToken,
    open: Mutex<Option<OpenChannel>>,
}

impl RealtimeChannel {
    /// `handshake` frames are sent on every (re)connect. `cancel` is the
    /// owner's token; each connection runs on a child of it.
    pub fn new(
        name: &'static str,
        url: Url,
        handshake: Vec<Frame>,
        reconnect: Option<ReconnectConfig>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name,
            url,
            handshake,
            reconnect,
            cancel,
            open: Mutex::new(None),
        }
    }

    /// Connect and start delivering messages to `on_message`.
    ///
    /// Returns `false` without doing anything if a live connection already
    /// exists. A connection whose task has ended counts as closed and is
    /// replaced. Must be called from within a tokio runtime.
    pub fn open<F>(&self, mut on_message: F) -> bool
    where
        F: FnMut(Arc<RealtimeMessage>) + Send + 'static,
    {
        let mut slot = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|o| !o.handle.is_shut_down()) {
            debug!(channel = self.name, "realtime channel already open");
            return false;
        }
        if let Some(stale) = slot.take() {
            stale.listener.abort();
        }

        info!(channel = self.name, url = %self.url, "opening realtime channel");
        let handle = RealtimeHandle::connect(
            self.url.clone(),
            self.handshake.clone(),
            self.reconnect.clone(),
            self.cancel.child_token(),
        );
        let mut rx = handle.subscribe();
        let name = self.name;
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => on_message(message),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(channel = name, skipped, "realtime listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        *slot = Some(OpenChannel { handle, listener });
        true
    }

    /// Remove the listener, then disconnect. Safe to call when closed.
    /// Returns whether a connection was torn down.
    pub fn close(&self) -> bool {
        let taken = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(open) => {
                open.listener.abort();
                open.handle.shutdown();
                info!(channel = self.name, "realtime channel closed");
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|o| !o.handle.is_shut_down())
    }

    /// Send a request frame over the open connection.
    pub fn emit(&self, frame: Frame) -> Result<(), CoreError> {
        let slot = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(open) = slot.as_ref() else {
            return Err(CoreError::ChannelDisconnected {
                reason: format!("{} channel is not open", self.name),
            });
        };
        open.handle.emit(frame).map_err(CoreError::from)
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    fn unreachable_channel() -> RealtimeChannel {
        // Port 9 (discard) is closed on loopback
        RealtimeChannel::new(
            "devices",
            Url::parse("ws://127.0.0.1:9/").unwrap(),
            Vec::new(),
            None,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn close_when_never_opened_is_a_no_op() {
        let channel = unreachable_channel();
        assert!(!channel.close());
        assert!(!channel.is_open());
        assert!(matches!(
            channel.emit(Frame::new("x", serde_json::Value::Null)),
            Err(CoreError::ChannelDisconnected { .. })
        ));
    }

    #[tokio::test]
    async fn open_is_idempotent_while_live() {
        let channel = RealtimeChannel::new(
            "devices",
            Url::parse("ws://127.0.0.1:9/").unwrap(),
            Vec::new(),
            Some(ReconnectConfig {
                initial_delay: Duration::from_secs(60),
                ..ReconnectConfig::default()
            }),
            CancellationToken::new(),
        );
        assert!(channel.open(|_| {}));
        assert!(!channel.open(|_| {}));
        assert!(channel.close());
        assert!(!channel.close());
    }

    #[tokio::test]
    async fn failed_connect_reports_disconnect_to_listener() {
        let channel = unreachable_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        channel.open(move |msg| {
            let _ = tx.send(msg);
        });

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg.as_ref(), RealtimeMessage::Disconnected { .. }));
    }
}

// ── Keyed debounce timers ──
//
// `schedule(key, payload, delay)` arms a timer for `key`; scheduling the
// same key again before it fires replaces the payload and restarts the
// timer. Fired payloads are delivered on an mpsc receiver handed out at
// construction.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct Pending {
    generation: u64,
    cancel: CancellationToken,
}

struct State<K> {
    pending: HashMap<K, Pending>,
    next_generation: u64,
}

/// Per-key debouncer. Cheap to clone; clones share timers.
pub struct Coalescer<K, P> {
    state: Arc<Mutex<State<K>>>,
    ready_tx: mpsc::UnboundedSender<(K, P)>,
}

impl<K, P> Clone for Coalescer<K, P> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            ready_tx: self.ready_tx.clone(),
        }
    }
}

impl<K, P> Coalescer<K, P>
where
    K: Eq + Hash + Clone + Send + 'static,
    P: Send + 'static,
{
    /// Create a coalescer and the receiver its fired payloads arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(K, P)>) {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let state = State {
            pending: HashMap::new(),
            next_generation: 0,
        };
        (
            Self {
                state: Arc::new(Mutex::new(state)),
                ready_tx,
            },
            ready_rx,
        )
    }

    /// Arm (or re-arm) the timer for `key`. A zero delay delivers at once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, key: K, payload: P, delay: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = state.pending.remove(&key) {
            previous.cancel.cancel();
        }

        if delay.is_zero() {
            drop(state);
            let _ = self.ready_tx.send((key, payload));
            return;
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let cancel = CancellationToken::new();
        state.pending.insert(
            key.clone(),
            Pending {
                generation,
                cancel: cancel.clone(),
            },
        );
        drop(state);

        let deadline = tokio::time::Instant::now() + delay;
        let shared = Arc::clone(&self.state);
        let ready_tx = self.ready_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => {
                    let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                    let current = state.pending.get(&key).map(|p| p.generation);
                    if current == Some(generation) {
                        state.pending.remove(&key);
                        drop(state);
                        let _ = ready_tx.send((key, payload));
                    }
                }
            }
        });
    }

    /// Drop the pending payload for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.pending.remove(key) {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop every pending payload.
    pub fn cancel_all(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, pending) in state.pending.drain() {
            pending.cancel.cancel();
        }
    }

    pub fn pending_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

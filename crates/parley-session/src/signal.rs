//! Cross-window session signal.
//!
//! A memory-only broadcast of which session is active plus a few UI-transient
//! flags. Writes carry a timestamp and an older write never replaces a newer
//! one. Only `session_id` matters for correctness; it lets a window that lost
//! its local state recover the session it belongs to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::trace;

use parley_core::SessionId;

/// Latest known cross-window state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSignal {
    pub session_id: Option<SessionId>,
    pub is_listening: bool,
    pub is_loading: bool,
    pub timestamp: DateTime<Utc>,
}

impl SessionSignal {
    /// An empty signal, older than any real write.
    pub fn empty() -> Self {
        Self {
            session_id: None,
            is_listening: false,
            is_loading: false,
            timestamp: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// Shared handle to the signal. Clones observe and publish the same value.
#[derive(Clone, Debug)]
pub struct SessionSignalBus {
    tx: Arc<watch::Sender<SessionSignal>>,
}

impl Default for SessionSignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSignalBus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSignal::empty());
        Self { tx: Arc::new(tx) }
    }

    /// Store `signal` unless a newer one is already held. Returns whether it
    /// was accepted.
    pub fn publish(&self, signal: SessionSignal) -> bool {
        self.tx.send_if_modified(|current| {
            if signal.timestamp < current.timestamp {
                trace!(
                    incoming = %signal.timestamp,
                    held = %current.timestamp,
                    "ignoring stale session signal"
                );
                return false;
            }
            *current = signal;
            true
        })
    }

    /// Publish a new active session id, keeping the current flags.
    pub fn publish_session(&self, session_id: Option<SessionId>) -> bool {
        self.update(|current| current.session_id = session_id)
    }

    /// Publish UI flags, keeping the current session id.
    pub fn publish_flags(&self, is_listening: bool, is_loading: bool) -> bool {
        self.update(|current| {
            current.is_listening = is_listening;
            current.is_loading = is_loading;
        })
    }

    /// Apply `change` to the held value and stamp it, under the channel lock.
    fn update(&self, change: impl FnOnce(&mut SessionSignal)) -> bool {
        self.tx.send_if_modified(|current| {
            let now = Utc::now();
            if now < current.timestamp {
                trace!(held = %current.timestamp, "held session signal is newer than now, update ignored");
                return false;
            }
            change(current);
            current.timestamp = now;
            true
        })
    }

    pub fn latest(&self) -> SessionSignal {
        self.tx.borrow().clone()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.tx.borrow().session_id.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSignal> {
        self.tx.subscribe()
    }
}

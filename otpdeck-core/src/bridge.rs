//! The import bridge: a one-shot, cross-surface delivery channel.
//!
//! The scanner surface and the main session are independent contexts that
//! never share memory. The bridge gives the scanner side a fire-once
//! [`BridgeEmitter`] and the main session a single-slot
//! [`BridgeSubscription`] that observes the last emitted [`ImportEvent`].
//!
//! Ordering guarantee: the subscription exists before any emitter can be
//! handed out, and the slot retains the last emission, so an emit that
//! lands before the session task gets around to awaiting is never lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::model::ImportEvent;
use crate::surface::SurfaceId;

/// Error from import-bridge operations.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The channel could not be established. The session continues
    /// without a live import path; this is degraded, not fatal.
    #[error("failed to establish import bridge: {message}")]
    Setup { message: String },

    /// This emitter has already fired once.
    #[error("import bridge emitter already used")]
    AlreadyEmitted,

    /// The subscribing side is gone.
    #[error("import bridge subscription closed")]
    Closed,
}

/// Main-session side of the bridge.
///
/// Owns the sending half of the slot and mints one-shot emitters, one per
/// scanner-surface lifetime.
#[derive(Clone)]
pub struct ImportBridge {
    tx: Arc<watch::Sender<Option<ImportEvent>>>,
}

impl ImportBridge {
    /// Establish the bridge.
    ///
    /// Returns the bridge together with its single subscription. Emitters
    /// can only be minted from the returned bridge, which enforces
    /// subscribe-before-emit.
    pub fn arm() -> Result<(Self, BridgeSubscription), BridgeError> {
        let (tx, rx) = watch::channel(None);
        let bridge = Self { tx: Arc::new(tx) };
        let subscription = BridgeSubscription {
            rx,
            last_seen: None,
        };
        tracing::debug!("import bridge armed");
        Ok((bridge, subscription))
    }

    /// Mint a one-shot emitter for a scanner surface.
    pub fn emitter(&self, source: SurfaceId) -> BridgeEmitter {
        BridgeEmitter {
            tx: Arc::clone(&self.tx),
            source,
            spent: AtomicBool::new(false),
        }
    }
}

/// Scanner-surface side of the bridge. Fires at most once.
pub struct BridgeEmitter {
    tx: Arc<watch::Sender<Option<ImportEvent>>>,
    source: SurfaceId,
    spent: AtomicBool,
}

impl BridgeEmitter {
    /// Deliver a decoded payload to the main session.
    ///
    /// The first call delivers and returns the event identity; every
    /// later call is rejected with [`BridgeError::AlreadyEmitted`] and
    /// delivers nothing.
    pub fn emit(&self, payload: impl Into<String>) -> Result<Uuid, BridgeError> {
        if self.spent.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::AlreadyEmitted);
        }

        let event = ImportEvent::new(self.source.clone(), payload);
        let event_id = event.event_id;
        self.tx
            .send(Some(event))
            .map_err(|_| BridgeError::Closed)?;

        tracing::debug!(%event_id, surface = %self.source, "scan payload emitted");
        Ok(event_id)
    }

    /// The surface this emitter belongs to.
    pub fn source(&self) -> &SurfaceId {
        &self.source
    }
}

/// Single-slot "last event" subscription held by the main session.
pub struct BridgeSubscription {
    rx: watch::Receiver<Option<ImportEvent>>,
    last_seen: Option<Uuid>,
}

impl BridgeSubscription {
    /// Await the next distinct emission.
    ///
    /// Each emission is returned exactly once, keyed by event identity:
    /// two emissions carrying identical payload text are both delivered.
    /// Returns `None` once the bridge (sender side) is gone.
    pub async fn next_event(&mut self) -> Option<ImportEvent> {
        loop {
            let candidate = self.rx.borrow_and_update().clone();
            if let Some(event) = candidate {
                if Some(event.event_id) != self.last_seen {
                    self.last_seen = Some(event.event_id);
                    return Some(event);
                }
            }

            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

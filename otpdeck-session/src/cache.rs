//! The account cache: source of truth for everything the UI displays.
//!
//! The cache holds one immutable [`Snapshot`] at a time. A refetch always
//! replaces the whole snapshot; there are no partial merges, because the
//! backend is the sole authority on rotation state and a merge could pin a
//! stale `expires_at`. Readers (countdown ticks, the scheduler) re-read
//! the current snapshot at their own tick time and never hold on to a
//! previous one.

use otpdeck_core::Account;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// An immutable, wholesale view of all accounts at a point in time.
pub type Snapshot = Arc<Vec<Account>>;

/// Shared holder of the current snapshot.
///
/// Replacement is atomic and fans out to all subscribers through a watch
/// channel; the scheduler re-derives its wake from every change.
pub struct AccountCache {
    tx: watch::Sender<Snapshot>,
}

impl AccountCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx }
    }

    /// The current snapshot. Cheap; clones only the `Arc`.
    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Install a new snapshot, replacing the previous one wholesale and
    /// notifying all subscribers.
    pub fn replace(&self, accounts: Vec<Account>) {
        tracing::debug!(count = accounts.len(), "snapshot replaced");
        self.tx.send_replace(Arc::new(accounts));
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Snapshot replacements as a `Stream`, for UI layers.
    pub fn stream(&self) -> WatchStream<Snapshot> {
        WatchStream::new(self.subscribe())
    }

    /// Drop all accounts. Used on session teardown.
    pub fn clear(&self) {
        self.replace(Vec::new());
    }
}

impl Default for AccountCache {
    fn default() -> Self {
        Self::new()
    }
}

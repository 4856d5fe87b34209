//! The refresh scheduler.
//!
//! Guarantees the session refetches account state just after the earliest
//! rotation boundary in the current snapshot, with a single armed timer
//! and no per-account polling. The wake is an explicit state machine:
//! `Idle` or `Armed`, and every transition out of `Armed` cancels the
//! timer task explicitly.
//!
//! A small grace margin is added past the boundary so the refetch
//! observes the already-rotated code instead of racing the backend.

use otpdeck_core::{Account, AccountService, Error, Notice, NoticeSink};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cache::AccountCache;
use crate::clock::wall_now_ms;

/// Default margin past the rotation boundary, in milliseconds.
pub const DEFAULT_GRACE_MS: u64 = 500;

/// Earliest rotation boundary in a snapshot, if any.
pub(crate) fn next_boundary(accounts: &[Account]) -> Option<i64> {
    accounts.iter().map(|a| a.expires_at).min()
}

/// Delay until a wake for `boundary_s`, as seen from `now_ms`.
///
/// A boundary already in the past still gets the grace margin, so a
/// refetch is issued promptly but never at delay zero in a tight loop.
pub(crate) fn wake_delay(boundary_s: i64, now_ms: i64, grace_ms: u64) -> Duration {
    let until_boundary = (boundary_s * 1000 - now_ms).max(0) as u64;
    Duration::from_millis(until_boundary + grace_ms)
}

enum WakeState {
    Idle,
    Armed {
        due_at_ms: i64,
        handle: JoinHandle<()>,
    },
}

/// Wake state plus a generation counter.
///
/// Every transition that invalidates an outstanding timer bumps the
/// generation; a firing task whose generation is stale must not touch the
/// state machine or refetch, even if its abort has not landed yet.
struct WakeSlot {
    generation: u64,
    state: WakeState,
}

/// Single-timer scheduler driving full account refetches.
///
/// Subscribes to cache replacements and re-derives its one armed wake
/// from every new snapshot. On fire it refetches and installs the result,
/// which re-arms through the same subscription. A failed refetch leaves
/// the scheduler idle; any later successful refresh (user-triggered or
/// otherwise) resumes scheduling.
pub struct RefreshScheduler {
    service: Arc<dyn AccountService>,
    cache: Arc<AccountCache>,
    notices: Arc<dyn NoticeSink>,
    grace_ms: u64,
    slot: Mutex<WakeSlot>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    /// Create the scheduler and start watching the cache.
    pub fn start(
        service: Arc<dyn AccountService>,
        cache: Arc<AccountCache>,
        notices: Arc<dyn NoticeSink>,
        grace_ms: u64,
    ) -> Arc<Self> {
        let scheduler = Arc::new(Self {
            service,
            cache: Arc::clone(&cache),
            notices,
            grace_ms,
            slot: Mutex::new(WakeSlot {
                generation: 0,
                state: WakeState::Idle,
            }),
            watcher: Mutex::new(None),
        });

        let this = Arc::clone(&scheduler);
        let mut rx = cache.subscribe();
        let watcher = tokio::spawn(async move {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                this.rearm(&snapshot);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        *scheduler.watcher.lock() = Some(watcher);

        scheduler
    }

    /// Cancel any armed wake and derive a new one from `snapshot`.
    ///
    /// An empty snapshot disarms: nothing rotates, so nothing to wake
    /// for until a mutation forces a refresh.
    fn rearm(self: &Arc<Self>, snapshot: &[Account]) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        if let WakeState::Armed { handle, .. } =
            std::mem::replace(&mut slot.state, WakeState::Idle)
        {
            handle.abort();
        }

        let Some(boundary) = next_boundary(snapshot) else {
            tracing::debug!("empty snapshot, scheduler idle");
            return;
        };

        let now = wall_now_ms();
        let delay = wake_delay(boundary, now, self.grace_ms);
        let due_at_ms = now + delay.as_millis() as i64;

        let generation = slot.generation;
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire(generation).await;
        });

        tracing::debug!(boundary, due_at_ms, "refresh wake armed");
        slot.state = WakeState::Armed { due_at_ms, handle };
    }

    /// The armed wake fired: refetch and install the new snapshot.
    async fn fire(self: Arc<Self>, generation: u64) {
        {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                // Superseded between sleep completion and here; a newer
                // wake owns the state machine now.
                tracing::debug!(generation, "stale wake ignored");
                return;
            }
            slot.state = WakeState::Idle;
        }
        tracing::debug!("refresh wake fired");

        // Errors are already surfaced; a later refresh re-arms us.
        let _ = self.refetch_now().await;
    }

    /// Refetch the full snapshot and install it.
    ///
    /// On success the cache replacement supersedes any armed wake via the
    /// cache subscription. On failure the cache and any armed wake are
    /// left exactly as they were.
    pub async fn refetch_now(&self) -> Result<(), Error> {
        match self.service.list_accounts().await {
            Ok(accounts) => {
                self.cache.replace(accounts);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "account refetch failed");
                self.notices
                    .notify(Notice::error("error-refresh", e.to_string()));
                Err(e.into())
            }
        }
    }

    /// When the armed wake is due, if any. Epoch milliseconds.
    pub fn armed_due_at_ms(&self) -> Option<i64> {
        match &self.slot.lock().state {
            WakeState::Idle => None,
            WakeState::Armed { due_at_ms, .. } => Some(*due_at_ms),
        }
    }

    /// Cancel the armed wake, if any.
    pub fn disarm(&self) {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        if let WakeState::Armed { handle, .. } =
            std::mem::replace(&mut slot.state, WakeState::Idle)
        {
            handle.abort();
            tracing::debug!("refresh wake disarmed");
        }
    }

    /// Stop watching the cache and cancel everything. Idempotent.
    pub fn shutdown(&self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
        self.disarm();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_boundary_is_min() {
        use otpdeck_core::AccountId;

        let accounts = vec![
            Account {
                id: AccountId::new("1"),
                name: "a".into(),
                code: "000000".into(),
                expires_at: 130,
            },
            Account {
                id: AccountId::new("2"),
                name: "b".into(),
                code: "111111".into(),
                expires_at: 100,
            },
        ];
        assert_eq!(next_boundary(&accounts), Some(100));
        assert_eq!(next_boundary(&[]), None);
    }

    #[test]
    fn test_wake_delay_includes_grace() {
        // Boundary 5s out, 500ms grace.
        assert_eq!(
            wake_delay(105, 100_000, 500),
            Duration::from_millis(5_500)
        );
    }

    #[test]
    fn test_wake_delay_past_boundary_clamps_to_grace() {
        assert_eq!(wake_delay(95, 100_000, 500), Duration::from_millis(500));
        assert_eq!(wake_delay(100, 100_000, 500), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fire_cannot_oust_the_current_wake() {
        use crate::cache::AccountCache;
        use otpdeck_core::{AccountId, ChannelNoticeSink, MemoryAccountService};

        let service = Arc::new(MemoryAccountService::new());
        let cache = Arc::new(AccountCache::new());
        let (sink, _rx) = ChannelNoticeSink::new();
        let scheduler = RefreshScheduler::start(
            Arc::clone(&service) as Arc<dyn AccountService>,
            Arc::clone(&cache),
            Arc::new(sink),
            500,
        );

        let now = chrono::Utc::now().timestamp();
        cache.replace(vec![Account {
            id: AccountId::new("1"),
            name: "a".into(),
            code: "000000".into(),
            expires_at: now + 30,
        }]);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let armed = scheduler.armed_due_at_ms();
        assert!(armed.is_some());

        // A timer task from a superseded arming reaches the state machine
        // after its replacement: it must neither disarm the current wake
        // nor refetch.
        Arc::clone(&scheduler).fire(0).await;
        assert_eq!(scheduler.armed_due_at_ms(), armed);
        assert_eq!(service.list_calls(), 0);
    }
}

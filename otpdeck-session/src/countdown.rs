//! Per-account countdown tickers.
//!
//! Each displayed account gets its own ticker publishing "seconds left"
//! once per second. Ticks are phase-aligned to wall-clock second
//! boundaries (`1000 - now % 1000` until the next tick), so the displayed
//! value flips when the clock does, no matter when observation began.
//! A ticker stops at zero; by then the refresh scheduler has delivered a
//! new `expires_at` and the ticker is respawned from the new snapshot.

use otpdeck_core::{Account, AccountId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::Snapshot;
use crate::clock::Anchor;

/// Seconds left before `expires_at_s`, as of `now_ms`. Ceiling, so a
/// partially elapsed second still counts.
pub(crate) fn remaining(expires_at_s: i64, now_ms: i64) -> u64 {
    let remaining_ms = expires_at_s * 1000 - now_ms;
    if remaining_ms <= 0 {
        0
    } else {
        ((remaining_ms + 999) / 1000) as u64
    }
}

/// Delay until the next wall-clock second boundary.
pub(crate) fn tick_phase_delay(now_ms: i64) -> Duration {
    Duration::from_millis((1000 - now_ms.rem_euclid(1000)) as u64)
}

/// A single account's countdown task.
pub struct Countdown;

impl Countdown {
    /// Spawn a ticker for one rotation boundary.
    pub fn spawn(expires_at_s: i64) -> CountdownHandle {
        Self::spawn_anchored(expires_at_s, Anchor::new())
    }

    pub(crate) fn spawn_anchored(expires_at_s: i64, anchor: Anchor) -> CountdownHandle {
        let (tx, rx) = watch::channel(remaining(expires_at_s, anchor.now_ms()));

        let handle = tokio::spawn(async move {
            loop {
                let now = anchor.now_ms();
                let left = remaining(expires_at_s, now);
                if tx.send(left).is_err() {
                    break;
                }
                if left == 0 {
                    break;
                }
                tokio::time::sleep(tick_phase_delay(now)).await;
            }
        });

        CountdownHandle { rx, handle }
    }
}

/// Handle to a live countdown. Dropping it tears the ticker down.
pub struct CountdownHandle {
    rx: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl CountdownHandle {
    /// Current seconds-left value.
    pub fn remaining(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Watch the ticking value.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.rx.clone()
    }

    /// Whether the ticker task has finished (reached zero).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One ticker per displayed account, kept in sync with the snapshot.
pub struct CountdownSet {
    tickers: HashMap<AccountId, (i64, CountdownHandle)>,
}

impl CountdownSet {
    pub fn new() -> Self {
        Self {
            tickers: HashMap::new(),
        }
    }

    /// Reconcile tickers against a new snapshot: removed accounts are
    /// torn down, changed boundaries respawned, unchanged ones kept.
    pub fn sync(&mut self, snapshot: &Snapshot) {
        self.tickers
            .retain(|id, _| snapshot.iter().any(|a| &a.id == id));

        for account in snapshot.iter() {
            let respawn = match self.tickers.get(&account.id) {
                Some((expires_at, _)) => *expires_at != account.expires_at,
                None => true,
            };
            if respawn {
                self.tickers.insert(
                    account.id.clone(),
                    (account.expires_at, Countdown::spawn(account.expires_at)),
                );
            }
        }
    }

    /// Current seconds-left for one account, if displayed.
    pub fn remaining(&self, id: &AccountId) -> Option<u64> {
        self.tickers.get(id).map(|(_, handle)| handle.remaining())
    }

    /// Watch one account's ticker.
    pub fn subscribe(&self, id: &AccountId) -> Option<watch::Receiver<u64>> {
        self.tickers.get(id).map(|(_, handle)| handle.subscribe())
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Tear down all tickers.
    pub fn clear(&mut self) {
        self.tickers.clear();
    }
}

impl Default for CountdownSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience view: snapshot accounts paired with live seconds-left.
pub fn with_remaining(snapshot: &Snapshot, set: &CountdownSet) -> Vec<(Account, u64)> {
    snapshot
        .iter()
        .map(|a| {
            let left = set.remaining(&a.id).unwrap_or(0);
            (a.clone(), left)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_remaining_ceiling() {
        assert_eq!(remaining(100, 97_500), 3);
        assert_eq!(remaining(100, 99_999), 1);
        assert_eq!(remaining(100, 100_000), 0);
        assert_eq!(remaining(100, 100_500), 0);
    }

    #[test]
    fn test_tick_phase_delay_lands_on_second_boundary() {
        assert_eq!(tick_phase_delay(100_250), Duration::from_millis(750));
        assert_eq!(tick_phase_delay(100_999), Duration::from_millis(1));
        // Exactly on a boundary: a full second until the next one.
        assert_eq!(tick_phase_delay(100_000), Duration::from_millis(1000));
    }

    #[test]
    fn test_tick_phase_alignment_from_arbitrary_start() {
        // Wherever observation starts within a second, start + delay is
        // always the next whole second.
        for offset in [1, 250, 499, 500, 750, 999] {
            let now = 1_000_000 + offset;
            let delay = tick_phase_delay(now).as_millis() as i64;
            assert_eq!((now + delay) % 1000, 0, "offset {offset}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_decrement_on_second_boundaries() {
        // Anchor mid-second: 3.75s of validity left.
        let anchor = Anchor::at(1_000_250);
        let handle = Countdown::spawn_anchored(1_004, anchor);

        assert_eq!(handle.remaining(), 4);

        // First tick lands on the next second boundary, 750ms out.
        tokio::time::sleep(Duration::from_millis(760)).await;
        assert_eq!(handle.remaining(), 3);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(handle.remaining(), 2);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(handle.remaining(), 1);

        // Final tick reaches zero and the task stops rescheduling.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(handle.remaining(), 0);
        tokio::task::yield_now().await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_down_ticker() {
        let anchor = Anchor::at(1_000_000);
        let handle = Countdown::spawn_anchored(1_030, anchor);
        let mut rx = handle.subscribe();
        drop(handle);

        // The sender side is gone once the task is aborted.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_sync_adds_removes_and_respawns() {
        use otpdeck_core::AccountId;

        let account = |id: &str, expires_at: i64| Account {
            id: AccountId::new(id),
            name: id.to_string(),
            code: "000000".into(),
            expires_at,
        };

        let mut set = CountdownSet::new();

        let snapshot: Snapshot = Arc::new(vec![account("1", 100), account("2", 130)]);
        set.sync(&snapshot);
        assert_eq!(set.len(), 2);

        // Account 2 disappears, account 1 rotates to a new boundary.
        let snapshot: Snapshot = Arc::new(vec![account("1", 130)]);
        set.sync(&snapshot);
        assert_eq!(set.len(), 1);
        assert!(set.remaining(&AccountId::new("2")).is_none());

        set.clear();
        assert!(set.is_empty());
    }
}

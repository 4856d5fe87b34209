//! Session wiring: the live OTP account session behind the main surface.
//!
//! Owns the account cache, the refresh scheduler, the countdown tickers,
//! the mutation pipeline and the import bridge, and tears all of them
//! down together. Everything here is cooperative: no call blocks the
//! surface's event loop, and countdown ticks keep running while a refetch
//! or mutation is outstanding.

use otpdeck_core::{
    AccountDraft, AccountId, AccountService, BridgeError, Error, ImportBridge, Notice,
    NoticeSink, SurfaceHost,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::{AccountCache, Snapshot};
use crate::config::SessionConfig;
use crate::countdown::CountdownSet;
use crate::mutate::{Intent, MutationSerializer, Origin, SubmitOutcome};
use crate::scan::{ScanSurfaceManager, ScannerLaunch};
use crate::sched::RefreshScheduler;

/// The main-surface session controller.
pub struct Session {
    service: Arc<dyn AccountService>,
    cache: Arc<AccountCache>,
    scheduler: Arc<RefreshScheduler>,
    serializer: Arc<MutationSerializer>,
    notices: Arc<dyn NoticeSink>,
    scan: Option<ScanSurfaceManager>,
    countdowns: Arc<Mutex<CountdownSet>>,
    bridge_task: Mutex<Option<JoinHandle<()>>>,
    countdown_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Session {
    /// Start a session: arm the import bridge, start the scheduler and
    /// countdown reconciliation, and issue the initial refetch.
    ///
    /// A failed initial refetch is surfaced as a notice and leaves the
    /// cache empty; the session still starts.
    pub async fn start(
        service: Arc<dyn AccountService>,
        host: Arc<dyn SurfaceHost>,
        notices: Arc<dyn NoticeSink>,
        config: SessionConfig,
    ) -> Self {
        let cache = Arc::new(AccountCache::new());
        let scheduler = RefreshScheduler::start(
            Arc::clone(&service),
            Arc::clone(&cache),
            Arc::clone(&notices),
            config.grace_ms,
        );
        let serializer = Arc::new(MutationSerializer::new(
            Arc::clone(&service),
            Arc::clone(&notices),
            config.debounce_ms,
        ));

        // Countdown reconciliation: one ticker per account in the
        // current snapshot, re-diffed on every replacement.
        let countdowns = Arc::new(Mutex::new(CountdownSet::new()));
        let countdown_task = {
            let countdowns = Arc::clone(&countdowns);
            let mut rx = cache.subscribe();
            tokio::spawn(async move {
                loop {
                    let snapshot = rx.borrow_and_update().clone();
                    countdowns.lock().sync(&snapshot);
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            })
        };

        // The bridge is armed before any scanner surface can exist. A
        // setup failure degrades the session: no scan import this
        // lifetime, everything else keeps working.
        let (scan, bridge_task) = match ImportBridge::arm() {
            Ok((bridge, mut subscription)) => {
                let scan = ScanSurfaceManager::new(
                    Arc::clone(&host),
                    bridge,
                    config.scanner_width,
                    config.scanner_height,
                );

                let serializer = Arc::clone(&serializer);
                let scheduler = Arc::clone(&scheduler);
                let task = tokio::spawn(async move {
                    while let Some(event) = subscription.next_event().await {
                        tracing::info!(
                            event_id = %event.event_id,
                            surface = %event.source_surface,
                            "import event received"
                        );
                        let outcome = serializer
                            .submit(
                                &Origin::scan_bridge(),
                                Intent::Import {
                                    payload: event.payload,
                                },
                            )
                            .await;
                        if matches!(outcome, Ok(SubmitOutcome::Applied)) {
                            let _ = scheduler.refetch_now().await;
                        }
                    }
                });

                (Some(scan), Some(task))
            }
            Err(e) => {
                tracing::warn!(error = %e, "import bridge setup failed, scan import disabled");
                (None, None)
            }
        };

        let session = Self {
            service,
            cache,
            scheduler,
            serializer,
            notices,
            scan,
            countdowns,
            bridge_task: Mutex::new(bridge_task),
            countdown_task: Mutex::new(Some(countdown_task)),
            closed: AtomicBool::new(false),
        };

        // Populate the cache. Failure is already surfaced as a notice.
        let _ = session.refresh().await;

        session
    }

    /// The current account snapshot.
    pub fn accounts(&self) -> Snapshot {
        self.cache.snapshot()
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.cache.subscribe()
    }

    /// Seconds left on one account's code, if it is displayed.
    pub fn remaining(&self, id: &AccountId) -> Option<u64> {
        self.countdowns.lock().remaining(id)
    }

    /// Watch one account's countdown.
    pub fn countdown(&self, id: &AccountId) -> Option<watch::Receiver<u64>> {
        self.countdowns.lock().subscribe(id)
    }

    /// Refetch the snapshot now. Supersedes any armed wake.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.scheduler.refetch_now().await
    }

    /// Submit a mutation; on success the cache is refreshed.
    pub async fn submit(
        &self,
        origin: &Origin,
        intent: Intent,
    ) -> Result<SubmitOutcome, Error> {
        let outcome = self.serializer.submit(origin, intent).await?;
        if outcome == SubmitOutcome::Applied {
            self.refresh().await?;
        }
        Ok(outcome)
    }

    /// Fetch an account's secret and build an edit draft from it.
    pub async fn edit_draft(&self, id: &AccountId) -> Result<AccountDraft, Error> {
        match self.service.get_account_secret(id).await {
            Ok(secret) => {
                let name = self
                    .cache
                    .snapshot()
                    .iter()
                    .find(|a| &a.id == id)
                    .map(|a| a.name.clone())
                    .unwrap_or_default();
                Ok(AccountDraft::edit(id.clone(), name, secret))
            }
            Err(e) => {
                self.notices
                    .notify(Notice::error("error-secret", e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Open the scanner surface.
    ///
    /// Fails with a bridge error when the session started degraded
    /// (bridge setup failed at start).
    pub async fn open_scanner(&self) -> Result<ScannerLaunch, Error> {
        let Some(scan) = &self.scan else {
            return Err(Error::Bridge(BridgeError::Setup {
                message: "import bridge unavailable for this session".to_string(),
            }));
        };
        Ok(scan.open().await?)
    }

    /// Whether scan import is available.
    pub fn scan_available(&self) -> bool {
        self.scan.is_some()
    }

    /// Tear the session down: cancel the armed wake, stop all countdown
    /// tickers, drop the bridge subscription, clear the cache. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("session closing");

        self.scheduler.shutdown();
        if let Some(task) = self.countdown_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.bridge_task.lock().take() {
            task.abort();
        }
        self.countdowns.lock().clear();
        self.cache.clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

//! End-to-end session tests: scan-to-import through the bridge, countdown
//! wiring, draft editing, and teardown.

use async_trait::async_trait;
use otpdeck_core::{
    AccountService, ChannelNoticeSink, MemoryAccountService, Notice, NoticeKind, Surface,
    SurfaceConfig, SurfaceError, SurfaceHost, SurfaceId,
};
use otpdeck_session::{Intent, Origin, Session, SessionConfig, SubmitOutcome};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

struct MockSurface {
    id: SurfaceId,
}

#[async_trait]
impl Surface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id.clone()
    }

    async fn show(&self) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn focus(&self) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

#[derive(Default)]
struct MockHost {
    created: Mutex<Vec<SurfaceConfig>>,
}

#[async_trait]
impl SurfaceHost for MockHost {
    async fn create_surface(
        &self,
        config: SurfaceConfig,
    ) -> Result<Arc<dyn Surface>, SurfaceError> {
        self.created.lock().push(config.clone());
        Ok(Arc::new(MockSurface { id: config.label }))
    }

    async fn find_surface(&self, _id: &SurfaceId) -> Option<Arc<dyn Surface>> {
        None
    }
}

async fn start_session() -> (
    Arc<MemoryAccountService>,
    Arc<MockHost>,
    Session,
    mpsc::UnboundedReceiver<Notice>,
) {
    let service = Arc::new(MemoryAccountService::new());
    let host = Arc::new(MockHost::default());
    let (sink, rx) = ChannelNoticeSink::new();

    let session = Session::start(
        Arc::clone(&service) as Arc<dyn AccountService>,
        Arc::clone(&host) as Arc<dyn SurfaceHost>,
        Arc::new(sink),
        SessionConfig::default(),
    )
    .await;

    (service, host, session, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_scan_to_import_end_to_end() {
    let (service, host, session, mut rx) = start_session().await;
    assert!(session.scan_available());

    // Opening the scanner creates the locked-down surface and hands out
    // a one-shot emitter.
    let launch = session.open_scanner().await.unwrap();
    {
        let created = host.created.lock();
        assert_eq!(created.len(), 1);
        assert!(!created[0].resizable);
        assert!(!created[0].decorations);
        assert!(created[0].transparent);
    }

    // The scanner surface scans and emits.
    launch
        .emitter
        .emit("otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP")
        .unwrap();
    settle().await;

    // The import landed, the cache was refreshed, and the scheduler
    // derived a wake from the fresh snapshot.
    let accounts = session.accounts();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "alice");
    assert_eq!(service.list_calls(), 2, "initial fetch plus post-import refresh");

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Success);
    assert!(notices[0].key.starts_with("import-"));
}

#[tokio::test(start_paused = true)]
async fn test_two_scans_of_identical_payload_both_trigger_imports() {
    let (_service, _host, session, mut rx) = start_session().await;
    let uri = "otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP";

    let first = session.open_scanner().await.unwrap();
    first.emitter.emit(uri).unwrap();
    settle().await;

    // Past the debounce window, a second scan of the very same payload
    // is a distinct event and triggers its own import attempt. The
    // backend already has the entry, so this one adds nothing.
    tokio::time::sleep(Duration::from_millis(301)).await;
    let second = session.open_scanner().await.unwrap();
    second.emitter.emit(uri).unwrap();
    settle().await;

    assert_eq!(session.accounts().len(), 1);

    let kinds: Vec<NoticeKind> = drain(&mut rx).into_iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NoticeKind::Success, NoticeKind::Info]);
}

#[tokio::test(start_paused = true)]
async fn test_scanner_closed_without_result_is_not_an_error() {
    let (service, _host, session, mut rx) = start_session().await;

    let launch = session.open_scanner().await.unwrap();
    // Surface closed externally, emitter dropped, nothing emitted.
    drop(launch);
    settle().await;

    assert!(session.accounts().is_empty());
    assert_eq!(service.list_calls(), 1, "only the initial fetch");
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_mutation_refreshes_cache_and_arms_countdowns() {
    let (_service, _host, session, mut rx) = start_session().await;

    let outcome = session
        .submit(
            &Origin::new("account-form"),
            Intent::Create {
                name: "github".to_string(),
                secret: "JBSWY3DPEHPK3PXP".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::Applied);
    settle().await;

    let accounts = session.accounts();
    assert_eq!(accounts.len(), 1);

    // The countdown reconciler picked the account up; its value is a
    // sane seconds-left for a 30s rotation step.
    let left = session.remaining(&accounts[0].id).unwrap();
    assert!(left <= 30, "left = {left}");

    let notices = drain(&mut rx);
    assert_eq!(notices[0].key, "create-github");
}

#[tokio::test(start_paused = true)]
async fn test_edit_draft_pulls_secret_from_service() {
    let (_service, _host, session, _rx) = start_session().await;

    session
        .submit(
            &Origin::new("account-form"),
            Intent::Create {
                name: "github".to_string(),
                secret: "JBSWY3DPEHPK3PXP".to_string(),
            },
        )
        .await
        .unwrap();
    settle().await;

    let id = session.accounts()[0].id.clone();
    let draft = session.edit_draft(&id).await.unwrap();
    assert_eq!(draft.id, Some(id));
    assert_eq!(draft.name, "github");
    assert_eq!(draft.secret.as_str(), "JBSWY3DPEHPK3PXP");
}

#[tokio::test(start_paused = true)]
async fn test_edit_draft_for_unknown_account_notices() {
    let (_service, _host, session, mut rx) = start_session().await;

    let result = session.edit_draft(&"missing".into()).await;
    assert!(result.is_err());

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].key, "error-secret");
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_all_background_work() {
    let (service, _host, session, _rx) = start_session().await;

    session
        .submit(
            &Origin::new("account-form"),
            Intent::Create {
                name: "github".to_string(),
                secret: "JBSWY3DPEHPK3PXP".to_string(),
            },
        )
        .await
        .unwrap();
    settle().await;
    let id = session.accounts()[0].id.clone();
    assert!(session.remaining(&id).is_some());

    session.close();
    // Idempotent.
    session.close();

    assert!(session.accounts().is_empty());
    assert!(session.remaining(&id).is_none());

    // No armed wake survives: time can pass without any refetch.
    let calls = service.list_calls();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(service.list_calls(), calls);
}

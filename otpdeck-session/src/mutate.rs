//! The mutation pipeline.
//!
//! Turns create/edit/delete/import intents into account-service calls,
//! with a per-origin debounce so duplicate UI triggers (double click,
//! double-fired events) collapse into one submission. This is a debounce,
//! not a queue: the late duplicate is dropped.

use otpdeck_core::{
    AccountDraft, AccountId, AccountService, Error, Notice, NoticeSink, notice,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default quiet window between submissions from one origin.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// A mutation the UI wants applied.
#[derive(Debug, Clone)]
pub enum Intent {
    Create {
        name: String,
        secret: String,
    },
    Edit {
        id: AccountId,
        name: String,
        secret: String,
    },
    Delete {
        id: AccountId,
    },
    Import {
        payload: String,
    },
}

/// Logical source of a submission: one form instance, one scan bridge.
/// Debouncing is scoped per origin, never globally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    /// The origin used for scan-bridge imports.
    pub fn scan_bridge() -> Self {
        Self::new("scan-bridge")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service applied the mutation; the cache should be refreshed.
    Applied,

    /// Dropped inside the origin's quiet window.
    Debounced,

    /// An import resolved successfully but added nothing recognizable.
    NothingImported,
}

/// Serializes mutations against the account service.
pub struct MutationSerializer {
    service: Arc<dyn AccountService>,
    notices: Arc<dyn NoticeSink>,
    debounce: Duration,
    recent: Mutex<HashMap<Origin, Instant>>,
}

impl MutationSerializer {
    pub fn new(
        service: Arc<dyn AccountService>,
        notices: Arc<dyn NoticeSink>,
        debounce_ms: u64,
    ) -> Self {
        Self {
            service,
            notices,
            debounce: Duration::from_millis(debounce_ms),
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Admit a submission from `origin`, or drop it inside the window.
    fn admit(&self, origin: &Origin) -> bool {
        let now = Instant::now();
        let mut recent = self.recent.lock();
        if let Some(last) = recent.get(origin) {
            if now.duration_since(*last) < self.debounce {
                return false;
            }
        }
        recent.insert(origin.clone(), now);
        true
    }

    /// Submit one intent.
    ///
    /// Create and edit drafts are validated before anything reaches the
    /// service. Failures are surfaced as notices and returned; the cache
    /// is never touched from here.
    pub async fn submit(
        &self,
        origin: &Origin,
        intent: Intent,
    ) -> Result<SubmitOutcome, Error> {
        if !self.admit(origin) {
            tracing::debug!(%origin, "submission debounced");
            return Ok(SubmitOutcome::Debounced);
        }

        match intent {
            Intent::Create { name, secret } => {
                AccountDraft::create(name.clone(), secret.clone()).validate()?;
                self.run(
                    self.service.create_account(&name, &secret),
                    format!("create-{name}"),
                    "Account added successfully.",
                    "error-create",
                )
                .await
            }
            Intent::Edit { id, name, secret } => {
                AccountDraft::edit(id.clone(), name.clone(), secret.clone()).validate()?;
                self.run(
                    self.service.edit_account(&id, &name, &secret),
                    format!("edit-{id}"),
                    "Account edited successfully.",
                    "error-edit",
                )
                .await
            }
            Intent::Delete { id } => {
                self.run(
                    self.service.delete_account(&id),
                    format!("delete-{id}"),
                    "Account deleted successfully.",
                    "error-delete",
                )
                .await
            }
            Intent::Import { payload } => self.import(&payload).await,
        }
    }

    async fn run(
        &self,
        call: impl std::future::Future<Output = Result<(), otpdeck_core::ServiceError>>,
        success_key: String,
        success_message: &str,
        error_key: &str,
    ) -> Result<SubmitOutcome, Error> {
        match call.await {
            Ok(()) => {
                self.notices
                    .notify(Notice::success(success_key, success_message));
                Ok(SubmitOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "mutation failed");
                self.notices
                    .notify(Notice::error(error_key, e.to_string()));
                Err(e.into())
            }
        }
    }

    async fn import(&self, payload: &str) -> Result<SubmitOutcome, Error> {
        match self.service.import_from_payload(payload).await {
            Ok(0) => {
                // Resolved, but nothing recognizable was added. Reported
                // distinctly instead of pretending success.
                self.notices.notify(Notice::info(
                    notice::payload_key("import-empty", payload),
                    "No accounts found in scanned code.",
                ));
                Ok(SubmitOutcome::NothingImported)
            }
            Ok(added) => {
                self.notices.notify(Notice::success(
                    notice::payload_key("import", payload),
                    format!("Imported {added} account(s) successfully."),
                ));
                Ok(SubmitOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "import failed");
                self.notices
                    .notify(Notice::error("error-import", e.to_string()));
                Err(e.into())
            }
        }
    }
}

//! In-memory account service implementation.
//!
//! This service is not persistent; accounts are lost when the process
//! exits. It exists for tests and for embedding the session controller
//! without a real backend. Codes are derived deterministically from the
//! secret and the rotation boundary; they are stand-ins, not real OTPs.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use url::Url;

use super::{AccountService, ServiceError};
use crate::model::{Account, AccountDraft, AccountId};

/// Rotation step in seconds.
const STEP_SECONDS: i64 = 30;

#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    name: String,
    secret: String,
}

/// In-memory [`AccountService`] for testing and development.
///
/// # Thread Safety
///
/// Uses interior mutability via `RwLock` and is safe to share across
/// tasks via `Arc`.
pub struct MemoryAccountService {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
}

impl MemoryAccountService {
    /// Create a new empty service.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// How many times `list_accounts` has been called.
    ///
    /// Lets tests assert on refetch behavior without wrapping the service.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// End of the rotation window containing `now`.
    fn boundary(now: i64) -> i64 {
        (now.div_euclid(STEP_SECONDS) + 1) * STEP_SECONDS
    }

    /// Derive a stable six-digit stand-in code for a window.
    fn code_for(secret: &str, boundary: i64) -> String {
        let mut hasher = DefaultHasher::new();
        secret.hash(&mut hasher);
        boundary.hash(&mut hasher);
        format!("{:06}", hasher.finish() % 1_000_000)
    }

    /// Parse one `otpauth://` URI into a (name, secret) pair.
    ///
    /// Returns `None` for anything that does not look like a TOTP entry
    /// with a plausible secret.
    fn parse_otpauth(uri: &str) -> Option<(String, String)> {
        let url = Url::parse(uri).ok()?;
        if url.scheme() != "otpauth" {
            return None;
        }

        let secret = url
            .query_pairs()
            .find(|(k, _)| k == "secret")
            .map(|(_, v)| v.into_owned())?;

        let label = url.path().trim_start_matches('/');
        let label = percent_decode_str(label).decode_utf8_lossy().into_owned();
        let name = if label.is_empty() {
            "Imported".to_string()
        } else {
            label
        };

        // Reuse draft validation so the memory backend rejects exactly
        // what the UI would have rejected.
        let draft = AccountDraft::create(name.clone(), secret.clone());
        draft.validate().ok()?;

        Some((name, secret))
    }
}

impl Default for MemoryAccountService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountService for MemoryAccountService {
    async fn list_accounts(&self) -> Result<Vec<Account>, ServiceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let now = Utc::now().timestamp();
        let boundary = Self::boundary(now);

        let entries = self.entries.read();
        Ok(entries
            .iter()
            .map(|e| Account {
                id: AccountId::new(e.id.to_string()),
                name: e.name.clone(),
                code: Self::code_for(&e.secret, boundary),
                expires_at: boundary,
            })
            .collect())
    }

    async fn create_account(
        &self,
        name: &str,
        secret_b32: &str,
    ) -> Result<(), ServiceError> {
        let draft = AccountDraft::create(name, secret_b32);
        draft.validate().map_err(|e| ServiceError::Rejected {
            message: e.to_string(),
        })?;

        let id = self.alloc_id();
        self.entries.write().push(Entry {
            id,
            name: name.to_string(),
            secret: secret_b32.to_string(),
        });
        tracing::debug!(id, name, "created account");
        Ok(())
    }

    async fn edit_account(
        &self,
        id: &AccountId,
        name: &str,
        secret_b32: &str,
    ) -> Result<(), ServiceError> {
        let draft = AccountDraft::edit(id.clone(), name, secret_b32);
        draft.validate().map_err(|e| ServiceError::Rejected {
            message: e.to_string(),
        })?;

        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id.to_string() == id.as_str())
            .ok_or_else(|| ServiceError::NotFound { id: id.clone() })?;

        entry.name = name.to_string();
        entry.secret = secret_b32.to_string();
        tracing::debug!(%id, name, "edited account");
        Ok(())
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), ServiceError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id.to_string() != id.as_str());
        if entries.len() == before {
            return Err(ServiceError::NotFound { id: id.clone() });
        }
        tracing::debug!(%id, "deleted account");
        Ok(())
    }

    async fn get_account_secret(&self, id: &AccountId) -> Result<String, ServiceError> {
        let entries = self.entries.read();
        entries
            .iter()
            .find(|e| e.id.to_string() == id.as_str())
            .map(|e| e.secret.clone())
            .ok_or_else(|| ServiceError::NotFound { id: id.clone() })
    }

    async fn import_from_payload(&self, payload: &str) -> Result<usize, ServiceError> {
        // A payload may carry several URIs (e.g. an export), one per line.
        let parsed: Vec<(String, String)> = payload
            .split_whitespace()
            .filter_map(Self::parse_otpauth)
            .collect();

        let mut added = 0;
        {
            let mut entries = self.entries.write();
            for (name, secret) in parsed {
                // Importing the same entry twice is a no-op.
                if entries.iter().any(|e| e.name == name && e.secret == secret) {
                    continue;
                }
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                entries.push(Entry { id, name, secret });
                added += 1;
            }
        }

        tracing::debug!(added, "imported accounts from payload");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_list() {
        let service = MemoryAccountService::new();
        service
            .create_account("github", "JBSWY3DPEHPK3PXP")
            .await
            .unwrap();

        let accounts = service.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "github");
        assert_eq!(accounts[0].code.len(), 6);

        // The boundary is in the future and on the rotation grid.
        let now = Utc::now().timestamp();
        assert!(accounts[0].expires_at > now);
        assert_eq!(accounts[0].expires_at % STEP_SECONDS, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_secret() {
        let service = MemoryAccountService::new();
        let result = service.create_account("github", "not base32!").await;
        assert!(matches!(result, Err(ServiceError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_expires_at_non_decreasing_across_snapshots() {
        let service = MemoryAccountService::new();
        service
            .create_account("github", "JBSWY3DPEHPK3PXP")
            .await
            .unwrap();

        let first = service.list_accounts().await.unwrap();
        let second = service.list_accounts().await.unwrap();
        assert!(second[0].expires_at >= first[0].expires_at);
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let service = MemoryAccountService::new();
        service
            .create_account("github", "JBSWY3DPEHPK3PXP")
            .await
            .unwrap();
        let id = service.list_accounts().await.unwrap()[0].id.clone();

        service
            .edit_account(&id, "gitlab", "MFRGGZDFMZTWQ2LK")
            .await
            .unwrap();
        let accounts = service.list_accounts().await.unwrap();
        assert_eq!(accounts[0].name, "gitlab");
        assert_eq!(
            service.get_account_secret(&id).await.unwrap(),
            "MFRGGZDFMZTWQ2LK"
        );

        service.delete_account(&id).await.unwrap();
        assert!(service.list_accounts().await.unwrap().is_empty());

        let result = service.delete_account(&id).await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_import_single_uri() {
        let service = MemoryAccountService::new();
        let added = service
            .import_from_payload("otpauth://totp/Example:alice?secret=JBSWY3DPEHPK3PXP")
            .await
            .unwrap();
        assert_eq!(added, 1);

        let accounts = service.list_accounts().await.unwrap();
        assert_eq!(accounts[0].name, "Example:alice");
    }

    #[tokio::test]
    async fn test_import_multi_line_payload() {
        let service = MemoryAccountService::new();
        let payload = "otpauth://totp/a?secret=JBSWY3DPEHPK3PXP\n\
                       otpauth://totp/b?secret=MFRGGZDFMZTWQ2LK";
        let added = service.import_from_payload(payload).await.unwrap();
        assert_eq!(added, 2);
    }

    #[tokio::test]
    async fn test_import_unrecognizable_payload_is_zero_not_error() {
        let service = MemoryAccountService::new();
        let added = service
            .import_from_payload("https://example.com/not-an-otp")
            .await
            .unwrap();
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn test_import_is_idempotent_per_entry() {
        let service = MemoryAccountService::new();
        let uri = "otpauth://totp/dup?secret=JBSWY3DPEHPK3PXP";
        assert_eq!(service.import_from_payload(uri).await.unwrap(), 1);
        assert_eq!(service.import_from_payload(uri).await.unwrap(), 0);
        assert_eq!(service.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_percent_decoded_label() {
        let service = MemoryAccountService::new();
        service
            .import_from_payload("otpauth://totp/My%20Work?secret=JBSWY3DPEHPK3PXP")
            .await
            .unwrap();
        let accounts = service.list_accounts().await.unwrap();
        assert_eq!(accounts[0].name, "My Work");
    }

    #[test]
    fn test_boundary_grid() {
        assert_eq!(MemoryAccountService::boundary(0), 30);
        assert_eq!(MemoryAccountService::boundary(29), 30);
        assert_eq!(MemoryAccountService::boundary(30), 60);
        assert_eq!(MemoryAccountService::boundary(31), 60);
    }

    #[test]
    fn test_code_is_stable_within_a_window() {
        let a = MemoryAccountService::code_for("SECRET", 60);
        let b = MemoryAccountService::code_for("SECRET", 60);
        let c = MemoryAccountService::code_for("SECRET", 90);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

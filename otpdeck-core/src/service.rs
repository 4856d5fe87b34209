//! The account service boundary.
//!
//! Everything durable lives behind [`AccountService`]: secrets, code
//! computation and rotation boundaries are the backend's business. The
//! session only ever sees wholesale snapshots and issues mutations.
//!
//! [`MemoryAccountService`] is an in-memory implementation for tests and
//! backendless embedding.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Account, AccountId};

pub mod memory;

pub use memory::MemoryAccountService;

/// Error from a remote account-service call.
///
/// The session treats every variant the same way: the failure is surfaced
/// as a notice, the cache is left untouched, and scheduling carries on.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The call never reached the backend, or the connection dropped.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The backend rejected the request.
    #[error("{message}")]
    Rejected { message: String },

    /// The referenced account does not exist.
    #[error("account {id} not found")]
    NotFound { id: AccountId },
}

/// Asynchronous remote interface to the account backend.
///
/// All calls suspend the calling flow without blocking the surface's
/// event loop; countdown ticks keep running while a call is outstanding.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Fetch the full account snapshot, in display order.
    async fn list_accounts(&self) -> Result<Vec<Account>, ServiceError>;

    /// Create a new account from a name and base32 secret.
    async fn create_account(
        &self,
        name: &str,
        secret_b32: &str,
    ) -> Result<(), ServiceError>;

    /// Replace an existing account's name and secret.
    async fn edit_account(
        &self,
        id: &AccountId,
        name: &str,
        secret_b32: &str,
    ) -> Result<(), ServiceError>;

    /// Delete an account.
    async fn delete_account(&self, id: &AccountId) -> Result<(), ServiceError>;

    /// Fetch an account's secret for populating an edit draft.
    async fn get_account_secret(&self, id: &AccountId) -> Result<String, ServiceError>;

    /// Import zero or more accounts from a decoded scan payload.
    ///
    /// Returns the number of accounts actually added. Zero is not an
    /// error: it means the payload contained nothing recognizable, and
    /// the caller decides how to present that.
    async fn import_from_payload(&self, payload: &str) -> Result<usize, ServiceError>;
}

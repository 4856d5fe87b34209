//! Domain model types for otpdeck.
//!
//! This module defines the core types used throughout otpdeck:
//! - [`AccountId`] - Opaque identifier for an OTP account
//! - [`Account`] - A single account as delivered by the account service
//! - [`AccountDraft`] - Transient create/edit input from the UI
//! - [`ImportEvent`] - One decoded scan result delivered over the import bridge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::surface::SurfaceId;

/// Opaque identifier for an OTP account.
///
/// IDs are assigned by the account service and are stable and unique
/// within a snapshot. The session never interprets their contents.
///
/// # Examples
///
/// ```
/// use otpdeck_core::AccountId;
///
/// let id = AccountId::new("a1b2c3");
/// assert_eq!(id.as_str(), "a1b2c3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the account ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A single OTP account as delivered by the account service.
///
/// The `code` and `expires_at` fields are derived by the backend; the
/// session never computes either. `expires_at` is the epoch-second
/// rotation boundary at which `code` stops being valid, and is
/// non-decreasing for a given `id` across successive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, unique within a snapshot.
    pub id: AccountId,

    /// User-facing label. Non-empty.
    pub name: String,

    /// Currently valid OTP string for display.
    pub code: String,

    /// Epoch-seconds timestamp of this code's rotation boundary.
    pub expires_at: i64,
}

impl Account {
    /// Seconds left until this account's code rotates, as of `now_ms`
    /// (milliseconds since the epoch). Saturates at zero.
    pub fn seconds_left(&self, now_ms: i64) -> u64 {
        let remaining_ms = self.expires_at * 1000 - now_ms;
        if remaining_ms <= 0 {
            0
        } else {
            // Ceiling so a code with 1ms of validity still shows "1s".
            ((remaining_ms + 999) / 1000) as u64
        }
    }
}

/// Transient create/edit input from the UI.
///
/// `id` absent means "create"; present means "edit". The draft is handed
/// to the mutation pipeline and discarded after the call settles; the
/// secret is zeroed when the draft is dropped.
#[derive(Debug, Clone)]
pub struct AccountDraft {
    /// Target account when editing, `None` when creating.
    pub id: Option<AccountId>,

    /// User label.
    pub name: String,

    /// Base32-encoded shared secret.
    pub secret: Zeroizing<String>,
}

impl AccountDraft {
    /// Create a draft for a new account.
    pub fn create(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Create a draft for editing an existing account.
    pub fn edit(
        id: AccountId,
        name: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Validate the draft before it is allowed anywhere near the service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.secret.trim().is_empty() {
            return Err(ValidationError::EmptySecret);
        }
        if !is_base32(&self.secret) {
            return Err(ValidationError::InvalidSecret);
        }
        Ok(())
    }
}

/// Check that a string is plausible base32: A-Z, 2-7, optional trailing
/// padding. Spaces are ignored, case is not significant.
fn is_base32(s: &str) -> bool {
    let trimmed: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let body = trimmed.trim_end_matches('=');
    if body.is_empty() {
        return false;
    }
    body.chars()
        .all(|c| matches!(c.to_ascii_uppercase(), 'A'..='Z' | '2'..='7'))
}

/// Error validating an [`AccountDraft`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("account name must not be empty")]
    EmptyName,

    #[error("secret must not be empty")]
    EmptySecret,

    #[error("secret is not valid base32")]
    InvalidSecret,
}

/// One decoded scan result delivered over the import bridge.
///
/// Two events carrying identical payload text are still distinct events:
/// identity is `event_id`, never payload equality. Duplicate delivery of
/// the same payload is tolerated downstream by the import call itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEvent {
    /// Unique identity of this emission.
    pub event_id: Uuid,

    /// Surface that produced the payload.
    pub source_surface: SurfaceId,

    /// Decoded payload text (typically an `otpauth://` URI).
    pub payload: String,

    /// When the emission was produced.
    pub received_at: DateTime<Utc>,
}

impl ImportEvent {
    /// Create a new event with a fresh identity.
    pub fn new(source_surface: SurfaceId, payload: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            source_surface,
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }
}

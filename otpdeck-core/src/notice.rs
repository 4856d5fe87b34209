//! User-visible notices.
//!
//! Every success or failure the session wants the user to see becomes a
//! [`Notice`] with a stable key, so a presentation layer can coalesce
//! repeated identical notices instead of stacking them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::mpsc;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// A user-visible notice with a stable coalescing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Stable identity: repeated notices with the same key replace each
    /// other rather than stacking.
    pub key: String,

    pub kind: NoticeKind,

    pub message: String,
}

impl Notice {
    pub fn success(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn info(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Build a stable key from a prefix and an arbitrary payload.
///
/// Payloads can be long (whole QR exports), so the key carries a short
/// hash instead of the text itself.
pub fn payload_key(prefix: &str, payload: &str) -> String {
    let mut hasher = DefaultHasher::new();
    payload.hash(&mut hasher);
    format!("{}-{:016x}", prefix, hasher.finish())
}

/// Receives notices from the session.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Channel-backed notice sink for a presentation layer to drain.
pub struct ChannelNoticeSink {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNoticeSink {
    /// Create a sink and the receiver the UI reads from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NoticeSink for ChannelNoticeSink {
    fn notify(&self, notice: Notice) {
        // A departed UI is not an error; the notice just has no audience.
        if self.tx.send(notice).is_err() {
            tracing::trace!("notice dropped: no receiver");
        }
    }
}

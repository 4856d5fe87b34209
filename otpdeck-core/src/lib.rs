//! # otpdeck Core
//!
//! Core library for the otpdeck OTP session controller.
//!
//! This crate provides:
//! - Domain types for accounts, drafts, and import events
//! - The [`AccountService`] boundary trait and an in-memory implementation
//! - The one-shot cross-surface import bridge
//! - The surface-host abstraction the session uses instead of a concrete
//!   windowing API
//! - Notice types for coalescing user-visible feedback
//!
//! ## Quick Start
//!
//! ```rust
//! use otpdeck_core::{AccountService, MemoryAccountService};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), otpdeck_core::ServiceError> {
//! let service = MemoryAccountService::new();
//! service.create_account("github", "JBSWY3DPEHPK3PXP").await?;
//! let accounts = service.list_accounts().await?;
//! assert_eq!(accounts[0].name, "github");
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;
pub mod model;
pub mod notice;
pub mod service;
pub mod surface;

// Re-export commonly used types at crate root
pub use model::{
    Account,
    AccountDraft,
    AccountId,
    ImportEvent,
    ValidationError,
};

pub use service::{
    AccountService,
    MemoryAccountService,
    ServiceError,
};

pub use bridge::{
    BridgeEmitter,
    BridgeError,
    BridgeSubscription,
    ImportBridge,
};

pub use surface::{
    MAIN_SURFACE,
    SCANNER_SURFACE,
    Surface,
    SurfaceConfig,
    SurfaceError,
    SurfaceHost,
    SurfaceId,
};

pub use notice::{
    ChannelNoticeSink,
    Notice,
    NoticeKind,
    NoticeSink,
};

pub use error::Error;

//! # otpdeck Session
//!
//! The main-surface session controller for otpdeck.
//!
//! This crate keeps a live list of OTP accounts synchronized to their
//! real rotation boundaries and mediates the cross-surface scan-to-import
//! flow:
//! - [`AccountCache`]: the snapshot of record for the UI
//! - [`RefreshScheduler`]: one armed wake at the earliest rotation boundary
//! - [`Countdown`]: per-account, second-aligned remaining-time tickers
//! - [`MutationSerializer`]: debounced create/edit/delete/import pipeline
//! - [`ScanSurfaceManager`]: scanner-surface lifecycle on the main side
//! - [`Session`]: ties it all together with guaranteed teardown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use otpdeck_core::{ChannelNoticeSink, MemoryAccountService, SurfaceHost};
//! use otpdeck_session::{Session, SessionConfig};
//!
//! # async fn example(host: Arc<dyn SurfaceHost>) {
//! let service = Arc::new(MemoryAccountService::new());
//! let (notices, mut notice_rx) = ChannelNoticeSink::new();
//! let session = Session::start(
//!     service,
//!     host,
//!     Arc::new(notices),
//!     SessionConfig::default(),
//! )
//! .await;
//!
//! let accounts = session.accounts();
//! session.close();
//! # }
//! ```

pub mod cache;
mod clock;
pub mod config;
pub mod countdown;
pub mod mutate;
pub mod scan;
pub mod sched;
pub mod session;

pub use cache::{AccountCache, Snapshot};
pub use config::{SessionConfig, init_tracing, load_config, load_config_from};
pub use countdown::{Countdown, CountdownHandle, CountdownSet};
pub use mutate::{DEFAULT_DEBOUNCE_MS, Intent, MutationSerializer, Origin, SubmitOutcome};
pub use scan::{ScanSurfaceManager, ScannerLaunch};
pub use sched::{DEFAULT_GRACE_MS, RefreshScheduler};
pub use session::Session;

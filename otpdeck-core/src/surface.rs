//! Presentation-surface host abstraction.
//!
//! The session controller never talks to a concrete windowing API. It
//! creates, shows, focuses and closes surfaces through the [`SurfaceHost`]
//! and [`Surface`] traits, which an embedder implements on top of whatever
//! window system the application runs on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Well-known label of the main session surface.
pub const MAIN_SURFACE: &str = "main";

/// Well-known label of the ephemeral scanner surface.
pub const SCANNER_SURFACE: &str = "scanner";

/// Identifier (label) of a presentation surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(String);

impl SurfaceId {
    /// Create a new surface ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the surface ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Creation parameters for a surface.
///
/// The scanner surface is deliberately modal-like: fixed geometry, no
/// decorations, transparent background, drag-and-drop disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub label: SurfaceId,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub decorations: bool,
    pub transparent: bool,
    pub drag_drop: bool,
}

impl SurfaceConfig {
    /// Configuration for the ephemeral scanner surface.
    pub fn scanner(width: u32, height: u32) -> Self {
        Self {
            label: SurfaceId::new(SCANNER_SURFACE),
            width,
            height,
            resizable: false,
            decorations: false,
            transparent: true,
            drag_drop: false,
        }
    }
}

/// Error from surface operations.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The host refused to create the surface.
    #[error("failed to create surface '{label}': {message}")]
    CreateFailed { label: String, message: String },

    /// The surface no longer exists.
    #[error("surface '{label}' is gone")]
    Gone { label: String },

    /// Any other host-level failure.
    #[error("surface host error: {message}")]
    Host { message: String },
}

/// A live presentation surface.
#[async_trait]
pub trait Surface: Send + Sync {
    /// The surface's label.
    fn id(&self) -> SurfaceId;

    /// Make the surface visible.
    async fn show(&self) -> Result<(), SurfaceError>;

    /// Give the surface input focus.
    async fn focus(&self) -> Result<(), SurfaceError>;

    /// Destroy the surface. Further calls on this handle fail with
    /// [`SurfaceError::Gone`].
    async fn close(&self) -> Result<(), SurfaceError>;
}

/// Host capable of creating surfaces and looking up existing ones.
#[async_trait]
pub trait SurfaceHost: Send + Sync {
    /// Create a new surface. Does not block on the surface becoming
    /// visible; returns as soon as the handle exists.
    async fn create_surface(
        &self,
        config: SurfaceConfig,
    ) -> Result<Arc<dyn Surface>, SurfaceError>;

    /// Look up an existing surface by label.
    async fn find_surface(&self, id: &SurfaceId) -> Option<Arc<dyn Surface>>;
}

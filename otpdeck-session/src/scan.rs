//! Scanner-surface lifecycle, main-session side.
//!
//! Opens the ephemeral scanner surface and hands it a one-shot bridge
//! emitter. The bridge subscription always exists before a surface is
//! created, so an emission can never race subscription setup.

use otpdeck_core::{
    BridgeEmitter, ImportBridge, Surface, SurfaceConfig, SurfaceError, SurfaceHost,
};
use std::sync::Arc;

/// A freshly opened scanner surface and its emitter.
///
/// Both are handed to the scanner-side session; the main session keeps
/// neither.
pub struct ScannerLaunch {
    pub surface: Arc<dyn Surface>,
    pub emitter: BridgeEmitter,
}

/// Owns scanner-surface creation for the main session.
pub struct ScanSurfaceManager {
    host: Arc<dyn SurfaceHost>,
    bridge: ImportBridge,
    config: SurfaceConfig,
}

impl ScanSurfaceManager {
    pub fn new(host: Arc<dyn SurfaceHost>, bridge: ImportBridge, width: u32, height: u32) -> Self {
        Self {
            host,
            bridge,
            config: SurfaceConfig::scanner(width, height),
        }
    }

    /// Open a scanner surface. Non-blocking: returns once the surface
    /// handle exists, without waiting for a scan.
    pub async fn open(&self) -> Result<ScannerLaunch, SurfaceError> {
        let surface = self.host.create_surface(self.config.clone()).await?;
        let emitter = self.bridge.emitter(self.config.label.clone());
        tracing::info!(surface = %self.config.label, "scanner surface opened");
        Ok(ScannerLaunch { surface, emitter })
    }
}

//! The scanner-surface session.
//!
//! Lives exactly as long as the ephemeral scanner surface. On a
//! successful decode it emits the payload over the import bridge exactly
//! once, then restores the main surface and destroys itself. Cancellation
//! takes the same exit path without emitting, which the main session
//! treats as "no import occurred".

use otpdeck_core::{
    BridgeEmitter, BridgeError, MAIN_SURFACE, Surface, SurfaceError, SurfaceHost, SurfaceId,
};
use std::sync::Arc;
use thiserror::Error;

use crate::decode::{DecodeError, ScanDecoder, ScanSource};

/// Error from the scanner session.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// Decode attempt failed or found nothing.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Surface lifecycle failure while exiting.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// One scanner-surface lifetime: a one-shot emitter, the surface itself,
/// and the host used to hand focus back to the main surface.
pub struct ScannerSession {
    emitter: BridgeEmitter,
    surface: Arc<dyn Surface>,
    host: Arc<dyn SurfaceHost>,
}

impl ScannerSession {
    pub fn new(
        emitter: BridgeEmitter,
        surface: Arc<dyn Surface>,
        host: Arc<dyn SurfaceHost>,
    ) -> Self {
        Self {
            emitter,
            surface,
            host,
        }
    }

    /// Run one decode attempt against a frame or image.
    ///
    /// On a hit: the first payload is emitted, then the surface exits.
    /// On a miss: the error is returned and the surface stays open so the
    /// user can try again.
    pub async fn handle_detect(
        &self,
        decoder: &dyn ScanDecoder,
        source: ScanSource<'_>,
    ) -> Result<(), ScannerError> {
        let payloads = decoder.detect(source)?;
        let payload = payloads.first().ok_or(DecodeError::Miss)?;

        match self.emitter.emit(payload.clone()) {
            Ok(event_id) => {
                tracing::info!(%event_id, "payload delivered, closing scanner");
            }
            Err(BridgeError::AlreadyEmitted) => {
                // A second decode raced the first; this lifetime is spent.
                tracing::warn!("duplicate decode ignored, scanner already emitted");
            }
            Err(e) => {
                // Main session gone; nothing to deliver to.
                tracing::warn!(error = %e, "payload not delivered");
            }
        }

        self.exit().await
    }

    /// The user cancelled: exit without emitting.
    pub async fn cancel(&self) -> Result<(), ScannerError> {
        tracing::debug!("scan cancelled");
        self.exit().await
    }

    /// Restore the main surface, then destroy this one. Delivery (if
    /// any) has already happened by the time this runs.
    async fn exit(&self) -> Result<(), ScannerError> {
        match self.host.find_surface(&SurfaceId::new(MAIN_SURFACE)).await {
            Some(main) => {
                if let Err(e) = main.show().await {
                    tracing::warn!(error = %e, "failed to show main surface");
                }
                if let Err(e) = main.focus().await {
                    tracing::warn!(error = %e, "failed to focus main surface");
                }
            }
            None => {
                tracing::warn!("main surface not found while closing scanner");
            }
        }

        self.surface.close().await?;
        Ok(())
    }
}

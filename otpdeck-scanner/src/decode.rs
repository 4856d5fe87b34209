//! The decode boundary.
//!
//! QR decoding itself (camera stream, static image) is an external
//! collaborator. Its whole contract with the scanner session is
//! [`ScanDecoder::detect`]: zero or more payload strings, of which only
//! the first is used.

use thiserror::Error;

/// Raw input handed to a decoder.
#[derive(Debug, Clone, Copy)]
pub enum ScanSource<'a> {
    /// One frame from a live capture stream.
    Frame(&'a [u8]),

    /// A static image the user picked.
    Image(&'a [u8]),
}

/// Error from a decode attempt.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The decoder ran but found no payload. A user-visible notice, not
    /// a state change; the scanner surface stays open.
    #[error("no code found")]
    Miss,

    /// The decoder itself failed.
    #[error("decode failed: {message}")]
    Failed { message: String },
}

/// Decodes QR payloads from frames or images.
pub trait ScanDecoder: Send + Sync {
    fn detect(&self, source: ScanSource<'_>) -> Result<Vec<String>, DecodeError>;
}

//! # otpdeck Scanner
//!
//! The scanner-surface session for otpdeck: decode a QR payload from a
//! camera frame or a picked image, deliver it to the main session over
//! the import bridge exactly once, and hand focus back.
//!
//! Actual QR decoding is behind the [`ScanDecoder`] trait; this crate
//! only owns the emit-once-then-close choreography.

pub mod decode;
pub mod session;

pub use decode::{DecodeError, ScanDecoder, ScanSource};
pub use session::{ScannerError, ScannerSession};

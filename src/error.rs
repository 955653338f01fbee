//! Error taxonomy for the page pipeline.

use thiserror::Error;

/// Byte-stream failure: the source could not be subscribed, opened or read.
///
/// Transport errors are always worth retrying; the bytes were never fully
/// in hand, so a fresh attempt may succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport: {0}")]
pub struct TransportError(pub String);

/// Failure while cutting or stitching page images.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("composite {width}x{height} exceeds the {max_pixels} pixel budget")]
    TooLarge {
        width: u64,
        height: u64,
        max_pixels: u64,
    },

    #[error("degenerate input {width}x{height}")]
    Degenerate { width: u32, height: u32 },
}

/// Terminal failure of one page load attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("decode: {0}")]
    Decode(String),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl PageError {
    /// Whether a retry of the same page makes sense. Decode and composition
    /// failures are deterministic for a given byte buffer, so only transport
    /// failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PageError::Transport(_))
    }
}

//! Byte sources for pages.
//!
//! The pipeline never knows whether a page comes from the network, a local
//! archive or an already-downloaded chapter; it only needs a status feed and,
//! once that feed says ready, one readable byte stream per page.

use std::io::Read;
use std::sync::mpsc;

use crate::error::TransportError;
use crate::page::Page;

/// Load status reported by a source for one subscribed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Queued,
    LoadingMetadata,
    /// Transfer progress in percent, 0..=100.
    Downloading(u8),
    /// All bytes are local; `open_bytes` will succeed now.
    Ready,
    Error(String),
}

/// Owned byte stream for one page. The pipeline worker that receives it is
/// responsible for dropping it exactly once, on every exit path.
pub type PageBytes = Box<dyn Read + Send>;

/// Contract implemented by page loaders.
///
/// Subscriptions are per page and independent: dropping the returned receiver
/// withdraws interest without affecting other pages. A source may keep
/// downloading after that; it just has nobody to tell.
pub trait PageSource: Send + Sync {
    /// Start (or join) loading `page` and stream status events back.
    fn subscribe(&self, page: &Page) -> Result<mpsc::Receiver<SourceEvent>, TransportError>;

    /// Open the complete byte stream for `page`. Only valid once the
    /// subscription has reported [`SourceEvent::Ready`].
    fn open_bytes(&self, page: &Page) -> Result<PageBytes, TransportError>;

    /// Throw away any failed state for `page` so the next subscribe starts
    /// from scratch.
    fn retry(&self, page: &Page);
}

//! Per-page runtime state owned by the host thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use image::RgbaImage;
use log::{debug, info};

use crate::config::ReaderConfig;
use crate::error::PageError;
use crate::page::Page;
use crate::source::PageSource;

/// Load lifecycle of one attached page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Queued,
    LoadingMetadata,
    Downloading,
    Ready,
    Error(PageError),
}

impl PageStatus {
    /// Position in the happy path, used to find the laggard of a pair.
    pub(super) fn ordinal(&self) -> u8 {
        match self {
            PageStatus::Queued => 0,
            PageStatus::LoadingMetadata => 1,
            PageStatus::Downloading => 2,
            PageStatus::Ready => 3,
            PageStatus::Error(_) => 4,
        }
    }
}

/// Ready-to-display payload for one page.
pub enum DecodedPage {
    /// Fully decoded still image.
    Still(RgbaImage),
    /// Animated source bytes, decoded frame by frame by the host's image
    /// view; the pipeline never re-encodes them.
    Animated(Vec<u8>),
    /// Unmodified source bytes: the fallback when composition-stage decoding
    /// failed but the host's own decoder may still manage.
    Raw(Vec<u8>),
}

impl DecodedPage {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            DecodedPage::Still(image) => Some(image.dimensions()),
            _ => None,
        }
    }

    pub fn as_still(&self) -> Option<&RgbaImage> {
        match self {
            DecodedPage::Still(image) => Some(image),
            _ => None,
        }
    }

    /// Undecoded bytes, for the animated and raw-fallback cases.
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match self {
            DecodedPage::Still(_) => None,
            DecodedPage::Animated(bytes) | DecodedPage::Raw(bytes) => Some(bytes),
        }
    }
}

impl fmt::Debug for DecodedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedPage::Still(image) => {
                write!(f, "Still({}x{})", image.width(), image.height())
            }
            DecodedPage::Animated(bytes) => write!(f, "Animated({} bytes)", bytes.len()),
            DecodedPage::Raw(bytes) => write!(f, "Raw({} bytes)", bytes.len()),
        }
    }
}

/// Event queued from a worker to the owning thread.
pub(super) enum PageEvent {
    Status(PageStatus),
    Progress(u8),
    Decoded(DecodedPage),
    /// Complete source bytes, sent instead of a decode when the page is half
    /// of a pair; composition consumes them on the pair's own worker.
    Bytes(Vec<u8>),
}

/// What a load worker delivers at the end of the happy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeliveryMode {
    /// Sniff, decode and (if configured) split: the standalone flow.
    Decoded,
    /// Stop once the bytes are local; a pair composition takes over.
    Bytes,
}

/// Cooperative cancellation flag shared between a PageState and its worker.
/// Cancelling is a plain store; workers poll it at every suspension point.
#[derive(Clone, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runtime state of one attached page.
///
/// Owned by the thread that attached it and never shared: workers talk to it
/// only through the event channel, which [`PageState::pump`] drains on the
/// owning thread. Dropping the state detaches it.
pub struct PageState {
    page: Arc<Page>,
    source: Arc<dyn PageSource>,
    config: ReaderConfig,
    mode: DeliveryMode,
    status: PageStatus,
    progress: u8,
    decoded: Option<DecodedPage>,
    loaded: Option<Vec<u8>>,
    rx: Option<mpsc::Receiver<PageEvent>>,
    cancel: CancelToken,
}

impl PageState {
    pub(super) fn attach(
        page: Arc<Page>,
        source: Arc<dyn PageSource>,
        config: ReaderConfig,
        mode: DeliveryMode,
    ) -> PageState {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::default();
        super::spawn_load_worker(
            Arc::clone(&page),
            Arc::clone(&source),
            config.clone(),
            mode,
            tx,
            cancel.clone(),
        );
        PageState {
            page,
            source,
            config,
            mode,
            status: PageStatus::Queued,
            progress: 0,
            decoded: None,
            loaded: None,
            rx: Some(rx),
            cancel,
        }
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    pub fn status(&self) -> &PageStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.status {
            PageStatus::Error(err) => Some(err),
            _ => None,
        }
    }

    /// User-visible progress, 0..=100, meaningful from `Downloading` on.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn decoded(&self) -> Option<&DecodedPage> {
        self.decoded.as_ref()
    }

    /// Hand the decoded payload to the host, e.g. to move it into a texture.
    pub fn take_decoded(&mut self) -> Option<DecodedPage> {
        self.decoded.take()
    }

    /// Whether the error screen for this page should offer opening the
    /// locator in a browser: only for decode failures of network pages,
    /// where a stock browser might still show what our decoder could not.
    pub fn offers_browser_escape(&self) -> bool {
        matches!(self.status, PageStatus::Error(PageError::Decode(_)))
            && self.page.is_network_backed()
    }

    /// Drain queued worker events into this state. Returns whether anything
    /// changed, so the host can skip redraws on quiet frames.
    pub fn pump(&mut self) -> bool {
        let mut dirty = false;
        while let Some(event) = self.rx.as_ref().and_then(|rx| rx.try_recv().ok()) {
            self.apply(event);
            dirty = true;
        }
        dirty
    }

    /// Withdraw from the load: cancel the worker, close the event channel
    /// and release any decoded payload. Synchronous, non-blocking and
    /// idempotent; the worker notices the token at its next checkpoint and
    /// unwinds on its own.
    pub fn detach(&mut self) {
        if self.rx.is_none() {
            return;
        }
        debug!("pipeline: page {} detached", self.page.index);
        self.cancel.cancel();
        self.rx = None;
        self.decoded = None;
        self.loaded = None;
    }

    pub fn is_detached(&self) -> bool {
        self.rx.is_none()
    }

    /// Start the whole load over: cancel the current worker, clear failed
    /// source state and spawn a fresh attempt. Progress restarts at zero,
    /// which is expected for a new attempt.
    pub fn retry(&mut self) {
        info!("pipeline: page {} retrying", self.page.index);
        self.cancel.cancel();
        self.source.retry(&self.page);
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::default();
        super::spawn_load_worker(
            Arc::clone(&self.page),
            Arc::clone(&self.source),
            self.config.clone(),
            self.mode,
            tx,
            cancel.clone(),
        );
        self.rx = Some(rx);
        self.cancel = cancel;
        self.status = PageStatus::Queued;
        self.progress = 0;
        self.decoded = None;
        self.loaded = None;
    }

    pub(super) fn has_bytes(&self) -> bool {
        self.loaded.is_some()
    }

    pub(super) fn take_bytes(&mut self) -> Option<Vec<u8>> {
        self.loaded.take()
    }

    pub(super) fn set_decoded(&mut self, decoded: DecodedPage) {
        self.decoded = Some(decoded);
    }

    fn apply(&mut self, event: PageEvent) {
        match event {
            PageEvent::Status(status) => {
                if status != self.status {
                    debug!(
                        "pipeline: page {} {:?} -> {:?}",
                        self.page.index, self.status, status
                    );
                }
                self.status = status;
            }
            PageEvent::Progress(progress) => self.progress = progress,
            PageEvent::Decoded(decoded) => self.decoded = Some(decoded),
            PageEvent::Bytes(bytes) => self.loaded = Some(bytes),
        }
    }
}

impl Drop for PageState {
    fn drop(&mut self) {
        self.detach();
    }
}

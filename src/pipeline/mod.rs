//! Page load pipeline: per-page workers, spread composition, and the
//! host-thread marshaling between them.
//!
//! Threading model:
//!   [`PagePipeline::attach`] spawns one worker thread per page. The worker
//!   owns the source subscription and the byte stream; everything it learns
//!   travels through an mpsc channel that the owning thread drains with
//!   `pump()`. Workers never touch host state, so no locks.
//!
//!   [`PagePipeline::attach_pair`] runs each page's worker in bytes-only
//!   mode plus one parked composition worker. When both byte buffers are
//!   home, the pump thread hands them over; the composition worker decides
//!   merge/split/abort, writes the spread flags, and reports one outcome.
//!
//! Cancellation:
//!   `detach()` flips the shared [`CancelToken`] and drops the receiving
//!   channel ends. Workers poll the token at every wait point (source event
//!   wait, each chunk read, before each decode and composite) and unwind
//!   without delivering anything; closing the request channel is what wakes
//!   a parked composition worker into exit.

mod progress;
mod state;

pub use state::{DecodedPage, PageState, PageStatus};

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::compose;
use crate::config::ReaderConfig;
use crate::error::TransportError;
use crate::page::{Page, PageHalf, SpreadResolution};
use crate::sniff;
use crate::source::{PageSource, SourceEvent};
use crate::spread::{self, PageProbe, SpreadDecision};

use crate::error::PageError;
use progress::{ProgressGate, composite_progress, paired_progress};
use state::{CancelToken, DeliveryMode, PageEvent};

/// Worker wake interval while waiting on source events; bounds how long a
/// cancelled worker can linger.
const SOURCE_POLL: Duration = Duration::from_millis(25);

/// Factory for attached page states. Cheap to create; holds the source and
/// the resolved configuration shared by every worker it spawns.
pub struct PagePipeline {
    source: Arc<dyn PageSource>,
    config: ReaderConfig,
}

impl PagePipeline {
    pub fn new(source: Arc<dyn PageSource>, config: ReaderConfig) -> Self {
        PagePipeline { source, config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Attach a single page: subscribe, fetch, sniff, decode and (when the
    /// page resolves to a split) cut, all off-thread.
    pub fn attach(&self, page: Arc<Page>) -> PageState {
        PageState::attach(
            page,
            Arc::clone(&self.source),
            self.config.clone(),
            DeliveryMode::Decoded,
        )
    }

    /// Attach two adjacent pages as a merge candidate. The pair is driven as
    /// one unit: pump it, read its combined status/progress, and take either
    /// the merged spread or the two standalone payloads.
    pub fn attach_pair(&self, first: Arc<Page>, second: Arc<Page>) -> PairedPages {
        PairedPages::attach(first, second, Arc::clone(&self.source), self.config.clone())
    }
}

// ---------------------------------------------------------------------------
// Single-page worker
// ---------------------------------------------------------------------------

fn spawn_load_worker(
    page: Arc<Page>,
    source: Arc<dyn PageSource>,
    config: ReaderConfig,
    mode: DeliveryMode,
    tx: mpsc::Sender<PageEvent>,
    cancel: CancelToken,
) {
    let spawn_tx = tx.clone();
    let name = format!("page-{}", page.index);
    if let Err(e) = thread::Builder::new()
        .name(name)
        .spawn(move || load_worker(&page, source.as_ref(), &config, mode, &tx, &cancel))
    {
        error!("pipeline: failed to spawn load worker: {e}");
        let _ = spawn_tx.send(PageEvent::Status(PageStatus::Error(
            TransportError(format!("spawn: {e}")).into(),
        )));
    }
}

fn load_worker(
    page: &Page,
    source: &dyn PageSource,
    config: &ReaderConfig,
    mode: DeliveryMode,
    tx: &mpsc::Sender<PageEvent>,
    cancel: &CancelToken,
) {
    debug!("worker: page {} started", page.index);
    let mut gate = ProgressGate::new(config.pipeline.progress_interval);
    let Some(bytes) = fetch_bytes(page, source, config, &mut gate, tx, cancel) else {
        debug!("worker: page {} exiting without bytes", page.index);
        return;
    };
    if cancel.is_cancelled() {
        return;
    }
    match mode {
        DeliveryMode::Bytes => {
            let _ = tx.send(PageEvent::Bytes(bytes));
            let _ = tx.send(PageEvent::Status(PageStatus::Ready));
        }
        DeliveryMode::Decoded => {
            deliver_standalone(page, bytes, config, &mut gate, tx, cancel);
        }
    }
    debug!("worker: page {} done", page.index);
}

/// Subscribe and pull the page's bytes, reporting status and gated progress.
/// Returns `None` after reporting an error, or silently on cancellation.
/// The byte stream is owned here and dropped on every exit path.
fn fetch_bytes(
    page: &Page,
    source: &dyn PageSource,
    config: &ReaderConfig,
    gate: &mut ProgressGate,
    tx: &mpsc::Sender<PageEvent>,
    cancel: &CancelToken,
) -> Option<Vec<u8>> {
    let events = match source.subscribe(page) {
        Ok(events) => events,
        Err(e) => {
            warn!("worker: page {} subscribe failed: {e}", page.index);
            let _ = tx.send(PageEvent::Status(PageStatus::Error(e.into())));
            return None;
        }
    };

    let mut downloading = false;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match events.recv_timeout(SOURCE_POLL) {
            Ok(SourceEvent::Queued) => {
                let _ = tx.send(PageEvent::Status(PageStatus::Queued));
            }
            Ok(SourceEvent::LoadingMetadata) => {
                let _ = tx.send(PageEvent::Status(PageStatus::LoadingMetadata));
            }
            Ok(SourceEvent::Downloading(pct)) => {
                if !downloading {
                    downloading = true;
                    let _ = tx.send(PageEvent::Status(PageStatus::Downloading));
                }
                if let Some(visible) = gate.offer(pct, Instant::now()) {
                    let _ = tx.send(PageEvent::Progress(visible));
                }
            }
            Ok(SourceEvent::Ready) => break,
            Ok(SourceEvent::Error(message)) => {
                warn!("worker: page {} source error: {message}", page.index);
                let _ = tx.send(PageEvent::Status(PageStatus::Error(
                    TransportError(message).into(),
                )));
                return None;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("worker: page {} source closed before ready", page.index);
                let _ = tx.send(PageEvent::Status(PageStatus::Error(
                    TransportError("source closed the subscription".into()).into(),
                )));
                return None;
            }
        }
    }
    // Ready を見たら購読は用済み。ここで drop して以降のイベントを断つ。
    drop(events);

    if cancel.is_cancelled() {
        return None;
    }
    let mut stream = match source.open_bytes(page) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("worker: page {} open failed: {e}", page.index);
            let _ = tx.send(PageEvent::Status(PageStatus::Error(e.into())));
            return None;
        }
    };

    let started = Instant::now();
    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; config.pipeline.read_chunk_bytes.max(1)];
    loop {
        if cancel.is_cancelled() {
            debug!("worker: page {} cancelled mid-read", page.index);
            return None; // stream drops here, its one and only close
        }
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => bytes.extend_from_slice(&chunk[..n]),
            Err(e) => {
                warn!("worker: page {} read failed: {e}", page.index);
                let _ = tx.send(PageEvent::Status(PageStatus::Error(
                    TransportError(format!("read: {e}")).into(),
                )));
                return None;
            }
        }
    }
    drop(stream);
    debug!(
        "worker: page {} fetched {} bytes in {:.1}ms",
        page.index,
        bytes.len(),
        started.elapsed().as_secs_f64() * 1000.0,
    );

    if let Some(visible) = gate.flush(100, Instant::now()) {
        let _ = tx.send(PageEvent::Progress(visible));
    }
    Some(bytes)
}

/// Standalone delivery: sniff, decode, maybe split, then hand over exactly
/// one payload followed by the Ready status.
fn deliver_standalone(
    page: &Page,
    bytes: Vec<u8>,
    config: &ReaderConfig,
    gate: &mut ProgressGate,
    tx: &mpsc::Sender<PageEvent>,
    cancel: &CancelToken,
) {
    if sniff::is_animated(&bytes) {
        debug!("worker: page {} is animated, no composition", page.index);
        let _ = tx.send(PageEvent::Decoded(DecodedPage::Animated(bytes)));
        let _ = tx.send(PageEvent::Status(PageStatus::Ready));
        return;
    }
    if cancel.is_cancelled() {
        return;
    }

    let split_candidate = config.split_wide_pages && page.known_wide() != Some(false);
    let started = Instant::now();
    let image = match image::load_from_memory(&bytes) {
        Ok(image) => image,
        Err(e) if split_candidate => {
            // 分割候補のデコード失敗は生バイトで表示に回す。ホスト側の
            // デコーダが成功する余地を残すため、エラーにはしない。
            warn!(
                "worker: page {} decode failed, raw fallback: {e}",
                page.index
            );
            let _ = tx.send(PageEvent::Decoded(DecodedPage::Raw(bytes)));
            let _ = tx.send(PageEvent::Status(PageStatus::Ready));
            return;
        }
        Err(e) => {
            warn!("worker: page {} decode failed: {e}", page.index);
            let _ = tx.send(PageEvent::Status(PageStatus::Error(PageError::Decode(
                e.to_string(),
            ))));
            return;
        }
    };
    let (width, height) = (image.width(), image.height());
    info!(
        "worker: page {} decoded {}x{} in {:.1}ms",
        page.index,
        width,
        height,
        started.elapsed().as_secs_f64() * 1000.0,
    );
    page.mark_wide(sniff::is_wide(width, height));
    if cancel.is_cancelled() {
        return;
    }

    if config.split_wide_pages {
        // A fragment keeps its tagged half. A fresh wide page resolves to
        // Split here and keeps the reading-order first half; the host inserts
        // the second fragment after it. Pages already resolved standalone
        // render whole.
        let keep = match page.half {
            Some(half) => Some(half),
            None if sniff::is_wide(width, height)
                && matches!(page.resolution(), None | Some(SpreadResolution::Split)) =>
            {
                page.resolve(SpreadResolution::Split);
                Some(PageHalf::First)
            }
            None => None,
        };
        if let Some(half) = keep {
            let mut emit = |pct: u8| {
                if let Some(visible) = gate.flush(pct, Instant::now()) {
                    let _ = tx.send(PageEvent::Progress(visible));
                }
            };
            match compose::split_wide_page(image, config.direction, Some(&mut emit)) {
                Ok(halves) => {
                    let fragment = match half {
                        PageHalf::First => halves.first,
                        PageHalf::Second => halves.second,
                    };
                    let _ = tx.send(PageEvent::Decoded(DecodedPage::Still(fragment)));
                    let _ = tx.send(PageEvent::Status(PageStatus::Ready));
                }
                Err(e) => {
                    warn!(
                        "worker: page {} split failed, raw fallback: {e}",
                        page.index
                    );
                    let _ = tx.send(PageEvent::Decoded(DecodedPage::Raw(bytes)));
                    let _ = tx.send(PageEvent::Status(PageStatus::Ready));
                }
            }
            return;
        }
    }

    let _ = tx.send(PageEvent::Decoded(DecodedPage::Still(image.into_rgba8())));
    let _ = tx.send(PageEvent::Status(PageStatus::Ready));
}

// ---------------------------------------------------------------------------
// Pair composition
// ---------------------------------------------------------------------------

enum PairEvent {
    Progress(u8),
    Merged(DecodedPage),
    Standalone {
        first: DecodedPage,
        second: DecodedPage,
    },
}

/// Channel plumbing for one pair's composition worker.
struct Composition {
    req: Option<mpsc::Sender<(Vec<u8>, Vec<u8>)>>,
    rx: Option<mpsc::Receiver<PairEvent>>,
    tx: mpsc::Sender<PairEvent>,
    cancel: CancelToken,
    /// Composition runs on the pump thread when the worker could not spawn.
    inline: bool,
}

impl Composition {
    fn start(first: &Arc<Page>, second: &Arc<Page>, config: &ReaderConfig) -> Composition {
        let (req_tx, req_rx) = mpsc::channel::<(Vec<u8>, Vec<u8>)>();
        let (res_tx, res_rx) = mpsc::channel::<PairEvent>();
        let cancel = CancelToken::default();

        let worker_first = Arc::clone(first);
        let worker_second = Arc::clone(second);
        let worker_config = config.clone();
        let worker_cancel = cancel.clone();
        let worker_tx = res_tx.clone();
        // 要求チャネルが閉じれば recv が Err になり worker は退出する。
        // 仕事は高々1回。
        let inline = thread::Builder::new()
            .name(format!("compose-{}-{}", first.index, second.index))
            .spawn(move || {
                debug!(
                    "compose worker: pair ({}, {}) waiting",
                    worker_first.index, worker_second.index
                );
                if let Ok((first_bytes, second_bytes)) = req_rx.recv() {
                    compose_pair(
                        &worker_first,
                        &worker_second,
                        first_bytes,
                        second_bytes,
                        &worker_config,
                        &worker_tx,
                        &worker_cancel,
                    );
                }
                debug!(
                    "compose worker: pair ({}, {}) exiting",
                    worker_first.index, worker_second.index
                );
            })
            .is_err();
        if inline {
            error!("pipeline: composition thread unavailable, composing on the pump thread");
        }
        Composition {
            req: Some(req_tx),
            rx: Some(res_rx),
            tx: res_tx,
            cancel,
            inline,
        }
    }
}

/// Two adjacent pages driven as one unit: a merge candidate.
///
/// Pump it like a single page. Until the pair resolves, `progress()` follows
/// the paired formula (average of both loads, parked at 95); the composition
/// milestones then walk 96..=100. Afterwards either `merged()` holds the
/// spread image or each child carries its own standalone payload.
pub struct PairedPages {
    first: PageState,
    second: PageState,
    config: ReaderConfig,
    gate: ProgressGate,
    visible_progress: u8,
    comp: Composition,
    merged: Option<DecodedPage>,
    resolved: bool,
}

impl PairedPages {
    fn attach(
        first: Arc<Page>,
        second: Arc<Page>,
        source: Arc<dyn PageSource>,
        config: ReaderConfig,
    ) -> PairedPages {
        let comp = Composition::start(&first, &second, &config);
        let gate = ProgressGate::new(config.pipeline.progress_interval);
        let first = PageState::attach(
            first,
            Arc::clone(&source),
            config.clone(),
            DeliveryMode::Bytes,
        );
        let second = PageState::attach(second, source, config.clone(), DeliveryMode::Bytes);
        PairedPages {
            first,
            second,
            config,
            gate,
            visible_progress: 0,
            comp,
            merged: None,
            resolved: false,
        }
    }

    pub fn first(&self) -> &PageState {
        &self.first
    }

    pub fn second(&self) -> &PageState {
        &self.second
    }

    /// Mutable access to one child, e.g. to take its standalone payload.
    /// The pair is still meant to be pumped and detached as a unit.
    pub fn first_mut(&mut self) -> &mut PageState {
        &mut self.first
    }

    pub fn second_mut(&mut self) -> &mut PageState {
        &mut self.second
    }

    /// The composite spread image, if the pair merged.
    pub fn merged(&self) -> Option<&DecodedPage> {
        self.merged.as_ref()
    }

    pub fn take_merged(&mut self) -> Option<DecodedPage> {
        self.merged.take()
    }

    /// True until the pair has delivered an outcome (merged or standalone).
    /// Hosts use this to keep transition chrome away from half-finished
    /// spreads.
    pub fn is_unresolved(&self) -> bool {
        !self.resolved
    }

    /// Pair-visible progress, 0..=100.
    pub fn progress(&self) -> u8 {
        self.visible_progress
    }

    /// Combined status: an error on either side wins, otherwise the pair is
    /// as far along as its laggard, and Ready only once the outcome exists.
    pub fn status(&self) -> PageStatus {
        for child in [&self.first, &self.second] {
            if let PageStatus::Error(e) = child.status() {
                return PageStatus::Error(e.clone());
            }
        }
        if self.resolved {
            return PageStatus::Ready;
        }
        let first = self.first.status();
        let second = self.second.status();
        let laggard = if first.ordinal() <= second.ordinal() {
            first
        } else {
            second
        };
        match laggard {
            // Both loads done but the composite is still being written.
            PageStatus::Ready => PageStatus::Downloading,
            other => other.clone(),
        }
    }

    /// Drain both children and the composition channel; start composition
    /// once both byte buffers are home. Returns whether anything changed.
    pub fn pump(&mut self) -> bool {
        let mut dirty = self.first.pump();
        if self.second.pump() {
            dirty = true;
        }

        if !self.resolved && self.merged.is_none() {
            let raw = paired_progress(self.first.progress(), self.second.progress());
            if let Some(visible) = self.gate.offer(raw, Instant::now()) {
                self.visible_progress = visible;
                dirty = true;
            }
        }

        if !self.resolved && self.first.has_bytes() && self.second.has_bytes() {
            if let (Some(first_bytes), Some(second_bytes)) =
                (self.first.take_bytes(), self.second.take_bytes())
            {
                info!(
                    "pipeline: pair ({}, {}) bytes complete, composing",
                    self.first.page().index,
                    self.second.page().index
                );
                if self.comp.inline {
                    compose_pair(
                        self.first.page(),
                        self.second.page(),
                        first_bytes,
                        second_bytes,
                        &self.config,
                        &self.comp.tx,
                        &self.comp.cancel,
                    );
                } else if let Some(req) = &self.comp.req {
                    let _ = req.send((first_bytes, second_bytes));
                }
                dirty = true;
            }
        }

        while let Some(event) = self.comp.rx.as_ref().and_then(|rx| rx.try_recv().ok()) {
            match event {
                PairEvent::Progress(pct) => {
                    if let Some(visible) = self.gate.flush(pct, Instant::now()) {
                        self.visible_progress = visible;
                    }
                }
                PairEvent::Merged(composite) => {
                    self.merged = Some(composite);
                    self.finish_outcome();
                }
                PairEvent::Standalone { first, second } => {
                    self.first.set_decoded(first);
                    self.second.set_decoded(second);
                    self.finish_outcome();
                }
            }
            dirty = true;
        }
        dirty
    }

    fn finish_outcome(&mut self) {
        self.resolved = true;
        if let Some(visible) = self.gate.flush(100, Instant::now()) {
            self.visible_progress = visible;
        }
    }

    /// Withdraw the whole pair: both children plus any composition still in
    /// flight. Idempotent and non-blocking.
    pub fn detach(&mut self) {
        self.comp.cancel.cancel();
        self.comp.req = None;
        self.comp.rx = None;
        self.merged = None;
        self.first.detach();
        self.second.detach();
    }

    /// Restart both loads and allow a fresh composition. Spread resolutions
    /// written by an earlier abort survive on purpose: a pair that fell back
    /// to standalone stays standalone for the session.
    pub fn retry(&mut self) {
        info!(
            "pipeline: pair ({}, {}) retrying",
            self.first.page().index,
            self.second.page().index
        );
        self.comp.cancel.cancel();
        self.comp = Composition::start(self.first.page(), self.second.page(), &self.config);
        self.first.retry();
        self.second.retry();
        self.merged = None;
        self.resolved = false;
        self.gate.reset();
        self.visible_progress = 0;
    }
}

/// One-shot composition for a byte-complete pair: probe, decide, flag, and
/// deliver either a merged spread or two standalone payloads.
fn compose_pair(
    first: &Page,
    second: &Page,
    first_bytes: Vec<u8>,
    second_bytes: Vec<u8>,
    config: &ReaderConfig,
    tx: &mpsc::Sender<PairEvent>,
    cancel: &CancelToken,
) {
    if cancel.is_cancelled() {
        return;
    }
    if first.blocks_merge() || second.blocks_merge() {
        debug!(
            "compose worker: pair ({}, {}) flagged standalone, skipping merge",
            first.index, second.index
        );
        deliver_pair_standalone(first, second, first_bytes, second_bytes, config, tx);
        return;
    }

    let first_animated = sniff::is_animated(&first_bytes);
    let second_animated = sniff::is_animated(&second_bytes);
    let (first_probe, second_probe) = match (
        sniff::probe_bounds(&first_bytes),
        sniff::probe_bounds(&second_bytes),
    ) {
        (Ok((fw, fh)), Ok((sw, sh))) => (
            PageProbe {
                width: fw,
                height: fh,
                animated: first_animated,
            },
            PageProbe {
                width: sw,
                height: sh,
                animated: second_animated,
            },
        ),
        (Err(e), _) => {
            warn!(
                "compose worker: page {} probe failed, merge abandoned: {e}",
                first.index
            );
            first.resolve(SpreadResolution::FullPage);
            deliver_pair_standalone(first, second, first_bytes, second_bytes, config, tx);
            return;
        }
        (_, Err(e)) => {
            warn!(
                "compose worker: page {} probe failed, merge abandoned: {e}",
                second.index
            );
            second.resolve(SpreadResolution::FullPage);
            first.resolve(SpreadResolution::Isolated);
            deliver_pair_standalone(first, second, first_bytes, second_bytes, config, tx);
            return;
        }
    };
    first.mark_wide(first_probe.is_wide());
    second.mark_wide(second_probe.is_wide());

    let decision = spread::resolve_pair(&first_probe, &second_probe, config);
    spread::apply_pair_decision(first, second, &first_probe, &second_probe, decision);
    if cancel.is_cancelled() {
        return;
    }
    match decision {
        SpreadDecision::MergeLeftRight | SpreadDecision::MergeRightLeft => {
            merge_and_deliver(first, second, first_bytes, second_bytes, config, tx, cancel);
        }
        _ => deliver_pair_standalone(first, second, first_bytes, second_bytes, config, tx),
    }
}

fn merge_and_deliver(
    first: &Page,
    second: &Page,
    first_bytes: Vec<u8>,
    second_bytes: Vec<u8>,
    config: &ReaderConfig,
    tx: &mpsc::Sender<PairEvent>,
    cancel: &CancelToken,
) {
    let started = Instant::now();
    let first_image = match image::load_from_memory(&first_bytes) {
        Ok(image) => image,
        Err(e) => {
            warn!(
                "compose worker: page {} decode failed, merge abandoned: {e}",
                first.index
            );
            first.resolve(SpreadResolution::FullPage);
            deliver_pair_standalone(first, second, first_bytes, second_bytes, config, tx);
            return;
        }
    };
    let _ = tx.send(PairEvent::Progress(96));
    if cancel.is_cancelled() {
        return;
    }
    let second_image = match image::load_from_memory(&second_bytes) {
        Ok(image) => image,
        Err(e) => {
            warn!(
                "compose worker: page {} decode failed, merge abandoned: {e}",
                second.index
            );
            second.resolve(SpreadResolution::FullPage);
            first.resolve(SpreadResolution::Isolated);
            deliver_pair_standalone(first, second, first_bytes, second_bytes, config, tx);
            return;
        }
    };
    let _ = tx.send(PairEvent::Progress(97));
    if cancel.is_cancelled() {
        return;
    }

    let mut emit = |pct: u8| {
        let _ = tx.send(PairEvent::Progress(composite_progress(pct)));
    };
    match compose::merge_pages(
        first_image,
        second_image,
        config.direction,
        config.background.merge_fill(),
        config.pipeline.max_composite_pixels,
        Some(&mut emit),
    ) {
        Ok(composite) => {
            first.resolve(SpreadResolution::Spread);
            second.resolve(SpreadResolution::Spread);
            info!(
                "compose worker: pair ({}, {}) merged -> {}x{} in {:.1}ms",
                first.index,
                second.index,
                composite.width(),
                composite.height(),
                started.elapsed().as_secs_f64() * 1000.0,
            );
            let _ = tx.send(PairEvent::Merged(DecodedPage::Still(composite)));
        }
        Err(e) => {
            warn!(
                "compose worker: pair ({}, {}) merge failed: {e}",
                first.index, second.index
            );
            first.resolve(SpreadResolution::FullPage);
            second.resolve(SpreadResolution::Isolated);
            deliver_pair_standalone(first, second, first_bytes, second_bytes, config, tx);
        }
    }
}

fn deliver_pair_standalone(
    first: &Page,
    second: &Page,
    first_bytes: Vec<u8>,
    second_bytes: Vec<u8>,
    config: &ReaderConfig,
    tx: &mpsc::Sender<PairEvent>,
) {
    let first_payload = standalone_payload(first, first_bytes, config);
    let second_payload = standalone_payload(second, second_bytes, config);
    let _ = tx.send(PairEvent::Standalone {
        first: first_payload,
        second: second_payload,
    });
}

/// Decode one page of an aborted pair for standalone display. Decode
/// failures here are composition-stage failures: the raw bytes go through
/// unmodified rather than becoming an error.
fn standalone_payload(page: &Page, bytes: Vec<u8>, config: &ReaderConfig) -> DecodedPage {
    if sniff::is_animated(&bytes) {
        return DecodedPage::Animated(bytes);
    }
    let image = match image::load_from_memory(&bytes) {
        Ok(image) => image,
        Err(e) => {
            warn!(
                "compose worker: page {} decode failed, raw fallback: {e}",
                page.index
            );
            return DecodedPage::Raw(bytes);
        }
    };
    page.mark_wide(sniff::is_wide(image.width(), image.height()));
    if page.resolution() == Some(SpreadResolution::Split) {
        let half = page.half.unwrap_or(PageHalf::First);
        match compose::split_wide_page(image, config.direction, None) {
            Ok(halves) => {
                return DecodedPage::Still(match half {
                    PageHalf::First => halves.first,
                    PageHalf::Second => halves.second,
                });
            }
            Err(e) => {
                warn!(
                    "compose worker: page {} split failed, raw fallback: {e}",
                    page.index
                );
                return DecodedPage::Raw(bytes);
            }
        }
    }
    DecodedPage::Still(image.into_rgba8())
}

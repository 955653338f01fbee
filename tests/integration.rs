//! End-to-end pipeline tests against a scripted page source.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};

use mihiraki::config::{PipelineConfigFile, ReaderConfig, ReaderConfigFile, ReadingDirection};
use mihiraki::error::{PageError, TransportError};
use mihiraki::page::{Page, PageHalf, SpreadResolution};
use mihiraki::pipeline::{DecodedPage, PagePipeline, PageState, PageStatus, PairedPages};
use mihiraki::source::{PageBytes, PageSource, SourceEvent};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

const WAIT: Duration = Duration::from_secs(10);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// Scripted source
// ---------------------------------------------------------------------------

/// One load attempt as the fake source will play it back: the status events
/// to stream, then the bytes behind `open_bytes`.
#[derive(Clone)]
struct Script {
    events: Vec<SourceEvent>,
    bytes: Vec<u8>,
    /// Sleep per read call, to keep a download in flight long enough to
    /// cancel it.
    read_delay: Duration,
}

impl Script {
    fn ok(bytes: Vec<u8>) -> Script {
        Script {
            events: vec![
                SourceEvent::Queued,
                SourceEvent::LoadingMetadata,
                SourceEvent::Downloading(10),
                SourceEvent::Downloading(55),
                SourceEvent::Downloading(100),
                SourceEvent::Ready,
            ],
            bytes,
            read_delay: Duration::ZERO,
        }
    }

    fn failing(message: &str) -> Script {
        Script {
            events: vec![
                SourceEvent::Queued,
                SourceEvent::LoadingMetadata,
                SourceEvent::Error(message.into()),
            ],
            bytes: Vec::new(),
            read_delay: Duration::ZERO,
        }
    }

    fn slow(bytes: Vec<u8>, read_delay: Duration) -> Script {
        Script {
            read_delay,
            ..Script::ok(bytes)
        }
    }
}

/// In-memory page source playing one queued script per attempt. `retry`
/// advances to the next script, matching a source that clears failed state.
/// Every stream it opens bumps the shared close counter on drop.
struct FakeSource {
    scripts: Mutex<HashMap<usize, Vec<Script>>>,
    closes: Arc<AtomicUsize>,
}

impl FakeSource {
    fn new(pages: Vec<(usize, Vec<Script>)>) -> Arc<FakeSource> {
        Arc::new(FakeSource {
            scripts: Mutex::new(pages.into_iter().collect()),
            closes: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn single(index: usize, script: Script) -> Arc<FakeSource> {
        FakeSource::new(vec![(index, vec![script])])
    }

    fn stream_closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn current(&self, index: usize) -> Option<Script> {
        self.scripts
            .lock()
            .unwrap()
            .get(&index)
            .and_then(|queue| queue.first())
            .cloned()
    }
}

impl PageSource for FakeSource {
    fn subscribe(&self, page: &Page) -> Result<mpsc::Receiver<SourceEvent>, TransportError> {
        let script = self
            .current(page.index)
            .ok_or_else(|| TransportError(format!("no script for page {}", page.index)))?;
        let (tx, rx) = mpsc::channel();
        for event in script.events {
            let _ = tx.send(event);
        }
        Ok(rx)
    }

    fn open_bytes(&self, page: &Page) -> Result<PageBytes, TransportError> {
        let script = self
            .current(page.index)
            .ok_or_else(|| TransportError(format!("no script for page {}", page.index)))?;
        Ok(Box::new(TrackedStream {
            data: Cursor::new(script.bytes),
            read_delay: script.read_delay,
            closes: Arc::clone(&self.closes),
        }))
    }

    fn retry(&self, page: &Page) {
        let mut scripts = self.scripts.lock().unwrap();
        if let Some(queue) = scripts.get_mut(&page.index)
            && !queue.is_empty()
        {
            queue.remove(0);
        }
    }
}

struct TrackedStream {
    data: Cursor<Vec<u8>>,
    read_delay: Duration,
    closes: Arc<AtomicUsize>,
}

impl Read for TrackedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        self.data.read(buf)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(direction: ReadingDirection, split: bool) -> ReaderConfig {
    ReaderConfigFile {
        direction: Some(direction),
        split_wide_pages: Some(split),
        pipeline: PipelineConfigFile {
            progress_interval_ms: Some(0),
            read_chunk_bytes: Some(1024),
            ..Default::default()
        },
        ..Default::default()
    }
    .resolve()
}

fn png_page(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(width, height, Rgba(color)))
}

/// Left columns red, right columns blue, boundary at floor(w/2).
fn two_tone_page(width: u32, height: u32) -> Vec<u8> {
    let half = width / 2;
    encode_png(RgbaImage::from_fn(width, height, |x, _| {
        if x < half { Rgba(RED) } else { Rgba(BLUE) }
    }))
}

fn encode_png(image: RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Minimal two-frame GIF, animated by any sniffer's standard.
fn animated_gif() -> Vec<u8> {
    let mut b = b"GIF89a".to_vec();
    b.extend_from_slice(&[1, 0, 1, 0, 0x00, 0, 0]);
    for _ in 0..2 {
        b.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0x00]);
        b.extend_from_slice(&[0x02, 0x02, 0x4C, 0x01, 0x00]);
    }
    b.push(0x3B);
    b
}

fn pump_until(state: &mut PageState, mut done: impl FnMut(&PageState) -> bool) {
    let deadline = Instant::now() + WAIT;
    loop {
        state.pump();
        if done(state) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for page");
        thread::sleep(Duration::from_millis(2));
    }
}

fn pump_pair_until(pair: &mut PairedPages, mut done: impl FnMut(&PairedPages) -> bool) {
    let deadline = Instant::now() + WAIT;
    loop {
        pair.pump();
        if done(pair) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for pair");
        thread::sleep(Duration::from_millis(2));
    }
}

fn is_terminal(status: &PageStatus) -> bool {
    matches!(status, PageStatus::Ready | PageStatus::Error(_))
}

// ---------------------------------------------------------------------------
// Single pages
// ---------------------------------------------------------------------------

#[test]
fn single_page_loads_to_ready() {
    init_logging();
    let source = FakeSource::single(0, Script::ok(png_page(40, 60, RED)));
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, false));
    let mut state = pipeline.attach(Arc::new(Page::new(0, "chapter/0001.png")));

    let mut observed = Vec::new();
    let deadline = Instant::now() + WAIT;
    while !is_terminal(state.status()) {
        state.pump();
        if *state.status() == PageStatus::Queued {
            assert_eq!(state.progress(), 0, "progress before the pipeline starts");
        }
        observed.push(state.progress());
        assert!(Instant::now() < deadline, "timed out waiting for page");
        thread::sleep(Duration::from_millis(2));
    }

    assert_eq!(*state.status(), PageStatus::Ready);
    assert_eq!(state.progress(), 100);
    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "{observed:?}");
    let decoded = state.decoded().expect("payload should be delivered");
    assert_eq!(decoded.dimensions(), Some((40, 60)));
    assert_eq!(state.page().known_wide(), Some(false));
}

#[test]
fn transport_error_surfaces_and_retry_recovers() {
    init_logging();
    let source = FakeSource::new(vec![(
        0,
        vec![Script::failing("connection reset"), Script::ok(png_page(10, 20, BLUE))],
    )]);
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, false));
    let mut state = pipeline.attach(Arc::new(Page::new(0, "http://host/p/0")));

    pump_until(&mut state, |s| is_terminal(s.status()));
    let error = state.error().expect("load should fail");
    assert!(matches!(error, PageError::Transport(_)));
    assert!(error.is_retryable());
    assert!(!state.offers_browser_escape(), "transport errors retry in place");

    state.retry();
    assert_eq!(*state.status(), PageStatus::Queued);
    assert_eq!(state.progress(), 0);
    pump_until(&mut state, |s| is_terminal(s.status()));
    assert_eq!(*state.status(), PageStatus::Ready);
    assert_eq!(
        state.decoded().and_then(DecodedPage::dimensions),
        Some((10, 20))
    );
}

#[test]
fn decode_error_on_network_page_offers_browser_escape() {
    init_logging();
    let source = FakeSource::single(0, Script::ok(b"these are not image bytes".to_vec()));
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, false));
    let mut state = pipeline.attach(Arc::new(Page::new(0, "https://host/p/0")));

    pump_until(&mut state, |s| is_terminal(s.status()));
    let error = state.error().expect("decode should fail");
    assert!(matches!(error, PageError::Decode(_)));
    assert!(!error.is_retryable());
    assert!(state.offers_browser_escape());
}

#[test]
fn wide_page_splits_into_reading_order_halves() {
    init_logging();
    let bytes = two_tone_page(200, 100);

    // LTR: the first fragment is the left (red) half.
    let source = FakeSource::single(0, Script::ok(bytes.clone()));
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, true));
    let page = Arc::new(Page::new(0, "spread.png"));
    let mut state = pipeline.attach(Arc::clone(&page));
    pump_until(&mut state, |s| is_terminal(s.status()));

    assert_eq!(*state.status(), PageStatus::Ready);
    assert_eq!(page.resolution(), Some(SpreadResolution::Split));
    assert_eq!(page.known_wide(), Some(true));
    let first = state.decoded().and_then(DecodedPage::as_still).unwrap();
    assert_eq!(first.dimensions(), (100, 100));
    assert_eq!(*first.get_pixel(0, 0), Rgba(RED));
    assert_eq!(*first.get_pixel(99, 99), Rgba(RED));

    // The host inserts the second fragment after the first; same bytes, the
    // other half.
    let source = FakeSource::single(0, Script::ok(bytes.clone()));
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, true));
    let mut second = pipeline.attach(page.fragment(PageHalf::Second));
    pump_until(&mut second, |s| is_terminal(s.status()));
    let fragment = second.decoded().and_then(DecodedPage::as_still).unwrap();
    assert_eq!(fragment.dimensions(), (100, 100));
    assert_eq!(*fragment.get_pixel(0, 0), Rgba(BLUE));

    // RTL readers see the right (blue) half first.
    let source = FakeSource::single(0, Script::ok(bytes));
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Rtl, true));
    let mut state = pipeline.attach(Arc::new(Page::new(0, "spread.png")));
    pump_until(&mut state, |s| is_terminal(s.status()));
    let first = state.decoded().and_then(DecodedPage::as_still).unwrap();
    assert_eq!(*first.get_pixel(0, 0), Rgba(BLUE));
}

#[test]
fn tall_page_is_untouched_by_split_setting() {
    init_logging();
    let source = FakeSource::single(0, Script::ok(png_page(50, 120, RED)));
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, true));
    let page = Arc::new(Page::new(0, "page.png"));
    let mut state = pipeline.attach(Arc::clone(&page));
    pump_until(&mut state, |s| is_terminal(s.status()));
    assert_eq!(
        state.decoded().and_then(DecodedPage::dimensions),
        Some((50, 120))
    );
    assert_eq!(page.resolution(), None);
}

// ---------------------------------------------------------------------------
// Pairs
// ---------------------------------------------------------------------------

#[test]
fn two_tall_pages_merge_left_to_right() {
    init_logging();
    let source = FakeSource::new(vec![
        (0, vec![Script::ok(png_page(100, 200, RED))]),
        (1, vec![Script::ok(png_page(80, 150, BLUE))]),
    ]);
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, false));
    let first = Arc::new(Page::new(0, "a.png"));
    let second = Arc::new(Page::new(1, "b.png"));
    let mut pair = pipeline.attach_pair(Arc::clone(&first), Arc::clone(&second));

    assert!(pair.is_unresolved());
    let mut observed = Vec::new();
    pump_pair_until(&mut pair, |p| {
        observed.push(p.progress());
        !p.is_unresolved()
    });

    assert_eq!(pair.status(), PageStatus::Ready);
    assert_eq!(pair.progress(), 100);
    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "{observed:?}");

    let merged = pair.merged().and_then(DecodedPage::as_still).unwrap();
    assert_eq!(merged.dimensions(), (180, 200));
    assert_eq!(*merged.get_pixel(0, 0), Rgba(RED));
    assert_eq!(*merged.get_pixel(100, 0), Rgba(BLUE));
    // The shorter page is top-aligned; the default smart theme fills white.
    assert_eq!(*merged.get_pixel(100, 149), Rgba(BLUE));
    assert_eq!(*merged.get_pixel(100, 150), Rgba([255, 255, 255, 255]));

    assert_eq!(first.resolution(), Some(SpreadResolution::Spread));
    assert_eq!(second.resolution(), Some(SpreadResolution::Spread));

    // The host moves the spread out, e.g. into a texture upload.
    let spread = pair.take_merged().expect("merged payload moves to the host");
    assert_eq!(spread.dimensions(), Some((180, 200)));
    assert!(pair.merged().is_none());
}

#[test]
fn reattached_pair_merges_again() {
    init_logging();
    let source = FakeSource::new(vec![
        (0, vec![Script::ok(png_page(100, 200, RED))]),
        (1, vec![Script::ok(png_page(80, 200, BLUE))]),
    ]);
    let pipeline = PagePipeline::new(source.clone(), config(ReadingDirection::Ltr, false));
    let first = Arc::new(Page::new(0, "a.png"));
    let second = Arc::new(Page::new(1, "b.png"));

    let mut pair = pipeline.attach_pair(Arc::clone(&first), Arc::clone(&second));
    pump_pair_until(&mut pair, |p| !p.is_unresolved());
    assert!(pair.merged().is_some());
    pair.detach();

    // Scrolling back re-attaches the same pages. A confirmed spread comes
    // back as a spread, not as two standalone pages.
    let mut pair = pipeline.attach_pair(Arc::clone(&first), Arc::clone(&second));
    pump_pair_until(&mut pair, |p| !p.is_unresolved());
    let merged = pair
        .take_merged()
        .expect("re-attached pair should deliver the spread again");
    assert_eq!(merged.dimensions(), Some((180, 200)));
    assert_eq!(first.resolution(), Some(SpreadResolution::Spread));
    assert_eq!(second.resolution(), Some(SpreadResolution::Spread));
}

#[test]
fn rtl_merge_places_second_page_left() {
    init_logging();
    let source = FakeSource::new(vec![
        (0, vec![Script::ok(png_page(100, 200, RED))]),
        (1, vec![Script::ok(png_page(80, 200, BLUE))]),
    ]);
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Rtl, false));
    let mut pair = pipeline.attach_pair(
        Arc::new(Page::new(0, "a.png")),
        Arc::new(Page::new(1, "b.png")),
    );
    pump_pair_until(&mut pair, |p| !p.is_unresolved());

    let merged = pair.merged().and_then(DecodedPage::as_still).unwrap();
    assert_eq!(merged.dimensions(), (180, 200));
    assert_eq!(*merged.get_pixel(0, 0), Rgba(BLUE));
    assert_eq!(*merged.get_pixel(80, 0), Rgba(RED));
}

#[test]
fn animated_partner_aborts_the_merge() {
    init_logging();
    let gif = animated_gif();
    let source = FakeSource::new(vec![
        (0, vec![Script::ok(gif.clone())]),
        (1, vec![Script::ok(png_page(60, 120, BLUE))]),
    ]);
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, false));
    let first = Arc::new(Page::new(0, "a.gif"));
    let second = Arc::new(Page::new(1, "b.png"));
    let mut pair = pipeline.attach_pair(Arc::clone(&first), Arc::clone(&second));
    pump_pair_until(&mut pair, |p| !p.is_unresolved());

    assert!(pair.merged().is_none(), "animated pages never merge");
    assert_eq!(pair.status(), PageStatus::Ready);
    assert_eq!(first.resolution(), Some(SpreadResolution::FullPage));
    assert_eq!(second.resolution(), Some(SpreadResolution::Isolated));

    let animated = pair.first_mut().take_decoded().expect("animated payload");
    assert!(matches!(animated, DecodedPage::Animated(_)), "{animated:?}");
    assert_eq!(animated.raw_bytes(), Some(gif.as_slice()));
    let neighbor = pair.second_mut().take_decoded().expect("neighbor payload");
    assert_eq!(neighbor.dimensions(), Some((60, 120)));
}

#[test]
fn corrupt_page_falls_back_to_raw_bytes() {
    init_logging();
    let junk = b"corrupt image payload".to_vec();
    let source = FakeSource::new(vec![
        (0, vec![Script::ok(junk.clone())]),
        (1, vec![Script::ok(png_page(60, 120, BLUE))]),
    ]);
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, false));
    let first = Arc::new(Page::new(0, "a.png"));
    let second = Arc::new(Page::new(1, "b.png"));
    let mut pair = pipeline.attach_pair(Arc::clone(&first), Arc::clone(&second));
    pump_pair_until(&mut pair, |p| !p.is_unresolved());

    assert!(pair.merged().is_none());
    assert_eq!(pair.status(), PageStatus::Ready, "fallback is not an error");
    // The unreadable page keeps its original bytes for the host's decoder.
    let fallback = pair.first_mut().take_decoded().expect("raw fallback payload");
    assert!(matches!(fallback, DecodedPage::Raw(_)), "{fallback:?}");
    assert_eq!(fallback.raw_bytes(), Some(junk.as_slice()));
    assert_eq!(
        pair.second().decoded().and_then(DecodedPage::dimensions),
        Some((60, 120))
    );
    // The pair is flagged out of the merge pool for the session.
    assert!(first.blocks_merge());
}

#[test]
fn already_resolved_pages_skip_composition() {
    init_logging();
    let source = FakeSource::new(vec![
        (0, vec![Script::ok(png_page(50, 100, RED))]),
        (1, vec![Script::ok(png_page(50, 100, BLUE))]),
    ]);
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, false));
    let first = Arc::new(Page::new(0, "a.png"));
    let second = Arc::new(Page::new(1, "b.png"));
    first.resolve(SpreadResolution::FullPage);

    let mut pair = pipeline.attach_pair(Arc::clone(&first), Arc::clone(&second));
    pump_pair_until(&mut pair, |p| !p.is_unresolved());
    assert!(pair.merged().is_none(), "a flagged page never re-merges");
    assert!(pair.first().decoded().is_some());
    assert!(pair.second().decoded().is_some());
}

#[test]
fn wide_partner_splits_and_isolates_the_first() {
    init_logging();
    let source = FakeSource::new(vec![
        (0, vec![Script::ok(png_page(60, 120, RED))]),
        (1, vec![Script::ok(two_tone_page(200, 100))]),
    ]);
    let pipeline = PagePipeline::new(source, config(ReadingDirection::Ltr, true));
    let first = Arc::new(Page::new(0, "a.png"));
    let second = Arc::new(Page::new(1, "b.png"));
    let mut pair = pipeline.attach_pair(Arc::clone(&first), Arc::clone(&second));
    pump_pair_until(&mut pair, |p| !p.is_unresolved());

    assert!(pair.merged().is_none());
    assert_eq!(first.resolution(), Some(SpreadResolution::Isolated));
    assert_eq!(second.resolution(), Some(SpreadResolution::Split));
    // The wide page delivers its first fragment; the host flows the second
    // fragment in behind it.
    let fragment = pair.second().decoded().and_then(DecodedPage::as_still).unwrap();
    assert_eq!(fragment.dimensions(), (100, 100));
    assert_eq!(*fragment.get_pixel(0, 0), Rgba(RED));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[test]
fn detach_mid_download_closes_the_stream_once() {
    init_logging();
    // 256 KiB at 1 KiB per chunked read with a per-read delay: the download
    // stays in flight long enough to cancel deterministically.
    let source = FakeSource::single(
        0,
        Script::slow(vec![0u8; 256 * 1024], Duration::from_millis(5)),
    );
    let pipeline = PagePipeline::new(source.clone(), config(ReadingDirection::Ltr, false));
    let mut state = pipeline.attach(Arc::new(Page::new(0, "big.png")));

    pump_until(&mut state, |s| *s.status() == PageStatus::Downloading);
    state.detach();
    assert!(state.is_detached());
    let status_at_detach = state.status().clone();
    let progress_at_detach = state.progress();

    // The worker notices the token at its next read checkpoint and drops the
    // stream, its one and only close.
    let deadline = Instant::now() + WAIT;
    while source.stream_closes() == 0 {
        assert!(Instant::now() < deadline, "stream was never closed");
        thread::sleep(Duration::from_millis(5));
    }
    thread::sleep(Duration::from_millis(20));
    assert_eq!(source.stream_closes(), 1);

    // No callback mutates a detached state, and detach stays idempotent.
    assert!(!state.pump());
    assert_eq!(*state.status(), status_at_detach);
    assert_eq!(state.progress(), progress_at_detach);
    assert!(state.decoded().is_none());
    state.detach();
    assert_eq!(source.stream_closes(), 1);
}

#[test]
fn detaching_a_pair_cancels_both_sides() {
    init_logging();
    let source = FakeSource::new(vec![
        (0, vec![Script::slow(vec![0u8; 256 * 1024], Duration::from_millis(5))]),
        (1, vec![Script::slow(vec![0u8; 256 * 1024], Duration::from_millis(5))]),
    ]);
    let pipeline = PagePipeline::new(source.clone(), config(ReadingDirection::Ltr, false));
    let mut pair = pipeline.attach_pair(
        Arc::new(Page::new(0, "a.png")),
        Arc::new(Page::new(1, "b.png")),
    );
    pump_pair_until(&mut pair, |p| {
        *p.first().status() == PageStatus::Downloading
            && *p.second().status() == PageStatus::Downloading
    });

    pair.detach();
    let deadline = Instant::now() + WAIT;
    while source.stream_closes() < 2 {
        assert!(Instant::now() < deadline, "streams were never closed");
        thread::sleep(Duration::from_millis(5));
    }
    thread::sleep(Duration::from_millis(20));
    assert_eq!(source.stream_closes(), 2);
    assert!(pair.merged().is_none());
}

#[test]
fn drop_detaches_like_an_explicit_call() {
    init_logging();
    let source = FakeSource::single(
        0,
        Script::slow(vec![0u8; 256 * 1024], Duration::from_millis(5)),
    );
    let pipeline = PagePipeline::new(source.clone(), config(ReadingDirection::Ltr, false));
    let mut state = pipeline.attach(Arc::new(Page::new(0, "big.png")));
    pump_until(&mut state, |s| *s.status() == PageStatus::Downloading);
    drop(state);

    let deadline = Instant::now() + WAIT;
    while source.stream_closes() == 0 {
        assert!(Instant::now() < deadline, "stream was never closed");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(source.stream_closes(), 1);
}

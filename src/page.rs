//! Page identity and spread-resolution flags.
//!
//! A [`Page`] is shared between the owning thread and its load worker, so the
//! mutable parts are set-once cells: whoever reaches a fact first records it,
//! and later writers lose quietly. That is what makes re-pairing decisions
//! stable for the rest of the session.

use std::sync::{Arc, OnceLock};

use log::debug;

/// Which half of a split wide page a fragment shows, in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageHalf {
    First,
    Second,
}

/// How a page participates in the spread flow, fixed once known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadResolution {
    /// Renders alone and is never offered for merging again.
    FullPage,
    /// Forced alone because a merge attempt around it was aborted.
    Isolated,
    /// Confirmed half of a successfully stitched spread.
    Spread,
    /// Wide page that splits into two half-page fragments.
    Split,
}

/// One page of a chapter as the pipeline sees it.
pub struct Page {
    /// Position in the chapter, zero-based.
    pub index: usize,
    /// Where the bytes come from: a URL, an archive member name, a path.
    pub locator: String,
    /// Fragment tag, set only on pages produced by a split.
    pub half: Option<PageHalf>,
    // 一度だけ書き込む。ワーカーと所有側が同時に触っても矛盾しない。
    wide: OnceLock<bool>,
    resolution: OnceLock<SpreadResolution>,
}

impl Page {
    pub fn new(index: usize, locator: impl Into<String>) -> Self {
        Page {
            index,
            locator: locator.into(),
            half: None,
            wide: OnceLock::new(),
            resolution: OnceLock::new(),
        }
    }

    /// A fragment page standing in for one half of this page after a split.
    /// Inherits the locator and the cached wide flag.
    pub fn fragment(&self, half: PageHalf) -> Arc<Page> {
        let page = Page {
            index: self.index,
            locator: self.locator.clone(),
            half: Some(half),
            wide: OnceLock::new(),
            resolution: OnceLock::new(),
        };
        if let Some(known) = self.wide.get() {
            let _ = page.wide.set(*known);
        }
        Arc::new(page)
    }

    /// True when the locator is an http(s) URL, meaning an error screen can
    /// offer opening the page in a browser.
    pub fn is_network_backed(&self) -> bool {
        self.locator
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"))
    }

    /// Cached answer to "is this page wider than tall", if known yet.
    pub fn known_wide(&self) -> Option<bool> {
        self.wide.get().copied()
    }

    /// Record the wide/tall answer. First caller wins; returns whether this
    /// call was the one that recorded it.
    pub fn mark_wide(&self, wide: bool) -> bool {
        self.wide.set(wide).is_ok()
    }

    pub fn resolution(&self) -> Option<SpreadResolution> {
        self.resolution.get().copied()
    }

    /// Record the spread resolution. First caller wins; a losing write is
    /// logged and dropped, never overwritten.
    pub fn resolve(&self, resolution: SpreadResolution) -> bool {
        match self.resolution.set(resolution) {
            Ok(()) => {
                debug!("page {}: resolved {:?}", self.index, resolution);
                true
            }
            Err(lost) => {
                debug!(
                    "page {}: already {:?}, ignoring {:?}",
                    self.index,
                    self.resolution.get(),
                    lost
                );
                false
            }
        }
    }

    /// Whether this page is out of the merge pool. Only the standalone
    /// verdicts block: a page confirmed as part of a spread merges again on
    /// every re-view, and a split page re-derives its split from bounds.
    pub fn blocks_merge(&self) -> bool {
        matches!(
            self.resolution.get(),
            Some(SpreadResolution::FullPage | SpreadResolution::Isolated)
        )
    }
}

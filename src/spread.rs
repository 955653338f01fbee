//! Spread decisions: whether adjacent pages merge into one visual spread,
//! stay independent, or get cut in half.
//!
//! Deciding is pure (bounds + settings in, [`SpreadDecision`] out) and cheap
//! enough to re-invoke; the caller applies the resulting page flags through
//! [`apply_pair_decision`], whose writes are set-once and therefore stable
//! against re-runs.

use log::debug;

use crate::config::ReaderConfig;
use crate::page::{Page, SpreadResolution};
use crate::sniff;

/// How a candidate pair occupies the reading flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadDecision {
    /// Each page renders alone.
    Independent,
    /// Stitch first-then-second, left to right.
    MergeLeftRight,
    /// Stitch second-then-first; the first page sits on the right.
    MergeRightLeft,
    /// The first page is wide and will be cut into two fragments.
    SplitFirst,
    /// The second page is wide and will be cut into two fragments.
    SplitSecond,
}

/// Bounds and animation facts for one page, as sniffed/probed from its bytes.
#[derive(Debug, Clone, Copy)]
pub struct PageProbe {
    pub width: u32,
    pub height: u32,
    pub animated: bool,
}

impl PageProbe {
    pub fn is_wide(&self) -> bool {
        sniff::is_wide(self.width, self.height)
    }
}

/// Decide the flow for a page with no merge partner: split it when it is a
/// wide still image and splitting is on, otherwise leave it alone.
pub fn resolve_single(probe: &PageProbe, config: &ReaderConfig) -> SpreadDecision {
    if !probe.animated && probe.is_wide() && config.split_wide_pages {
        SpreadDecision::SplitFirst
    } else {
        SpreadDecision::Independent
    }
}

/// Decide the flow for a merge-candidate pair.
///
/// Animated pages never merge and never split. A wide page never merges with
/// a neighbor either; it splits when the preference allows, and otherwise
/// stands alone. Only two tall still images actually merge, ordered by the
/// reading direction.
pub fn resolve_pair(
    first: &PageProbe,
    second: &PageProbe,
    config: &ReaderConfig,
) -> SpreadDecision {
    if first.animated || second.animated {
        return SpreadDecision::Independent;
    }
    if first.is_wide() {
        return if config.split_wide_pages {
            SpreadDecision::SplitFirst
        } else {
            SpreadDecision::Independent
        };
    }
    if second.is_wide() {
        return if config.split_wide_pages {
            SpreadDecision::SplitSecond
        } else {
            SpreadDecision::Independent
        };
    }
    if config.direction.is_ltr() {
        SpreadDecision::MergeLeftRight
    } else {
        SpreadDecision::MergeRightLeft
    }
}

/// Record what a pair decision means for each page's spread resolution.
///
/// Merge decisions record nothing here: `Spread` is only written once a
/// composite actually exists, so a failed stitch can still fall back to the
/// standalone flags. Abort decisions flag the page that caused the abort;
/// for a wide *first* page the second page stays unflagged on purpose, since
/// it can still pair with its own next neighbor.
pub fn apply_pair_decision(
    first: &Page,
    second: &Page,
    first_probe: &PageProbe,
    second_probe: &PageProbe,
    decision: SpreadDecision,
) {
    debug!(
        "spread: pages ({}, {}) -> {:?}",
        first.index, second.index, decision
    );
    match decision {
        SpreadDecision::Independent => {
            if first_probe.animated {
                first.resolve(SpreadResolution::FullPage);
                second.resolve(SpreadResolution::Isolated);
            } else if second_probe.animated {
                second.resolve(SpreadResolution::FullPage);
                first.resolve(SpreadResolution::Isolated);
            } else if first_probe.is_wide() {
                first.resolve(SpreadResolution::FullPage);
            } else if second_probe.is_wide() {
                second.resolve(SpreadResolution::FullPage);
                first.resolve(SpreadResolution::Isolated);
            }
        }
        SpreadDecision::SplitFirst => {
            first.resolve(SpreadResolution::Split);
        }
        SpreadDecision::SplitSecond => {
            second.resolve(SpreadResolution::Split);
            first.resolve(SpreadResolution::Isolated);
        }
        SpreadDecision::MergeLeftRight | SpreadDecision::MergeRightLeft => {}
    }
}

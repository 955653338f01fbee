//! Progress gating: one well-behaved user-visible stream per load attempt.

use std::time::{Duration, Instant};

/// Gate between raw progress values and the user-visible stream.
///
/// Within one load attempt the gate enforces: at most one emission per
/// `interval`, values never decrease, and exact repeats are dropped.
/// Terminal values go through [`ProgressGate::flush`], which skips the
/// interval check so completion is never delayed behind the rate limit.
pub struct ProgressGate {
    interval: Duration,
    last_value: Option<u8>,
    last_emit: Option<Instant>,
}

impl ProgressGate {
    pub fn new(interval: Duration) -> Self {
        ProgressGate {
            interval,
            last_value: None,
            last_emit: None,
        }
    }

    /// Offer a raw value. Returns the value to surface, if any. Regressions
    /// clamp up to the last emission and then drop out as duplicates.
    pub fn offer(&mut self, raw: u8, now: Instant) -> Option<u8> {
        let value = raw.min(100).max(self.last_value.unwrap_or(0));
        if Some(value) == self.last_value {
            return None;
        }
        if let Some(last) = self.last_emit
            && now.duration_since(last) < self.interval
        {
            return None;
        }
        self.last_value = Some(value);
        self.last_emit = Some(now);
        Some(value)
    }

    /// Offer a terminal value, bypassing the rate limit. Monotonicity and
    /// deduplication still hold.
    pub fn flush(&mut self, raw: u8, now: Instant) -> Option<u8> {
        let value = raw.min(100).max(self.last_value.unwrap_or(0));
        if Some(value) == self.last_value {
            return None;
        }
        self.last_value = Some(value);
        self.last_emit = Some(now);
        Some(value)
    }

    /// Forget everything for a fresh load attempt; the next value may be
    /// lower than anything seen before.
    pub fn reset(&mut self) {
        self.last_value = None;
        self.last_emit = None;
    }
}

/// Visible progress for a page whose merge partner is still loading: the
/// average of both pages, scaled so the bar parks just short of full until
/// the partner arrives.
pub fn paired_progress(own: u8, partner: u8) -> u8 {
    let average = f32::from(own.min(100)) + f32::from(partner.min(100));
    (average / 2.0 * 0.95).round() as u8
}

/// Map compositor progress (0..=100) onto the visible tail. The paired
/// formula parks at 95; decode milestones take 96 and 97; the stitch itself
/// walks 97..=100.
pub fn composite_progress(pct: u8) -> u8 {
    97 + (u16::from(pct.min(100)) * 3 / 100) as u8
}

//! Zoom and pan contract for one displayed page image.
//!
//! Everything here is viewport math plus explicit time: animation plans are
//! plain data carrying their schedule, and the caller passes `Instant`s into
//! [`ZoomController::tick`]. No display or timer dependency, so every rule is
//! testable as-is.

use std::time::{Duration, Instant};

use log::debug;

use crate::config::{ReadingDirection, ScaleType, ZoomAnchor};

/// Scale comparisons tolerate this much float noise.
const SCALE_EPSILON: f32 = 1e-5;

/// Viewport geometry in display pixels, including display-cutout insets that
/// eat into the usable height.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub top_inset: f32,
    pub bottom_inset: f32,
}

impl Viewport {
    /// A viewport without cutout insets.
    pub fn bare(width: f32, height: f32) -> Self {
        Viewport {
            width,
            height,
            top_inset: 0.0,
            bottom_inset: 0.0,
        }
    }
}

/// Which way the reader navigated onto the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Forward,
    Backward,
}

/// A scheduled scale-and-center animation.
///
/// The controller applies it on [`ZoomController::tick`]; hosts that drive
/// their own animator can read the fields instead.
#[derive(Debug, Clone, Copy)]
pub struct ZoomAnimation {
    scheduled_at: Instant,
    pub delay: Duration,
    pub duration: Duration,
    pub from_scale: f32,
    pub to_scale: f32,
    pub from_center_x: f32,
    pub to_center_x: f32,
}

/// Scale and pan state for one attached page image.
pub struct ZoomController {
    image_width: f32,
    image_height: f32,
    viewport: Viewport,
    scale_type: ScaleType,
    anchor: ZoomAnchor,
    direction: ReadingDirection,
    min_scale: f32,
    max_scale: f32,
    double_tap_scale: f32,
    scale: f32,
    center_x: f32,
    center_y: f32,
    pending: Option<ZoomAnimation>,
}

impl ZoomController {
    /// Hard zoom ceiling relative to the fit scale.
    pub const MAX_ZOOM_FACTOR: f32 = 5.0;
    /// Double-tap zooms to twice the fit scale.
    pub const DOUBLE_TAP_FACTOR: f32 = 2.0;
    /// Idle wait before the landscape auto-zoom starts.
    pub const LANDSCAPE_ZOOM_DELAY: Duration = Duration::from_millis(500);
    /// Length of the landscape auto-zoom animation.
    pub const LANDSCAPE_ZOOM_DURATION: Duration = Duration::from_millis(500);
    /// Pan is exhausted once the remainder drops below this fraction of the
    /// viewport width.
    pub const PAN_EXHAUSTED_FRACTION: f32 = 0.01;

    pub fn new(
        image_width: u32,
        image_height: u32,
        viewport: Viewport,
        scale_type: ScaleType,
        anchor: ZoomAnchor,
        direction: ReadingDirection,
    ) -> Self {
        let image_width = image_width as f32;
        let image_height = image_height as f32;
        let fit = fit_scale(scale_type, image_width, image_height, &viewport);
        let mut controller = ZoomController {
            image_width,
            image_height,
            viewport,
            scale_type,
            anchor,
            direction,
            min_scale: fit,
            max_scale: fit * Self::MAX_ZOOM_FACTOR,
            double_tap_scale: fit * Self::DOUBLE_TAP_FACTOR,
            scale: fit,
            center_x: 0.0,
            center_y: 0.0,
            pending: None,
        };
        // Initial framing gravitates to the configured edge; clamping turns
        // the raw edge coordinate into a valid center.
        controller.center_x = match controller.resolved_anchor() {
            ZoomAnchor::Left => 0.0,
            ZoomAnchor::Right => image_width,
            _ => image_width / 2.0,
        };
        controller.clamp_center();
        controller
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn min_scale(&self) -> f32 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f32 {
        self.max_scale
    }

    pub fn double_tap_scale(&self) -> f32 {
        self.double_tap_scale
    }

    /// Center of the viewport in image coordinates.
    pub fn center(&self) -> (f32, f32) {
        (self.center_x, self.center_y)
    }

    pub fn is_zoomed(&self) -> bool {
        self.scale > self.min_scale + SCALE_EPSILON
    }

    /// Set an absolute scale from a user gesture. Values clamp into
    /// `[min_scale, max_scale]`; any scheduled zoom is cancelled.
    pub fn set_scale(&mut self, scale: f32) {
        self.interrupt();
        self.scale = safe_scale(scale).clamp(self.min_scale, self.max_scale);
        self.clamp_center();
    }

    /// Double tap: zoom to twice fit centered on the tap, or back out to fit
    /// when already zoomed.
    pub fn double_tap(&mut self, focus_x: f32) {
        self.interrupt();
        if self.is_zoomed() {
            self.scale = self.min_scale;
        } else {
            self.scale = self.double_tap_scale;
            self.center_x = focus_x;
        }
        self.clamp_center();
    }

    /// Pan by a view-space delta (display pixels), clamped to the image.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.interrupt();
        self.center_x += dx / self.scale;
        self.center_y += dy / self.scale;
        self.clamp_center();
    }

    /// One page-turn-adjacent pan step, in image coordinates: the width of
    /// the viewport at the current scale.
    pub fn pan_step(&self) -> f32 {
        self.viewport.width / self.scale
    }

    pub fn pan_left(&mut self) {
        let step = self.pan_step();
        self.interrupt();
        self.center_x -= step;
        self.clamp_center();
    }

    pub fn pan_right(&mut self) {
        let step = self.pan_step();
        self.interrupt();
        self.center_x += step;
        self.clamp_center();
    }

    /// Unconsumed pan room to the left, in display pixels.
    pub fn pan_remaining_left(&self) -> f32 {
        let half_visible = self.viewport.width / (2.0 * self.scale);
        ((self.center_x - half_visible) * self.scale).max(0.0)
    }

    /// Unconsumed pan room to the right, in display pixels.
    pub fn pan_remaining_right(&self) -> f32 {
        let half_visible = self.viewport.width / (2.0 * self.scale);
        ((self.image_width - self.center_x - half_visible) * self.scale).max(0.0)
    }

    /// Whether a pan-left should move the image rather than turn the page.
    /// Sub-percent slivers of remaining pan count as exhausted, so a page
    /// turn is never swallowed by an invisible fraction of a pixel.
    pub fn can_pan_left(&self) -> bool {
        self.pan_remaining_left() > self.viewport.width * Self::PAN_EXHAUSTED_FRACTION
    }

    pub fn can_pan_right(&self) -> bool {
        self.pan_remaining_right() > self.viewport.width * Self::PAN_EXHAUSTED_FRACTION
    }

    /// Schedule the landscape auto-zoom if every gate passes: the feature is
    /// on, the fit mode is fit-screen, the image is landscape, and the reader
    /// has not zoomed yet. `nav` carries how the page was entered; `None`
    /// (a restore, not a navigation) never zooms.
    ///
    /// The target scale fills the usable viewport height, capped at twice
    /// fit. The zoom gravitates toward the anchor edge, flipped when the
    /// page was entered backward.
    pub fn plan_landscape_zoom(
        &mut self,
        landscape_zoom: bool,
        nav: Option<NavDirection>,
        now: Instant,
    ) -> Option<ZoomAnimation> {
        let nav = nav?;
        if !landscape_zoom || self.scale_type != ScaleType::FitScreen {
            return None;
        }
        if self.image_width <= self.image_height {
            return None;
        }
        if (self.scale - self.min_scale).abs() > SCALE_EPSILON {
            return None;
        }
        let usable_height =
            self.viewport.height - self.viewport.top_inset - self.viewport.bottom_inset;
        let target = safe_scale(usable_height / self.image_height)
            .min(self.min_scale * Self::DOUBLE_TAP_FACTOR);
        if target <= self.min_scale + SCALE_EPSILON {
            return None;
        }
        let forward = nav == NavDirection::Forward;
        let to_center_x = match self.resolved_anchor() {
            ZoomAnchor::Left => {
                if forward {
                    0.0
                } else {
                    self.image_width
                }
            }
            ZoomAnchor::Right => {
                if forward {
                    self.image_width
                } else {
                    0.0
                }
            }
            _ => self.center_x,
        };
        let animation = ZoomAnimation {
            scheduled_at: now,
            delay: Self::LANDSCAPE_ZOOM_DELAY,
            duration: Self::LANDSCAPE_ZOOM_DURATION,
            from_scale: self.scale,
            to_scale: target,
            from_center_x: self.center_x,
            to_center_x,
        };
        debug!(
            "zoom: landscape zoom scheduled {:.3} -> {:.3}, anchor x {:.0}",
            animation.from_scale, animation.to_scale, to_center_x
        );
        self.pending = Some(animation);
        Some(animation)
    }

    pub fn pending_zoom(&self) -> Option<&ZoomAnimation> {
        self.pending.as_ref()
    }

    /// Advance the scheduled zoom to `now`. Returns whether the view
    /// changed. The zoom reveals the top edge of the image as it grows.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(animation) = self.pending else {
            return false;
        };
        let since = now.saturating_duration_since(animation.scheduled_at);
        if since < animation.delay {
            return false;
        }
        let t = ((since - animation.delay).as_secs_f32()
            / animation.duration.as_secs_f32().max(f32::EPSILON))
        .min(1.0);
        let eased = ease_in_out(t);
        self.scale = animation.from_scale + (animation.to_scale - animation.from_scale) * eased;
        self.center_x = animation.from_center_x
            + (animation.to_center_x - animation.from_center_x) * eased;
        self.center_y = 0.0;
        self.clamp_center();
        if t >= 1.0 {
            self.pending = None;
        }
        true
    }

    /// Cancel a scheduled or running zoom without undoing what it has
    /// already applied. Every user gesture routes through here.
    pub fn interrupt(&mut self) -> bool {
        self.pending.take().is_some()
    }

    fn resolved_anchor(&self) -> ZoomAnchor {
        match self.anchor {
            ZoomAnchor::Automatic => {
                if self.direction.is_ltr() {
                    ZoomAnchor::Left
                } else {
                    ZoomAnchor::Right
                }
            }
            anchor => anchor,
        }
    }

    fn clamp_center(&mut self) {
        let half_w = self.viewport.width / (2.0 * self.scale);
        let half_h = self.viewport.height / (2.0 * self.scale);
        self.center_x = clamp_axis(self.center_x, half_w, self.image_width);
        self.center_y = clamp_axis(self.center_y, half_h, self.image_height);
    }
}

/// Fit scale for the image in the viewport under the given mode.
fn fit_scale(scale_type: ScaleType, image_w: f32, image_h: f32, viewport: &Viewport) -> f32 {
    let width_ratio = viewport.width / image_w;
    let height_ratio = viewport.height / image_h;
    let fit = match scale_type {
        ScaleType::FitScreen => width_ratio.min(height_ratio),
        ScaleType::FitWidth => width_ratio,
        ScaleType::FitHeight => height_ratio,
        ScaleType::Original => 1.0,
    };
    safe_scale(fit)
}

/// Guard against NaN/Inf/non-positive scales from degenerate geometry.
fn safe_scale(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

fn clamp_axis(value: f32, half_visible: f32, extent: f32) -> f32 {
    if 2.0 * half_visible >= extent {
        extent / 2.0
    } else {
        value.clamp(half_visible, extent - half_visible)
    }
}

fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

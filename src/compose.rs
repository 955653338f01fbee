//! Pixel composition: cutting wide pages in half and stitching page pairs
//! into spreads.
//!
//! Both operations report coarse progress through an optional callback so the
//! caller can keep one continuous progress bar across download, decode and
//! composition. Callbacks fire on the composing thread.

use std::fmt;
use std::time::Instant;

use image::{DynamicImage, Rgba, RgbaImage, imageops};
use log::{info, warn};

use crate::config::ReadingDirection;
use crate::error::ComposeError;

/// Composition progress callback, called with 0..=100 per operation.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u8);

/// Rows copied per progress tick while stitching.
const MERGE_BAND_ROWS: u32 = 256;

/// The two fragments of a split wide page, in reading order: `first` is what
/// the reader sees first, so for right-to-left chapters it is the right half.
pub struct SplitHalves {
    pub first: RgbaImage,
    pub second: RgbaImage,
}

impl fmt::Debug for SplitHalves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SplitHalves({}x{} | {}x{})",
            self.first.width(),
            self.first.height(),
            self.second.width(),
            self.second.height(),
        )
    }
}

/// Cut a wide page vertically down the middle.
///
/// The left half keeps `width / 2` columns and the right half the remainder,
/// so fragment widths always sum to the original and heights are untouched.
pub fn split_wide_page(
    image: DynamicImage,
    direction: ReadingDirection,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<SplitHalves, ComposeError> {
    let started = Instant::now();
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    if width < 2 || height == 0 {
        warn!("compose: cannot split degenerate {width}x{height} page");
        return Err(ComposeError::Degenerate { width, height });
    }
    emit(&mut progress, 0);
    let left_width = width / 2;
    let left = imageops::crop_imm(&rgba, 0, 0, left_width, height).to_image();
    emit(&mut progress, 50);
    let right = imageops::crop_imm(&rgba, left_width, 0, width - left_width, height).to_image();
    emit(&mut progress, 100);
    info!(
        "compose: split {}x{} into {}+{} columns in {:.1}ms",
        width,
        height,
        left_width,
        width - left_width,
        started.elapsed().as_secs_f64() * 1000.0,
    );
    let (first, second) = match direction {
        ReadingDirection::Ltr => (left, right),
        ReadingDirection::Rtl => (right, left),
    };
    Ok(SplitHalves { first, second })
}

/// Stitch two tall pages side by side into one spread.
///
/// The composite is as wide as both pages together and as tall as the taller
/// one; the shorter page is top-aligned and the gap below it is filled with
/// `background`. The first page lands on the left for left-to-right reading
/// and on the right otherwise. Pixels are copied in bands so progress moves
/// while large spreads stitch.
pub fn merge_pages(
    first: DynamicImage,
    second: DynamicImage,
    direction: ReadingDirection,
    background: Rgba<u8>,
    max_pixels: u64,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<RgbaImage, ComposeError> {
    let started = Instant::now();
    let first = first.into_rgba8();
    let second = second.into_rgba8();
    let (first_w, first_h) = first.dimensions();
    let (second_w, second_h) = second.dimensions();
    if first_w == 0 || first_h == 0 {
        return Err(ComposeError::Degenerate {
            width: first_w,
            height: first_h,
        });
    }
    if second_w == 0 || second_h == 0 {
        return Err(ComposeError::Degenerate {
            width: second_w,
            height: second_h,
        });
    }

    let width = u64::from(first_w) + u64::from(second_w);
    let height = first_h.max(second_h);
    let pixels = width * u64::from(height);
    if pixels > max_pixels || width > u64::from(u32::MAX) {
        warn!(
            "compose: refusing {width}x{height} composite ({pixels}px > {max_pixels}px budget)"
        );
        return Err(ComposeError::TooLarge {
            width,
            height: u64::from(height),
            max_pixels,
        });
    }
    let width = width as u32;

    emit(&mut progress, 0);
    let mut canvas = RgbaImage::from_pixel(width, height, background);
    let (left, right) = match direction {
        ReadingDirection::Ltr => (&first, &second),
        ReadingDirection::Rtl => (&second, &first),
    };
    let total_rows = u64::from(left.height()) + u64::from(right.height());
    let mut done_rows = 0u64;
    blit_banded(&mut canvas, left, 0, &mut done_rows, total_rows, &mut progress);
    blit_banded(
        &mut canvas,
        right,
        left.width(),
        &mut done_rows,
        total_rows,
        &mut progress,
    );
    emit(&mut progress, 100);
    info!(
        "compose: merged {first_w}x{first_h} + {second_w}x{second_h} -> {width}x{height} in {:.1}ms",
        started.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(canvas)
}

/// Copy `src` into `canvas` at column `dst_x`, top-aligned, one band of rows
/// at a time, advancing the shared progress fraction.
fn blit_banded(
    canvas: &mut RgbaImage,
    src: &RgbaImage,
    dst_x: u32,
    done_rows: &mut u64,
    total_rows: u64,
    progress: &mut Option<ProgressFn<'_>>,
) {
    let (src_w, src_h) = src.dimensions();
    let mut y = 0u32;
    while y < src_h {
        let band_rows = MERGE_BAND_ROWS.min(src_h - y);
        let band = imageops::crop_imm(src, 0, y, src_w, band_rows);
        imageops::replace(canvas, &*band, i64::from(dst_x), i64::from(y));
        y += band_rows;
        *done_rows += u64::from(band_rows);
        // Keep the in-flight range at 1..=99; the caller's 0 and 100 frame it.
        let pct = (*done_rows * 98 / total_rows.max(1)) as u8 + 1;
        emit(progress, pct);
    }
}

fn emit(progress: &mut Option<ProgressFn<'_>>, pct: u8) {
    if let Some(cb) = progress.as_mut() {
        cb(pct);
    }
}

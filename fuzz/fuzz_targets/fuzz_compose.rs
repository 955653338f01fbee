#![no_main]

use arbitrary::Arbitrary;
use image::{DynamicImage, Rgba, RgbaImage};
use libfuzzer_sys::fuzz_target;
use mihiraki::compose::{merge_pages, split_wide_page};
use mihiraki::config::ReadingDirection;

#[derive(Arbitrary, Debug)]
struct Input {
    width: u16,
    height: u16,
    partner_width: u16,
    partner_height: u16,
    rtl: bool,
}

// Dimensions are capped so the fuzzer explores geometry, not allocator
// limits; the pixel budget path is covered separately below the cap.
const MAX_SIDE: u32 = 512;

fuzz_target!(|input: Input| {
    let direction = if input.rtl {
        ReadingDirection::Rtl
    } else {
        ReadingDirection::Ltr
    };
    let width = u32::from(input.width) % MAX_SIDE;
    let height = u32::from(input.height) % MAX_SIDE;

    match split_wide_page(
        DynamicImage::ImageRgba8(RgbaImage::new(width, height)),
        direction,
        None,
    ) {
        Ok(halves) => {
            assert_eq!(halves.first.width() + halves.second.width(), width);
            assert_eq!(halves.first.height(), height);
            assert_eq!(halves.second.height(), height);
        }
        Err(_) => assert!(width < 2 || height == 0),
    }

    let partner_width = u32::from(input.partner_width) % MAX_SIDE;
    let partner_height = u32::from(input.partner_height) % MAX_SIDE;
    if let Ok(merged) = merge_pages(
        DynamicImage::ImageRgba8(RgbaImage::new(width, height)),
        DynamicImage::ImageRgba8(RgbaImage::new(partner_width, partner_height)),
        direction,
        Rgba([255, 255, 255, 255]),
        u64::from(MAX_SIDE) * u64::from(MAX_SIDE) * 2,
        None,
    ) {
        assert_eq!(merged.width(), width + partner_width);
        assert_eq!(merged.height(), height.max(partner_height));
    }
});

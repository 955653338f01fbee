//! Container sniffing on raw page bytes.
//!
//! Spread handling needs two facts before any full raster decode: does the
//! image animate, and what are its bounds. Animation is read straight out of
//! the container structure (GIF blocks, WebP chunks, PNG chunks); bounds come
//! from the image crate's header-only decode. Both walkers are defensive:
//! truncated or hostile input yields a boring answer, never a panic.

use std::io::Cursor;

use image::ImageReader;
use log::trace;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// True when the bytes are an animated image: a multi-frame or looping GIF,
/// an animated WebP, or an APNG.
pub fn is_animated(bytes: &[u8]) -> bool {
    let animated = if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        gif_is_animated(bytes)
    } else if is_webp(bytes) {
        webp_is_animated(bytes)
    } else if bytes.starts_with(&PNG_MAGIC) {
        png_is_animated(bytes)
    } else {
        false
    };
    trace!("sniff: {} bytes, animated={animated}", bytes.len());
    animated
}

/// Header-only dimension probe, no full raster decode.
pub fn probe_bounds(bytes: &[u8]) -> Result<(u32, u32), image::ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()
}

/// Convenience for spread decisions: a page is "wide" when it is strictly
/// wider than tall.
pub fn is_wide(width: u32, height: u32) -> bool {
    height < width
}

fn is_webp(b: &[u8]) -> bool {
    b.len() >= 12 && &b[0..4] == b"RIFF" && &b[8..12] == b"WEBP"
}

/// Walk GIF blocks counting image descriptors. Two descriptors or a NETSCAPE
/// looping extension mean animation; a corrupt or truncated walk means no.
fn gif_is_animated(b: &[u8]) -> bool {
    if b.len() < 13 {
        return false;
    }
    // Skip header + logical screen descriptor (+ global color table if any).
    let packed = b[10];
    let mut pos = 13usize;
    if packed & 0x80 != 0 {
        pos += 3 * (2usize << (packed & 0x07));
    }
    let mut descriptors = 0u32;
    while pos < b.len() {
        match b[pos] {
            0x3B => break, // trailer
            0x21 => {
                // Extension: label byte, then sub-blocks.
                let Some(&label) = b.get(pos + 1) else { break };
                if label == 0xFF
                    && b.len() >= pos + 14
                    && &b[pos + 3..pos + 14] == b"NETSCAPE2.0"
                {
                    return true;
                }
                let Some(next) = skip_sub_blocks(b, pos + 2) else {
                    break;
                };
                pos = next;
            }
            0x2C => {
                descriptors += 1;
                if descriptors >= 2 {
                    return true;
                }
                if pos + 10 > b.len() {
                    break;
                }
                let packed = b[pos + 9];
                pos += 10;
                if packed & 0x80 != 0 {
                    pos += 3 * (2usize << (packed & 0x07));
                }
                pos += 1; // LZW minimum code size
                let Some(next) = skip_sub_blocks(b, pos) else {
                    break;
                };
                pos = next;
            }
            _ => break,
        }
    }
    false
}

fn skip_sub_blocks(b: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let len = *b.get(pos)? as usize;
        pos = pos.saturating_add(1 + len);
        if len == 0 {
            return Some(pos);
        }
    }
}

/// Walk RIFF chunks. The VP8X feature byte is authoritative; a bare ANIM or
/// ANMF chunk also counts.
fn webp_is_animated(b: &[u8]) -> bool {
    let mut pos = 12usize;
    while pos + 8 <= b.len() {
        let size = u32::from_le_bytes([b[pos + 4], b[pos + 5], b[pos + 6], b[pos + 7]]) as usize;
        match &b[pos..pos + 4] {
            b"VP8X" => return b.get(pos + 8).is_some_and(|flags| flags & 0x02 != 0),
            b"ANIM" | b"ANMF" => return true,
            _ => {}
        }
        // Chunks are 2-byte aligned.
        pos = pos
            .saturating_add(8)
            .saturating_add(size)
            .saturating_add(size & 1);
    }
    false
}

/// APNG: an acTL chunk before the first IDAT.
fn png_is_animated(b: &[u8]) -> bool {
    let mut pos = 8usize;
    while pos + 8 <= b.len() {
        let len = u32::from_be_bytes([b[pos], b[pos + 1], b[pos + 2], b[pos + 3]]) as usize;
        match &b[pos + 4..pos + 8] {
            b"acTL" => return true,
            b"IDAT" | b"IEND" => return false,
            _ => {}
        }
        pos = pos.saturating_add(12).saturating_add(len);
    }
    false
}

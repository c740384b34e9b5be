//! Pixel helpers: decode snapshots, draw detection boxes, encode JPEG.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};

use crate::{domain::BoundingBox, Result};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: u32 = 2;
const JPEG_QUALITY: u8 = 85;

pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

pub fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), JPEG_QUALITY);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

/// Copy of `img` with every box outlined.
pub fn annotate(img: &RgbImage, boxes: &[BoundingBox]) -> RgbImage {
    let mut out = img.clone();
    for b in boxes {
        draw_rect(&mut out, *b, BOX_COLOR, BOX_THICKNESS);
    }
    out
}

/// Outline drawn inward from the box edges; boxes are clipped to the frame.
pub fn draw_rect(img: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let Some(b) = bbox.clamped(w, h) else {
        return;
    };
    let (x0, y0, x1, y1) = (b.x1 as u32, b.y1 as u32, b.x2 as u32, b.y2 as u32);

    for t in 0..thickness {
        if x0 + t > x1 || y0 + t > y1 {
            break;
        }
        let (top, bottom) = (y0 + t, y1 - t);
        let (left, right) = (x0 + t, x1 - t);
        for x in left..=right {
            img.put_pixel(x, top, color);
            img.put_pixel(x, bottom, color);
        }
        for y in top..=bottom {
            img.put_pixel(left, y, color);
            img.put_pixel(right, y, color);
        }
    }
}

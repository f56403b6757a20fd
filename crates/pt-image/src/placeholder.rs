//! Generated stand-in for `default.png`.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::{NormalizeError, Result};

const BACKGROUND: Rgb<u8> = Rgb([0xd9, 0xdc, 0xe1]);
const FIGURE: Rgb<u8> = Rgb([0x9a, 0xa1, 0xac]);

/// Render a neutral `size x size` avatar silhouette as PNG.
///
/// Used to seed the media root when no `default.png` exists yet.
pub fn placeholder_png(size: u32) -> Result<Vec<u8>> {
    if size == 0 {
        return Err(NormalizeError::InvalidTarget(size));
    }

    let s = f64::from(size);
    let head = (s * 0.5, s * 0.38, s * 0.18);
    let body = (s * 0.5, s * 0.95, s * 0.34);

    let img = RgbImage::from_fn(size, size, |x, y| {
        let (px, py) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
        let inside = |(cx, cy, r): (f64, f64, f64)| (px - cx).powi(2) + (py - cy).powi(2) <= r * r;
        if inside(head) || inside(body) {
            FIGURE
        } else {
            BACKGROUND
        }
    });

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|source| NormalizeError::Encode {
            format: ImageFormat::Png,
            source,
        })?;
    Ok(buf.into_inner())
}

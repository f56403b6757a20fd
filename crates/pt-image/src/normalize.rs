//! Center-crop-then-scale normalization.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::{NormalizeError, Result};
use crate::DEFAULT_SIZE;

/// An encoded picture together with its decoded dimensions.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoding of `bytes`.
    pub format: ImageFormat,
}

/// Square region to keep when cropping, in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

/// Produces `size x size` pictures from the centered square of the source,
/// scaled to `size` (smaller pictures are upscaled).
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    size: u32,
    filter: FilterType,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE)
    }
}

impl ImageNormalizer {
    /// Create a normalizer for the given side length, resampling with Lanczos3.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            filter: FilterType::Lanczos3,
        }
    }

    /// Use a different resampling filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Decode `data`, normalize it, and re-encode it in its original format.
    ///
    /// Fails with [`NormalizeError::Decode`] if `data` is not a supported
    /// image and with [`NormalizeError::Dimension`] if a side is zero.
    pub fn normalize(&self, data: &[u8]) -> Result<StoredImage> {
        let format = image::guess_format(data).map_err(NormalizeError::Decode)?;
        let img =
            image::load_from_memory_with_format(data, format).map_err(NormalizeError::Decode)?;

        tracing::debug!(
            format = ?format,
            width = img.width(),
            height = img.height(),
            "Normalizing picture"
        );

        let normalized = self.normalize_image(&img)?;
        let bytes = encode(&normalized, format)?;

        Ok(StoredImage {
            bytes,
            width: normalized.width(),
            height: normalized.height(),
            format,
        })
    }

    /// Pixel-level transform: keep the centered square of the source, then
    /// resample it to `size x size`.
    ///
    /// Cropping before resampling gives the same framing as scaling the
    /// shorter side to `size` and cropping afterwards, while the working
    /// image never exceeds `size x size` no matter how elongated the source.
    /// A picture that is already `size x size` is returned unchanged.
    pub fn normalize_image(&self, img: &DynamicImage) -> Result<DynamicImage> {
        if self.size == 0 {
            return Err(NormalizeError::InvalidTarget(self.size));
        }

        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(NormalizeError::Dimension { width, height });
        }

        let crop = center_crop(width, height);
        let square = if crop.side == width && crop.side == height {
            img.clone()
        } else {
            img.crop_imm(crop.x, crop.y, crop.side, crop.side)
        };

        if crop.side == self.size {
            return Ok(square);
        }
        Ok(square.resize_exact(self.size, self.size, self.filter))
    }
}

/// Largest centered square inside `width x height`.
///
/// The offset along the longer axis is `(long - short) / 2` rounded down,
/// so an odd surplus leaves the extra pixel on the right or bottom edge.
pub fn center_crop(width: u32, height: u32) -> CropBox {
    let side = width.min(height);
    CropBox {
        x: (width - side) / 2,
        y: (height - side) / 2,
        side,
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    // JPEG has no alpha channel and only 8-bit samples.
    let converted;
    let img = if format == ImageFormat::Jpeg {
        converted = DynamicImage::ImageRgb8(img.to_rgb8());
        &converted
    } else {
        img
    };

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .map_err(|source| NormalizeError::Encode { format, source })?;
    Ok(buf.into_inner())
}

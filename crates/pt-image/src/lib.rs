//! pt-image: square thumbnail normalization for profile pictures.
//!
//! [`ImageNormalizer`] turns an uploaded picture of any aspect ratio into an
//! exact `size x size` square (300 by default):
//!
//! 1. Center-crop the longer side down to the length of the shorter one.
//! 2. Scale the square to `size` (smaller pictures are upscaled).
//! 3. Re-encode in the format the picture was uploaded in.
//!
//! The result frames the picture exactly as scaling the shorter side to
//! `size` and cropping afterwards would, without ever materializing the
//! scaled long side.
//!
//! # Example
//!
//! ```no_run
//! use pt_image::ImageNormalizer;
//!
//! let bytes = std::fs::read("upload.png").unwrap();
//! let stored = ImageNormalizer::default().normalize(&bytes).unwrap();
//! assert_eq!((stored.width, stored.height), (300, 300));
//! ```

mod error;
mod normalize;
mod placeholder;

pub use error::{NormalizeError, Result};
pub use normalize::{center_crop, CropBox, ImageNormalizer, StoredImage};
pub use placeholder::placeholder_png;

/// Default side length of normalized pictures.
pub const DEFAULT_SIZE: u32 = 300;

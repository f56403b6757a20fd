//! Error types for picture normalization.

use thiserror::Error;

/// Result type for normalization operations.
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Errors that can occur while normalizing a picture.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The bytes are not an image in any supported format, or are corrupt.
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The decoded image has a zero-length side.
    #[error("Invalid image dimensions: {width}x{height}")]
    Dimension { width: u32, height: u32 },

    /// The normalizer was configured with a zero target size.
    #[error("Invalid target size: {0}")]
    InvalidTarget(u32),

    /// The normalized image could not be re-encoded.
    #[error("Failed to encode image as {format:?}: {source}")]
    Encode {
        format: image::ImageFormat,
        #[source]
        source: image::ImageError,
    },
}

impl From<NormalizeError> for pt_core::Error {
    fn from(e: NormalizeError) -> Self {
        match e {
            NormalizeError::Decode(_) | NormalizeError::Dimension { .. } => {
                pt_core::Error::Image(e.to_string())
            }
            NormalizeError::InvalidTarget(_) | NormalizeError::Encode { .. } => {
                pt_core::Error::Internal(e.to_string())
            }
        }
    }
}

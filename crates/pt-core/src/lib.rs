//! pt-core: shared types, IDs, errors, configuration, and picture references.
//!
//! This crate is the foundational dependency for all other pt-* crates,
//! providing type-safe identifiers, a unified error type, application
//! configuration, and the storage-path conventions for profile pictures.

pub mod config;
pub mod error;
pub mod ids;
pub mod picture;
pub mod validate;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use picture::{PictureRef, DEFAULT_PICTURE};

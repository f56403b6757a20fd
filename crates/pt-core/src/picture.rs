//! Storage references for profile pictures.
//!
//! A [`PictureRef`] is the media-root-relative path stored in the profile
//! record. Uploaded pictures live under `users/{username}/{uuid}{ext}`; the
//! sentinel [`DEFAULT_PICTURE`] means no custom picture was uploaded and is
//! never deleted.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Sentinel reference for "no custom picture uploaded".
pub const DEFAULT_PICTURE: &str = "default.png";

/// Media-root-relative path of a stored profile picture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PictureRef(String);

impl PictureRef {
    /// Wrap an existing stored path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Generate a fresh, collision-resistant path for an upload stored in
    /// a format whose file extension is `extension` (without the dot).
    pub fn for_upload(username: &str, extension: &str) -> Self {
        Self(format!(
            "users/{}/{}{}",
            username,
            Uuid::new_v4(),
            dotted_extension(extension)
        ))
    }

    /// Whether this is the [`DEFAULT_PICTURE`] sentinel.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_PICTURE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public URL of the picture under the given media URL prefix.
    pub fn url(&self, media_prefix: &str) -> String {
        format!("{}/{}", media_prefix.trim_end_matches('/'), self.0)
    }
}

impl Default for PictureRef {
    fn default() -> Self {
        Self(DEFAULT_PICTURE.to_string())
    }
}

impl fmt::Display for PictureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PictureRef {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// `.{extension}`, or an empty string unless `extension` is plain ASCII
/// alphanumerics, so it can never smuggle path separators into the path.
fn dotted_extension(extension: &str) -> String {
    if !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        format!(".{extension}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sentinel() {
        let pic = PictureRef::default();
        assert_eq!(pic.as_str(), "default.png");
        assert!(pic.is_default());
    }

    #[test]
    fn upload_path_layout() {
        let pic = PictureRef::for_upload("alice", "jpg");
        let path = pic.as_str();
        assert!(path.starts_with("users/alice/"));
        assert!(path.ends_with(".jpg"));

        let stem = path
            .trim_start_matches("users/alice/")
            .trim_end_matches(".jpg");
        assert!(Uuid::parse_str(stem).is_ok(), "stem {stem} is not a uuid");
        assert!(!pic.is_default());
    }

    #[test]
    fn upload_paths_are_unique() {
        let a = PictureRef::for_upload("bob", "png");
        let b = PictureRef::for_upload("bob", "png");
        assert_ne!(a, b);
    }

    #[test]
    fn suspicious_extension_dropped() {
        assert_eq!(dotted_extension("p/ng"), "");
        assert_eq!(dotted_extension(""), "");
        assert_eq!(dotted_extension("webp"), ".webp");
        assert_eq!(PictureRef::for_upload("carol", "../x").as_str().matches('.').count(), 0);
    }

    #[test]
    fn url_joins_prefix() {
        let pic = PictureRef::new("users/dave/x.png");
        assert_eq!(pic.url("/media/"), "/media/users/dave/x.png");
        assert_eq!(PictureRef::default().url("/media"), "/media/default.png");
    }
}

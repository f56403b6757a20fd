//! Picture storage backends.
//!
//! Paths handed to a [`MediaStorage`] are relative to the media root, use
//! `/` separators, and may not escape the root.

use std::fmt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use pt_core::{Error, Result};

/// Byte store for profile pictures.
pub trait MediaStorage: Send + Sync + fmt::Debug {
    /// Store `bytes` at `path`, fully replacing any previous content.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read the bytes stored at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove the object at `path`. Removing a missing object succeeds.
    fn delete(&self, path: &str) -> Result<()>;

    /// Whether an object exists at `path`.
    fn exists(&self, path: &str) -> bool;
}

/// Filesystem-backed storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a storage path onto the filesystem, rejecting anything that
    /// could leave the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        if path.is_empty() {
            return Err(Error::storage(path, "empty path"));
        }

        let mut resolved = self.root.clone();
        for component in rel.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::storage(path, "path escapes the media root"));
                }
            }
        }

        if resolved == self.root {
            return Err(Error::storage(path, "path names the media root"));
        }
        Ok(resolved)
    }
}

impl MediaStorage for LocalStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        let parent = target
            .parent()
            .ok_or_else(|| Error::storage(path, "no parent directory"))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::storage(path, format!("create directory: {e}")))?;

        // Write beside the target and rename so readers never see a partial file.
        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let result = std::fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(bytes)?;
                f.sync_all()
            })
            .and_then(|()| std::fs::rename(&tmp, &target));

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::storage(path, format!("write: {e}")));
        }

        tracing::debug!(path, size = bytes.len(), "Stored picture");
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        std::fs::read(&target).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found("picture", path),
            _ => Error::storage(path, format!("read: {e}")),
        })
    }

    fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => {
                tracing::debug!(path, "Deleted picture");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(path, format!("delete: {e}"))),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }
}

//! Profile workflows: account creation, picture replacement, location
//! edits, and account deletion.
//!
//! These functions are synchronous (SQLite, filesystem, and image work all
//! block), so async handlers run them through [`run_blocking`].

use pt_core::validate::{normalize_location, validate_username};
use pt_core::{Error, PictureRef, Result, UserId};
use pt_db::models::{Profile, User};
use pt_db::pool::{get_conn, PooledConnection};
use pt_db::queries::{profiles, users};

use crate::context::AppContext;
use crate::storage::MediaStorage;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Run a blocking closure on tokio's blocking pool.
pub async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {e}")))?
}

/// Create a user and its profile in one transaction.
///
/// The profile starts with the default picture and no location.
pub fn create_user_with_profile(
    ctx: &AppContext,
    username: &str,
    password: &str,
    role: &str,
) -> Result<(User, Profile)> {
    validate_username(username)?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(Error::Validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if role != "user" && role != "admin" {
        return Err(Error::Validation(format!("unknown role '{role}'")));
    }

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| Error::Internal(format!("bcrypt error: {e}")))?;

    let conn = get_conn(&ctx.db)?;
    let (user, profile) = users::create_user_with_profile(&conn, username, &hash, role)?;

    tracing::info!(user_id = %user.id, username, "Created user with profile");
    Ok((user, profile))
}

/// Load a user together with their profile.
pub fn get_profile(ctx: &AppContext, user_id: UserId) -> Result<(User, Profile)> {
    let conn = get_conn(&ctx.db)?;
    let user = users::get_user_by_id(&conn, user_id)?
        .ok_or_else(|| Error::not_found("user", user_id))?;
    let profile = profiles::get_profile_by_user(&conn, user_id)?
        .ok_or_else(|| Error::not_found("profile", user_id))?;
    Ok((user, profile))
}

/// Replace the user's picture with a normalized copy of `data`.
///
/// The upload is normalized before anything is written, so an undecodable
/// image leaves storage and the profile untouched. The previous picture is
/// removed only after the new one is stored and recorded.
pub fn save_picture(
    ctx: &AppContext,
    user_id: UserId,
    original_filename: &str,
    data: &[u8],
) -> Result<Profile> {
    let (user, _) = get_profile(ctx, user_id)?;

    let stored = ctx.normalizer.normalize(data)?;
    let extension = stored.format.extensions_str().first().copied().unwrap_or_default();
    let picture = PictureRef::for_upload(&user.username, extension);

    ctx.storage.write(picture.as_str(), &stored.bytes)?;

    let conn = get_conn(&ctx.db)?;
    let previous = match profiles::update_picture(&conn, user_id, &picture) {
        Ok(Some(previous)) => previous,
        Ok(None) => {
            discard(ctx.storage.as_ref(), &picture);
            return Err(Error::not_found("profile", user_id));
        }
        Err(e) => {
            discard(ctx.storage.as_ref(), &picture);
            return Err(e);
        }
    };

    tracing::info!(
        user_id = %user_id,
        picture = %picture,
        original = original_filename,
        width = stored.width,
        height = stored.height,
        "Saved profile picture"
    );

    if previous != picture {
        discard(ctx.storage.as_ref(), &previous);
    }

    reload(&conn, user_id)
}

/// Point the user's profile back at the default picture and remove the
/// custom file, if any.
pub fn reset_picture(ctx: &AppContext, user_id: UserId) -> Result<Profile> {
    let conn = get_conn(&ctx.db)?;
    let previous = profiles::update_picture(&conn, user_id, &PictureRef::default())?
        .ok_or_else(|| Error::not_found("profile", user_id))?;

    discard(ctx.storage.as_ref(), &previous);

    reload(&conn, user_id)
}

/// Set or clear the user's location. Blank input clears it.
pub fn update_location(
    ctx: &AppContext,
    user_id: UserId,
    location: Option<&str>,
) -> Result<Profile> {
    let location = normalize_location(location)?;

    let conn = get_conn(&ctx.db)?;
    if !profiles::update_location(&conn, user_id, location.as_deref())? {
        return Err(Error::not_found("profile", user_id));
    }

    reload(&conn, user_id)
}

/// Delete the user, cascading to their profile and sessions, then remove
/// their picture file.
pub fn delete_user(ctx: &AppContext, user_id: UserId) -> Result<()> {
    let conn = get_conn(&ctx.db)?;
    let picture = profiles::get_profile_by_user(&conn, user_id)?.map(|p| p.picture);

    if !users::delete_user(&conn, user_id)? {
        return Err(Error::not_found("user", user_id));
    }
    tracing::info!(user_id = %user_id, "Deleted user");

    if let Some(picture) = picture {
        discard(ctx.storage.as_ref(), &picture);
    }
    Ok(())
}

fn reload(conn: &PooledConnection, user_id: UserId) -> Result<Profile> {
    profiles::get_profile_by_user(conn, user_id)?
        .ok_or_else(|| Error::not_found("profile", user_id))
}

/// Best-effort removal of a stored picture. The default picture is shared
/// and never removed.
fn discard(storage: &dyn MediaStorage, picture: &PictureRef) {
    if picture.is_default() {
        return;
    }
    if let Err(e) = storage.delete(picture.as_str()) {
        tracing::warn!(picture = %picture, "Failed to delete stored picture: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use image::{DynamicImage, ImageFormat, RgbImage};
    use pt_core::config::Config;
    use pt_db::pool::init_memory_pool;

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([30, 90, 160]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn local_ctx() -> (tempfile::TempDir, AppContext) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.media.root = dir.path().to_path_buf();
        let ctx = AppContext::new(init_memory_pool().unwrap(), config);
        std::fs::write(dir.path().join("default.png"), b"placeholder").unwrap();
        (dir, ctx)
    }

    /// Storage that records calls and can be told to fail deletes.
    #[derive(Debug, Default)]
    struct RecordingStorage {
        inner: Mutex<std::collections::HashMap<String, Vec<u8>>>,
        deleted: Mutex<Vec<String>>,
        fail_deletes: bool,
    }

    impl MediaStorage for RecordingStorage {
        fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
            self.inner
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        fn read(&self, path: &str) -> Result<Vec<u8>> {
            self.inner
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| Error::not_found("picture", path))
        }

        fn delete(&self, path: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(path.to_string());
            if self.fail_deletes {
                return Err(Error::storage(path, "simulated failure"));
            }
            self.inner.lock().unwrap().remove(path);
            Ok(())
        }

        fn exists(&self, path: &str) -> bool {
            self.inner.lock().unwrap().contains_key(path)
        }
    }

    fn recording_ctx(fail_deletes: bool) -> (Arc<RecordingStorage>, AppContext) {
        let storage = Arc::new(RecordingStorage {
            fail_deletes,
            ..Default::default()
        });
        let ctx = AppContext::with_storage(
            init_memory_pool().unwrap(),
            Config::default(),
            storage.clone(),
        );
        (storage, ctx)
    }

    #[test]
    fn registration_creates_profile() {
        let (_dir, ctx) = local_ctx();
        let (user, profile) = create_user_with_profile(&ctx, "alice", "password1", "user").unwrap();
        assert_eq!(profile.user_id, user.id);
        assert!(profile.picture.is_default());
        assert!(user.password_hash.starts_with("$2"));
    }

    #[test]
    fn registration_validates_input() {
        let (_dir, ctx) = local_ctx();
        assert!(matches!(
            create_user_with_profile(&ctx, "bad name", "password1", "user"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            create_user_with_profile(&ctx, "bob", "short", "user"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            create_user_with_profile(&ctx, "bob", "password1", "root"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn save_picture_normalizes_and_stores() {
        let (dir, ctx) = local_ctx();
        let (user, _) = create_user_with_profile(&ctx, "carol", "password1", "user").unwrap();

        let profile = save_picture(&ctx, user.id, "holiday.png", &png(640, 480)).unwrap();
        let path = profile.picture.as_str();
        assert!(path.starts_with("users/carol/"));
        assert!(path.ends_with(".png"));

        let stored = image::open(dir.path().join(path)).unwrap();
        assert_eq!((stored.width(), stored.height()), (300, 300));
    }

    #[test]
    fn stored_extension_follows_encoded_format() {
        let (dir, ctx) = local_ctx();
        let (user, _) = create_user_with_profile(&ctx, "cleo", "password1", "user").unwrap();

        for name in ["me.jpg", "page.html", "no-extension"] {
            let profile = save_picture(&ctx, user.id, name, &png(320, 200)).unwrap();
            let path = profile.picture.as_str();
            assert!(path.ends_with(".png"), "{name} stored as {path}");
            let bytes = std::fs::read(dir.path().join(path)).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        }
    }

    #[test]
    fn replacing_picture_deletes_only_the_previous_file() {
        let (dir, ctx) = local_ctx();
        let (user, _) = create_user_with_profile(&ctx, "dana", "password1", "user").unwrap();

        let first = save_picture(&ctx, user.id, "a.png", &png(400, 600)).unwrap().picture;
        let second = save_picture(&ctx, user.id, "b.png", &png(600, 400)).unwrap().picture;

        assert_ne!(first, second);
        assert!(!dir.path().join(first.as_str()).exists());
        assert!(dir.path().join(second.as_str()).exists());
        assert!(dir.path().join("default.png").exists());
    }

    #[test]
    fn first_upload_keeps_default() {
        let (dir, ctx) = local_ctx();
        let (user, _) = create_user_with_profile(&ctx, "eve", "password1", "user").unwrap();
        save_picture(&ctx, user.id, "x.png", &png(10, 10)).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("default.png")).unwrap(),
            b"placeholder"
        );
    }

    #[test]
    fn undecodable_upload_writes_nothing() {
        let (storage, ctx) = recording_ctx(false);
        let (user, _) = create_user_with_profile(&ctx, "fay", "password1", "user").unwrap();

        let err = save_picture(&ctx, user.id, "x.png", b"not an image").unwrap_err();
        assert_eq!(err.http_status(), 422);
        assert!(storage.inner.lock().unwrap().is_empty());

        let (_, profile) = get_profile(&ctx, user.id).unwrap();
        assert!(profile.picture.is_default());
    }

    #[test]
    fn failed_delete_does_not_abort_save() {
        let (storage, ctx) = recording_ctx(true);
        let (user, _) = create_user_with_profile(&ctx, "gus", "password1", "user").unwrap();

        let first = save_picture(&ctx, user.id, "a.png", &png(50, 50)).unwrap().picture;
        let second = save_picture(&ctx, user.id, "b.png", &png(50, 50)).unwrap().picture;

        let (_, profile) = get_profile(&ctx, user.id).unwrap();
        assert_eq!(profile.picture, second);
        assert_eq!(*storage.deleted.lock().unwrap(), vec![first.as_str().to_string()]);
    }

    #[test]
    fn reset_removes_custom_file() {
        let (dir, ctx) = local_ctx();
        let (user, _) = create_user_with_profile(&ctx, "hal", "password1", "user").unwrap();
        let custom = save_picture(&ctx, user.id, "a.jpg", &png(80, 80)).unwrap().picture;

        let profile = reset_picture(&ctx, user.id).unwrap();
        assert!(profile.picture.is_default());
        assert!(!dir.path().join(custom.as_str()).exists());
        assert!(dir.path().join("default.png").exists());

        // Resetting again is harmless.
        assert!(reset_picture(&ctx, user.id).unwrap().picture.is_default());
    }

    #[test]
    fn location_rules() {
        let (_dir, ctx) = local_ctx();
        let (user, _) = create_user_with_profile(&ctx, "ida", "password1", "user").unwrap();

        let p = update_location(&ctx, user.id, Some("  Porto  ")).unwrap();
        assert_eq!(p.location.as_deref(), Some("Porto"));

        let p = update_location(&ctx, user.id, Some("   ")).unwrap();
        assert!(p.location.is_none());

        let long = "x".repeat(81);
        assert!(matches!(
            update_location(&ctx, user.id, Some(&long)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn delete_user_removes_picture_and_profile() {
        let (dir, ctx) = local_ctx();
        let (user, _) = create_user_with_profile(&ctx, "jan", "password1", "user").unwrap();
        let custom = save_picture(&ctx, user.id, "a.png", &png(30, 20)).unwrap().picture;

        delete_user(&ctx, user.id).unwrap();
        assert!(!dir.path().join(custom.as_str()).exists());
        assert!(dir.path().join("default.png").exists());
        assert!(matches!(get_profile(&ctx, user.id), Err(Error::NotFound { .. })));
        assert!(matches!(delete_user(&ctx, user.id), Err(Error::NotFound { .. })));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (_dir, ctx) = local_ctx();
        let err = save_picture(&ctx, UserId::new(), "a.png", &png(5, 5)).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}

//! Profile operations.
//!
//! Every user has exactly one profile row, enforced by the `UNIQUE`
//! constraint on `profiles.user_id`.

use chrono::Utc;
use pt_core::{Error, PictureRef, ProfileId, Result, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::Profile;

/// Insert a profile for `user_id`.
///
/// Fails with [`Error::Conflict`] if the user already has one.
pub fn create_profile(
    conn: &Connection,
    user_id: UserId,
    picture: &PictureRef,
    location: Option<&str>,
) -> Result<Profile> {
    let id = ProfileId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO profiles (id, user_id, picture, location, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        rusqlite::params![id.to_string(), user_id.to_string(), picture.as_str(), location, now],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("User {user_id} already has a profile"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(Profile {
        id,
        user_id,
        picture: picture.clone(),
        location: location.map(str::to_string),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get the profile belonging to `user_id`.
pub fn get_profile_by_user(conn: &Connection, user_id: UserId) -> Result<Option<Profile>> {
    let q = format!("SELECT {} FROM profiles WHERE user_id = ?1", Profile::COLUMNS);
    conn.query_row(&q, [user_id.to_string()], Profile::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// List all profiles, newest first.
pub fn list_profiles(conn: &Connection) -> Result<Vec<Profile>> {
    let q = format!(
        "SELECT {} FROM profiles ORDER BY created_at DESC, rowid DESC",
        Profile::COLUMNS
    );
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Profile::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Point the profile of `user_id` at a new picture.
///
/// Returns the picture reference that was replaced, or `None` if the user
/// has no profile. The old file is not touched here.
pub fn update_picture(
    conn: &Connection,
    user_id: UserId,
    picture: &PictureRef,
) -> Result<Option<PictureRef>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let previous: Option<String> = tx
        .query_row(
            "SELECT picture FROM profiles WHERE user_id = ?1",
            [user_id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;

    let Some(previous) = previous else {
        return Ok(None);
    };

    tx.execute(
        "UPDATE profiles SET picture = ?1, updated_at = ?2 WHERE user_id = ?3",
        rusqlite::params![picture.as_str(), Utc::now().to_rfc3339(), user_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(Some(PictureRef::from(previous)))
}

/// Set or clear the location of `user_id`'s profile.
///
/// The caller is expected to have normalized the value already. Returns
/// false if the user has no profile.
pub fn update_location(
    conn: &Connection,
    user_id: UserId,
    location: Option<&str>,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE profiles SET location = ?1, updated_at = ?2 WHERE user_id = ?3",
            rusqlite::params![location, Utc::now().to_rfc3339(), user_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

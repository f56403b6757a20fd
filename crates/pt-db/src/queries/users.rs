//! User CRUD operations.

use chrono::Utc;
use pt_core::{Error, PictureRef, Result, UserId};
use rusqlite::Connection;

use crate::models::{Profile, User};
use crate::queries::profiles;

fn map_insert_err(username: &str, e: rusqlite::Error) -> Error {
    if e.to_string().contains("UNIQUE constraint failed") {
        Error::Conflict(format!("Username '{username}' already exists"))
    } else {
        Error::database(e.to_string())
    }
}

/// Create a new user and return it.
///
/// This inserts only the `users` row; use [`create_user_with_profile`] for
/// the account workflow.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: &str,
) -> Result<User> {
    let id = UserId::new();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, username, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), username, password_hash, role, created_at],
    )
    .map_err(|e| map_insert_err(username, e))?;

    Ok(User {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role: role.to_string(),
        created_at,
    })
}

/// Create a user together with its profile in a single transaction.
///
/// Either both rows exist afterwards or neither does. The profile starts
/// with the default picture and no location.
pub fn create_user_with_profile(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: &str,
) -> Result<(User, Profile)> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let user = create_user(&tx, username, password_hash, role)?;
    let profile = profiles::create_profile(&tx, user.id, &PictureRef::default(), None)?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok((user, profile))
}

/// Get a user by primary key.
pub fn get_user_by_id(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let q = format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS);
    let result = conn.query_row(&q, [id.to_string()], User::from_row);
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user by username.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let q = format!("SELECT {} FROM users WHERE username = ?1", User::COLUMNS);
    let result = conn.query_row(&q, [username], User::from_row);
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all users ordered by username.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let q = format!("SELECT {} FROM users ORDER BY username ASC", User::COLUMNS);
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], User::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a user by ID. Returns true if a row was deleted.
///
/// The user's profile and sessions are removed by `ON DELETE CASCADE`.
pub fn delete_user(conn: &Connection, id: UserId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM users WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

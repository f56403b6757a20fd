//! Session token operations.

use pt_core::{Error, Result, SessionId, UserId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::AuthToken;

/// Create a new auth token.
pub fn create_token(
    conn: &Connection,
    user_id: UserId,
    token: &str,
    expires_at: &str,
) -> Result<AuthToken> {
    let id = SessionId::new();

    conn.execute(
        "INSERT INTO auth_tokens (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id.to_string(), user_id.to_string(), token, expires_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(AuthToken {
        id,
        user_id,
        token: token.to_string(),
        expires_at: expires_at.to_string(),
    })
}

/// Look up a token that has not expired as of `now` (RFC 3339).
pub fn get_valid_token(conn: &Connection, token: &str, now: &str) -> Result<Option<AuthToken>> {
    let q = format!(
        "SELECT {} FROM auth_tokens WHERE token = ?1 AND expires_at > ?2",
        AuthToken::COLUMNS
    );
    conn.query_row(&q, [token, now], AuthToken::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// Delete a specific token by value.
pub fn delete_token(conn: &Connection, token: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM auth_tokens WHERE token = ?1", [token])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete all tokens whose `expires_at` is in the past.
pub fn delete_expired_tokens(conn: &Connection, now: &str) -> Result<usize> {
    conn.execute("DELETE FROM auth_tokens WHERE expires_at < ?1", [now])
        .map_err(|e| Error::database(e.to_string()))
}

//! Session tokens: issuing on login, revoking on logout, and resolving a
//! presented token to a user.

use chrono::{Duration, SecondsFormat, Utc};
use pt_core::{Error, Result, UserId};
use pt_db::models::{AuthToken, User};
use pt_db::pool::get_conn;
use pt_db::queries::{auth, users};

use crate::context::AppContext;

/// Longest session lifetime honored, whatever the configuration says.
const MAX_SESSION_HOURS: u64 = 24 * 365 * 10;

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Verify credentials and issue a new session token.
///
/// Unknown users and wrong passwords produce the same error.
pub fn login(ctx: &AppContext, username: &str, password: &str) -> Result<(User, AuthToken)> {
    let conn = get_conn(&ctx.db)?;
    let invalid = || Error::Unauthorized("Invalid credentials".into());

    let user = users::get_user_by_username(&conn, username)?.ok_or_else(invalid)?;
    if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
        tracing::debug!(username, "Rejected login");
        return Err(invalid());
    }

    let hours = ctx.config.auth.session_timeout_hours.min(MAX_SESSION_HOURS);
    let expires = Utc::now() + Duration::hours(hours as i64);
    let token = uuid::Uuid::new_v4().to_string();
    let tok = auth::create_token(
        &conn,
        user.id,
        &token,
        &expires.to_rfc3339_opts(SecondsFormat::Secs, true),
    )?;

    let purged = auth::delete_expired_tokens(&conn, &now_rfc3339())?;
    if purged > 0 {
        tracing::debug!(purged, "Purged expired sessions");
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((user, tok))
}

/// Revoke a token. Unknown tokens are ignored.
pub fn logout(ctx: &AppContext, token: &str) -> Result<()> {
    let conn = get_conn(&ctx.db)?;
    if auth::delete_token(&conn, token)? {
        tracing::debug!("Session revoked");
    }
    Ok(())
}

/// Resolve an unexpired token to its user.
pub fn resolve(ctx: &AppContext, token: &str) -> Option<UserId> {
    let conn = get_conn(&ctx.db).ok()?;
    match auth::get_valid_token(&conn, token, &now_rfc3339()) {
        Ok(tok) => tok.map(|t| t.user_id),
        Err(e) => {
            tracing::warn!("Session lookup failed: {e}");
            None
        }
    }
}

//! Authentication route handlers: login, logout, status.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::{authenticate, clear_session_cookie, extract_token, session_cookie};
use crate::profiles::run_blocking;
use crate::sessions;

/// Login request payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Auth status response.
#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// POST /api/auth/login
///
/// Returns the token in the body and also sets the session cookie.
pub async fn login(
    State(ctx): State<AppContext>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login_ctx = ctx.clone();
    let (_, token) = run_blocking(move || {
        sessions::login(&login_ctx, &payload.username, &payload.password)
    })
    .await?;

    let cookie = session_cookie(
        &token.token,
        ctx.config.auth.session_timeout_hours,
        ctx.config.auth.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            message: "Login successful".into(),
            token: Some(token.token),
            expires_at: Some(token.expires_at),
        }),
    ))
}

/// POST /api/auth/logout
pub async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = extract_token(&headers) {
        sessions::logout(&ctx, &token)?;
    }
    Ok((StatusCode::OK, [(header::SET_COOKIE, clear_session_cookie())]))
}

/// GET /api/auth/status
pub async fn auth_status(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Json<AuthStatusResponse> {
    let user = authenticate(&ctx, &headers).and_then(|user_id| {
        let conn = pt_db::pool::get_conn(&ctx.db).ok()?;
        pt_db::queries::users::get_user_by_id(&conn, user_id)
            .ok()
            .flatten()
    });

    Json(match user {
        Some(user) => AuthStatusResponse {
            authenticated: true,
            user_id: Some(user.id.to_string()),
            username: Some(user.username),
            role: Some(user.role),
        },
        None => AuthStatusResponse {
            authenticated: false,
            user_id: None,
            username: None,
            role: None,
        },
    })
}

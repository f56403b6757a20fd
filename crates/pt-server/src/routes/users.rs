//! Account routes: self-registration and self-deletion.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use pt_core::UserId;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::auth::clear_session_cookie;
use crate::profiles::{self, run_blocking};
use crate::routes::profiles::ProfileResponse;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub role: String,
    pub created_at: String,
    pub profile: ProfileResponse,
}

/// POST /api/users: create an account and its profile.
pub async fn create_user(
    State(ctx): State<AppContext>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let create_ctx = ctx.clone();
    let (user, profile) = run_blocking(move || {
        profiles::create_user_with_profile(
            &create_ctx,
            &payload.username,
            &payload.password,
            "user",
        )
    })
    .await?;

    let profile = ProfileResponse::new(&ctx, &user.username, profile);
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id.to_string(),
            username: user.username,
            role: user.role,
            created_at: user.created_at,
            profile,
        }),
    ))
}

/// DELETE /api/users/me: delete the caller's account, profile, and picture.
pub async fn delete_me(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<impl IntoResponse, AppError> {
    run_blocking(move || profiles::delete_user(&ctx, user_id)).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie())],
    ))
}

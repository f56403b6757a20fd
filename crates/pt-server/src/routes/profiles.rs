//! Profile API: read, edit location, upload or reset the picture.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use pt_core::{Error, UserId};
use pt_db::models::Profile;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::profiles::{self, run_blocking};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub user_id: String,
    pub username: String,
    /// Storage path of the picture, or `default.png`.
    pub picture: String,
    /// URL the picture is served from.
    pub picture_url: String,
    pub has_custom_picture: bool,
    pub location: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProfileResponse {
    pub fn new(ctx: &AppContext, username: &str, profile: Profile) -> Self {
        Self {
            id: profile.id.to_string(),
            user_id: profile.user_id.to_string(),
            username: username.to_string(),
            picture_url: profile.picture.url(&ctx.config.media.mount_path()),
            has_custom_picture: !profile.picture.is_default(),
            picture: profile.picture.as_str().to_string(),
            location: profile.location,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// New location; `null` or blank clears it.
    pub location: Option<String>,
}

/// A file part of a multipart form.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Fields recognized in a profile multipart form.
#[derive(Debug, Default)]
pub struct ProfileForm {
    /// `Some` when the form carried a `location` field, even if blank.
    pub location: Option<String>,
    /// The `picture` file part, unless it was empty.
    pub picture: Option<Upload>,
    /// Set by a non-empty `reset` field.
    pub reset: bool,
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::TooLarge(e.body_text())
    } else {
        Error::Validation(format!("invalid form data: {}", e.body_text()))
    }
}

/// Read a profile form. Unknown fields are skipped.
pub async fn read_profile_form(mut multipart: Multipart) -> pt_core::Result<ProfileForm> {
    let mut form = ProfileForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("location") => {
                form.location = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("picture") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers submit an empty part when no file was chosen.
                if !bytes.is_empty() {
                    form.picture = Some(Upload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Some("reset") => {
                form.reset = !field.text().await.map_err(multipart_error)?.is_empty();
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring form field");
            }
        }
    }

    Ok(form)
}

/// GET /api/profile
pub async fn get_profile(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<ProfileResponse>, AppError> {
    let (user, profile) = profiles::get_profile(&ctx, user_id)?;
    Ok(Json(ProfileResponse::new(&ctx, &user.username, profile)))
}

/// PUT /api/profile
pub async fn update_profile(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    profiles::update_location(&ctx, user_id, payload.location.as_deref())?;
    let (user, profile) = profiles::get_profile(&ctx, user_id)?;
    Ok(Json(ProfileResponse::new(&ctx, &user.username, profile)))
}

/// POST /api/profile/picture: multipart with a `picture` file part.
pub async fn upload_picture(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    multipart: Multipart,
) -> Result<Json<ProfileResponse>, AppError> {
    let form = read_profile_form(multipart).await?;
    let upload = form
        .picture
        .ok_or_else(|| Error::Validation("a non-empty 'picture' file is required".into()))?;

    let save_ctx = ctx.clone();
    run_blocking(move || {
        profiles::save_picture(&save_ctx, user_id, &upload.filename, &upload.bytes)
    })
    .await?;

    let (user, profile) = profiles::get_profile(&ctx, user_id)?;
    Ok(Json(ProfileResponse::new(&ctx, &user.username, profile)))
}

/// DELETE /api/profile/picture: back to the default picture.
pub async fn reset_picture(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<ProfileResponse>, AppError> {
    profiles::reset_picture(&ctx, user_id)?;
    let (user, profile) = profiles::get_profile(&ctx, user_id)?;
    Ok(Json(ProfileResponse::new(&ctx, &user.username, profile)))
}

//! Server-rendered HTML pages: login form and the profile page.

use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use pt_core::validate::MAX_LOCATION_CHARS;
use pt_core::UserId;
use pt_db::models::{Profile, User};
use serde::Deserialize;

use crate::context::AppContext;
use crate::middleware::auth::{
    authenticate, clear_session_cookie, extract_token, session_cookie, LOGIN_PATH,
};
use crate::profiles::{self, run_blocking};
use crate::routes::profiles::read_profile_form;
use crate::sessions;

const PROFILE_PATH: &str = "/profile";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// Only same-site absolute paths made of visible ASCII are followed after
/// login; anything else could not be sent back in a `Location` header.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n)
            if n.starts_with('/')
                && !n.starts_with("//")
                && !n.contains('\\')
                && n.bytes().all(|b| b.is_ascii_graphic()) =>
        {
            n
        }
        _ => PROFILE_PATH,
    }
}

/// Escape text for use in HTML content and quoted attributes.
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 32rem; margin: 3rem auto; padding: 0 1rem; }}
.avatar {{ width: 150px; height: 150px; border-radius: 50%; object-fit: cover; }}
.error {{ color: #b00020; }}
form {{ margin: 1rem 0; }}
label {{ display: block; margin: .5rem 0; }}
</style>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape_html(title),
    )
}

fn render_login(next: &str, error: Option<&str>) -> Html<String> {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Sign in</h1>
{error}
<form method="post" action="{LOGIN_PATH}">
<input type="hidden" name="next" value="{next}">
<label>Username <input name="username" autocomplete="username" required></label>
<label>Password <input name="password" type="password" autocomplete="current-password" required></label>
<button type="submit">Sign in</button>
</form>"#,
        next = escape_html(next),
    );
    Html(layout("Sign in", &body))
}

fn render_profile(
    ctx: &AppContext,
    user: &User,
    profile: &Profile,
    error: Option<&str>,
) -> Html<String> {
    let picture_url = profile.picture.url(&ctx.config.media.mount_path());
    let location = profile.location.as_deref().unwrap_or("");
    let shown_location = if location.is_empty() {
        "<em>No location set</em>".to_string()
    } else {
        escape_html(location)
    };
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();
    let reset_form = if profile.picture.is_default() {
        String::new()
    } else {
        format!(
            r#"<form method="post" action="{PROFILE_PATH}" enctype="multipart/form-data">
<input type="hidden" name="reset" value="1">
<button type="submit">Remove picture</button>
</form>"#
        )
    };

    let body = format!(
        r#"<h1>{username}</h1>
<img class="avatar" src="{picture_url}" alt="Profile picture of {username}" width="150" height="150">
<p class="location">{shown_location}</p>
{error}
<form method="post" action="{PROFILE_PATH}" enctype="multipart/form-data">
<label>Location <input name="location" value="{location}" maxlength="{MAX_LOCATION_CHARS}"></label>
<label>Picture <input name="picture" type="file" accept="image/*"></label>
<button type="submit">Save</button>
</form>
{reset_form}
<form method="post" action="/logout"><button type="submit">Sign out</button></form>"#,
        username = escape_html(&user.username),
        picture_url = escape_html(&picture_url),
        location = escape_html(location),
    );
    Html(layout(&format!("{} · profile", user.username), &body))
}

/// GET /
pub async fn index() -> Redirect {
    Redirect::to(PROFILE_PATH)
}

/// GET /login
pub async fn login_page(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    if authenticate(&ctx, &headers).is_some() {
        return Redirect::to(next).into_response();
    }
    render_login(next, None).into_response()
}

/// POST /login
pub async fn login_submit(State(ctx): State<AppContext>, Form(form): Form<LoginForm>) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    let login_ctx = ctx.clone();
    let LoginForm {
        username, password, ..
    } = form;
    let result = run_blocking(move || sessions::login(&login_ctx, &username, &password)).await;

    match result {
        Ok((_, token)) => {
            let cookie = session_cookie(
                &token.token,
                ctx.config.auth.session_timeout_hours,
                ctx.config.auth.secure_cookies,
            );
            ([(header::SET_COOKIE, cookie)], Redirect::to(&next)).into_response()
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let message = match e {
                pt_core::Error::Unauthorized(_) => "Invalid username or password.".to_string(),
                other => {
                    tracing::error!("Login failed: {other}");
                    "Sign in is unavailable right now.".to_string()
                }
            };
            (status, render_login(&next, Some(&message))).into_response()
        }
    }
}

/// POST /logout
pub async fn logout(State(ctx): State<AppContext>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_token(&headers) {
        if let Err(e) = sessions::logout(&ctx, &token) {
            tracing::warn!("Failed to revoke session: {e}");
        }
    }
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}

/// GET /profile
pub async fn profile_page(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Response {
    match profiles::get_profile(&ctx, user_id) {
        Ok((user, profile)) => render_profile(&ctx, &user, &profile, None).into_response(),
        Err(e) => page_error(e),
    }
}

/// POST /profile: apply the multipart form, then redirect back.
///
/// On failure the page is re-rendered with the error and the matching
/// status code.
pub async fn profile_submit(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    multipart: Multipart,
) -> Response {
    let result = match read_profile_form(multipart).await {
        Ok(form) => {
            let apply_ctx = ctx.clone();
            run_blocking(move || {
                if form.reset {
                    profiles::reset_picture(&apply_ctx, user_id)?;
                }
                if form.location.is_some() {
                    profiles::update_location(&apply_ctx, user_id, form.location.as_deref())?;
                }
                if let Some(upload) = form.picture {
                    profiles::save_picture(&apply_ctx, user_id, &upload.filename, &upload.bytes)?;
                }
                Ok(())
            })
            .await
        }
        Err(e) => Err(e),
    };

    let Err(e) = result else {
        return Redirect::to(PROFILE_PATH).into_response();
    };

    let status =
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if status.is_server_error() {
        tracing::error!("Profile update failed: {e}");
        "Something went wrong while saving your profile.".to_string()
    } else {
        match &e {
            pt_core::Error::Image(_) => "That file is not an image we can read.".to_string(),
            other => other.to_string(),
        }
    };

    match profiles::get_profile(&ctx, user_id) {
        Ok((user, profile)) => {
            (status, render_profile(&ctx, &user, &profile, Some(&message))).into_response()
        }
        Err(e) => page_error(e),
    }
}

fn page_error(e: pt_core::Error) -> Response {
    // A session whose user vanished is treated like no session.
    if matches!(e, pt_core::Error::NotFound { .. }) {
        return Redirect::to(LOGIN_PATH).into_response();
    }
    tracing::error!("Failed to render page: {e}");
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Html(layout("Error", "<h1>Something went wrong</h1>"))).into_response()
}

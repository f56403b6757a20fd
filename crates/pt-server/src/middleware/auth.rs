//! Authentication middleware.
//!
//! A session token is accepted from `Authorization: Bearer <token>` or from
//! the session cookie. On success the resolved [`UserId`] is inserted into
//! request extensions for downstream handlers. API routes reject anonymous
//! callers with 401; page routes redirect them to the login form.

use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use pt_core::UserId;
use url::form_urlencoded;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;
use crate::sessions;

/// Cookie name for browser sessions.
pub const SESSION_COOKIE: &str = "portrait_session";

/// Path of the login page.
pub const LOGIN_PATH: &str = "/login";

/// Extract a bearer token or session cookie from request headers.
///
/// The `Authorization` header wins over the cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|part| part.trim().strip_prefix(prefix.as_str()))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolve the caller's user from request headers.
pub fn authenticate(ctx: &AppContext, headers: &HeaderMap) -> Option<UserId> {
    let token = extract_token(headers)?;
    sessions::resolve(ctx, &token)
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(token: &str, max_age_hours: u64, secure: bool) -> String {
    let max_age = max_age_hours.saturating_mul(3600);
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value clearing the session.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Login URL that returns to `target` afterwards.
pub fn login_redirect(target: &str) -> String {
    let next: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={next}")
}

/// Middleware for JSON API routes: 401 unless authenticated.
pub async fn require_api_auth(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    match authenticate(&ctx, request.headers()) {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            Ok(next.run(request).await)
        }
        None => {
            let err = AppError::new(pt_core::Error::Unauthorized(
                "Authentication required".into(),
            ));
            Err(match request.extensions().get::<RequestId>() {
                Some(id) => err.with_request_id(id.0.clone()),
                None => err,
            })
        }
    }
}

/// Middleware for HTML pages: redirect to the login page unless
/// authenticated, remembering where the caller was headed.
pub async fn require_page_auth(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match authenticate(&ctx, request.headers()) {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            next.run(request).await
        }
        None => {
            let target = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/profile");
            tracing::debug!(target, "Redirecting anonymous request to login");
            Redirect::to(&login_redirect(target)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("portrait_session=xyz"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; portrait_session=xyz; lang=en"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_values_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(header::COOKIE, HeaderValue::from_static("portrait_session="));
        assert_eq!(extract_token(&headers), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn login_redirect_encodes_target() {
        assert_eq!(login_redirect("/profile"), "/login?next=%2Fprofile");
        assert_eq!(
            login_redirect("/profile?tab=a b"),
            "/login?next=%2Fprofile%3Ftab%3Da+b"
        );
    }

    #[test]
    fn cookies() {
        let c = session_cookie("tok", 2, true);
        assert!(c.starts_with("portrait_session=tok;"));
        assert!(c.contains("Max-Age=7200"));
        assert!(c.ends_with("; Secure"));
        assert!(!session_cookie("tok", 2, false).contains("Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}

//! Axum router construction.
//!
//! Builds the full application router with all route groups, middleware
//! layers, and static serving of stored pictures.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::auth::{require_api_auth, require_page_auth};
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete Axum router.
///
/// Stored pictures are served from `config.media.root` under
/// [`MediaConfig::mount_path`](pt_core::config::MediaConfig::mount_path).
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = DefaultBodyLimit::max(ctx.config.media.max_upload_bytes);

    // Open API routes.
    let public_api = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/status", get(routes::auth::auth_status))
        .route("/users", post(routes::users::create_user));

    // API routes for signed-in callers.
    let protected_api = Router::new()
        .route("/users/me", delete(routes::users::delete_me))
        .route(
            "/profile",
            get(routes::profiles::get_profile).put(routes::profiles::update_profile),
        )
        .route(
            "/profile/picture",
            post(routes::profiles::upload_picture)
                .delete(routes::profiles::reset_picture)
                .layer(upload_limit.clone()),
        )
        .layer(middleware::from_fn_with_state(ctx.clone(), require_api_auth));

    // HTML pages behind the login redirect.
    let protected_pages = Router::new()
        .route(
            "/profile",
            get(routes::pages::profile_page)
                .post(routes::pages::profile_submit)
                .layer(upload_limit),
        )
        .layer(middleware::from_fn_with_state(ctx.clone(), require_page_auth));

    let media = ServeDir::new(&ctx.config.media.root);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/", get(routes::pages::index))
        .route(
            "/login",
            get(routes::pages::login_page).post(routes::pages::login_submit),
        )
        .route("/logout", post(routes::pages::logout))
        .merge(protected_pages)
        .nest("/api", public_api.merge(protected_api))
        .nest_service(&ctx.config.media.mount_path(), media)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

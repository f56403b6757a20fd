//! pt-server: HTTP server, profile workflows, and picture storage.
//!
//! This crate ties the other pt-* crates into a running server:
//!
//! - Axum router with a JSON API under `/api` and server-rendered pages
//! - Profile service that normalizes uploads and cleans up replaced pictures
//! - Local filesystem picture storage served under the media mount path
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod profiles;
pub mod router;
pub mod routes;
pub mod sessions;
pub mod storage;

use std::net::SocketAddr;

use pt_core::config::Config;
use pt_core::{Error, DEFAULT_PICTURE};

use crate::context::AppContext;

/// Start the portrait server.
///
/// Initializes the database and media root, then serves HTTP until a
/// shutdown signal is received.
pub async fn start(config: Config) -> pt_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db = pt_db::pool::init_pool(&config.server.db_path)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(db, config);
    prepare_media_root(&ctx)?;

    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Create the media root and seed `default.png` if it is missing.
pub fn prepare_media_root(ctx: &AppContext) -> pt_core::Result<()> {
    let root = &ctx.config.media.root;
    std::fs::create_dir_all(root)?;

    if !ctx.storage.exists(DEFAULT_PICTURE) {
        let png = pt_image::placeholder_png(ctx.config.media.picture_size)?;
        ctx.storage.write(DEFAULT_PICTURE, &png)?;
        tracing::info!("Wrote placeholder {DEFAULT_PICTURE} to {}", root.display());
    }
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

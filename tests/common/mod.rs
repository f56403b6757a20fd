//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temporary media
//! root, and a full [`AppContext`]. The [`TestHarness::with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pt_core::config::Config;
use pt_core::UserId;
use pt_db::pool::{init_memory_pool, DbPool};
use pt_server::context::AppContext;
use pt_server::router::build_router;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a temporary media root.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    media: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration. The media root is
    /// always replaced by a fresh temp directory.
    pub fn with_config(mut config: Config) -> Self {
        let media = tempfile::tempdir().expect("failed to create media dir");
        config.media.root = media.path().to_path_buf();

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(db.clone(), config);
        pt_server::prepare_media_root(&ctx).expect("failed to prepare media root");

        Self { ctx, db, media }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> pt_db::pool::PooledConnection {
        pt_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Root directory stored pictures live under.
    pub fn media_root(&self) -> &Path {
        self.media.path()
    }

    /// Absolute path of a stored picture.
    pub fn media_path(&self, picture: &str) -> PathBuf {
        self.media.path().join(picture)
    }

    /// Create a user with a profile and return its ID.
    pub fn create_user(&self, username: &str, password: &str) -> UserId {
        let (user, _) =
            pt_server::profiles::create_user_with_profile(&self.ctx, username, password, "user")
                .expect("failed to create user");
        user.id
    }

    /// Current picture reference stored for `user_id`.
    pub fn picture_of(&self, user_id: UserId) -> String {
        let profile = pt_db::queries::profiles::get_profile_by_user(&self.conn(), user_id)
            .expect("profile query failed")
            .expect("profile missing");
        profile.picture.as_str().to_string()
    }
}

/// Log in through the JSON API and return the session token.
pub async fn login(addr: SocketAddr, username: &str, password: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/auth/login"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), 200, "login should succeed");
    let json: serde_json::Value = resp.json().await.expect("login body");
    json["token"].as_str().expect("token").to_string()
}

/// A client that does not follow redirects.
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build client")
}

/// Encode a solid-color image of the given size.
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .expect("failed to encode test image");
    buf.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encoded_image(width, height, ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encoded_image(width, height, ImageFormat::Jpeg)
}

/// Multipart form carrying `bytes` as the `picture` file part.
pub fn picture_form(filename: &str, bytes: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
    reqwest::multipart::Form::new().part("picture", part)
}

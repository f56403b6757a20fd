//! Integration tests for reading and editing a profile through the JSON API.

mod common;

use common::{login, TestHarness};
use pt_core::config::Config;

async fn put_location(
    addr: std::net::SocketAddr,
    token: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    reqwest::Client::new()
        .put(format!("http://{addr}/api/profile"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn get_profile_returns_own_profile() {
    let (h, addr) = TestHarness::with_server().await;
    let user_id = h.create_user("alice", "password1");
    let token = login(addr, "alice", "password1").await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("x-request-id"));

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["user_id"], user_id.to_string());
    assert_eq!(json["username"], "alice");
    assert_eq!(json["picture"], "default.png");
    assert!(json["location"].is_null());
}

#[tokio::test]
async fn location_is_trimmed_and_cleared() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("bob", "password1");
    let token = login(addr, "bob", "password1").await;

    let body = serde_json::json!({ "location": "  São Paulo  " });
    let resp = put_location(addr, &token, body).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["location"], "São Paulo");

    let resp = put_location(addr, &token, serde_json::json!({ "location": "   " })).await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json["location"].is_null());
}

#[tokio::test]
async fn location_length_is_limited_in_characters() {
    let (h, addr) = TestHarness::with_server().await;
    let user_id = h.create_user("carol", "password1");
    let token = login(addr, "carol", "password1").await;

    // Multi-byte characters count once each.
    let exact = "é".repeat(80);
    let resp = put_location(addr, &token, serde_json::json!({ "location": exact })).await;
    assert_eq!(resp.status(), 200);

    let resp = put_location(addr, &token, serde_json::json!({ "location": "é".repeat(81) })).await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "validation_error");

    let (_, profile) = pt_server::profiles::get_profile(&h.ctx, user_id).unwrap();
    assert_eq!(profile.location.as_deref(), Some(exact.as_str()));
}

#[tokio::test]
async fn users_only_see_their_own_profile() {
    let (h, addr) = TestHarness::with_server().await;
    h.create_user("dan", "password1");
    h.create_user("eve", "password1");
    let dan = login(addr, "dan", "password1").await;
    let eve = login(addr, "eve", "password1").await;

    put_location(addr, &dan, serde_json::json!({ "location": "Lima" })).await;

    let json: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{addr}/api/profile"))
        .bearer_auth(&eve)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["username"], "eve");
    assert!(json["location"].is_null());
}

#[tokio::test]
async fn custom_mount_path_is_used_in_urls() {
    let mut config = Config::default();
    config.media.url_prefix = "/static/pictures/".into();
    let (h, addr) = TestHarness::with_server_config(config).await;
    h.create_user("fay", "password1");
    let token = login(addr, "fay", "password1").await;

    let json: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{addr}/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["picture_url"], "/static/pictures/default.png");

    let resp = reqwest::get(format!("http://{addr}/static/pictures/default.png"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

//! Integration tests for the admin API: stash CRUD, pings, cache, and logs.

mod common;

use common::{stash, MockStash, TestHarness};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Stash CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_is_sorted_by_priority() {
    let h = TestHarness::with_stashes(vec![
        stash("b", "http://localhost:9999", true, 5),
        stash("a", "http://localhost:9999", true, 1),
    ])
    .await;

    let resp = reqwest::get(h.url("/api/config/stashes")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let stashes = body["stashes"].as_array().unwrap();
    assert_eq!(stashes[0]["id"], "a");
    assert_eq!(stashes[1]["id"], "b");
}

#[tokio::test]
async fn create_get_update_delete_round_trip() {
    let h = TestHarness::with_stashes(Vec::new()).await;
    let client = reqwest::Client::new();

    // Create.
    let resp = client
        .post(h.url("/api/config/stashes"))
        .json(&json!({
            "id": "remote",
            "name": "Remote Stash",
            "endpoint": "https://stash.example.com",
            "api_key": "secret",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["stash"]["id"], "remote");
    assert_eq!(body["stash"]["enabled"], true);
    assert_eq!(body["stash"]["field_sync"]["performers"], true);

    // Duplicate id is a conflict.
    let resp = client
        .post(h.url("/api/config/stashes"))
        .json(&json!({ "id": "remote", "endpoint": "http://other:9999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Get.
    let resp = reqwest::get(h.url("/api/config/stashes/remote"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Partial update leaves other fields alone.
    let resp = client
        .put(h.url("/api/config/stashes/remote"))
        .json(&json!({ "enabled": false, "priority": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["stash"]["enabled"], false);
    assert_eq!(body["stash"]["priority"], 3);
    assert_eq!(body["stash"]["endpoint"], "https://stash.example.com");

    // Delete, then the id is gone.
    let resp = client
        .delete(h.url("/api/config/stashes/remote"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let resp = reqwest::get(h.url("/api/config/stashes/remote"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let resp = client
        .delete(h.url("/api/config/stashes/remote"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let h = TestHarness::with_stashes(Vec::new()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(h.url("/api/config/stashes"))
        .json(&json!({ "id": "  ", "endpoint": "http://localhost:9999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(h.url("/api/config/stashes"))
        .json(&json!({ "id": "ftp", "endpoint": "ftp://localhost:21" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn reorder_assigns_priorities_by_position() {
    let h = TestHarness::with_stashes(vec![
        stash("a", "http://localhost:9999", true, 0),
        stash("b", "http://localhost:9999", true, 1),
        stash("c", "http://localhost:9999", true, 2),
    ])
    .await;

    let client = reqwest::Client::new();
    let resp = client
        .put(h.url("/api/config/stashes/reorder"))
        .json(&json!({ "order": ["c", "a", "missing", "b"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let ids: Vec<&str> = body["stashes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn registry_edits_reach_the_provider_surface() {
    let mock = MockStash::start().await;
    let h = TestHarness::with_mock(&mock).await;
    let client = reqwest::Client::new();

    // Disable the stash through the admin API; the provider root vanishes.
    let resp = client
        .put(h.url("/api/config/stashes/home"))
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = reqwest::get(h.url("/providers/home")).await.unwrap();
    assert_eq!(resp.status(), 404);
}

// ---------------------------------------------------------------------------
// Ping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_reports_success_and_failure() {
    let mock = MockStash::start().await;
    let h = TestHarness::with_stashes(vec![
        stash("up", &mock.endpoint(), true, 0),
        // Unroutable endpoint; the probe fails fast.
        stash("down", "http://127.0.0.1:9", true, 1),
    ])
    .await;
    let client = reqwest::Client::new();

    let resp = client
        .post(h.url("/api/config/stashes/up/ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert!(body["latency_ms"].is_u64());

    let resp = client
        .post(h.url("/api/config/stashes/down/ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["error"].is_string());

    let resp = client
        .post(h.url("/api/config/stashes/ghost/ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ---------------------------------------------------------------------------
// Cache management
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cache_stats_and_clear() {
    let mock = MockStash::start().await;
    mock.set_scenes(vec![mock.scene("1", "Cached", Some("2021-01-01"))]);
    let h = TestHarness::with_mock(&mock).await;
    let client = reqwest::Client::new();

    // Populate the match cache.
    client
        .post(h.url("/providers/home/library/metadata/matches"))
        .json(&json!({ "title": "Cached" }))
        .send()
        .await
        .unwrap();

    let resp = reqwest::get(h.url("/api/config/cache")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["matches"]["size"], 1);
    assert_eq!(body["matches"]["ttl_secs"], 300);
    assert_eq!(body["metadata"]["ttl_secs"], 1800);

    let resp = client
        .delete(h.url("/api/config/cache"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cleared"], true);

    let resp = reqwest::get(h.url("/api/config/cache")).await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["matches"]["size"], 0);

    // A fresh match after the clear hits the backend again.
    client
        .post(h.url("/providers/home/library/metadata/matches"))
        .json(&json!({ "title": "Cached" }))
        .send()
        .await
        .unwrap();
    assert_eq!(mock.search_calls(), 2);
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logs_record_provider_activity() {
    let mock = MockStash::start().await;
    mock.set_scenes(vec![mock.scene("1", "Logged", Some("2021-01-01"))]);
    let h = TestHarness::with_mock(&mock).await;
    let client = reqwest::Client::new();

    client
        .post(h.url("/providers/home/library/metadata/matches"))
        .json(&json!({ "title": "Logged" }))
        .send()
        .await
        .unwrap();

    // The activity log drains asynchronously.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let resp = reqwest::get(h.url("/api/logs")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["count"].as_u64().unwrap() >= 1);
    let logs = body["logs"].as_array().unwrap();
    assert!(logs
        .iter()
        .any(|l| l["message"].as_str().unwrap().contains("Match \"Logged\"")));

    // Filtered query.
    let resp = reqwest::get(h.url("/api/logs?level=info&stash_id=home&limit=5"))
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    for entry in body["logs"].as_array().unwrap() {
        assert_eq!(entry["level"], "info");
        assert_eq!(entry["stash_id"], "home");
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_is_public() {
    let h = TestHarness::with_stashes(Vec::new()).await;
    let resp = reqwest::get(h.url("/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

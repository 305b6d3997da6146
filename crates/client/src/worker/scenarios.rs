//! End-to-end behaviour of the worker: install, activation, offline fetches,
//! control messages and notification clicks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use tuneverse_core::{AppConfig, CacheDb, CacheStorage, Destination, Request, Response};

use super::*;
use crate::testing::{FailingStorage, ScriptedNetwork, url};

struct Harness {
    worker: ServiceWorker,
    db: Arc<CacheDb>,
    network: Arc<ScriptedNetwork>,
    clients: Arc<InMemoryClients>,
    tray: Arc<InMemoryNotifications>,
}

async fn harness_with(config: AppConfig) -> Harness {
    let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
    harness_on(config, db).await
}

async fn harness_on(config: AppConfig, db: Arc<CacheDb>) -> Harness {
    let network = ScriptedNetwork::new();
    let clients = Arc::new(InMemoryClients::new());
    let tray = Arc::new(InMemoryNotifications::granted());
    let worker = ServiceWorker::new(
        Arc::new(config),
        db.clone(),
        network.clone(),
        Platform::new(clients.clone(), tray.clone()),
    )
    .unwrap();
    Harness { worker, db, network, clients, tray }
}

async fn harness() -> Harness {
    harness_with(AppConfig::default()).await
}

fn json_body(response: &Response) -> Value {
    serde_json::from_slice(&response.body).unwrap()
}

async fn ask(worker: &ServiceWorker, data: Value) -> Reply {
    let (message, rx) = PendingMessage::with_reply(data);
    worker.handle_message(message).await;
    rx.await.unwrap()
}

fn manifest_request(path: &str) -> Request {
    Request::get(url(path))
}

#[tokio::test]
async fn test_install_precaches_every_manifest_asset() {
    let h = harness().await;
    for path in &h.worker.config().static_manifest {
        h.network.respond(path, Response::new(200, format!("asset {path}")));
    }

    let report = h.worker.install().await.unwrap();
    assert!(report.failed.is_empty());
    assert_eq!(report.cached.len(), h.worker.config().static_manifest.len());

    for path in &h.worker.config().static_manifest {
        let hit = h.db.match_in("tuneverse-static-v3", &manifest_request(path)).await.unwrap();
        assert!(hit.is_some(), "{path} was not pre-cached");
    }
}

#[tokio::test]
async fn test_activation_retires_previous_generation() {
    let config = AppConfig {
        cache_prefix: "tv".into(),
        cache_version: "v2".into(),
        static_manifest: vec![],
        ..Default::default()
    };
    let h = harness_with(config).await;
    for stale in ["api-v1", "runtime-v1", "shell-v1"] {
        h.db.put(stale, &manifest_request("/"), Response::new(200, "old")).await.unwrap();
    }
    h.db.open_store("tv-api-v2").await.unwrap();

    h.worker.install().await.unwrap();
    let deleted = h.worker.advance().await.unwrap().unwrap();

    assert_eq!(deleted, vec!["api-v1", "runtime-v1", "shell-v1"]);
    let names = h.db.store_names().await.unwrap();
    assert!(names.iter().all(|n| n.ends_with("-v2")), "{names:?}");
    assert_eq!(h.worker.state().await, LifecycleState::Active);
}

#[tokio::test]
async fn test_skip_waiting_message_activates() {
    let h = harness_with(AppConfig { static_manifest: vec![], ..Default::default() }).await;
    h.clients.add_client("page-1", "http://localhost:5000/", false).await;
    h.worker.install().await.unwrap();
    assert_eq!(h.worker.state().await, LifecycleState::Waiting);

    assert_eq!(ask(&h.worker, json!({ "type": "SKIP_WAITING" })).await, Reply::Ack);
    assert_eq!(h.worker.state().await, LifecycleState::Active);
    assert!(h.clients.match_all(false).await.unwrap().iter().all(|c| c.controlled));
}

#[tokio::test]
async fn test_offline_requests_are_idempotent() {
    let h = harness().await;
    let request = Request::get(url("/api/folders"));
    h.db.put("tuneverse-api-v3", &request, Response::new(200, r#"{"folders":["Lo-fi"]}"#))
        .await
        .unwrap();

    let first = h.worker.handle_fetch(request.clone()).await.unwrap();
    let second = h.worker.handle_fetch(request).await.unwrap();
    assert_eq!(first.body, second.body);
    assert_eq!(first.status, second.status);
}

#[tokio::test]
async fn test_cache_first_round_trip() {
    let h = harness().await;
    let request = Request::get(url("/manifest.json")).with_destination(Destination::Manifest);
    h.network.respond("/manifest.json", Response::new(200, r#"{"name":"TuneVerse"}"#));

    let online = h.worker.handle_fetch(request.clone()).await.unwrap();
    h.worker.settled().await;
    h.network.go_offline();
    let offline = h.worker.handle_fetch(request).await.unwrap();

    assert_eq!(online.body, offline.body);
    assert!(!offline.is_fallback());
    assert_eq!(h.network.calls("/manifest.json"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_response_at_deadline_plus_one_is_timed_out() {
    let h = harness().await;
    let request = Request::get(url("/api/folders"));
    h.db.put("tuneverse-api-v3", &request, Response::new(200, "cached")).await.unwrap();
    h.network.respond_after("/api/folders", Response::new(200, "late"), Duration::from_millis(5_001));

    let response = h.worker.handle_fetch(request.clone()).await.unwrap();
    assert_eq!(&response.body[..], b"cached");

    tokio::time::sleep(Duration::from_secs(5)).await;
    h.worker.settled().await;
    let stored = h.db.match_in("tuneverse-api-v3", &request).await.unwrap().unwrap();
    assert_eq!(&stored.body[..], b"cached");
}

#[tokio::test(start_paused = true)]
async fn test_response_before_deadline_wins() {
    let h = harness().await;
    let request = Request::get(url("/api/folders"));
    h.network.respond_after("/api/folders", Response::new(200, "live"), Duration::from_millis(4_999));

    let response = h.worker.handle_fetch(request).await.unwrap();
    assert_eq!(&response.body[..], b"live");
}

#[tokio::test]
async fn test_live_api_response_updates_cache() {
    let h = harness().await;
    let request = Request::get(url("/api/folders"));
    h.network.respond("/api/folders", Response::new(200, r#"{"folders":["Jazz"]}"#).with_header("content-type", "application/json"));

    let response = h.worker.handle_fetch(request.clone()).await.unwrap();
    assert_eq!(json_body(&response), json!({ "folders": ["Jazz"] }));

    h.worker.settled().await;
    let stored = h.db.match_in("tuneverse-api-v3", &request).await.unwrap().unwrap();
    assert_eq!(stored.body, response.body);
}

#[tokio::test]
async fn test_unreachable_api_serves_prior_cache() {
    let h = harness().await;
    let request = Request::get(url("/api/folders"));
    h.db.put("tuneverse-api-v3", &request, Response::new(200, r#"{"folders":["Rock"]}"#))
        .await
        .unwrap();
    h.network.fail("/api/folders");

    let response = h.worker.handle_fetch(request).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(json_body(&response), json!({ "folders": ["Rock"] }));
}

#[tokio::test]
async fn test_unreachable_api_without_cache_gets_empty_collection() {
    let h = harness().await;
    let response = h.worker.handle_fetch(Request::get(url("/api/folders"))).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(json_body(&response), json!({ "folders": [] }));
    assert!(response.is_fallback());
}

#[tokio::test]
async fn test_image_without_cache_or_network_gets_placeholder() {
    let h = harness().await;
    let request = Request::get(url("/logo.svg")).with_destination(Destination::Image);
    let response = h.worker.handle_fetch(request).await.unwrap();
    assert_eq!(response.status, 200);
    assert!(response.content_type().unwrap().starts_with("image/"));
}

#[tokio::test]
async fn test_cache_size_reply_sums_bodies() {
    let h = harness().await;
    assert_eq!(ask(&h.worker, json!({ "type": "GET_CACHE_SIZE" })).await, Reply::CacheSize { size: 0 });

    h.db.put("tuneverse-api-v3", &Request::get(url("/api/folders")), Response::new(200, "12345"))
        .await
        .unwrap();
    h.db.put("tuneverse-images-v3", &Request::get(url("/logo.svg")), Response::new(200, "1234567"))
        .await
        .unwrap();

    assert_eq!(ask(&h.worker, json!({ "type": "GET_CACHE_SIZE" })).await, Reply::CacheSize { size: 12 });
}

#[tokio::test]
async fn test_now_playing_twice_shows_one_notification() {
    let h = harness().await;
    let message = json!({ "type": "SHOW_NOW_PLAYING", "title": "X", "isPlaying": true });

    assert_eq!(ask(&h.worker, message.clone()).await, Reply::Ack);
    h.worker.handle_message(PendingMessage::new(message)).await;

    let open = h.tray.open().await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].title, "X");
    assert_eq!(open[0].tag, "now-playing");
}

#[tokio::test]
async fn test_clear_cache_keeps_static_shell() {
    let h = harness().await;
    for store in ["tuneverse-api-v3", "tuneverse-runtime-v3", "tuneverse-static-v3"] {
        h.db.put(store, &Request::get(url("/")), Response::new(200, "x")).await.unwrap();
    }

    assert_eq!(ask(&h.worker, json!({ "type": "CLEAR_CACHE" })).await, Reply::CacheCleared { success: true });
    assert_eq!(h.db.store_names().await.unwrap(), vec!["tuneverse-static-v3"]);
}

#[tokio::test]
async fn test_unknown_message_is_ignored() {
    let h = harness().await;
    assert_eq!(ask(&h.worker, json!({ "type": "SYNC_DOWNLOADS" })).await, Reply::Ignored);
    assert_eq!(ask(&h.worker, json!(42)).await, Reply::Ignored);
    h.worker.handle_message(PendingMessage::new(json!({ "nope": true }))).await;
}

#[tokio::test]
async fn test_notification_click_relays_to_pages() {
    let h = harness().await;
    h.clients.add_client("player", "http://localhost:5000/player.html", true).await;
    h.worker
        .handle_message(PendingMessage::new(json!({ "type": "SHOW_NOW_PLAYING", "title": "X" })))
        .await;

    let outcome = h.worker.handle_notification_click(Some(NotificationAction::Rewind)).await.unwrap();
    assert_eq!(outcome.broadcast_to, vec!["player".to_string()]);
    assert!(h.tray.open().await.is_empty());
}

#[tokio::test]
async fn test_cross_origin_and_post_pass_through() {
    let h = harness().await;
    let remote = Request::get("https://i.ytimg.com/vi/abc/hq.jpg".parse().unwrap()).with_destination(Destination::Image);
    assert!(h.worker.handle_fetch(remote).await.is_none());

    let post = Request::get(url("/api/upload")).with_method(tuneverse_core::Method::Post);
    assert!(h.worker.handle_fetch(post).await.is_none());
    assert_eq!(h.network.total_calls(), 0);
}

#[tokio::test]
async fn test_offline_navigation_gets_app_shell() {
    let h = harness().await;
    for path in &h.worker.config().static_manifest {
        h.network.respond(path, Response::new(200, format!("asset {path}")));
    }
    h.worker.install().await.unwrap();
    h.network.go_offline();

    let page = Request::navigate(url("/settings"));
    let response = h.worker.handle_fetch(page).await.unwrap();
    assert_eq!(&response.body[..], b"asset /index.html");
}

#[tokio::test]
async fn test_cache_write_failure_does_not_affect_response() {
    let storage = FailingStorage::new().await;
    let network = ScriptedNetwork::new();
    network.respond("/api/folders", Response::new(200, "live"));
    let worker = ServiceWorker::new(
        Arc::new(AppConfig::default()),
        storage.clone(),
        network,
        Platform::new(Arc::new(InMemoryClients::new()), Arc::new(InMemoryNotifications::granted())),
    )
    .unwrap();

    let response = worker.handle_fetch(Request::get(url("/api/folders"))).await.unwrap();
    assert_eq!(&response.body[..], b"live");
    worker.settled().await;
    assert_eq!(storage.total_size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let request = Request::get(url("/api/folders"));

    {
        let db = Arc::new(CacheDb::open(&path).await.unwrap());
        let h = harness_on(AppConfig::default(), db).await;
        h.network.respond("/api/folders", Response::new(200, r#"{"folders":["Ambient"]}"#));
        h.worker.handle_fetch(request.clone()).await.unwrap();
        h.worker.settled().await;
    }

    let db = Arc::new(CacheDb::open(&path).await.unwrap());
    let h = harness_on(AppConfig::default(), db).await;
    let response = h.worker.handle_fetch(request).await.unwrap();
    assert_eq!(json_body(&response), json!({ "folders": ["Ambient"] }));
}

mod common;

use heritage_map::loader::{load_sites, spawn_initial_load, LoadOutcome, SiteSource};
use heritage_map::server::events::MapEvent;
use heritage_map::server::state::AppState;
use heritage_map::settings::Settings;
use heritage_map::sites::{LoadStatus, SiteStore};
use heritage_map::view::{visible_sites, Theme};

use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use common::SCENARIO_SITES;

const TIMEOUT: Duration = Duration::from_secs(5);

fn remote_source(server: &mockito::ServerGuard) -> SiteSource {
    SiteSource::parse(&format!("{}/data.json", server.url())).unwrap()
}

#[tokio::test]
async fn loads_remote_document_without_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/data.json")
        .match_header("cache-control", "no-cache")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SCENARIO_SITES)
        .expect(1)
        .create_async()
        .await;

    let store = SiteStore::new();
    let outcome = load_sites(&store, &remote_source(&server), TIMEOUT).await;
    mock.assert_async().await;

    assert_eq!(outcome, LoadOutcome::Loaded { count: 2, skipped: 0 });
    let sites = store.sites();
    let visible: Vec<&str> = visible_sites(&sites, &Theme::parse("cuisine"), 1800)
        .into_iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(visible, ["A"]);
}

#[tokio::test]
async fn not_found_leaves_list_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/data.json")
        .with_status(404)
        .create_async()
        .await;

    let store = SiteStore::new();
    let outcome = load_sites(&store, &remote_source(&server), TIMEOUT).await;

    match outcome {
        LoadOutcome::Failed { message } => assert!(message.contains("404")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(store.is_empty());
    assert!(matches!(store.status(), LoadStatus::Failed { .. }));
}

#[tokio::test]
async fn malformed_json_leaves_list_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/data.json")
        .with_status(200)
        .with_body("[{\"name\": \"A\", ")
        .create_async()
        .await;

    let store = SiteStore::new();
    let outcome = load_sites(&store, &remote_source(&server), TIMEOUT).await;
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn unreachable_host_does_not_escape_loader() {
    // Nothing listens on port 9 locally
    let source = SiteSource::parse("http://127.0.0.1:9/data.json").unwrap();
    let store = SiteStore::new();
    let outcome = load_sites(&store, &source, TIMEOUT).await;
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn stalled_server_times_out() {
    // Accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let source = SiteSource::parse(&format!("http://{}/data.json", addr)).unwrap();
    let store = SiteStore::new();
    let started = Instant::now();
    let outcome = load_sites(&store, &source, Duration::from_millis(200)).await;

    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    assert!(started.elapsed() < TIMEOUT);
    assert!(store.is_empty());
    assert!(matches!(store.status(), LoadStatus::Failed { .. }));
}

#[tokio::test]
async fn loads_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, SCENARIO_SITES).unwrap();

    let store = SiteStore::new();
    let outcome = load_sites(&store, &SiteSource::File(path), TIMEOUT).await;
    assert_eq!(outcome, LoadOutcome::Loaded { count: 2, skipped: 0 });
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn initial_load_announces_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, SCENARIO_SITES).unwrap();

    let settings = Settings {
        data_source: path.to_string_lossy().to_string(),
        ..Settings::default()
    };
    let state = AppState::new(settings);
    let mut events = state.event_sender.subscribe();

    let outcome = spawn_initial_load(state.clone()).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { count: 2, .. }));

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, MapEvent::SITES_LOADED);
    assert_eq!(event.data.site_count, Some(2));
    assert_eq!(state.store.len(), 2);
}

#[tokio::test]
async fn failed_initial_load_announces_failure() {
    let settings = Settings {
        data_source: "/nonexistent/heritage/data.json".to_string(),
        ..Settings::default()
    };
    let state = AppState::new(settings);
    let mut events = state.event_sender.subscribe();

    let outcome = spawn_initial_load(state.clone()).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, MapEvent::LOAD_FAILED);
    assert!(event.data.message.is_some());
    assert!(state.store.is_empty());
}

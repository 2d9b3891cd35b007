use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use heritage_map::loader::decode_sites;
use heritage_map::server::{create_app, state::AppState};
use heritage_map::settings::Settings;

pub const SCENARIO_SITES: &str = r#"[
    {"name":"A","category":"cuisine","year":1700,"coords":[10,10],"info":"first"},
    {"name":"B","category":"arts","year":1950,"coords":[20,20],"info":"second"}
]"#;

/// State with the given document already loaded.
pub fn loaded_state(settings: Settings, document: &str) -> AppState {
    let state = AppState::new(settings);
    let (sites, _) = decode_sites(document.as_bytes()).unwrap();
    assert!(state.store.install(sites));
    state
}

pub fn app(state: AppState) -> Router {
    create_app(state)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

pub async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

pub fn marker_names(response: &Value) -> Vec<String> {
    response["markers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect()
}

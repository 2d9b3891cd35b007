use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{Html, IntoResponse, Json, Response},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::events::MapEvent;
use super::state::AppState;
use crate::constants::{DEFAULT_YEAR, MAP_CENTER, MAP_MAX_ZOOM, MAP_ZOOM, TILE_ATTRIBUTION, TILE_URL};
use crate::render::{Marker, MarkerAnimation, MarkerLayer, MarkerStyle, Renderer};
use crate::sites::{Category, LoadStatus, Site};
use crate::view::{parse_year, Theme, ViewEvent, ViewState, YearRange};

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct Asset;

/// Simple MIME type detection based on file extension
fn get_mime_type(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn embedded(path: &str) -> Result<Response, StatusCode> {
    let content = Asset::get(path).ok_or_else(|| {
        warn!(path, "Embedded asset not found");
        StatusCode::NOT_FOUND
    })?;
    Ok((
        [(header::CONTENT_TYPE, get_mime_type(path))],
        content.data.into_owned(),
    )
        .into_response())
}

pub async fn index_html() -> Result<Html<Vec<u8>>, StatusCode> {
    let content = Asset::get("index.html").ok_or(StatusCode::NOT_FOUND)?;
    Ok(Html(content.data.into_owned()))
}

pub async fn style_css() -> Result<Response, StatusCode> {
    embedded("style.css")
}

pub async fn script_js() -> Result<Response, StatusCode> {
    embedded("script.js")
}

pub async fn category_icon(AxumPath(name): AxumPath<String>) -> Result<Response, StatusCode> {
    if name.contains("..") {
        return Err(StatusCode::NOT_FOUND);
    }
    let mut response = embedded(&format!("icons/{}", name))?;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct ThemeOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct YearSlider {
    pub min: i64,
    pub max: i64,
    pub initial: i64,
}

/// Marker animation as the page plays it: one scale step per frame.
#[derive(Debug, Serialize)]
pub struct AnimationConfig {
    pub max_radius: f64,
    pub interval_ms: u64,
    pub frames: Vec<f64>,
}

impl From<MarkerAnimation> for AnimationConfig {
    fn from(animation: MarkerAnimation) -> Self {
        AnimationConfig {
            max_radius: animation.max_radius,
            interval_ms: animation.interval_ms,
            frames: animation.frames(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MapConfig {
    pub center: [f64; 2],
    pub zoom: u8,
    pub max_zoom: u8,
    pub tile_url: &'static str,
    pub attribution: &'static str,
    pub year: YearSlider,
    pub marker_style: MarkerStyle,
    pub animation: Option<AnimationConfig>,
    pub themes: Vec<ThemeOption>,
    pub sidebar_collapsed: bool,
}

// Everything the page needs to build the map and the sidebar
pub async fn get_config(State(state): State<AppState>) -> Json<MapConfig> {
    let settings = &state.settings;
    let range = settings.year_range();

    let mut themes = vec![ThemeOption {
        id: Theme::ALL_ID.to_string(),
        label: "All".to_string(),
    }];
    themes.extend(Category::KNOWN.iter().map(|c| ThemeOption {
        id: c.as_str().to_string(),
        label: c.label().to_string(),
    }));

    Json(MapConfig {
        center: MAP_CENTER,
        zoom: MAP_ZOOM,
        max_zoom: MAP_MAX_ZOOM,
        tile_url: TILE_URL,
        attribution: TILE_ATTRIBUTION,
        year: YearSlider {
            min: range.min,
            max: range.max,
            initial: range.clamp(DEFAULT_YEAR),
        },
        marker_style: settings.marker_style,
        animation: settings
            .animate_markers
            .then(|| MarkerAnimation::default().into()),
        themes,
        sidebar_collapsed: settings.sidebar_collapsed,
    })
}

pub async fn get_sites(State(state): State<AppState>) -> Json<Vec<Site>> {
    Json(state.store.sites().as_ref().clone())
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub loaded: bool,
    pub site_count: usize,
    pub error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl From<LoadStatus> for StatusResponse {
    fn from(status: LoadStatus) -> Self {
        match status {
            LoadStatus::Pending => StatusResponse {
                loaded: false,
                site_count: 0,
                error: None,
                loaded_at: None,
            },
            LoadStatus::Loaded { count, at } => StatusResponse {
                loaded: true,
                site_count: count,
                error: None,
                loaded_at: Some(at),
            },
            LoadStatus::Failed { message } => StatusResponse {
                loaded: false,
                site_count: 0,
                error: Some(message),
                loaded_at: None,
            },
        }
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.store.status().into())
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view: ViewState,
    pub markers: Vec<Marker>,
    pub total: usize,
}

/// Full redraw of a fresh marker layer for `view`.
fn render_view(state: &AppState, view: ViewState) -> ViewResponse {
    let sites = state.store.sites();
    let mut renderer = Renderer::new(MarkerLayer::new(), state.settings.render_options());
    let drawn = renderer.redraw(&sites, &view);
    debug!(theme = %view.theme, year = view.year, drawn, total = sites.len(), "Redraw");

    ViewResponse {
        view,
        markers: renderer.into_widget().into_markers(),
        total: sites.len(),
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkersQuery {
    pub theme: Option<String>,
    pub year: Option<String>,
}

pub async fn get_markers(
    State(state): State<AppState>,
    Query(query): Query<MarkersQuery>,
) -> Result<Json<ViewResponse>, StatusCode> {
    let range: YearRange = state.settings.year_range();
    let mut view = ViewState::default();

    if let Some(theme) = query.theme.filter(|t| !t.is_empty()) {
        view = view.apply(
            ViewEvent::SelectTheme {
                theme: Theme::parse(&theme),
            },
            &range,
        );
    }
    let year = match query.year {
        Some(year) => parse_year(&year).ok_or(StatusCode::BAD_REQUEST)?,
        None => DEFAULT_YEAR,
    };
    view = view.apply(ViewEvent::SetYear { year }, &range);

    Ok(Json(render_view(&state, view)))
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub view: ViewState,
    pub event: ViewEvent,
}

// UI interactions arrive here as transition requests. The client's view is
// only a starting point; `apply` keeps the result inside the slider range.
pub async fn post_view(
    State(state): State<AppState>,
    Json(request): Json<ViewRequest>,
) -> Json<ViewResponse> {
    let view = request.view.apply(request.event, &state.settings.year_range());
    Json(render_view(&state, view))
}

// SSE endpoint for loader events
pub async fn map_events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);

    let event_receiver = state.event_sender.subscribe();
    tokio::spawn(forward_events(event_receiver, tx));

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive-message"),
    )
}

/// Relays broadcast events to one SSE client until either side goes away.
async fn forward_events(
    mut event_receiver: broadcast::Receiver<MapEvent>,
    tx: mpsc::Sender<Result<SseEvent, Infallible>>,
) {
    loop {
        tokio::select! {
            event = event_receiver.recv() => {
                match event {
                    Ok(map_event) => {
                        let sse_event = SseEvent::default()
                            .json_data(&map_event)
                            .unwrap_or_else(|_| SseEvent::default().data("Error serializing event"));

                        if tx.send(Ok(sse_event)).await.is_err() {
                            break; // Client disconnected
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event stream lagged behind, continuing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = tokio::time::sleep(Duration::from_secs(30)) => {
                let sse_event = SseEvent::default()
                    .json_data(MapEvent::heartbeat())
                    .unwrap_or_else(|_| SseEvent::default().data("Error serializing heartbeat"));

                if tx.send(Ok(sse_event)).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types() {
        assert_eq!(get_mime_type("style.css"), "text/css");
        assert_eq!(get_mime_type("icons/cuisine.svg"), "image/svg+xml");
        assert_eq!(get_mime_type("README"), "application/octet-stream");
    }

    #[test]
    fn status_mirrors_load_outcome() {
        let status = StatusResponse::from(LoadStatus::Failed {
            message: "boom".to_string(),
        });
        assert!(!status.loaded);
        assert_eq!(status.error.as_deref(), Some("boom"));
        assert!(status.loaded_at.is_none());

        let at = Utc::now();
        let status = StatusResponse::from(LoadStatus::Loaded { count: 3, at });
        assert!(status.loaded);
        assert_eq!(status.site_count, 3);
        assert_eq!(status.loaded_at, Some(at));
        assert!(status.error.is_none());

        let json = serde_json::to_value(StatusResponse::from(LoadStatus::Pending)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"loaded": false, "site_count": 0, "error": null, "loaded_at": null})
        );
    }

    #[tokio::test]
    async fn lagging_client_keeps_receiving() {
        let (sender, receiver) = broadcast::channel(1);
        for count in 1..=3 {
            sender.send(MapEvent::sites_loaded(count)).unwrap();
        }

        let (tx, mut rx) = mpsc::channel(10);
        let forwarder = tokio::spawn(forward_events(receiver, tx));

        // The two overwritten events are skipped, the newest still arrives
        assert!(matches!(rx.recv().await, Some(Ok(_))));

        drop(sender);
        forwarder.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn frontend_is_embedded() {
        for path in ["index.html", "style.css", "script.js"] {
            assert!(Asset::get(path).is_some(), "missing {}", path);
        }
        for category in Category::KNOWN {
            let path = format!("icons/{}.svg", category.as_str());
            assert!(Asset::get(&path).is_some(), "missing {}", path);
        }
    }
}

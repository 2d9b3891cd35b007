use serde::{Deserialize, Serialize};

// SSE event types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEvent {
    pub event_type: String,
    pub data: MapEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapEventData {
    pub site_count: Option<usize>,
    pub message: Option<String>,
}

impl MapEvent {
    pub const SITES_LOADED: &'static str = "sites_loaded";
    pub const LOAD_FAILED: &'static str = "load_failed";
    pub const HEARTBEAT: &'static str = "heartbeat";

    pub fn sites_loaded(count: usize) -> Self {
        MapEvent {
            event_type: Self::SITES_LOADED.to_string(),
            data: MapEventData {
                site_count: Some(count),
                ..Default::default()
            },
        }
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        MapEvent {
            event_type: Self::LOAD_FAILED.to_string(),
            data: MapEventData {
                site_count: Some(0),
                message: Some(message.into()),
            },
        }
    }

    pub fn heartbeat() -> Self {
        MapEvent {
            event_type: Self::HEARTBEAT.to_string(),
            data: MapEventData {
                message: Some("SSE connection alive".to_string()),
                ..Default::default()
            },
        }
    }
}

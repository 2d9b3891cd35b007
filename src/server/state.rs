use std::sync::Arc;
use tokio::sync::broadcast;

use super::events::MapEvent;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::settings::Settings;
use crate::sites::SiteStore;

// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SiteStore,
    pub settings: Arc<Settings>,
    pub event_sender: broadcast::Sender<MapEvent>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        AppState {
            store: SiteStore::new(),
            settings: Arc::new(settings),
            event_sender,
        }
    }
}

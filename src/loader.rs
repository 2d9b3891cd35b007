//! Loads the site document once at startup.

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::server::events::MapEvent;
use crate::server::state::AppState;
use crate::sites::{Site, SiteStore};

#[derive(Debug, Clone, PartialEq)]
pub enum SiteSource {
    Http(Url),
    File(PathBuf),
}

impl SiteSource {
    /// `http://` and `https://` strings are fetched over the network,
    /// anything else is a path on disk.
    pub fn parse(source: &str) -> Result<Self, LoadError> {
        let trimmed = source.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(SiteSource::Http(Url::parse(trimmed)?))
        } else {
            Ok(SiteSource::File(PathBuf::from(trimmed)))
        }
    }
}

impl std::fmt::Display for SiteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteSource::Http(url) => write!(f, "{}", url),
            SiteSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Connection error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response `{0}`")]
    Status(StatusCode),
    #[error("Could not read site file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed site document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid site URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result of the one load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded { count: usize, skipped: usize },
    Failed { message: String },
}

/// Fetches and decodes the document. One attempt, no retries; a remote
/// fetch that has not finished within `timeout` fails.
pub async fn fetch_sites(
    source: &SiteSource,
    timeout: Duration,
) -> Result<(Vec<Site>, usize), LoadError> {
    let body = match source {
        SiteSource::Http(url) => fetch_remote(url, timeout).await?,
        SiteSource::File(path) => read_local(path).await?,
    };
    decode_sites(&body)
}

async fn fetch_remote(url: &Url, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .get(url.clone())
        .header(CACHE_CONTROL, "no-cache")
        .header(PRAGMA, "no-cache")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(LoadError::Status(response.status()));
    }
    Ok(response.bytes().await?.to_vec())
}

async fn read_local(path: &Path) -> Result<Vec<u8>, LoadError> {
    Ok(tokio::fs::read(path).await?)
}

/// Decodes a JSON array of site records.
///
/// The document must be an array. Individual records that do not decode are
/// skipped with a warning; the count of skipped records is returned.
pub fn decode_sites(body: &[u8]) -> Result<(Vec<Site>, usize), LoadError> {
    let raw: Vec<serde_json::Value> = serde_json::from_slice(body)?;
    let mut sites = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<Site>(value) {
            Ok(site) => sites.push(site),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed site record");
                skipped += 1;
            }
        }
    }
    Ok((sites, skipped))
}

/// Loads into the store. Failures are logged and leave the store empty;
/// this never returns an error.
pub async fn load_sites(store: &SiteStore, source: &SiteSource, timeout: Duration) -> LoadOutcome {
    debug!(%source, ?timeout, "Fetching site list");
    match fetch_sites(source, timeout).await {
        Ok((sites, skipped)) => {
            let count = sites.len();
            if !store.install(sites) {
                warn!("Site list already loaded, ignoring second load");
            }
            info!(count, skipped, %source, "Site list loaded");
            LoadOutcome::Loaded { count, skipped }
        }
        Err(e) => {
            error!(%source, error = %e, "Error loading site list");
            let message = e.to_string();
            store.mark_failed(message.clone());
            LoadOutcome::Failed { message }
        }
    }
}

/// Runs the initial load in the background and announces the result.
pub fn spawn_initial_load(state: AppState) -> tokio::task::JoinHandle<LoadOutcome> {
    tokio::spawn(async move {
        let outcome = match SiteSource::parse(&state.settings.data_source) {
            Ok(source) => load_sites(&state.store, &source, state.settings.fetch_timeout()).await,
            Err(e) => {
                error!(source = %state.settings.data_source, error = %e, "Invalid data source");
                let message = e.to_string();
                state.store.mark_failed(message.clone());
                LoadOutcome::Failed { message }
            }
        };

        let event = match &outcome {
            LoadOutcome::Loaded { count, .. } => MapEvent::sites_loaded(*count),
            LoadOutcome::Failed { message } => MapEvent::load_failed(message.clone()),
        };
        // No subscribers yet is fine; the page also polls /api/status
        let _ = state.event_sender.send(event);
        outcome
    })
}

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use heritage_map::loader::spawn_initial_load;
use heritage_map::server::{state::AppState, start_server};
use heritage_map::settings::Settings;
use heritage_map::utils::open_browser;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    info!("Heritage Map v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().context("Failed to load settings")?;
    info!(
        port = settings.port,
        data_source = %settings.data_source,
        marker_style = settings.marker_style.as_str(),
        "Settings loaded"
    );

    let url = format!("http://127.0.0.1:{}", settings.port);
    let auto_open = settings.auto_open_browser;
    let app_state = AppState::new(settings);

    // The page draws as soon as the loader announces the list
    spawn_initial_load(app_state.clone());

    if auto_open {
        if let Err(e) = open_browser(&url) {
            warn!(error = %e, "Could not open browser");
        }
    }

    start_server(app_state).await?;

    info!("Server stopped");
    Ok(())
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::{DEFAULT_DATA_SOURCE, DEFAULT_PORT, FETCH_TIMEOUT_SECS, YEAR_MAX, YEAR_MIN};
use crate::render::{MarkerStyle, RenderOptions};
use crate::view::YearRange;

pub const CONFIG_FILE_NAME: &str = "heritage_map.ini";
pub const ENV_PORT: &str = "HERITAGE_MAP_PORT";
pub const ENV_DATA: &str = "HERITAGE_MAP_DATA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub port: u16,
    /// Path or http(s) URL of the site document.
    pub data_source: String,
    /// Upper bound on the whole remote fetch, in seconds.
    pub fetch_timeout_secs: u64,
    pub marker_style: MarkerStyle,
    pub show_year_in_popup: bool,
    pub animate_markers: bool,
    pub year_min: i64,
    pub year_max: i64,
    pub sidebar_collapsed: bool,
    pub auto_open_browser: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            marker_style: MarkerStyle::CategoryIcons,
            show_year_in_popup: true,
            animate_markers: true,
            year_min: YEAR_MIN,
            year_max: YEAR_MAX,
            sidebar_collapsed: false,
            auto_open_browser: false,
        }
    }
}

impl Settings {
    /// Loads from the config file next to the executable, then applies
    /// environment overrides. A missing file is written out with defaults.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_or_init(&Self::config_path())?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn load_or_init(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load_from(config_path);
        }
        let settings = Settings::default();
        match settings.save_to(config_path) {
            Ok(()) => info!(path = %config_path.display(), "Wrote default config"),
            Err(e) => warn!(path = %config_path.display(), error = %e, "Could not write default config"),
        }
        Ok(settings)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Parses `key = value` lines. Comments start with `#`; unknown keys and
    /// values that do not parse leave the default in place.
    pub fn parse(content: &str) -> Self {
        let mut config_map = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
            }
        }

        let mut settings = Settings::default();
        settings.apply_overrides(|key| config_map.get(key).cloned());
        settings
    }

    /// `HERITAGE_MAP_PORT` and `HERITAGE_MAP_DATA` win over the file.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup(ENV_PORT).and_then(|p| parse_logged::<u16>(ENV_PORT, &p)) {
            self.port = port;
        }
        if let Some(source) = lookup(ENV_DATA).filter(|s| !s.trim().is_empty()) {
            self.data_source = source;
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("port").and_then(|p| parse_logged::<u16>("port", &p)) {
            self.port = port;
        }
        if let Some(source) = lookup("data_source").filter(|s| !s.is_empty()) {
            self.data_source = source;
        }
        if let Some(secs) = lookup("fetch_timeout_secs").and_then(|s| parse_logged::<u64>("fetch_timeout_secs", &s)) {
            if secs > 0 {
                self.fetch_timeout_secs = secs;
            } else {
                warn!("fetch_timeout_secs must be positive, keeping {}", self.fetch_timeout_secs);
            }
        }
        if let Some(style) = lookup("marker_style").and_then(|s| parse_logged("marker_style", &s)) {
            self.marker_style = style;
        }
        if let Some(v) = lookup("show_year_in_popup").and_then(|s| parse_logged("show_year_in_popup", &s)) {
            self.show_year_in_popup = v;
        }
        if let Some(v) = lookup("animate_markers").and_then(|s| parse_logged("animate_markers", &s)) {
            self.animate_markers = v;
        }
        if let Some(v) = lookup("year_min").and_then(|s| parse_logged("year_min", &s)) {
            self.year_min = v;
        }
        if let Some(v) = lookup("year_max").and_then(|s| parse_logged("year_max", &s)) {
            self.year_max = v;
        }
        if let Some(v) = lookup("sidebar_collapsed").and_then(|s| parse_logged("sidebar_collapsed", &s)) {
            self.sidebar_collapsed = v;
        }
        if let Some(v) = lookup("auto_open_browser").and_then(|s| parse_logged("auto_open_browser", &s)) {
            self.auto_open_browser = v;
        }

        if self.year_min > self.year_max {
            warn!(
                year_min = self.year_min,
                year_max = self.year_max,
                "year_min is above year_max, using default slider range"
            );
            self.year_min = YEAR_MIN;
            self.year_max = YEAR_MAX;
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }

        let mut content = String::new();
        content.push_str("# Heritage Map Configuration File\n");
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("data_source = \"{}\"\n", self.data_source));
        content.push_str(&format!("fetch_timeout_secs = {}\n", self.fetch_timeout_secs));
        content.push_str(&format!("marker_style = {}\n", self.marker_style.as_str()));
        content.push_str(&format!("show_year_in_popup = {}\n", self.show_year_in_popup));
        content.push_str(&format!("animate_markers = {}\n", self.animate_markers));
        content.push_str(&format!("year_min = {}\n", self.year_min));
        content.push_str(&format!("year_max = {}\n", self.year_max));
        content.push_str(&format!("sidebar_collapsed = {}\n", self.sidebar_collapsed));
        content.push_str(&format!("auto_open_browser = {}\n", self.auto_open_browser));

        std::fs::write(config_path, content).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn year_range(&self) -> YearRange {
        YearRange {
            min: self.year_min,
            max: self.year_max,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            marker_style: self.marker_style,
            show_year: self.show_year_in_popup,
        }
    }

    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .unwrap_or_default()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        if path.ends_with("target/debug") || path.ends_with("target/release") {
            path.pop();
            path.pop();
        }
        path.push(CONFIG_FILE_NAME);
        path
    }
}

fn parse_logged<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value, "Ignoring unparsable setting");
            None
        }
    }
}

// Port configuration
pub const DEFAULT_PORT: u16 = 3001;

// Where the site list comes from unless settings say otherwise
pub const DEFAULT_DATA_SOURCE: &str = "data.json";
pub const FETCH_TIMEOUT_SECS: u64 = 30;

// Map view: centered on India
pub const MAP_CENTER: [f64; 2] = [20.5937, 78.9629];
pub const MAP_ZOOM: u8 = 5;
pub const MAP_MAX_ZOOM: u8 = 18;
pub const TILE_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
pub const TILE_ATTRIBUTION: &str = "© OpenStreetMap contributors, © CARTO";

// Timeline slider
pub const DEFAULT_YEAR: i64 = 2025;
pub const YEAR_MIN: i64 = 0;
pub const YEAR_MAX: i64 = 2025;

// Category icons (pixels)
pub const ICON_SIZE: [i32; 2] = [32, 37];
pub const ICON_ANCHOR: [i32; 2] = [16, 37];
pub const POPUP_ANCHOR: [i32; 2] = [0, -28];
pub const POPUP_MIN_WIDTH: u32 = 220;

// Radius ramp played once after the first load
pub const ANIMATION_MAX_RADIUS: f64 = 8.0;
pub const ANIMATION_STEP: f64 = 0.5;
pub const ANIMATION_INTERVAL_MS: u64 = 20;

// Broadcast capacity for loader events
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

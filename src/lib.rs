//! Interactive map of India's cultural sites.
//!
//! The server loads a site list once, filters it by theme and year, and
//! serves a Leaflet page that draws whatever marker set the filter yields.

pub mod constants;
pub mod loader;
pub mod render;
pub mod server;
pub mod settings;
pub mod sites;
pub mod utils;
pub mod view;

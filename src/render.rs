//! Filter-and-render engine.
//!
//! Every redraw is a full recompute: the widget's marker layer is cleared and
//! refilled from the site list and the current [`ViewState`]. At the scale of
//! this data set there is no incremental diffing.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

use crate::constants::{
    ANIMATION_INTERVAL_MS, ANIMATION_MAX_RADIUS, ANIMATION_STEP, ICON_ANCHOR, ICON_SIZE, POPUP_ANCHOR,
    POPUP_MIN_WIDTH,
};
use crate::sites::{Category, Site};
use crate::view::{visible_sites, ViewState};

/// The map-side collaborator. The Leaflet `layerGroup` in the page is the
/// remote counterpart of this trait.
pub trait MapWidget {
    fn clear_markers(&mut self);
    fn add_markers(&mut self, markers: Vec<Marker>);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconSpec {
    pub url: String,
    pub size: [i32; 2],
    pub anchor: [i32; 2],
    pub popup_anchor: [i32; 2],
}

impl IconSpec {
    /// Icon for a category. Unknown categories get the monuments icon.
    pub fn for_category(category: &Category) -> Self {
        let id = if category.is_known() {
            category.as_str()
        } else {
            Category::MonumentsAndArchitecture.as_str()
        };
        IconSpec {
            url: format!("/icons/{}.svg", id),
            size: ICON_SIZE,
            anchor: ICON_ANCHOR,
            popup_anchor: POPUP_ANCHOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub name: String,
    pub coords: [f64; 2],
    /// `None` means the map library's default marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconSpec>,
    pub popup_html: String,
    pub popup_min_width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    #[default]
    CategoryIcons,
    Default,
}

impl FromStr for MarkerStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icons" | "category_icons" => Ok(MarkerStyle::CategoryIcons),
            "default" => Ok(MarkerStyle::Default),
            other => Err(format!("unknown marker style: {}", other)),
        }
    }
}

impl MarkerStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerStyle::CategoryIcons => "icons",
            MarkerStyle::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub marker_style: MarkerStyle,
    pub show_year: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            marker_style: MarkerStyle::CategoryIcons,
            show_year: true,
        }
    }
}

/// Radius ramp the page plays on markers after the first load. Cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerAnimation {
    pub max_radius: f64,
    pub step: f64,
    pub interval_ms: u64,
}

impl Default for MarkerAnimation {
    fn default() -> Self {
        MarkerAnimation {
            max_radius: ANIMATION_MAX_RADIUS,
            step: ANIMATION_STEP,
            interval_ms: ANIMATION_INTERVAL_MS,
        }
    }
}

impl MarkerAnimation {
    /// Radii shown at each tick, ending exactly at `max_radius`.
    pub fn frames(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.max_radius <= 0.0 {
            return vec![self.max_radius.max(0.0)];
        }
        let mut frames = Vec::new();
        let mut radius = 0.0;
        loop {
            radius += self.step;
            if radius >= self.max_radius {
                frames.push(self.max_radius);
                return frames;
            }
            frames.push(radius);
        }
    }
}

/// In-memory marker layer. Serializes to the array the page draws.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_markers(self) -> Vec<Marker> {
        self.markers
    }
}

impl MapWidget for MarkerLayer {
    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn add_markers(&mut self, markers: Vec<Marker>) {
        self.markers.extend(markers);
    }
}

pub struct Renderer<W: MapWidget> {
    widget: W,
    options: RenderOptions,
}

impl<W: MapWidget> Renderer<W> {
    pub fn new(widget: W, options: RenderOptions) -> Self {
        Renderer { widget, options }
    }

    pub fn into_widget(self) -> W {
        self.widget
    }

    /// Clears the layer and draws every site visible under `view`, in one
    /// batch. Returns the number of markers drawn.
    pub fn redraw(&mut self, sites: &[Site], view: &ViewState) -> usize {
        self.widget.clear_markers();

        let markers: Vec<Marker> = visible_sites(sites, &view.theme, view.year)
            .into_iter()
            .map(|site| build_marker(site, &self.options))
            .collect();
        let count = markers.len();

        self.widget.add_markers(markers);
        count
    }
}

pub fn build_marker(site: &Site, options: &RenderOptions) -> Marker {
    let icon = match options.marker_style {
        MarkerStyle::CategoryIcons => Some(IconSpec::for_category(&site.category)),
        MarkerStyle::Default => None,
    };
    Marker {
        name: site.name.clone(),
        coords: site.coords,
        icon,
        popup_html: popup_html(site, options.show_year),
        popup_min_width: POPUP_MIN_WIDTH,
    }
}

/// Popup markup for a site. All record fields are escaped.
pub fn popup_html(site: &Site, show_year: bool) -> String {
    let name = escape_html(&site.name);
    let mut html = String::from(r#"<div class="site-popup">"#);

    if let Some(url) = site.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
        html.push_str(&format!(
            r#"<img src="{}" alt="{}" class="site-popup-image">"#,
            escape_html(url),
            name
        ));
    }
    html.push_str(&format!(r#"<h4 class="site-popup-title">{}</h4>"#, name));
    html.push_str(&format!(
        r#"<div class="site-popup-info">{}</div>"#,
        escape_html(&site.info)
    ));
    if show_year {
        html.push_str(&format!(
            r#"<div class="site-popup-year">Year: {}</div>"#,
            site.year
        ));
    }
    html.push_str("</div>");
    html
}

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

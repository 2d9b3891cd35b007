//! Selection state for the map and the visibility predicate.
//!
//! The view state is a plain value. UI interactions arrive as [`ViewEvent`]s
//! and produce a new state through [`ViewState::apply`]; nothing here touches
//! a widget, so filtering can be exercised without a browser.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::{DEFAULT_YEAR, YEAR_MAX, YEAR_MIN};
use crate::sites::{Category, NumberOrText, Site};

/// Theme filter: either everything or one category identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    All,
    Category(String),
}

impl Theme {
    pub const ALL_ID: &'static str = "all";

    pub fn parse(id: &str) -> Self {
        if id == Self::ALL_ID {
            Theme::All
        } else {
            Theme::Category(id.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Theme::All => Self::ALL_ID,
            Theme::Category(id) => id,
        }
    }

    /// Exact string match on the category identifier, so an unrecognized
    /// category only ever shows up under `all`.
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            Theme::All => true,
            Theme::Category(id) => category.as_str() == id,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Theme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(Theme::parse(&id))
    }
}

/// Inclusive bounds of the timeline slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub min: i64,
    pub max: i64,
}

impl Default for YearRange {
    fn default() -> Self {
        YearRange {
            min: YEAR_MIN,
            max: YEAR_MAX,
        }
    }
}

impl YearRange {
    pub fn clamp(&self, year: i64) -> i64 {
        year.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_year", deserialize_with = "lenient_year")]
    pub year: i64,
}

fn default_year() -> i64 {
    DEFAULT_YEAR
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            theme: Theme::All,
            year: DEFAULT_YEAR,
        }
    }
}

/// A state-transition request coming from the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    /// A filter button was clicked.
    SelectTheme { theme: Theme },
    /// The timeline slider moved.
    SetYear {
        #[serde(deserialize_with = "lenient_year")]
        year: i64,
    },
}

/// Accepts `1800`, `1800.0` and `"1800"`, the way a range input reports values.
pub(crate) fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = NumberOrText::deserialize(deserializer)?;
    parse_year_value(&raw).ok_or_else(|| serde::de::Error::custom("year must be numeric"))
}

fn parse_year_value(raw: &NumberOrText) -> Option<i64> {
    raw.to_f64()
        .filter(|v| v.is_finite())
        .map(|v| v.floor() as i64)
}

/// Parses a year given as query text.
pub fn parse_year(text: &str) -> Option<i64> {
    parse_year_value(&NumberOrText::Text(text.to_string()))
}

impl ViewState {
    pub fn new(theme: Theme, year: i64) -> Self {
        ViewState { theme, year }
    }

    /// Applies one UI event. The slider range is the only bound on the year,
    /// and every resulting state lies inside it whatever state it came from.
    pub fn apply(self, event: ViewEvent, range: &YearRange) -> ViewState {
        let (theme, year) = match event {
            ViewEvent::SelectTheme { theme } => (theme, self.year),
            ViewEvent::SetYear { year } => (self.theme, year),
        };
        ViewState {
            theme,
            year: range.clamp(year),
        }
    }
}

/// Sites visible under the given selection, in source order.
pub fn visible_sites<'a>(sites: &'a [Site], theme: &Theme, year: i64) -> Vec<&'a Site> {
    sites
        .iter()
        .filter(|site| theme.matches(&site.category) && site.year.is_on_or_before(year))
        .collect()
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// One cultural point of interest, as it appears in the site document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    #[serde(default)]
    pub category: Category,
    pub coords: [f64; 2], // (lat, lng)
    #[serde(default)]
    pub year: Year,
    #[serde(default)]
    pub info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Site theme. Unknown identifiers are kept verbatim so they still
/// round-trip and still never match a specific theme filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    MonumentsAndArchitecture,
    FolkArtsAndHandcrafts,
    MusicAndDance,
    Cuisine,
    FestivalsAndTraditions,
    SpiritualAndPilgrimage,
    NatureAndWildlife,
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 7] = [
        Category::MonumentsAndArchitecture,
        Category::FolkArtsAndHandcrafts,
        Category::MusicAndDance,
        Category::Cuisine,
        Category::FestivalsAndTraditions,
        Category::SpiritualAndPilgrimage,
        Category::NatureAndWildlife,
    ];

    pub fn from_id(id: &str) -> Self {
        match id {
            "monuments_and_architecture" => Category::MonumentsAndArchitecture,
            "folk_arts_and_handcrafts" => Category::FolkArtsAndHandcrafts,
            "music_and_dance" => Category::MusicAndDance,
            "cuisine" => Category::Cuisine,
            "festivals_and_traditions" => Category::FestivalsAndTraditions,
            // The data set spells it this way
            "spiritual_and_pilgriange" => Category::SpiritualAndPilgrimage,
            "nature_and_wildlife" => Category::NatureAndWildlife,
            other => Category::Other(other.to_string()),
        }
    }

    /// Identifier used in the data file, theme buttons and icon file names.
    pub fn as_str(&self) -> &str {
        match self {
            Category::MonumentsAndArchitecture => "monuments_and_architecture",
            Category::FolkArtsAndHandcrafts => "folk_arts_and_handcrafts",
            Category::MusicAndDance => "music_and_dance",
            Category::Cuisine => "cuisine",
            Category::FestivalsAndTraditions => "festivals_and_traditions",
            Category::SpiritualAndPilgrimage => "spiritual_and_pilgriange",
            Category::NatureAndWildlife => "nature_and_wildlife",
            Category::Other(id) => id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Category::MonumentsAndArchitecture => "Monuments & Architecture",
            Category::FolkArtsAndHandcrafts => "Folk Arts & Handcrafts",
            Category::MusicAndDance => "Music & Dance",
            Category::Cuisine => "Cuisine",
            Category::FestivalsAndTraditions => "Festivals & Traditions",
            Category::SpiritualAndPilgrimage => "Spiritual & Pilgrimage",
            Category::NatureAndWildlife => "Nature & Wildlife",
            Category::Other(id) => id,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other(String::new())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // null is treated like a missing field
        let id = Option::<String>::deserialize(deserializer)?;
        Ok(id.map(|id| Category::from_id(&id)).unwrap_or_default())
    }
}

/// A JSON scalar that should be read as a number: either a number or
/// a numeric string such as `"1700"`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub(crate) fn to_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// Founding/occurrence year of a site.
///
/// Stored as a float so that string and numeric inputs compare the same way.
/// A value that is not a number never satisfies a year bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Year(f64);

impl Year {
    pub fn new(value: f64) -> Self {
        Year(value)
    }

    pub fn value(&self) -> Option<f64> {
        self.0.is_finite().then_some(self.0)
    }

    /// Inclusive: a site founded in the selected year is shown.
    pub fn is_on_or_before(&self, year: i64) -> bool {
        self.0 <= year as f64
    }
}

impl Default for Year {
    fn default() -> Self {
        Year(f64::NAN)
    }
}

impl From<i64> for Year {
    fn from(year: i64) -> Self {
        Year(year as f64)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) if v.fract() == 0.0 => write!(f, "{}", v as i64),
            Some(v) => write!(f, "{}", v),
            None => f.write_str("unknown"),
        }
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value() {
            Some(v) if v.fract() == 0.0 => serializer.serialize_i64(v as i64),
            Some(v) => serializer.serialize_f64(v),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Year {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<NumberOrText>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|raw| raw.to_f64())
            .map(Year)
            .unwrap_or_default())
    }
}

/// Where the initial load stands, as reported by `/api/status`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Pending,
    Loaded { count: usize, at: DateTime<Utc> },
    Failed { message: String },
}

struct StoreInner {
    sites: Arc<Vec<Site>>,
    status: LoadStatus,
}

/// Shared, write-once holder of the site list.
#[derive(Clone)]
pub struct SiteStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl Default for SiteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteStore {
    pub fn new() -> Self {
        SiteStore {
            inner: Arc::new(RwLock::new(StoreInner {
                sites: Arc::new(Vec::new()),
                status: LoadStatus::Pending,
            })),
        }
    }

    /// Installs the loaded list. Returns false, leaving the store untouched,
    /// if a load has already completed.
    pub fn install(&self, sites: Vec<Site>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.status != LoadStatus::Pending {
            return false;
        }
        inner.status = LoadStatus::Loaded {
            count: sites.len(),
            at: Utc::now(),
        };
        inner.sites = Arc::new(sites);
        true
    }

    /// Marks the load as failed. The list stays empty.
    pub fn mark_failed(&self, message: impl Into<String>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.status != LoadStatus::Pending {
            return false;
        }
        inner.status = LoadStatus::Failed {
            message: message.into(),
        };
        true
    }

    /// Snapshot of the list in source order.
    pub fn sites(&self) -> Arc<Vec<Site>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&inner.sites)
    }

    pub fn status(&self) -> LoadStatus {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.status.clone()
    }

    pub fn len(&self) -> usize {
        self.sites().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_record() {
        let json = r#"{
            "name": "Hampi",
            "category": "monuments_and_architecture",
            "coords": [15.335, 76.46],
            "year": 1336,
            "info": "Capital of the Vijayanagara Empire",
            "image_url": "https://example.org/hampi.jpg"
        }"#;
        let site: Site = serde_json::from_str(json).unwrap();
        assert_eq!(site.category, Category::MonumentsAndArchitecture);
        assert_eq!(site.coords, [15.335, 76.46]);
        assert!(site.year.is_on_or_before(1336));
        assert!(!site.year.is_on_or_before(1335));
        assert_eq!(site.image_url.as_deref(), Some("https://example.org/hampi.jpg"));
    }

    #[test]
    fn string_year_is_coerced() {
        let site: Site =
            serde_json::from_str(r#"{"name":"X","category":"cuisine","coords":[1,2],"year":"1700"}"#)
                .unwrap();
        assert_eq!(site.year.value(), Some(1700.0));
        assert_eq!(site.year.to_string(), "1700");
    }

    #[test]
    fn non_numeric_or_missing_year_never_matches() {
        let site: Site =
            serde_json::from_str(r#"{"name":"X","coords":[1,2],"year":"ancient"}"#).unwrap();
        assert!(!site.year.is_on_or_before(i64::MAX));

        let site: Site = serde_json::from_str(r#"{"name":"Y","coords":[1,2]}"#).unwrap();
        assert_eq!(site.year.value(), None);
        assert!(!site.year.is_on_or_before(2025));
    }

    #[test]
    fn unknown_and_missing_categories_are_kept() {
        let site: Site =
            serde_json::from_str(r#"{"name":"B","category":"arts","coords":[1,2],"year":1}"#).unwrap();
        assert_eq!(site.category, Category::Other("arts".to_string()));
        assert!(!site.category.is_known());

        let site: Site = serde_json::from_str(r#"{"name":"C","coords":[1,2],"year":1}"#).unwrap();
        assert_eq!(site.category.as_str(), "");

        let site: Site =
            serde_json::from_str(r#"{"name":"D","category":null,"coords":[1,2],"year":1}"#).unwrap();
        assert_eq!(site.category.as_str(), "");
    }

    #[test]
    fn category_ids_round_trip() {
        for category in Category::KNOWN {
            assert_eq!(Category::from_id(category.as_str()), category);
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }

    #[test]
    fn store_is_write_once() {
        let store = SiteStore::new();
        assert_eq!(store.status(), LoadStatus::Pending);
        assert!(store.is_empty());

        let site: Site =
            serde_json::from_str(r#"{"name":"A","category":"cuisine","coords":[10,10],"year":1700}"#)
                .unwrap();
        assert!(store.install(vec![site.clone()]));
        assert!(!store.install(vec![site.clone(), site]));
        assert!(!store.mark_failed("late"));
        assert_eq!(store.len(), 1);
        assert!(matches!(store.status(), LoadStatus::Loaded { count: 1, .. }));
    }

    #[test]
    fn failed_store_stays_empty() {
        let store = SiteStore::new();
        assert!(store.mark_failed("boom"));
        assert!(store.is_empty());
        assert_eq!(
            store.status(),
            LoadStatus::Failed {
                message: "boom".to_string()
            }
        );
    }
}

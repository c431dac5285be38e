use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Kind of help a helper offers. `All` only appears in filters.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Food,
    Legal,
    Health,
    Housing,
    Work,
    Education,
    Social,
    Clothes,
    Furniture,
    Transport,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::All,
        Category::Food,
        Category::Legal,
        Category::Health,
        Category::Housing,
        Category::Work,
        Category::Education,
        Category::Social,
        Category::Clothes,
        Category::Furniture,
        Category::Transport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Food => "food",
            Category::Legal => "legal",
            Category::Health => "health",
            Category::Housing => "housing",
            Category::Work => "work",
            Category::Education => "education",
            Category::Social => "social",
            Category::Clothes => "clothes",
            Category::Furniture => "furniture",
            Category::Transport => "transport",
        }
    }

    /// Value of the `category` query parameter; `None` for `All`.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            Category::All => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Search radius. Only the four values offered by the filter bar are valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum RadiusKm {
    Five,
    #[default]
    Ten,
    Twenty,
    Fifty,
}

impl RadiusKm {
    pub const ALL: [RadiusKm; 4] = [
        RadiusKm::Five,
        RadiusKm::Ten,
        RadiusKm::Twenty,
        RadiusKm::Fifty,
    ];

    pub fn km(self) -> u32 {
        match self {
            RadiusKm::Five => 5,
            RadiusKm::Ten => 10,
            RadiusKm::Twenty => 20,
            RadiusKm::Fifty => 50,
        }
    }

    pub fn meters(self) -> f64 {
        f64::from(self.km()) * 1000.0
    }
}

impl fmt::Display for RadiusKm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} km", self.km())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unsupported radius: {0} km")]
pub struct InvalidRadius(pub u32);

impl TryFrom<u32> for RadiusKm {
    type Error = InvalidRadius;

    fn try_from(km: u32) -> Result<Self, Self::Error> {
        RadiusKm::ALL
            .into_iter()
            .find(|r| r.km() == km)
            .ok_or(InvalidRadius(km))
    }
}

impl From<RadiusKm> for u32 {
    fn from(r: RadiusKm) -> Self {
        r.km()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperRole {
    Volunteer,
    #[serde(other)]
    Helper,
}

/// One helper returned by the nearby-helpers query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperRecord {
    pub id: String,
    pub name: String,
    pub role: HelperRole,
    #[serde(default, deserialize_with = "finite_location")]
    pub location: Option<Coordinate>,
    #[serde(default, deserialize_with = "known_categories")]
    pub help_categories: Vec<Category>,
    #[serde(rename = "distance")]
    pub distance_km: f64,
}

impl HelperRecord {
    /// Records without a usable location are listed but never mapped.
    pub fn is_mappable(&self) -> bool {
        self.location.is_some()
    }
}

/// Helpers in the order the backend returned them (nearest first).
pub type ResultSet = Vec<HelperRecord>;

fn finite_location<'de, D>(deserializer: D) -> Result<Option<Coordinate>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct RawLocation {
        lat: Option<f64>,
        lng: Option<f64>,
    }

    let raw = Option::<RawLocation>::deserialize(deserializer)?;
    Ok(raw.and_then(|l| match (l.lat, l.lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)).filter(Coordinate::is_finite),
        _ => None,
    }))
}

fn known_categories<'de, D>(deserializer: D) -> Result<Vec<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    let mut out: Vec<Category> = Vec::with_capacity(raw.len());
    for name in raw {
        match name.parse::<Category>() {
            Ok(Category::All) | Err(_) => debug!(category = %name, "dropping unknown help category"),
            Ok(c) if out.contains(&c) => continue,
            Ok(c) => out.push(c),
        }
    }
    Ok(out)
}

use std::time::Duration;

use nearby_shared::Coordinate;

/// Paris city centre, used whenever the device cannot be located.
pub const FALLBACK_COORDINATE: Coordinate = Coordinate::new(48.8566, 2.3522);

pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_ZOOM: u8 = 13;

pub const LEAFLET_CSS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
pub const LEAFLET_JS_URL: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Stylesheet + script pair injected once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryResources {
    pub stylesheet_id: String,
    pub stylesheet_url: String,
    pub script_url: String,
}

impl Default for LibraryResources {
    fn default() -> Self {
        Self {
            stylesheet_id: "leaflet-css".to_string(),
            stylesheet_url: LEAFLET_CSS_URL.to_string(),
            script_url: LEAFLET_JS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    pub url_template: String,
    pub attribution: String,
}

impl Default for TileSource {
    fn default() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// Origin the `/api/helpers-nearby` path is resolved against.
    pub api_base: String,
    pub bearer_token: Option<String>,
    pub fallback: Coordinate,
    pub geolocation_timeout: Duration,
    pub zoom: u8,
    pub tiles: TileSource,
    pub library: LibraryResources,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8001".to_string(),
            bearer_token: None,
            fallback: FALLBACK_COORDINATE,
            geolocation_timeout: GEOLOCATION_TIMEOUT,
            zoom: DEFAULT_ZOOM,
            tiles: TileSource::default(),
            library: LibraryResources::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Config for an app served from `origin`. A build-time `NEARBY_API_URL`
    /// takes precedence so the API can live on another host.
    pub fn from_origin(origin: &str) -> Self {
        let api_base = option_env!("NEARBY_API_URL").unwrap_or(origin);
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }
}

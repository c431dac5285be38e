//! Platform-independent engine behind the nearby-helpers screen: location
//! acquisition, the helper query, one-time map library loading, map
//! lifecycle and the screen state that ties them together.

pub mod config;
pub mod error;
pub mod library;
pub mod location;
pub mod map;
pub mod query;
pub mod screen;

#[cfg(test)]
mod testing;

pub use config::{DiscoveryConfig, LibraryResources, TileSource};
pub use error::{GeoError, LibraryLoadError, MapError, QueryError};
pub use library::{LibraryLoader, LoadState, ResourceInjector};
pub use location::{GeoOptions, Geolocator, Located, LocationAcquirer, LocationSource};
pub use map::{
    HelperMarker, MapBackend, MapPhase, MapSurface, MapViewController, MarkerMeta, PopupRenderer,
    Scene, Viewport,
};
pub use query::{FetchTicket, HelperQueryService, NearbyQuery};
pub use screen::{chat_link, visible_categories, FetchOutcome, Notice, ScreenController};

use thiserror::Error;

/// Why the device could not provide a position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location request timed out")]
    Timeout,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("geolocation is not supported on this platform")]
    Unsupported,
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("could not decode helpers: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Loading the mapping library's stylesheet or script failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryLoadError {
    #[error("failed to load {resource}: {reason}")]
    Resource { resource: String, reason: String },

    #[error("mapping library loaded but did not register itself")]
    MissingGlobal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("map container `{0}` not found")]
    MissingContainer(String),

    #[error("mapping library call failed: {0}")]
    Library(String),
}

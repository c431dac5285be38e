use std::future::Future;
use std::time::Duration;

use futures::future::{self, Either};
use futures::pin_mut;
use nearby_shared::Coordinate;
use tracing::{debug, warn};

use crate::config::DiscoveryConfig;
use crate::error::GeoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

/// Device position provider (browser geolocation in the app).
pub trait Geolocator {
    fn locate(&self, options: &GeoOptions) -> impl Future<Output = Result<Coordinate, GeoError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    Device,
    Fallback(GeoError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub coordinate: Coordinate,
    pub source: LocationSource,
}

impl Located {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, LocationSource::Fallback(_))
    }
}

/// Resolves the user's position, substituting the fallback coordinate on
/// any failure. `acquire` takes `&mut self`, so a screen can never have two
/// requests in flight on the same acquirer.
pub struct LocationAcquirer<G> {
    geolocator: G,
    options: GeoOptions,
    fallback: Coordinate,
}

impl<G: Geolocator> LocationAcquirer<G> {
    pub fn new(geolocator: G, config: &DiscoveryConfig) -> Self {
        Self {
            geolocator,
            options: GeoOptions {
                high_accuracy: true,
                timeout: config.geolocation_timeout,
            },
            fallback: config.fallback,
        }
    }

    pub fn options(&self) -> &GeoOptions {
        &self.options
    }

    /// Never fails. `deadline` bounds the wait independently of whatever
    /// timeout the platform honours; it should fire shortly after
    /// `options().timeout`.
    pub async fn acquire<D>(&mut self, deadline: D) -> Located
    where
        D: Future<Output = ()>,
    {
        let locate = self.geolocator.locate(&self.options);
        pin_mut!(locate, deadline);

        let outcome = match future::select(locate, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(GeoError::Timeout),
        };

        match outcome {
            Ok(coordinate) if coordinate.is_finite() => {
                debug!(%coordinate, "device location acquired");
                Located {
                    coordinate,
                    source: LocationSource::Device,
                }
            }
            Ok(_) => self.fall_back(GeoError::Unavailable("non-finite position".into())),
            Err(err) => self.fall_back(err),
        }
    }

    fn fall_back(&self, err: GeoError) -> Located {
        warn!(error = %err, fallback = %self.fallback, "using fallback location");
        Located {
            coordinate: self.fallback,
            source: LocationSource::Fallback(err),
        }
    }
}

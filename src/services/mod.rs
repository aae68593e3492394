//! External HTTP collaborators

use async_trait::async_trait;

use crate::error::NavError;
use crate::Coordinate;

/// Path as reported by a directions service
#[derive(Clone, Debug, PartialEq)]
pub struct RoutedPath {
    pub vertices: Vec<Coordinate>,
    /// Meters
    pub distance: f64,
}

/// Driving directions between two coordinates
#[async_trait]
pub trait DirectionsService: Send + Sync {
    async fn directions(&self, from: Coordinate, to: Coordinate) -> Result<RoutedPath, NavError>;
}

/// Human readable name of a coordinate
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn place_name(&self, coordinate: Coordinate) -> Result<String, NavError>;
}

/// Directions for setups without a service, routes fall back to straight lines
pub struct NoDirections;

#[async_trait]
impl DirectionsService for NoDirections {
    async fn directions(&self, _from: Coordinate, _to: Coordinate) -> Result<RoutedPath, NavError> {
        Err(NavError::RouteServiceUnavailable(
            "No directions service configured".to_string(),
        ))
    }
}

/// Geocoder for setups without one, names fall back to coordinates
pub struct NoGeocoder;

#[async_trait]
impl ReverseGeocoder for NoGeocoder {
    async fn place_name(&self, _coordinate: Coordinate) -> Result<String, NavError> {
        Err(NavError::ReverseGeocodeFailed("No geocoder configured".to_string()))
    }
}

#[cfg(feature = "http")]
mod nominatim;
#[cfg(feature = "http")]
mod openroute;

#[cfg(feature = "http")]
pub use nominatim::Nominatim;
#[cfg(feature = "http")]
pub use openroute::OpenRouteService;

#[cfg(all(test, feature = "http"))]
mod test_server;

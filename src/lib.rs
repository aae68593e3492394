//! navtrack - Live position tracking and routing towards a destination

pub mod config;
pub mod error;
mod generator;
mod navigation;
pub mod services;
pub mod sources;

pub use config::NavigationConfig;
pub use error::{ErrorKind, LocationError, NavError};
pub use generator::gpx::GpxGenerator;
pub use navigation::controller::{
    NavigationController, NavigationPhase, NavigationSignal, NavigationState, RouteTag,
};
pub use navigation::distance::{distance, format_distance, EARTH_RADIUS_M};
pub use navigation::position::{Coordinate, Destination, Position, Route, RouteSource};
pub use navigation::route::RouteProvider;
pub use navigation::tracker::{LocationTracker, TrackerEvent, TrackerState};
pub use navigation::view::{Marker, MarkerKind, NavigationView};

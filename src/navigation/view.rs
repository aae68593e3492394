//! Read-only view for the rendering layer

use serde::Serialize;

use super::controller::{NavigationPhase, NavigationState};
use super::distance::{distance, format_distance};
use super::position::{Coordinate, RouteSource};
use crate::error::ErrorKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Current,
    Destination,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub coordinate: Coordinate,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NavigationView {
    pub status_text: String,
    /// Route length, or the straight distance while no route is known
    pub distance_text: Option<String>,
    pub center: Option<Coordinate>,
    pub route_vertices: Vec<Coordinate>,
    pub route_source: Option<RouteSource>,
    pub markers: Vec<Marker>,
}

impl NavigationView {
    pub fn build(state: &NavigationState, phase: NavigationPhase) -> Self {
        let position = state.current_position.as_ref().map(|p| p.coordinate);
        let destination = state.destination.as_ref();

        let distance_text = match (&state.route, position, destination) {
            (Some(route), _, _) => Some(format_distance(route.distance)),
            (None, Some(p), Some(d)) => Some(format_distance(distance(p, d.coordinate))),
            _ => None,
        };

        let mut markers = vec![];
        if let Some(p) = position {
            markers.push(Marker {
                kind: MarkerKind::Current,
                coordinate: p,
                label: "You are here".to_string(),
            });
        }
        if let Some(d) = destination {
            markers.push(Marker {
                kind: MarkerKind::Destination,
                coordinate: d.coordinate,
                label: d.display_name(),
            });
        }

        Self {
            status_text: status_text(state, phase),
            distance_text,
            center: position.or(destination.map(|d| d.coordinate)),
            route_vertices: state
                .route
                .as_ref()
                .map(|r| r.vertices.clone())
                .unwrap_or_default(),
            route_source: state.route.as_ref().map(|r| r.source),
            markers,
        }
    }
}

fn status_text(state: &NavigationState, phase: NavigationPhase) -> String {
    match state.last_error {
        Some(ErrorKind::LocationPermissionDenied) => {
            return "Location permission denied".to_string()
        }
        Some(ErrorKind::LocationUnavailable) if phase != NavigationPhase::Stopped => {
            return "Location unavailable, retrying".to_string()
        }
        _ => {}
    }

    let name = state.destination.as_ref().map(|d| d.display_name());

    match (phase, name) {
        (NavigationPhase::Stopped, _) => "Navigation stopped".to_string(),
        (NavigationPhase::Initializing, _) => "Waiting to start".to_string(),
        (NavigationPhase::Locating, _) => "Locating...".to_string(),
        (NavigationPhase::Routing, Some(name)) => format!("Finding route to {}", name),
        (_, None) => "Choose a destination".to_string(),
        (_, Some(name)) => match state.route.as_ref().map(|r| r.source) {
            Some(RouteSource::Fallback) => format!("Heading to {} (straight line)", name),
            _ => format!("Heading to {}", name),
        },
    }
}

//! Position, destination and route definitions

use std::fmt;
use std::str::FromStr;

use geo::geometry::{LineString, Point};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::NavError;

/// Latitude/longitude pair, in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Fails for NaN or out of range values
    pub fn validated(self) -> Result<Self, NavError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(NavError::InvalidCoordinate(self.to_string()))
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

impl From<Point> for Coordinate {
    fn from(p: Point) -> Self {
        Self {
            lat: p.y(),
            lng: p.x(),
        }
    }
}

impl From<Coordinate> for Point {
    fn from(c: Coordinate) -> Self {
        Point::new(c.lng, c.lat)
    }
}

/// Split a raw `a,b`, `a;b` or `a b` pair
pub(crate) fn split_pair(raw: &str) -> Option<(f64, f64)> {
    let separator = match raw {
        s if s.contains(',') => ",",
        s if s.contains(';') => ";",
        _ => " ",
    };
    let parts: Vec<&str> = raw
        .split(separator)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != 2 {
        return None;
    }

    let a = parts[0].parse::<f64>().ok()?;
    let b = parts[1].parse::<f64>().ok()?;

    Some((a, b))
}

/// Parses `lat,lng`
impl FromStr for Coordinate {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = split_pair(s)
            .ok_or_else(|| NavError::InvalidCoordinate(format!("`{}` is not a lat,lng pair", s)))?;

        Coordinate::new(lat, lng).validated()
    }
}

/// One location fix
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    pub time: OffsetDateTime,
    /// Reported accuracy radius, in meters
    pub accuracy: Option<f64>,
}

impl Position {
    pub fn basic(coordinate: Coordinate, time: OffsetDateTime) -> Self {
        Self {
            coordinate,
            time,
            accuracy: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Destination {
    pub coordinate: Coordinate,
    /// Resolved by reverse geocoding, `None` while the lookup is pending
    pub name: Option<String>,
}

impl Destination {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            name: None,
        }
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.coordinate.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Api,
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    /// Starts at the current position and ends at the destination
    pub vertices: Vec<Coordinate>,
    /// Total length, in meters
    pub distance: f64,
    pub source: RouteSource,
}

impl Route {
    /// Straight line between both ends
    pub fn straight(from: Coordinate, to: Coordinate, distance: f64) -> Self {
        Self {
            vertices: vec![from, to],
            distance: distance.max(0.0),
            source: RouteSource::Fallback,
        }
    }

    pub fn line_string(&self) -> LineString {
        self.vertices
            .iter()
            .map(|c| Point::from(*c))
            .collect::<Vec<Point>>()
            .into()
    }
}

//! Error types for navtrack

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Failure reported by a position source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("No location fix within {0:?}")]
    Timeout(Duration),
}

impl LocationError {
    /// Fatal errors end the tracking session
    pub fn is_fatal(&self) -> bool {
        matches!(self, LocationError::PermissionDenied)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LocationError::PermissionDenied => ErrorKind::LocationPermissionDenied,
            LocationError::Unavailable(_) | LocationError::Timeout(_) => {
                ErrorKind::LocationUnavailable
            }
        }
    }
}

/// Error category kept in the navigation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LocationUnavailable,
    LocationPermissionDenied,
    RouteServiceUnavailable,
    ReverseGeocodeFailed,
}

/// navtrack error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("Route service unavailable: {0}")]
    RouteServiceUnavailable(String),

    #[error("Reverse geocode failed: {0}")]
    ReverseGeocodeFailed(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Tracker error: {0}")]
    Tracker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(String),
}

impl NavError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            NavError::Location(e) => Some(e.kind()),
            NavError::RouteServiceUnavailable(_) => Some(ErrorKind::RouteServiceUnavailable),
            NavError::ReverseGeocodeFailed(_) => Some(ErrorKind::ReverseGeocodeFailed),
            _ => None,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for NavError {
    fn from(e: reqwest::Error) -> Self {
        NavError::RouteServiceUnavailable(e.to_string())
    }
}

impl From<serde_yaml::Error> for NavError {
    fn from(e: serde_yaml::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;

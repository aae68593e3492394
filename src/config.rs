//! Navigation settings, usually loaded from a YAML file

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::sources::PositionOptions;

#[cfg(feature = "csv")]
use crate::sources::FieldsBuilder;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub tracker: TrackerConfig,
    pub routing: RoutingConfig,
    pub directions: DirectionsConfig,
    pub geocoder: GeocoderConfig,
    /// Columns of replayed CSV files
    #[cfg(feature = "csv")]
    pub fields: FieldsBuilder,
}

impl NavigationConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // an empty document deserializes to `()`
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Meters a fix must move away from the last forwarded one
    pub min_displacement: f64,
    pub high_accuracy: bool,
    pub maximum_age_ms: u64,
    pub timeout_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_displacement: 1.0,
            high_accuracy: true,
            maximum_age_ms: 500,
            timeout_ms: 10_000,
        }
    }
}

impl TrackerConfig {
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.high_accuracy,
            maximum_age: Duration::from_millis(self.maximum_age_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Below this many meters the straight line is used without asking the service
    pub near_threshold: f64,
    pub timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            near_threshold: 50.0,
            timeout_ms: 10_000,
        }
    }
}

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// OpenRouteService access
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectionsConfig {
    pub endpoint: String,
    pub profile: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openrouteservice.org".to_string(),
            profile: "driving-car".to_string(),
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

/// Nominatim access
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("navtrack/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> std::result::Result<(), String> {
        let conf = NavigationConfig::from_yaml("").map_err(|e| e.to_string())?;
        assert_eq!(NavigationConfig::default(), conf);

        let conf = NavigationConfig::from_yaml("\ntracker:\nrouting:").map_err(|e| e.to_string())?;
        assert_eq!(1.0, conf.tracker.min_displacement);
        assert_eq!(50.0, conf.routing.near_threshold);
        assert_eq!(Duration::from_secs(10), conf.routing.timeout());

        let op = conf.tracker.position_options();
        assert!(op.high_accuracy);
        assert_eq!(Duration::from_millis(500), op.maximum_age);
        assert_eq!(Duration::from_secs(10), op.timeout);

        Ok(())
    }

    #[test]
    fn overrides() -> std::result::Result<(), String> {
        let yaml = "
tracker:
  min_displacement: 5
  timeout_ms: 20000
routing:
  near_threshold: 100.5
directions:
  api_key: secret
geocoder:
  enabled: false
";
        let conf = NavigationConfig::from_yaml(yaml).map_err(|e| e.to_string())?;
        assert_eq!(5.0, conf.tracker.min_displacement);
        assert_eq!(Duration::from_secs(20), conf.tracker.position_options().timeout);
        assert_eq!(100.5, conf.routing.near_threshold);
        assert_eq!(Some("secret".to_string()), conf.directions.api_key);
        assert_eq!("driving-car", conf.directions.profile);
        assert!(!conf.geocoder.enabled);

        Ok(())
    }

    #[test]
    fn invalid() {
        assert!(NavigationConfig::from_yaml("tracker: [1, 2]").is_err());
    }
}

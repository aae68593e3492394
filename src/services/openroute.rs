//! OpenRouteService directions client

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::{DirectionsService, RoutedPath};
use crate::config::DirectionsConfig;
use crate::error::NavError;
use crate::Coordinate;

pub struct OpenRouteService {
    client: reqwest::Client,
    endpoint: String,
    profile: String,
    api_key: String,
}

impl OpenRouteService {
    pub fn new(config: &DirectionsConfig) -> Result<Self, NavError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NavError::Config("Directions api_key not provided".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| NavError::Config(format!("Failed on build the http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            profile: config.profile.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/v2/directions/{}/geojson", self.endpoint, self.profile)
    }
}

#[derive(Serialize)]
struct DirectionsRequest {
    /// `[lng, lat]` pairs, origin first
    coordinates: [[f64; 2]; 2],
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    /// `[lng, lat]`, maybe followed by an elevation
    coordinates: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct Properties {
    summary: Summary,
}

#[derive(Deserialize)]
struct Summary {
    distance: Option<f64>,
}

/// Path and distance of the first feature of a GeoJSON answer
fn decode(body: &str) -> Result<RoutedPath, NavError> {
    let collection: FeatureCollection = serde_json::from_str(body)
        .map_err(|e| NavError::RouteServiceUnavailable(format!("Unexpected response: {}", e)))?;

    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| NavError::RouteServiceUnavailable("Response without features".to_string()))?;

    let distance = feature
        .properties
        .summary
        .distance
        .ok_or_else(|| NavError::RouteServiceUnavailable("Response without distance".to_string()))?;

    let vertices = feature
        .geometry
        .coordinates
        .iter()
        .map(|pair| match pair.as_slice() {
            [lng, lat, ..] => Ok(Coordinate::new(*lat, *lng)),
            _ => Err(NavError::RouteServiceUnavailable(format!(
                "Invalid path vertex {:?}",
                pair
            ))),
        })
        .collect::<Result<Vec<Coordinate>, NavError>>()?;

    Ok(RoutedPath { vertices, distance })
}

#[async_trait]
impl DirectionsService for OpenRouteService {
    async fn directions(&self, from: Coordinate, to: Coordinate) -> Result<RoutedPath, NavError> {
        let request = DirectionsRequest {
            coordinates: [[from.lng, from.lat], [to.lng, to.lat]],
        };

        let response = self
            .client
            .post(self.url())
            .header(AUTHORIZATION, &self.api_key)
            .header(ACCEPT, "application/json, application/geo+json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavError::RouteServiceUnavailable(format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        let path = decode(&body)?;
        debug!(
            "Directions answered {} vertices, {} m",
            path.vertices.len(),
            path.distance
        );

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_server::serve_once;

    const BODY: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {
                "summary": { "distance": 5400.2, "duration": 610.5 },
                "way_points": [0, 2]
            },
            "geometry": {
                "type": "LineString",
                "coordinates": [[85.324, 27.7172], [85.327, 27.71], [85.33, 27.7]]
            }
        }]
    }"#;

    fn config(endpoint: String) -> DirectionsConfig {
        DirectionsConfig {
            endpoint,
            api_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn decode_geojson() -> Result<(), String> {
        let path = decode(BODY).map_err(|e| e.to_string())?;
        assert_eq!(5400.2, path.distance);
        assert_eq!(
            vec![
                Coordinate::new(27.7172, 85.324),
                Coordinate::new(27.71, 85.327),
                Coordinate::new(27.7, 85.33),
            ],
            path.vertices
        );

        Ok(())
    }

    #[test]
    fn decode_rejects_other_shapes() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"features": []}"#).is_err());
        assert!(decode(r#"{"error": {"code": 2010, "message": "Could not find routable point"}}"#).is_err());
        assert!(decode(
            r#"{"features": [{"properties": {"summary": {}}, "geometry": {"coordinates": [[1.0, 2.0]]}}]}"#
        )
        .is_err());
        assert!(decode(
            r#"{"features": [{"properties": {"summary": {"distance": 1.0}}, "geometry": {"coordinates": [[1.0]]}}]}"#
        )
        .is_err());
    }

    #[test]
    fn api_key_is_required() {
        let conf = DirectionsConfig::default();
        assert!(OpenRouteService::new(&conf).is_err());
    }

    #[tokio::test]
    async fn request_route() -> Result<(), String> {
        let (addr, request) = serve_once("200 OK", BODY).await;
        let service = OpenRouteService::new(&config(format!("http://{}/", addr)))
            .map_err(|e| e.to_string())?;

        let path = service
            .directions(Coordinate::new(27.7172, 85.324), Coordinate::new(27.7, 85.33))
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(3, path.vertices.len());

        let request = request.await.map_err(|e| e.to_string())?;
        assert!(request.starts_with("POST /v2/directions/driving-car/geojson "));
        assert!(request.to_lowercase().contains("authorization: secret"));
        assert!(request.contains(r#"{"coordinates":[[85.324,27.7172],[85.33,27.7]]}"#));

        Ok(())
    }

    #[tokio::test]
    async fn error_status() -> Result<(), String> {
        let (addr, _) = serve_once("403 Forbidden", r#"{"error": "Access denied"}"#).await;
        let service = OpenRouteService::new(&config(format!("http://{}", addr)))
            .map_err(|e| e.to_string())?;

        let result = service
            .directions(Coordinate::new(27.7172, 85.324), Coordinate::new(27.7, 85.33))
            .await;
        assert!(matches!(result, Err(NavError::RouteServiceUnavailable(_))));

        Ok(())
    }
}

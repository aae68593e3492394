//! Nominatim reverse geocoding client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use super::ReverseGeocoder;
use crate::config::GeocoderConfig;
use crate::error::NavError;
use crate::Coordinate;

pub struct Nominatim {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
}

impl Nominatim {
    pub fn new(config: &GeocoderConfig) -> Result<Self, NavError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| NavError::Config(format!("Failed on build the http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

fn failed<E: ToString>(e: E) -> NavError {
    NavError::ReverseGeocodeFailed(e.to_string())
}

#[async_trait]
impl ReverseGeocoder for Nominatim {
    async fn place_name(&self, coordinate: Coordinate) -> Result<String, NavError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.endpoint))
            .header(USER_AGENT, &self.user_agent)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinate.lat.to_string()),
                ("lon", coordinate.lng.to_string()),
            ])
            .send()
            .await
            .map_err(failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }

        let answer: ReverseResponse = response.json().await.map_err(failed)?;
        match (answer.display_name, answer.error) {
            (Some(name), _) if !name.trim().is_empty() => Ok(name),
            (_, Some(error)) => Err(failed(error)),
            _ => Err(failed("Response without display_name")),
        }
    }
}

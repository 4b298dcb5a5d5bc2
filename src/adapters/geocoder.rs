use crate::config::settings::GeocoderSettings;
use crate::domain::model::Coordinates;
use crate::domain::ports::Geocoder;
use crate::utils::error::{GeocodeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Google Geocoding API client (`/maps/api/geocode/json`).
pub struct GoogleGeocoder {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl GoogleGeocoder {
    pub fn new(settings: &GeocoderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> std::result::Result<Coordinates, GeocodeError> {
        let mut request = self.client.get(&self.endpoint).query(&[("address", address)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        tracing::debug!("Geocoding '{}'", address);
        // 請求網址帶有 API key，錯誤訊息中不可保留網址
        let response = request
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.without_url()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Request(e.without_url()))?;
        match body.status.as_str() {
            "OK" => body
                .results
                .into_iter()
                .next()
                .map(|result| Coordinates {
                    latitude: result.geometry.location.lat,
                    longitude: result.geometry.location.lng,
                })
                .ok_or(GeocodeError::NoResults),
            "ZERO_RESULTS" => Err(GeocodeError::NoResults),
            _ => Err(GeocodeError::Status {
                status: body.status,
                message: body.error_message,
            }),
        }
    }
}

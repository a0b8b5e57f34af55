//! HTTP client for the ChargeBnB backend.
//!
//! Wraps `reqwest` with the backend's URL layout and typed response
//! deserialization. Any non-2xx status or body that does not match the
//! expected shape is surfaced as a [`DiscoveryError`].

use std::future::Future;
use std::time::Duration;

use chargebnb_core::{AppConfig, Coordinate, Station};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::DiscoveryError;

/// Anything that can answer "which stations are near this coordinate".
pub trait StationSource {
    fn nearby_stations(
        &self,
        at: Coordinate,
    ) -> impl Future<Output = Result<Vec<Station>, DiscoveryError>>;
}

#[derive(Debug, Deserialize)]
struct NearbyStationsResponse {
    // A missing or null `stations` is an empty result, not an error.
    #[serde(default)]
    stations: Option<Vec<Station>>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Client for the backend REST API.
///
/// Use [`StationsClient::from_config`] in the binary or
/// [`StationsClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct StationsClient {
    client: Client,
    base_url: Url,
}

impl StationsClient {
    /// Builds a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`DiscoveryError::InvalidBaseUrl`] if the
    /// configured backend URL does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, DiscoveryError> {
        Self::with_base_url(
            &config.backend_base_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    /// Creates a client against an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`DiscoveryError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Keep exactly one trailing slash so `join` appends below any path
        // prefix instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| DiscoveryError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    /// Calls `GET /api/health`.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::Http`] on network failure.
    /// - [`DiscoveryError::UnexpectedStatus`] on a non-2xx status.
    /// - [`DiscoveryError::Deserialize`] if the body is not the expected shape.
    pub async fn health(&self) -> Result<HealthStatus, DiscoveryError> {
        let url = self.build_url("api/health", &[])?;
        let body = self.request_body(&url).await?;
        serde_json::from_str(&body).map_err(|e| DiscoveryError::Deserialize {
            context: "health".to_string(),
            source: e,
        })
    }

    /// Builds the request URL below the base URL with percent-encoded query
    /// parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, DiscoveryError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| DiscoveryError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends a GET request, asserts a 2xx status, and returns the body text.
    async fn request_body(&self, url: &Url) -> Result<String, DiscoveryError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

impl StationSource for StationsClient {
    /// Calls `GET /api/nearby_stations?lat=..&lng=..`.
    async fn nearby_stations(&self, at: Coordinate) -> Result<Vec<Station>, DiscoveryError> {
        let lat = at.latitude.to_string();
        let lng = at.longitude.to_string();
        let url = self.build_url("api/nearby_stations", &[("lat", &lat), ("lng", &lng)])?;

        tracing::debug!(%url, "querying nearby stations");
        let body = self.request_body(&url).await?;
        let response: NearbyStationsResponse =
            serde_json::from_str(&body).map_err(|e| DiscoveryError::Deserialize {
                context: format!("nearby_stations(lat={lat}, lng={lng})"),
                source: e,
            })?;

        Ok(response.stations.unwrap_or_default())
    }
}

///! WhereTheISS API client for fetching the station's live position
use super::types::{CoordinateInfo, PositionReport, SatellitePosition};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

const API_BASE_URL: &str = "https://api.wheretheiss.at/v1";
const ISS_SATELLITE_ID: u32 = 25544;

/// Canonical error text for HTTP-level fetch failures
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching ISS position";

/// Country code used when the coordinate lookup cannot resolve one
pub const COUNTRY_UNKNOWN: &str = "N/A";

/// Failure of a single upstream request
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error {0}")]
    Status(StatusCode),
}

impl UpstreamError {
    /// Text surfaced to clients in a failure report
    ///
    /// Transport faults carry the underlying error text; HTTP-level
    /// failures collapse to the canonical message.
    fn report_text(&self) -> String {
        match self {
            UpstreamError::Transport(e) => e.to_string(),
            UpstreamError::Status(_) => FETCH_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Source of position reports for the broadcast loop
///
/// A fetch never fails outward: upstream failures are captured in the
/// report's `error` field so the loop treats every outcome the same way.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn fetch(&self) -> PositionReport;
}

/// Client for the WhereTheISS tracking API
pub struct IssApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl IssApiClient {
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(API_BASE_URL, request_timeout)
    }

    /// Create a client against a non-default API base (used by tests)
    pub fn with_base_url(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the station's current position
    async fn fetch_position(&self) -> Result<SatellitePosition, UpstreamError> {
        let url = format!("{}/satellites/{}", self.base_url, ISS_SATELLITE_ID);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let position: SatellitePosition = response.json().await?;
        Ok(position)
    }

    /// Resolve a coordinate pair to a country code
    async fn fetch_country_code(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<String>, UpstreamError> {
        let url = format!(
            "{}/coordinates/{},{}?indent=4",
            self.base_url, latitude, longitude
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let info: CoordinateInfo = response.json().await?;
        Ok(info.country_code)
    }

    /// Country code for a position, best effort
    ///
    /// Lookup failures of any kind degrade to the unknown sentinel; they
    /// never turn a fetched position into an error report.
    async fn resolve_country(&self, latitude: f64, longitude: f64) -> String {
        match self.fetch_country_code(latitude, longitude).await {
            Ok(Some(code)) => code,
            Ok(None) => {
                tracing::warn!(
                    "Coordinate lookup returned no country code for {},{}",
                    latitude,
                    longitude
                );
                COUNTRY_UNKNOWN.to_string()
            }
            Err(e) => {
                tracing::warn!(
                    "Coordinate lookup failed for {},{}: {}",
                    latitude,
                    longitude,
                    e
                );
                COUNTRY_UNKNOWN.to_string()
            }
        }
    }
}

#[async_trait]
impl PositionSource for IssApiClient {
    async fn fetch(&self) -> PositionReport {
        let position = match self.fetch_position().await {
            Ok(position) => position,
            Err(e) => {
                tracing::error!("✗ ISS position fetch failed: {}", e);
                return PositionReport::error(e.report_text());
            }
        };

        let country_code = match (position.latitude, position.longitude) {
            (Some(latitude), Some(longitude)) => self.resolve_country(latitude, longitude).await,
            _ => {
                tracing::warn!("Satellite response missing coordinates, skipping country lookup");
                COUNTRY_UNKNOWN.to_string()
            }
        };

        PositionReport::position(position.latitude, position.longitude, country_code)
    }
}

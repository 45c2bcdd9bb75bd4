///! Data types for the ISS position feed
use serde::{Deserialize, Serialize};

/// One position report, produced per broadcast tick
///
/// A report is either a position (latitude/longitude plus the resolved
/// country code) or an upstream failure (the `error` text); the unused
/// fields stay `None` and are dropped from the wire format. The serde
/// tag names the event so clients can dispatch on `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "iss_update")]
pub struct PositionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PositionReport {
    /// Build a position report
    ///
    /// Coordinates are passed through as received; an upstream response
    /// with absent fields yields `None` here rather than an error.
    pub fn position(
        latitude: Option<f64>,
        longitude: Option<f64>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            country_code: Some(country_code.into()),
            error: None,
        }
    }

    /// Build a failure report carrying only the error text
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            latitude: None,
            longitude: None,
            country_code: None,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Satellite position as returned by the tracking API
///
/// The API body carries more fields (altitude, velocity, visibility);
/// only the coordinates matter here and both are tolerated missing.
#[derive(Debug, Clone, Deserialize)]
pub struct SatellitePosition {
    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Reverse-geocoding result for a coordinate pair
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinateInfo {
    #[serde(default)]
    pub country_code: Option<String>,
}

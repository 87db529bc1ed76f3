//! Poll source adapter: fetch and normalize the latest sighting
//!
//! The backend answers `GET /api/sightings/latest` with either nothing (no
//! sightings yet) or a document whose location is GeoJSON-ordered:
//!
//! ```json
//! { "loc": { "coordinates": [-94.1632, 45.5579] }, "accuracyM": 50, "description": "seen downtown" }
//! ```
//!
//! Longitude comes first. `accuracyM` and `description` are optional.

use crate::geo::Coordinate;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

mod poller;

pub use poller::{spawn_poller, PollHandle, PollOutcome};

/// Accuracy radius used when the backend omits `accuracyM`
pub const DEFAULT_ACCURACY_M: f64 = 20.0;

// ─────────────────────────────────────────────────────────────────────────────
// Normalized result
// ─────────────────────────────────────────────────────────────────────────────

/// The most recently reported sighting
#[derive(Debug, Clone, PartialEq)]
pub struct LatestSighting {
    pub position: Coordinate,
    pub accuracy_m: f64,
    /// May be empty
    pub description: String,
    pub fetched_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SightingDoc {
    loc: Option<GeoPoint>,
    accuracy_m: Option<f64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    coordinates: Vec<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a poll tick produced nothing usable
#[derive(Debug)]
pub enum FetchError {
    /// Connection, timeout, or body read failure
    Network(String),
    /// Non-2xx response
    Status(u16),
    /// Body was not valid JSON for a sighting
    Decode(String),
    /// Document parsed but is missing `loc`
    MissingLocation,
    /// `loc.coordinates` is not a `[lng, lat]` pair in range
    InvalidLocation(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Status(status) => write!(f, "Unexpected status {}", status),
            Self::Decode(msg) => write!(f, "Malformed sighting JSON: {}", msg),
            Self::MissingLocation => write!(f, "Sighting has no loc field"),
            Self::InvalidLocation(msg) => write!(f, "Invalid sighting location: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Normalize a response body
///
/// Returns `Ok(None)` for an empty body or JSON `null`.
pub fn parse_latest(
    body: &[u8],
    default_accuracy_m: f64,
) -> Result<Option<LatestSighting>, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let doc: Option<SightingDoc> =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let Some(doc) = doc else {
        return Ok(None);
    };

    let loc = doc.loc.ok_or(FetchError::MissingLocation)?;
    // Positions may carry altitude after the pair
    let [lng, lat, ..] = loc.coordinates[..] else {
        return Err(FetchError::InvalidLocation(format!(
            "expected at least [lng, lat], got {} value(s)",
            loc.coordinates.len()
        )));
    };
    let position =
        Coordinate::new(lat, lng).map_err(|e| FetchError::InvalidLocation(e.to_string()))?;

    let accuracy_m = match doc.accuracy_m {
        Some(acc) if acc.is_finite() && acc >= 0.0 => acc,
        Some(acc) => {
            return Err(FetchError::InvalidLocation(format!(
                "accuracy {} is not a radius",
                acc
            )))
        }
        None => default_accuracy_m,
    };

    Ok(Some(LatestSighting {
        position,
        accuracy_m,
        description: doc.description.unwrap_or_default(),
        fetched_at: Utc::now(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP client
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches the latest sighting from the backend
#[derive(Debug, Clone)]
pub struct SightingsClient {
    client: reqwest::Client,
    url: String,
    default_accuracy_m: f64,
}

impl SightingsClient {
    pub fn new(
        api_base: &str,
        latest_path: &str,
        timeout: Duration,
        default_accuracy_m: f64,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}{}", api_base.trim_end_matches('/'), latest_path),
            default_accuracy_m,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One poll tick
    pub async fn fetch_latest(&self) -> Result<Option<LatestSighting>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read body: {}", e)))?;

        parse_latest(&body, self.default_accuracy_m)
    }
}

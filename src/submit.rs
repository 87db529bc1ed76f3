//! Sighting submission client
//!
//! Posts the selected point to the backend. Success is what drives the
//! session's explicit clear and the immediate re-poll.

use crate::geo::Coordinate;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Longest backend error message kept in a notice
const MAX_ERROR_CHARS: usize = 200;

/// Body of `POST /api/sightings`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SightingReport {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SightingReport {
    /// Blank descriptions are omitted from the request body
    pub fn new(position: Coordinate, description: Option<String>) -> Self {
        Self {
            lat: position.lat(),
            lng: position.lng(),
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug)]
pub enum SubmitError {
    Network(String),
    Rejected { status: u16, message: String },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Rejected { status, message } if message.is_empty() => {
                write!(f, "Backend rejected report ({})", status)
            }
            Self::Rejected { status, message } => {
                write!(f, "Backend rejected report ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for SubmitError {}

#[derive(Debug, Clone)]
pub struct SubmitClient {
    client: reqwest::Client,
    url: String,
}

impl SubmitClient {
    pub fn new(api_base: &str, submit_path: &str, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}{}", api_base.trim_end_matches('/'), submit_path),
        })
    }

    pub async fn submit(&self, report: &SightingReport) -> Result<(), SubmitError> {
        let response = self
            .client
            .post(&self.url)
            .json(report)
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Submitted sighting at {}, {}", report.lat, report.lng);
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(SubmitError::Rejected {
            status: status.as_u16(),
            message: message.trim().chars().take(MAX_ERROR_CHARS).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    fn point(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_blank_description_is_omitted() {
        let report = SightingReport::new(point(45.0, -94.0), Some("   ".into()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"lat": 45.0, "lng": -94.0}));

        let report = SightingReport::new(point(45.0, -94.0), Some(" cape ".into()));
        assert_eq!(report.description.as_deref(), Some("cape"));
    }

    #[tokio::test]
    async fn test_submit_posts_report() {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
        let app = Router::new()
            .route(
                "/api/sightings",
                post(
                    |State(received): State<Arc<Mutex<Vec<serde_json::Value>>>>,
                     Json(body): Json<serde_json::Value>| async move {
                        received.lock().unwrap().push(body);
                        StatusCode::CREATED
                    },
                ),
            )
            .with_state(received.clone());
        let base = serve(app).await;

        let client = SubmitClient::new(&base, "/api/sightings", Duration::from_secs(5)).unwrap();
        let report = SightingReport::new(point(45.5579, -94.1632), Some("flying".into()));
        client.submit(&report).await.unwrap();

        let bodies = received.lock().unwrap();
        assert_eq!(
            bodies.as_slice(),
            [serde_json::json!({"lat": 45.5579, "lng": -94.1632, "description": "flying"})]
        );
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let app = Router::new().route(
            "/api/sightings",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "lat out of range") }),
        );
        let base = serve(app).await;

        let client = SubmitClient::new(&base, "/api/sightings", Duration::from_secs(5)).unwrap();
        let err = client
            .submit(&SightingReport::new(point(1.0, 1.0), None))
            .await
            .unwrap_err();

        match err {
            SubmitError::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "lat out of range");
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }
}

//! Geographic coordinates and the geo source adapter
//!
//! Two producers feed selection state: map clicks (synchronous, never move
//! the viewport) and device-location requests (asynchronous, re-center the
//! viewport on success). Both normalize into a [`GeoEvent`].

use std::fmt;
use std::future::Future;

// ─────────────────────────────────────────────────────────────────────────────
// Coordinate
// ─────────────────────────────────────────────────────────────────────────────

/// A validated WGS84 point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

/// Why a coordinate was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateError {
    /// Latitude outside [-90, 90] or not finite
    Latitude(f64),
    /// Longitude outside [-180, 180] or not finite
    Longitude(f64),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latitude(v) => write!(f, "latitude {} is outside [-90, 90]", v),
            Self::Longitude(v) => write!(f, "longitude {} is outside [-180, 180]", v),
        }
    }
}

impl std::error::Error for CoordinateError {}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::Latitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalized geo events
// ─────────────────────────────────────────────────────────────────────────────

/// Where a selection candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoOrigin {
    Click,
    Device,
}

/// A location produced by either producer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoEvent {
    pub position: Coordinate,
    pub origin: GeoOrigin,
    /// Move the viewport to the point (device fixes only)
    pub recenter: bool,
}

impl GeoEvent {
    pub fn click(position: Coordinate) -> Self {
        Self {
            position,
            origin: GeoOrigin::Click,
            recenter: false,
        }
    }

    pub fn device(position: Coordinate) -> Self {
        Self {
            position,
            origin: GeoOrigin::Device,
            recenter: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device location
// ─────────────────────────────────────────────────────────────────────────────

/// Device location request failures
#[derive(Debug, Clone, PartialEq)]
pub enum LocateError {
    /// The platform has no geolocation support
    Unsupported,
    /// Permission denied, no fix, or timeout
    Unavailable(String),
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "Geolocation not supported"),
            Self::Unavailable(reason) => write!(f, "Unable to fetch your location ({})", reason),
        }
    }
}

impl std::error::Error for LocateError {}

/// Asks the platform for the current position
///
/// Implementations resolve once per request. The result is delivered back to
/// the view's event loop, never applied directly.
pub trait DeviceLocator: Send + Sync + 'static {
    fn locate(&self) -> impl Future<Output = Result<Coordinate, LocateError>> + Send;
}

/// Locator backed by a device position from configuration
///
/// Headless hosts have no GPS; a configured position stands in for it.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocator {
    position: Option<Coordinate>,
}

impl ConfiguredLocator {
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

impl DeviceLocator for ConfiguredLocator {
    async fn locate(&self) -> Result<Coordinate, LocateError> {
        self.position.ok_or(LocateError::Unsupported)
    }
}

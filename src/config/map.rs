//! Map and device configuration
//!
//! `[map]` holds the initial viewport and overlay parameters; `[device]` is
//! the stand-in device position used by "locate" on hosts without GPS.

use crate::geo::{Coordinate, CoordinateError};
use crate::poll::DEFAULT_ACCURACY_M;
use crate::session::SessionSettings;
use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Map
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Initial viewport center (St. Cloud, MN)
    pub center_lat: f64,
    pub center_lng: f64,
    /// Initial zoom level
    pub zoom: u8,
    /// Zoom applied when re-centering on a device fix
    pub locate_zoom: u8,
    /// Radius of the pending-selection circle (meters)
    pub selection_radius_m: f64,
    /// Radius used when a sighting has no `accuracyM`
    pub default_accuracy_m: f64,
    /// Circle color of the latest-sighting overlay
    pub latest_color: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: 45.5579,
            center_lng: -94.1632,
            zoom: 13,
            locate_zoom: 16,
            selection_radius_m: 15.0,
            default_accuracy_m: DEFAULT_ACCURACY_M,
            latest_color: "#2563eb".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileMap {
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub zoom: Option<u8>,
    pub locate_zoom: Option<u8>,
    pub selection_radius_m: Option<f64>,
    pub default_accuracy_m: Option<f64>,
    pub latest_color: Option<String>,
}

impl MapConfig {
    pub fn from_file(file: Option<FileMap>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            center_lat: file.center_lat.unwrap_or(defaults.center_lat),
            center_lng: file.center_lng.unwrap_or(defaults.center_lng),
            zoom: file.zoom.unwrap_or(defaults.zoom),
            locate_zoom: file.locate_zoom.unwrap_or(defaults.locate_zoom),
            selection_radius_m: file
                .selection_radius_m
                .unwrap_or(defaults.selection_radius_m),
            default_accuracy_m: file
                .default_accuracy_m
                .unwrap_or(defaults.default_accuracy_m),
            latest_color: file.latest_color.unwrap_or(defaults.latest_color),
        }
    }

    pub fn center(&self) -> Result<Coordinate, CoordinateError> {
        Coordinate::new(self.center_lat, self.center_lng)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            selection_radius_m: self.selection_radius_m,
            locate_zoom: self.locate_zoom,
            latest_color: self.latest_color.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed device position; both fields must be set for "locate" to succeed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceConfig {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FileDevice {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl DeviceConfig {
    pub fn from_file(file: Option<FileDevice>) -> Self {
        let file = file.unwrap_or_default();
        Self {
            lat: file.lat,
            lng: file.lng,
        }
    }

    /// `None` when unset or out of range (locate reports unsupported)
    pub fn position(&self) -> Option<Coordinate> {
        let (lat, lng) = (self.lat?, self.lng?);
        match Coordinate::new(lat, lng) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("Ignoring configured device position: {}", e);
                None
            }
        }
    }
}

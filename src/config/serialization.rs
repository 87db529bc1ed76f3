//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    fn device_to_toml(&self) -> String {
        match (self.device.lat, self.device.lng) {
            (Some(lat), Some(lng)) => format!("[device]\nlat = {:?}\nlng = {:?}\n", lat, lng),
            _ => "# [device]\n# lat = 45.5579\n# lng = -94.1632\n".to_string(),
        }
    }

    /// Render the config as a commented TOML document
    pub fn to_toml(&self) -> String {
        format!(
            r#"# sighting-tracker configuration

# Sightings backend (SIGHTING_API_BASE overrides)
api_base = "{api_base}"
latest_path = "{latest_path}"
submit_path = "{submit_path}"

# Seconds between latest-sighting polls (SIGHTING_POLL_INTERVAL overrides)
poll_interval_secs = {poll_interval}

# Per-request HTTP timeout in seconds
request_timeout_secs = {timeout}

# Viewport and overlays
[map]
center_lat = {center_lat:?}
center_lng = {center_lng:?}
zoom = {zoom}
locate_zoom = {locate_zoom}
selection_radius_m = {selection_radius:?}
default_accuracy_m = {default_accuracy:?}
latest_color = "{latest_color}"

# Device position used by `locate` (no GPS on this host)
# SIGHTING_DEVICE_LAT / SIGHTING_DEVICE_LNG override
{device}
# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# JSON file logging (in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = "{log_file_dir}"
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"
"#,
            api_base = self.api_base,
            latest_path = self.latest_path,
            submit_path = self.submit_path,
            poll_interval = self.poll_interval_secs,
            timeout = self.request_timeout_secs,
            center_lat = self.map.center_lat,
            center_lng = self.map.center_lng,
            zoom = self.map.zoom,
            locate_zoom = self.map.locate_zoom,
            selection_radius = self.map.selection_radius_m,
            default_accuracy = self.map.default_accuracy_m,
            latest_color = self.map.latest_color,
            device = self.device_to_toml(),
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
        )
    }
}

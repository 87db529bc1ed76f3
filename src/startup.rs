// Startup module - banner shown before the console takes input
//
// Lists where the tracker will poll and post, how often, and which
// device position `locate` will report.

use crate::config::{Config, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Print the startup banner
pub fn print_startup(config: &Config) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}Sighting Tracker{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Live map overlays for reported sightings{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    for line in summary_lines(config) {
        println!("  {MAGENTA}▸{RESET} {line}");
    }
    if config.demo_mode {
        println!("  {YELLOW}▸{RESET} {YELLOW}Demo mode active{RESET} {DIM}(scripted commands){RESET}");
    }
    println!();
}

fn summary_lines(config: &Config) -> Vec<String> {
    let device = match config.device.position() {
        Some(p) => p.to_string(),
        None => "not configured".to_string(),
    };

    vec![
        format!(
            "Polling {}{} every {}s",
            config.api_base, config.latest_path, config.poll_interval_secs
        ),
        format!("Reports go to {}{}", config.api_base, config.submit_path),
        format!("Device position: {}", device),
    ]
}

/// Mirror the banner into the log
pub fn log_startup(config: &Config) {
    tracing::info!("Sighting Tracker v{}", VERSION);
    for line in summary_lines(config) {
        tracing::info!("{}", line);
    }
    if config.demo_mode {
        tracing::info!("Demo mode active (scripted commands)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;

    #[test]
    fn test_summary_mentions_endpoints() {
        let lines = summary_lines(&Config::default());
        assert_eq!(
            lines[0],
            "Polling http://localhost:3000/api/sightings/latest every 7s"
        );
        assert_eq!(lines[1], "Reports go to http://localhost:3000/api/sightings");
        assert_eq!(lines[2], "Device position: not configured");
    }

    #[test]
    fn test_summary_shows_device() {
        let mut config = Config::default();
        config.device = DeviceConfig {
            lat: Some(45.5),
            lng: Some(-94.1),
        };
        assert_eq!(
            summary_lines(&config)[2],
            "Device position: 45.50000, -94.10000"
        );
    }
}

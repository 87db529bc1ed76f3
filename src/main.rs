// Sighting Tracker - live map overlays for a sightings backend
//
// Shows one pending selection (click or device location) and the most recent
// reported sighting on a map, and lets the user report the selection.
//
// Architecture:
// - View: owns the map session and runs the event loop (current-thread runtime)
// - Session: selection and latest-sighting coordinators over an overlay registry
// - Poller: periodic fetch of the latest sighting, with poll-now and shutdown
// - Submit: posts a report for the pending selection
// - Console / demo: feed user commands into the view
// - Event system: mpsc channels connect all components

mod cli;
mod config;
mod console;
mod demo;
mod geo;
mod overlay;
mod poll;
mod session;
mod startup;
mod submit;
mod view;

use anyhow::Result;
use config::Config;
use geo::ConfiguredLocator;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use view::View;

/// Buffer size for the command channel
const COMMAND_BUFFER: usize = 32;

/// Set up stderr logging plus the optional JSON file layer
///
/// Precedence: RUST_LOG env var > config file > default "info".
/// The returned guard must live until exit so file logs flush.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let logging = &config.logging;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter_directive().into());

    // Stderr keeps log lines apart from command output on stdout
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let file_appender = if logging.file_enabled {
        match logging.file_appender() {
            Ok(appender) => Some(appender),
            Err(e) => {
                eprintln!(
                    "Warning: Could not open log file in {:?}: {}",
                    logging.file_dir, e
                );
                None
            }
        }
    } else {
        None
    };

    match file_appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --reset, --path)
    if cli::handle_cli()? {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();
    let config = Config::from_env();

    let file_guard = init_logging(&config);

    startup::print_startup(&config);
    startup::log_startup(&config);

    // Printer task: everything the user should see goes to stdout
    let (output_tx, mut output_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(output) = output_rx.recv().await {
            println!("{}", output);
        }
    });

    let locator = ConfiguredLocator::new(config.device.position());
    let view = View::mount(&config, locator, output_tx)?;

    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let input = if config.demo_mode {
        tracing::info!("Running in DEMO MODE - scripted commands");
        tokio::spawn(demo::run_demo(command_tx))
    } else {
        println!("{}", console::HELP);
        tokio::spawn(console::read_stdin(command_tx))
    };

    if let Some(map) = view.run(command_rx).await {
        tracing::debug!(
            "Map released: {} marker(s) and {} circle(s) created, {} removed",
            map.markers_created(),
            map.circles_created(),
            map.removed()
        );
    }

    input.abort();
    // The view held the last output sender, so the printer drains and exits
    let _ = printer.await;

    tracing::info!("Shutdown complete");

    // A pending stdin read sits on a blocking thread that runtime shutdown
    // would wait on; flush file logs and exit instead
    drop(file_guard);
    std::process::exit(0);
}

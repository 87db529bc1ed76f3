//! View runtime: mount, event loop, teardown
//!
//! The view owns the [`MapSession`] outright, and all session mutation
//! happens inside [`View::run`]'s loop on the current-thread runtime, so
//! nothing needs a lock. Work that suspends (device location, submission,
//! the poller's fetches) runs in spawned tasks and reports back as
//! [`SessionEvent`]s.
//!
//! # Event Flow
//!
//! ```text
//! stdin / demo ──Command──┐
//! locate task ────────────┼──→ View::run ──→ MapSession::handle ──→ OverlayRegistry
//! submit task ────────────┤
//! poller ──PollOutcome────┘
//! ```

use crate::config::Config;
use crate::console::{Command, HELP};
use crate::geo::{Coordinate, DeviceLocator};
use crate::overlay::{MapObject, MemoryMap, SlotKind};
use crate::poll::{spawn_poller, LatestSighting, PollHandle, PollOutcome, SightingsClient};
use crate::session::{MapSession, Notice, SessionEvent};
use crate::submit::{SightingReport, SubmitClient};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffer size for task → view channels
const EVENT_BUFFER: usize = 64;

/// Something the user should see
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Notice(Notice),
    Status(StatusReport),
    Help,
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice(notice) => write!(f, "{}", notice),
            Self::Status(status) => write!(f, "{}", status),
            Self::Help => write!(f, "{}", HELP),
        }
    }
}

/// Snapshot of what the map currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub selected: Option<Coordinate>,
    pub latest: Option<LatestSighting>,
    pub latest_radius_m: Option<f64>,
    pub latest_label: Option<String>,
    /// Viewport center and zoom
    pub viewport: Option<(Coordinate, u8)>,
    /// What the map currently draws
    pub objects: Vec<MapObject>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selected {
            Some(p) => writeln!(f, "Selected: {}", p)?,
            None => writeln!(f, "Selected: (none)")?,
        }
        match &self.latest {
            Some(s) => writeln!(
                f,
                "Latest:   {} ±{} m \"{}\" (fetched {})",
                s.position,
                self.latest_radius_m.unwrap_or(s.accuracy_m),
                self.latest_label.as_deref().unwrap_or(&s.description),
                s.fetched_at.format("%H:%M:%S")
            )?,
            None => writeln!(f, "Latest:   (no sightings yet)")?,
        }
        match self.viewport {
            Some((center, zoom)) => write!(f, "Map:      {} zoom {}", center, zoom)?,
            None => write!(f, "Map:      (not mounted)")?,
        }
        for object in &self.objects {
            write!(f, "\n  {}", object)?;
        }
        Ok(())
    }
}

/// A mounted map view
pub struct View<L: DeviceLocator> {
    session: MapSession<MemoryMap>,
    poller: PollHandle,
    poll_rx: mpsc::Receiver<PollOutcome>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    submitter: SubmitClient,
    locator: Arc<L>,
    output: mpsc::UnboundedSender<Output>,
}

impl<L: DeviceLocator> View<L> {
    /// Create the map, attach it to a fresh session, and start polling once
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        config: &Config,
        locator: L,
        output: mpsc::UnboundedSender<Output>,
    ) -> Result<Self> {
        let center = config.map.center().context("Invalid [map] center")?;
        let timeout = config.request_timeout();

        let sightings = SightingsClient::new(
            &config.api_base,
            &config.latest_path,
            timeout,
            config.map.default_accuracy_m,
        )?;
        let submitter = SubmitClient::new(&config.api_base, &config.submit_path, timeout)?;

        let mut session = MapSession::new(&config.map.session_settings());
        session.attach(MemoryMap::new(center, config.map.zoom))?;

        let (poll_tx, poll_rx) = mpsc::channel(EVENT_BUFFER);
        tracing::info!(
            "Polling {} every {}s",
            sightings.url(),
            config.poll_interval_secs
        );
        let poller = spawn_poller(sightings, config.poll_interval(), poll_tx);

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        Ok(Self {
            session,
            poller,
            poll_rx,
            events_tx,
            events_rx,
            submitter,
            locator: Arc::new(locator),
            output,
        })
    }

    /// Process commands and async results until quit, end of input, or Ctrl-C
    ///
    /// Tears the view down before returning and hands back the destroyed map.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Option<MemoryMap> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Quit) | None => break,
                        Some(command) => self.dispatch(command),
                    }
                }
                Some(outcome) = self.poll_rx.recv() => {
                    self.apply(SessionEvent::Polled(outcome));
                }
                Some(event) = self.events_rx.recv() => {
                    self.apply(event);
                }
                _ = &mut ctrl_c => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }

        self.teardown().await
    }

    fn emit(&self, output: Output) {
        let _ = self.output.send(output);
    }

    fn apply(&mut self, event: SessionEvent) {
        let submitted = matches!(event, SessionEvent::Submitted);

        if let Some(notice) = self.session.handle(event) {
            self.emit(Output::Notice(notice));
        }

        if submitted && self.session.is_live() {
            // Show the new report without waiting for the next tick
            self.poller.poll_now();
        }
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Click(position) => self.apply(SessionEvent::Clicked(position)),
            Command::Locate => self.request_location(),
            Command::Submit(description) => self.submit(description),
            Command::Status => self.emit(Output::Status(self.status())),
            Command::Help => self.emit(Output::Help),
            Command::Quit => {}
        }
    }

    fn request_location(&self) {
        let locator = self.locator.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = locator.locate().await;
            // Send fails only after teardown; the result is dropped
            let _ = tx.send(SessionEvent::Located(result)).await;
        });
    }

    fn submit(&self, description: Option<String>) {
        let Some(position) = self.session.selected() else {
            self.emit(Output::Notice(Notice::NothingSelected));
            return;
        };

        let report = SightingReport::new(position, description);
        let submitter = self.submitter.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match submitter.submit(&report).await {
                Ok(()) => SessionEvent::Submitted,
                Err(e) => {
                    tracing::warn!("Failed to submit sighting: {}", e);
                    SessionEvent::SubmitFailed(e.to_string())
                }
            };
            let _ = tx.send(event).await;
        });
    }

    pub fn status(&self) -> StatusReport {
        let registry = self.session.registry();
        let latest_overlay = registry.and_then(|r| r.overlay(SlotKind::Latest));
        StatusReport {
            selected: self.session.selected(),
            latest: self.session.latest().cloned(),
            latest_radius_m: latest_overlay.map(|o| o.radius_m),
            latest_label: latest_overlay.and_then(|o| o.label.clone()),
            viewport: registry.map(|r| r.surface().view()),
            objects: registry.map_or_else(Vec::new, |r| {
                r.surface().objects().into_iter().cloned().collect()
            }),
        }
    }

    /// Stop the poller (timer released), then destroy the session's map
    pub async fn teardown(self) -> Option<MemoryMap> {
        let Self {
            mut session,
            poller,
            poll_rx,
            events_rx,
            ..
        } = self;

        // Anything still queued or in flight is discarded with the receivers
        drop(poll_rx);
        drop(events_rx);
        poller.shutdown().await;

        let map = session.teardown();
        tracing::info!("View torn down");
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::ConfiguredLocator;
    use crate::overlay::{MapSurface, OverlayStyle};
    use axum::{
        extract::State,
        http::StatusCode,
        routing::{get, post},
        Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fake backend: latest returns a fixed sighting, submit always succeeds
    #[derive(Clone, Default)]
    struct Backend {
        polls: Arc<AtomicUsize>,
        submits: Arc<AtomicUsize>,
    }

    async fn serve(backend: Backend) -> String {
        let app = Router::new()
            .route(
                "/api/sightings/latest",
                get(|State(b): State<Backend>| async move {
                    b.polls.fetch_add(1, Ordering::SeqCst);
                    r#"{"loc":{"coordinates":[-94.1632,45.5579]},"accuracyM":50,"description":"seen downtown"}"#
                }),
            )
            .route(
                "/api/sightings",
                post(|State(b): State<Backend>| async move {
                    b.submits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::CREATED
                }),
            )
            .with_state(backend);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(api_base: String) -> Config {
        Config {
            api_base,
            // Long enough that only the first tick and explicit polls happen
            poll_interval_secs: 3600,
            ..Config::default()
        }
    }

    fn point(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    async fn next_output(rx: &mut mpsc::UnboundedReceiver<Output>) -> Output {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for output")
            .expect("output channel closed")
    }

    /// Ask for status until `done` holds
    async fn status_until(
        cmd_tx: &mpsc::Sender<Command>,
        out_rx: &mut mpsc::UnboundedReceiver<Output>,
        done: impl Fn(&StatusReport) -> bool,
    ) -> StatusReport {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                cmd_tx.send(Command::Status).await.unwrap();
                if let Output::Status(status) = next_output(out_rx).await {
                    if done(&status) {
                        return status;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for status")
    }

    async fn wait_for(counter: &AtomicUsize, at_least: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while counter.load(Ordering::SeqCst) < at_least {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for backend call");
    }

    #[test]
    fn test_status_lists_map_contents() {
        let mut map = MemoryMap::new(point(45.5579, -94.1632), 13);
        let style = OverlayStyle::selection();
        map.add_marker(point(45.56, -94.17), &style);
        map.add_circle(point(45.56, -94.17), 15.0, &style);

        let status = StatusReport {
            selected: Some(point(45.56, -94.17)),
            latest: None,
            latest_radius_m: None,
            latest_label: None,
            viewport: Some(map.view()),
            objects: map.objects().into_iter().cloned().collect(),
        };
        assert_eq!(
            status.to_string(),
            "Selected: 45.56000, -94.17000\n\
             Latest:   (no sightings yet)\n\
             Map:      45.55790, -94.16320 zoom 13\n  \
             marker 45.56000, -94.17000\n  \
             circle 45.56000, -94.17000 r=15 m default"
        );
    }

    #[tokio::test]
    async fn test_submit_clears_selection_and_polls_immediately() {
        let backend = Backend::default();
        let base = serve(backend.clone()).await;
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let view = View::mount(&config(base), ConfiguredLocator::default(), out_tx).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let handle = tokio::spawn(view.run(cmd_rx));

        // Mount triggers the first poll
        wait_for(&backend.polls, 1).await;

        cmd_tx.send(Command::Click(point(45.56, -94.17))).await.unwrap();
        cmd_tx.send(Command::Submit(Some("flying".into()))).await.unwrap();
        assert_eq!(next_output(&mut out_rx).await, Output::Notice(Notice::Submitted));

        // Second poll well before the hour-long interval
        wait_for(&backend.polls, 2).await;
        assert_eq!(backend.submits.load(Ordering::SeqCst), 1);

        // The first poll's outcome may still be queued behind the commands
        let status = status_until(&cmd_tx, &mut out_rx, |s| s.latest.is_some()).await;
        assert!(status.selected.is_none());
        assert_eq!(status.latest.unwrap().description, "seen downtown");
        assert_eq!(status.latest_radius_m, Some(50.0));
        assert_eq!(status.latest_label.as_deref(), Some("seen downtown"));
        // Only the latest pair remains on the map
        assert_eq!(status.objects.len(), 2);

        cmd_tx.send(Command::Quit).await.unwrap();
        let map = handle.await.unwrap().unwrap();
        assert!(map.is_destroyed());
        assert_eq!(map.live_objects(), 0);
    }

    #[tokio::test]
    async fn test_submit_without_selection_notifies() {
        let base = serve(Backend::default()).await;
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let view = View::mount(&config(base), ConfiguredLocator::default(), out_tx).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let handle = tokio::spawn(view.run(cmd_rx));

        cmd_tx.send(Command::Submit(None)).await.unwrap();
        assert_eq!(
            next_output(&mut out_rx).await,
            Output::Notice(Notice::NothingSelected)
        );

        drop(cmd_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_locate_unsupported_and_supported() {
        let base = serve(Backend::default()).await;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let view = View::mount(&config(base.clone()), ConfiguredLocator::default(), out_tx).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let handle = tokio::spawn(view.run(cmd_rx));
        cmd_tx.send(Command::Locate).await.unwrap();
        assert!(matches!(
            next_output(&mut out_rx).await,
            Output::Notice(Notice::LocationUnavailable(_))
        ));
        drop(cmd_tx);
        handle.await.unwrap();

        let fix = point(45.55, -94.2);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let view = View::mount(&config(base), ConfiguredLocator::new(Some(fix)), out_tx).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let handle = tokio::spawn(view.run(cmd_rx));
        cmd_tx.send(Command::Locate).await.unwrap();

        let status = status_until(&cmd_tx, &mut out_rx, |s| s.selected.is_some()).await;
        assert_eq!(status.selected, Some(fix));
        // Device fixes re-center at the locate zoom
        assert_eq!(status.viewport, Some((fix, 16)));

        drop(cmd_tx);
        let map = handle.await.unwrap().unwrap();
        assert!(map.is_destroyed());
    }

    #[tokio::test]
    async fn test_teardown_stops_polling() {
        let backend = Backend::default();
        let base = serve(backend.clone()).await;
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let mut cfg = config(base);
        cfg.poll_interval_secs = 1;
        let view = View::mount(&cfg, ConfiguredLocator::default(), out_tx).unwrap();

        wait_for(&backend.polls, 1).await;
        let map = view.teardown().await.unwrap();
        assert!(map.is_destroyed());

        let polls = backend.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(backend.polls.load(Ordering::SeqCst), polls);
    }
}

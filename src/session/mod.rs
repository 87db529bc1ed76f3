//! Map session: per-view state from mount to teardown
//!
//! A session owns the overlay registry (and through it the map surface) plus
//! both coordinators. Every event the view receives is handed to
//! [`MapSession::handle`], which is the only place map visuals change.
//!
//! # Phases
//!
//! ```text
//! Pending ──attach(map)──→ Ready ──teardown()──→ TornDown
//! ```
//!
//! Events that arrive while `Pending` (map not ready) or `TornDown` (late
//! fetch or geolocation results) are dropped without touching anything.

use crate::geo::{Coordinate, GeoEvent, LocateError};
use crate::overlay::{MapSurface, OverlayRegistry};
use crate::poll::{LatestSighting, PollOutcome};
use anyhow::{bail, Result};
use std::fmt;

pub mod latest;
pub mod selection;

use latest::LatestCoordinator;
use selection::SelectionCoordinator;

/// Everything that can change the session
#[derive(Debug)]
pub enum SessionEvent {
    /// Map click at a geographic location
    Clicked(Coordinate),
    /// Device location request resolved
    Located(Result<Coordinate, LocateError>),
    Polled(PollOutcome),
    /// Report accepted by the backend
    Submitted,
    SubmitFailed(String),
}

/// User-visible message produced by an event
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    LocationUnavailable(LocateError),
    Submitted,
    SubmitFailed(String),
    NothingSelected,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocationUnavailable(e) => write!(f, "{}", e),
            Self::Submitted => write!(f, "Sighting submitted!"),
            Self::SubmitFailed(msg) => write!(f, "Submission failed: {}", msg),
            Self::NothingSelected => {
                write!(f, "Pick a location first (click the map or use locate)")
            }
        }
    }
}

/// Fixed parameters of a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Radius of the pending-selection circle
    pub selection_radius_m: f64,
    /// Zoom used when re-centering on a device fix
    pub locate_zoom: u8,
    /// Circle color of the latest-sighting overlay
    pub latest_color: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            selection_radius_m: 15.0,
            locate_zoom: 16,
            latest_color: "#2563eb".to_string(),
        }
    }
}

enum Phase<M: MapSurface> {
    Pending,
    Ready(OverlayRegistry<M>),
    TornDown,
}

impl<M: MapSurface> Phase<M> {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready(_) => "ready",
            Self::TornDown => "torn down",
        }
    }
}

pub struct MapSession<M: MapSurface> {
    phase: Phase<M>,
    selection: SelectionCoordinator,
    latest: LatestCoordinator,
}

impl<M: MapSurface> MapSession<M> {
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            phase: Phase::Pending,
            selection: SelectionCoordinator::new(
                settings.selection_radius_m,
                settings.locate_zoom,
            ),
            latest: LatestCoordinator::new(&settings.latest_color),
        }
    }

    /// Map is ready: start accepting events
    pub fn attach(&mut self, map: M) -> Result<()> {
        if !matches!(self.phase, Phase::Pending) {
            bail!("Cannot attach a map to a {} session", self.phase.as_str());
        }
        self.phase = Phase::Ready(OverlayRegistry::new(map));
        tracing::debug!("Map session ready");
        Ok(())
    }

    pub fn is_live(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    pub fn registry(&self) -> Option<&OverlayRegistry<M>> {
        match &self.phase {
            Phase::Ready(registry) => Some(registry),
            _ => None,
        }
    }

    /// Point the reporting form would submit
    pub fn selected(&self) -> Option<Coordinate> {
        self.selection.selected()
    }

    pub fn latest(&self) -> Option<&LatestSighting> {
        self.latest.last()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Option<Notice> {
        let Phase::Ready(registry) = &mut self.phase else {
            tracing::debug!(
                "Dropping {:?} for {} session",
                event,
                self.phase.as_str()
            );
            return None;
        };

        match event {
            SessionEvent::Clicked(position) => {
                self.selection.apply(GeoEvent::click(position), registry);
                None
            }
            SessionEvent::Located(Ok(position)) => {
                self.selection.apply(GeoEvent::device(position), registry);
                None
            }
            SessionEvent::Located(Err(e)) => {
                tracing::info!("Device location failed: {}", e);
                Some(Notice::LocationUnavailable(e))
            }
            SessionEvent::Polled(outcome) => {
                if !self.latest.reconcile(outcome, registry) {
                    tracing::trace!("Poll left the latest overlay unchanged");
                }
                None
            }
            SessionEvent::Submitted => {
                self.selection.clear(registry);
                Some(Notice::Submitted)
            }
            SessionEvent::SubmitFailed(msg) => Some(Notice::SubmitFailed(msg)),
        }
    }

    /// Release every overlay and destroy the map
    ///
    /// Returns the destroyed surface on the first call, `None` afterwards.
    pub fn teardown(&mut self) -> Option<M> {
        let phase = std::mem::replace(&mut self.phase, Phase::TornDown);
        let Phase::Ready(registry) = phase else {
            return None;
        };

        let mut surface = registry.into_surface();
        surface.destroy();
        self.selection.reset();
        self.latest.reset();
        tracing::debug!("Map session torn down");
        Some(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{MemoryMap, SlotKind};
    use crate::poll::{parse_latest, FetchError, DEFAULT_ACCURACY_M};

    fn point(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn map() -> MemoryMap {
        MemoryMap::new(point(45.5579, -94.1632), 13)
    }

    fn ready() -> MapSession<MemoryMap> {
        let mut session = MapSession::new(&SessionSettings::default());
        session.attach(map()).unwrap();
        session
    }

    fn polled(body: &str) -> SessionEvent {
        SessionEvent::Polled(
            parse_latest(body.as_bytes(), DEFAULT_ACCURACY_M)
                .unwrap()
                .map_or(PollOutcome::NoData, PollOutcome::Updated),
        )
    }

    #[test]
    fn test_events_before_attach_are_dropped() {
        let mut session: MapSession<MemoryMap> = MapSession::new(&SessionSettings::default());
        assert!(session.handle(SessionEvent::Clicked(point(1.0, 1.0))).is_none());
        assert!(session
            .handle(SessionEvent::Located(Err(LocateError::Unsupported)))
            .is_none());
        assert!(session.selected().is_none());

        session.attach(map()).unwrap();
        assert!(session.registry().unwrap().surface().live_objects() == 0);
    }

    #[test]
    fn test_attach_twice_is_rejected() {
        let mut session = ready();
        assert!(session.attach(map()).is_err());
    }

    #[test]
    fn test_locate_failure_notifies_without_change() {
        let mut session = ready();
        session.handle(SessionEvent::Clicked(point(1.0, 1.0)));

        let notice = session.handle(SessionEvent::Located(Err(LocateError::Unavailable(
            "permission denied".into(),
        ))));

        assert!(matches!(notice, Some(Notice::LocationUnavailable(_))));
        assert_eq!(session.selected(), Some(point(1.0, 1.0)));
    }

    #[test]
    fn test_click_and_locate_last_write_wins() {
        let mut session = ready();
        session.handle(SessionEvent::Clicked(point(1.0, 1.0)));
        session.handle(SessionEvent::Located(Ok(point(2.0, 2.0))));
        session.handle(SessionEvent::Clicked(point(3.0, 3.0)));

        let registry = session.registry().unwrap();
        assert_eq!(session.selected(), Some(point(3.0, 3.0)));
        assert_eq!(registry.position(SlotKind::Selection), Some(point(3.0, 3.0)));
        assert_eq!(registry.surface().markers_created(), 1);
        // The device fix re-centered; the later click did not
        assert_eq!(registry.surface().view(), (point(2.0, 2.0), 16));
    }

    #[test]
    fn test_submitted_clears_selection_only() {
        let mut session = ready();
        session.handle(polled(r#"{"loc":{"coordinates":[-94.1632,45.5579]}}"#));
        session.handle(SessionEvent::Clicked(point(1.0, 1.0)));

        assert_eq!(session.handle(SessionEvent::Submitted), Some(Notice::Submitted));

        let registry = session.registry().unwrap();
        assert!(session.selected().is_none());
        assert!(registry.position(SlotKind::Selection).is_none());
        assert!(registry.position(SlotKind::Latest).is_some());
        assert_eq!(registry.surface().live_objects(), 2);
    }

    #[test]
    fn test_submit_failure_keeps_selection() {
        let mut session = ready();
        session.handle(SessionEvent::Clicked(point(1.0, 1.0)));
        let notice = session.handle(SessionEvent::SubmitFailed("503".into()));

        assert_eq!(notice, Some(Notice::SubmitFailed("503".into())));
        assert_eq!(session.selected(), Some(point(1.0, 1.0)));
    }

    #[test]
    fn test_empty_poll_leaves_latest_untouched() {
        let mut session = ready();
        session.handle(polled(
            r#"{"loc":{"coordinates":[-94.1632,45.5579]},"accuracyM":50,"description":"seen downtown"}"#,
        ));
        let before = session.registry().unwrap().overlay(SlotKind::Latest).cloned();

        session.handle(polled(""));
        session.handle(SessionEvent::Polled(PollOutcome::Failed(FetchError::Status(500))));

        let after = session.registry().unwrap().overlay(SlotKind::Latest).cloned();
        assert_eq!(before, after);
        assert_eq!(after.unwrap().label.as_deref(), Some("seen downtown"));
    }

    #[test]
    fn test_teardown_releases_map_and_ignores_late_events() {
        let mut session = ready();
        session.handle(SessionEvent::Clicked(point(1.0, 1.0)));
        session.handle(polled(r#"{"loc":{"coordinates":[2.0,2.0]}}"#));
        assert!(session.latest().is_some());

        let map = session.teardown().unwrap();
        assert!(session.latest().is_none());
        assert!(map.is_destroyed());
        assert_eq!(map.live_objects(), 0);
        assert_eq!(map.removed(), 4);

        // A fetch that was in flight resolves after teardown
        assert!(session
            .handle(polled(r#"{"loc":{"coordinates":[3.0,3.0]}}"#))
            .is_none());
        assert!(session.handle(SessionEvent::Clicked(point(4.0, 4.0))).is_none());
        assert!(!session.is_live());
        assert!(session.selected().is_none());
        assert!(session.latest().is_none());
        assert!(session.teardown().is_none());
        assert!(session.attach(map).is_err());
    }
}

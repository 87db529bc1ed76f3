//! Latest-sighting coordinator
//!
//! Applies each successful poll to the latest slot. "No data" and failed
//! ticks leave the overlay alone: no update yet is not evidence that the
//! sighting is gone.

use crate::overlay::{MapSurface, OverlayRegistry, OverlayStyle, SlotKind, LATEST_TITLE};
use crate::poll::{LatestSighting, PollOutcome};

#[derive(Debug)]
pub struct LatestCoordinator {
    style: OverlayStyle,
    last: Option<LatestSighting>,
}

impl LatestCoordinator {
    pub fn new(color: &str) -> Self {
        Self {
            style: OverlayStyle::latest(color),
            last: None,
        }
    }

    /// Last sighting applied to the map
    pub fn last(&self) -> Option<&LatestSighting> {
        self.last.as_ref()
    }

    /// Forget the last sighting without touching the map (map already gone)
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Returns true if the overlay changed
    pub fn reconcile<M: MapSurface>(
        &mut self,
        outcome: PollOutcome,
        registry: &mut OverlayRegistry<M>,
    ) -> bool {
        let sighting = match outcome {
            PollOutcome::Updated(sighting) => sighting,
            PollOutcome::NoData | PollOutcome::Failed(_) => return false,
        };

        registry.upsert(
            SlotKind::Latest,
            sighting.position,
            sighting.accuracy_m,
            &self.style,
        );
        let label = if sighting.description.is_empty() {
            LATEST_TITLE
        } else {
            sighting.description.as_str()
        };
        registry.set_label(SlotKind::Latest, label);

        self.last = Some(sighting);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::overlay::MemoryMap;
    use crate::poll::{parse_latest, FetchError, DEFAULT_ACCURACY_M};

    fn setup() -> (LatestCoordinator, OverlayRegistry<MemoryMap>) {
        let center = Coordinate::new(45.5579, -94.1632).unwrap();
        (
            LatestCoordinator::new("#2563eb"),
            OverlayRegistry::new(MemoryMap::new(center, 13)),
        )
    }

    fn updated(body: &str) -> PollOutcome {
        PollOutcome::Updated(
            parse_latest(body.as_bytes(), DEFAULT_ACCURACY_M)
                .unwrap()
                .unwrap(),
        )
    }

    #[test]
    fn test_applies_sighting_with_label() {
        let (mut latest, mut reg) = setup();
        let changed = latest.reconcile(
            updated(r#"{"loc":{"coordinates":[-94.1632,45.5579]},"accuracyM":50,"description":"seen downtown"}"#),
            &mut reg,
        );

        assert!(changed);
        let overlay = reg.overlay(SlotKind::Latest).unwrap();
        assert_eq!(overlay.position.lat(), 45.5579);
        assert_eq!(overlay.position.lng(), -94.1632);
        assert_eq!(overlay.radius_m, 50.0);
        assert_eq!(overlay.label.as_deref(), Some("seen downtown"));

        let marker = reg.surface().object(overlay.marker).unwrap();
        assert_eq!(marker.title.as_deref(), Some(LATEST_TITLE));
    }

    #[test]
    fn test_empty_description_falls_back_to_title() {
        let (mut latest, mut reg) = setup();
        latest.reconcile(updated(r#"{"loc":{"coordinates":[1.0,2.0]}}"#), &mut reg);

        let overlay = reg.overlay(SlotKind::Latest).unwrap();
        assert_eq!(overlay.label.as_deref(), Some(LATEST_TITLE));
        assert_eq!(overlay.radius_m, DEFAULT_ACCURACY_M);
    }

    #[test]
    fn test_no_data_and_failures_retain_overlay() {
        let (mut latest, mut reg) = setup();
        latest.reconcile(
            updated(r#"{"loc":{"coordinates":[1.0,2.0]},"description":"first"}"#),
            &mut reg,
        );
        let before = reg.overlay(SlotKind::Latest).cloned();

        assert!(!latest.reconcile(PollOutcome::NoData, &mut reg));
        assert!(!latest.reconcile(
            PollOutcome::Failed(FetchError::Network("refused".into())),
            &mut reg
        ));

        assert_eq!(reg.overlay(SlotKind::Latest).cloned(), before);
        assert_eq!(latest.last().unwrap().description, "first");
    }

    #[test]
    fn test_successive_polls_update_in_place() {
        let (mut latest, mut reg) = setup();
        latest.reconcile(updated(r#"{"loc":{"coordinates":[1.0,2.0]}}"#), &mut reg);
        latest.reconcile(
            updated(r#"{"loc":{"coordinates":[3.0,4.0]},"accuracyM":75,"description":"moved"}"#),
            &mut reg,
        );

        let overlay = reg.overlay(SlotKind::Latest).unwrap();
        assert_eq!(overlay.position, Coordinate::new(4.0, 3.0).unwrap());
        assert_eq!(overlay.radius_m, 75.0);
        assert_eq!(reg.surface().markers_created(), 1);
        assert_eq!(reg.surface().circles_created(), 1);
    }
}

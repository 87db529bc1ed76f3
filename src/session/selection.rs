//! Selection coordinator
//!
//! ```text
//! Empty ──click / device fix──→ Selected(p)
//! Selected(p) ──click / device fix──→ Selected(p')
//! Selected(p) ──clear (after submit)──→ Empty
//! ```
//!
//! Every transition into `Selected` upserts the selection slot; the clear
//! transition removes it. The most recent event always wins.

use crate::geo::{Coordinate, GeoEvent};
use crate::overlay::{MapSurface, OverlayRegistry, OverlayStyle, SlotKind};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Empty,
    Selected(Coordinate),
}

#[derive(Debug)]
pub struct SelectionCoordinator {
    state: SelectionState,
    radius_m: f64,
    locate_zoom: u8,
    style: OverlayStyle,
}

impl SelectionCoordinator {
    pub fn new(radius_m: f64, locate_zoom: u8) -> Self {
        Self {
            state: SelectionState::Empty,
            radius_m,
            locate_zoom,
            style: OverlayStyle::selection(),
        }
    }

    /// The point a submission would carry
    pub fn selected(&self) -> Option<Coordinate> {
        match self.state {
            SelectionState::Selected(p) => Some(p),
            SelectionState::Empty => None,
        }
    }

    pub fn apply<M: MapSurface>(&mut self, event: GeoEvent, registry: &mut OverlayRegistry<M>) {
        if event.recenter {
            registry.recenter(event.position, self.locate_zoom);
        }
        registry.upsert(SlotKind::Selection, event.position, self.radius_m, &self.style);
        self.state = SelectionState::Selected(event.position);
        tracing::debug!("Selection {:?} at {}", event.origin, event.position);
    }

    pub fn clear<M: MapSurface>(&mut self, registry: &mut OverlayRegistry<M>) {
        registry.clear(SlotKind::Selection);
        self.state = SelectionState::Empty;
    }

    /// Forget the selection without touching the map (map already gone)
    pub fn reset(&mut self) {
        self.state = SelectionState::Empty;
    }
}

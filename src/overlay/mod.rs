//! Overlay registry: the single point of mutation for map visuals
//!
//! The registry owns the map surface and two slots, one per [`SlotKind`].
//! Each slot is either empty or holds exactly one marker and one circle,
//! always at the same position. [`OverlayRegistry::upsert`] and
//! [`OverlayRegistry::clear`] are the only operations that create or remove
//! map objects.
//!
//! # Lifecycle
//!
//! ```text
//! upsert(empty slot)   → add_marker + add_circle
//! upsert(occupied)     → move_marker + move_circle + set_circle_radius
//! clear(occupied)      → remove(marker) + remove(circle)
//! clear(empty)         → nothing
//! into_surface()       → slots cleared, surface handed back for destroy()
//! ```

use crate::geo::Coordinate;

pub mod memory;

pub use memory::{MapObject, MemoryMap};

/// Default label for the latest-sighting marker
pub const LATEST_TITLE: &str = "Latest sighting";

// ─────────────────────────────────────────────────────────────────────────────
// Map surface abstraction
// ─────────────────────────────────────────────────────────────────────────────

/// Visual style applied when an overlay is first created
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Circle stroke/fill color; `None` uses the surface default
    pub color: Option<String>,
    /// Marker hover title
    pub title: Option<String>,
}

impl OverlayStyle {
    /// Selection overlay: surface defaults
    pub fn selection() -> Self {
        Self {
            color: None,
            title: None,
        }
    }

    /// Latest-sighting overlay: distinct color and a title
    pub fn latest(color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            title: Some(LATEST_TITLE.to_string()),
        }
    }
}

/// The mapping library as seen by the registry
///
/// Handles are opaque children of the surface. They are only valid until
/// `remove` is called on them or the surface is destroyed.
pub trait MapSurface {
    type Handle: Copy + Eq + std::fmt::Debug;

    fn add_marker(&mut self, at: Coordinate, style: &OverlayStyle) -> Self::Handle;
    fn move_marker(&mut self, marker: Self::Handle, to: Coordinate);
    fn set_marker_label(&mut self, marker: Self::Handle, label: &str);

    fn add_circle(&mut self, at: Coordinate, radius_m: f64, style: &OverlayStyle) -> Self::Handle;
    fn move_circle(&mut self, circle: Self::Handle, to: Coordinate);
    fn set_circle_radius(&mut self, circle: Self::Handle, radius_m: f64);

    /// Detach an object from the map and release it
    fn remove(&mut self, handle: Self::Handle);

    /// Move the viewport
    fn set_view(&mut self, center: Coordinate, zoom: u8);

    /// Tear down the map; every outstanding handle becomes invalid
    fn destroy(&mut self);
}

// ─────────────────────────────────────────────────────────────────────────────
// Slots
// ─────────────────────────────────────────────────────────────────────────────

/// The two logical overlay roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Pending user selection
    Selection,
    /// Most recently reported sighting
    Latest,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Latest => "latest",
        }
    }
}

/// A live marker/circle pair
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay<H> {
    pub marker: H,
    pub circle: H,
    pub position: Coordinate,
    pub radius_m: f64,
    pub label: Option<String>,
}

/// One slot: empty, or exactly one overlay
///
/// Marker and circle handles only exist together with a position, so the
/// "handle present iff position present" rule is carried by the type.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySlot<H> {
    overlay: Option<Overlay<H>>,
}

impl<H> Default for OverlaySlot<H> {
    fn default() -> Self {
        Self { overlay: None }
    }
}

impl<H> OverlaySlot<H> {
    pub fn position(&self) -> Option<Coordinate> {
        self.overlay.as_ref().map(|o| o.position)
    }

    pub fn overlay(&self) -> Option<&Overlay<H>> {
        self.overlay.as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the map surface and both overlay slots
pub struct OverlayRegistry<M: MapSurface> {
    surface: M,
    selection: OverlaySlot<M::Handle>,
    latest: OverlaySlot<M::Handle>,
}

impl<M: MapSurface> OverlayRegistry<M> {
    pub fn new(surface: M) -> Self {
        Self {
            surface,
            selection: OverlaySlot::default(),
            latest: OverlaySlot::default(),
        }
    }

    fn slot_mut(&mut self, kind: SlotKind) -> &mut OverlaySlot<M::Handle> {
        match kind {
            SlotKind::Selection => &mut self.selection,
            SlotKind::Latest => &mut self.latest,
        }
    }

    pub fn slot(&self, kind: SlotKind) -> &OverlaySlot<M::Handle> {
        match kind {
            SlotKind::Selection => &self.selection,
            SlotKind::Latest => &self.latest,
        }
    }

    pub fn position(&self, kind: SlotKind) -> Option<Coordinate> {
        self.slot(kind).position()
    }

    pub fn overlay(&self, kind: SlotKind) -> Option<&Overlay<M::Handle>> {
        self.slot(kind).overlay()
    }

    /// Create the slot's overlay, or move and resize the existing one in place
    ///
    /// Repeating an upsert with the same arguments is a redundant redraw; it
    /// never creates a second marker or circle.
    pub fn upsert(
        &mut self,
        kind: SlotKind,
        position: Coordinate,
        radius_m: f64,
        style: &OverlayStyle,
    ) {
        // Split borrows: the slot and the surface are disjoint fields
        let Self {
            surface,
            selection,
            latest,
        } = self;
        let slot = match kind {
            SlotKind::Selection => selection,
            SlotKind::Latest => latest,
        };

        match slot.overlay.as_mut() {
            Some(overlay) => {
                surface.move_marker(overlay.marker, position);
                surface.move_circle(overlay.circle, position);
                surface.set_circle_radius(overlay.circle, radius_m);
                overlay.position = position;
                overlay.radius_m = radius_m;
                tracing::trace!("Moved {} overlay to {}", kind.as_str(), position);
            }
            None => {
                let marker = surface.add_marker(position, style);
                let circle = surface.add_circle(position, radius_m, style);
                slot.overlay = Some(Overlay {
                    marker,
                    circle,
                    position,
                    radius_m,
                    label: None,
                });
                tracing::debug!(
                    "Created {} overlay at {} (radius {} m)",
                    kind.as_str(),
                    position,
                    radius_m
                );
            }
        }
    }

    /// Bind a display label to the slot's marker; no-op on an empty slot
    pub fn set_label(&mut self, kind: SlotKind, label: &str) {
        let Self {
            surface,
            selection,
            latest,
        } = self;
        let slot = match kind {
            SlotKind::Selection => selection,
            SlotKind::Latest => latest,
        };

        if let Some(overlay) = slot.overlay.as_mut() {
            surface.set_marker_label(overlay.marker, label);
            overlay.label = Some(label.to_string());
        }
    }

    /// Remove the slot's overlay from the map; safe on an empty slot
    pub fn clear(&mut self, kind: SlotKind) {
        let Some(overlay) = self.slot_mut(kind).overlay.take() else {
            return;
        };
        self.surface.remove(overlay.circle);
        self.surface.remove(overlay.marker);
        tracing::debug!("Cleared {} overlay", kind.as_str());
    }

    pub fn recenter(&mut self, center: Coordinate, zoom: u8) {
        self.surface.set_view(center, zoom);
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    /// Release both overlays and hand the surface back to the owner
    pub fn into_surface(mut self) -> M {
        self.clear(SlotKind::Selection);
        self.clear(SlotKind::Latest);
        self.surface
    }
}

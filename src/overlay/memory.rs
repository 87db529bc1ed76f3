//! In-memory map surface
//!
//! Keeps every live marker and circle in a table keyed by handle and logs
//! each change. The headless client renders through this surface; tests use
//! its counters to check that no overlay object is ever duplicated or leaked.

use super::{MapSurface, OverlayStyle};
use crate::geo::Coordinate;
use std::collections::HashMap;
use std::fmt;

/// Opaque handle to an object on a [`MemoryMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Marker,
    Circle,
}

/// A live object on the map
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub kind: ObjectKind,
    pub position: Coordinate,
    /// Circles only
    pub radius_m: Option<f64>,
    pub color: Option<String>,
    pub title: Option<String>,
    /// Markers only
    pub label: Option<String>,
}

impl fmt::Display for MapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ObjectKind::Marker => {
                write!(f, "marker {}", self.position)?;
                if let Some(text) = self.label.as_ref().or(self.title.as_ref()) {
                    write!(f, " \"{}\"", text)?;
                }
                Ok(())
            }
            ObjectKind::Circle => {
                write!(f, "circle {}", self.position)?;
                if let Some(r) = self.radius_m {
                    write!(f, " r={} m", r)?;
                }
                write!(f, " {}", self.color.as_deref().unwrap_or("default"))
            }
        }
    }
}

#[derive(Debug)]
pub struct MemoryMap {
    objects: HashMap<ObjectId, MapObject>,
    next_id: u64,
    center: Coordinate,
    zoom: u8,
    markers_created: usize,
    circles_created: usize,
    removed: usize,
    destroyed: bool,
}

impl MemoryMap {
    pub fn new(center: Coordinate, zoom: u8) -> Self {
        tracing::debug!("Map created at {} (zoom {})", center, zoom);
        Self {
            objects: HashMap::new(),
            next_id: 1,
            center,
            zoom,
            markers_created: 0,
            circles_created: 0,
            removed: 0,
            destroyed: false,
        }
    }

    fn insert(&mut self, object: MapObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, object);
        id
    }

    /// Look up a live object; `None` once removed or destroyed
    fn live_mut(&mut self, id: ObjectId) -> Option<&mut MapObject> {
        if self.destroyed {
            tracing::warn!("Ignoring update to {:?} on a destroyed map", id);
            return None;
        }
        let object = self.objects.get_mut(&id);
        if object.is_none() {
            tracing::warn!("Ignoring update to released map object {:?}", id);
        }
        object
    }

    /// Live objects in creation order
    pub fn objects(&self) -> Vec<&MapObject> {
        let mut ids: Vec<_> = self.objects.keys().copied().collect();
        ids.sort();
        ids.iter().filter_map(|id| self.objects.get(id)).collect()
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn markers_created(&self) -> usize {
        self.markers_created
    }

    pub fn circles_created(&self) -> usize {
        self.circles_created
    }

    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn view(&self) -> (Coordinate, u8) {
        (self.center, self.zoom)
    }
}

#[cfg(test)]
impl MemoryMap {
    pub fn object(&self, id: ObjectId) -> Option<&MapObject> {
        self.objects.get(&id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl MapSurface for MemoryMap {
    type Handle = ObjectId;

    fn add_marker(&mut self, at: Coordinate, style: &OverlayStyle) -> ObjectId {
        self.markers_created += 1;
        let id = self.insert(MapObject {
            kind: ObjectKind::Marker,
            position: at,
            radius_m: None,
            color: None,
            title: style.title.clone(),
            label: None,
        });
        tracing::info!("Marker {:?} placed at {}", id, at);
        id
    }

    fn move_marker(&mut self, marker: ObjectId, to: Coordinate) {
        if let Some(object) = self.live_mut(marker) {
            object.position = to;
            tracing::info!("Marker {:?} moved to {}", marker, to);
        }
    }

    fn set_marker_label(&mut self, marker: ObjectId, label: &str) {
        if let Some(object) = self.live_mut(marker) {
            object.label = Some(label.to_string());
        }
    }

    fn add_circle(&mut self, at: Coordinate, radius_m: f64, style: &OverlayStyle) -> ObjectId {
        self.circles_created += 1;
        self.insert(MapObject {
            kind: ObjectKind::Circle,
            position: at,
            radius_m: Some(radius_m),
            color: style.color.clone(),
            title: None,
            label: None,
        })
    }

    fn move_circle(&mut self, circle: ObjectId, to: Coordinate) {
        if let Some(object) = self.live_mut(circle) {
            object.position = to;
        }
    }

    fn set_circle_radius(&mut self, circle: ObjectId, radius_m: f64) {
        if let Some(object) = self.live_mut(circle) {
            object.radius_m = Some(radius_m);
        }
    }

    fn remove(&mut self, handle: ObjectId) {
        if self.objects.remove(&handle).is_some() {
            self.removed += 1;
            tracing::info!("Map object {:?} removed", handle);
        }
    }

    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        if self.destroyed {
            return;
        }
        self.center = center;
        self.zoom = zoom;
        tracing::info!("View centered on {} (zoom {})", center, zoom);
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        let orphaned = self.objects.len();
        if orphaned > 0 {
            tracing::warn!("Destroying map with {} live object(s)", orphaned);
        }
        self.objects.clear();
        self.destroyed = true;
        tracing::debug!("Map destroyed");
    }
}

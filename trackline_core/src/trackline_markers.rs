//! Marker Store - arena of every cone the planner has ever admitted.
//!
//! Chains, staging queues and the timing list only hold [`MarkerId`] handles
//! into this store. Markers are appended, never removed, so a handle stays
//! valid for the lifetime of the planning session.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// What a marker delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRole {
    /// Left track boundary (blue cones)
    LeftBoundary,
    /// Right track boundary (yellow cones)
    RightBoundary,
    /// Start/finish timing cone (orange)
    Timing,
}

impl MarkerRole {
    pub const ALL: [MarkerRole; 3] = [
        MarkerRole::LeftBoundary,
        MarkerRole::RightBoundary,
        MarkerRole::Timing,
    ];

    /// Maps a perception colour code ('b', 'y', 'o'/'r') to a role.
    pub fn from_colour_code(code: char) -> Option<Self> {
        match code.to_ascii_lowercase() {
            'b' => Some(MarkerRole::LeftBoundary),
            'y' => Some(MarkerRole::RightBoundary),
            'o' | 'r' => Some(MarkerRole::Timing),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MarkerRole::LeftBoundary => "left",
            MarkerRole::RightBoundary => "right",
            MarkerRole::Timing => "timing",
        }
    }
}

/// One marker as reported by perception for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedMarker {
    pub position: Point2<f64>,
    pub role: MarkerRole,
}

impl ObservedMarker {
    pub fn new(x: f64, y: f64, role: MarkerRole) -> Self {
        Self {
            position: Point2::new(x, y),
            role,
        }
    }

    pub fn left(x: f64, y: f64) -> Self {
        Self::new(x, y, MarkerRole::LeftBoundary)
    }

    pub fn right(x: f64, y: f64) -> Self {
        Self::new(x, y, MarkerRole::RightBoundary)
    }

    pub fn timing(x: f64, y: f64) -> Self {
        Self::new(x, y, MarkerRole::Timing)
    }
}

/// Stable handle into a [`MarkerStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(usize);

impl MarkerId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A stored marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: Point2<f64>,
    pub role: MarkerRole,

    /// Distance to the last sort reference; only meaningful during sequencing
    scratch_distance: f64,

    /// Already paired into a centerline waypoint
    mapped: bool,
}

impl Marker {
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn scratch_distance(&self) -> f64 {
        self.scratch_distance
    }
}

/// Append-only marker arena.
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    markers: Vec<Marker>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a marker and returns its handle.
    pub fn insert(&mut self, position: Point2<f64>, role: MarkerRole) -> MarkerId {
        let id = MarkerId(self.markers.len());
        self.markers.push(Marker {
            position,
            role,
            scratch_distance: 0.0,
            mapped: false,
        });
        id
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0)
    }

    pub fn position(&self, id: MarkerId) -> Point2<f64> {
        self[id].position
    }

    /// Positions of `ids`, in the given order.
    pub fn positions(&self, ids: &[MarkerId]) -> Vec<Point2<f64>> {
        ids.iter().map(|&id| self.position(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.markers.iter().enumerate().map(|(i, m)| (MarkerId(i), m))
    }

    pub fn count_role(&self, role: MarkerRole) -> usize {
        self.markers.iter().filter(|m| m.role == role).count()
    }

    /// Marks a marker as paired. Returns `false` if it already was.
    pub(crate) fn mark_mapped(&mut self, id: MarkerId) -> bool {
        let marker = &mut self.markers[id.0];
        !std::mem::replace(&mut marker.mapped, true)
    }

    /// Recomputes the scratch distance to `reference` and returns it.
    pub(crate) fn refresh_distance(&mut self, id: MarkerId, reference: &Point2<f64>) -> f64 {
        let marker = &mut self.markers[id.0];
        marker.scratch_distance = nalgebra::distance(&marker.position, reference);
        marker.scratch_distance
    }
}

impl Index<MarkerId> for MarkerStore {
    type Output = Marker;

    fn index(&self, id: MarkerId) -> &Marker {
        &self.markers[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_stable_indices() {
        let mut store = MarkerStore::new();
        let a = store.insert(Point2::new(1.0, 5.0), MarkerRole::LeftBoundary);
        let b = store.insert(Point2::new(-1.0, 5.0), MarkerRole::RightBoundary);

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(store.position(b), Point2::new(-1.0, 5.0));
        assert_eq!(store.count_role(MarkerRole::LeftBoundary), 1);
        assert!(store.get(MarkerId(7)).is_none());
    }

    #[test]
    fn test_mapped_at_most_once() {
        let mut store = MarkerStore::new();
        let id = store.insert(Point2::new(0.0, 0.0), MarkerRole::LeftBoundary);

        assert!(!store[id].is_mapped());
        assert!(store.mark_mapped(id));
        assert!(!store.mark_mapped(id));
        assert!(store[id].is_mapped());
    }

    #[test]
    fn test_refresh_distance() {
        let mut store = MarkerStore::new();
        let id = store.insert(Point2::new(3.0, 4.0), MarkerRole::RightBoundary);

        let d = store.refresh_distance(id, &Point2::origin());
        assert_eq!(d, 5.0);
        assert_eq!(store[id].scratch_distance(), 5.0);
    }

    #[test]
    fn test_colour_codes() {
        assert_eq!(MarkerRole::from_colour_code('b'), Some(MarkerRole::LeftBoundary));
        assert_eq!(MarkerRole::from_colour_code('Y'), Some(MarkerRole::RightBoundary));
        assert_eq!(MarkerRole::from_colour_code('r'), Some(MarkerRole::Timing));
        assert_eq!(MarkerRole::from_colour_code('g'), None);
    }
}

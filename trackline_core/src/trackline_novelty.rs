//! Classifier - splits a snapshot by role and admits the markers that are new.
//!
//! Perception delivers the full visibility set every cycle, not a delta. The
//! [`NoveltyStrategy`] decides, per role, which snapshot markers are not yet
//! known to the planner.

use crate::trackline_markers::{MarkerRole, ObservedMarker};
use nalgebra::Point2;

/// Rule deciding which snapshot markers of one role are new.
pub trait NoveltyStrategy {
    /// Returns the markers of `snapshot` that are not in `known`, in snapshot order.
    fn admit_new(&self, snapshot: &[Point2<f64>], known: &[Point2<f64>]) -> Vec<Point2<f64>>;

    fn name(&self) -> &'static str;
}

/// Count-based novelty: admits the snapshot markers past the known count.
///
/// Assumes the snapshot is a stable superset of earlier snapshots (previously
/// reported markers keep their order and role). A reordered snapshot can
/// under- or over-admit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountNovelty;

impl NoveltyStrategy for CountNovelty {
    fn admit_new(&self, snapshot: &[Point2<f64>], known: &[Point2<f64>]) -> Vec<Point2<f64>> {
        snapshot.iter().skip(known.len()).copied().collect()
    }

    fn name(&self) -> &'static str {
        "count"
    }
}

/// Identity by position: a marker is new if nothing known or already admitted
/// in this call lies within `match_radius`.
#[derive(Debug, Clone, Copy)]
pub struct ProximityNovelty {
    match_radius: f64,
}

impl ProximityNovelty {
    pub fn new(match_radius: f64) -> Self {
        Self { match_radius }
    }

    pub fn match_radius(&self) -> f64 {
        self.match_radius
    }
}

impl Default for ProximityNovelty {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl NoveltyStrategy for ProximityNovelty {
    fn admit_new(&self, snapshot: &[Point2<f64>], known: &[Point2<f64>]) -> Vec<Point2<f64>> {
        let mut admitted: Vec<Point2<f64>> = Vec::new();
        for candidate in snapshot {
            let seen = known
                .iter()
                .chain(admitted.iter())
                .any(|k| nalgebra::distance(k, candidate) <= self.match_radius);
            if !seen {
                admitted.push(*candidate);
            }
        }
        admitted
    }

    fn name(&self) -> &'static str {
        "proximity"
    }
}

impl<N: NoveltyStrategy + ?Sized> NoveltyStrategy for Box<N> {
    fn admit_new(&self, snapshot: &[Point2<f64>], known: &[Point2<f64>]) -> Vec<Point2<f64>> {
        (**self).admit_new(snapshot, known)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Marker positions grouped by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolePartition {
    pub left: Vec<Point2<f64>>,
    pub right: Vec<Point2<f64>>,
    pub timing: Vec<Point2<f64>>,
}

impl RolePartition {
    /// Splits a snapshot by role, preserving snapshot order within each role.
    pub fn from_snapshot(snapshot: &[ObservedMarker]) -> Self {
        let mut partition = Self::default();
        for marker in snapshot {
            partition.role_mut(marker.role).push(marker.position);
        }
        partition
    }

    pub fn role(&self, role: MarkerRole) -> &[Point2<f64>] {
        match role {
            MarkerRole::LeftBoundary => &self.left,
            MarkerRole::RightBoundary => &self.right,
            MarkerRole::Timing => &self.timing,
        }
    }

    pub fn role_mut(&mut self, role: MarkerRole) -> &mut Vec<Point2<f64>> {
        match role {
            MarkerRole::LeftBoundary => &mut self.left,
            MarkerRole::RightBoundary => &mut self.right,
            MarkerRole::Timing => &mut self.timing,
        }
    }

    pub fn total(&self) -> usize {
        self.left.len() + self.right.len() + self.timing.len()
    }
}

/// Runs `strategy` once per role and returns the admitted markers.
pub fn classify<N: NoveltyStrategy + ?Sized>(
    strategy: &N,
    snapshot: &[ObservedMarker],
    known: &RolePartition,
) -> RolePartition {
    let visible = RolePartition::from_snapshot(snapshot);
    let mut admitted = RolePartition::default();
    for role in MarkerRole::ALL {
        *admitted.role_mut(role) = strategy.admit_new(visible.role(role), known.role(role));
    }
    admitted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point2<f64>> {
        raw.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[test]
    fn test_count_novelty_admits_tail() {
        let snapshot = pts(&[(1.0, 5.0), (1.0, 10.0), (1.0, 15.0)]);
        let known = pts(&[(1.0, 5.0)]);

        let admitted = CountNovelty.admit_new(&snapshot, &known);
        assert_eq!(admitted, pts(&[(1.0, 10.0), (1.0, 15.0)]));
    }

    #[test]
    fn test_count_novelty_shrinking_snapshot_admits_nothing() {
        let snapshot = pts(&[(1.0, 5.0)]);
        let known = pts(&[(1.0, 5.0), (1.0, 10.0)]);
        assert!(CountNovelty.admit_new(&snapshot, &known).is_empty());
    }

    #[test]
    fn test_count_novelty_misses_reordered_snapshot() {
        // Same count, different marker: count-based novelty cannot tell.
        let snapshot = pts(&[(9.0, 9.0)]);
        let known = pts(&[(1.0, 5.0)]);
        assert!(CountNovelty.admit_new(&snapshot, &known).is_empty());
    }

    #[test]
    fn test_proximity_novelty_matches_by_position() {
        let strategy = ProximityNovelty::default();
        let snapshot = pts(&[(9.0, 9.0), (1.2, 5.1), (9.3, 9.0)]);
        let known = pts(&[(1.0, 5.0)]);

        // (1.2, 5.1) is known, (9.3, 9.0) duplicates an admission in this call
        let admitted = strategy.admit_new(&snapshot, &known);
        assert_eq!(admitted, pts(&[(9.0, 9.0)]));
    }

    #[test]
    fn test_classify_partitions_by_role() {
        let snapshot = vec![
            ObservedMarker::left(1.0, 5.0),
            ObservedMarker::right(-1.0, 5.0),
            ObservedMarker::timing(5.0, 0.0),
            ObservedMarker::left(1.0, 10.0),
        ];
        let known = RolePartition {
            left: pts(&[(1.0, 5.0)]),
            ..Default::default()
        };

        let admitted = classify(&CountNovelty, &snapshot, &known);
        assert_eq!(admitted.left, pts(&[(1.0, 10.0)]));
        assert_eq!(admitted.right, pts(&[(-1.0, 5.0)]));
        assert_eq!(admitted.timing, pts(&[(5.0, 0.0)]));
        assert_eq!(admitted.total(), 3);
    }

    #[test]
    fn test_boxed_strategy() {
        let strategy: Box<dyn NoveltyStrategy> = Box::new(ProximityNovelty::new(0.5));
        assert_eq!(strategy.name(), "proximity");
        assert_eq!(strategy.admit_new(&pts(&[(0.0, 0.0)]), &[]).len(), 1);
    }
}

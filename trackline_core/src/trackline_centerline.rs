//! Centerline Builder - pairs left/right markers into candidate waypoints.

use crate::trackline_boundary::BoundaryChain;
use crate::trackline_markers::{MarkerId, MarkerStore};
use crate::trackline_profile::Waypoint;
use crate::trackline_zone::TimingGate;
use nalgebra::Point2;

/// Distance thresholds for one pairing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairingParams {
    /// Left/right markers must lie strictly closer than this
    pub pairing_radius: f64,

    /// Paired midpoints must lie strictly closer than this to the vehicle
    pub proximity_gate: f64,

    /// The tail midpoint is only appended past this distance from the last waypoint
    pub min_progress: f64,
}

/// Where a candidate waypoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Midpoint of a left/right pair
    Paired { left: MarkerId, right: MarkerId },
    /// Midpoint of the two chain tails
    TailMidpoint,
    /// Opening waypoint re-offered when a closed circuit is completed
    LapClosure,
}

/// A centerline waypoint produced this cycle, not yet committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub position: Point2<f64>,
    pub source: CandidateSource,
}

/// Opening waypoints that lie strictly beyond `gate` as seen from the start.
///
/// On a closed circuit the cones just past the finish line were mapped while
/// the path was first built, so neither a new pair nor the tail midpoint can
/// ever land there again. Once the chains wrap around, these stand in.
pub fn lap_closure_candidates(opening: &[Waypoint], gate: &TimingGate) -> Vec<Candidate> {
    let Some(start) = opening.first().map(|w| w.position) else {
        return Vec::new();
    };
    opening
        .iter()
        .filter(|w| gate.separates(&start, &w.position))
        .map(|w| Candidate {
            position: w.position,
            source: CandidateSource::LapClosure,
        })
        .collect()
}

/// Builds this cycle's candidate waypoints.
///
/// Every unmapped left marker, in chain order, is paired with the nearest
/// unmapped right marker inside the pairing radius. Both get marked mapped
/// even when the midpoint then fails the proximity gate. Afterwards the
/// midpoint of the two chain tails is appended if it has moved more than
/// `min_progress` past the last candidate (or `last_committed`).
pub fn build_candidates(
    store: &mut MarkerStore,
    left: &BoundaryChain,
    right: &BoundaryChain,
    vehicle: &Point2<f64>,
    last_committed: Option<Point2<f64>>,
    params: &PairingParams,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for &left_id in left.ids() {
        if store[left_id].is_mapped() {
            continue;
        }
        let left_pos = store.position(left_id);
        let Some(right_id) = nearest_unmapped(store, right, &left_pos, params.pairing_radius) else {
            continue;
        };

        store.mark_mapped(left_id);
        store.mark_mapped(right_id);

        let midpoint = nalgebra::center(&left_pos, &store.position(right_id));
        if nalgebra::distance(&midpoint, vehicle) < params.proximity_gate {
            candidates.push(Candidate {
                position: midpoint,
                source: CandidateSource::Paired { left: left_id, right: right_id },
            });
        }
    }

    if let (Some(left_tail), Some(right_tail)) = (left.tail(), right.tail()) {
        let tail_mid = nalgebra::center(&store.position(left_tail), &store.position(right_tail));
        let last = candidates.last().map(|c| c.position).or(last_committed);
        let progressed = last.map_or(true, |p| nalgebra::distance(&p, &tail_mid) > params.min_progress);
        if progressed {
            candidates.push(Candidate {
                position: tail_mid,
                source: CandidateSource::TailMidpoint,
            });
        }
    }

    candidates
}

/// Nearest unmapped marker of `chain` strictly within `radius` of `from`.
/// Ties go to the earlier chain entry.
fn nearest_unmapped(
    store: &MarkerStore,
    chain: &BoundaryChain,
    from: &Point2<f64>,
    radius: f64,
) -> Option<MarkerId> {
    chain
        .ids()
        .iter()
        .filter(|&&id| !store[id].is_mapped())
        .map(|&id| (id, nalgebra::distance(&store.position(id), from)))
        .filter(|&(_, d)| d < radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

//! Zone State Machine - start departure and finish-line crossing.
//!
//! ```text
//! Approaching ──(vehicle > departure_distance from start)──▶ DepartedStart
//! DepartedStart ──(candidate crosses the timing gate)──────▶ Finishing
//! Finishing ──(chain tails within closing_distance)───────▶ Finished
//! ```
//!
//! The tracker sits between the centerline builder and the profiler: it decides
//! which candidates are committed so the crossing waypoint lands before the
//! first far-side waypoint without ever editing the committed path.

use crate::trackline_profile::Waypoint;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Start/finish lifecycle of one planning session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneState {
    #[default]
    Approaching,
    DepartedStart,
    Finishing,
    Finished,
}

impl ZoneState {
    pub fn name(&self) -> &'static str {
        match self {
            ZoneState::Approaching => "approaching",
            ZoneState::DepartedStart => "departed_start",
            ZoneState::Finishing => "finishing",
            ZoneState::Finished => "finished",
        }
    }
}

impl fmt::Display for ZoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Finish line through the two earliest timing markers. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingGate {
    first: Point2<f64>,
    second: Point2<f64>,
}

impl TimingGate {
    pub fn new(first: Point2<f64>, second: Point2<f64>) -> Self {
        Self { first, second }
    }

    /// Gate from the two earliest-observed timing markers, if both are known.
    pub fn from_timing(markers: &[Point2<f64>]) -> Option<Self> {
        match markers {
            [first, second, ..] => Some(Self::new(*first, *second)),
            _ => None,
        }
    }

    pub fn endpoints(&self) -> (Point2<f64>, Point2<f64>) {
        (self.first, self.second)
    }

    pub fn is_vertical(&self) -> bool {
        self.first.x == self.second.x
    }

    /// `true` if `point` lies strictly left of the directed line first → second.
    ///
    /// Uses the cross-product sign, so vertical gates need no slope.
    pub fn side_of(&self, point: &Point2<f64>) -> bool {
        self.signed_offset(point) > 0.0
    }

    /// Cross product of the gate direction with `point`; zero on the line.
    pub fn signed_offset(&self, point: &Point2<f64>) -> f64 {
        (self.second - self.first).perp(&(point - self.first))
    }

    /// `true` if `point` lies strictly on the other side of the line from `reference`.
    pub fn separates(&self, reference: &Point2<f64>, point: &Point2<f64>) -> bool {
        self.signed_offset(reference) * self.signed_offset(point) < 0.0
    }

    /// Where the path crosses the finish line.
    pub fn crossing_point(&self) -> Point2<f64> {
        if self.is_vertical() {
            Point2::new(self.first.x, (self.first.y + self.second.y) / 2.0)
        } else {
            nalgebra::center(&self.first, &self.second)
        }
    }
}

/// What [`ZoneTracker::commit`] did with one cycle's candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub committed: usize,
    pub dropped: usize,
    pub finish_triggered: bool,
}

/// Drives [`ZoneState`] and gates candidate commits.
#[derive(Debug, Clone)]
pub struct ZoneTracker {
    state: ZoneState,
    departure_distance: f64,
    closing_distance: f64,

    /// Gate side of the path's first waypoint, fixed when scanning starts
    initial_side: Option<bool>,

    /// Gate side of the last classified waypoint
    last_side: Option<bool>,

    /// `[crossing, trigger]`, held until the finish closes
    finish_segment: Vec<Waypoint>,
}

impl ZoneTracker {
    pub fn new(departure_distance: f64, closing_distance: f64) -> Self {
        Self {
            state: ZoneState::Approaching,
            departure_distance,
            closing_distance,
            initial_side: None,
            last_side: None,
            finish_segment: Vec::new(),
        }
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    pub fn finish_segment(&self) -> &[Waypoint] {
        &self.finish_segment
    }

    /// Latches departure once the vehicle is far enough from `start`.
    pub fn observe_vehicle(&mut self, vehicle: &Point2<f64>, start: &Point2<f64>) {
        if self.state == ZoneState::Approaching
            && nalgebra::distance(vehicle, start) > self.departure_distance
        {
            self.state = ZoneState::DepartedStart;
            info!(x = vehicle.x, y = vehicle.y, "Departed start zone");
        }
    }

    /// Commits `candidates` onto `path`, scanning for the finish crossing
    /// once departed and a gate is known.
    pub fn commit(
        &mut self,
        path: &mut Vec<Waypoint>,
        candidates: impl IntoIterator<Item = Point2<f64>>,
        gate: Option<&TimingGate>,
    ) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();

        let scan_gate = match (self.state, gate) {
            (ZoneState::Finishing | ZoneState::Finished, _) => {
                outcome.dropped = candidates.into_iter().count();
                return outcome;
            }
            (ZoneState::DepartedStart, Some(gate)) => Some(gate),
            _ => None,
        };

        let Some(gate) = scan_gate else {
            for candidate in candidates {
                path.push(Waypoint::at(candidate));
                outcome.committed += 1;
            }
            return outcome;
        };

        if self.initial_side.is_none() {
            self.initial_side = path.first().map(|w| gate.side_of(&w.position));
            self.last_side = path.last().map(|w| gate.side_of(&w.position));
        }

        for candidate in candidates {
            if outcome.finish_triggered {
                outcome.dropped += 1;
                continue;
            }

            let side = gate.side_of(&candidate);
            let crossed = self.initial_side.is_some_and(|initial| {
                side != initial && self.last_side == Some(initial)
            });

            if crossed {
                let crossing = gate.crossing_point();
                self.finish_segment = vec![Waypoint::at(crossing), Waypoint::at(candidate)];
                self.state = ZoneState::Finishing;
                outcome.finish_triggered = true;
                info!(
                    crossing_x = crossing.x,
                    crossing_y = crossing.y,
                    "Finish line crossed, waiting for track to close"
                );
            } else {
                path.push(Waypoint::at(candidate));
                outcome.committed += 1;
            }
            self.last_side = Some(side);
        }

        outcome
    }

    /// Appends the held finish segment once the chain tails close up.
    /// Returns `true` on the transition to [`ZoneState::Finished`].
    pub fn try_finalize(
        &mut self,
        path: &mut Vec<Waypoint>,
        tails: Option<(Point2<f64>, Point2<f64>)>,
    ) -> bool {
        if self.state != ZoneState::Finishing {
            return false;
        }
        let Some((left, right)) = tails else {
            return false;
        };
        if nalgebra::distance(&left, &right) > self.closing_distance {
            return false;
        }

        path.extend(self.finish_segment.drain(..));
        self.state = ZoneState::Finished;
        info!(waypoints = path.len(), "Path finalized");
        true
    }

    /// Back to [`ZoneState::Approaching`] with a fresh scan.
    pub fn reset(&mut self) {
        self.state = ZoneState::Approaching;
        self.initial_side = None;
        self.last_side = None;
        self.finish_segment.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &[(f64, f64)]) -> Vec<Waypoint> {
        raw.iter().map(|&(x, y)| Waypoint::at(Point2::new(x, y))).collect()
    }

    fn positions(path: &[Waypoint]) -> Vec<(f64, f64)> {
        path.iter().map(|w| (w.position.x, w.position.y)).collect()
    }

    fn vertical_gate() -> TimingGate {
        TimingGate::new(Point2::new(5.0, 0.0), Point2::new(5.0, 10.0))
    }

    fn departed() -> ZoneTracker {
        let mut zone = ZoneTracker::new(10.0, 5.0);
        zone.observe_vehicle(&Point2::new(0.0, 20.0), &Point2::origin());
        assert_eq!(zone.state(), ZoneState::DepartedStart);
        zone
    }

    #[test]
    fn test_departure_latches() {
        let mut zone = ZoneTracker::new(10.0, 5.0);
        zone.observe_vehicle(&Point2::new(0.0, 10.0), &Point2::origin());
        assert_eq!(zone.state(), ZoneState::Approaching);

        zone.observe_vehicle(&Point2::new(0.0, 10.5), &Point2::origin());
        assert_eq!(zone.state(), ZoneState::DepartedStart);

        zone.observe_vehicle(&Point2::origin(), &Point2::origin());
        assert_eq!(zone.state(), ZoneState::DepartedStart);
    }

    #[test]
    fn test_vertical_gate_sides() {
        let gate = vertical_gate();
        assert!(gate.is_vertical());
        assert_ne!(gate.side_of(&Point2::new(4.0, 5.0)), gate.side_of(&Point2::new(6.0, 5.0)));
        assert_eq!(gate.side_of(&Point2::new(4.0, -3.0)), gate.side_of(&Point2::new(0.0, 50.0)));
        assert_eq!(gate.crossing_point(), Point2::new(5.0, 5.0));
    }

    #[test]
    fn test_points_on_the_line_are_not_separated() {
        let gate = vertical_gate();
        let start = Point2::new(2.0, 5.0);

        assert!(gate.separates(&start, &Point2::new(8.0, -4.0)));
        assert!(!gate.separates(&start, &Point2::new(5.0, 30.0)));
        assert!(!gate.separates(&start, &Point2::new(1.0, 1.0)));
        assert_eq!(gate.signed_offset(&Point2::new(5.0, 2.0)), 0.0);
    }

    #[test]
    fn test_from_timing_needs_two() {
        assert!(TimingGate::from_timing(&[Point2::new(5.0, 0.0)]).is_none());
        let gate = TimingGate::from_timing(&[
            Point2::new(5.0, 0.0),
            Point2::new(5.0, 10.0),
            Point2::new(9.0, 9.0),
        ])
        .unwrap();
        assert_eq!(gate, vertical_gate());
    }

    #[test]
    fn test_approaching_commits_everything() {
        let mut zone = ZoneTracker::new(10.0, 5.0);
        let mut wps = path(&[(0.0, 5.0)]);
        let outcome = zone.commit(
            &mut wps,
            [Point2::new(6.0, 5.0), Point2::new(8.0, 5.0)],
            Some(&vertical_gate()),
        );
        assert_eq!(outcome.committed, 2);
        assert_eq!(zone.state(), ZoneState::Approaching);
    }

    #[test]
    fn test_crossing_inserted_before_far_side() {
        let mut zone = departed();
        let gate = vertical_gate();
        let mut wps = path(&[(0.0, 5.0), (2.0, 5.0), (4.0, 5.0)]);

        let outcome = zone.commit(
            &mut wps,
            [Point2::new(4.5, 5.0), Point2::new(6.0, 5.0), Point2::new(8.0, 5.0)],
            Some(&gate),
        );

        assert_eq!(
            outcome,
            CommitOutcome { committed: 1, dropped: 1, finish_triggered: true }
        );
        assert_eq!(zone.state(), ZoneState::Finishing);
        assert_eq!(positions(&wps).last(), Some(&(4.5, 5.0)));
        assert_eq!(positions(zone.finish_segment()), vec![(5.0, 5.0), (6.0, 5.0)]);

        // Tails still wide apart
        assert!(!zone.try_finalize(&mut wps, Some((Point2::new(7.0, 12.0), Point2::new(7.0, 3.5)))));
        assert_eq!(wps.len(), 4);

        assert!(zone.try_finalize(&mut wps, Some((Point2::new(7.0, 6.5), Point2::new(7.0, 3.5)))));
        assert_eq!(zone.state(), ZoneState::Finished);
        assert_eq!(
            positions(&wps)[3..],
            [(4.5, 5.0), (5.0, 5.0), (6.0, 5.0)]
        );
    }

    #[test]
    fn test_finish_runs_once() {
        let mut zone = departed();
        let gate = vertical_gate();
        let mut wps = path(&[(0.0, 5.0), (4.0, 5.0)]);

        zone.commit(&mut wps, [Point2::new(6.0, 5.0)], Some(&gate));
        let again = zone.commit(&mut wps, [Point2::new(4.0, 7.0), Point2::new(6.0, 7.0)], Some(&gate));

        assert_eq!(again.committed, 0);
        assert_eq!(again.dropped, 2);
        assert!(!again.finish_triggered);
        assert_eq!(wps.len(), 2);
    }

    #[test]
    fn test_scan_starts_from_last_committed() {
        let mut zone = departed();
        let gate = vertical_gate();
        // Path already on the far side when the gate becomes known
        let mut wps = path(&[(0.0, 5.0), (7.0, 5.0)]);

        let outcome = zone.commit(&mut wps, [Point2::new(9.0, 5.0)], Some(&gate));
        assert!(!outcome.finish_triggered);
        assert_eq!(zone.state(), ZoneState::DepartedStart);
    }

    #[test]
    fn test_no_gate_commits_everything() {
        let mut zone = departed();
        let mut wps = path(&[(0.0, 5.0)]);
        let outcome = zone.commit(&mut wps, [Point2::new(6.0, 5.0)], None);
        assert_eq!(outcome.committed, 1);
    }

    #[test]
    fn test_reset() {
        let mut zone = departed();
        let mut wps = path(&[(0.0, 5.0), (4.0, 5.0)]);
        zone.commit(&mut wps, [Point2::new(6.0, 5.0)], Some(&vertical_gate()));
        assert_eq!(zone.state(), ZoneState::Finishing);

        zone.reset();
        assert_eq!(zone.state(), ZoneState::Approaching);
        assert!(zone.finish_segment().is_empty());
    }
}

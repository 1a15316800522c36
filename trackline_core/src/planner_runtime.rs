//! Planner Runtime - runs the incremental planning cycle.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         PathPlanner                            │
//! │                                                                │
//! │  snapshot ─▶ classify ─▶ stage/sort ─▶ sequence ─▶ pair        │
//! │               (novelty)   (queues)     (chains)   (candidates) │
//! │                                                        │       │
//! │              emit ◀── profile ◀── zone gate ◀──────────┘       │
//! │         (PlannedPath) (velocities) (commit / finish)           │
//! │                                                                │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │ MarkerStore: every admitted cone, referenced by MarkerId │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use nalgebra::Point2;
//! use trackline_core::{ObservedMarker, PathPlanner, PlannerConfig};
//!
//! let cones = [
//!     ObservedMarker::left(1.0, 5.0),
//!     ObservedMarker::left(1.0, 10.0),
//!     ObservedMarker::right(-1.0, 5.0),
//!     ObservedMarker::right(-1.0, 10.0),
//! ];
//! let mut planner = PathPlanner::new(Point2::origin(), &cones, PlannerConfig::default());
//! let path = planner.update(&cones, Point2::new(0.0, 1.0));
//! assert_eq!(path.len(), 3);
//! ```

use crate::config::PlannerConfig;
use crate::trackline_boundary::{sequence, BoundaryChain, SequenceStats, Side, StagingQueue};
use crate::trackline_centerline::{build_candidates, lap_closure_candidates, PairingParams};
use crate::trackline_markers::{MarkerId, MarkerRole, MarkerStore, ObservedMarker};
use crate::trackline_novelty::{classify, CountNovelty, NoveltyStrategy, RolePartition};
use crate::trackline_profile::{SpeedProfile, Waypoint};
use crate::trackline_zone::{TimingGate, ZoneState, ZoneTracker};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

// ============================================================================
// OUTPUT
// ============================================================================

/// The path handed to trajectory tracking: three equal-length sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedPath {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub velocities: Vec<f64>,
}

impl PlannedPath {
    pub fn from_waypoints(waypoints: &[Waypoint]) -> Self {
        Self {
            xs: waypoints.iter().map(|w| w.position.x).collect(),
            ys: waypoints.iter().map(|w| w.position.y).collect(),
            velocities: waypoints.iter().map(|w| w.velocity).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.xs.iter().zip(&self.ys).map(|(&x, &y)| Point2::new(x, y))
    }
}

/// What happened during one planning cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// 0 for construction, then 1, 2, ...
    pub cycle: u64,
    pub admitted_left: usize,
    pub admitted_right: usize,
    pub admitted_timing: usize,
    pub left: SequenceStats,
    pub right: SequenceStats,
    pub candidates: usize,
    pub committed: usize,
    pub waypoints: usize,
    pub zone: ZoneState,
}

// ============================================================================
// PLANNER
// ============================================================================

/// Thresholds that differ between construction and later cycles.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Construction,
    Cycle,
}

/// Incremental cone-to-centerline planner.
///
/// Generic over the novelty rule so a stricter identity match can replace
/// the default count-based one.
pub struct PathPlanner<N: NoveltyStrategy = CountNovelty> {
    config: PlannerConfig,
    novelty: N,
    profile: SpeedProfile,

    /// Every admitted cone
    store: MarkerStore,

    left_chain: BoundaryChain,
    right_chain: BoundaryChain,
    left_staging: StagingQueue,
    right_staging: StagingQueue,

    /// Timing cones in first-observed order
    timing: Vec<MarkerId>,
    gate: Option<TimingGate>,

    /// Committed path; the first waypoint is the vehicle at construction
    waypoints: Vec<Waypoint>,

    /// Waypoints committed by construction
    opening_len: usize,

    /// Opening waypoints have been re-offered to close the lap
    lap_closure_offered: bool,
    zone: ZoneTracker,

    cycle: u64,
    last_report: CycleReport,
}

impl PathPlanner<CountNovelty> {
    /// Seeds a planner from the initial snapshot using [`CountNovelty`].
    pub fn new(vehicle: Point2<f64>, markers: &[ObservedMarker], config: PlannerConfig) -> Self {
        Self::with_novelty(vehicle, markers, config, CountNovelty)
    }
}

impl<N: NoveltyStrategy> PathPlanner<N> {
    /// Seeds a planner from the initial snapshot with a custom novelty rule.
    pub fn with_novelty(
        vehicle: Point2<f64>,
        markers: &[ObservedMarker],
        config: PlannerConfig,
        novelty: N,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Planner config is invalid, speeds are clamped to [0, v_max]");
        }
        let profile = SpeedProfile::from_config(&config);
        let zone = ZoneTracker::new(config.departure_distance, config.closing_distance);

        let mut planner = Self {
            config,
            novelty,
            profile,
            store: MarkerStore::new(),
            left_chain: BoundaryChain::default(),
            right_chain: BoundaryChain::default(),
            left_staging: StagingQueue::default(),
            right_staging: StagingQueue::default(),
            timing: Vec::new(),
            gate: None,
            waypoints: vec![Waypoint::at(vehicle)],
            opening_len: 1,
            lap_closure_offered: false,
            zone,
            cycle: 0,
            last_report: CycleReport::default(),
        };

        planner.run_cycle(markers, &vehicle, Phase::Construction);
        planner.opening_len = planner.waypoints.len();
        info!(
            novelty = planner.novelty.name(),
            markers = planner.store.len(),
            waypoints = planner.waypoints.len(),
            "Planner constructed"
        );
        planner
    }

    /// Runs one cycle and returns the updated path.
    ///
    /// Once [`ZoneState::Finished`] the final path is returned unchanged.
    pub fn update(&mut self, markers: &[ObservedMarker], vehicle: Point2<f64>) -> PlannedPath {
        if self.zone.state() == ZoneState::Finished {
            trace!("Path finished, cycle skipped");
            return self.path();
        }

        self.cycle += 1;
        self.run_cycle(markers, &vehicle, Phase::Cycle);
        self.path()
    }

    /// Releases the staging queues and resets the zone state.
    pub fn teardown(&mut self) {
        self.left_staging.release();
        self.right_staging.release();
        self.zone.reset();
        self.lap_closure_offered = false;
        debug!(cycle = self.cycle, "Planner torn down");
    }

    fn run_cycle(&mut self, markers: &[ObservedMarker], vehicle: &Point2<f64>, phase: Phase) {
        let (gate_threshold, pairing_radius) = match phase {
            Phase::Construction => (self.config.construction_gate, self.config.construction_pairing_radius),
            Phase::Cycle => (self.config.cycle_gate, self.config.pairing_radius),
        };

        // 1. Classify and stage
        let admitted = classify(&self.novelty, markers, &self.known_markers());
        self.stage(&admitted);

        // 2. Sequence both sides
        let left = sequence(
            Side::Left,
            &mut self.left_staging,
            &mut self.left_chain,
            &mut self.store,
            vehicle,
            gate_threshold,
        );
        let right = sequence(
            Side::Right,
            &mut self.right_staging,
            &mut self.right_chain,
            &mut self.store,
            vehicle,
            gate_threshold,
        );

        // 3. Pair into candidates
        let params = PairingParams {
            pairing_radius,
            proximity_gate: self.config.proximity_gate,
            min_progress: self.config.min_progress,
        };
        let mut candidates = build_candidates(
            &mut self.store,
            &self.left_chain,
            &self.right_chain,
            vehicle,
            self.waypoints.last().map(|w| w.position),
            &params,
        );
        if let Some(gate) = self.lap_closing_gate(gate_threshold) {
            let closure = lap_closure_candidates(&self.waypoints[..self.opening_len], &gate);
            info!(candidates = closure.len(), "Chains wrapped around, closing the lap");
            candidates.extend(closure);
            self.lap_closure_offered = true;
        }

        // 4. Zone gate
        let committed_before = self.waypoints.len();
        if let Some(start) = self.waypoints.first().map(|w| w.position) {
            self.zone.observe_vehicle(vehicle, &start);
        }
        let outcome = self.zone.commit(
            &mut self.waypoints,
            candidates.iter().map(|c| c.position),
            self.gate.as_ref(),
        );
        let tails = self.chain_tails();
        self.zone.try_finalize(&mut self.waypoints, tails);

        // 5. Profile
        self.profile
            .apply(&mut self.waypoints, self.zone.state() == ZoneState::Finished);

        self.left_staging.clear();
        self.right_staging.clear();

        self.last_report = CycleReport {
            cycle: self.cycle,
            admitted_left: admitted.left.len(),
            admitted_right: admitted.right.len(),
            admitted_timing: admitted.timing.len(),
            left,
            right,
            candidates: candidates.len(),
            committed: self.waypoints.len() - committed_before,
            waypoints: self.waypoints.len(),
            zone: self.zone.state(),
        };
        if outcome.finish_triggered {
            debug!(dropped = outcome.dropped, "Candidates dropped after finish trigger");
        }
        debug!(
            cycle = self.cycle,
            admitted = admitted.total(),
            promoted = left.promoted + right.promoted,
            discarded = left.discarded + right.discarded,
            candidates = candidates.len(),
            waypoints = self.waypoints.len(),
            zone = %self.zone.state(),
            "Cycle complete"
        );
    }

    /// Markers already known per role: chain plus staging for the boundaries,
    /// every stored timing marker for timing.
    fn known_markers(&self) -> RolePartition {
        let side = |chain: &BoundaryChain, staging: &StagingQueue| {
            let mut known = self.store.positions(chain.ids());
            known.extend(staging.ids().map(|id| self.store.position(id)));
            known
        };
        RolePartition {
            left: side(&self.left_chain, &self.left_staging),
            right: side(&self.right_chain, &self.right_staging),
            timing: self.store.positions(&self.timing),
        }
    }

    fn stage(&mut self, admitted: &RolePartition) {
        for role in MarkerRole::ALL {
            for &position in admitted.role(role) {
                let id = self.store.insert(position, role);
                match role {
                    MarkerRole::LeftBoundary => self.left_staging.push(id),
                    MarkerRole::RightBoundary => self.right_staging.push(id),
                    MarkerRole::Timing => self.timing.push(id),
                }
            }
        }

        if self.gate.is_none() {
            self.gate = TimingGate::from_timing(&self.store.positions(&self.timing));
            if let Some(gate) = &self.gate {
                let (first, second) = gate.endpoints();
                info!(
                    x1 = first.x,
                    y1 = first.y,
                    x2 = second.x,
                    y2 = second.y,
                    "Timing gate established"
                );
            }
        }
    }

    /// The timing gate, once after departure, when either chain has come
    /// back around to its own head.
    fn lap_closing_gate(&self, gate_threshold: f64) -> Option<TimingGate> {
        if self.lap_closure_offered || self.zone.state() != ZoneState::DepartedStart {
            return None;
        }
        let gate = self.gate?;
        let wrapped = self.left_chain.wraps(&self.store, gate_threshold)
            || self.right_chain.wraps(&self.store, gate_threshold);
        wrapped.then_some(gate)
    }

    fn chain_tails(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let left = self.left_chain.tail()?;
        let right = self.right_chain.tail()?;
        Some((self.store.position(left), self.store.position(right)))
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Current committed path as [`PlannedPath`].
    pub fn path(&self) -> PlannedPath {
        PlannedPath::from_waypoints(&self.waypoints)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn left_chain(&self) -> Vec<Point2<f64>> {
        self.store.positions(self.left_chain.ids())
    }

    pub fn right_chain(&self) -> Vec<Point2<f64>> {
        self.store.positions(self.right_chain.ids())
    }

    pub fn zone_state(&self) -> ZoneState {
        self.zone.state()
    }

    pub fn timing_gate(&self) -> Option<&TimingGate> {
        self.gate.as_ref()
    }

    pub fn marker_store(&self) -> &MarkerStore {
        &self.store
    }

    pub fn last_report(&self) -> &CycleReport {
        &self.last_report
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn novelty(&self) -> &N {
        &self.novelty
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_cones() -> Vec<ObservedMarker> {
        vec![
            ObservedMarker::left(1.0, 5.0),
            ObservedMarker::left(1.0, 10.0),
            ObservedMarker::right(-1.0, 5.0),
            ObservedMarker::right(-1.0, 10.0),
        ]
    }

    fn xy(path: &PlannedPath) -> Vec<(f64, f64)> {
        path.points().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn test_construction_scenario() {
        let planner = PathPlanner::new(Point2::origin(), &straight_cones(), PlannerConfig::default());

        assert_eq!(planner.left_chain(), vec![Point2::new(1.0, 5.0), Point2::new(1.0, 10.0)]);
        assert_eq!(planner.right_chain(), vec![Point2::new(-1.0, 5.0), Point2::new(-1.0, 10.0)]);

        let path = planner.path();
        assert_eq!(xy(&path), vec![(0.0, 0.0), (0.0, 5.0), (0.0, 10.0)]);
        assert_eq!(path.velocities, vec![10.0, 10.0, 0.0]);

        let report = planner.last_report();
        assert_eq!(report.cycle, 0);
        assert_eq!(report.admitted_left, 2);
        assert_eq!(report.left.promoted, 2);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.committed, 2);
        assert_eq!(report.zone, ZoneState::Approaching);
    }

    #[test]
    fn test_invalid_config_keeps_speeds_bounded() {
        let config = PlannerConfig {
            constant_velocity: true,
            v_const: 20.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let planner = PathPlanner::new(Point2::origin(), &straight_cones(), config);
        let path = planner.path();
        assert_eq!(path.len(), 3);
        assert!(path.velocities.iter().all(|&v| v == 10.0));
    }

    #[test]
    fn test_second_cycle_extends_path() {
        let mut planner = PathPlanner::new(Point2::origin(), &straight_cones(), PlannerConfig::default());

        let mut cones = straight_cones();
        cones.push(ObservedMarker::left(1.0, 15.0));
        cones.push(ObservedMarker::right(-1.0, 15.0));
        let path = planner.update(&cones, Point2::new(0.0, 4.0));

        assert_eq!(xy(&path), vec![(0.0, 0.0), (0.0, 5.0), (0.0, 10.0), (0.0, 15.0)]);
        assert_eq!(path.velocities, vec![10.0, 10.0, 10.0, 0.0]);
        assert_eq!(planner.last_report().admitted_left, 1);
        assert_eq!(planner.last_report().committed, 1);
        assert_eq!(planner.cycle(), 1);
    }

    #[test]
    fn test_repeated_snapshot_admits_nothing() {
        let mut planner = PathPlanner::new(Point2::origin(), &straight_cones(), PlannerConfig::default());
        let before = planner.path();

        let after = planner.update(&straight_cones(), Point2::new(0.0, 1.0));
        assert_eq!(before, after);
        assert_eq!(planner.marker_store().len(), 4);
        assert_eq!(planner.last_report().admitted_left + planner.last_report().admitted_right, 0);
    }

    #[test]
    fn test_no_markers_yields_start_only() {
        let mut planner = PathPlanner::new(Point2::new(2.0, 3.0), &[], PlannerConfig::default());
        let path = planner.update(&[], Point2::new(2.0, 3.0));
        assert_eq!(xy(&path), vec![(2.0, 3.0)]);
        assert_eq!(path.velocities, vec![3.0]);
    }

    #[test]
    fn test_timing_gate_from_first_two() {
        let mut cones = straight_cones();
        cones.push(ObservedMarker::timing(5.0, 0.0));
        let mut planner = PathPlanner::new(Point2::origin(), &cones, PlannerConfig::default());
        assert!(planner.timing_gate().is_none());

        cones.push(ObservedMarker::timing(5.0, 10.0));
        cones.push(ObservedMarker::timing(9.0, 9.0));
        planner.update(&cones, Point2::origin());

        let gate = planner.timing_gate().unwrap();
        assert_eq!(gate.endpoints(), (Point2::new(5.0, 0.0), Point2::new(5.0, 10.0)));
    }

    #[test]
    fn test_teardown_resets_zone() {
        let mut planner = PathPlanner::new(Point2::origin(), &straight_cones(), PlannerConfig::default());
        planner.update(&straight_cones(), Point2::new(0.0, 11.0));
        assert_eq!(planner.zone_state(), ZoneState::DepartedStart);

        planner.teardown();
        assert_eq!(planner.zone_state(), ZoneState::Approaching);
        assert_eq!(planner.waypoints().len(), 3);
    }

    #[test]
    fn test_constant_velocity_mode() {
        let config = PlannerConfig {
            constant_velocity: true,
            ..Default::default()
        };
        let planner = PathPlanner::new(Point2::origin(), &straight_cones(), config);
        assert_eq!(planner.path().velocities, vec![3.0, 3.0, 3.0]);
    }
}

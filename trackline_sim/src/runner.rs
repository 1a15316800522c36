//! Scenario runner - drives the planner around a track and checks it every tick.

use crate::config::SimConfig;
use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame, VehicleFrame};
use crate::oracle::{Oracle, SensorModel};
use crate::scenarios::ScenarioId;
use crate::validation::LateralMetrics;
use crate::vehicle::Vehicle;

use std::path::Path;
use tracing::{debug, info, warn};
use trackline_core::{CycleReport, PathPlanner, PlannedPath, PlannerConfig, ZoneState};

/// Export one frame every this many ticks.
const EXPORT_INTERVAL: u64 = 2;

/// Results from running a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Committed waypoints at the end of the run
    pub waypoint_count: usize,

    /// Zone state at the end of the run
    pub zone: ZoneState,

    /// Lateral RMS error of the final path against the centerline
    pub lateral_rms: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioMetrics {
    /// Cones the oracle reported by the end of the run
    pub cones_detected: usize,

    /// Markers admitted by the novelty strategy
    pub markers_admitted: usize,

    /// Staged markers promoted into a chain
    pub markers_promoted: usize,

    /// Staged markers rejected by the gate
    pub markers_discarded: usize,

    /// Centerline candidates produced
    pub candidates: usize,

    /// Largest lateral error of any final waypoint
    pub max_lateral_error: f64,

    /// Distance the vehicle drove
    pub distance_travelled: f64,
}

impl ScenarioMetrics {
    fn absorb(&mut self, report: &CycleReport) {
        self.markers_admitted += report.admitted_left + report.admitted_right + report.admitted_timing;
        self.markers_promoted += report.left.promoted + report.right.promoted;
        self.markers_discarded += report.left.discarded + report.right.discarded;
        self.candidates += report.candidates;
    }
}

/// Checks the planner output contract between two consecutive cycles.
pub fn check_invariants(
    previous: &PlannedPath,
    current: &PlannedPath,
    zone: ZoneState,
    config: &PlannerConfig,
) -> Result<(), String> {
    if current.ys.len() != current.len() || current.velocities.len() != current.len() {
        return Err("path sequences differ in length".to_string());
    }
    if current.len() < previous.len() {
        return Err(format!("path shrank from {} to {} waypoints", previous.len(), current.len()));
    }
    for (i, (old, new)) in previous.points().zip(current.points()).enumerate() {
        if old != new {
            return Err(format!("waypoint {i} moved from {old} to {new}"));
        }
    }

    let finished = zone == ZoneState::Finished;
    let last = current.len().saturating_sub(1);
    for (i, &v) in current.velocities.iter().enumerate() {
        if !(0.0..=config.v_max).contains(&v) {
            return Err(format!("velocity {v} at waypoint {i} outside [0, {}]", config.v_max));
        }
        let final_stop = finished && i == last && v == 0.0;
        if config.constant_velocity && v != config.v_const && !final_stop {
            return Err(format!("velocity {v} at waypoint {i} in constant mode"));
        }
    }
    if finished && current.velocities.last() != Some(&0.0) {
        return Err("finished path does not end at zero velocity".to_string());
    }

    Ok(())
}

/// Runs track scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner with default settings.
    pub fn new(seed: u64) -> Self {
        Self::with_config(SimConfig {
            seed,
            ..Default::default()
        })
    }

    pub fn with_config(config: SimConfig) -> Self {
        Self { config }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.config.max_duration_secs = secs;
        self
    }

    /// Replaces the planner under test.
    pub fn with_planner_config(mut self, planner: PlannerConfig) -> Self {
        self.config.planner = planner;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result. Setup errors become a failed result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None).unwrap_or_else(|e| self.setup_failure(scenario, e))
    }

    /// Runs a scenario and writes every sampled frame to `path` as JSON.
    pub fn run_with_export(&self, scenario: ScenarioId, path: impl AsRef<Path>) -> Result<ScenarioResult, SimError> {
        let mut export = SimExport::new(scenario.name(), self.config.seed, &scenario.layout());
        let result = self.execute(scenario, Some(&mut export))?;
        export.finalize(result.passed, Some(result.lateral_rms));
        export.write_to_file(path.as_ref())?;
        info!("Exported {} frames to {}", export.frames.len(), path.as_ref().display());
        Ok(result)
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        let config = scenario.configure(&self.config);
        config.planner.validate()?;

        let track = scenario.layout();
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let sensor = SensorModel {
            range: config.sensor_range,
            fov_deg: config.fov_deg,
            noise_std: config.sensor_noise_std,
        };
        let mut oracle = Oracle::new(physics_seed, sensor, track.cones.clone())?;
        let mut vehicle = Vehicle::new(track.start);

        let initial = oracle.observe(&vehicle.pose()).to_vec();
        let mut planner = PathPlanner::with_novelty(
            vehicle.position,
            &initial,
            config.planner.clone(),
            config.novelty.build(),
        );

        let mut metrics = ScenarioMetrics::default();
        metrics.absorb(planner.last_report());
        let mut absorbed_cycle = planner.cycle();

        let mut path = planner.path();
        let mut failure = check_invariants(&PlannedPath::default(), &path, planner.zone_state(), &config.planner).err();

        let dt = 1.0 / config.tick_rate_hz as f64;
        let max_ticks = (config.max_duration_secs * config.tick_rate_hz as f64) as u64;
        let log_interval = u64::from(config.tick_rate_hz.max(1));
        let mut ticks = 0;

        for tick in 0..max_ticks {
            if failure.is_some() {
                break;
            }

            vehicle.step(&path, dt, config.creep_speed, config.reach_radius);
            let snapshot = oracle.observe(&vehicle.pose());
            let next = planner.update(snapshot, vehicle.position);
            ticks = tick + 1;

            if planner.cycle() != absorbed_cycle {
                metrics.absorb(planner.last_report());
                absorbed_cycle = planner.cycle();
            }

            failure = check_invariants(&path, &next, planner.zone_state(), &config.planner).err();
            path = next;

            if let Some(export) = export.as_deref_mut() {
                if tick % EXPORT_INTERVAL == 0 {
                    export.add_frame(SimFrame {
                        time_sec: ticks as f64 * dt,
                        vehicle: VehicleFrame::from(&vehicle),
                        detected_cones: oracle.detected().len(),
                        path: path.clone(),
                        zone: planner.zone_state(),
                    });
                }
            }

            if tick % log_interval == 0 {
                debug!(
                    "  t={:.1}s | x={:.1} y={:.1} v={:.1} | waypoints={} | zone={}",
                    ticks as f64 * dt,
                    vehicle.position.x,
                    vehicle.position.y,
                    vehicle.speed,
                    path.len(),
                    planner.zone_state()
                );
            }

            if planner.zone_state() == ZoneState::Finished && vehicle.at_path_end(&path) {
                break;
            }
        }

        let lateral = LateralMetrics::from_points(path.points(), &track.centerline);
        metrics.cones_detected = oracle.detected().len();
        metrics.max_lateral_error = lateral.max_error;
        metrics.distance_travelled = vehicle.distance_travelled;

        let zone = planner.zone_state();
        let final_time_secs = ticks as f64 * dt;
        let failure_reason = failure.or_else(|| {
            if zone != ZoneState::Finished {
                Some(format!("zone still {zone} after {final_time_secs:.1}s"))
            } else if !vehicle.at_path_end(&path) {
                Some("vehicle did not reach the final waypoint".to_string())
            } else if lateral.rmse() > config.max_lateral_rms {
                Some(format!(
                    "lateral RMS {:.3} exceeds {:.3}",
                    lateral.rmse(),
                    config.max_lateral_rms
                ))
            } else {
                None
            }
        });

        if let Some(reason) = &failure_reason {
            warn!("{} failed after {} ticks: {}", scenario.name(), ticks, reason);
        } else {
            info!(
                "{} finished in {:.1}s with {} waypoints (lateral RMS {:.3})",
                scenario.name(),
                final_time_secs,
                path.len(),
                lateral.rmse()
            );
        }

        Ok(ScenarioResult {
            scenario,
            seed: config.seed,
            passed: failure_reason.is_none(),
            total_ticks: ticks,
            final_time_secs,
            waypoint_count: path.len(),
            zone,
            lateral_rms: lateral.rmse(),
            failure_reason,
            metrics,
        })
    }

    fn setup_failure(&self, scenario: ScenarioId, error: SimError) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            waypoint_count: 0,
            zone: ZoneState::Approaching,
            lateral_rms: 0.0,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
        }
    }
}

//! Simulation run configuration.

use serde::{Deserialize, Serialize};
use trackline_core::{CountNovelty, NoveltyStrategy, PlannerConfig, ProximityNovelty};

/// Which novelty rule the planner under test uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoveltyChoice {
    Count,
    Proximity { match_radius: f64 },
}

impl NoveltyChoice {
    pub fn build(&self) -> Box<dyn NoveltyStrategy> {
        match *self {
            NoveltyChoice::Count => Box::new(CountNovelty),
            NoveltyChoice::Proximity { match_radius } => Box::new(ProximityNovelty::new(match_radius)),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Planner cycles per simulated second (default: 10)
    pub tick_rate_hz: u32,

    /// Maximum simulated duration in seconds (default: 60)
    pub max_duration_secs: f64,

    /// Cone detection range (default: 12.0)
    pub sensor_range: f64,

    /// Full horizontal field of view in degrees (default: 150)
    pub fov_deg: f64,

    /// Standard deviation of the per-cone position error (default: 0.0)
    pub sensor_noise_std: f64,

    /// Lowest speed the vehicle drives at while waypoints remain (default: 1.0)
    pub creep_speed: f64,

    /// A waypoint counts as reached within this distance (default: 0.75)
    pub reach_radius: f64,

    /// Pass threshold on waypoint lateral RMS error (default: 0.75)
    pub max_lateral_rms: f64,

    /// Novelty rule for the planner (default: count)
    pub novelty: NoveltyChoice,

    /// Planner under test
    pub planner: PlannerConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate_hz: 10,
            max_duration_secs: 60.0,
            sensor_range: 12.0,
            fov_deg: 150.0,
            sensor_noise_std: 0.0,
            creep_speed: 1.0,
            reach_radius: 0.75,
            max_lateral_rms: 0.75,
            novelty: NoveltyChoice::Count,
            planner: PlannerConfig::default(),
        }
    }
}

//! Track scenarios for the simulation harness.

use crate::config::{NoveltyChoice, SimConfig};
use crate::error::SimError;
use crate::track::TrackLayout;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// TRK-001: 75-unit straight sprint
    Acceleration,

    /// TRK-002: alternating arcs
    Slalom,

    /// TRK-003: 180-degree turn and back
    Hairpin,

    /// TRK-004: sprint with noisy cone positions
    NoisyAcceleration,

    /// TRK-005: one lap of a closed oval
    Oval,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Acceleration,
            ScenarioId::Slalom,
            ScenarioId::Hairpin,
            ScenarioId::NoisyAcceleration,
            ScenarioId::Oval,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Acceleration => "acceleration",
            ScenarioId::Slalom => "slalom",
            ScenarioId::Hairpin => "hairpin",
            ScenarioId::NoisyAcceleration => "noisy_acceleration",
            ScenarioId::Oval => "oval",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Acceleration => "Straight 75-unit sprint, exact cones, count novelty",
            ScenarioId::Slalom => "Alternating 60-degree arcs of radius 20",
            ScenarioId::Hairpin => "Radius-9 hairpin, finish on the return straight",
            ScenarioId::NoisyAcceleration => "Straight sprint with 0.1 sigma cone noise, proximity novelty",
            ScenarioId::Oval => "Closed oval lap, the start line is the finish line",
        }
    }

    /// Ground-truth track for this scenario.
    pub fn layout(&self) -> TrackLayout {
        match self {
            ScenarioId::Acceleration | ScenarioId::NoisyAcceleration => TrackLayout::acceleration(),
            ScenarioId::Slalom => TrackLayout::slalom(),
            ScenarioId::Hairpin => TrackLayout::hairpin(),
            ScenarioId::Oval => TrackLayout::oval(),
        }
    }

    /// Applies the scenario's sensor and planner overrides to `base`.
    pub fn configure(&self, base: &SimConfig) -> SimConfig {
        let mut config = base.clone();
        match self {
            ScenarioId::Acceleration | ScenarioId::Slalom => {}
            ScenarioId::Hairpin | ScenarioId::Oval => {
                config.novelty = NoveltyChoice::Proximity { match_radius: 1.0 };
            }
            ScenarioId::NoisyAcceleration => {
                config.sensor_noise_std = 0.1;
                config.novelty = NoveltyChoice::Proximity { match_radius: 1.0 };
            }
        }
        config
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "acceleration" | "accel" | "trk-001" => Ok(ScenarioId::Acceleration),
            "slalom" | "trk-002" => Ok(ScenarioId::Slalom),
            "hairpin" | "trk-003" => Ok(ScenarioId::Hairpin),
            "noisy_acceleration" | "noisyacceleration" | "trk-004" => Ok(ScenarioId::NoisyAcceleration),
            "oval" | "trk-005" => Ok(ScenarioId::Oval),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}

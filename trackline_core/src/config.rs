//! Planner configuration.
//!
//! Every distance threshold used by the pipeline is a named field here. The
//! construction and per-cycle variants of the gate (5 / 10) and the pairing
//! radius (6 / 7) are separate fields and are never unified in code.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a [`PlannerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to parse planner config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read planner config: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for a [`PathPlanner`](crate::PathPlanner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Drive every waypoint at `v_const` instead of the curvature profile (default: false)
    pub constant_velocity: bool,

    /// Upper speed bound in units/s (default: 10.0)
    pub v_max: f64,

    /// Speed used in constant-velocity mode and for short paths (default: 3.0)
    pub v_const: f64,

    /// Cornering gain applied to sqrt(radius) (default: 1.0)
    pub gain: f64,

    /// Promotion gate while seeding the chains at construction (default: 5.0)
    pub construction_gate: f64,

    /// Promotion gate for every later cycle (default: 10.0)
    pub cycle_gate: f64,

    /// Left/right pairing radius at construction (default: 6.0)
    pub construction_pairing_radius: f64,

    /// Left/right pairing radius for every later cycle (default: 7.0)
    pub pairing_radius: f64,

    /// Paired midpoints must lie strictly closer than this to the vehicle (default: 10.0)
    pub proximity_gate: f64,

    /// Minimum spacing before the chain-tail midpoint is appended (default: 1.5)
    pub min_progress: f64,

    /// Distance from the start that latches departure (default: 10.0)
    pub departure_distance: f64,

    /// Max chain-tail separation that closes the finish (default: 5.0)
    pub closing_distance: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            constant_velocity: false,
            v_max: 10.0,
            v_const: 3.0,
            gain: 1.0,
            construction_gate: 5.0,
            cycle_gate: 10.0,
            construction_pairing_radius: 6.0,
            pairing_radius: 7.0,
            proximity_gate: 10.0,
            min_progress: 1.5,
            departure_distance: 10.0,
            closing_distance: 5.0,
        }
    }
}

impl PlannerConfig {
    /// Checks that every threshold is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("construction_gate", self.construction_gate),
            ("cycle_gate", self.cycle_gate),
            ("construction_pairing_radius", self.construction_pairing_radius),
            ("pairing_radius", self.pairing_radius),
            ("proximity_gate", self.proximity_gate),
            ("min_progress", self.min_progress),
            ("departure_distance", self.departure_distance),
            ("closing_distance", self.closing_distance),
            ("v_max", self.v_max),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be finite and > 0, got {value}"),
                });
            }
        }

        if !self.v_const.is_finite() || self.v_const < 0.0 || self.v_const > self.v_max {
            return Err(ConfigError::InvalidValue {
                field: "v_const",
                reason: format!("must lie in [0, v_max = {}], got {}", self.v_max, self.v_const),
            });
        }

        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "gain",
                reason: format!("must be finite and >= 0, got {}", self.gain),
            });
        }

        Ok(())
    }

    /// Parses and validates a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.construction_gate, 5.0);
        assert_eq!(config.cycle_gate, 10.0);
        assert_eq!(config.construction_pairing_radius, 6.0);
        assert_eq!(config.pairing_radius, 7.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PlannerConfig::from_json_str(r#"{ "v_max": 6.5, "constant_velocity": true }"#)
            .unwrap();
        assert_eq!(config.v_max, 6.5);
        assert!(config.constant_velocity);
        assert_eq!(config.proximity_gate, 10.0);
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let config = PlannerConfig {
            cycle_gate: 0.0,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "cycle_gate"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_v_const_above_v_max() {
        let config = PlannerConfig {
            v_const: 12.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "v_const", .. })
        ));
    }

    #[test]
    fn test_rejects_negative_gain() {
        let config = PlannerConfig {
            gain: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = PlannerConfig::from_json_str("{ v_max: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PlannerConfig::from_json_file("/nonexistent/trackline.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

//! Simulation harness errors.

use thiserror::Error;
use trackline_core::ConfigError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Planner config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid sensor noise: {0}")]
    SensorNoise(#[from] rand_distr::NormalError),

    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

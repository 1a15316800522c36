//! JSON exporter for offline plotting.
//!
//! Exports the ground-truth track once and one frame per sampled tick.

use crate::error::SimError;
use crate::track::{TrackCone, TrackLayout};
use crate::vehicle::Vehicle;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use trackline_core::{PlannedPath, ZoneState};

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Vehicle state at the end of the tick
    pub vehicle: VehicleFrame,

    /// Cones detected so far
    pub detected_cones: usize,

    /// Planner output for this tick
    pub path: PlannedPath,

    pub zone: ZoneState,
}

/// Vehicle pose and speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleFrame {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed: f64,
}

impl From<&Vehicle> for VehicleFrame {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            x: vehicle.position.x,
            y: vehicle.position.y,
            heading: vehicle.heading,
            speed: vehicle.speed,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Ground-truth cones
    pub cones: Vec<TrackCone>,

    /// Ground-truth centerline as [x, y] pairs
    pub centerline: Vec<[f64; 2]>,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    /// Final lateral RMS error if applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lateral_rms: Option<f64>,
}

impl SimExport {
    /// Creates a new export container for `track`.
    pub fn new(scenario: &str, seed: u64, track: &TrackLayout) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            cones: track.cones.clone(),
            centerline: track.centerline.iter().map(|p| [p.x, p.y]).collect(),
            frames: Vec::new(),
            passed: false,
            lateral_rms: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, lateral_rms: Option<f64>) {
        self.passed = passed;
        self.lateral_rms = lateral_rms;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

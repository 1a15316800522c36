//! Perception oracle.
//!
//! Holds the ground-truth cones and plays the role of the perception stack:
//! - Cones within sensor range and field of view are detected
//! - Each cone's position error is sampled once, at first sighting
//! - The snapshot is the whole cone map in first-sighting order, so every
//!   cycle reports a stable superset of the previous one

use crate::error::SimError;
use crate::track::{Pose, TrackCone};

use nalgebra::{Point2, Rotation2, Vector2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use trackline_core::ObservedMarker;

/// Range and field of view of the simulated cone detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorModel {
    pub range: f64,

    /// Full horizontal field of view in degrees
    pub fov_deg: f64,

    /// Standard deviation of the per-cone position error
    pub noise_std: f64,
}

impl SensorModel {
    /// `true` if `target` is detectable from `pose`.
    pub fn sees(&self, pose: &Pose, target: &Point2<f64>) -> bool {
        let offset = target - pose.position;
        if offset.norm() > self.range {
            return false;
        }
        let local: Vector2<f64> = Rotation2::new(-pose.heading) * offset;
        local.y.atan2(local.x).abs() <= self.fov_deg.to_radians() / 2.0
    }
}

/// The Oracle - ground truth cones and the detections derived from them.
pub struct Oracle {
    /// RNG for sensor noise (separate from any planner-side seed)
    physics_rng: ChaCha8Rng,

    noise: Normal<f64>,
    sensor: SensorModel,
    cones: Vec<TrackCone>,

    /// Per ground-truth cone: already in the map
    sighted: Vec<bool>,

    /// Detected cones in first-sighting order
    map: Vec<ObservedMarker>,
}

impl Oracle {
    /// Creates a new Oracle with the given physics seed.
    pub fn new(physics_seed: u64, sensor: SensorModel, cones: Vec<TrackCone>) -> Result<Self, SimError> {
        Ok(Self {
            physics_rng: ChaCha8Rng::seed_from_u64(physics_seed),
            noise: Normal::new(0.0, sensor.noise_std)?,
            sensor,
            sighted: vec![false; cones.len()],
            cones,
            map: Vec::new(),
        })
    }

    /// Detects newly visible cones from `pose` and returns the full map.
    pub fn observe(&mut self, pose: &Pose) -> &[ObservedMarker] {
        for (cone, sighted) in self.cones.iter().zip(self.sighted.iter_mut()) {
            if *sighted || !self.sensor.sees(pose, &cone.position) {
                continue;
            }
            *sighted = true;

            let error = Vector2::new(
                self.noise.sample(&mut self.physics_rng),
                self.noise.sample(&mut self.physics_rng),
            );
            self.map.push(ObservedMarker {
                position: cone.position + error,
                role: cone.role,
            });
        }
        &self.map
    }

    /// Cones detected so far.
    pub fn detected(&self) -> &[ObservedMarker] {
        &self.map
    }

    pub fn ground_truth(&self) -> &[TrackCone] {
        &self.cones
    }

    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }
}

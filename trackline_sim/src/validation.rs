//! Validation - ground truth comparison for planned paths
//! ======================================================
//!
//! Measures how far the planned waypoints sit from the true centerline.
//!
//! Usage:
//! ```ignore
//! use trackline_sim::validation::LateralMetrics;
//!
//! let mut metrics = LateralMetrics::new();
//! for waypoint in path.points() {
//!     metrics.record(&waypoint, &track.centerline);
//! }
//! println!("RMS {:.3}", metrics.rmse());
//! ```

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// =============================================================================
// GEOMETRY
// =============================================================================

/// Distance from `point` to the segment `a`-`b`.
pub fn distance_to_segment(point: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let length_sq = ab.norm_squared();
    if length_sq == 0.0 {
        return nalgebra::distance(point, a);
    }
    let t = ((point - a).dot(&ab) / length_sq).clamp(0.0, 1.0);
    nalgebra::distance(point, &(a + ab * t))
}

/// Distance from `point` to the closest point of `polyline`.
pub fn distance_to_polyline(point: &Point2<f64>, polyline: &[Point2<f64>]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => nalgebra::distance(point, only),
        _ => polyline
            .windows(2)
            .map(|w| distance_to_segment(point, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

// =============================================================================
// METRICS
// =============================================================================

/// Lateral error statistics of a path against the centerline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LateralMetrics {
    /// Number of waypoints measured
    pub samples: usize,
    /// Sum of squared lateral errors (for RMSE calculation)
    pub error_sum_squared: f64,
    /// Maximum lateral error observed
    pub max_error: f64,
}

impl LateralMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measures every point of `path`.
    pub fn from_points(path: impl IntoIterator<Item = Point2<f64>>, centerline: &[Point2<f64>]) -> Self {
        let mut metrics = Self::new();
        for point in path {
            metrics.record(&point, centerline);
        }
        metrics
    }

    pub fn record(&mut self, point: &Point2<f64>, centerline: &[Point2<f64>]) {
        let error = distance_to_polyline(point, centerline);
        self.samples += 1;
        self.error_sum_squared += error * error;
        self.max_error = self.max_error.max(error);
    }

    /// Calculate RMSE (Root Mean Square Error)
    pub fn rmse(&self) -> f64 {
        if self.samples > 0 {
            (self.error_sum_squared / self.samples as f64).sqrt()
        } else {
            0.0
        }
    }
}

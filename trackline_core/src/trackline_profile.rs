//! Curvature/Velocity Profiler.
//!
//! Fits a circle through every interior waypoint and its two neighbours, then
//! derives a smoothed speed `min(gain * sqrt(r), v_max)` along the path.
//!
//! # Circle fit
//!
//! The perpendicular bisectors of (prev,cur), (cur,next) and (prev,next) are
//! intersected pairwise and the three intersections averaged as the center.
//! If any two bisectors are (near-)parallel the triple is collinear or
//! coincident and the radius is unbounded. A path that doubles back onto its
//! previous point turns on the circle with `prev`-`cur` as diameter.

use crate::config::PlannerConfig;
use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Radius recorded for straight or degenerate geometry.
pub const UNBOUNDED_RADIUS: f64 = f64::INFINITY;

/// |sin| of the angle between two bisectors below which they count as parallel.
const PARALLEL_TOLERANCE: f64 = 1e-9;

/// A committed centerline point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Point2<f64>,

    /// Local turn radius; `f64::INFINITY` on straights
    pub radius: f64,

    /// Target speed in units/s
    pub velocity: f64,
}

impl Waypoint {
    pub fn at(position: Point2<f64>) -> Self {
        Self {
            position,
            radius: UNBOUNDED_RADIUS,
            velocity: 0.0,
        }
    }
}

/// A line as a point and a direction.
#[derive(Debug, Clone, Copy)]
struct Line {
    origin: Point2<f64>,
    direction: Vector2<f64>,
}

fn bisector(a: &Point2<f64>, b: &Point2<f64>) -> Line {
    let chord = b - a;
    Line {
        origin: nalgebra::center(a, b),
        direction: Vector2::new(-chord.y, chord.x),
    }
}

/// Intersection of two lines, `None` when they are (near-)parallel.
fn intersect(l1: &Line, l2: &Line) -> Option<Point2<f64>> {
    // origin1 + t * d1 = origin2 + s * d2  =>  [d1 | -d2] (t, s)^T = origin2 - origin1
    let system = Matrix2::from_columns(&[l1.direction, -l2.direction]);
    let det = system.determinant();
    let scale = l1.direction.norm() * l2.direction.norm();
    if scale == 0.0 || det.abs() <= PARALLEL_TOLERANCE * scale {
        return None;
    }

    let rhs = l2.origin - l1.origin;
    let t = rhs.perp(&(-l2.direction)) / det;
    Some(l1.origin + l1.direction * t)
}

/// Averaged bisector-intersection center of a waypoint triple.
pub fn fitted_center(prev: &Point2<f64>, cur: &Point2<f64>, next: &Point2<f64>) -> Option<Point2<f64>> {
    if prev == next && prev != cur {
        return Some(nalgebra::center(prev, cur));
    }

    let b1 = bisector(prev, cur);
    let b2 = bisector(cur, next);
    let b3 = bisector(prev, next);

    let c12 = intersect(&b1, &b2)?;
    let c23 = intersect(&b2, &b3)?;
    let c13 = intersect(&b1, &b3)?;

    Some(Point2::from((c12.coords + c23.coords + c13.coords) / 3.0))
}

/// Turn radius at `cur`, unbounded for collinear or coincident triples.
pub fn turn_radius(prev: &Point2<f64>, cur: &Point2<f64>, next: &Point2<f64>) -> f64 {
    fitted_center(prev, cur, next).map_or(UNBOUNDED_RADIUS, |center| nalgebra::distance(cur, &center))
}

/// Speed model derived from [`PlannerConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedProfile {
    pub constant_velocity: bool,
    pub v_max: f64,
    pub v_const: f64,
    pub gain: f64,
}

impl SpeedProfile {
    /// Speeds are clamped so every velocity stays within `[0, v_max]`,
    /// even for a config that fails [`PlannerConfig::validate`].
    pub fn from_config(config: &PlannerConfig) -> Self {
        let v_max = config.v_max.max(0.0);
        Self {
            constant_velocity: config.constant_velocity,
            v_max,
            v_const: config.v_const.min(v_max).max(0.0),
            gain: config.gain.max(0.0),
        }
    }

    /// `min(gain * mean_sqrt_radius, v_max)`; unbounded radii give `v_max`.
    fn speed(&self, mean_sqrt_radius: f64) -> f64 {
        if mean_sqrt_radius.is_finite() {
            (self.gain * mean_sqrt_radius).min(self.v_max)
        } else {
            self.v_max
        }
    }

    /// Recomputes radius and velocity for every waypoint.
    ///
    /// With fewer than three waypoints, or in constant-velocity mode, every
    /// waypoint gets `v_const` and the last one is zeroed once `finished`.
    pub fn apply(&self, path: &mut [Waypoint], finished: bool) {
        let n = path.len();

        if n >= 3 {
            for i in 1..n - 1 {
                path[i].radius = turn_radius(&path[i - 1].position, &path[i].position, &path[i + 1].position);
            }
            path[0].radius = path[1].radius;
            path[n - 1].radius = path[n - 2].radius;
        }

        if self.constant_velocity || n < 3 {
            for waypoint in path.iter_mut() {
                waypoint.velocity = self.v_const;
            }
            if finished {
                if let Some(last) = path.last_mut() {
                    last.velocity = 0.0;
                }
            }
            return;
        }

        let roots: Vec<f64> = path.iter().map(|w| w.radius.sqrt()).collect();

        path[0].velocity = self.speed(roots[1]);
        if n == 3 {
            path[1].velocity = self.speed(roots[1]);
        } else {
            path[1].velocity = self.speed((roots[1] + roots[2]) / 2.0);
            for i in 2..n - 2 {
                path[i].velocity = self.speed((roots[i] + roots[i - 1] + roots[i - 2]) / 3.0);
            }
            path[n - 2].velocity = self.speed((roots[n - 3] + roots[n - 2]) / 2.0);
        }
        path[n - 1].velocity = 0.0;
    }
}

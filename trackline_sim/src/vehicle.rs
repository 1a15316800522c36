//! Kinematic vehicle that drives the planned path.

use crate::track::Pose;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use trackline_core::PlannedPath;

/// Point-mass vehicle following waypoints in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub position: Point2<f64>,
    pub heading: f64,
    pub speed: f64,

    /// Index of the waypoint being driven to
    target: usize,

    pub distance_travelled: f64,
}

impl Vehicle {
    pub fn new(start: Pose) -> Self {
        Self {
            position: start.position,
            heading: start.heading,
            speed: 0.0,
            target: 0,
            distance_travelled: 0.0,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            heading: self.heading,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// `true` once every waypoint of `path` has been reached.
    pub fn at_path_end(&self, path: &PlannedPath) -> bool {
        self.target >= path.len()
    }

    /// Advances one tick towards the next unreached waypoint at its planned
    /// speed, never slower than `creep_speed`. Holds still past the last one.
    pub fn step(&mut self, path: &PlannedPath, dt: f64, creep_speed: f64, reach_radius: f64) {
        let points: Vec<Point2<f64>> = path.points().collect();

        while let Some(waypoint) = points.get(self.target) {
            if nalgebra::distance(&self.position, waypoint) > reach_radius {
                break;
            }
            self.target += 1;
        }

        let Some(goal) = points.get(self.target) else {
            self.speed = 0.0;
            return;
        };

        self.speed = path.velocities[self.target].max(creep_speed);
        let to_goal = goal - self.position;
        let remaining = to_goal.norm();
        let travel = (self.speed * dt).min(remaining);

        self.heading = to_goal.y.atan2(to_goal.x);
        self.position += to_goal * (travel / remaining);
        self.distance_travelled += travel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn path(points: &[(f64, f64, f64)]) -> PlannedPath {
        PlannedPath {
            xs: points.iter().map(|p| p.0).collect(),
            ys: points.iter().map(|p| p.1).collect(),
            velocities: points.iter().map(|p| p.2).collect(),
        }
    }

    fn start() -> Pose {
        Pose {
            position: Point2::origin(),
            heading: 0.0,
        }
    }

    #[test]
    fn test_drives_at_planned_speed() {
        let mut vehicle = Vehicle::new(start());
        let plan = path(&[(0.0, 0.0, 10.0), (0.0, 5.0, 10.0), (0.0, 10.0, 0.0)]);

        vehicle.step(&plan, 0.1, 1.0, 0.5);
        assert_eq!(vehicle.target(), 1);
        assert_relative_eq!(vehicle.position.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(vehicle.heading, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(vehicle.speed, 10.0);
    }

    #[test]
    fn test_creeps_towards_final_waypoint() {
        let mut vehicle = Vehicle::new(start());
        let plan = path(&[(0.0, 0.0, 10.0), (2.0, 0.0, 0.0)]);

        vehicle.step(&plan, 0.1, 1.0, 0.5);
        assert_eq!(vehicle.speed, 1.0);
        assert_relative_eq!(vehicle.position.x, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_stops_at_path_end() {
        let mut vehicle = Vehicle::new(start());
        let plan = path(&[(0.0, 0.0, 3.0), (1.0, 0.0, 0.0)]);

        for _ in 0..20 {
            vehicle.step(&plan, 0.1, 1.0, 0.25);
        }
        assert!(vehicle.at_path_end(&plan));
        assert_eq!(vehicle.speed, 0.0);
        assert!(nalgebra::distance(&vehicle.position, &Point2::new(1.0, 0.0)) <= 0.25);
    }

    #[test]
    fn test_does_not_overshoot() {
        let mut vehicle = Vehicle::new(start());
        let plan = path(&[(0.0, 0.0, 10.0), (0.3, 0.0, 10.0), (5.0, 0.0, 0.0)]);

        vehicle.step(&plan, 0.1, 1.0, 0.1);
        assert_relative_eq!(vehicle.position.x, 0.3, epsilon = 1e-12);
    }
}

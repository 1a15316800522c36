//! Ground-truth track layouts.
//!
//! A layout is a lead-in straight, the timed course and a runoff straight,
//! all built from [`Segment`]s. Boundary cones sit every `cone_spacing` along
//! the centerline from the start line to the end of the runoff, and two
//! timing cones mark the finish at the end of the course. Runoff cones keep
//! the boundary chains growing past the finish line so the finish can close.
//! A closed circuit has no lead-in or runoff: its course ends where it
//! started and the start line doubles as the finish line.

use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use trackline_core::MarkerRole;

/// Dense centerline sample spacing.
const CENTERLINE_STEP: f64 = 0.25;

/// Timing cones stand this far outside the boundary cones.
const TIMING_CONE_OFFSET: f64 = 0.5;

/// A piece of track centerline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Straight { length: f64 },
    /// Positive sweep turns left
    Arc { radius: f64, sweep_deg: f64 },
}

impl Segment {
    pub fn length(&self) -> f64 {
        match *self {
            Segment::Straight { length } => length,
            Segment::Arc { radius, sweep_deg } => radius * sweep_deg.to_radians().abs(),
        }
    }

    fn advance(&self, pose: Pose, distance: f64) -> Pose {
        match *self {
            Segment::Straight { .. } => Pose {
                position: pose.position + pose.direction() * distance,
                heading: pose.heading,
            },
            Segment::Arc { radius, sweep_deg } => {
                let turn = sweep_deg.signum() * distance / radius;
                let center = pose.position + pose.left_normal() * (sweep_deg.signum() * radius);
                let rotated = Rotation2::new(turn) * (pose.position - center);
                Pose {
                    position: center + rotated,
                    heading: pose.heading + turn,
                }
            }
        }
    }
}

/// Position and heading along the centerline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point2<f64>,
    pub heading: f64,
}

impl Pose {
    fn direction(&self) -> Vector2<f64> {
        Vector2::new(self.heading.cos(), self.heading.sin())
    }

    fn left_normal(&self) -> Vector2<f64> {
        Vector2::new(-self.heading.sin(), self.heading.cos())
    }
}

/// Parameters for building a [`TrackLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSpec {
    pub name: &'static str,

    /// Centerline before the start line (no cones)
    pub lead_in: f64,

    /// Vehicle starts this far behind the start line
    pub start_offset: f64,

    /// Timed part of the track; the finish line is at its end
    pub course: Vec<Segment>,

    /// Coned straight past the finish line
    pub runoff: f64,

    pub half_width: f64,
    pub cone_spacing: f64,

    /// The course ends on the start line; cones are not repeated at the seam
    pub closed: bool,
}

/// One ground-truth cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackCone {
    pub id: usize,
    pub position: Point2<f64>,
    pub role: MarkerRole,
}

/// A fully built track.
#[derive(Debug, Clone)]
pub struct TrackLayout {
    pub name: &'static str,

    /// Dense ground-truth centerline, lead-in through runoff
    pub centerline: Vec<Point2<f64>>,

    pub cones: Vec<TrackCone>,
    pub start: Pose,
    pub finish: Pose,
    pub half_width: f64,
}

impl TrackLayout {
    pub fn build(spec: &TrackSpec) -> Self {
        let mut segments = vec![Segment::Straight { length: spec.lead_in }];
        segments.extend(spec.course.iter().copied());
        segments.push(Segment::Straight { length: spec.runoff });

        let total: f64 = segments.iter().map(Segment::length).sum();
        let course_length: f64 = spec.course.iter().map(Segment::length).sum();
        let origin = Pose {
            position: Point2::new(-spec.lead_in, 0.0),
            heading: 0.0,
        };

        let samples = (total / CENTERLINE_STEP).ceil() as usize;
        let centerline = (0..=samples)
            .map(|i| pose_at(&segments, origin, (i as f64 * CENTERLINE_STEP).min(total)).position)
            .collect();

        let mut cones = Vec::new();
        let mut push = |position: Point2<f64>, role: MarkerRole| {
            let id = cones.len();
            cones.push(TrackCone { id, position, role });
        };

        let mut k = 0;
        loop {
            let s = spec.lead_in + k as f64 * spec.cone_spacing;
            let past_end = if spec.closed { s >= total - 1e-9 } else { s > total + 1e-9 };
            if past_end {
                break;
            }
            let pose = pose_at(&segments, origin, s);
            push(pose.position + pose.left_normal() * spec.half_width, MarkerRole::LeftBoundary);
            push(pose.position - pose.left_normal() * spec.half_width, MarkerRole::RightBoundary);
            k += 1;
        }

        let finish = pose_at(&segments, origin, spec.lead_in + course_length);
        let timing_offset = spec.half_width + TIMING_CONE_OFFSET;
        push(finish.position + finish.left_normal() * timing_offset, MarkerRole::Timing);
        push(finish.position - finish.left_normal() * timing_offset, MarkerRole::Timing);

        Self {
            name: spec.name,
            centerline,
            cones,
            start: pose_at(&segments, origin, spec.lead_in - spec.start_offset),
            finish,
            half_width: spec.half_width,
        }
    }

    /// 75-unit straight sprint.
    pub fn acceleration() -> Self {
        Self::build(&TrackSpec {
            name: "acceleration",
            lead_in: 5.0,
            start_offset: 3.0,
            course: vec![Segment::Straight { length: 75.0 }],
            runoff: 20.0,
            half_width: 1.5,
            cone_spacing: 4.0,
            closed: false,
        })
    }

    /// Alternating 60-degree arcs, netting out to a straight heading.
    pub fn slalom() -> Self {
        let arc = |sweep_deg: f64| Segment::Arc { radius: 20.0, sweep_deg };
        Self::build(&TrackSpec {
            name: "slalom",
            lead_in: 5.0,
            start_offset: 3.0,
            course: vec![arc(30.0), arc(-60.0), arc(60.0), arc(-60.0), arc(30.0)],
            runoff: 20.0,
            half_width: 1.5,
            cone_spacing: 3.0,
            closed: false,
        })
    }

    /// Straight, 180-degree left-hander, and back.
    pub fn hairpin() -> Self {
        Self::build(&TrackSpec {
            name: "hairpin",
            lead_in: 5.0,
            start_offset: 3.0,
            course: vec![
                Segment::Straight { length: 35.0 },
                Segment::Arc { radius: 9.0, sweep_deg: 180.0 },
                Segment::Straight { length: 45.0 },
            ],
            runoff: 15.0,
            half_width: 1.5,
            cone_spacing: 3.0,
            closed: false,
        })
    }

    /// Closed oval: two 180-degree turns of radius 12 joined by straights.
    /// One lap starts and ends on the start line at the origin.
    pub fn oval() -> Self {
        Self::build(&TrackSpec {
            name: "oval",
            lead_in: 0.0,
            start_offset: 3.0,
            course: vec![
                Segment::Straight { length: 20.0 },
                Segment::Arc { radius: 12.0, sweep_deg: 180.0 },
                Segment::Straight { length: 40.0 },
                Segment::Arc { radius: 12.0, sweep_deg: 180.0 },
                Segment::Straight { length: 20.0 },
            ],
            runoff: 0.0,
            half_width: 1.5,
            cone_spacing: 3.0,
            closed: true,
        })
    }

    pub fn count_role(&self, role: MarkerRole) -> usize {
        self.cones.iter().filter(|c| c.role == role).count()
    }

    pub fn timing_cones(&self) -> impl Iterator<Item = &TrackCone> {
        self.cones.iter().filter(|c| c.role == MarkerRole::Timing)
    }
}

/// Pose at arc length `s` from `origin` along `segments`.
fn pose_at(segments: &[Segment], origin: Pose, s: f64) -> Pose {
    let mut pose = origin;
    let mut remaining = s;
    for segment in segments {
        let length = segment.length();
        if remaining <= length {
            return segment.advance(pose, remaining);
        }
        pose = segment.advance(pose, length);
        remaining -= length;
    }
    pose
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::distance_to_polyline;
    use approx::assert_relative_eq;

    #[test]
    fn test_acceleration_layout() {
        let track = TrackLayout::acceleration();

        assert_eq!(track.start.position, Point2::new(-3.0, 0.0));
        assert_eq!(track.finish.position, Point2::new(75.0, 0.0));

        let left: Vec<_> = track
            .cones
            .iter()
            .filter(|c| c.role == MarkerRole::LeftBoundary)
            .map(|c| c.position)
            .collect();
        assert_eq!(left[0], Point2::new(0.0, 1.5));
        assert_eq!(left[1], Point2::new(4.0, 1.5));
        assert_eq!(left.len(), track.count_role(MarkerRole::RightBoundary));

        let timing: Vec<_> = track.timing_cones().map(|c| c.position).collect();
        assert_eq!(timing, vec![Point2::new(75.0, 2.0), Point2::new(75.0, -2.0)]);
    }

    #[test]
    fn test_hairpin_geometry() {
        let track = TrackLayout::hairpin();

        assert_relative_eq!(track.finish.position.x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(track.finish.position.y, 18.0, epsilon = 1e-9);
        assert_relative_eq!(track.finish.heading, std::f64::consts::PI, epsilon = 1e-9);

        // Apex of the turn
        let apex = track
            .centerline
            .iter()
            .fold(f64::MIN, |acc, p| acc.max(p.x));
        assert_relative_eq!(apex, 44.0, epsilon = 1e-3);
    }

    #[test]
    fn test_cone_pairs_straddle_centerline() {
        for track in [TrackLayout::acceleration(), TrackLayout::slalom(), TrackLayout::hairpin()] {
            let boundary: Vec<_> = track
                .cones
                .iter()
                .filter(|c| c.role != MarkerRole::Timing)
                .collect();
            for pair in boundary.chunks(2) {
                let mid = nalgebra::center(&pair[0].position, &pair[1].position);
                assert!(distance_to_polyline(&mid, &track.centerline) < 0.01, "{}", track.name);
                assert_relative_eq!(
                    nalgebra::distance(&pair[0].position, &pair[1].position),
                    2.0 * track.half_width,
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_oval_closes_on_start_line() {
        let track = TrackLayout::oval();

        assert_relative_eq!(track.finish.position.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(track.finish.position.y, 0.0, epsilon = 1e-9);
        assert_eq!(track.start.position, Point2::new(-3.0, 0.0));
        assert!(distance_to_polyline(&track.start.position, &track.centerline) < 1e-9);

        // 155.4 units of course at 3-unit spacing, no cone repeated at the seam
        assert_eq!(track.count_role(MarkerRole::LeftBoundary), 52);
        let left: Vec<_> = track
            .cones
            .iter()
            .filter(|c| c.role == MarkerRole::LeftBoundary)
            .map(|c| c.position)
            .collect();
        assert_eq!(left[0], Point2::new(0.0, 1.5));
        assert_relative_eq!(left[51].x, -2.398, epsilon = 1e-3);
        assert_relative_eq!(left[51].y, 1.5, epsilon = 1e-9);

        let timing: Vec<_> = track.timing_cones().map(|c| c.position).collect();
        assert_relative_eq!(timing[0].y, 2.0, epsilon = 1e-9);
        assert_relative_eq!(timing[1].y, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slalom_ends_straight() {
        let track = TrackLayout::slalom();
        assert_relative_eq!(track.finish.heading, 0.0, epsilon = 1e-9);
        assert_eq!(track.timing_cones().count(), 2);
    }
}

//! Trackline Core - incremental cone-based centerline planning
//!
//! Turns a stream of classified boundary cones observed around a moving
//! vehicle into a driveable centerline with a speed profile, one perception
//! cycle at a time:
//! 1. **Boundary sequencing**: greedy nearest-neighbour chains per side with a distance gate
//! 2. **Centerline synthesis**: midpoints of paired left/right cones plus a tail fallback
//! 3. **Speed profile**: three-point circle fits, `min(gain * sqrt(r), v_max)`
//! 4. **Start/finish zone**: departure latch, finish-line crossing, lap closure on closed circuits and path finalization

pub mod config;
pub mod planner_runtime;
pub mod trackline_boundary;
pub mod trackline_centerline;
pub mod trackline_markers;
pub mod trackline_novelty;
pub mod trackline_profile;
pub mod trackline_zone;

// Re-export key types for convenience
pub use config::{ConfigError, PlannerConfig};
pub use planner_runtime::{CycleReport, PathPlanner, PlannedPath};
pub use trackline_boundary::{BoundaryChain, SequenceStats, Side, StagingQueue};
pub use trackline_centerline::{Candidate, CandidateSource, PairingParams};
pub use trackline_markers::{Marker, MarkerId, MarkerRole, MarkerStore, ObservedMarker};
pub use trackline_novelty::{CountNovelty, NoveltyStrategy, ProximityNovelty, RolePartition};
pub use trackline_profile::{SpeedProfile, Waypoint, UNBOUNDED_RADIUS};
pub use trackline_zone::{CommitOutcome, TimingGate, ZoneState, ZoneTracker};

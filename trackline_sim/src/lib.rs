//! Trackline Deterministic Track Simulator
//!
//! Drives the trackline planner around synthetic cone tracks and checks its
//! output every cycle against the ground truth.
//!
//! # Core Principle: Seeded Determinism
//!
//! Every source of variation derives from a single 64-bit seed:
//! - **Sensor noise**: `ChaCha8Rng` seeded from the master seed
//! - **Time**: fixed tick rate, no wall clock
//! - **Detection order**: cones are reported in first-sighting order
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                         │
//! │  ┌───────────────┐    observe     ┌──────────────────────┐  │
//! │  │    Oracle     │──────────────▶│     PathPlanner      │  │
//! │  │ (TrackLayout, │   snapshot     │   (trackline_core)   │  │
//! │  │  SensorModel) │                └──────────┬───────────┘  │
//! │  └───────▲───────┘                           │ PlannedPath  │
//! │          │ pose                   ┌──────────▼───────────┐  │
//! │          └────────────────────────│       Vehicle        │  │
//! │                                   └──────────────────────┘  │
//! │        invariant checks · LateralMetrics · SimExport         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use trackline_sim::{ScenarioId, ScenarioRunner};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Hairpin);
//! assert!(result.passed);
//! ```

mod config;
mod error;
mod exporter;
mod oracle;
mod runner;
pub mod scenarios;
pub mod track;
pub mod validation;
mod vehicle;

pub use config::{NoveltyChoice, SimConfig};
pub use error::SimError;
pub use exporter::{SimExport, SimFrame, VehicleFrame};
pub use oracle::{Oracle, SensorModel};
pub use runner::{check_invariants, ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use track::{Pose, TrackCone, TrackLayout};
pub use vehicle::Vehicle;

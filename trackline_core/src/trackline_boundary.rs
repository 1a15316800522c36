//! Boundary Sequencer - grows the left/right chains from staged markers.
//!
//! # Algorithm
//!
//! ```text
//! while staging queue not empty:
//!     reference = chain tail, or vehicle while the chain is empty
//!     sort queue by distance to reference            (nearest first)
//!     pop head
//!     chain empty: head seeds the chain
//!     otherwise:   promote if |head - tail| <= threshold, else discard
//! ```
//!
//! Re-sorting against the newest tail before every decision makes the chain
//! follow the track edge greedily. A discarded marker is not retried.

use crate::trackline_markers::{MarkerId, MarkerRole, MarkerStore};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// Track side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn role(self) -> MarkerRole {
        match self {
            Side::Left => MarkerRole::LeftBoundary,
            Side::Right => MarkerRole::RightBoundary,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Confirmed markers of one side, in traversal order. Append-only.
#[derive(Debug, Clone, Default)]
pub struct BoundaryChain {
    ids: Vec<MarkerId>,
}

impl BoundaryChain {
    pub fn ids(&self) -> &[MarkerId] {
        &self.ids
    }

    pub fn tail(&self) -> Option<MarkerId> {
        self.ids.last().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `true` once the chain has come back around to within `gate` of its
    /// own head, as it does when a closed circuit is completed.
    pub fn wraps(&self, store: &MarkerStore, gate: f64) -> bool {
        match (self.ids.first(), self.ids.last()) {
            (Some(&head), Some(&tail)) if self.ids.len() >= MIN_WRAP_LEN => {
                nalgebra::distance(&store.position(head), &store.position(tail)) <= gate
            }
            _ => false,
        }
    }

    fn push(&mut self, id: MarkerId) {
        self.ids.push(id);
    }
}

/// Markers admitted this cycle that are not yet confirmed.
#[derive(Debug, Clone, Default)]
pub struct StagingQueue {
    ids: VecDeque<MarkerId>,
}

impl StagingQueue {
    pub fn push(&mut self, id: MarkerId) {
        self.ids.push_back(id);
    }

    pub fn ids(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Stable-sorts the queue by distance to `reference`, refreshing each
    /// marker's scratch distance.
    pub fn sort_by_distance(&mut self, store: &mut MarkerStore, reference: &Point2<f64>) {
        for &id in &self.ids {
            store.refresh_distance(id, reference);
        }
        self.ids
            .make_contiguous()
            .sort_by(|a, b| store[*a].scratch_distance().total_cmp(&store[*b].scratch_distance()));
    }

    fn pop_head(&mut self) -> Option<MarkerId> {
        self.ids.pop_front()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops the queue's storage as well as its contents.
    pub fn release(&mut self) {
        self.ids = VecDeque::new();
    }
}

/// Shortest chain that can count as wrapped around a circuit.
const MIN_WRAP_LEN: usize = 4;

/// Promotion outcome for one side in one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStats {
    pub promoted: usize,
    pub discarded: usize,
}

/// Drains `queue` into `chain`, gating each promotion at `gate`.
pub fn sequence(
    side: Side,
    queue: &mut StagingQueue,
    chain: &mut BoundaryChain,
    store: &mut MarkerStore,
    vehicle: &Point2<f64>,
    gate: f64,
) -> SequenceStats {
    let mut stats = SequenceStats::default();

    while !queue.is_empty() {
        let reference = chain.tail().map_or(*vehicle, |tail| store.position(tail));
        queue.sort_by_distance(store, &reference);

        let Some(head) = queue.pop_head() else {
            break;
        };

        // The marker nearest the vehicle always seeds an empty chain
        let gate_distance = if chain.is_empty() {
            0.0
        } else {
            store[head].scratch_distance()
        };

        if gate_distance <= gate {
            chain.push(head);
            stats.promoted += 1;
            trace!(side = side.name(), marker = head.index(), gate_distance, "promoted");
        } else {
            stats.discarded += 1;
            trace!(side = side.name(), marker = head.index(), gate_distance, "discarded");
        }
    }

    stats
}

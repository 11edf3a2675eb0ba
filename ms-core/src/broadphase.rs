//! Sweep-and-prune broad phase over 1-D intervals.
//!
//! Each body is projected onto one axis as a closed interval `[start, end]`.
//! Sorting the interval endpoints and sweeping them left to right only ever
//! compares intervals that are open at the same time, so pairs whose
//! projections are far apart are never examined.
//!
//! | Operation | Complexity | Notes |
//! |-----------|------------|-------|
//! | Sort | O(n log n) | stable sort of 2n endpoint events |
//! | Sweep (typical) | O(n + k) | k = reported pairs |
//! | Sweep (worst) | O(n²) | every projection overlaps every other |

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::types::Vec3;

/// Closed interval on the sweep axis, tagged with the body it came from.
///
/// Only built through [`Interval::new`], so `start <= end` always holds and
/// every end event sorts after its own start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    start: f64,
    end: f64,
    owner: usize,
}

impl Interval {
    /// # Errors
    /// Rejects `start > end` and NaN endpoints.
    pub fn new(start: f64, end: f64, owner: usize) -> PhysicsResult<Self> {
        if start.is_nan() || end.is_nan() || start > end {
            return Err(PhysicsError::InvalidInterval { start, end });
        }
        Ok(Self { start, end, owner })
    }

    /// Projection of a sphere of `radius` centred at `center`.
    pub fn around(center: f64, radius: f64, owner: usize) -> PhysicsResult<Self> {
        Self::new(center - radius, center + radius, owner)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn owner(&self) -> usize {
        self.owner
    }

    /// Inclusive overlap: intervals touching at a single point intersect.
    pub fn intersects(&self, other: &Interval) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

/// Axis bodies are projected onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(self, v: Vec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Two owners whose intervals overlap.
///
/// `first` was already open when `second` started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlapPair {
    pub first: usize,
    pub second: usize,
}

impl OverlapPair {
    /// Same pair with the smaller owner first.
    pub fn normalized(self) -> Self {
        if self.first <= self.second {
            self
        } else {
            Self {
                first: self.second,
                second: self.first,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Event {
    coord: f64,
    is_start: bool,
    /// Position of the interval in the input slice.
    slot: usize,
}

/// Reusable sweep state; keeps its buffers between calls.
#[derive(Debug, Default)]
pub struct SweepAndPrune {
    events: Vec<Event>,
    active: Vec<usize>,
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self::default()
    }

    /// All overlapping pairs, in the order the sweep discovers them.
    ///
    /// Events are sorted by coordinate with starts ahead of ends at equal
    /// coordinates; the sort is stable, so starts at the same coordinate
    /// keep their input order.
    pub fn find_overlaps(&mut self, intervals: &[Interval]) -> Vec<OverlapPair> {
        self.events.clear();
        self.active.clear();
        for (slot, interval) in intervals.iter().enumerate() {
            self.events.push(Event {
                coord: interval.start,
                is_start: true,
                slot,
            });
            self.events.push(Event {
                coord: interval.end,
                is_start: false,
                slot,
            });
        }

        self.events.sort_by(|a, b| {
            a.coord
                .total_cmp(&b.coord)
                .then_with(|| b.is_start.cmp(&a.is_start))
        });

        let mut pairs = Vec::new();
        for event in &self.events {
            if event.is_start {
                let incoming = &intervals[event.slot];
                for &slot in &self.active {
                    let open = &intervals[slot];
                    if open.intersects(incoming) {
                        pairs.push(OverlapPair {
                            first: open.owner,
                            second: incoming.owner,
                        });
                    }
                }
                self.active.push(event.slot);
            } else if let Some(at) = self.active.iter().position(|&s| s == event.slot) {
                self.active.remove(at);
            }
        }
        pairs
    }
}

/// O(n²) reference: every pair `i < j` whose intervals intersect.
pub fn find_overlaps_brute_force(intervals: &[Interval]) -> Vec<OverlapPair> {
    let mut pairs = Vec::new();
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            if a.intersects(b) {
                pairs.push(OverlapPair {
                    first: a.owner,
                    second: b.owner,
                });
            }
        }
    }
    pairs
}

// =============================================================================
// Tests
// =============================================================================

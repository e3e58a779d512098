//! Rolling window of probe outcomes.
//!
//! # Responsibilities
//! - Hold the last N cycle outcomes for one host (fixed slots, overwrite cursor)
//! - Derive last/avg/min/max/loss on demand
//!
//! # Design Decisions
//! - Loss is an explicit tag, never a zero duration
//! - Aggregates are recomputed from the slots, never cached
//! - No locking here; the owning registry entry is always accessed under the registry lock

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Default number of slots per host.
pub const DEFAULT_CAPACITY: usize = 10;

/// Result of one probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Echo reply observed with the given round-trip time.
    Reply(Duration),
    /// No reply within the cycle.
    Loss,
}

impl ProbeResult {
    pub fn rtt(&self) -> Option<Duration> {
        match self {
            ProbeResult::Reply(rtt) => Some(*rtt),
            ProbeResult::Loss => None,
        }
    }
}

/// One slot of the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub at: DateTime<Utc>,
    pub result: ProbeResult,
}

impl ProbeOutcome {
    pub fn reply(at: DateTime<Utc>, rtt: Duration) -> Self {
        Self { at, result: ProbeResult::Reply(rtt) }
    }

    pub fn loss(at: DateTime<Utc>) -> Self {
        Self { at, result: ProbeResult::Loss }
    }
}

/// Statistics derived from the occupied slots of a [`StatsWindow`].
///
/// `avg`, `min` and `max` are `None` when every occupied slot is a loss
/// (or the window is empty). They serialize as seconds or `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregate {
    #[serde(serialize_with = "as_seconds")]
    pub last: Option<Duration>,
    #[serde(serialize_with = "as_seconds")]
    pub avg: Option<Duration>,
    #[serde(serialize_with = "as_seconds")]
    pub min: Option<Duration>,
    #[serde(serialize_with = "as_seconds")]
    pub max: Option<Duration>,
    pub loss: usize,
    pub samples: usize,
}

impl Aggregate {
    /// True when no non-loss sample backs avg/min/max.
    pub fn has_data(&self) -> bool {
        self.avg.is_some()
    }
}

fn as_seconds<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_some(&d.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

/// Fixed-capacity ring of [`ProbeOutcome`]s, overwritten oldest-first.
#[derive(Debug, Clone)]
pub struct StatsWindow {
    slots: Vec<Option<ProbeOutcome>>,
    /// Index of the slot the next insert overwrites.
    cursor: usize,
    len: usize,
}

impl StatsWindow {
    /// Create an empty window. A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            cursor: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Overwrite the slot under the cursor and advance it.
    pub fn insert(&mut self, outcome: ProbeOutcome) {
        self.slots[self.cursor] = Some(outcome);
        self.cursor = (self.cursor + 1) % self.slots.len();
        if self.len < self.slots.len() {
            self.len += 1;
        }
    }

    /// Occupied slots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ProbeOutcome> + '_ {
        let capacity = self.slots.len();
        let start = (self.cursor + capacity - self.len) % capacity;
        (0..self.len).filter_map(move |i| self.slots[(start + i) % capacity].as_ref())
    }

    /// Single pass over the occupied slots.
    pub fn aggregate(&self) -> Aggregate {
        let mut agg = Aggregate::default();
        let mut total = Duration::ZERO;
        let mut replies: u32 = 0;

        for outcome in self.iter() {
            agg.samples += 1;
            let Some(rtt) = outcome.result.rtt() else {
                agg.loss += 1;
                continue;
            };

            // first reply seeds min/max
            agg.min = Some(agg.min.map_or(rtt, |m| m.min(rtt)));
            agg.max = Some(agg.max.map_or(rtt, |m| m.max(rtt)));
            agg.last = Some(rtt);
            total += rtt;
            replies += 1;
        }

        if replies > 0 {
            agg.avg = Some(total / replies);
        }
        agg
    }
}

impl Default for StatsWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

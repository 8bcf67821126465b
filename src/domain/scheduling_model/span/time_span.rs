use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Simulation ticks, the only time type of the engine.
pub type Ticks = i64;

/// Half-open interval `[start, end)` on the simulation timeline.
///
/// Zero-length spans are legal; they describe empty phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: Ticks,
    pub end: Ticks,
}

impl TimeSpan {
    pub fn new(start: Ticks, end: Ticks) -> Result<Self, EngineError> {
        if end < start {
            return Err(EngineError::InvalidSpan { start, end });
        }
        Ok(TimeSpan { start, end })
    }

    /// Span of `duration` ticks starting at `start`. Negative durations collapse to zero.
    pub fn starting_at(start: Ticks, duration: Ticks) -> Self {
        TimeSpan { start, end: start.saturating_add(duration.max(0)) }
    }

    pub fn empty_at(at: Ticks) -> Self {
        TimeSpan { start: at, end: at }
    }

    pub fn duration(&self) -> Ticks {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ticks) -> bool {
        self.start <= t && t < self.end
    }

    pub fn contains_span(&self, other: &TimeSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersection(&self, other: &TimeSpan) -> Option<TimeSpan> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end { Some(TimeSpan { start, end }) } else { None }
    }

    pub fn with_end(&self, end: Ticks) -> Result<TimeSpan, EngineError> {
        TimeSpan::new(self.start, end)
    }
}

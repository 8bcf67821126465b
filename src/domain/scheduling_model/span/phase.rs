use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::error::EngineError;

/// Processing phases of an activity, in timeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Processing,
    PostProcessing,
    Storage,
    Clean,
}

impl Phase {
    pub const ALL: [Phase; 5] = [Phase::Setup, Phase::Processing, Phase::PostProcessing, Phase::Storage, Phase::Clean];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Processing => "processing",
            Phase::PostProcessing => "post-processing",
            Phase::Storage => "storage",
            Phase::Clean => "clean",
        };
        write!(f, "{}", name)
    }
}

/// Contiguous range of phases during which a resource requirement occupies its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageProfile {
    pub first: Phase,
    pub last: Phase,
}

impl UsageProfile {
    pub fn new(first: Phase, last: Phase) -> Result<Self, EngineError> {
        if last < first {
            return Err(EngineError::InvalidSpan { start: first.index() as i64, end: last.index() as i64 });
        }
        Ok(UsageProfile { first, last })
    }

    /// Occupies the resource from setup through clean.
    pub fn whole() -> Self {
        UsageProfile { first: Phase::Setup, last: Phase::Clean }
    }

    pub fn includes(&self, phase: Phase) -> bool {
        self.first <= phase && phase <= self.last
    }

    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL.into_iter().filter(move |p| self.includes(*p))
    }
}

impl Default for UsageProfile {
    fn default() -> Self {
        UsageProfile::whole()
    }
}

/// Phase durations of one activity, as computed by the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredCapacity {
    #[serde(default)]
    pub setup: Ticks,
    #[serde(default)]
    pub processing: Ticks,
    #[serde(default)]
    pub post_processing: Ticks,
    #[serde(default)]
    pub storage: Ticks,
    #[serde(default)]
    pub clean: Ticks,
}

impl RequiredCapacity {
    pub fn duration_of(&self, phase: Phase) -> Ticks {
        match phase {
            Phase::Setup => self.setup,
            Phase::Processing => self.processing,
            Phase::PostProcessing => self.post_processing,
            Phase::Storage => self.storage,
            Phase::Clean => self.clean,
        }
    }

    pub fn total(&self) -> Ticks {
        Phase::ALL.iter().map(|p| self.duration_of(*p).max(0)).sum()
    }

    pub fn with_setup(mut self, setup: Ticks) -> Self {
        self.setup = setup;
        self
    }
}

/// One span per phase; consecutive spans touch and together cover `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseSpans {
    spans: [TimeSpan; 5],
}

impl PhaseSpans {
    /// Lays the phases out back to back from `start`.
    pub fn laid_out(start: Ticks, required: &RequiredCapacity) -> Self {
        let mut cursor = start;
        let mut spans = [TimeSpan::empty_at(start); 5];
        for phase in Phase::ALL {
            let span = TimeSpan::starting_at(cursor, required.duration_of(phase));
            spans[phase.index()] = span;
            cursor = span.end;
        }
        PhaseSpans { spans }
    }

    /// Builds phase spans from explicit boundaries; rejects gaps and overlaps.
    pub fn from_spans(spans: [TimeSpan; 5]) -> Result<Self, EngineError> {
        for pair in spans.windows(2) {
            if pair[0].end != pair[1].start {
                return Err(EngineError::InvalidSpan { start: pair[0].end, end: pair[1].start });
            }
        }
        Ok(PhaseSpans { spans })
    }

    pub fn get(&self, phase: Phase) -> TimeSpan {
        self.spans[phase.index()]
    }

    pub fn start(&self) -> Ticks {
        self.spans[0].start
    }

    pub fn end(&self) -> Ticks {
        self.spans[4].end
    }

    pub fn span(&self) -> TimeSpan {
        TimeSpan { start: self.start(), end: self.end() }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Phase, TimeSpan)> + '_ {
        Phase::ALL.into_iter().map(move |p| (p, self.spans[p.index()]))
    }

    /// The window a requirement with `usage` occupies.
    pub fn usage_span(&self, usage: &UsageProfile) -> TimeSpan {
        TimeSpan { start: self.get(usage.first).start, end: self.get(usage.last).end }
    }

    /// Phases outside `usage` collapse to empty spans at the edges of the usage window,
    /// so the result still sums to the usage window's duration.
    pub fn restricted_to(&self, usage: &UsageProfile) -> PhaseSpans {
        let window = self.usage_span(usage);
        let mut spans = self.spans;
        for phase in Phase::ALL {
            if phase < usage.first {
                spans[phase.index()] = TimeSpan::empty_at(window.start);
            } else if phase > usage.last {
                spans[phase.index()] = TimeSpan::empty_at(window.end);
            }
        }
        PhaseSpans { spans }
    }

    /// Replaces the clean phase with one of `clean_duration` ticks; the end moves accordingly.
    pub fn with_clean_duration(&self, clean_duration: Ticks) -> PhaseSpans {
        let mut spans = self.spans;
        let clean_start = spans[Phase::Clean.index()].start;
        spans[Phase::Clean.index()] = TimeSpan::starting_at(clean_start, clean_duration);
        PhaseSpans { spans }
    }

    /// Sum of the phase durations; always equals `end - start`.
    pub fn total(&self) -> Ticks {
        self.spans.iter().map(|s| s.duration()).sum()
    }
}

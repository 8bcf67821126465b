use crate::domain::scheduling_model::span::phase::{Phase, PhaseSpans, UsageProfile};
use crate::domain::scheduling_model::span::time_span::TimeSpan;
use crate::domain::scheduling_model::utils::fixed_point::Percent;
use crate::domain::scheduling_model::utils::handles::{ActivityId, BatchId, ResourceId};

/// One resource satisfying one resource requirement of a batch over a concrete time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub resource: ResourceId,

    /// Owning batch.
    pub batch: BatchId,

    /// Index of the resource requirement this block satisfies.
    pub requirement: usize,

    /// Phases during which the requirement occupies the resource.
    pub usage: UsageProfile,

    /// Phase spans clipped to `usage`; they sum to the block's duration.
    pub phases: PhaseSpans,

    /// Share of the resource taken on multi-tasking resources.
    pub attention: Percent,

    /// Activity the block's attention demands are keyed by (the batch's first member).
    pub owner: ActivityId,
}

impl Block {
    pub fn new(resource: ResourceId, batch: BatchId, requirement: usize, usage: UsageProfile, batch_phases: &PhaseSpans, attention: Percent, owner: ActivityId) -> Self {
        Block { resource, batch, requirement, usage, phases: batch_phases.restricted_to(&usage), attention, owner }
    }

    pub fn span(&self) -> TimeSpan {
        self.phases.span()
    }

    pub fn uses(&self, phase: Phase) -> bool {
        self.usage.includes(phase)
    }

    /// Re-derives the phase spans from the owning batch's phases.
    pub fn follow(&mut self, batch_phases: &PhaseSpans) {
        self.phases = batch_phases.restricted_to(&self.usage);
    }
}

use crate::domain::scheduling_model::batch::batch::BlockExtension;
use crate::domain::scheduling_model::batch::block::Block;
use crate::domain::scheduling_model::capacity::capacity_calculator::SequencingContext;
use crate::domain::scheduling_model::capacity::capacity_interval_sequence::IntervalIndex;
use crate::domain::scheduling_model::span::phase::PhaseSpans;
use crate::domain::scheduling_model::span::resource_span::SpanReason;
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::domain::scheduling_model::utils::fixed_point::Percent;
use crate::domain::scheduling_model::utils::handles::{ActivityId, BatchId, BlockId, ReservationId, ResourceId};

/// Classified result of a feasibility test. These are expected outcomes, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleOutcome {
    Success,

    /// The resource is not online at the requested start.
    LackCapacity,

    /// A phase of the window lands on an interval that cannot host it.
    PhaseNotHostable,

    /// A single-tasking resource already holds a block or reservation in the window.
    SpanConflict,

    /// Another activity's attention leaves too little on a multi-tasking resource.
    AttentionNotAvailable,

    /// The activity's own resource requirements overload a multi-tasking resource.
    AttentionConflictBetweenMultipleRequirements,
}

/// What a failed placement ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflicting {
    Span(SpanReason),
    Attention { activity: ActivityId, requirement: usize },
    Interval(IntervalIndex),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementFailure {
    pub outcome: ScheduleOutcome,

    /// Resource requirement that failed.
    pub requirement: usize,

    pub resource: ResourceId,

    /// Earliest start worth another attempt; `None` if waiting cannot help.
    pub retry_at: Option<Ticks>,

    pub conflicting: Option<Conflicting>,

    /// Sequencing context on the primary resource at `retry_at`.
    pub context: SequencingContext,
}

/// One requirement's share of a feasible placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementPlacement {
    pub requirement: usize,
    pub resource: ResourceId,

    /// Usage window of the requirement.
    pub span: TimeSpan,

    pub attention: Percent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub activity: ActivityId,
    pub phases: PhaseSpans,
    pub context: SequencingContext,
    pub requirements: Vec<RequirementPlacement>,

    /// The window starts past the planning horizon; callers treat this as deferred.
    pub past_planning_horizon: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementAttempt {
    Fits(Placement),
    Failed(PlacementFailure),
}

impl PlacementAttempt {
    pub fn outcome(&self) -> ScheduleOutcome {
        match self {
            PlacementAttempt::Fits(_) => ScheduleOutcome::Success,
            PlacementAttempt::Failed(failure) => failure.outcome,
        }
    }

    /// The requested start on success, the failure's retry time otherwise.
    pub fn retry_at(&self) -> Option<Ticks> {
        match self {
            PlacementAttempt::Fits(placement) => Some(placement.phases.start()),
            PlacementAttempt::Failed(failure) => failure.retry_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleResult {
    Scheduled { batch: BatchId, blocks: Vec<BlockId>, retry_at: Ticks },
    Failed(PlacementFailure),
}

impl ScheduleResult {
    pub fn outcome(&self) -> ScheduleOutcome {
        match self {
            ScheduleResult::Scheduled { .. } => ScheduleOutcome::Success,
            ScheduleResult::Failed(failure) => failure.outcome,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, ScheduleResult::Scheduled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnscheduleResult {
    /// Blocks released because the last scheduled member left the batch.
    pub released: Vec<Block>,

    /// The batch had no members left and was discarded.
    pub batch_discarded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanoutMerge {
    /// The batch already had a clean phase at least as long.
    Unchanged,

    Extended(Vec<BlockExtension>),

    /// A block could not be extended; nothing was changed.
    Blocked { block: BlockId, conflicting: Conflicting, retry_at: Option<Ticks> },
}

/// Result of a continuity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuityOutcome {
    Success(ReservationId),

    /// No window within the delay budget. A `next_attempt` past the max start means the
    /// caller has to pick another resource or defer the chain.
    Retry { next_attempt: Ticks },
}

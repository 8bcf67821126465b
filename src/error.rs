use thiserror::Error;

use crate::domain::scheduling_model::utils::fixed_point::Quantity;
use crate::domain::scheduling_model::utils::handles::{ActivityId, BatchId, BlockId, ReservationId, ResourceId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse scenario JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build internal scheduling model: {0}")]
    ModelConstructionError(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Defect-class failures of the capacity engine.
///
/// Every variant signals that the orchestrating scheduler violated a precondition
/// the engine depends on. The engine aborts the mutation before touching any state
/// and never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Batch {batch:?}: adding {requested} would leave a negative remaining capacity ({remaining} left)")]
    NegativeRemainingCapacity { batch: BatchId, requested: Quantity, remaining: Quantity },

    #[error("Batch {batch:?} does not contain activity {activity:?}")]
    ActivityNotInBatch { batch: BatchId, activity: ActivityId },

    #[error("Activity {activity:?} was already unscheduled from batch {batch:?}")]
    DoubleUnschedule { batch: BatchId, activity: ActivityId },

    #[error("Batch {0:?} has no member activities")]
    EmptyBatch(BatchId),

    #[error("Batch {0:?} does not batch and already holds an activity")]
    BatchFull(BatchId),

    #[error("Resource {resource:?} was expected to be online at {at} but is not")]
    ResourceNotOnline { resource: ResourceId, at: i64 },

    #[error("Committing attention on resource {resource:?} would exceed 100% at {at}")]
    AttentionOverCommitted { resource: ResourceId, at: i64 },

    #[error("Span tree already holds an entry for {0}")]
    DuplicateSpan(String),

    #[error("Name {0} is already registered")]
    DuplicateName(String),

    #[error("Unknown resource {0:?}")]
    UnknownResource(ResourceId),

    #[error("Unknown activity {0:?}")]
    UnknownActivity(ActivityId),

    #[error("Unknown batch {0:?}")]
    UnknownBatch(BatchId),

    #[error("Unknown block {0:?}")]
    UnknownBlock(BlockId),

    #[error("Unknown reservation {0:?}")]
    UnknownReservation(ReservationId),

    #[error("Activity {activity:?} has {expected} resource requirements but {supplied} resources were assigned")]
    AssignmentMismatch { activity: ActivityId, expected: usize, supplied: usize },

    #[error("Resource {0:?} does not track continuity reservations")]
    NotTrackingContinuity(ResourceId),

    #[error("Activity {0:?} is already scheduled")]
    AlreadyScheduled(ActivityId),

    #[error("Activity {0:?} is not scheduled")]
    NotScheduled(ActivityId),

    #[error("Invalid span [{start}, {end})")]
    InvalidSpan { start: i64, end: i64 },

    #[error("Percentage {0} is outside of (0, 100]")]
    InvalidPercent(String),

    #[error("Simulation clock cannot move backwards from {current} to {requested}")]
    ClockMovedBackwards { current: i64, requested: i64 },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

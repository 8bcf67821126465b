use crate::domain::scheduling_model::span::phase::PhaseSpans;
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::domain::scheduling_model::utils::fixed_point::Percent;
use crate::domain::scheduling_model::utils::handles::{ActivityId, ResourceId};
use crate::domain::scheduling_model::utils::id::ReservationName;

/// Speculative claim on a resource's timeline, made ahead of block creation so that a
/// successor bound by a maximum delay can always start in time.
///
/// At most one live reservation exists per (activity, requirement); it is replaced, never
/// duplicated, and disappears once a block is created for the same activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Unique name, used in logs and analytics.
    pub name: ReservationName,

    /// The successor activity the window is held for.
    pub activity: ActivityId,

    /// Index of the resource requirement of `activity` the reservation stands in for.
    pub requirement: usize,

    /// Resource the window is reserved on.
    pub resource: ResourceId,

    /// Resource the predecessor runs on.
    pub predecessor_resource: ResourceId,

    /// Reserved window (the usage window of the requirement).
    pub span: TimeSpan,

    /// Phase layout the window was computed from.
    pub phases: PhaseSpans,

    /// Attention claimed on multi-tasking resources.
    pub attention: Percent,

    /// Simulation clock when the reservation was made.
    pub created_at: Ticks,
}

impl Reservation {
    pub fn get_name(&self) -> ReservationName {
        self.name.clone()
    }

    pub fn start(&self) -> Ticks {
        self.span.start
    }

    pub fn end(&self) -> Ticks {
        self.span.end
    }
}

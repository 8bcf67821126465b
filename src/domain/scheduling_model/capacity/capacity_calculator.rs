use serde::{Deserialize, Serialize};

use crate::domain::scheduling_model::capacity::capacity_interval_sequence::CapacityIntervalSequence;
use crate::domain::scheduling_model::span::phase::{PhaseSpans, RequiredCapacity};
use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::domain::scheduling_model::utils::handles::ActivityId;

/// What precedes a candidate placement on its resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencingContext {
    /// Activity owning the span that ends closest before the candidate start.
    pub left_neighbor: Option<ActivityId>,

    /// Setup family of `left_neighbor`, if it has one.
    pub left_family: Option<String>,
}

/// How an activity's required capacity is laid onto a resource's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapacityCalculator {
    /// Phases run back to back in wall time; every touched interval must host the phase.
    Fixed { capacity: RequiredCapacity },

    /// Phases only accrue work inside intervals hosting them; offline time pauses the work.
    OnlineOnly { capacity: RequiredCapacity },

    /// Like `Fixed`, but the setup shrinks to `reduced_setup` when the left neighbor on the
    /// resource belongs to the same setup family.
    FamilySetup { capacity: RequiredCapacity, family: String, reduced_setup: Ticks },
}

impl CapacityCalculator {
    pub fn fixed(capacity: RequiredCapacity) -> Self {
        CapacityCalculator::Fixed { capacity }
    }

    /// Phase durations for a placement after `context`.
    pub fn required(&self, context: &SequencingContext) -> RequiredCapacity {
        match self {
            CapacityCalculator::Fixed { capacity } | CapacityCalculator::OnlineOnly { capacity } => *capacity,
            CapacityCalculator::FamilySetup { capacity, family, reduced_setup } => {
                if context.left_family.as_deref() == Some(family.as_str()) {
                    capacity.with_setup((*reduced_setup).min(capacity.setup))
                } else {
                    *capacity
                }
            }
        }
    }

    /// Lays the phases out from `start` on `intervals`.
    pub fn lay_out(&self, start: Ticks, intervals: &CapacityIntervalSequence, context: &SequencingContext) -> PhaseSpans {
        let required = self.required(context);
        match self {
            CapacityCalculator::Fixed { .. } | CapacityCalculator::FamilySetup { .. } => PhaseSpans::laid_out(start, &required),
            CapacityCalculator::OnlineOnly { .. } => intervals.lay_out_online(start, &required),
        }
    }

    /// Whether placements built by this calculator may straddle intervals that cannot host a phase.
    pub fn pauses_outside_online_time(&self) -> bool {
        matches!(self, CapacityCalculator::OnlineOnly { .. })
    }

    pub fn setup_family(&self) -> Option<&str> {
        match self {
            CapacityCalculator::FamilySetup { family, .. } => Some(family.as_str()),
            CapacityCalculator::Fixed { .. } | CapacityCalculator::OnlineOnly { .. } => None,
        }
    }
}

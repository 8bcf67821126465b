use serde::{Deserialize, Serialize};

use crate::domain::scheduling_model::batch::batch::BatchType;
use crate::domain::scheduling_model::capacity::capacity_calculator::CapacityCalculator;
use crate::domain::scheduling_model::span::phase::UsageProfile;
use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::domain::scheduling_model::utils::fixed_point::{Percent, Quantity};
use crate::domain::scheduling_model::utils::handles::BatchId;
use crate::domain::scheduling_model::utils::id::ActivityName;

/// One resource type an activity needs; index 0 of an activity's list is the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    #[serde(default)]
    pub usage: UsageProfile,

    /// Share taken on a multi-tasking resource.
    #[serde(default)]
    pub attention: Percent,
}

impl ResourceRequirement {
    pub fn new(usage: UsageProfile, attention: Percent) -> Self {
        ResourceRequirement { usage, attention }
    }
}

impl Default for ResourceRequirement {
    fn default() -> Self {
        ResourceRequirement { usage: UsageProfile::whole(), attention: Percent::FULL }
    }
}

/// The smallest schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub name: ActivityName,

    /// Quantity charged against a batch's remaining capacity.
    pub quantity: Quantity,

    /// Batch type used when this activity opens a new batch.
    pub batch_type: BatchType,

    pub calculator: CapacityCalculator,

    /// Never empty; the first entry is the primary requirement.
    requirements: Vec<ResourceRequirement>,

    /// Start the activity was anchored or sequence-pinned to by a user.
    pub anchor: Option<Ticks>,

    /// Batch the activity belongs to, if any.
    pub batch: Option<BatchId>,
}

impl Activity {
    /// Creates an activity with a single primary requirement that uses the whole phase range at 100%.
    pub fn new(name: ActivityName, quantity: Quantity, calculator: CapacityCalculator) -> Self {
        Activity { name, quantity, batch_type: BatchType::None, calculator, requirements: vec![ResourceRequirement::default()], anchor: None, batch: None }
    }

    pub fn with_primary(mut self, requirement: ResourceRequirement) -> Self {
        self.requirements[0] = requirement;
        self
    }

    /// Adds a helper requirement.
    pub fn with_requirement(mut self, requirement: ResourceRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_batch_type(mut self, batch_type: BatchType) -> Self {
        self.batch_type = batch_type;
        self
    }

    pub fn with_anchor(mut self, anchor: Ticks) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn requirements(&self) -> &[ResourceRequirement] {
        &self.requirements
    }

    pub fn primary(&self) -> &ResourceRequirement {
        &self.requirements[0]
    }

    pub fn setup_family(&self) -> Option<&str> {
        self.calculator.setup_family()
    }
}

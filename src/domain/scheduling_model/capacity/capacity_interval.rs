use serde::{Deserialize, Serialize};

use crate::domain::scheduling_model::capacity::attention_ledger::AttentionLedger;
use crate::domain::scheduling_model::span::phase::Phase;
use crate::domain::scheduling_model::span::time_span::TimeSpan;

/// Which processing phases an interval may host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseUsability {
    #[serde(default = "enabled")]
    pub setup: bool,
    #[serde(default = "enabled")]
    pub processing: bool,
    #[serde(default = "enabled")]
    pub post_processing: bool,
    #[serde(default = "enabled")]
    pub storage: bool,
    #[serde(default = "enabled")]
    pub clean: bool,
}

fn enabled() -> bool {
    true
}

impl PhaseUsability {
    pub fn all() -> Self {
        PhaseUsability { setup: true, processing: true, post_processing: true, storage: true, clean: true }
    }

    pub fn none() -> Self {
        PhaseUsability { setup: false, processing: false, post_processing: false, storage: false, clean: false }
    }

    pub fn can_host(&self, phase: Phase) -> bool {
        match phase {
            Phase::Setup => self.setup,
            Phase::Processing => self.processing,
            Phase::PostProcessing => self.post_processing,
            Phase::Storage => self.storage,
            Phase::Clean => self.clean,
        }
    }

    pub fn with(mut self, phase: Phase, usable: bool) -> Self {
        match phase {
            Phase::Setup => self.setup = usable,
            Phase::Processing => self.processing = usable,
            Phase::PostProcessing => self.post_processing = usable,
            Phase::Storage => self.storage = usable,
            Phase::Clean => self.clean = usable,
        }
        self
    }
}

impl Default for PhaseUsability {
    fn default() -> Self {
        PhaseUsability::all()
    }
}

/// A maximal stretch of a resource's timeline with constant state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityInterval {
    pub span: TimeSpan,

    pub online: bool,

    pub usability: PhaseUsability,

    /// Set only on the trailing interval that represents everything after the planning horizon.
    pub past_planning_horizon: bool,

    /// Present on multi-tasking resources only.
    pub attention: Option<AttentionLedger>,
}

impl CapacityInterval {
    pub fn online(span: TimeSpan) -> Self {
        CapacityInterval { span, online: true, usability: PhaseUsability::all(), past_planning_horizon: false, attention: None }
    }

    pub fn offline(span: TimeSpan) -> Self {
        CapacityInterval { span, online: false, usability: PhaseUsability::none(), past_planning_horizon: false, attention: None }
    }

    pub fn with_usability(mut self, usability: PhaseUsability) -> Self {
        self.usability = usability;
        self
    }

    /// Online and able to host `phase`.
    pub fn can_host(&self, phase: Phase) -> bool {
        self.online && self.usability.can_host(phase)
    }
}

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::domain::scheduling_model::batch::block::Block;
use crate::domain::scheduling_model::span::phase::{Phase, PhaseSpans};
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::domain::scheduling_model::utils::fixed_point::Quantity;
use crate::domain::scheduling_model::utils::handles::{ActivityId, BatchId, BlockId};
use crate::error::{EngineError, EngineResult};

/// How a batch accounts for the capacity its members consume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchType {
    /// No batching: exactly one member.
    #[default]
    None,

    /// Members share one processing cycle; each takes `quantity / quantity_per_cycle` of it.
    Percent { quantity_per_cycle: Quantity },

    /// Members share a fixed volume.
    Volume { capacity: Quantity },
}

impl BatchType {
    /// The capacity a fresh batch of this type starts with.
    pub fn capacity(&self) -> Quantity {
        match self {
            BatchType::None => Quantity::ZERO,
            BatchType::Percent { quantity_per_cycle } => *quantity_per_cycle,
            BatchType::Volume { capacity } => *capacity,
        }
    }
}

/// Number of members still scheduled, computed on the first unschedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduledCount {
    #[default]
    NotYetComputed,
    Count(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMember {
    pub activity: ActivityId,
    pub quantity: Quantity,

    /// Set by a partial unschedule that left the member in the batch.
    pub unscheduled: bool,
}

/// Blocks whose span changed during a cleanout merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockExtension {
    pub block: BlockId,
    pub old_span: TimeSpan,
    pub new_span: TimeSpan,
}

/// A set of activities sharing the same blocks, one per resource requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    id: BatchId,
    batch_type: BatchType,
    remaining: Quantity,
    members: Vec<BatchMember>,
    blocks: Vec<Option<BlockId>>,
    phases: PhaseSpans,
    scheduled_count: ScheduledCount,
}

impl Batch {
    pub fn new(id: BatchId, batch_type: BatchType, requirement_count: usize, phases: PhaseSpans) -> Self {
        Batch {
            id,
            batch_type,
            remaining: batch_type.capacity(),
            members: Vec::new(),
            blocks: vec![None; requirement_count],
            phases,
            scheduled_count: ScheduledCount::NotYetComputed,
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    pub fn members(&self) -> &[BatchMember] {
        &self.members
    }

    pub fn contains(&self, activity: ActivityId) -> bool {
        self.members.iter().any(|m| m.activity == activity)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn phases(&self) -> &PhaseSpans {
        &self.phases
    }

    pub fn span(&self) -> TimeSpan {
        self.phases.span()
    }

    pub fn blocks(&self) -> &[Option<BlockId>] {
        &self.blocks
    }

    pub fn block_for(&self, requirement: usize) -> Option<BlockId> {
        self.blocks.get(requirement).copied().flatten()
    }

    pub fn set_block(&mut self, requirement: usize, block: BlockId) {
        if requirement >= self.blocks.len() {
            self.blocks.resize(requirement + 1, None);
        }
        self.blocks[requirement] = Some(block);
    }

    pub fn scheduled_count(&self) -> ScheduledCount {
        self.scheduled_count
    }

    /// Remaining capacity in quantity units.
    pub fn remaining_capacity(&self) -> Quantity {
        self.remaining
    }

    /// Remaining share of the cycle in hundredths of a percent; only meaningful for percent batches.
    pub fn remaining_percent_of_cycle(&self) -> i64 {
        self.remaining.ratio_in_hundredths(self.batch_type.capacity())
    }

    /// Adds `activity` with `quantity` to the batch.
    ///
    /// Percent and volume batches are charged `quantity` against their remaining capacity;
    /// a charge that would go negative is a defect and leaves the batch untouched.
    pub fn add(&mut self, activity: ActivityId, quantity: Quantity) -> EngineResult<()> {
        if self.contains(activity) {
            log::error!("Batch {:?}: activity {:?} is already a member.", self.id, activity);
            return Err(EngineError::AlreadyScheduled(activity));
        }

        match self.batch_type {
            BatchType::None => {
                if !self.members.is_empty() {
                    log::error!("Batch {:?} does not batch; activity {:?} cannot join.", self.id, activity);
                    return Err(EngineError::BatchFull(self.id));
                }
            }
            BatchType::Percent { .. } | BatchType::Volume { .. } => {
                let after = self.remaining - quantity;
                if after.is_negative() {
                    log::error!(
                        "Batch {:?}: adding {} for activity {:?} leaves a negative remaining capacity ({} left).",
                        self.id,
                        quantity,
                        activity,
                        self.remaining
                    );
                    return Err(EngineError::NegativeRemainingCapacity { batch: self.id, requested: quantity, remaining: self.remaining });
                }
                self.remaining = after;
            }
        }

        self.members.push(BatchMember { activity, quantity, unscheduled: false });
        if let ScheduledCount::Count(n) = self.scheduled_count {
            self.scheduled_count = ScheduledCount::Count(n + 1);
        }
        Ok(())
    }

    /// Unschedules one member.
    ///
    /// With `remove` the member leaves the batch and its quantity is credited back; without
    /// it the member stays (partial unschedule of a subset of the batch). The scheduled count
    /// is computed on first use.
    ///
    /// # Returns
    /// `Some(blocks)` once the last scheduled member is gone; the batch no longer references
    /// those blocks and the caller releases them. `None` while other members remain scheduled.
    pub fn unschedule_activity(&mut self, activity: ActivityId, remove: bool) -> EngineResult<Option<Vec<BlockId>>> {
        let Some(position) = self.members.iter().position(|m| m.activity == activity) else {
            log::error!("Batch {:?} does not contain activity {:?}.", self.id, activity);
            return Err(EngineError::ActivityNotInBatch { batch: self.id, activity });
        };

        if self.members[position].unscheduled {
            log::error!("Activity {:?} was already unscheduled from batch {:?}.", activity, self.id);
            return Err(EngineError::DoubleUnschedule { batch: self.id, activity });
        }

        let count = match self.scheduled_count {
            ScheduledCount::NotYetComputed => self.members.iter().filter(|m| !m.unscheduled).count(),
            ScheduledCount::Count(n) => n,
        };

        if count == 0 {
            log::error!("Batch {:?} has no scheduled members left but activity {:?} is being unscheduled.", self.id, activity);
            return Err(EngineError::DoubleUnschedule { batch: self.id, activity });
        }
        let count = count - 1;

        if remove {
            let member = self.members.remove(position);
            if !matches!(self.batch_type, BatchType::None) {
                self.remaining += member.quantity;
            }
        } else {
            self.members[position].unscheduled = true;
        }

        if self.members.is_empty() {
            self.remaining = self.batch_type.capacity();
        }

        if count > 0 {
            self.scheduled_count = ScheduledCount::Count(count);
            return Ok(None);
        }

        self.scheduled_count = ScheduledCount::NotYetComputed;
        let released: Vec<BlockId> = self.blocks.iter_mut().filter_map(|slot| slot.take()).collect();
        Ok(Some(released))
    }

    pub fn has_blocks(&self) -> bool {
        self.blocks.iter().any(Option::is_some)
    }

    pub fn is_member_unscheduled(&self, activity: ActivityId) -> bool {
        self.members.iter().any(|m| m.activity == activity && m.unscheduled)
    }

    /// Marks a partially unscheduled member as scheduled again. The batch must still hold its blocks.
    pub fn resume_member(&mut self, activity: ActivityId) -> EngineResult<()> {
        if !self.has_blocks() {
            log::error!("Batch {:?} released its blocks; activity {:?} cannot resume in it.", self.id, activity);
            return Err(EngineError::EmptyBatch(self.id));
        }
        let Some(member) = self.members.iter_mut().find(|m| m.activity == activity) else {
            return Err(EngineError::ActivityNotInBatch { batch: self.id, activity });
        };
        if !member.unscheduled {
            return Err(EngineError::AlreadyScheduled(activity));
        }

        member.unscheduled = false;
        if let ScheduledCount::Count(n) = self.scheduled_count {
            self.scheduled_count = ScheduledCount::Count(n + 1);
        }
        Ok(())
    }

    /// Removes a member left behind by a partial unschedule and credits its quantity back.
    pub fn detach_unscheduled(&mut self, activity: ActivityId) -> EngineResult<()> {
        let Some(position) = self.members.iter().position(|m| m.activity == activity) else {
            log::error!("Batch {:?} does not contain activity {:?}.", self.id, activity);
            return Err(EngineError::ActivityNotInBatch { batch: self.id, activity });
        };
        if !self.members[position].unscheduled {
            log::error!("Activity {:?} is still scheduled in batch {:?}.", activity, self.id);
            return Err(EngineError::AlreadyScheduled(activity));
        }

        let member = self.members.remove(position);
        if !matches!(self.batch_type, BatchType::None) {
            self.remaining += member.quantity;
        }
        if self.members.is_empty() {
            self.remaining = self.batch_type.capacity();
        }
        Ok(())
    }

    /// Phase spans after merging a clean requirement of `clean` ticks, or `None` if the
    /// current clean phase is already at least that long.
    pub fn planned_cleanout(&self, clean: Ticks) -> Option<PhaseSpans> {
        if clean <= self.phases.get(Phase::Clean).duration() {
            return None;
        }
        Some(self.phases.with_clean_duration(clean))
    }

    /// Extends the clean phase (and the batch end) to `clean` ticks if that is longer than
    /// the current clean phase. Every block using the clean phase follows the new end.
    ///
    /// # Returns
    /// The blocks whose span changed; empty when the merge was a no-op.
    pub fn merge_cleanout(&mut self, clean: Ticks, blocks: &mut SlotMap<BlockId, Block>) -> EngineResult<Vec<BlockExtension>> {
        if self.members.is_empty() {
            log::error!("Cleanout merge on batch {:?} without members.", self.id);
            return Err(EngineError::EmptyBatch(self.id));
        }

        let Some(phases) = self.planned_cleanout(clean) else {
            return Ok(Vec::new());
        };

        for block_id in self.blocks.iter().flatten() {
            if !blocks.contains_key(*block_id) {
                return Err(EngineError::UnknownBlock(*block_id));
            }
        }

        self.phases = phases;

        let mut extensions = Vec::new();
        for block_id in self.blocks.iter().flatten() {
            if let Some(block) = blocks.get_mut(*block_id) {
                if !block.uses(Phase::Clean) {
                    continue;
                }
                let old_span = block.span();
                block.follow(&self.phases);
                extensions.push(BlockExtension { block: *block_id, old_span, new_span: block.span() });
            }
        }

        Ok(extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scheduling_model::span::phase::RequiredCapacity;

    fn batch(batch_type: BatchType) -> (Batch, SlotMap<ActivityId, ()>) {
        let mut batches: SlotMap<BatchId, ()> = SlotMap::with_key();
        let id = batches.insert(());
        let phases = PhaseSpans::laid_out(0, &RequiredCapacity { processing: 100, clean: 10, ..Default::default() });
        (Batch::new(id, batch_type, 1, phases), SlotMap::with_key())
    }

    #[test]
    fn percent_batch_tracks_share_of_cycle() {
        let (mut batch, mut activities) = batch(BatchType::Percent { quantity_per_cycle: Quantity::from_units(4) });
        let a = activities.insert(());
        batch.add(a, Quantity::from_units(1)).unwrap();
        assert_eq!(batch.remaining_percent_of_cycle(), 7500);
    }

    #[test]
    fn non_batching_batch_rejects_second_member() {
        let (mut batch, mut activities) = batch(BatchType::None);
        let a = activities.insert(());
        let b = activities.insert(());
        batch.add(a, Quantity::from_units(5)).unwrap();
        assert_eq!(batch.add(b, Quantity::from_units(1)), Err(EngineError::BatchFull(batch.id())));
    }

    #[test]
    fn scheduled_count_starts_uncomputed() {
        let (mut batch, mut activities) = batch(BatchType::Volume { capacity: Quantity::from_units(10) });
        let a = activities.insert(());
        let b = activities.insert(());
        batch.add(a, Quantity::from_units(2)).unwrap();
        batch.add(b, Quantity::from_units(2)).unwrap();
        assert_eq!(batch.scheduled_count(), ScheduledCount::NotYetComputed);

        assert_eq!(batch.unschedule_activity(a, false).unwrap(), None);
        assert_eq!(batch.scheduled_count(), ScheduledCount::Count(1));
    }

    #[test]
    fn detaching_partially_unscheduled_member_credits_quantity() {
        let (mut batch, mut activities) = batch(BatchType::Volume { capacity: Quantity::from_units(10) });
        let a = activities.insert(());
        let b = activities.insert(());
        batch.add(a, Quantity::from_units(3)).unwrap();
        batch.add(b, Quantity::from_units(2)).unwrap();

        assert_eq!(batch.detach_unscheduled(a), Err(EngineError::AlreadyScheduled(a)));
        batch.unschedule_activity(a, false).unwrap();
        assert!(batch.is_member_unscheduled(a));

        batch.detach_unscheduled(a).unwrap();
        assert_eq!(batch.remaining_capacity(), Quantity::from_units(8));
        assert!(!batch.contains(a));
    }
}

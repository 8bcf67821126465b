use crate::domain::scheduling_model::batch::batch::Batch;
use crate::domain::scheduling_model::batch::block::Block;
use crate::domain::scheduling_model::capacity::attention_ledger::{AttentionCheck, DemandRequest};
use crate::domain::scheduling_model::engine::capacity_engine::{ANALYTICS_TARGET, CapacityEngine};
use crate::domain::scheduling_model::engine::outcome::{CleanoutMerge, Conflicting, Placement, PlacementAttempt, ScheduleResult, UnscheduleResult};
use crate::domain::scheduling_model::resource::resource::CapacityType;
use crate::domain::scheduling_model::span::phase::{Phase, UsageProfile};
use crate::domain::scheduling_model::span::resource_span::{ResourceSpan, SpanReason};
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::domain::scheduling_model::utils::handles::{ActivityId, BatchId, BlockId, ResourceId};
use crate::error::{EngineError, EngineResult};

impl CapacityEngine {
    /// Places `activity` into a new batch starting at `start`.
    ///
    /// Runs `find_placement` and, on success, commits a batch, one block per requirement,
    /// span-tree entries and attention demands. Live reservations of the activity are
    /// replaced by the blocks. A classified failure leaves every structure untouched.
    pub fn schedule(&mut self, activity: ActivityId, assignment: &[ResourceId], start: Ticks) -> EngineResult<ScheduleResult> {
        let stale = self.stale_membership(activity)?;

        match self.find_placement(activity, assignment, start)? {
            PlacementAttempt::Fits(placement) => self.commit_placement(placement, stale),
            PlacementAttempt::Failed(failure) => Ok(ScheduleResult::Failed(failure)),
        }
    }

    /// Adds `activity` as another member of `batch`, sharing its blocks.
    pub fn join_batch(&mut self, activity: ActivityId, batch_id: BatchId) -> EngineResult<()> {
        let stale = self.stale_membership(activity)?;
        let act = self.activity(activity)?;
        let (quantity, requirement_count, name) = (act.quantity, act.requirements().len(), act.name.clone());

        let Some(batch) = self.batches.get_mut(batch_id) else {
            log::error!("Activity {} cannot join unknown batch {:?}.", name, batch_id);
            return Err(EngineError::UnknownBatch(batch_id));
        };

        if stale == Some(batch_id) {
            batch.resume_member(activity)?;
        } else {
            if !batch.has_blocks() {
                log::error!("Activity {} cannot join batch {:?}: it holds no blocks.", name, batch_id);
                return Err(EngineError::EmptyBatch(batch_id));
            }
            if batch.blocks().len() != requirement_count {
                log::error!("Activity {} has {} requirements, batch {:?} has {} blocks.", name, requirement_count, batch_id, batch.blocks().len());
                return Err(EngineError::AssignmentMismatch { activity, expected: requirement_count, supplied: batch.blocks().len() });
            }
            batch.add(activity, quantity)?;
            if let Some(old) = stale {
                self.detach_membership(activity, old);
            }
        }

        self.release_reservations_of(activity);
        self.activity_mut(activity)?.batch = Some(batch_id);

        let remaining = self.batch(batch_id)?.remaining_capacity();
        tracing::info!(target: ANALYTICS_TARGET, Activity = %name, Batch = ?batch_id, Quantity = %quantity, Remaining = %remaining, "Activity joined batch");
        Ok(())
    }

    /// Unschedules `activity` from its batch.
    ///
    /// With `remove` the activity leaves the batch; without it the activity stays a member
    /// (partial unschedule). Once no scheduled member remains the batch's blocks are removed
    /// from the span trees and attention ledgers.
    pub fn unschedule(&mut self, activity: ActivityId, remove: bool) -> EngineResult<UnscheduleResult> {
        let act = self.activity(activity)?;
        let name = act.name.clone();
        let Some(batch_id) = act.batch else {
            log::error!("Activity {} is not scheduled and cannot be unscheduled.", name);
            return Err(EngineError::NotScheduled(activity));
        };

        let Some(batch) = self.batches.get_mut(batch_id) else {
            log::error!("Activity {} refers to unknown batch {:?}.", name, batch_id);
            return Err(EngineError::UnknownBatch(batch_id));
        };

        let released_ids = batch.unschedule_activity(activity, remove)?;
        let batch_discarded = batch.is_empty() && !batch.has_blocks();

        if remove {
            self.activity_mut(activity)?.batch = None;
        }

        let released: Vec<Block> = released_ids.unwrap_or_default().into_iter().filter_map(|id| self.vacate(id)).collect();
        if batch_discarded {
            self.batches.remove(batch_id);
        }

        tracing::info!(
            target: ANALYTICS_TARGET,
            Activity = %name,
            Batch = ?batch_id,
            Removed = remove,
            ReleasedBlocks = released.len(),
            BatchDiscarded = batch_discarded,
            "Activity unscheduled"
        );
        Ok(UnscheduleResult { released, batch_discarded })
    }

    /// Extends the clean phase of `batch` to `clean` ticks.
    ///
    /// Every block using the clean phase is checked before anything changes: the
    /// extension must land on intervals hosting the clean phase, must not hit another
    /// span on a single-tasking resource and must find attention on a multi-tasking one.
    pub fn merge_cleanout(&mut self, batch_id: BatchId, clean: Ticks) -> EngineResult<CleanoutMerge> {
        let batch = self.batch(batch_id)?;
        if batch.is_empty() {
            log::error!("Cleanout merge requested on batch {:?} without members.", batch_id);
            return Err(EngineError::EmptyBatch(batch_id));
        }

        let Some(planned) = batch.planned_cleanout(clean) else {
            log::debug!("Batch {:?} already cleans for at least {} ticks.", batch_id, clean);
            return Ok(CleanoutMerge::Unchanged);
        };

        let clean_only = UsageProfile::new(Phase::Clean, Phase::Clean)?;
        for block_id in batch.blocks().iter().flatten() {
            let block = self.block(*block_id)?;
            if !block.uses(Phase::Clean) {
                continue;
            }

            let old_span = block.span();
            let new_span = planned.usage_span(&block.usage);
            let extension = TimeSpan { start: old_span.end, end: new_span.end };
            let resource = self.resource(block.resource)?;

            if let Err(mismatch) = resource.intervals().phases_fit(&planned, &clean_only) {
                return Ok(CleanoutMerge::Blocked { block: *block_id, conflicting: Conflicting::Interval(mismatch.interval), retry_at: Some(mismatch.retry_at) });
            }

            match resource.capacity_type() {
                CapacityType::SingleTasking => {
                    if let Some(hit) = resource.span_tree().first_conflict(extension, &[SpanReason::Block(*block_id)]) {
                        log::debug!("Cleanout of batch {:?} blocked by {} on resource {}.", batch_id, hit.reason, resource.get_name());
                        return Ok(CleanoutMerge::Blocked { block: *block_id, conflicting: Conflicting::Span(hit.reason), retry_at: Some(hit.span.end) });
                    }
                }
                CapacityType::MultiTasking => {
                    let request = DemandRequest { activity: block.owner, requirement: block.requirement, span: extension, percent: block.attention };
                    if let AttentionCheck::Conflict(conflict) = resource.attention_available(&[request], block.owner, extension, &[]) {
                        let conflicting = Conflicting::Attention { activity: conflict.activity, requirement: conflict.requirement };
                        return Ok(CleanoutMerge::Blocked { block: *block_id, conflicting, retry_at: conflict.retry_at });
                    }
                }
                CapacityType::Infinite => {}
            }
        }

        let batch = self.batches.get_mut(batch_id).ok_or(EngineError::UnknownBatch(batch_id))?;
        let extensions = batch.merge_cleanout(clean, &mut self.blocks)?;

        let clock = self.prune_clock();
        for extension in &extensions {
            let block = self.block(extension.block)?.clone();
            let resource = self.resource_mut(block.resource)?;
            resource.remove_span(&SpanReason::Block(extension.block));
            resource.add_span(ResourceSpan::new(extension.new_span, SpanReason::Block(extension.block)))?;

            if resource.capacity_type() == CapacityType::MultiTasking {
                let owner = SpanReason::Block(extension.block);
                resource.unschedule_attention(&owner);
                let request = DemandRequest { activity: block.owner, requirement: block.requirement, span: extension.new_span, percent: block.attention };
                resource.schedule_attention(request, owner, clock).map_err(|conflict| {
                    log::error!("Extended cleanout of block {:?} over-commits attention at {}.", extension.block, conflict.at);
                    EngineError::AttentionOverCommitted { resource: block.resource, at: conflict.at }
                })?;
            }
        }

        tracing::info!(target: ANALYTICS_TARGET, Batch = ?batch_id, Clean = clean, ExtendedBlocks = extensions.len(), "Cleanout merged");
        Ok(CleanoutMerge::Extended(extensions))
    }

    /// The batch `activity` still belongs to after a partial unschedule, if any.
    ///
    /// Fails when the activity is currently scheduled.
    fn stale_membership(&self, activity: ActivityId) -> EngineResult<Option<BatchId>> {
        let act = self.activity(activity)?;
        let Some(batch_id) = act.batch else {
            return Ok(None);
        };

        match self.batches.get(batch_id) {
            Some(batch) if batch.is_member_unscheduled(activity) => Ok(Some(batch_id)),
            Some(_) => {
                log::error!("Activity {} is already scheduled in batch {:?}.", act.name, batch_id);
                Err(EngineError::AlreadyScheduled(activity))
            }
            None => Ok(None),
        }
    }

    fn detach_membership(&mut self, activity: ActivityId, batch_id: BatchId) {
        let Some(batch) = self.batches.get_mut(batch_id) else {
            return;
        };
        if let Err(e) = batch.detach_unscheduled(activity) {
            log::warn!("Could not detach activity {:?} from batch {:?}: {}", activity, batch_id, e);
            return;
        }
        if batch.is_empty() && !batch.has_blocks() {
            self.batches.remove(batch_id);
        }
    }

    fn commit_placement(&mut self, placement: Placement, stale: Option<BatchId>) -> EngineResult<ScheduleResult> {
        let activity = placement.activity;
        let act = self.activity(activity)?;
        let (quantity, batch_type, name) = (act.quantity, act.batch_type, act.name.clone());
        let usages: Vec<UsageProfile> = act.requirements().iter().map(|r| r.usage).collect();

        let phases = placement.phases;
        let batch_id = self.batches.insert_with_key(|id| Batch::new(id, batch_type, usages.len(), phases));
        if let Err(e) = self.batches[batch_id].add(activity, quantity) {
            self.batches.remove(batch_id);
            return Err(e);
        }

        let replaced = self.release_reservations_of(activity);

        let clock = self.prune_clock();
        let mut created: Vec<BlockId> = Vec::with_capacity(placement.requirements.len());
        for requirement in &placement.requirements {
            let block = Block::new(
                requirement.resource,
                batch_id,
                requirement.requirement,
                usages[requirement.requirement],
                &phases,
                requirement.attention,
                activity,
            );
            let block_id = self.blocks.insert(block);
            created.push(block_id);
            self.batches[batch_id].set_block(requirement.requirement, block_id);

            if let Err(e) = self.occupy(block_id, clock) {
                log::error!("Committing activity {} failed half-way; rolling back: {}", name, e);
                for id in &created {
                    self.vacate(*id);
                }
                self.batches.remove(batch_id);
                for reservation in replaced {
                    self.restore_reservation(reservation);
                }
                return Err(e);
            }
        }

        if let Some(old) = stale {
            self.detach_membership(activity, old);
        }
        self.activity_mut(activity)?.batch = Some(batch_id);

        tracing::info!(
            target: ANALYTICS_TARGET,
            Activity = %name,
            Batch = ?batch_id,
            Start = phases.start(),
            End = phases.end(),
            Blocks = created.len(),
            ReplacedReservations = replaced.len(),
            "Batch scheduled"
        );
        Ok(ScheduleResult::Scheduled { batch: batch_id, blocks: created, retry_at: phases.start() })
    }

    /// Enters a block into its resource's span tree and attention ledgers.
    fn occupy(&mut self, block_id: BlockId, clock: Ticks) -> EngineResult<()> {
        let block = self.block(block_id)?.clone();
        let span = block.span();
        let resource = self.resource_mut(block.resource)?;
        resource.add_span(ResourceSpan::new(span, SpanReason::Block(block_id)))?;

        let request = DemandRequest { activity: block.owner, requirement: block.requirement, span, percent: block.attention };
        resource.schedule_attention(request, SpanReason::Block(block_id), clock).map_err(|conflict| {
            log::error!("Block {:?} over-commits attention on resource {:?} at {}.", block_id, block.resource, conflict.at);
            EngineError::AttentionOverCommitted { resource: block.resource, at: conflict.at }
        })
    }

    /// Removes a block from the arena, its resource's span tree and attention ledgers.
    fn vacate(&mut self, block_id: BlockId) -> Option<Block> {
        let block = self.blocks.remove(block_id)?;
        if let Some(resource) = self.resources.get_mut(block.resource) {
            resource.remove_span(&SpanReason::Block(block_id));
            resource.unschedule_attention(&SpanReason::Block(block_id));
        }
        Some(block)
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::scheduling_model::capacity::attention_ledger::{AttentionCheck, AttentionConflict, DemandRequest};
use crate::domain::scheduling_model::capacity::capacity_interval::CapacityInterval;
use crate::domain::scheduling_model::capacity::capacity_interval_sequence::{CapacityIntervalSequence, IntervalIndex};
use crate::domain::scheduling_model::span::resource_span::{ResourceSpan, SpanReason};
use crate::domain::scheduling_model::span::span_tree::SpanTree;
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::domain::scheduling_model::utils::handles::ActivityId;
use crate::domain::scheduling_model::utils::id::ResourceName;
use crate::error::EngineResult;

/// How many placements a resource can hold at the same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityType {
    /// One block at a time; conflicts are found through the span tree.
    #[default]
    SingleTasking,

    /// Concurrent blocks as long as their attention sums to at most 100%.
    MultiTasking,

    /// Unlimited concurrency.
    Infinite,
}

/// A schedulable entity with a capacity timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: ResourceName,
    capacity_type: CapacityType,
    tracks_continuity: bool,
    intervals: CapacityIntervalSequence,
    span_tree: SpanTree,
}

impl Resource {
    /// Builds a resource over `intervals` (ordered and contiguous).
    ///
    /// The interval sequence gets its past-planning-horizon tail appended, and attention
    /// ledgers when `capacity_type` is `MultiTasking`.
    pub fn new(name: ResourceName, capacity_type: CapacityType, tracks_continuity: bool, intervals: Vec<CapacityInterval>) -> EngineResult<Self> {
        let intervals = CapacityIntervalSequence::new(intervals, capacity_type == CapacityType::MultiTasking).inspect_err(|e| {
            log::error!("Capacity intervals of resource {} are invalid: {}", name, e);
        })?;

        Ok(Resource { name, capacity_type, tracks_continuity, intervals, span_tree: SpanTree::new() })
    }

    pub fn get_name(&self) -> ResourceName {
        self.name.clone()
    }

    pub fn capacity_type(&self) -> CapacityType {
        self.capacity_type
    }

    pub fn tracks_continuity(&self) -> bool {
        self.tracks_continuity
    }

    pub fn intervals(&self) -> &CapacityIntervalSequence {
        &self.intervals
    }

    pub fn span_tree(&self) -> &SpanTree {
        &self.span_tree
    }

    pub fn is_online_at(&self, t: Ticks) -> bool {
        let interval = self.intervals.get(self.intervals.find_forward(t));
        interval.online && interval.span.contains_instant(t)
    }

    pub fn add_span(&mut self, entry: ResourceSpan) -> EngineResult<()> {
        self.span_tree.add(entry)
    }

    pub fn remove_span(&mut self, reason: &SpanReason) -> Option<ResourceSpan> {
        self.span_tree.remove(reason)
    }

    /// Tests `candidates` against every attention ledger they touch.
    ///
    /// Each candidate is clipped to the intervals it overlaps and checked against that
    /// interval's ledger only. Resources that are not multi-tasking always report available.
    /// Committed demands held by an owner in `excluded` are ignored.
    pub fn attention_available(&self, candidates: &[DemandRequest], testing: ActivityId, window: TimeSpan, excluded: &[SpanReason]) -> AttentionCheck {
        if self.capacity_type != CapacityType::MultiTasking {
            return AttentionCheck::Available { retry_at: window.start };
        }

        let scope = candidates
            .iter()
            .fold(window, |hull, c| TimeSpan { start: hull.start.min(c.span.start), end: hull.end.max(c.span.end) });

        for index in self.intervals.overlapping(scope) {
            let interval = self.intervals.get(index);
            let Some(ledger) = interval.attention.as_ref() else {
                continue;
            };

            let clipped: Vec<DemandRequest> = candidates
                .iter()
                .filter_map(|c| c.span.intersection(&interval.span).map(|span| DemandRequest { span, ..*c }))
                .collect();
            if clipped.is_empty() {
                continue;
            }

            let local_window = window.intersection(&interval.span).unwrap_or_else(|| TimeSpan::empty_at(window.start.clamp(interval.span.start, interval.span.end)));
            if let AttentionCheck::Conflict(mut conflict) = ledger.attention_available_excluding(&clipped, testing, local_window, excluded) {
                if let Some(owner) = conflict.owner {
                    conflict.retry_at = conflict.retry_at.map(|end| self.continued_end(index, &owner, end));
                }
                return AttentionCheck::Conflict(conflict);
            }
        }

        AttentionCheck::Available { retry_at: window.start }
    }

    /// Follows a demand clipped at an interval boundary into the next intervals.
    fn continued_end(&self, from: IntervalIndex, owner: &SpanReason, mut end: Ticks) -> Ticks {
        let mut index = from.0 + 1;
        while index < self.intervals.len() {
            let interval = self.intervals.get(IntervalIndex(index));
            if interval.span.start != end {
                break;
            }
            let continuation = interval
                .attention
                .as_ref()
                .and_then(|ledger| ledger.demands().iter().find(|d| d.owner == *owner && d.span.start == end));
            match continuation {
                Some(demand) => end = demand.span.end,
                None => break,
            }
            index += 1;
        }
        end
    }

    /// Commits `request` on behalf of `owner` to the ledgers of every interval it overlaps.
    ///
    /// The whole request is checked first; nothing is written when any piece conflicts.
    /// Each ledger drops demands that ended before `clock` while committing.
    pub fn schedule_attention(&mut self, request: DemandRequest, owner: SpanReason, clock: Ticks) -> Result<(), AttentionConflict> {
        if self.capacity_type != CapacityType::MultiTasking || request.span.is_empty() {
            return Ok(());
        }

        if let AttentionCheck::Conflict(conflict) = self.attention_available(&[request], request.activity, request.span, &[]) {
            return Err(conflict);
        }

        let indices: Vec<IntervalIndex> = self.intervals.overlapping(request.span).collect();
        for index in indices {
            let Some(span) = request.span.intersection(&self.intervals.get(index).span) else {
                continue;
            };
            let Some(ledger) = self.intervals.ledger_mut(index) else {
                continue;
            };

            if let Err(conflict) = ledger.schedule_attention(DemandRequest { span, ..request }, owner, clock) {
                self.unschedule_attention(&owner);
                return Err(conflict);
            }
        }

        Ok(())
    }

    /// Removes every attention demand held by `owner`.
    ///
    /// # Returns
    /// The number of ledger entries removed.
    pub fn unschedule_attention(&mut self, owner: &SpanReason) -> usize {
        self.intervals.ledgers_mut().map(|ledger| ledger.unschedule_attention(owner)).sum()
    }

    /// Drops attention demands that ended before `clock` from every ledger.
    pub fn prune_attention(&mut self, clock: Ticks) -> usize {
        self.intervals.ledgers_mut().map(|ledger| ledger.prune(clock)).sum()
    }

    /// Total attention in use at `t`, in hundredths of a percent.
    pub fn attention_used_at(&self, t: Ticks) -> i64 {
        let interval = self.intervals.get(self.intervals.find_forward(t));
        interval.attention.as_ref().map(|ledger| ledger.used_at(t)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scheduling_model::utils::fixed_point::Percent;
    use crate::domain::scheduling_model::utils::handles::BlockId;
    use slotmap::SlotMap;

    fn span(start: Ticks, end: Ticks) -> TimeSpan {
        TimeSpan::new(start, end).unwrap()
    }

    fn multi_tasking() -> Resource {
        Resource::new(
            ResourceName::new("oven"),
            CapacityType::MultiTasking,
            false,
            vec![CapacityInterval::online(span(0, 100)), CapacityInterval::online(span(100, 200))],
        )
        .unwrap()
    }

    #[test]
    fn demands_are_split_across_intervals() {
        let mut activities: SlotMap<ActivityId, ()> = SlotMap::with_key();
        let a = activities.insert(());
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let owner = SpanReason::Block(blocks.insert(()));
        let mut resource = multi_tasking();

        let request = DemandRequest { activity: a, requirement: 0, span: span(50, 150), percent: Percent::from_percent(60).unwrap() };
        resource.schedule_attention(request, owner, 0).unwrap();

        assert_eq!(resource.attention_used_at(75), 6000);
        assert_eq!(resource.attention_used_at(125), 6000);
        assert_eq!(resource.unschedule_attention(&owner), 2);
    }

    #[test]
    fn retry_follows_demand_across_interval_boundary() {
        let mut activities: SlotMap<ActivityId, ()> = SlotMap::with_key();
        let a = activities.insert(());
        let b = activities.insert(());
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let mut resource = multi_tasking();

        let long = DemandRequest { activity: a, requirement: 0, span: span(50, 150), percent: Percent::from_percent(60).unwrap() };
        resource.schedule_attention(long, SpanReason::Block(blocks.insert(())), 0).unwrap();

        let waiting = DemandRequest { activity: b, requirement: 0, span: span(60, 80), percent: Percent::from_percent(50).unwrap() };
        match resource.attention_available(&[waiting], b, waiting.span, &[]) {
            AttentionCheck::Conflict(conflict) => assert_eq!(conflict.retry_at, Some(150)),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn failed_commit_leaves_other_blocks_of_the_same_requirement() {
        let mut activities: SlotMap<ActivityId, ()> = SlotMap::with_key();
        let a = activities.insert(());
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let first = SpanReason::Block(blocks.insert(()));
        let second = SpanReason::Block(blocks.insert(()));
        let mut resource = multi_tasking();

        let held = DemandRequest { activity: a, requirement: 0, span: span(20, 60), percent: Percent::from_percent(70).unwrap() };
        resource.schedule_attention(held, first, 0).unwrap();

        let overload = DemandRequest { activity: a, requirement: 0, span: span(40, 80), percent: Percent::from_percent(50).unwrap() };
        assert!(resource.schedule_attention(overload, second, 0).is_err());
        assert_eq!(resource.attention_used_at(30), 7000);
        assert_eq!(resource.unschedule_attention(&second), 0);
    }

    #[test]
    fn single_tasking_resources_ignore_attention() {
        let mut activities: SlotMap<ActivityId, ()> = SlotMap::with_key();
        let a = activities.insert(());
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let mut resource = Resource::new(ResourceName::new("press"), CapacityType::SingleTasking, true, vec![CapacityInterval::online(span(0, 100))]).unwrap();

        let request = DemandRequest { activity: a, requirement: 0, span: span(0, 50), percent: Percent::FULL };
        assert!(resource.schedule_attention(request, SpanReason::Block(blocks.insert(())), 0).is_ok());
        assert_eq!(resource.attention_used_at(10), 0);
    }
}

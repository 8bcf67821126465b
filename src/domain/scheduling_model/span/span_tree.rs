use std::collections::{BTreeMap, HashMap};

use crate::domain::scheduling_model::span::resource_span::{ResourceSpan, SpanReason};
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::error::EngineError;

type StartIndex = BTreeMap<Ticks, BTreeMap<SpanReason, Ticks>>;

/// Ordered index of the reserved or occupied spans of one resource.
///
/// Spans are keyed by start tick. For overlap queries they are also bucketed by duration
/// class: class `k` holds spans lasting `[2^k, 2^(k+1))` ticks, so a span of that class
/// overlapping a query must start less than `2^(k+1)` ticks before it. Each class is scanned
/// over that bounded range only, which keeps one long span from widening the scan of
/// every other class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanTree {
    /// start -> (reason -> end)
    by_start: StartIndex,

    /// duration class -> start -> (reason -> end)
    by_class: BTreeMap<u32, StartIndex>,

    /// Reverse lookup used by `remove` and `get`.
    index: HashMap<SpanReason, TimeSpan>,
}

fn duration_class(span: &TimeSpan) -> u32 {
    (span.duration().max(1) as u64).ilog2()
}

/// Longest duration a span of class `class` can have.
fn class_max(class: u32) -> Ticks {
    Ticks::MAX >> (62 - class.min(62))
}

fn insert_at(starts: &mut StartIndex, span: TimeSpan, reason: SpanReason) {
    starts.entry(span.start).or_default().insert(reason, span.end);
}

fn remove_at(starts: &mut StartIndex, span: TimeSpan, reason: &SpanReason) {
    if let Some(at_start) = starts.get_mut(&span.start) {
        at_start.remove(reason);
        if at_start.is_empty() {
            starts.remove(&span.start);
        }
    }
}

fn entries(starts: &StartIndex) -> impl Iterator<Item = ResourceSpan> + '_ {
    starts
        .iter()
        .flat_map(|(start, at_start)| at_start.iter().map(move |(reason, end)| ResourceSpan::new(TimeSpan { start: *start, end: *end }, *reason)))
}

impl SpanTree {
    pub fn new() -> Self {
        SpanTree::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, reason: &SpanReason) -> bool {
        self.index.contains_key(reason)
    }

    pub fn get(&self, reason: &SpanReason) -> Option<ResourceSpan> {
        self.index.get(reason).map(|span| ResourceSpan::new(*span, *reason))
    }

    /// Inserts a span. A reason may only be present once.
    pub fn add(&mut self, entry: ResourceSpan) -> Result<(), EngineError> {
        if self.index.contains_key(&entry.reason) {
            log::error!("Span tree already holds {}; refusing a second entry.", entry.reason);
            return Err(EngineError::DuplicateSpan(entry.reason.to_string()));
        }

        insert_at(&mut self.by_start, entry.span, entry.reason);
        insert_at(self.by_class.entry(duration_class(&entry.span)).or_default(), entry.span, entry.reason);
        self.index.insert(entry.reason, entry.span);
        Ok(())
    }

    /// Removes the span stored for `reason`.
    ///
    /// # Returns
    /// The removed span, or `None` if the tree held no span for `reason`.
    pub fn remove(&mut self, reason: &SpanReason) -> Option<ResourceSpan> {
        let span = self.index.remove(reason)?;

        remove_at(&mut self.by_start, span, reason);
        let class = duration_class(&span);
        if let Some(starts) = self.by_class.get_mut(&class) {
            remove_at(starts, span, reason);
            if starts.is_empty() {
                self.by_class.remove(&class);
            }
        }

        Some(ResourceSpan::new(span, *reason))
    }

    /// Spans whose start lies in the range a span of their class needs to reach `window`.
    fn candidates(&self, window: TimeSpan) -> impl Iterator<Item = ResourceSpan> + '_ {
        self.by_class.iter().flat_map(move |(class, starts)| {
            let lower = window.start.saturating_sub(class_max(*class));
            let range = if lower < window.end { Some(starts.range(lower..window.end)) } else { None };
            range
                .into_iter()
                .flatten()
                .flat_map(|(start, at_start)| at_start.iter().map(move |(reason, end)| ResourceSpan::new(TimeSpan { start: *start, end: *end }, *reason)))
        })
    }

    /// All spans overlapping `window`, in start order.
    pub fn intersecting(&self, window: TimeSpan) -> impl Iterator<Item = ResourceSpan> + '_ {
        let mut hits: Vec<ResourceSpan> = self.candidates(window).filter(|entry| entry.span.overlaps(&window)).collect();
        hits.sort_by_key(|entry| (entry.span.start, entry.reason));
        hits.into_iter()
    }

    /// First span (by start) overlapping `window`.
    pub fn intersects(&self, window: TimeSpan) -> Option<ResourceSpan> {
        self.intersecting(window).next()
    }

    /// First span overlapping `window` whose reason is not listed in `ignored`.
    pub fn first_conflict(&self, window: TimeSpan, ignored: &[SpanReason]) -> Option<ResourceSpan> {
        self.intersecting(window).find(|entry| !ignored.contains(&entry.reason))
    }

    /// The latest-starting span that ends at or before `at`.
    pub fn left_neighbor(&self, at: Ticks) -> Option<ResourceSpan> {
        self.by_start
            .range(..at)
            .rev()
            .flat_map(|(start, at_start)| at_start.iter().map(move |(reason, end)| ResourceSpan::new(TimeSpan { start: *start, end: *end }, *reason)))
            .find(|entry| entry.span.end <= at)
    }

    /// All spans in start order.
    pub fn iter(&self) -> impl Iterator<Item = ResourceSpan> + '_ {
        entries(&self.by_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scheduling_model::utils::handles::{BlockId, ReservationId};
    use slotmap::SlotMap;

    fn span(start: Ticks, end: Ticks) -> TimeSpan {
        TimeSpan::new(start, end).unwrap()
    }

    #[test]
    fn long_span_starting_far_before_query_is_found() {
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let long = blocks.insert(());
        let short = blocks.insert(());

        let mut tree = SpanTree::new();
        tree.add(ResourceSpan::new(span(0, 10_000), SpanReason::Block(long))).unwrap();
        tree.add(ResourceSpan::new(span(20_000, 20_010), SpanReason::Block(short))).unwrap();

        let hit = tree.intersects(span(9_000, 9_500)).unwrap();
        assert_eq!(hit.reason, SpanReason::Block(long));
        assert!(tree.intersects(span(10_000, 20_000)).is_none());
    }

    #[test]
    fn remove_restores_empty_tree() {
        let mut reservations: SlotMap<ReservationId, ()> = SlotMap::with_key();
        let r = reservations.insert(());

        let mut tree = SpanTree::new();
        tree.add(ResourceSpan::new(span(5, 15), SpanReason::Reservation(r))).unwrap();
        assert_eq!(tree.by_class.len(), 1);

        let removed = tree.remove(&SpanReason::Reservation(r)).unwrap();
        assert_eq!(removed.span, span(5, 15));
        assert_eq!(tree, SpanTree::new());
        assert!(tree.remove(&SpanReason::Reservation(r)).is_none());
    }

    #[test]
    fn duplicate_reason_is_a_defect() {
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let b = blocks.insert(());

        let mut tree = SpanTree::new();
        tree.add(ResourceSpan::new(span(0, 1), SpanReason::Block(b))).unwrap();
        assert!(matches!(tree.add(ResourceSpan::new(span(2, 3), SpanReason::Block(b))), Err(EngineError::DuplicateSpan(_))));
    }

    #[test]
    fn left_neighbor_is_latest_span_ending_before() {
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let a = blocks.insert(());
        let b = blocks.insert(());

        let mut tree = SpanTree::new();
        tree.add(ResourceSpan::new(span(0, 100), SpanReason::Block(a))).unwrap();
        tree.add(ResourceSpan::new(span(100, 200), SpanReason::Block(b))).unwrap();

        assert_eq!(tree.left_neighbor(250).unwrap().reason, SpanReason::Block(b));
        assert_eq!(tree.left_neighbor(150).unwrap().reason, SpanReason::Block(a));
        assert!(tree.left_neighbor(50).is_none());
    }

    #[test]
    fn one_long_span_does_not_widen_the_scan_over_short_ones() {
        let mut blocks: SlotMap<BlockId, ()> = SlotMap::with_key();
        let mut tree = SpanTree::new();

        let long = blocks.insert(());
        tree.add(ResourceSpan::new(span(0, 100_000), SpanReason::Block(long))).unwrap();
        for i in 0..5_000 {
            let start = i * 20;
            tree.add(ResourceSpan::new(span(start, start + 10), SpanReason::Block(blocks.insert(())))).unwrap();
        }

        let window = span(50_000, 50_005);
        assert!(tree.candidates(window).count() <= 4);

        let hits: Vec<ResourceSpan> = tree.intersecting(window).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].reason, SpanReason::Block(long));
        assert_eq!(hits[1].span, span(50_000, 50_010));
        assert!(tree.intersects(span(50_010, 50_020)).is_some_and(|hit| hit.reason == SpanReason::Block(long)));
    }
}

use crate::domain::scheduling_model::capacity::attention_ledger::AttentionLedger;
use crate::domain::scheduling_model::capacity::capacity_interval::{CapacityInterval, PhaseUsability};
use crate::domain::scheduling_model::span::phase::{Phase, PhaseSpans, RequiredCapacity, UsageProfile};
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::error::EngineError;

/// Position of an interval inside a `CapacityIntervalSequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntervalIndex(pub usize);

/// A phase that landed on an interval unable to host it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseMismatch {
    pub phase: Phase,
    pub interval: IntervalIndex,
    /// The offending interval is offline, not merely phase-incompatible.
    pub offline: bool,
    /// Start of the first interval after the offending one that hosts the phase.
    pub retry_at: Ticks,
}

/// Contiguous, ordered partition of a resource's timeline.
///
/// The last interval always represents "past the planning horizon": it starts at the
/// horizon end, runs to `Ticks::MAX`, is online and hosts every phase. Lookups past the
/// horizon land there and callers treat that as a deferred, soft failure.
///
/// Interval flags are fixed at construction, so the next online interval and the next
/// interval hosting each phase are precomputed per position. Only the attention ledgers
/// stay mutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityIntervalSequence {
    intervals: Vec<CapacityInterval>,

    /// index -> first online interval at or after it
    next_online: Vec<usize>,

    /// phase -> index -> first interval at or after it hosting the phase
    next_usable: [Vec<usize>; 5],
}

impl CapacityIntervalSequence {
    /// Validates `intervals` and appends the past-planning-horizon interval.
    ///
    /// When `multi_tasking` is set, every interval gets an empty attention ledger.
    pub fn new(mut intervals: Vec<CapacityInterval>, multi_tasking: bool) -> Result<Self, EngineError> {
        let Some(last) = intervals.last() else {
            log::error!("A capacity interval sequence needs at least one interval.");
            return Err(EngineError::InvalidSpan { start: 0, end: 0 });
        };
        let horizon_end = last.span.end;

        for interval in &intervals {
            if interval.span.duration() <= 0 {
                return Err(EngineError::InvalidSpan { start: interval.span.start, end: interval.span.end });
            }
        }

        for pair in intervals.windows(2) {
            if pair[0].span.end != pair[1].span.start {
                log::error!("Capacity intervals {:?} and {:?} are not contiguous.", pair[0].span, pair[1].span);
                return Err(EngineError::InvalidSpan { start: pair[0].span.end, end: pair[1].span.start });
            }
        }

        intervals.push(CapacityInterval {
            span: TimeSpan { start: horizon_end, end: Ticks::MAX },
            online: true,
            usability: PhaseUsability::all(),
            past_planning_horizon: true,
            attention: None,
        });

        if multi_tasking {
            for interval in intervals.iter_mut() {
                interval.attention = Some(AttentionLedger::new());
            }
        }

        let next_online = Self::next_matching(&intervals, |i| i.online);
        let next_usable = Phase::ALL.map(|phase| Self::next_matching(&intervals, |i| i.can_host(phase)));

        Ok(CapacityIntervalSequence { intervals, next_online, next_usable })
    }

    /// For every position, the first index at or after it satisfying `matches`. The
    /// past-planning-horizon tail matches everything and terminates each chain.
    fn next_matching(intervals: &[CapacityInterval], matches: impl Fn(&CapacityInterval) -> bool) -> Vec<usize> {
        let last = intervals.len() - 1;
        let mut next = vec![last; intervals.len()];
        for idx in (0..last).rev() {
            next[idx] = if matches(&intervals[idx]) { idx } else { next[idx + 1] };
        }
        next
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn get(&self, index: IntervalIndex) -> &CapacityInterval {
        &self.intervals[index.0]
    }

    pub fn ledger_mut(&mut self, index: IntervalIndex) -> Option<&mut AttentionLedger> {
        self.intervals[index.0].attention.as_mut()
    }

    pub fn ledgers_mut(&mut self) -> impl Iterator<Item = &mut AttentionLedger> {
        self.intervals.iter_mut().filter_map(|interval| interval.attention.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapacityInterval> {
        self.intervals.iter()
    }

    /// Start of the past-planning-horizon interval.
    pub fn horizon_end(&self) -> Ticks {
        self.intervals[self.intervals.len() - 1].span.start
    }

    pub fn is_past_horizon(&self, index: IntervalIndex) -> bool {
        self.get(index).past_planning_horizon
    }

    /// The interval containing `t`, or the first one if `t` lies before the timeline.
    pub fn find_forward(&self, t: Ticks) -> IntervalIndex {
        let idx = self.intervals.partition_point(|i| i.span.end <= t);
        IntervalIndex(idx.min(self.intervals.len() - 1))
    }

    /// The first online interval containing or following `t`.
    ///
    /// Offline intervals are skipped. If nothing before the horizon is online the
    /// past-planning-horizon interval is returned.
    pub fn find_first_online(&self, t: Ticks) -> IntervalIndex {
        IntervalIndex(self.next_online[self.find_forward(t).0])
    }

    /// The first interval containing or following `t` that is online and hosts `phase`.
    pub fn find_first_usable(&self, t: Ticks, phase: Phase) -> IntervalIndex {
        IntervalIndex(self.next_usable[phase.index()][self.find_forward(t).0])
    }

    /// Indices of all intervals overlapping `window`, in order.
    pub fn overlapping(&self, window: TimeSpan) -> impl Iterator<Item = IntervalIndex> + '_ {
        let start = self.find_forward(window.start).0;
        self.intervals[start..]
            .iter()
            .enumerate()
            .take_while(move |(_, i)| i.span.start < window.end)
            .filter(move |(_, i)| i.span.overlaps(&window))
            .map(move |(offset, _)| IntervalIndex(start + offset))
    }

    /// Checks that every non-empty phase inside `usage` only touches intervals that host it.
    pub fn phases_fit(&self, phases: &PhaseSpans, usage: &UsageProfile) -> Result<(), PhaseMismatch> {
        for phase in usage.phases() {
            let span = phases.get(phase);
            if span.is_empty() {
                continue;
            }
            if let Some(index) = self.overlapping(span).find(|idx| !self.get(*idx).can_host(phase)) {
                let interval = self.get(index);
                let retry_at = self.get(self.find_first_usable(interval.span.end, phase)).span.start;
                return Err(PhaseMismatch { phase, interval: index, offline: !interval.online, retry_at });
            }
        }
        Ok(())
    }

    /// Lays phases out from `start` so that each phase only accrues work inside intervals
    /// hosting it; everything else pauses the phase and stretches its wall-clock span.
    pub fn lay_out_online(&self, start: Ticks, required: &RequiredCapacity) -> PhaseSpans {
        let mut cursor = start;
        let mut spans = [TimeSpan::empty_at(start); 5];

        for phase in Phase::ALL {
            let phase_start = cursor;
            let mut remaining = required.duration_of(phase).max(0);
            let mut index = self.find_forward(cursor).0;

            while remaining > 0 {
                let interval = &self.intervals[index];
                if interval.can_host(phase) {
                    let from = cursor.max(interval.span.start);
                    let available = interval.span.end.saturating_sub(from);
                    if available >= remaining {
                        cursor = from + remaining;
                        remaining = 0;
                        break;
                    }
                    remaining -= available;
                }
                cursor = interval.span.end;
                index += 1;
                if index >= self.intervals.len() {
                    break;
                }
            }

            spans[phase.index()] = TimeSpan { start: phase_start, end: cursor };
        }

        // Consecutive spans share their boundaries by construction.
        PhaseSpans::from_spans(spans).unwrap_or_else(|_| PhaseSpans::laid_out(start, required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: Ticks, end: Ticks) -> TimeSpan {
        TimeSpan::new(start, end).unwrap()
    }

    fn sequence() -> CapacityIntervalSequence {
        CapacityIntervalSequence::new(
            vec![
                CapacityInterval::online(span(0, 100)),
                CapacityInterval::offline(span(100, 200)),
                CapacityInterval::offline(span(200, 300)),
                CapacityInterval::online(span(300, 400)),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn find_first_online_skips_offline_intervals() {
        let seq = sequence();
        assert_eq!(seq.find_forward(150), IntervalIndex(1));
        assert_eq!(seq.find_first_online(150), IntervalIndex(3));
        assert_eq!(seq.find_first_online(50), IntervalIndex(0));
    }

    #[test]
    fn lookups_after_horizon_return_past_horizon_interval() {
        let seq = sequence();
        let idx = seq.find_first_online(450);
        assert!(seq.is_past_horizon(idx));
        assert_eq!(seq.horizon_end(), 400);
    }

    #[test]
    fn gaps_are_rejected() {
        let result = CapacityIntervalSequence::new(vec![CapacityInterval::online(span(0, 10)), CapacityInterval::online(span(20, 30))], false);
        assert!(result.is_err());
    }

    #[test]
    fn online_layout_pauses_over_offline_stretch() {
        let seq = sequence();
        let required = RequiredCapacity { setup: 0, processing: 150, ..Default::default() };
        let phases = seq.lay_out_online(50, &required);
        assert_eq!(phases.get(Phase::Processing), span(50, 400));
        assert_eq!(phases.total(), 350);
    }

    #[test]
    fn phases_on_offline_interval_are_reported() {
        let seq = sequence();
        let phases = PhaseSpans::laid_out(50, &RequiredCapacity { processing: 100, ..Default::default() });
        let mismatch = seq.phases_fit(&phases, &UsageProfile::whole()).unwrap_err();
        assert!(mismatch.offline);
        assert_eq!(mismatch.interval, IntervalIndex(1));
        assert_eq!(mismatch.retry_at, 300);
    }

    #[test]
    fn usable_lookup_skips_intervals_not_hosting_the_phase() {
        let no_setup = PhaseUsability::all().with(Phase::Setup, false);
        let seq = CapacityIntervalSequence::new(
            vec![
                CapacityInterval::online(span(0, 100)).with_usability(no_setup),
                CapacityInterval::offline(span(100, 200)),
                CapacityInterval::online(span(200, 300)).with_usability(no_setup),
                CapacityInterval::online(span(300, 400)),
            ],
            false,
        )
        .unwrap();

        assert_eq!(seq.find_first_usable(50, Phase::Setup), IntervalIndex(3));
        assert_eq!(seq.find_first_usable(50, Phase::Processing), IntervalIndex(0));
        assert_eq!(seq.find_first_usable(150, Phase::Processing), IntervalIndex(2));
        assert_eq!(seq.find_first_online(120), IntervalIndex(2));
        assert!(seq.is_past_horizon(seq.find_first_usable(400, Phase::Clean)));
    }
}

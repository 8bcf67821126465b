use std::cmp::Ordering;

use crate::domain::scheduling_model::span::resource_span::SpanReason;
use crate::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use crate::domain::scheduling_model::utils::fixed_point::Percent;
use crate::domain::scheduling_model::utils::handles::ActivityId;

/// One activity's committed share of a multi-tasking capacity interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttentionDemand {
    /// The block or reservation that holds this demand. Removal goes by owner, so two
    /// blocks of the same activity and requirement never release each other's share.
    pub owner: SpanReason,

    pub activity: ActivityId,

    /// Index of the resource requirement of `activity` this demand satisfies.
    pub requirement: usize,

    pub span: TimeSpan,

    pub percent: Percent,

    /// Tiebreaker between demands with identical boundaries; unique within a ledger.
    pub sequence: u64,
}

/// A demand that is being tested or committed and has no sequence number yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemandRequest {
    pub activity: ActivityId,
    pub requirement: usize,
    pub span: TimeSpan,
    pub percent: Percent,
}

/// Why the attention sweep failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttentionConflict {
    /// Instant at which available attention dropped below zero.
    pub at: Ticks,

    /// Earliest time worth retrying. `None` if the tested demands exceed 100% among
    /// themselves, which no amount of waiting resolves.
    pub retry_at: Option<Ticks>,

    pub activity: ActivityId,
    pub requirement: usize,

    /// Holder of the conflicting committed demand; `None` when the candidates conflict
    /// among themselves.
    pub owner: Option<SpanReason>,

    /// The conflicting demand belongs to the activity being tested (another of its
    /// resource requirements) rather than to a different activity.
    pub between_requirements: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionCheck {
    /// Fits; `retry_at` is the requested start, i.e. no delay is needed.
    Available { retry_at: Ticks },
    Conflict(AttentionConflict),
}

impl AttentionCheck {
    pub fn is_available(&self) -> bool {
        matches!(self, AttentionCheck::Available { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    // Declared first so that releases sort before consumes at the same instant.
    Release,
    Consume,
}

#[derive(Debug, Clone, Copy)]
enum Owner {
    Existing(usize),
    Candidate(usize),
}

#[derive(Debug, Clone, Copy)]
struct SweepEvent {
    at: Ticks,
    kind: EventKind,
    sequence: u64,
    percent: i64,
    owner: Owner,
}

impl SweepEvent {
    fn order(&self, other: &SweepEvent) -> Ordering {
        self.at.cmp(&other.at).then(self.kind.cmp(&other.kind)).then(self.sequence.cmp(&other.sequence))
    }
}

/// The attention demands committed to one capacity interval of a multi-tasking resource.
///
/// Demands are kept in start order. Equality compares the committed demands only; the
/// sequence counter is allocation state.
#[derive(Debug, Clone, Default)]
pub struct AttentionLedger {
    demands: Vec<AttentionDemand>,
    next_sequence: u64,
}

impl PartialEq for AttentionLedger {
    fn eq(&self, other: &Self) -> bool {
        self.demands == other.demands
    }
}

impl Eq for AttentionLedger {}

impl AttentionLedger {
    pub fn new() -> Self {
        AttentionLedger::default()
    }

    pub fn demands(&self) -> &[AttentionDemand] {
        &self.demands
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// Sum of the percentages of all demands active at `t`, in hundredths of a percent.
    pub fn used_at(&self, t: Ticks) -> i64 {
        self.demands.iter().filter(|d| d.span.contains_instant(t)).map(|d| d.percent.hundredths() as i64).sum()
    }

    /// Tests whether `candidates` fit next to the committed demands.
    ///
    /// Runs an event sweep over every committed demand intersecting the window or any
    /// candidate: a consume event at each start and a release event at each end, ordered
    /// by time, releases before consumes, then sequence number. Available attention starts
    /// at 100% and the sweep fails as soon as it would drop below zero.
    ///
    /// # Returns
    /// `Available` with `retry_at == window.start` on success. On failure the first
    /// demand still consumed at the failing instant that belongs to another activity is
    /// reported, otherwise one of `testing`'s own demands; the retry time is that
    /// demand's end.
    pub fn attention_available(&self, candidates: &[DemandRequest], testing: ActivityId, window: TimeSpan) -> AttentionCheck {
        self.attention_available_excluding(candidates, testing, window, &[])
    }

    /// Same sweep as `attention_available`, but committed demands held by one of the
    /// owners in `excluded` are left out. Used when the candidates are about to replace
    /// those demands.
    pub fn attention_available_excluding(&self, candidates: &[DemandRequest], testing: ActivityId, window: TimeSpan, excluded: &[SpanReason]) -> AttentionCheck {
        let scope = candidates
            .iter()
            .fold(window, |hull, c| TimeSpan { start: hull.start.min(c.span.start), end: hull.end.max(c.span.end) });

        let mut events: Vec<SweepEvent> = Vec::new();

        for (idx, demand) in self.demands.iter().enumerate() {
            if demand.span.is_empty() || !demand.span.overlaps(&scope) || excluded.contains(&demand.owner) {
                continue;
            }
            Self::push_events(&mut events, demand.span, demand.percent, demand.sequence, Owner::Existing(idx));
        }

        for (idx, candidate) in candidates.iter().enumerate() {
            if candidate.span.is_empty() {
                continue;
            }
            let sequence = self.next_sequence + idx as u64;
            Self::push_events(&mut events, candidate.span, candidate.percent, sequence, Owner::Candidate(idx));
        }

        events.sort_by(|a, b| a.order(b));

        let mut available: i64 = Percent::FULL.hundredths() as i64;
        let mut consumed: Vec<Owner> = Vec::new();

        for event in &events {
            match event.kind {
                EventKind::Release => {
                    available += event.percent;
                    consumed.retain(|owner| !Self::same_owner(owner, &event.owner));
                }
                EventKind::Consume => {
                    available -= event.percent;
                    consumed.push(event.owner);

                    if available < 0 {
                        let conflict = self.identify_conflict(&consumed, candidates, testing, window, event.at, excluded);
                        log::debug!(
                            "Attention sweep failed at {} for activity {:?}: conflicting demand of {:?} (requirement {}), retry at {:?}.",
                            event.at,
                            testing,
                            conflict.activity,
                            conflict.requirement,
                            conflict.retry_at
                        );
                        return AttentionCheck::Conflict(conflict);
                    }
                }
            }
        }

        AttentionCheck::Available { retry_at: window.start }
    }

    fn push_events(events: &mut Vec<SweepEvent>, span: TimeSpan, percent: Percent, sequence: u64, owner: Owner) {
        let percent = percent.hundredths() as i64;
        events.push(SweepEvent { at: span.start, kind: EventKind::Consume, sequence, percent, owner });
        events.push(SweepEvent { at: span.end, kind: EventKind::Release, sequence, percent, owner });
    }

    fn same_owner(a: &Owner, b: &Owner) -> bool {
        match (a, b) {
            (Owner::Existing(x), Owner::Existing(y)) => x == y,
            (Owner::Candidate(x), Owner::Candidate(y)) => x == y,
            _ => false,
        }
    }

    fn identify_conflict(
        &self,
        consumed: &[Owner],
        candidates: &[DemandRequest],
        testing: ActivityId,
        window: TimeSpan,
        at: Ticks,
        excluded: &[SpanReason],
    ) -> AttentionConflict {
        let existing = || consumed.iter().filter_map(|owner| if let Owner::Existing(idx) = owner { Some(&self.demands[*idx]) } else { None });

        if let Some(other) = existing().find(|d| d.activity != testing) {
            return AttentionConflict {
                at,
                retry_at: Some(other.span.end),
                activity: other.activity,
                requirement: other.requirement,
                owner: Some(other.owner),
                between_requirements: false,
            };
        }

        if let Some(own) = existing().next() {
            return AttentionConflict {
                at,
                retry_at: Some(own.span.end),
                activity: own.activity,
                requirement: own.requirement,
                owner: Some(own.owner),
                between_requirements: true,
            };
        }

        // Only candidates are consumed: they overload the interval among themselves.
        // Waiting helps only if some committed demand still ends after the window start.
        let retry_at = self
            .demands
            .iter()
            .filter(|d| !excluded.contains(&d.owner))
            .map(|d| d.span.end)
            .filter(|end| *end > window.start)
            .min();
        let culprit = consumed
            .iter()
            .rev()
            .find_map(|owner| if let Owner::Candidate(idx) = owner { candidates.get(*idx) } else { None })
            .copied();

        let (activity, requirement) = culprit.map(|c| (c.activity, c.requirement)).unwrap_or((testing, 0));
        AttentionConflict { at, retry_at, activity, requirement, owner: None, between_requirements: true }
    }

    /// Drops every demand that ended before `clock`; such demands can no longer affect feasibility.
    ///
    /// # Returns
    /// The number of demands removed.
    pub fn prune(&mut self, clock: Ticks) -> usize {
        let before = self.demands.len();
        self.demands.retain(|d| d.span.end >= clock);
        before - self.demands.len()
    }

    /// Commits a demand held by `owner` after re-running the sweep for it.
    ///
    /// Demands that ended before `clock` are pruned first.
    ///
    /// # Returns
    /// The sequence number of the new demand, or the conflict if the demand would push
    /// utilization above 100%.
    pub fn schedule_attention(&mut self, request: DemandRequest, owner: SpanReason, clock: Ticks) -> Result<u64, AttentionConflict> {
        let pruned = self.prune(clock);
        if pruned > 0 {
            log::trace!("Pruned {} attention demands that ended before {}.", pruned, clock);
        }

        if let AttentionCheck::Conflict(conflict) = self.attention_available(&[request], request.activity, request.span) {
            log::error!(
                "Attention demand of {} for activity {:?} (requirement {}) over {:?} at {} exceeds 100%.",
                owner,
                request.activity,
                request.requirement,
                request.span,
                request.percent
            );
            return Err(conflict);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let demand = AttentionDemand { owner, activity: request.activity, requirement: request.requirement, span: request.span, percent: request.percent, sequence };
        let pos = self.demands.partition_point(|d| (d.span.start, d.sequence) < (demand.span.start, demand.sequence));
        self.demands.insert(pos, demand);

        Ok(sequence)
    }

    /// Removes the demands held by `owner`.
    ///
    /// # Returns
    /// The number of demands removed.
    pub fn unschedule_attention(&mut self, owner: &SpanReason) -> usize {
        let before = self.demands.len();
        self.demands.retain(|d| d.owner != *owner);
        before - self.demands.len()
    }
}

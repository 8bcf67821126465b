use crate::domain::scheduling_model::activity::activity::Activity;
use crate::domain::scheduling_model::capacity::attention_ledger::{AttentionCheck, DemandRequest};
use crate::domain::scheduling_model::capacity::capacity_calculator::SequencingContext;
use crate::domain::scheduling_model::engine::capacity_engine::CapacityEngine;
use crate::domain::scheduling_model::engine::outcome::{Conflicting, Placement, PlacementAttempt, PlacementFailure, RequirementPlacement, ScheduleOutcome};
use crate::domain::scheduling_model::resource::resource::CapacityType;
use crate::domain::scheduling_model::span::phase::PhaseSpans;
use crate::domain::scheduling_model::span::resource_span::SpanReason;
use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::domain::scheduling_model::utils::handles::{ActivityId, ResourceId};
use crate::error::{EngineError, EngineResult};

/// Claims of the tested activity that a new placement replaces and must not conflict with.
/// Both span-tree entries and attention demands are keyed by these reasons.
#[derive(Debug, Clone, Default)]
pub(crate) struct OwnClaims {
    pub spans: Vec<SpanReason>,
}

impl CapacityEngine {
    /// Tests whether `activity` fits with its phases starting at `start`.
    ///
    /// `assignment` names one resource per resource requirement, primary first. The phase
    /// layout is computed on the primary resource in the sequencing context of its left
    /// neighbor. Nothing is mutated.
    ///
    /// # Returns
    /// `Fits` with the computed layout, or the first failing requirement with its
    /// classified outcome and retry time.
    pub fn find_placement(&self, activity: ActivityId, assignment: &[ResourceId], start: Ticks) -> EngineResult<PlacementAttempt> {
        let act = self.activity(activity)?;
        self.check_assignment(activity, act, assignment)?;

        let primary = assignment[0];
        let context = self.sequencing_context(primary, start);
        let phases = act.calculator.lay_out(start, self.resource(primary)?.intervals(), &context);
        let own = self.own_claims(activity);

        let requirements: Vec<usize> = (0..act.requirements().len()).collect();
        let attempt = self.evaluate(activity, act, assignment, &requirements, phases, context, &own);

        match &attempt {
            PlacementAttempt::Fits(placement) => {
                log::debug!("Activity {} fits at {} (ends {}).", act.name, start, placement.phases.end());
            }
            PlacementAttempt::Failed(failure) => {
                log::debug!(
                    "Activity {} does not fit at {}: {:?} on requirement {} (retry at {:?}).",
                    act.name,
                    start,
                    failure.outcome,
                    failure.requirement,
                    failure.retry_at
                );
            }
        }

        Ok(attempt)
    }

    pub(crate) fn check_assignment(&self, activity: ActivityId, act: &Activity, assignment: &[ResourceId]) -> EngineResult<()> {
        if assignment.len() != act.requirements().len() {
            log::error!(
                "Activity {} has {} resource requirements but {} resources were assigned.",
                act.name,
                act.requirements().len(),
                assignment.len()
            );
            return Err(EngineError::AssignmentMismatch { activity, expected: act.requirements().len(), supplied: assignment.len() });
        }

        for resource in assignment {
            self.resource(*resource)?;
        }
        Ok(())
    }

    /// Live reservations of `activity`, which a placement of the same activity replaces.
    pub(crate) fn own_claims(&self, activity: ActivityId) -> OwnClaims {
        let spans = self.reservations.keys_for_activity(activity).into_iter().map(SpanReason::Reservation).collect();
        OwnClaims { spans }
    }

    /// Checks the listed requirements of `activity` against the laid-out `phases`.
    ///
    /// Per requirement, in order: a usage window opening together with the layout must
    /// start on an online interval, each used phase must land on intervals hosting it
    /// (unless the calculator pauses over such intervals), and the capacity check of the
    /// resource's capacity type must pass. Only the first check reports `LackCapacity`;
    /// a used phase reaching into offline time is `PhaseNotHostable` with a retry past
    /// that offline interval. Retry times are translated to a start of the whole layout.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn evaluate(
        &self,
        activity: ActivityId,
        act: &Activity,
        assignment: &[ResourceId],
        requirements: &[usize],
        phases: PhaseSpans,
        context: SequencingContext,
        own: &OwnClaims,
    ) -> PlacementAttempt {
        let start = phases.start();
        let primary = assignment[0];
        let mut placed: Vec<RequirementPlacement> = Vec::with_capacity(requirements.len());

        let fail = |outcome: ScheduleOutcome, requirement: usize, resource: ResourceId, retry_at: Option<Ticks>, conflicting: Option<Conflicting>| {
            let context = retry_at.map(|t| self.sequencing_context(primary, t)).unwrap_or_else(|| context.clone());
            PlacementAttempt::Failed(PlacementFailure { outcome, requirement, resource, retry_at, conflicting, context })
        };

        for &index in requirements {
            let resource_id = assignment[index];
            let Some(resource) = self.resources.get(resource_id) else {
                return fail(ScheduleOutcome::LackCapacity, index, resource_id, None, None);
            };
            let requirement = act.requirements()[index];
            let span = phases.usage_span(&requirement.usage);

            // Translates "the usage window may start at `t`" into a start of the layout.
            let shifted = |t: Ticks| start.saturating_add((t - span.start).max(1));

            let intervals = resource.intervals();
            let at_start = intervals.find_forward(span.start);
            if span.start == start && !intervals.get(at_start).online {
                let next_online = intervals.get(intervals.find_first_online(span.start)).span.start;
                return fail(ScheduleOutcome::LackCapacity, index, resource_id, Some(shifted(next_online)), Some(Conflicting::Interval(at_start)));
            }

            if !act.calculator.pauses_outside_online_time() {
                if let Err(mismatch) = intervals.phases_fit(&phases, &requirement.usage) {
                    let phase_start = phases.get(mismatch.phase).start;
                    let retry = start.saturating_add((mismatch.retry_at - phase_start).max(1));
                    return fail(ScheduleOutcome::PhaseNotHostable, index, resource_id, Some(retry), Some(Conflicting::Interval(mismatch.interval)));
                }
            }

            match resource.capacity_type() {
                CapacityType::SingleTasking => {
                    if !span.is_empty() {
                        if let Some(hit) = resource.span_tree().first_conflict(span, &own.spans) {
                            return fail(ScheduleOutcome::SpanConflict, index, resource_id, Some(shifted(hit.span.end)), Some(Conflicting::Span(hit.reason)));
                        }
                        if placed.iter().any(|p| p.resource == resource_id && p.span.overlaps(&span)) {
                            return fail(ScheduleOutcome::SpanConflict, index, resource_id, None, None);
                        }
                    }
                }
                CapacityType::MultiTasking => {
                    let mut candidates: Vec<DemandRequest> = placed
                        .iter()
                        .filter(|p| p.resource == resource_id)
                        .map(|p| DemandRequest { activity, requirement: p.requirement, span: p.span, percent: p.attention })
                        .collect();
                    candidates.push(DemandRequest { activity, requirement: index, span, percent: requirement.attention });

                    if let AttentionCheck::Conflict(conflict) = resource.attention_available(&candidates, activity, span, &own.spans) {
                        let outcome = if conflict.between_requirements {
                            ScheduleOutcome::AttentionConflictBetweenMultipleRequirements
                        } else {
                            ScheduleOutcome::AttentionNotAvailable
                        };
                        let conflicting = Conflicting::Attention { activity: conflict.activity, requirement: conflict.requirement };
                        return fail(outcome, index, resource_id, conflict.retry_at.map(shifted), Some(conflicting));
                    }
                }
                CapacityType::Infinite => {}
            }

            placed.push(RequirementPlacement { requirement: index, resource: resource_id, span, attention: requirement.attention });
        }

        let past_planning_horizon = self
            .resources
            .get(primary)
            .map(|resource| resource.intervals().is_past_horizon(resource.intervals().find_forward(start)))
            .unwrap_or(false);
        if past_planning_horizon {
            log::warn!("Placement of activity {} at {} lies past the planning horizon.", act.name, start);
        }

        PlacementAttempt::Fits(Placement { activity, phases, context, requirements: placed, past_planning_horizon })
    }
}

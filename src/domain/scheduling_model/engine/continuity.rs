use uuid::Uuid;

use crate::domain::scheduling_model::capacity::attention_ledger::{AttentionCheck, DemandRequest};
use crate::domain::scheduling_model::engine::capacity_engine::{ANALYTICS_TARGET, CapacityEngine};
use crate::domain::scheduling_model::engine::outcome::{ContinuityOutcome, Placement, PlacementAttempt, ScheduleOutcome};
use crate::domain::scheduling_model::reservation::reservation::Reservation;
use crate::domain::scheduling_model::span::resource_span::{ResourceSpan, SpanReason};
use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::domain::scheduling_model::utils::handles::{ActivityId, ResourceId};
use crate::domain::scheduling_model::utils::id::ReservationName;
use crate::error::{EngineError, EngineResult};

/// The successor activity and the resource its primary requirement would run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuityAssociation {
    pub successor: ActivityId,
    pub resource: ResourceId,
}

impl CapacityEngine {
    /// Searches the earliest window on the association's resource where the successor's
    /// primary requirement fits, starting no earlier than `release`, and reserves it.
    /// Neither the start nor the finish of the laid-out successor may pass `max_start`.
    ///
    /// The candidate start is raised to the successor's anchor when that anchor is not in
    /// the past and still before `max_start`. Each failed attempt moves the candidate to the
    /// returned retry time and recomputes the sequencing context there.
    ///
    /// # Returns
    /// `Success` with the new reservation (which replaces any earlier one of the same
    /// successor), or `Retry` with the next time worth trying. A retry time after
    /// `max_start` means the successor cannot run in time on this resource.
    /// A failed commit leaves the earlier reservation in place.
    ///
    /// # Errors
    /// `ResourceNotOnline` when the placement fails for lack of online capacity, which the
    /// caller should have filtered out; `NotTrackingContinuity` for resources that do not
    /// accept reservations.
    pub fn create_continuous_reservation(
        &mut self,
        association: ContinuityAssociation,
        release: Ticks,
        predecessor_resource: ResourceId,
        max_start: Ticks,
    ) -> EngineResult<ContinuityOutcome> {
        let ContinuityAssociation { successor, resource: resource_id } = association;
        self.resource(predecessor_resource)?;
        let resource = self.resource(resource_id)?;
        if !resource.tracks_continuity() {
            log::error!("Resource {} does not track continuity reservations.", resource.get_name());
            return Err(EngineError::NotTrackingContinuity(resource_id));
        }

        let act = self.activity(successor)?;
        let clock = self.now();

        let mut candidate = release;
        if let Some(anchor) = act.anchor {
            if anchor >= clock && anchor < max_start && anchor > candidate {
                log::debug!("Activity {} keeps its anchored start {} instead of {}.", act.name, anchor, release);
                candidate = anchor;
            }
        }

        let own = self.own_claims(successor);
        let assignment = [resource_id];
        let mut context = self.sequencing_context(resource_id, candidate);
        let mut context_retries = 0;
        let mut past_horizon_visits = 0;

        for _ in 0..self.config.max_search_iterations {
            let intervals = resource.intervals();
            let index = intervals.find_first_online(candidate);
            let interval = intervals.get(index);

            if interval.past_planning_horizon {
                past_horizon_visits += 1;
                if past_horizon_visits > 1 {
                    let deferred = candidate.saturating_add(self.config.ticks_per_day);
                    log::warn!("Continuity search for activity {} crossed the planning horizon twice; deferring to {}.", act.name, deferred);
                    return Ok(ContinuityOutcome::Retry { next_attempt: deferred });
                }
            }

            if interval.span.start > candidate {
                candidate = interval.span.start;
                context = self.sequencing_context(resource_id, candidate);
            }
            if candidate > max_start {
                log::debug!("Continuity search for activity {} passed its max start {} at {}.", act.name, max_start, candidate);
                return Ok(ContinuityOutcome::Retry { next_attempt: candidate });
            }

            let phases = act.calculator.lay_out(candidate, intervals, &context);
            let failure = match self.evaluate(successor, act, &assignment, &[0], phases, context.clone(), &own) {
                PlacementAttempt::Fits(placement) if placement.phases.end() > max_start => {
                    // Later starts only finish later.
                    log::debug!(
                        "Activity {} fits at {} but finishes at {}, after its max start {}.",
                        act.name,
                        candidate,
                        placement.phases.end(),
                        max_start
                    );
                    return Ok(ContinuityOutcome::Retry { next_attempt: max_start.saturating_add(1) });
                }
                PlacementAttempt::Fits(placement) => return self.commit_reservation(successor, resource_id, predecessor_resource, placement),
                PlacementAttempt::Failed(failure) => failure,
            };

            if failure.outcome == ScheduleOutcome::LackCapacity {
                log::error!("Resource {} is not online at {} although it was selected for activity {}.", resource.get_name(), candidate, act.name);
                return Err(EngineError::ResourceNotOnline { resource: resource_id, at: candidate });
            }

            let Some(retry) = failure.retry_at else {
                log::debug!("Activity {} cannot fit on resource {} at any later time.", act.name, resource.get_name());
                return Ok(ContinuityOutcome::Retry { next_attempt: max_start.saturating_add(1) });
            };

            if retry > max_start {
                return Ok(ContinuityOutcome::Retry { next_attempt: retry });
            }

            if retry <= candidate {
                // Only the sequencing context changed.
                context_retries += 1;
                if context_retries > self.config.max_context_retries || failure.context == context {
                    log::warn!("Continuity search for activity {} made no progress at {}.", act.name, candidate);
                    return Ok(ContinuityOutcome::Retry { next_attempt: candidate.saturating_add(1) });
                }
            } else {
                context_retries = 0;
                candidate = retry;
            }
            context = failure.context;
        }

        log::warn!("Continuity search for activity {} gave up after {} iterations.", act.name, self.config.max_search_iterations);
        Ok(ContinuityOutcome::Retry { next_attempt: candidate })
    }

    fn commit_reservation(
        &mut self,
        successor: ActivityId,
        resource_id: ResourceId,
        predecessor_resource: ResourceId,
        placement: Placement,
    ) -> EngineResult<ContinuityOutcome> {
        let Some(requirement) = placement.requirements.first().cloned() else {
            return Err(EngineError::AssignmentMismatch { activity: successor, expected: 1, supplied: 0 });
        };

        let previous = self.reservations.key_for(successor, requirement.requirement);
        let excluded: Vec<SpanReason> = previous.map(SpanReason::Reservation).into_iter().collect();
        let request = DemandRequest { activity: successor, requirement: requirement.requirement, span: requirement.span, percent: requirement.attention };

        if let AttentionCheck::Conflict(conflict) = self.resource(resource_id)?.attention_available(&[request], successor, requirement.span, &excluded) {
            log::error!("Reservation for activity {:?} would over-commit attention at {}.", successor, conflict.at);
            return Err(EngineError::AttentionOverCommitted { resource: resource_id, at: conflict.at });
        }

        let replaced = match previous {
            Some(key) => Some(self.release_reservation(key)?),
            None => None,
        };

        let activity_name = self.activity(successor)?.name.clone();
        let clock = self.now();
        let reservation = Reservation {
            name: ReservationName::new(format!("{}-{}", activity_name, Uuid::new_v4())),
            activity: successor,
            requirement: requirement.requirement,
            resource: resource_id,
            predecessor_resource,
            span: requirement.span,
            phases: placement.phases,
            attention: requirement.attention,
            created_at: clock,
        };
        let name = reservation.get_name();
        let (key, _) = self.reservations.add(reservation);

        let prune_clock = self.prune_clock();
        let owner = SpanReason::Reservation(key);
        let resource = self.resource_mut(resource_id)?;
        let committed = resource
            .add_span(ResourceSpan::new(requirement.span, owner))
            .and_then(|()| {
                resource.schedule_attention(request, owner, prune_clock).map_err(|conflict| {
                    log::error!("Reservation for activity {} over-commits attention at {}.", activity_name, conflict.at);
                    EngineError::AttentionOverCommitted { resource: resource_id, at: conflict.at }
                })
            });

        if let Err(e) = committed {
            resource.remove_span(&owner);
            self.reservations.remove(key);
            if let Some(reservation) = replaced {
                self.restore_reservation(reservation);
            }
            return Err(e);
        }

        tracing::info!(
            target: ANALYTICS_TARGET,
            Reservation = %name,
            Activity = %activity_name,
            Resource = ?resource_id,
            PredecessorResource = ?predecessor_resource,
            Start = requirement.span.start,
            End = requirement.span.end,
            "Reservation created"
        );
        Ok(ContinuityOutcome::Success(key))
    }
}

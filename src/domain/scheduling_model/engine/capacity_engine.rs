use std::collections::HashMap;

use slotmap::SlotMap;

use crate::config::EngineConfig;
use crate::domain::scheduling_model::activity::activity::Activity;
use crate::domain::scheduling_model::activity::successor::{SuccessorIndex, SuccessorLink};
use crate::domain::scheduling_model::batch::batch::Batch;
use crate::domain::scheduling_model::batch::block::Block;
use crate::domain::scheduling_model::capacity::attention_ledger::DemandRequest;
use crate::domain::scheduling_model::capacity::capacity_calculator::SequencingContext;
use crate::domain::scheduling_model::reservation::reservation::Reservation;
use crate::domain::scheduling_model::reservation::reservation_store::ReservationStore;
use crate::domain::scheduling_model::resource::resource::Resource;
use crate::domain::scheduling_model::span::resource_span::{ResourceSpan, SpanReason};
use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::domain::scheduling_model::utils::handles::{ActivityId, BatchId, BlockId, ReservationId, ResourceId};
use crate::domain::scheduling_model::utils::id::{ActivityName, ResourceName};
use crate::domain::simulator::simulator::SharedSimulator;
use crate::error::{EngineError, EngineResult};

/// Target of the structured analytics events emitted on every committed change.
pub const ANALYTICS_TARGET: &str = "capacity_analytics";

/// Owner of every resource, activity, batch, block and reservation of one scenario.
///
/// All cross references are arena handles. The engine is synchronous and expects the
/// caller to hold exclusive access while mutating (see `Scenario`). Cloning yields an
/// independent copy sharing only the simulation clock.
#[derive(Debug, Clone)]
pub struct CapacityEngine {
    pub(crate) config: EngineConfig,
    pub(crate) simulator: SharedSimulator,

    pub(crate) resources: SlotMap<ResourceId, Resource>,
    pub(crate) resource_names: HashMap<ResourceName, ResourceId>,

    pub(crate) activities: SlotMap<ActivityId, Activity>,
    pub(crate) activity_names: HashMap<ActivityName, ActivityId>,

    pub(crate) batches: SlotMap<BatchId, Batch>,
    pub(crate) blocks: SlotMap<BlockId, Block>,
    pub(crate) reservations: ReservationStore,

    pub(crate) successors: SuccessorIndex,
}

impl CapacityEngine {
    pub fn new(config: EngineConfig, simulator: SharedSimulator) -> Self {
        CapacityEngine {
            config,
            simulator,
            resources: SlotMap::with_key(),
            resource_names: HashMap::new(),
            activities: SlotMap::with_key(),
            activity_names: HashMap::new(),
            batches: SlotMap::with_key(),
            blocks: SlotMap::with_key(),
            reservations: ReservationStore::new(),
            successors: SuccessorIndex::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current simulation time.
    pub fn now(&self) -> Ticks {
        self.simulator.get_current_ticks()
    }

    /// Clock used to prune attention history; pruning is disabled by pretending time has not started.
    pub(crate) fn prune_clock(&self) -> Ticks {
        if self.config.prune_attention_history { self.now() } else { Ticks::MIN }
    }

    pub fn add_resource(&mut self, resource: Resource) -> EngineResult<ResourceId> {
        let name = resource.get_name();
        if self.resource_names.contains_key(&name) {
            log::error!("Resource {} is already registered.", name);
            return Err(EngineError::DuplicateName(name.to_string()));
        }

        let key = self.resources.insert(resource);
        self.resource_names.insert(name.clone(), key);
        log::debug!("Added resource {} as {:?}.", name, key);
        Ok(key)
    }

    pub fn add_activity(&mut self, activity: Activity) -> EngineResult<ActivityId> {
        let name = activity.name.clone();
        if self.activity_names.contains_key(&name) {
            log::error!("Activity {} is already registered.", name);
            return Err(EngineError::DuplicateName(name.to_string()));
        }

        let key = self.activities.insert(activity);
        self.activity_names.insert(name, key);
        Ok(key)
    }

    pub fn resource(&self, id: ResourceId) -> EngineResult<&Resource> {
        self.resources.get(id).ok_or(EngineError::UnknownResource(id))
    }

    pub(crate) fn resource_mut(&mut self, id: ResourceId) -> EngineResult<&mut Resource> {
        self.resources.get_mut(id).ok_or(EngineError::UnknownResource(id))
    }

    pub fn resource_by_name(&self, name: &ResourceName) -> Option<ResourceId> {
        self.resource_names.get(name).copied()
    }

    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources.iter()
    }

    pub fn activity(&self, id: ActivityId) -> EngineResult<&Activity> {
        self.activities.get(id).ok_or(EngineError::UnknownActivity(id))
    }

    pub(crate) fn activity_mut(&mut self, id: ActivityId) -> EngineResult<&mut Activity> {
        self.activities.get_mut(id).ok_or(EngineError::UnknownActivity(id))
    }

    pub fn activity_by_name(&self, name: &ActivityName) -> Option<ActivityId> {
        self.activity_names.get(name).copied()
    }

    pub fn activities(&self) -> impl Iterator<Item = (ActivityId, &Activity)> {
        self.activities.iter()
    }

    pub fn batch(&self, id: BatchId) -> EngineResult<&Batch> {
        self.batches.get(id).ok_or(EngineError::UnknownBatch(id))
    }

    pub fn batches(&self) -> impl Iterator<Item = (BatchId, &Batch)> {
        self.batches.iter()
    }

    pub fn block(&self, id: BlockId) -> EngineResult<&Block> {
        self.blocks.get(id).ok_or(EngineError::UnknownBlock(id))
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter()
    }

    pub fn reservation(&self, id: ReservationId) -> EngineResult<&Reservation> {
        self.reservations.get(id).ok_or(EngineError::UnknownReservation(id))
    }

    pub fn reservations(&self) -> &ReservationStore {
        &self.reservations
    }

    pub fn set_successor_index(&mut self, successors: SuccessorIndex) {
        self.successors = successors;
    }

    pub fn successors(&self, activity: ActivityId) -> &[SuccessorLink] {
        self.successors.successors_of(activity)
    }

    pub fn successor_index(&self) -> &SuccessorIndex {
        &self.successors
    }

    /// The activity owning the span behind `reason`.
    ///
    /// A block is attributed to the first remaining member of its batch, or to the
    /// activity that opened the batch once that one is gone.
    pub(crate) fn owner_of(&self, reason: &SpanReason) -> Option<ActivityId> {
        match reason {
            SpanReason::Block(block) => {
                let block = self.blocks.get(*block)?;
                let first = self.batches.get(block.batch).and_then(|batch| batch.members().first().map(|m| m.activity));
                Some(first.unwrap_or(block.owner))
            }
            SpanReason::Reservation(reservation) => self.reservations.get(*reservation).map(|r| r.activity),
        }
    }

    /// Left neighbor of `at` on `resource` and its setup family.
    pub fn sequencing_context(&self, resource: ResourceId, at: Ticks) -> SequencingContext {
        let Some(resource) = self.resources.get(resource) else {
            return SequencingContext::default();
        };

        let left_neighbor = resource.span_tree().left_neighbor(at).and_then(|entry| self.owner_of(&entry.reason));
        let left_family = left_neighbor
            .and_then(|activity| self.activities.get(activity))
            .and_then(|activity| activity.setup_family())
            .map(str::to_string);

        SequencingContext { left_neighbor, left_family }
    }

    /// Removes a reservation together with its span-tree entry and attention demands.
    pub fn release_reservation(&mut self, id: ReservationId) -> EngineResult<Reservation> {
        let Some(reservation) = self.reservations.remove(id) else {
            log::error!("Cannot release unknown reservation {:?}.", id);
            return Err(EngineError::UnknownReservation(id));
        };

        self.detach_reservation(id, &reservation);
        tracing::info!(
            target: ANALYTICS_TARGET,
            Reservation = %reservation.name,
            Activity = ?reservation.activity,
            Resource = ?reservation.resource,
            Start = reservation.start(),
            End = reservation.end(),
            "Reservation released"
        );
        Ok(reservation)
    }

    /// Drops the span-tree entry and attention of a reservation already taken out of the store.
    pub(crate) fn detach_reservation(&mut self, id: ReservationId, reservation: &Reservation) {
        if let Some(resource) = self.resources.get_mut(reservation.resource) {
            resource.remove_span(&SpanReason::Reservation(id));
            resource.unschedule_attention(&SpanReason::Reservation(id));
        }
    }

    /// Puts a released reservation back after a failed commit.
    ///
    /// The reservation is stored under a fresh key, which is returned.
    pub(crate) fn restore_reservation(&mut self, reservation: Reservation) -> ReservationId {
        let (resource, span, request) = (
            reservation.resource,
            reservation.span,
            DemandRequest { activity: reservation.activity, requirement: reservation.requirement, span: reservation.span, percent: reservation.attention },
        );
        let (key, _) = self.reservations.add(reservation);
        if let Some(resource) = self.resources.get_mut(resource) {
            if let Err(e) = resource.add_span(ResourceSpan::new(span, SpanReason::Reservation(key))) {
                log::error!("Could not restore reservation {:?}: {}", key, e);
            }
            if resource.schedule_attention(request, SpanReason::Reservation(key), Ticks::MIN).is_err() {
                log::error!("Could not restore the attention of reservation {:?}.", key);
            }
        }
        key
    }

    /// Releases every live reservation of `activity`.
    pub(crate) fn release_reservations_of(&mut self, activity: ActivityId) -> Vec<Reservation> {
        let keys = self.reservations.keys_for_activity(activity);
        keys.into_iter().filter_map(|key| self.release_reservation(key).ok()).collect()
    }
}

use slotmap::SlotMap;
use std::collections::HashMap;

use crate::domain::scheduling_model::reservation::reservation::Reservation;
use crate::domain::scheduling_model::utils::handles::{ActivityId, ReservationId};
use crate::domain::scheduling_model::utils::id::ReservationName;

/// Arena of live continuity reservations.
///
/// Besides the arena it keeps two lookups: by reservation name, and by
/// (activity, requirement) which enforces that only one live reservation exists per pair.
#[derive(Debug, Clone, Default)]
pub struct ReservationStore {
    slots: SlotMap<ReservationId, Reservation>,

    /// Index lookup InternalKey (ReservationId) using the reservation name.
    name_index: HashMap<ReservationName, ReservationId>,

    /// The live reservation of each (activity, requirement).
    activity_index: HashMap<(ActivityId, usize), ReservationId>,
}

impl ReservationStore {
    pub fn new() -> Self {
        ReservationStore::default()
    }

    /// Adds a reservation.
    ///
    /// # Returns
    /// The key of the new reservation and the reservation it replaced, if the same
    /// (activity, requirement) already had one. The caller releases the replaced one's
    /// span-tree entry and attention.
    pub fn add(&mut self, reservation: Reservation) -> (ReservationId, Option<Reservation>) {
        let activity_key = (reservation.activity, reservation.requirement);
        let replaced = self.activity_index.get(&activity_key).copied().and_then(|old| self.remove(old));

        let name = reservation.get_name();
        let key = self.slots.insert(reservation);
        self.name_index.insert(name, key);
        self.activity_index.insert(activity_key, key);

        (key, replaced)
    }

    pub fn get(&self, key: ReservationId) -> Option<&Reservation> {
        self.slots.get(key)
    }

    pub fn get_by_name(&self, name: &ReservationName) -> Option<&Reservation> {
        let key = self.name_index.get(name)?;
        self.slots.get(*key)
    }

    pub fn key_for(&self, activity: ActivityId, requirement: usize) -> Option<ReservationId> {
        self.activity_index.get(&(activity, requirement)).copied()
    }

    /// All live reservations of `activity`, in requirement order.
    pub fn keys_for_activity(&self, activity: ActivityId) -> Vec<ReservationId> {
        let mut keys: Vec<(usize, ReservationId)> =
            self.activity_index.iter().filter(|((a, _), _)| *a == activity).map(|((_, requirement), key)| (*requirement, *key)).collect();
        keys.sort();
        keys.into_iter().map(|(_, key)| key).collect()
    }

    pub fn remove(&mut self, key: ReservationId) -> Option<Reservation> {
        let reservation = self.slots.remove(key)?;
        self.name_index.remove(&reservation.name);
        if self.activity_index.get(&(reservation.activity, reservation.requirement)) == Some(&key) {
            self.activity_index.remove(&(reservation.activity, reservation.requirement));
        }
        Some(reservation)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReservationId, &Reservation)> {
        self.slots.iter()
    }
}

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::scheduling_model::engine::capacity_engine::CapacityEngine;

/// Shared handle to one scenario's engine.
///
/// Mutations go through `write()`, feasibility queries through `read()`. A what-if run
/// works on a wholesale clone so the live state is never touched.
#[derive(Debug, Clone)]
pub struct Scenario {
    engine: Arc<RwLock<CapacityEngine>>,
}

impl Scenario {
    pub fn new(engine: CapacityEngine) -> Self {
        Scenario { engine: Arc::new(RwLock::new(engine)) }
    }

    /// Shared access. A writer that panicked leaves the engine readable; its mutation
    /// either completed or was rolled back before the panic could happen.
    pub fn read(&self) -> RwLockReadGuard<'_, CapacityEngine> {
        self.engine.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, CapacityEngine> {
        self.engine.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against a clone of the current engine and returns its result.
    ///
    /// The clone is dropped afterwards; only the simulation clock is shared with the live state.
    pub fn what_if<R>(&self, f: impl FnOnce(&mut CapacityEngine) -> R) -> R {
        let mut speculative = self.read().clone();
        log::debug!("Running what-if simulation on a cloned engine.");
        f(&mut speculative)
    }
}

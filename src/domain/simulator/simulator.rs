use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::error::{EngineError, EngineResult};

/// Source of the current simulation time.
///
/// The engine reads the clock to prune attention history and to stamp reservations;
/// it never advances it.
pub trait SystemSimulator: std::fmt::Debug + Send + Sync {
    fn get_current_ticks(&self) -> Ticks;
    fn clone_box(&self) -> SharedSimulator;
}

#[derive(Debug)]
pub struct SharedSimulator(pub Arc<dyn SystemSimulator>);

impl Clone for SharedSimulator {
    fn clone(&self) -> Self {
        self.0.clone_box()
    }
}

impl std::ops::Deref for SharedSimulator {
    type Target = dyn SystemSimulator;
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl From<SharedSimulator> for Arc<dyn SystemSimulator> {
    fn from(wrapper: SharedSimulator) -> Self {
        wrapper.0
    }
}

/// Monotonic simulation clock shared by every clone.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    ticks: Arc<AtomicI64>,
}

impl SimulationClock {
    pub fn new(start: Ticks) -> SimulationClock {
        SimulationClock { ticks: Arc::new(AtomicI64::new(start)) }
    }

    /// Moves the clock to `ticks`. Moving backwards is rejected.
    pub fn advance_to(&self, ticks: Ticks) -> EngineResult<()> {
        let current = self.ticks.load(Ordering::Acquire);
        if ticks < current {
            log::error!("Simulation clock cannot move backwards from {} to {}.", current, ticks);
            return Err(EngineError::ClockMovedBackwards { current, requested: ticks });
        }

        self.ticks
            .compare_exchange(current, ticks, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|now| EngineError::ClockMovedBackwards { current: now, requested: ticks })
    }

    pub fn shared(&self) -> SharedSimulator {
        SharedSimulator(Arc::new(self.clone()))
    }
}

impl SystemSimulator for SimulationClock {
    fn get_current_ticks(&self) -> Ticks {
        self.ticks.load(Ordering::Acquire)
    }

    fn clone_box(&self) -> SharedSimulator {
        SharedSimulator(Arc::new(self.clone()))
    }
}

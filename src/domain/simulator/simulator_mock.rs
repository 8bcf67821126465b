use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::scheduling_model::span::time_span::Ticks;
use crate::domain::simulator::simulator::{SharedSimulator, SystemSimulator};

/// Test clock that can be set freely, including backwards.
#[derive(Debug, Clone)]
pub struct MockSimulator {
    pub time: Arc<AtomicI64>,
}

impl MockSimulator {
    pub fn new(time: Ticks) -> MockSimulator {
        MockSimulator { time: Arc::new(AtomicI64::new(time)) }
    }

    pub fn set(&self, time: Ticks) {
        self.time.store(time, Ordering::Release);
    }

    pub fn shared(&self) -> SharedSimulator {
        SharedSimulator(Arc::new(self.clone()))
    }
}

impl SystemSimulator for MockSimulator {
    fn get_current_ticks(&self) -> Ticks {
        self.time.load(Ordering::Acquire)
    }

    fn clone_box(&self) -> SharedSimulator {
        SharedSimulator(Arc::new(self.clone()))
    }
}

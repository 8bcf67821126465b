pub mod capacity_engine;
pub mod continuity;
pub mod outcome;
pub mod placement;
pub mod scheduling;

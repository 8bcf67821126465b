pub mod scheduling_model;
pub mod simulator;

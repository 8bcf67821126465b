pub mod activity;
pub mod batch;
pub mod capacity;
pub mod engine;
pub mod reservation;
pub mod resource;
pub mod scenario;
pub mod span;
pub mod utils;

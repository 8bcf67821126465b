pub mod activity;
pub mod successor;

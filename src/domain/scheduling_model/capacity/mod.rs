pub mod attention_ledger;
pub mod capacity_calculator;
pub mod capacity_interval;
pub mod capacity_interval_sequence;

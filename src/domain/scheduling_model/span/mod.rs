pub mod phase;
pub mod resource_span;
pub mod span_tree;
pub mod time_span;

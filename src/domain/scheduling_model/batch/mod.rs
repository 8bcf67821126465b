pub mod batch;
pub mod block;

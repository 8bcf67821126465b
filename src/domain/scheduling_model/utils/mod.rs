pub mod fixed_point;
pub mod handles;
pub mod id;

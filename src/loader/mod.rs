pub mod link_resolution;
pub mod parser;
pub mod scenario_loader;

use crate::api::scenario_dto::ScenarioDto;
use crate::domain::scheduling_model::scenario::Scenario;
use crate::domain::simulator::simulator::SimulationClock;
use crate::error::Result;
use crate::loader::parser::parse_json_file;
use crate::loader::scenario_loader::build_engine;

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Loads a scenario file into a lockable `Scenario`.
///
/// # Returns
/// The scenario and the simulation clock it reads, started at the file's `clock`.
pub fn generate_scenario(file_path: &str) -> Result<(Scenario, SimulationClock)> {
    let dto: ScenarioDto = parse_json_file(file_path)?;
    log::info!("Scenario file '{}' parsed: {} resources, {} activities.", file_path, dto.resources.len(), dto.activities.len());

    let clock = SimulationClock::new(dto.clock);
    let engine = build_engine(dto, clock.shared())?;
    Ok((Scenario::new(engine), clock))
}

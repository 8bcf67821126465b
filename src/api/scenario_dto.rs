use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::scheduling_model::activity::activity::ResourceRequirement;
use crate::domain::scheduling_model::batch::batch::BatchType;
use crate::domain::scheduling_model::capacity::capacity_calculator::CapacityCalculator;
use crate::domain::scheduling_model::capacity::capacity_interval::PhaseUsability;
use crate::domain::scheduling_model::resource::resource::CapacityType;
use crate::domain::scheduling_model::utils::fixed_point::Quantity;

/// Root of a scenario file.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    #[serde(default)]
    pub config: EngineConfig,

    /// Simulation clock at load time.
    #[serde(default)]
    pub clock: i64,

    pub resources: Vec<ResourceDto>,

    #[serde(default)]
    pub activities: Vec<ActivityDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
    pub name: String,

    #[serde(default)]
    pub capacity_type: CapacityType,

    #[serde(default)]
    pub tracks_continuity: bool,

    pub intervals: Vec<CapacityIntervalDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CapacityIntervalDto {
    pub start: i64,
    pub end: i64,

    #[serde(default = "default_online")]
    pub online: bool,

    /// Defaults to every phase while online and none while offline.
    #[serde(default)]
    pub usability: Option<PhaseUsability>,
}

fn default_online() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    pub name: String,

    #[serde(default = "default_quantity")]
    pub quantity: Quantity,

    #[serde(default)]
    pub batch_type: BatchType,

    pub calculator: CapacityCalculator,

    /// Primary first; an empty list means one primary requirement using every phase at 100%.
    #[serde(default)]
    pub requirements: Vec<ResourceRequirement>,

    #[serde(default)]
    pub anchor: Option<i64>,

    #[serde(default)]
    pub successors: Vec<SuccessorDto>,
}

fn default_quantity() -> Quantity {
    Quantity::from_units(1)
}

/// Link to a successor activity, by name.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SuccessorDto {
    pub activity: String,

    #[serde(default)]
    pub max_delay: Option<i64>,
}

use bimap::BiMap;

use crate::api::scenario_dto::{ActivityDto, CapacityIntervalDto, ResourceDto, ScenarioDto};
use crate::domain::scheduling_model::activity::activity::Activity;
use crate::domain::scheduling_model::capacity::capacity_interval::{CapacityInterval, PhaseUsability};
use crate::domain::scheduling_model::engine::capacity_engine::CapacityEngine;
use crate::domain::scheduling_model::resource::resource::Resource;
use crate::domain::scheduling_model::span::time_span::TimeSpan;
use crate::domain::scheduling_model::utils::handles::ActivityId;
use crate::domain::scheduling_model::utils::id::{ActivityName, ResourceName};
use crate::domain::simulator::simulator::SharedSimulator;
use crate::error::{Error, Result};
use crate::loader::link_resolution::resolve_links;

/// Builds an engine from a parsed scenario.
///
/// Resources and activities are inserted first; successor links are resolved in one
/// pass afterwards.
pub fn build_engine(dto: ScenarioDto, simulator: SharedSimulator) -> Result<CapacityEngine> {
    let mut engine = CapacityEngine::new(dto.config.clone(), simulator);

    for resource_dto in &dto.resources {
        let resource = resource_from_dto(resource_dto)?;
        engine.add_resource(resource)?;
    }

    let mut names: BiMap<ActivityName, ActivityId> = BiMap::new();
    for activity_dto in &dto.activities {
        let activity = activity_from_dto(activity_dto);
        let name = activity.name.clone();
        let id = engine.add_activity(activity)?;
        names.insert(name, id);
    }

    let successors = resolve_links(&dto.activities, &names)?;
    engine.set_successor_index(successors);

    log::info!("Capacity engine constructed with {} resources and {} activities.", dto.resources.len(), names.len());
    Ok(engine)
}

fn resource_from_dto(dto: &ResourceDto) -> Result<Resource> {
    if dto.intervals.is_empty() {
        return Err(Error::ModelConstructionError(format!("Resource {} has no capacity intervals", dto.name)));
    }

    let intervals = dto.intervals.iter().map(interval_from_dto).collect::<Result<Vec<_>>>()?;
    let resource = Resource::new(ResourceName::new(dto.name.clone()), dto.capacity_type, dto.tracks_continuity, intervals)?;
    Ok(resource)
}

fn interval_from_dto(dto: &CapacityIntervalDto) -> Result<CapacityInterval> {
    let span = TimeSpan::new(dto.start, dto.end)?;
    let interval = if dto.online { CapacityInterval::online(span) } else { CapacityInterval::offline(span) };

    Ok(match dto.usability {
        Some(usability) => interval.with_usability(usability),
        None if dto.online => interval.with_usability(PhaseUsability::all()),
        None => interval,
    })
}

fn activity_from_dto(dto: &ActivityDto) -> Activity {
    let mut activity = Activity::new(ActivityName::new(dto.name.clone()), dto.quantity, dto.calculator.clone()).with_batch_type(dto.batch_type);

    let mut requirements = dto.requirements.iter();
    if let Some(primary) = requirements.next() {
        activity = activity.with_primary(*primary);
    }
    for helper in requirements {
        activity = activity.with_requirement(*helper);
    }

    if let Some(anchor) = dto.anchor {
        activity = activity.with_anchor(anchor);
    }
    activity
}

#![allow(dead_code)]

use capacity_scheduler::config::EngineConfig;
use capacity_scheduler::domain::scheduling_model::activity::activity::{Activity, ResourceRequirement};
use capacity_scheduler::domain::scheduling_model::capacity::capacity_calculator::CapacityCalculator;
use capacity_scheduler::domain::scheduling_model::capacity::capacity_interval::CapacityInterval;
use capacity_scheduler::domain::scheduling_model::engine::capacity_engine::CapacityEngine;
use capacity_scheduler::domain::scheduling_model::resource::resource::{CapacityType, Resource};
use capacity_scheduler::domain::scheduling_model::span::phase::{RequiredCapacity, UsageProfile};
use capacity_scheduler::domain::scheduling_model::span::time_span::{Ticks, TimeSpan};
use capacity_scheduler::domain::scheduling_model::utils::fixed_point::{Percent, Quantity};
use capacity_scheduler::domain::scheduling_model::utils::handles::{ActivityId, ResourceId};
use capacity_scheduler::domain::scheduling_model::utils::id::{ActivityName, ResourceName};
use capacity_scheduler::domain::simulator::simulator_mock::MockSimulator;

pub fn span(start: Ticks, end: Ticks) -> TimeSpan {
    TimeSpan::new(start, end).unwrap()
}

pub fn engine() -> (CapacityEngine, MockSimulator) {
    let clock = MockSimulator::new(0);
    (CapacityEngine::new(EngineConfig::default(), clock.shared()), clock)
}

pub fn resource(engine: &mut CapacityEngine, name: &str, capacity_type: CapacityType, tracks_continuity: bool, intervals: Vec<CapacityInterval>) -> ResourceId {
    let resource = Resource::new(ResourceName::new(name), capacity_type, tracks_continuity, intervals).unwrap();
    engine.add_resource(resource).unwrap()
}

/// A resource online over `[0, horizon)`.
pub fn online_resource(engine: &mut CapacityEngine, name: &str, capacity_type: CapacityType, horizon: Ticks) -> ResourceId {
    resource(engine, name, capacity_type, true, vec![CapacityInterval::online(span(0, horizon))])
}

pub fn processing(duration: Ticks) -> CapacityCalculator {
    CapacityCalculator::fixed(RequiredCapacity { processing: duration, ..Default::default() })
}

/// An activity processing for `duration` ticks at `attention` percent on its primary resource.
pub fn activity(engine: &mut CapacityEngine, name: &str, duration: Ticks, attention: u32) -> ActivityId {
    let activity = Activity::new(ActivityName::new(name), Quantity::from_units(1), processing(duration))
        .with_primary(ResourceRequirement::new(UsageProfile::whole(), Percent::from_percent(attention).unwrap()));
    engine.add_activity(activity).unwrap()
}

pub fn add(engine: &mut CapacityEngine, activity: Activity) -> ActivityId {
    engine.add_activity(activity).unwrap()
}

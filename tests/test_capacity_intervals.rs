mod common;

use capacity_scheduler::domain::scheduling_model::activity::activity::Activity;
use capacity_scheduler::domain::scheduling_model::capacity::capacity_calculator::CapacityCalculator;
use capacity_scheduler::domain::scheduling_model::capacity::capacity_interval::{CapacityInterval, PhaseUsability};
use capacity_scheduler::domain::scheduling_model::capacity::capacity_interval_sequence::IntervalIndex;
use capacity_scheduler::domain::scheduling_model::engine::capacity_engine::CapacityEngine;
use capacity_scheduler::domain::scheduling_model::engine::outcome::{Conflicting, PlacementAttempt, ScheduleOutcome, ScheduleResult};
use capacity_scheduler::domain::scheduling_model::resource::resource::CapacityType;
use capacity_scheduler::domain::scheduling_model::span::phase::{Phase, RequiredCapacity};
use capacity_scheduler::domain::scheduling_model::utils::fixed_point::Quantity;
use capacity_scheduler::domain::scheduling_model::utils::handles::{ActivityId, ResourceId};
use capacity_scheduler::domain::scheduling_model::utils::id::ActivityName;

use common::{add, engine, resource, span};

/// Online over [0, 100) and [200, 1000), offline in between.
fn shift_resource(engine: &mut CapacityEngine) -> ResourceId {
    resource(
        engine,
        "shifted",
        CapacityType::SingleTasking,
        true,
        vec![CapacityInterval::online(span(0, 100)), CapacityInterval::offline(span(100, 200)), CapacityInterval::online(span(200, 1000))],
    )
}

fn with_calculator(engine: &mut CapacityEngine, name: &str, calculator: CapacityCalculator) -> ActivityId {
    add(engine, Activity::new(ActivityName::new(name), Quantity::from_units(1), calculator))
}

fn failure(attempt: PlacementAttempt) -> (ScheduleOutcome, Option<i64>, Option<Conflicting>) {
    match attempt {
        PlacementAttempt::Failed(failure) => (failure.outcome, failure.retry_at, failure.conflicting),
        PlacementAttempt::Fits(placement) => panic!("expected a failure, got {:?}", placement),
    }
}

#[test]
fn online_only_work_pauses_over_offline_time() {
    let (mut engine, _clock) = engine();
    let machine = shift_resource(&mut engine);
    let job = with_calculator(&mut engine, "job", CapacityCalculator::OnlineOnly { capacity: RequiredCapacity { processing: 150, ..Default::default() } });

    match engine.schedule(job, &[machine], 0).unwrap() {
        ScheduleResult::Scheduled { blocks, .. } => {
            let block = engine.block(blocks[0]).unwrap();
            assert_eq!(block.span(), span(0, 250));
            assert_eq!(block.phases.get(Phase::Processing), span(0, 250));
        }
        other => panic!("expected a placement, got {:?}", other),
    }
}

#[test]
fn wall_clock_work_cannot_straddle_offline_time() {
    let (mut engine, _clock) = engine();
    let machine = shift_resource(&mut engine);
    let job = with_calculator(&mut engine, "job", common::processing(150));

    let (outcome, retry_at, conflicting) = failure(engine.find_placement(job, &[machine], 0).unwrap());
    assert_eq!(outcome, ScheduleOutcome::PhaseNotHostable);
    assert_eq!(retry_at, Some(200));
    assert_eq!(conflicting, Some(Conflicting::Interval(IntervalIndex(1))));

    assert_eq!(engine.find_placement(job, &[machine], 200).unwrap().outcome(), ScheduleOutcome::Success);
}

#[test]
fn starting_inside_offline_time_lacks_capacity() {
    let (mut engine, _clock) = engine();
    let machine = shift_resource(&mut engine);
    let job = with_calculator(&mut engine, "job", common::processing(50));

    let (outcome, retry_at, conflicting) = failure(engine.find_placement(job, &[machine], 120).unwrap());
    assert_eq!(outcome, ScheduleOutcome::LackCapacity);
    assert_eq!(retry_at, Some(200));
    assert_eq!(conflicting, Some(Conflicting::Interval(IntervalIndex(1))));
}

#[test]
fn phase_lands_only_on_intervals_hosting_it() {
    let (mut engine, _clock) = engine();
    let no_cleaning = PhaseUsability::all().with(Phase::Clean, false);
    let machine = resource(
        &mut engine,
        "machine",
        CapacityType::SingleTasking,
        true,
        vec![CapacityInterval::online(span(0, 100)).with_usability(no_cleaning), CapacityInterval::online(span(100, 1000))],
    );
    let job = with_calculator(&mut engine, "job", CapacityCalculator::fixed(RequiredCapacity { processing: 50, clean: 50, ..Default::default() }));

    let (outcome, retry_at, _) = failure(engine.find_placement(job, &[machine], 0).unwrap());
    assert_eq!(outcome, ScheduleOutcome::PhaseNotHostable);
    assert_eq!(retry_at, Some(50));
    assert_eq!(engine.find_placement(job, &[machine], 50).unwrap().outcome(), ScheduleOutcome::Success);
}

#[test]
fn same_family_neighbor_shortens_setup() {
    let (mut engine, _clock) = engine();
    let machine = common::online_resource(&mut engine, "machine", CapacityType::SingleTasking, 1000);
    let red = |family: &str| CapacityCalculator::FamilySetup {
        capacity: RequiredCapacity { setup: 50, processing: 100, ..Default::default() },
        family: family.to_string(),
        reduced_setup: 10,
    };
    let first = with_calculator(&mut engine, "first", red("red"));
    let second = with_calculator(&mut engine, "second", red("red"));
    let other = with_calculator(&mut engine, "other", red("blue"));

    assert!(engine.schedule(first, &[machine], 0).unwrap().is_scheduled());

    match engine.find_placement(second, &[machine], 150).unwrap() {
        PlacementAttempt::Fits(placement) => {
            assert_eq!(placement.context.left_neighbor, Some(first));
            assert_eq!(placement.phases.span(), span(150, 260));
        }
        other => panic!("expected a placement, got {:?}", other),
    }
    match engine.find_placement(other, &[machine], 150).unwrap() {
        PlacementAttempt::Fits(placement) => assert_eq!(placement.phases.span(), span(150, 300)),
        other => panic!("expected a placement, got {:?}", other),
    }
}

#[test]
fn placement_after_the_horizon_is_flagged() {
    let (mut engine, _clock) = engine();
    let machine = common::online_resource(&mut engine, "machine", CapacityType::SingleTasking, 1000);
    let job = with_calculator(&mut engine, "job", common::processing(50));

    match engine.find_placement(job, &[machine], 1500).unwrap() {
        PlacementAttempt::Fits(placement) => assert!(placement.past_planning_horizon),
        other => panic!("expected a deferred placement, got {:?}", other),
    }
    match engine.find_placement(job, &[machine], 500).unwrap() {
        PlacementAttempt::Fits(placement) => assert!(!placement.past_planning_horizon),
        other => panic!("expected a placement, got {:?}", other),
    }
}

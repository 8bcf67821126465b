mod common;

use capacity_scheduler::domain::scheduling_model::activity::activity::Activity;
use capacity_scheduler::domain::scheduling_model::batch::batch::BatchType;
use capacity_scheduler::domain::scheduling_model::engine::capacity_engine::CapacityEngine;
use capacity_scheduler::domain::scheduling_model::engine::outcome::{CleanoutMerge, Conflicting, ScheduleResult};
use capacity_scheduler::domain::scheduling_model::resource::resource::CapacityType;
use capacity_scheduler::domain::scheduling_model::span::resource_span::SpanReason;
use capacity_scheduler::domain::scheduling_model::utils::fixed_point::Quantity;
use capacity_scheduler::domain::scheduling_model::utils::handles::{ActivityId, BatchId, BlockId};
use capacity_scheduler::domain::scheduling_model::utils::id::ActivityName;
use capacity_scheduler::error::EngineError;

use common::{activity, add, engine, online_resource, processing, span};

fn volume_activity(engine: &mut CapacityEngine, name: &str, units: i64) -> ActivityId {
    let activity = Activity::new(ActivityName::new(name), Quantity::from_units(units), processing(100))
        .with_batch_type(BatchType::Volume { capacity: Quantity::from_units(10) });
    add(engine, activity)
}

fn scheduled(result: ScheduleResult) -> (BatchId, Vec<BlockId>) {
    match result {
        ScheduleResult::Scheduled { batch, blocks, .. } => (batch, blocks),
        ScheduleResult::Failed(failure) => panic!("expected a placement, got {:?}", failure),
    }
}

#[test]
fn members_share_blocks_until_volume_is_used_up() {
    let (mut engine, _clock) = engine();
    let tank = online_resource(&mut engine, "tank", CapacityType::SingleTasking, 1000);
    let a = volume_activity(&mut engine, "A", 3);
    let b = volume_activity(&mut engine, "B", 4);
    let c = volume_activity(&mut engine, "C", 5);

    let (batch, blocks) = scheduled(engine.schedule(a, &[tank], 0).unwrap());
    engine.join_batch(b, batch).unwrap();

    let state = engine.batch(batch).unwrap();
    assert_eq!(state.members().len(), 2);
    assert_eq!(state.remaining_capacity(), Quantity::from_units(3));
    assert_eq!(state.blocks(), &[Some(blocks[0])]);
    assert_eq!(engine.activity(b).unwrap().batch, Some(batch));
    assert_eq!(engine.resource(tank).unwrap().span_tree().len(), 1);

    let err = engine.join_batch(c, batch).unwrap_err();
    assert!(matches!(err, EngineError::NegativeRemainingCapacity { .. }));
    assert_eq!(engine.batch(batch).unwrap().remaining_capacity(), Quantity::from_units(3));
    assert_eq!(engine.activity(c).unwrap().batch, None);

    assert_eq!(engine.join_batch(b, batch).unwrap_err(), EngineError::AlreadyScheduled(b));
}

#[test]
fn non_batching_batches_refuse_a_second_member() {
    let (mut engine, _clock) = engine();
    let press = online_resource(&mut engine, "press", CapacityType::SingleTasking, 1000);
    let a = activity(&mut engine, "A", 100, 100);
    let b = activity(&mut engine, "B", 100, 100);

    let (batch, _) = scheduled(engine.schedule(a, &[press], 0).unwrap());
    assert_eq!(engine.join_batch(b, batch).unwrap_err(), EngineError::BatchFull(batch));
}

#[test]
fn blocks_stay_until_last_scheduled_member_leaves() {
    let (mut engine, _clock) = engine();
    let tank = online_resource(&mut engine, "tank", CapacityType::SingleTasking, 1000);
    let a = volume_activity(&mut engine, "A", 3);
    let b = volume_activity(&mut engine, "B", 4);

    let (batch, _) = scheduled(engine.schedule(a, &[tank], 0).unwrap());
    engine.join_batch(b, batch).unwrap();

    let partial = engine.unschedule(a, false).unwrap();
    assert!(partial.released.is_empty());
    assert!(!partial.batch_discarded);
    assert_eq!(engine.resource(tank).unwrap().span_tree().len(), 1);
    assert_eq!(engine.unschedule(a, false).unwrap_err(), EngineError::DoubleUnschedule { batch, activity: a });

    let last = engine.unschedule(b, true).unwrap();
    assert_eq!(last.released.len(), 1);
    assert!(!last.batch_discarded, "the partially unscheduled member keeps the batch alive");
    assert!(engine.resource(tank).unwrap().span_tree().is_empty());
    assert_eq!(engine.activity(b).unwrap().batch, None);

    // Rescheduling the leftover member moves it out of its old, now empty batch.
    let (fresh, _) = scheduled(engine.schedule(a, &[tank], 200).unwrap());
    assert_ne!(fresh, batch);
    assert!(engine.batch(batch).is_err());
    assert_eq!(engine.activity(a).unwrap().batch, Some(fresh));
}

#[test]
fn partially_unscheduled_member_can_resume_in_its_batch() {
    let (mut engine, _clock) = engine();
    let tank = online_resource(&mut engine, "tank", CapacityType::SingleTasking, 1000);
    let a = volume_activity(&mut engine, "A", 3);
    let b = volume_activity(&mut engine, "B", 4);

    let (batch, _) = scheduled(engine.schedule(a, &[tank], 0).unwrap());
    engine.join_batch(b, batch).unwrap();
    engine.unschedule(b, false).unwrap();

    engine.join_batch(b, batch).unwrap();
    assert!(!engine.batch(batch).unwrap().is_member_unscheduled(b));
    assert_eq!(engine.batch(batch).unwrap().remaining_capacity(), Quantity::from_units(3));
}

#[test]
fn unscheduling_an_unscheduled_activity_fails() {
    let (mut engine, _clock) = engine();
    online_resource(&mut engine, "press", CapacityType::SingleTasking, 1000);
    let a = activity(&mut engine, "A", 100, 100);

    assert_eq!(engine.unschedule(a, true).unwrap_err(), EngineError::NotScheduled(a));
}

#[test]
fn schedule_then_unschedule_restores_the_resource() {
    let (mut engine, _clock) = engine();
    let oven = online_resource(&mut engine, "oven", CapacityType::MultiTasking, 1000);
    let a = activity(&mut engine, "A", 300, 40);
    let before = engine.resource(oven).unwrap().clone();

    let (batch, _) = scheduled(engine.schedule(a, &[oven], 250).unwrap());
    assert_ne!(engine.resource(oven).unwrap(), &before);

    let result = engine.unschedule(a, true).unwrap();
    assert!(result.batch_discarded);
    assert_eq!(engine.resource(oven).unwrap(), &before);
    assert!(engine.batch(batch).is_err());
    assert_eq!(engine.blocks().count(), 0);
}

#[test]
fn cleanout_merge_extends_blocks_once() {
    let (mut engine, _clock) = engine();
    let press = online_resource(&mut engine, "press", CapacityType::SingleTasking, 1000);
    let a = activity(&mut engine, "A", 100, 100);
    let (batch, blocks) = scheduled(engine.schedule(a, &[press], 0).unwrap());

    match engine.merge_cleanout(batch, 40).unwrap() {
        CleanoutMerge::Extended(extensions) => {
            assert_eq!(extensions.len(), 1);
            assert_eq!(extensions[0].old_span, span(0, 100));
            assert_eq!(extensions[0].new_span, span(0, 140));
        }
        other => panic!("expected an extension, got {:?}", other),
    }
    assert_eq!(engine.block(blocks[0]).unwrap().span(), span(0, 140));
    assert_eq!(engine.resource(press).unwrap().span_tree().get(&SpanReason::Block(blocks[0])).unwrap().span, span(0, 140));

    assert_eq!(engine.merge_cleanout(batch, 40).unwrap(), CleanoutMerge::Unchanged);
    assert_eq!(engine.merge_cleanout(batch, 20).unwrap(), CleanoutMerge::Unchanged);
    assert_eq!(engine.block(blocks[0]).unwrap().span(), span(0, 140));
}

#[test]
fn cleanout_merge_blocked_by_neighbor_changes_nothing() {
    let (mut engine, _clock) = engine();
    let press = online_resource(&mut engine, "press", CapacityType::SingleTasking, 1000);
    let a = activity(&mut engine, "A", 100, 100);
    let c = activity(&mut engine, "C", 100, 100);
    let (batch, blocks) = scheduled(engine.schedule(a, &[press], 0).unwrap());
    let (_, neighbor) = scheduled(engine.schedule(c, &[press], 120).unwrap());

    match engine.merge_cleanout(batch, 50).unwrap() {
        CleanoutMerge::Blocked { block, conflicting, retry_at } => {
            assert_eq!(block, blocks[0]);
            assert_eq!(conflicting, Conflicting::Span(SpanReason::Block(neighbor[0])));
            assert_eq!(retry_at, Some(220));
        }
        other => panic!("expected the merge to be blocked, got {:?}", other),
    }
    assert_eq!(engine.block(blocks[0]).unwrap().span(), span(0, 100));
    assert_eq!(engine.batch(batch).unwrap().span(), span(0, 100));

    assert!(matches!(engine.merge_cleanout(batch, 20).unwrap(), CleanoutMerge::Extended(_)));
    assert_eq!(engine.block(blocks[0]).unwrap().span(), span(0, 120));
}

#[test]
fn releasing_a_left_batch_keeps_the_openers_new_attention() {
    use capacity_scheduler::domain::scheduling_model::activity::activity::ResourceRequirement;
    use capacity_scheduler::domain::scheduling_model::engine::outcome::ScheduleOutcome;
    use capacity_scheduler::domain::scheduling_model::span::phase::UsageProfile;
    use capacity_scheduler::domain::scheduling_model::utils::fixed_point::Percent;

    let (mut engine, _clock) = engine();
    let oven = online_resource(&mut engine, "oven", CapacityType::MultiTasking, 1000);
    let sixty = ResourceRequirement::new(UsageProfile::whole(), Percent::from_percent(60).unwrap());
    let opener = add(
        &mut engine,
        Activity::new(ActivityName::new("A"), Quantity::from_units(3), processing(100))
            .with_batch_type(BatchType::Volume { capacity: Quantity::from_units(10) })
            .with_primary(sixty),
    );
    let joiner = add(
        &mut engine,
        Activity::new(ActivityName::new("B"), Quantity::from_units(4), processing(100))
            .with_batch_type(BatchType::Volume { capacity: Quantity::from_units(10) })
            .with_primary(sixty),
    );
    let late = activity(&mut engine, "C", 100, 50);

    let (first, _) = scheduled(engine.schedule(opener, &[oven], 0).unwrap());
    engine.join_batch(joiner, first).unwrap();
    engine.unschedule(opener, true).unwrap();

    let (second, _) = scheduled(engine.schedule(opener, &[oven], 200).unwrap());
    assert_ne!(first, second);

    let left = engine.unschedule(joiner, true).unwrap();
    assert_eq!(left.released.len(), 1);
    assert!(left.batch_discarded);

    let resource = engine.resource(oven).unwrap();
    assert_eq!(resource.attention_used_at(50), 0);
    assert_eq!(resource.attention_used_at(250), 6000);
    assert_eq!(resource.span_tree().len(), 1);
    assert_eq!(engine.find_placement(late, &[oven], 200).unwrap().outcome(), ScheduleOutcome::AttentionNotAvailable);
}

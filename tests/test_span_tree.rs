mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use capacity_scheduler::domain::scheduling_model::engine::outcome::{Conflicting, PlacementAttempt, ScheduleOutcome, ScheduleResult};
use capacity_scheduler::domain::scheduling_model::resource::resource::CapacityType;
use capacity_scheduler::domain::scheduling_model::span::resource_span::SpanReason;
use capacity_scheduler::domain::scheduling_model::utils::handles::ActivityId;

use common::{activity, engine, online_resource};

#[test]
fn overlapping_placement_reports_span_conflict_and_retry() {
    let (mut engine, _clock) = engine();
    let press = online_resource(&mut engine, "press", CapacityType::SingleTasking, 1000);
    let a = activity(&mut engine, "A", 100, 100);
    let b = activity(&mut engine, "B", 50, 100);

    let blocks = match engine.schedule(a, &[press], 100).unwrap() {
        ScheduleResult::Scheduled { blocks, .. } => blocks,
        other => panic!("A should fit, got {:?}", other),
    };

    match engine.find_placement(b, &[press], 180).unwrap() {
        PlacementAttempt::Failed(failure) => {
            assert_eq!(failure.outcome, ScheduleOutcome::SpanConflict);
            assert_eq!(failure.retry_at, Some(200));
            assert_eq!(failure.conflicting, Some(Conflicting::Span(SpanReason::Block(blocks[0]))));
            // The context is recomputed at the retry time, right after A.
            assert_eq!(failure.context.left_neighbor, Some(a));
        }
        other => panic!("B should collide with A, got {:?}", other),
    }

    // Touching spans do not overlap.
    assert_eq!(engine.find_placement(b, &[press], 200).unwrap().outcome(), ScheduleOutcome::Success);
    assert_eq!(engine.find_placement(b, &[press], 50).unwrap().outcome(), ScheduleOutcome::Success);
    assert_eq!(engine.sequencing_context(press, 200).left_neighbor, Some(a));
}

#[test]
fn infinite_resources_never_conflict() {
    let (mut engine, _clock) = engine();
    let yard = online_resource(&mut engine, "yard", CapacityType::Infinite, 1000);
    let a = activity(&mut engine, "A", 100, 100);
    let b = activity(&mut engine, "B", 100, 100);

    assert!(engine.schedule(a, &[yard], 0).unwrap().is_scheduled());
    assert!(engine.schedule(b, &[yard], 0).unwrap().is_scheduled());
    assert_eq!(engine.resource(yard).unwrap().span_tree().len(), 2);
}

#[test]
fn single_tasking_spans_never_overlap_under_random_load() {
    let mut rng = StdRng::seed_from_u64(42);
    let (mut engine, _clock) = engine();
    let press = online_resource(&mut engine, "press", CapacityType::SingleTasking, 5_000);

    let activities: Vec<ActivityId> = (0..30).map(|i| activity(&mut engine, &format!("job-{}", i), rng.random_range(1..400), 100)).collect();
    let mut scheduled: Vec<ActivityId> = Vec::new();

    for _ in 0..300 {
        if !scheduled.is_empty() && rng.random_bool(0.25) {
            let victim = scheduled.swap_remove(rng.random_range(0..scheduled.len()));
            engine.unschedule(victim, true).unwrap();
        } else {
            let candidate = activities[rng.random_range(0..activities.len())];
            if scheduled.contains(&candidate) {
                continue;
            }
            // Follow retry times the way a caller searching for the earliest slot would.
            let mut start = rng.random_range(0..4_000);
            for _ in 0..50 {
                match engine.schedule(candidate, &[press], start).unwrap() {
                    ScheduleResult::Scheduled { .. } => {
                        scheduled.push(candidate);
                        break;
                    }
                    ScheduleResult::Failed(failure) => match failure.retry_at {
                        Some(retry) if retry > start => start = retry,
                        _ => break,
                    },
                }
            }
        }

        let spans: Vec<_> = engine.resource(press).unwrap().span_tree().iter().collect();
        assert_eq!(spans.len(), scheduled.len());
        for pair in spans.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }
}

//! End-to-end rate-monotonic scenario

use cadence_core::Duration;
use cadence_sched::{Scheduler, SchedulerConfig, TaskConfig};
use cadence_sim::jobs::FixedCostJob;
use cadence_sim::SimKernel;
use cadence_trace::TraceRecord;

#[test]
fn two_task_set_runs_without_timing_errors() {
    let sched = Scheduler::new(SchedulerConfig::new());
    let kernel = SimKernel::new();
    kernel.attach(&sched);

    let j1: &'static FixedCostJob = Box::leak(Box::new(FixedCostJob::new(5)));
    let j2: &'static FixedCostJob = Box::leak(Box::new(FixedCostJob::new(8)));

    let t1 = sched
        .register_periodic(
            j1,
            TaskConfig::new("t1", Duration::from_ticks(50)).with_budget(Duration::from_ticks(10)),
        )
        .unwrap();
    let t2 = sched
        .register_periodic(
            j2,
            TaskConfig::new("t2", Duration::from_ticks(100)).with_budget(Duration::from_ticks(20)),
        )
        .unwrap();

    sched.start(&kernel).unwrap();

    // Releases land on multiples of 50 and 100; stopping one tick short of
    // 500 keeps the release at tick 500 from starting an 11th activation.
    kernel.run_ticks(499);

    let s1 = sched.task_stats(t1).unwrap();
    let s2 = sched.task_stats(t2).unwrap();
    assert!(s1.priority > s2.priority);

    assert_eq!(j1.activations(), 10);
    assert_eq!(j2.activations(), 5);

    let mut misses = 0;
    let mut overruns = 0;
    cadence_trace::drain(|record| match record {
        TraceRecord::DeadlineMissed { .. } => misses += 1,
        TraceRecord::BudgetExceeded { .. } => overruns += 1,
        _ => {}
    });
    assert_eq!(misses, 0);
    assert_eq!(overruns, 0);
}

//! Execution-budget overrun detection and suspend/resume recovery

use cadence_core::{Duration, Instant};
use cadence_sched::{MonitorConfig, Scheduler, SchedulerConfig, TaskConfig};
use cadence_sim::jobs::FixedCostJob;
use cadence_sim::SimKernel;
use cadence_trace::TraceRecord;

#[test]
fn overrunning_task_is_suspended_until_next_period() {
    let config = SchedulerConfig::new()
        .with_monitor(MonitorConfig::new().with_period(Duration::from_ticks(5)));
    let sched = Scheduler::new(config);
    let kernel = SimKernel::new();
    kernel.attach(&sched);

    // Ten ticks of work against a three-tick budget.
    let job: &'static FixedCostJob = Box::leak(Box::new(FixedCostJob::new(10)));
    let task = TaskConfig::new("hog", Duration::from_ticks(20))
        .with_budget(Duration::from_ticks(3));
    let handle = sched.register_periodic(job, task).unwrap();
    sched.start(&kernel).unwrap();

    // The budget is exhausted at tick 3 and the monitor suspends the task
    // immediately, before it can consume another tick this period.
    kernel.run_ticks(4);
    let stats = sched.task_stats(handle).unwrap();
    assert!(stats.suspended);
    assert_eq!(stats.exec_time, Duration::ZERO);

    // Resumed at last-wake + period = tick 20, counting from zero again.
    kernel.run_ticks(17);
    let stats = sched.task_stats(handle).unwrap();
    assert!(!stats.suspended);
    assert_eq!(stats.last_wake, Instant::from_ticks(20));
    assert_eq!(stats.exec_time, Duration::from_ticks(1));

    kernel.run_ticks(78);

    let mut exceeded = Vec::new();
    let mut suspended = Vec::new();
    let mut resumed = Vec::new();
    let mut misses = 0;
    cadence_trace::drain(|record| match record {
        TraceRecord::BudgetExceeded { name, at, .. } if name == "hog" => exceeded.push(at),
        TraceRecord::TaskSuspended { name, at, .. } if name == "hog" => suspended.push(at),
        TraceRecord::TaskResumed { name, at, .. } if name == "hog" => resumed.push(at),
        TraceRecord::DeadlineMissed { .. } => misses += 1,
        _ => {}
    });

    let instants = |ticks: &[u32]| -> Vec<Instant> {
        ticks.iter().map(|&t| Instant::from_ticks(t)).collect()
    };

    // Three suspensions finish the first activation (3 + 3 + 3 + 1 ticks
    // of work); the second activation releases at 80 and overruns at 83.
    assert_eq!(exceeded, instants(&[3, 23, 43, 83]));
    assert_eq!(suspended, instants(&[3, 23, 43, 83]));
    assert_eq!(resumed, instants(&[20, 40, 60]));

    // Overrun recovery owns the task: no deadline recovery fires.
    assert_eq!(misses, 0);
}

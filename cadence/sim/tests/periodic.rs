//! Periodic execution properties on the simulation kernel

use cadence_core::{Duration, Instant};
use cadence_sched::{Scheduler, SchedulerConfig, TaskConfig};
use cadence_sim::jobs::FixedCostJob;
use cadence_sim::SimKernel;

#[test]
fn activations_are_drift_free_over_1000_periods() {
    let sched = Scheduler::new(SchedulerConfig::new());
    let kernel = SimKernel::new();
    kernel.attach(&sched);

    let job: &'static FixedCostJob = Box::leak(Box::new(FixedCostJob::new(1)));
    sched
        .register_periodic(job, TaskConfig::new("beat", Duration::from_ticks(5)))
        .unwrap();
    sched.start(&kernel).unwrap();

    kernel.run_ticks(5 * 1001);

    let starts = job.starts();
    assert!(starts.len() > 1000);
    for pair in starts.windows(2) {
        assert_eq!(pair[1].elapsed_since(pair[0]), Duration::from_ticks(5));
    }
}

#[test]
fn phase_delays_the_first_release() {
    let sched = Scheduler::new(SchedulerConfig::new());
    let kernel = SimKernel::new();
    kernel.attach(&sched);

    let job: &'static FixedCostJob = Box::leak(Box::new(FixedCostJob::new(1)));
    let config = TaskConfig::new("offset", Duration::from_ticks(10))
        .with_phase(Duration::from_ticks(7));
    sched.register_periodic(job, config).unwrap();
    sched.start(&kernel).unwrap();

    kernel.run_ticks(40);

    let releases = job.releases();
    assert_eq!(releases.first(), Some(&Instant::from_ticks(7)));
    for pair in releases.windows(2) {
        assert_eq!(pair[1].elapsed_since(pair[0]), Duration::from_ticks(10));
    }
}

//! Registry and admission-queue capacity behavior

use cadence_core::{Duration, JobParam, SchedError};
use cadence_sched::{Scheduler, SchedulerConfig, TaskConfig, MAX_APERIODIC_JOBS,
                    MAX_PERIODIC_TASKS};
use cadence_sim::jobs::RunawayJob;
use cadence_sim::SimKernel;

static JOB: RunawayJob = RunawayJob;

#[test]
fn registration_fails_when_registry_is_full() {
    let sched = Scheduler::new(SchedulerConfig::new());

    for i in 0..MAX_PERIODIC_TASKS {
        let config = TaskConfig::new("filler", Duration::from_ticks(10 + i as u32));
        sched.register_periodic(&JOB, config).unwrap();
    }

    let overflow = sched.register_periodic(&JOB, TaskConfig::new("extra", Duration::from_ticks(5)));
    assert_eq!(overflow.unwrap_err(), SchedError::CapacityExceeded);
    assert_eq!(sched.active_tasks(), MAX_PERIODIC_TASKS);
}

#[test]
fn admission_fails_when_queue_is_full() {
    let sched = Scheduler::new(SchedulerConfig::new());

    for _ in 0..MAX_APERIODIC_JOBS {
        sched.admit(&JOB, "queued", JobParam::NONE).unwrap();
    }

    assert_eq!(
        sched.admit(&JOB, "overflow", JobParam::NONE),
        Err(SchedError::CapacityExceeded)
    );
    assert_eq!(sched.pending_jobs(), MAX_APERIODIC_JOBS);
}

#[test]
fn unregister_frees_the_slot_and_invalidates_the_handle() {
    let sched = Scheduler::new(SchedulerConfig::new());
    let kernel = SimKernel::new();

    let handle = sched
        .register_periodic(&JOB, TaskConfig::new("ephemeral", Duration::from_ticks(10)))
        .unwrap();
    assert_eq!(sched.active_tasks(), 1);

    sched.unregister_periodic(handle, &kernel).unwrap();
    assert_eq!(sched.active_tasks(), 0);

    assert_eq!(
        sched.unregister_periodic(handle, &kernel),
        Err(SchedError::InvalidHandle)
    );
}

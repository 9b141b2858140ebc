//! Two periodic tasks and a polling server under rate-monotonic
//! scheduling on the simulation kernel.
//!
//! Run with `cargo run -p cadence-sim --example rate_monotonic`.

use std::sync::Mutex;

use cadence_core::{Duration, JobParam};
use cadence_sched::{Scheduler, SchedulerConfig, ServerConfig, TaskConfig};
use cadence_sim::jobs::{FixedCostJob, RecordingJob};
use cadence_sim::SimKernel;

static COMPLETED: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn main() {
    let server = ServerConfig::new()
        .with_period(Duration::from_ticks(40))
        .with_budget(Duration::from_ticks(10))
        .with_deadline(Duration::from_ticks(40));
    let sched = Scheduler::new(SchedulerConfig::new().with_server(server));
    let kernel = SimKernel::new();
    kernel.attach(&sched);

    let sensor: &'static FixedCostJob = Box::leak(Box::new(FixedCostJob::new(2)));
    let control: &'static FixedCostJob = Box::leak(Box::new(FixedCostJob::new(5)));

    let sensor_task = sched
        .register_periodic(
            sensor,
            TaskConfig::new("sensor", Duration::from_ticks(20))
                .with_budget(Duration::from_ticks(5)),
        )
        .expect("register sensor");
    let control_task = sched
        .register_periodic(
            control,
            TaskConfig::new("control", Duration::from_ticks(50))
                .with_budget(Duration::from_ticks(10)),
        )
        .expect("register control");

    sched.start(&kernel).expect("start scheduling");

    let burst: &'static RecordingJob = Box::leak(Box::new(RecordingJob::new("burst", 3, &COMPLETED)));
    sched.admit(burst, "burst", JobParam::NONE).expect("admit burst");

    kernel.run_ticks(200);

    for handle in [sensor_task, control_task] {
        let stats = sched.task_stats(handle).expect("task stats");
        println!("{:<8} priority {}", stats.name, stats.priority);
    }
    println!("sensor activations:  {}", sensor.activations());
    println!("control activations: {}", control.activations());
    println!("aperiodic completions: {:?}", COMPLETED.lock().unwrap().as_slice());

    println!("\ntrace:");
    cadence_trace::drain(|record| println!("  {record:?}"));
}

#![forbid(unsafe_code)]

//! # Cadence Sim
//!
//! A deterministic host port of the kernel interface: a single-threaded,
//! tick-stepped, fixed-priority preemptive kernel used by integration
//! tests and examples. Tasks are the framework's wrapper state machines,
//! dispatched highest-priority-first; a task's step either consumes the
//! current tick's slice (`Busy`) or performs a zero-time transition
//! (`DelayUntil`, `AwaitNotify`).
//!
//! Per tick, the simulation advances time, runs the scheduler's accounting
//! hook in the interrupt role, wakes expired sleepers, and dispatches
//! until some task consumes the slice or everything is blocked. Equal
//! priorities dispatch lowest-id first, so runs are fully reproducible.

use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::BTreeMap;

use cadence_core::{Instant, Kernel, KernelTaskId, Priority, RunningTask, SchedError,
                   TaskBinding};
use cadence_sched::{Scheduler, TaskAction};

type StepFn<'s> = Box<dyn FnMut(&SimKernel<'s>) -> TaskAction + 's>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Ready,
    Sleeping(Instant),
    WaitingNotify,
    Suspended,
}

struct SimTask {
    id: u32,
    name: &'static str,
    binding: TaskBinding,
    priority: Priority,
    state: TaskState,
    notify_pending: bool,
}

struct SimState {
    now: Instant,
    /// Owner of the slice that ended at the last tick
    current: Option<u32>,
    started: bool,
    tasks: BTreeMap<u32, SimTask>,
}

/// Deterministic tick-stepped kernel.
///
/// Attach a [`Scheduler`] before calling [`Scheduler::start`], then drive
/// time with [`SimKernel::run_ticks`].
pub struct SimKernel<'s> {
    sched: Cell<Option<&'s Scheduler>>,
    state: RefCell<SimState>,
    steps: RefCell<BTreeMap<u32, StepFn<'s>>>,
    next_id: Cell<u32>,
}

impl<'s> SimKernel<'s> {
    /// Create a kernel at tick zero
    pub fn new() -> Self {
        Self {
            sched: Cell::new(None),
            state: RefCell::new(SimState {
                now: Instant::ZERO,
                current: None,
                started: false,
                tasks: BTreeMap::new(),
            }),
            steps: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Bind the scheduler context this kernel dispatches for
    pub fn attach(&self, sched: &'s Scheduler) {
        self.sched.set(Some(sched));
    }

    fn sched(&self) -> &'s Scheduler {
        self.sched
            .get()
            .expect("attach a scheduler before starting the simulation")
    }

    /// Advance the simulation by `n` ticks
    pub fn run_ticks(&self, n: u32) {
        for _ in 0..n {
            self.tick_once();
        }
    }

    /// Advance one tick: time, interrupt hook, sleeper wakeups, dispatch
    pub fn tick_once(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.now += cadence_core::Duration::TICK;
        }

        // Interrupt phase: accounting hook and monitor wake counter.
        self.sched().on_tick(self);

        self.wake_sleepers();
        self.dispatch();
    }

    fn wake_sleepers(&self) {
        let mut state = self.state.borrow_mut();
        let now = state.now;
        for task in state.tasks.values_mut() {
            if let TaskState::Sleeping(until) = task.state {
                if now.is_at_or_after(until) {
                    task.state = TaskState::Ready;
                }
            }
        }
    }

    /// Run ready tasks highest-priority-first until one consumes the
    /// slice or everything is blocked.
    fn dispatch(&self) {
        loop {
            let pick = {
                let state = self.state.borrow();
                state
                    .tasks
                    .values()
                    .filter(|task| task.state == TaskState::Ready)
                    .max_by_key(|task| (task.priority, Reverse(task.id)))
                    .map(|task| task.id)
            };

            let Some(id) = pick else {
                self.state.borrow_mut().current = None;
                return;
            };

            let Some(mut step) = self.steps.borrow_mut().remove(&id) else {
                // No step function left for this id; drop it.
                self.state.borrow_mut().tasks.remove(&id);
                continue;
            };

            let action = step(self);

            // The step may have deleted its own task.
            let alive = self.state.borrow().tasks.contains_key(&id);
            if alive {
                self.steps.borrow_mut().insert(id, step);
            }

            match action {
                TaskAction::Busy => {
                    log::trace!("task {id} consumed the slice");
                    self.state.borrow_mut().current = Some(id);
                    return;
                }
                TaskAction::DelayUntil(until) => {
                    let mut state = self.state.borrow_mut();
                    let now = state.now;
                    if let Some(task) = state.tasks.get_mut(&id) {
                        if until.is_after(now) {
                            task.state = TaskState::Sleeping(until);
                        }
                        // An overdue target keeps the task ready.
                    }
                }
                TaskAction::AwaitNotify => {
                    let mut state = self.state.borrow_mut();
                    if let Some(task) = state.tasks.get_mut(&id) {
                        if task.notify_pending {
                            task.notify_pending = false;
                        } else {
                            task.state = TaskState::WaitingNotify;
                        }
                    }
                }
            }
        }
    }
}

impl<'s> Default for SimKernel<'s> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> Kernel for SimKernel<'s> {
    fn now(&self) -> Instant {
        self.state.borrow().now
    }

    fn create_task(
        &self,
        binding: TaskBinding,
        name: &'static str,
        _stack_words: usize,
        priority: Priority,
    ) -> Result<KernelTaskId, SchedError> {
        let sched = self.sched();
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let step: StepFn<'s> = match binding {
            TaskBinding::Periodic(slot) => {
                Box::new(move |kernel: &SimKernel<'s>| sched.task_step(slot, kernel))
            }
            TaskBinding::Monitor => {
                Box::new(move |kernel: &SimKernel<'s>| sched.monitor_step(kernel))
            }
        };

        self.state.borrow_mut().tasks.insert(
            id,
            SimTask {
                id,
                name,
                binding,
                priority,
                state: TaskState::Ready,
                notify_pending: false,
            },
        );
        self.steps.borrow_mut().insert(id, step);

        log::debug!("created task {id} ({name}) at {priority}");
        Ok(KernelTaskId::new(id))
    }

    fn delete_task(&self, id: KernelTaskId) {
        let raw = id.raw();
        let mut state = self.state.borrow_mut();
        if state.tasks.remove(&raw).is_some() {
            log::debug!("deleted task {raw}");
        }
        if state.current == Some(raw) {
            state.current = None;
        }
        drop(state);
        self.steps.borrow_mut().remove(&raw);
    }

    fn suspend_task(&self, id: KernelTaskId) {
        let mut state = self.state.borrow_mut();
        if let Some(task) = state.tasks.get_mut(&id.raw()) {
            task.state = TaskState::Suspended;
            log::debug!("suspended task {} ({})", task.id, task.name);
        }
    }

    fn resume_task(&self, id: KernelTaskId) {
        let mut state = self.state.borrow_mut();
        if let Some(task) = state.tasks.get_mut(&id.raw()) {
            if task.state == TaskState::Suspended {
                task.state = TaskState::Ready;
                log::debug!("resumed task {} ({})", task.id, task.name);
            }
        }
    }

    fn notify_from_isr(&self, id: KernelTaskId) {
        let mut state = self.state.borrow_mut();
        if let Some(task) = state.tasks.get_mut(&id.raw()) {
            if task.state == TaskState::WaitingNotify {
                task.state = TaskState::Ready;
                task.notify_pending = false;
            } else {
                task.notify_pending = true;
            }
        }
    }

    fn current_task(&self) -> Option<RunningTask> {
        let state = self.state.borrow();
        let id = state.current?;
        let task = state.tasks.get(&id)?;
        Some(RunningTask {
            id: KernelTaskId::new(task.id),
            binding: task.binding,
        })
    }

    fn start_scheduling(&self) {
        self.state.borrow_mut().started = true;
        // Initial dispatch: releases zero-phase tasks at the start instant.
        self.dispatch();
    }
}

/// Test doubles shared by the integration tests and examples.
pub mod jobs {
    use std::sync::Mutex;

    use cadence_core::{Instant, Job, JobContext, JobStatus};

    /// A job with a fixed per-activation cost in ticks.
    ///
    /// Records the nominal release and the actual first-dispatch instant
    /// of every activation. A cost of zero completes without consuming any
    /// slice.
    pub struct FixedCostJob {
        cost: u32,
        state: Mutex<FixedCostState>,
    }

    #[derive(Default)]
    struct FixedCostState {
        last_activation: u32,
        remaining: u32,
        releases: Vec<Instant>,
        starts: Vec<Instant>,
    }

    impl FixedCostJob {
        pub fn new(cost: u32) -> Self {
            Self {
                cost,
                state: Mutex::new(FixedCostState::default()),
            }
        }

        /// Nominal release instants of all observed activations
        pub fn releases(&self) -> Vec<Instant> {
            self.state.lock().unwrap().releases.clone()
        }

        /// First-dispatch instants of all observed activations
        pub fn starts(&self) -> Vec<Instant> {
            self.state.lock().unwrap().starts.clone()
        }

        /// Number of activations observed
        pub fn activations(&self) -> usize {
            self.state.lock().unwrap().releases.len()
        }
    }

    impl Job for FixedCostJob {
        fn step(&self, cx: &JobContext) -> JobStatus {
            let mut state = self.state.lock().unwrap();

            if state.last_activation != cx.activation() {
                state.last_activation = cx.activation();
                state.remaining = self.cost;
                state.releases.push(cx.released());
                state.starts.push(cx.now());
            }

            if state.remaining == 0 {
                JobStatus::Done
            } else {
                state.remaining -= 1;
                JobStatus::Pending
            }
        }
    }

    /// A job that never completes its activation.
    pub struct RunawayJob;

    impl Job for RunawayJob {
        fn step(&self, _cx: &JobContext) -> JobStatus {
            JobStatus::Pending
        }
    }

    /// An aperiodic job with a fixed cost that records completion order.
    pub struct RecordingJob {
        name: &'static str,
        remaining: Mutex<u32>,
        log: &'static Mutex<Vec<&'static str>>,
    }

    impl RecordingJob {
        pub fn new(name: &'static str, cost: u32, log: &'static Mutex<Vec<&'static str>>) -> Self {
            Self {
                name,
                remaining: Mutex::new(cost),
                log,
            }
        }
    }

    impl Job for RecordingJob {
        fn step(&self, _cx: &JobContext) -> JobStatus {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining == 0 {
                self.log.lock().unwrap().push(self.name);
                return JobStatus::Done;
            }
            *remaining -= 1;
            JobStatus::Pending
        }
    }
}

//! The scheduler context object
//!
//! A [`Scheduler`] owns the task registry, the aperiodic admission queue
//! and the monitor bookkeeping. It is a passive object: kernel ports call
//! into it from task context ([`Scheduler::task_step`],
//! [`Scheduler::monitor_step`]) and from the tick interrupt
//! ([`Scheduler::on_tick`]). All shared state is guarded by short critical
//! sections, so registration, admission and the monitor scan never race.

use core::cell::RefCell;

use critical_section::Mutex;

use cadence_core::{Duration, Instant, Job, JobContext, JobParam, JobStatus, Kernel,
                   KernelTaskId, Priority, SchedError, SchedResult, SlotIndex, TaskBinding};
use cadence_trace::{self as trace, TraceRecord};

use crate::monitor::MonitorConfig;
use crate::registry::{Registry, TaskHandle};
use crate::rms::{assign_priorities, Policy};
use crate::server::{AdmissionQueue, AperiodicJob, ServerConfig};
use crate::task::{JobBinding, RunState, TaskAction, TaskConfig, TaskDescriptor, TaskStats};
use crate::{MAX_APERIODIC_JOBS, MAX_PERIODIC_TASKS};

/// Scheduler-wide configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Priority assignment policy
    pub policy: Policy,
    /// Monitor task parameters
    pub monitor: MonitorConfig,
    /// Polling server parameters; `None` disables aperiodic service
    pub server: Option<ServerConfig>,
}

impl SchedulerConfig {
    /// Rate-monotonic configuration without a polling server
    pub const fn new() -> Self {
        Self {
            policy: Policy::RateMonotonic,
            monitor: MonitorConfig::new(),
            server: None,
        }
    }

    /// Select the priority assignment policy
    pub const fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the monitor parameters
    pub const fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    /// Enable the polling server
    pub const fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct SchedState {
    started: bool,
    start_time: Instant,
    monitor_id: Option<KernelTaskId>,
    monitor_wake_counter: u32,
}

impl SchedState {
    const fn new() -> Self {
        Self {
            started: false,
            start_time: Instant::ZERO,
            monitor_id: None,
            monitor_wake_counter: 0,
        }
    }
}

/// Decision taken by a wrapper step before any job code runs.
enum StepPlan {
    Wait(Instant),
    Run {
        binding: JobBinding,
        param: JobParam,
        released: Instant,
        activation: u32,
    },
}

/// The scheduling extension's context object.
///
/// `const`-constructible so it can live in a `static`; independent
/// instances never share state.
pub struct Scheduler {
    config: SchedulerConfig,
    registry: Mutex<RefCell<Registry<MAX_PERIODIC_TASKS>>>,
    queue: Mutex<RefCell<AdmissionQueue<MAX_APERIODIC_JOBS>>>,
    state: Mutex<RefCell<SchedState>>,
}

impl Scheduler {
    /// Create a scheduler context
    pub const fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(RefCell::new(Registry::new())),
            queue: Mutex::new(RefCell::new(AdmissionQueue::new())),
            state: Mutex::new(RefCell::new(SchedState::new())),
        }
    }

    /// Reset registry, queue and bookkeeping to the pristine state.
    ///
    /// Must be called before reusing a context; does not touch kernel
    /// tasks.
    pub fn init(&self) {
        critical_section::with(|cs| {
            self.registry.borrow_ref_mut(cs).reset();
            self.queue.borrow_ref_mut(cs).clear();
            *self.state.borrow_ref_mut(cs) = SchedState::new();
        });
    }

    /// The configuration this context was built with
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> &Mutex<RefCell<Registry<MAX_PERIODIC_TASKS>>> {
        &self.registry
    }

    pub(crate) fn queue(&self) -> &Mutex<RefCell<AdmissionQueue<MAX_APERIODIC_JOBS>>> {
        &self.queue
    }

    /// Register a periodic task.
    ///
    /// Fails with `CapacityExceeded` when the registry is full. Must be
    /// called before [`Scheduler::start`]; registering afterwards is a
    /// logic defect and panics.
    pub fn register_periodic(
        &self,
        job: &'static dyn Job,
        config: TaskConfig,
    ) -> SchedResult<TaskHandle> {
        assert!(!config.period.is_zero(), "period must be nonzero");
        assert!(
            !config.relative_deadline.is_zero(),
            "relative deadline must be nonzero"
        );
        assert!(
            !config.max_exec_time.is_zero(),
            "execution budget must be nonzero"
        );

        critical_section::with(|cs| {
            assert!(
                !self.state.borrow_ref(cs).started,
                "tasks must be registered before start"
            );
            let slot = self
                .registry
                .borrow_ref_mut(cs)
                .insert(TaskDescriptor::from_config(
                    JobBinding::User(job),
                    &config,
                    false,
                ))?;
            Ok(TaskHandle::new(slot))
        })
    }

    /// Remove a periodic task and delete its kernel task.
    ///
    /// Fails with `InvalidHandle` if the handle does not name an in-use
    /// slot.
    pub fn unregister_periodic<K: Kernel>(
        &self,
        handle: TaskHandle,
        kernel: &K,
    ) -> SchedResult<()> {
        let kernel_id = critical_section::with(|cs| {
            let mut registry = self.registry.borrow_ref_mut(cs);
            let slot = handle.slot();
            let Some(descriptor) = registry.slot_checked_mut(slot) else {
                return Err(SchedError::InvalidHandle);
            };
            if !descriptor.in_use {
                return Err(SchedError::InvalidHandle);
            }
            let id = descriptor.kernel_id;
            registry.remove(slot)?;
            Ok(id)
        })?;

        if let Some(id) = kernel_id {
            kernel.delete_task(id);
        }
        Ok(())
    }

    /// Admit an aperiodic job for the polling server.
    ///
    /// Callable from any task context at any time; fails with
    /// `CapacityExceeded` when the queue is full, leaving it unchanged.
    pub fn admit(
        &self,
        job: &'static dyn Job,
        name: &'static str,
        param: JobParam,
    ) -> SchedResult<()> {
        critical_section::with(|cs| {
            self.queue
                .borrow_ref_mut(cs)
                .admit(AperiodicJob { job, name, param })
        })?;
        trace::record(TraceRecord::JobAdmitted { name });
        Ok(())
    }

    /// Assign priorities, create all kernel tasks and start scheduling.
    ///
    /// Registers the polling server (if configured) as an ordinary
    /// descriptor, runs priority assignment with the top level reserved
    /// for the monitor, creates the monitor first and then every periodic
    /// task, records the scheduling start time and finally hands control
    /// to the kernel. On real targets the kernel call does not return.
    pub fn start<K: Kernel>(&self, kernel: &K) -> SchedResult<()> {
        critical_section::with(|cs| {
            assert!(
                !self.state.borrow_ref(cs).started,
                "scheduler already started"
            );
        });

        if let Some(server) = self.config.server {
            let config = TaskConfig::new(server.name, server.period)
                .with_deadline(server.relative_deadline)
                .with_budget(server.max_exec_time)
                .with_stack_words(server.stack_words);
            critical_section::with(|cs| {
                self.registry
                    .borrow_ref_mut(cs)
                    .insert(TaskDescriptor::from_config(
                        JobBinding::QueueDrain,
                        &config,
                        true,
                    ))
                    .map(|_| ())
            })?;
        }

        critical_section::with(|cs| {
            let mut registry = self.registry.borrow_ref_mut(cs);
            assign_priorities(&mut registry, self.config.policy, self.config.monitor.priority);
        });

        let monitor_id = kernel.create_task(
            TaskBinding::Monitor,
            "monitor",
            self.config.monitor.stack_words,
            self.config.monitor.priority,
        )?;

        let entries: heapless::Vec<(SlotIndex, &'static str, usize, Priority), MAX_PERIODIC_TASKS> =
            critical_section::with(|cs| {
                self.registry
                    .borrow_ref(cs)
                    .iter_in_use()
                    .map(|(slot, d)| (slot, d.name(), d.stack_words, d.priority))
                    .collect()
            });

        for (slot, name, stack_words, priority) in entries {
            let id = kernel.create_task(TaskBinding::Periodic(slot), name, stack_words, priority)?;
            critical_section::with(|cs| {
                self.registry.borrow_ref_mut(cs).slot_mut(slot).kernel_id = Some(id);
            });
            trace::record(TraceRecord::TaskCreated { slot, name });
        }

        let start_time = kernel.now();
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.start_time = start_time;
            state.monitor_id = Some(monitor_id);
            state.started = true;

            let mut registry = self.registry.borrow_ref_mut(cs);
            for (_, descriptor) in registry.iter_in_use_mut() {
                descriptor.pending_release = if descriptor.phase.is_zero() {
                    None
                } else {
                    Some(start_time + descriptor.phase)
                };
                descriptor.absolute_deadline =
                    start_time + descriptor.phase + descriptor.relative_deadline;
            }
        });

        trace::record(TraceRecord::SchedulingStarted { at: start_time });
        kernel.start_scheduling();
        Ok(())
    }

    /// Advance one periodic task's wrapper state machine.
    ///
    /// Invoked by the kernel port whenever the task owns the processor.
    /// Performs release/deadline bookkeeping under a critical section,
    /// runs the bound job outside of it, and reports what the hosting
    /// kernel task should do next.
    pub fn task_step<K: Kernel>(&self, slot: SlotIndex, kernel: &K) -> TaskAction {
        let now = kernel.now();

        let plan = critical_section::with(|cs| {
            let start_time = self.state.borrow_ref(cs).start_time;
            let mut registry = self.registry.borrow_ref_mut(cs);
            let descriptor = registry.slot_mut(slot);
            assert!(descriptor.in_use, "wrapper step on a free slot");

            match descriptor.run_state {
                RunState::AwaitingPhase => {
                    let release = descriptor.pending_release.unwrap_or(start_time);
                    if release.is_after(now) {
                        return StepPlan::Wait(release);
                    }
                    descriptor.pending_release = None;
                    descriptor.last_wake = release;
                    descriptor.executed_once = true;
                    descriptor.begin_cycle();
                    StepPlan::Run {
                        binding: descriptor.job,
                        param: descriptor.param,
                        released: descriptor.last_wake,
                        activation: descriptor.activations,
                    }
                }
                RunState::WaitingForNextPeriod => {
                    // last_wake already points at this period's release.
                    if descriptor.last_wake.is_after(now) {
                        return StepPlan::Wait(descriptor.last_wake);
                    }
                    descriptor.begin_cycle();
                    StepPlan::Run {
                        binding: descriptor.job,
                        param: descriptor.param,
                        released: descriptor.last_wake,
                        activation: descriptor.activations,
                    }
                }
                RunState::Running => StepPlan::Run {
                    binding: descriptor.job,
                    param: descriptor.param,
                    released: descriptor.last_wake,
                    activation: descriptor.activations,
                },
            }
        });

        let (binding, param, released, activation) = match plan {
            StepPlan::Wait(release) => return TaskAction::DelayUntil(release),
            StepPlan::Run {
                binding,
                param,
                released,
                activation,
            } => (binding, param, released, activation),
        };

        let status = match binding {
            JobBinding::User(job) => job.step(&JobContext::new(param, now, released, activation)),
            JobBinding::QueueDrain => self.drain_step(now),
            JobBinding::Unbound => panic!("in-use slot without a job binding"),
        };

        match status {
            JobStatus::Pending => TaskAction::Busy,
            JobStatus::Done => critical_section::with(|cs| {
                let mut registry = self.registry.borrow_ref_mut(cs);
                let descriptor = registry.slot_mut(slot);
                descriptor.work_done = true;
                descriptor.exec_time = Duration::ZERO;
                // Advance on the release timeline, never relative to now,
                // and keep the absolute deadline tracking last wake even
                // while the task waits for its next period.
                descriptor.last_wake += descriptor.period;
                descriptor.absolute_deadline = descriptor.last_wake + descriptor.relative_deadline;
                descriptor.run_state = RunState::WaitingForNextPeriod;
                TaskAction::DelayUntil(descriptor.last_wake)
            }),
        }
    }

    /// Execution accounting hook; call once per kernel tick from the tick
    /// interrupt.
    ///
    /// Never blocks: it only mutates counters and flags inside a critical
    /// section and issues an asynchronous monitor wake. Actual suspension
    /// of an overrunning task is deferred to the monitor's task context.
    pub fn on_tick<K: Kernel>(&self, kernel: &K) {
        let now = kernel.now();
        let mut budget_exceeded: Option<(SlotIndex, &'static str)> = None;

        if let Some(running) = kernel.current_task() {
            if let TaskBinding::Periodic(slot) = running.binding {
                critical_section::with(|cs| {
                    let mut registry = self.registry.borrow_ref_mut(cs);
                    let Some(descriptor) = registry.slot_checked_mut(slot) else {
                        return;
                    };
                    // Stale identity after recreation: skip.
                    if !descriptor.in_use || descriptor.kernel_id != Some(running.id) {
                        return;
                    }

                    descriptor.exec_time += Duration::TICK;
                    if descriptor.exec_time >= descriptor.max_exec_time
                        && !descriptor.overrun
                        && !descriptor.suspended
                    {
                        descriptor.overrun = true;
                        // Suspension request; the monitor acts on it.
                        descriptor.suspended = true;
                        descriptor.absolute_unblock = descriptor.last_wake + descriptor.period;
                        descriptor.exec_time = Duration::ZERO;
                        if descriptor.is_server {
                            // The server's deadline covers one full drain,
                            // so it restarts from the resumption point.
                            descriptor.absolute_deadline =
                                descriptor.absolute_unblock + descriptor.relative_deadline;
                        }
                        budget_exceeded = Some((slot, descriptor.name()));
                    }
                });
            }
        }

        let (mut wake, monitor_id) = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if !state.started {
                return (false, None);
            }
            state.monitor_wake_counter += 1;
            let fire = state.monitor_wake_counter >= self.config.monitor.period.ticks();
            if fire {
                state.monitor_wake_counter = 0;
            }
            (fire, state.monitor_id)
        });

        if let Some((slot, name)) = budget_exceeded {
            trace::record(TraceRecord::BudgetExceeded { slot, name, at: now });
            wake = true;
        }

        if wake {
            if let Some(id) = monitor_id {
                kernel.notify_from_isr(id);
            }
        }
    }

    /// Number of in-use registry slots
    pub fn active_tasks(&self) -> usize {
        critical_section::with(|cs| self.registry.borrow_ref(cs).active_count())
    }

    /// Number of aperiodic jobs waiting in the admission queue
    pub fn pending_jobs(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow_ref(cs).len())
    }

    /// Snapshot of a task's bookkeeping
    pub fn task_stats(&self, handle: TaskHandle) -> Option<TaskStats> {
        critical_section::with(|cs| {
            let registry = self.registry.borrow_ref(cs);
            let descriptor = registry.slot(handle.slot());
            descriptor.in_use.then(|| TaskStats::of(descriptor))
        })
    }
}

//! Periodic task descriptors and the execution wrapper state machine

use cadence_core::{Duration, Instant, Job, JobParam, KernelTaskId, Priority};

/// Default stack request for periodic tasks, in words
pub const DEFAULT_STACK_WORDS: usize = 256;

/// What a periodic task executes each cycle.
#[derive(Clone, Copy)]
pub(crate) enum JobBinding {
    /// Free slot, nothing bound
    Unbound,
    /// User-supplied job body
    User(&'static dyn Job),
    /// The polling server's admission queue drain
    QueueDrain,
}

/// Wrapper state of a periodic task.
///
/// `AwaitingPhase → Running → WaitingForNextPeriod → Running → …`; deadline
/// recovery resets a recreated task to `AwaitingPhase` with a pending
/// release on its original timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    AwaitingPhase,
    Running,
    WaitingForNextPeriod,
}

/// What the hosting kernel task should do after a wrapper step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// The job consumed a tick of processor time and has more work
    Busy,
    /// Suspend until the given absolute instant (drift-free period wait)
    DelayUntil(Instant),
    /// Block until notified; used only by the monitor task
    AwaitNotify,
}

/// Registration parameters for a periodic task.
///
/// All times are kernel ticks. The deadline and execution budget default to
/// the period (implicit-deadline task with an unconstrained budget).
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    /// Task name, used in diagnostics
    pub name: &'static str,
    /// Requested stack size in words
    pub stack_words: usize,
    /// Opaque parameter handed to the job on every step
    pub param: JobParam,
    /// Priority suggestion; honored only under [`crate::Policy::Manual`]
    pub priority_hint: Option<Priority>,
    /// Release offset from scheduling start
    pub phase: Duration,
    /// Activation period
    pub period: Duration,
    /// Relative deadline, measured from each release
    pub relative_deadline: Duration,
    /// Worst-case execution budget per period
    pub max_exec_time: Duration,
}

impl TaskConfig {
    /// Create a configuration with the given name and period
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            stack_words: DEFAULT_STACK_WORDS,
            param: JobParam::NONE,
            priority_hint: None,
            phase: Duration::ZERO,
            period,
            relative_deadline: period,
            max_exec_time: period,
        }
    }

    /// Set the release offset from scheduling start
    pub fn with_phase(mut self, phase: Duration) -> Self {
        self.phase = phase;
        self
    }

    /// Set the relative deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.relative_deadline = deadline;
        self
    }

    /// Set the per-period execution budget
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.max_exec_time = budget;
        self
    }

    /// Set the requested stack size in words
    pub fn with_stack_words(mut self, words: usize) -> Self {
        self.stack_words = words;
        self
    }

    /// Set the opaque job parameter
    pub fn with_param(mut self, param: JobParam) -> Self {
        self.param = param;
        self
    }

    /// Suggest a priority for the manual assignment policy
    pub fn with_priority_hint(mut self, priority: Priority) -> Self {
        self.priority_hint = Some(priority);
        self
    }
}

/// Extended control block for one periodic task.
///
/// One per registry slot; the polling server occupies an ordinary slot with
/// the queue-drain binding.
pub struct TaskDescriptor {
    pub(crate) job: JobBinding,
    pub(crate) name: &'static str,
    pub(crate) stack_words: usize,
    pub(crate) param: JobParam,
    pub(crate) priority: Priority,
    pub(crate) priority_assigned: bool,
    pub(crate) priority_hint: Option<Priority>,
    pub(crate) kernel_id: Option<KernelTaskId>,
    pub(crate) phase: Duration,
    pub(crate) pending_release: Option<Instant>,
    pub(crate) period: Duration,
    pub(crate) relative_deadline: Duration,
    pub(crate) max_exec_time: Duration,
    pub(crate) last_wake: Instant,
    pub(crate) absolute_deadline: Instant,
    pub(crate) absolute_unblock: Instant,
    pub(crate) exec_time: Duration,
    pub(crate) activations: u32,
    pub(crate) run_state: RunState,
    pub(crate) work_done: bool,
    pub(crate) in_use: bool,
    pub(crate) executed_once: bool,
    pub(crate) suspended: bool,
    pub(crate) overrun: bool,
    pub(crate) is_server: bool,
}

impl TaskDescriptor {
    /// Vacant slot value
    pub(crate) const EMPTY: TaskDescriptor = TaskDescriptor {
        job: JobBinding::Unbound,
        name: "",
        stack_words: 0,
        param: JobParam::NONE,
        priority: Priority::MIN,
        priority_assigned: false,
        priority_hint: None,
        kernel_id: None,
        phase: Duration::ZERO,
        pending_release: None,
        period: Duration::ZERO,
        relative_deadline: Duration::ZERO,
        max_exec_time: Duration::ZERO,
        last_wake: Instant::ZERO,
        absolute_deadline: Instant::ZERO,
        absolute_unblock: Instant::ZERO,
        exec_time: Duration::ZERO,
        activations: 0,
        run_state: RunState::AwaitingPhase,
        work_done: true,
        in_use: false,
        executed_once: false,
        suspended: false,
        overrun: false,
        is_server: false,
    };

    /// Build an in-use descriptor from registration parameters
    pub(crate) fn from_config(job: JobBinding, config: &TaskConfig, is_server: bool) -> Self {
        TaskDescriptor {
            job,
            name: config.name,
            stack_words: config.stack_words,
            param: config.param,
            priority_hint: config.priority_hint,
            phase: config.phase,
            period: config.period,
            relative_deadline: config.relative_deadline,
            max_exec_time: config.max_exec_time,
            in_use: true,
            is_server,
            ..Self::EMPTY
        }
    }

    /// Start a new cycle: job not done, deadline derived from the release
    pub(crate) fn begin_cycle(&mut self) {
        self.work_done = false;
        self.absolute_deadline = self.last_wake + self.relative_deadline;
        self.activations = self.activations.wrapping_add(1);
        self.run_state = RunState::Running;
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

/// Point-in-time view of one task's bookkeeping, for diagnostics and tests.
#[derive(Debug, Clone, Copy)]
pub struct TaskStats {
    pub name: &'static str,
    pub priority: Priority,
    pub period: Duration,
    pub relative_deadline: Duration,
    pub max_exec_time: Duration,
    pub exec_time: Duration,
    pub last_wake: Instant,
    pub absolute_deadline: Instant,
    pub work_done: bool,
    pub suspended: bool,
    pub executed_once: bool,
    pub is_server: bool,
}

impl TaskStats {
    pub(crate) fn of(descriptor: &TaskDescriptor) -> Self {
        TaskStats {
            name: descriptor.name,
            priority: descriptor.priority,
            period: descriptor.period,
            relative_deadline: descriptor.relative_deadline,
            max_exec_time: descriptor.max_exec_time,
            exec_time: descriptor.exec_time,
            last_wake: descriptor.last_wake,
            absolute_deadline: descriptor.absolute_deadline,
            work_done: descriptor.work_done,
            suspended: descriptor.suspended,
            executed_once: descriptor.executed_once,
            is_server: descriptor.is_server,
        }
    }
}

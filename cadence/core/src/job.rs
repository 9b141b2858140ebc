//! The job capability interface
//!
//! A [`Job`] is a unit of schedulable work driven step by step by whichever
//! task hosts it. The same interface is implemented by periodic job bodies
//! and by aperiodic jobs stored in the admission queue; the polling server's
//! queue drain presents itself to the wrapper through the same step
//! protocol.

use crate::time::Instant;

/// Opaque parameter handed to a job on every step.
///
/// The framework never interprets the value; it is typically an index or
/// token the job resolves against its own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobParam(pub usize);

impl JobParam {
    /// Parameter for jobs that carry their own state
    pub const NONE: JobParam = JobParam(0);
}

/// Progress reported by a single job step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The step consumed processor time and more work remains
    Pending,
    /// This activation's work is complete; the step consumed no time
    Done,
}

/// Per-step context handed to a job.
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    param: JobParam,
    now: Instant,
    released: Instant,
    activation: u32,
}

impl JobContext {
    /// Build a context for one job step
    pub const fn new(param: JobParam, now: Instant, released: Instant, activation: u32) -> Self {
        Self {
            param,
            now,
            released,
            activation,
        }
    }

    /// The opaque parameter registered with the job
    pub const fn param(&self) -> JobParam {
        self.param
    }

    /// Current kernel time
    pub const fn now(&self) -> Instant {
        self.now
    }

    /// Release instant of the activation this step belongs to
    pub const fn released(&self) -> Instant {
        self.released
    }

    /// Sequence number of this activation, starting at 1.
    ///
    /// Stable across suspend/resume within one period; aperiodic jobs run
    /// as activation 0.
    pub const fn activation(&self) -> u32 {
        self.activation
    }
}

/// A unit of schedulable work.
///
/// `step` is invoked repeatedly while the hosting task owns the processor.
/// Return [`JobStatus::Pending`] after performing a slice of work, or
/// [`JobStatus::Done`] once the activation is complete. Implementations
/// must not block; blocking waits belong to the hosting task's wrapper.
pub trait Job: Sync {
    /// Perform one slice of work
    fn step(&self, cx: &JobContext) -> JobStatus;
}

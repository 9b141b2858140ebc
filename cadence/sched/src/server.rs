//! Aperiodic admission queue and the polling server
//!
//! Sporadic work is admitted into a bounded FIFO and drained by the polling
//! server, an ordinary periodic task with its own period, deadline and
//! execution budget, so a burst of aperiodic work can never starve the
//! periodic task set. A queued job is removed only once it has fully
//! executed; suspending the server mid-drain neither duplicates nor loses
//! jobs.

use cadence_core::{Duration, Instant, Job, JobContext, JobParam, JobStatus, SchedError,
                   SchedResult};
use cadence_trace::{self as trace, TraceRecord};
use heapless::Deque;

use crate::scheduler::Scheduler;
use crate::task::DEFAULT_STACK_WORDS;

/// A queued unit of sporadic work.
#[derive(Clone, Copy)]
pub struct AperiodicJob {
    pub(crate) job: &'static dyn Job,
    pub(crate) name: &'static str,
    pub(crate) param: JobParam,
}

/// Bounded FIFO of admitted aperiodic jobs.
pub struct AdmissionQueue<const N: usize> {
    jobs: Deque<AperiodicJob, N>,
}

impl<const N: usize> AdmissionQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self { jobs: Deque::new() }
    }

    /// Enqueue a job at the tail.
    ///
    /// Fails with `CapacityExceeded` and no mutation when full.
    pub fn admit(&mut self, job: AperiodicJob) -> SchedResult<()> {
        self.jobs
            .push_back(job)
            .map_err(|_| SchedError::CapacityExceeded)
    }

    /// Copy of the head job, if any
    pub fn front(&self) -> Option<AperiodicJob> {
        self.jobs.front().copied()
    }

    /// Remove the head job
    pub fn pop(&mut self) -> Option<AperiodicJob> {
        self.jobs.pop_front()
    }

    /// Number of pending jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Queue capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Discard all pending jobs
    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}

impl<const N: usize> Default for AdmissionQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Polling server timing parameters.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Server task name, used in diagnostics
    pub name: &'static str,
    /// Requested stack size in words
    pub stack_words: usize,
    /// Server period
    pub period: Duration,
    /// Execution budget per period
    pub max_exec_time: Duration,
    /// Relative deadline for one queue drain
    pub relative_deadline: Duration,
}

impl ServerConfig {
    /// Default server timing: period 200, budget 100, deadline 200 ticks
    pub const fn new() -> Self {
        Self {
            name: "server",
            stack_words: DEFAULT_STACK_WORDS,
            period: Duration::from_ticks(200),
            max_exec_time: Duration::from_ticks(100),
            relative_deadline: Duration::from_ticks(200),
        }
    }

    /// Set the server period
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the per-period execution budget
    pub const fn with_budget(mut self, budget: Duration) -> Self {
        self.max_exec_time = budget;
        self
    }

    /// Set the relative deadline
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.relative_deadline = deadline;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// One step of the polling server's queue drain.
    ///
    /// Drives the head job; completed jobs are popped and the drain moves
    /// on within the same step. Reports `Done` once the queue is empty:
    /// one pass per activation, arrivals during the server's sleep wait for
    /// the next period.
    pub(crate) fn drain_step(&self, now: Instant) -> JobStatus {
        loop {
            let head = critical_section::with(|cs| self.queue().borrow_ref(cs).front());
            let Some(entry) = head else {
                return JobStatus::Done;
            };

            let cx = JobContext::new(entry.param, now, now, 0);
            match entry.job.step(&cx) {
                JobStatus::Pending => return JobStatus::Pending,
                JobStatus::Done => {
                    critical_section::with(|cs| self.queue().borrow_ref_mut(cs).pop());
                    trace::record(TraceRecord::JobExecuted {
                        name: entry.name,
                        at: now,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Job for Noop {
        fn step(&self, _cx: &JobContext) -> JobStatus {
            JobStatus::Done
        }
    }

    static NOOP: Noop = Noop;

    fn job(name: &'static str) -> AperiodicJob {
        AperiodicJob {
            job: &NOOP,
            name,
            param: JobParam::NONE,
        }
    }

    #[test]
    fn queue_is_strict_fifo() {
        let mut queue: AdmissionQueue<4> = AdmissionQueue::new();

        queue.admit(job("j1")).unwrap();
        queue.admit(job("j2")).unwrap();
        queue.admit(job("j3")).unwrap();

        assert_eq!(queue.pop().map(|j| j.name), Some("j1"));
        assert_eq!(queue.pop().map(|j| j.name), Some("j2"));
        assert_eq!(queue.pop().map(|j| j.name), Some("j3"));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn admit_rejects_when_full_without_mutation() {
        let mut queue: AdmissionQueue<2> = AdmissionQueue::new();

        queue.admit(job("j1")).unwrap();
        queue.admit(job("j2")).unwrap();

        assert_eq!(queue.admit(job("j3")), Err(SchedError::CapacityExceeded));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front().map(|j| j.name), Some("j1"));
    }
}

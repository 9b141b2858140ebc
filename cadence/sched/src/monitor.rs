//! The scheduler monitor task
//!
//! The highest-priority task in the system. Each wake it scans the whole
//! registry for timing errors and performs the recoveries that must not
//! run in interrupt context: deleting and recreating a task that missed
//! its deadline, suspending a task the accounting hook flagged as over
//! budget, and resuming suspended tasks whose unblock time has passed.
//!
//! Decisions are taken inside a critical section and collected; kernel
//! calls are issued afterwards, outside the critical section. While the
//! monitor runs, no application task can (it outranks them all), so the
//! collected decisions cannot go stale against task progress, only
//! against the interrupt hook, which mutates nothing the recovery actions
//! rely on.

use cadence_core::{Duration, Instant, Kernel, KernelTaskId, Priority, SlotIndex, TaskBinding};
use cadence_trace::{self as trace, TraceRecord};

use crate::scheduler::Scheduler;
use crate::task::{RunState, TaskAction, DEFAULT_STACK_WORDS};
use crate::MAX_PERIODIC_TASKS;

/// Monitor task parameters.
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Monitor priority; every application task must stay below it
    pub priority: Priority,
    /// Ticks between unsolicited monitor wakes
    pub period: Duration,
    /// Requested stack size in words
    pub stack_words: usize,
}

impl MonitorConfig {
    /// Default monitor: top priority, woken every 200 ticks
    pub const fn new() -> Self {
        Self {
            priority: Priority::MAX,
            period: Duration::from_ticks(200),
            stack_words: DEFAULT_STACK_WORDS,
        }
    }

    /// Set the unsolicited wake period
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the monitor priority level
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the requested stack size in words
    pub const fn with_stack_words(mut self, words: usize) -> Self {
        self.stack_words = words;
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A recovery the monitor must perform from task context.
enum Recovery {
    Recreate(SlotIndex),
    Suspend(KernelTaskId),
    Resume(KernelTaskId),
}

impl Scheduler {
    /// One monitor activation: scan the registry, then wait for the next
    /// wake.
    pub fn monitor_step<K: Kernel>(&self, kernel: &K) -> TaskAction {
        self.monitor_pass(kernel);
        TaskAction::AwaitNotify
    }

    /// Scan every in-use slot for deadline misses and overruns and apply
    /// the resulting recoveries.
    pub(crate) fn monitor_pass<K: Kernel>(&self, kernel: &K) {
        let now = kernel.now();
        let mut recoveries: heapless::Vec<Recovery, { 2 * MAX_PERIODIC_TASKS }> =
            heapless::Vec::new();

        critical_section::with(|cs| {
            let mut registry = self.registry().borrow_ref_mut(cs);
            for (slot, descriptor) in registry.iter_in_use_mut() {
                // The polling server's job is one queue drain, not
                // continuous execution, so period-boundary progress checks
                // do not apply to it. A task the monitor itself suspended
                // is owned by overrun recovery until resumed.
                if !descriptor.is_server && !descriptor.suspended {
                    // The wrapper advances last_wake when it goes to
                    // sleep, so a current time past last_wake means the
                    // job has not finished this period.
                    if now.is_after(descriptor.last_wake) {
                        descriptor.work_done = false;
                    }

                    if !descriptor.work_done
                        && descriptor.executed_once
                        && now.is_after(descriptor.absolute_deadline)
                    {
                        trace::record(TraceRecord::DeadlineMissed {
                            slot,
                            name: descriptor.name(),
                            deadline: descriptor.absolute_deadline,
                            at: now,
                        });
                        let _ = recoveries.push(Recovery::Recreate(slot));
                        continue;
                    }
                }

                if descriptor.overrun {
                    descriptor.overrun = false;
                    if let Some(id) = descriptor.kernel_id {
                        trace::record(TraceRecord::TaskSuspended {
                            slot,
                            name: descriptor.name(),
                            at: now,
                        });
                        let _ = recoveries.push(Recovery::Suspend(id));
                    }
                }

                if descriptor.suspended && now.is_at_or_after(descriptor.absolute_unblock) {
                    descriptor.suspended = false;
                    descriptor.last_wake = now;
                    // Keep the invariant: absolute deadline tracks last wake.
                    descriptor.absolute_deadline = now + descriptor.relative_deadline;
                    if let Some(id) = descriptor.kernel_id {
                        trace::record(TraceRecord::TaskResumed {
                            slot,
                            name: descriptor.name(),
                            at: now,
                        });
                        let _ = recoveries.push(Recovery::Resume(id));
                    }
                }
            }
        });

        for recovery in recoveries {
            match recovery {
                Recovery::Recreate(slot) => self.recreate_task(slot, kernel),
                Recovery::Suspend(id) => kernel.suspend_task(id),
                Recovery::Resume(id) => kernel.resume_task(id),
            }
        }
    }

    /// Delete-and-recreate recovery for a missed deadline.
    ///
    /// The recreated task reuses the slot and is released at the previous
    /// last wake plus one period: it stays on its original timeline and
    /// never releases earlier than its natural next release.
    fn recreate_task<K: Kernel>(&self, slot: SlotIndex, kernel: &K) {
        let (old_id, name, stack_words, priority) = critical_section::with(|cs| {
            let registry = self.registry().borrow_ref(cs);
            let descriptor = registry.slot(slot);
            (
                descriptor.kernel_id,
                descriptor.name(),
                descriptor.stack_words,
                descriptor.priority,
            )
        });

        if let Some(id) = old_id {
            kernel.delete_task(id);
        }

        let created = kernel.create_task(TaskBinding::Periodic(slot), name, stack_words, priority);

        let release = critical_section::with(|cs| {
            let mut registry = self.registry().borrow_ref_mut(cs);
            let descriptor = registry.slot_mut(slot);
            if !descriptor.in_use {
                return None;
            }

            descriptor.exec_time = Duration::ZERO;
            match created {
                Ok(id) => descriptor.kernel_id = Some(id),
                Err(_) => {
                    descriptor.kernel_id = None;
                    return None;
                }
            }
            // Cleared so the recreated task cannot miss immediately.
            descriptor.executed_once = false;
            descriptor.suspended = false;
            descriptor.overrun = false;
            descriptor.run_state = RunState::AwaitingPhase;

            let release: Instant = descriptor.last_wake + descriptor.period;
            descriptor.pending_release = Some(release);
            descriptor.absolute_deadline = release + descriptor.relative_deadline;
            Some(release)
        });

        if let Some(release) = release {
            trace::record(TraceRecord::TaskRecreated {
                slot,
                name,
                release,
            });
        }
    }
}

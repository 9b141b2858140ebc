#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # Cadence Trace
//!
//! Bounded diagnostic event tracing for the scheduling framework. Timing
//! faults (deadline misses, budget overruns) are never surfaced to callers
//! as errors; they are recorded here as [`TraceRecord`] events that a
//! diagnostic consumer drains at its own pace.
//!
//! The buffer is a fixed-capacity ring protected by a critical section, so
//! producers, including the tick hook in interrupt context, never block.
//! When the buffer is full the newest record is dropped and counted.

use core::cell::RefCell;

use critical_section::Mutex;

use cadence_core::{Instant, SlotIndex};

/// Capacity of the global trace buffer
pub const TRACE_BUFFER_CAPACITY: usize = 128;

/// A diagnostic event emitted by the scheduling framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRecord {
    /// Scheduling started; all tasks created
    SchedulingStarted { at: Instant },
    /// A kernel task was created for a registry slot
    TaskCreated { slot: SlotIndex, name: &'static str },
    /// A task failed to complete its job before its absolute deadline
    DeadlineMissed {
        slot: SlotIndex,
        name: &'static str,
        deadline: Instant,
        at: Instant,
    },
    /// A missed task was deleted and recreated in its slot
    TaskRecreated {
        slot: SlotIndex,
        name: &'static str,
        release: Instant,
    },
    /// A task consumed its execution budget for the current period
    BudgetExceeded {
        slot: SlotIndex,
        name: &'static str,
        at: Instant,
    },
    /// The monitor suspended an overrunning task
    TaskSuspended {
        slot: SlotIndex,
        name: &'static str,
        at: Instant,
    },
    /// The monitor resumed a suspended task
    TaskResumed {
        slot: SlotIndex,
        name: &'static str,
        at: Instant,
    },
    /// An aperiodic job was admitted to the queue
    JobAdmitted { name: &'static str },
    /// The polling server completed an aperiodic job
    JobExecuted { name: &'static str, at: Instant },
}

#[cfg(feature = "defmt")]
impl defmt::Format for TraceRecord {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TraceRecord::SchedulingStarted { at } => {
                defmt::write!(fmt, "SchedulingStarted@{}", at)
            }
            TraceRecord::TaskCreated { name, .. } => defmt::write!(fmt, "TaskCreated({})", name),
            TraceRecord::DeadlineMissed { name, at, .. } => {
                defmt::write!(fmt, "DeadlineMissed({})@{}", name, at)
            }
            TraceRecord::TaskRecreated { name, release, .. } => {
                defmt::write!(fmt, "TaskRecreated({})->{}", name, release)
            }
            TraceRecord::BudgetExceeded { name, at, .. } => {
                defmt::write!(fmt, "BudgetExceeded({})@{}", name, at)
            }
            TraceRecord::TaskSuspended { name, at, .. } => {
                defmt::write!(fmt, "TaskSuspended({})@{}", name, at)
            }
            TraceRecord::TaskResumed { name, at, .. } => {
                defmt::write!(fmt, "TaskResumed({})@{}", name, at)
            }
            TraceRecord::JobAdmitted { name } => defmt::write!(fmt, "JobAdmitted({})", name),
            TraceRecord::JobExecuted { name, at } => {
                defmt::write!(fmt, "JobExecuted({})@{}", name, at)
            }
        }
    }
}

/// Fixed-capacity trace ring.
pub struct TraceBuffer<const N: usize> {
    records: heapless::Deque<TraceRecord, N>,
    dropped: u32,
}

impl<const N: usize> TraceBuffer<N> {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            records: heapless::Deque::new(),
            dropped: 0,
        }
    }

    /// Append a record; drops it and counts when full
    pub fn push(&mut self, record: TraceRecord) {
        if self.records.push_back(record).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    /// Remove and return the oldest record
    pub fn pop(&mut self) -> Option<TraceRecord> {
        self.records.pop_front()
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped due to overflow
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Discard all records and reset the drop counter
    pub fn clear(&mut self) {
        self.records.clear();
        self.dropped = 0;
    }
}

impl<const N: usize> Default for TraceBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

static TRACE: Mutex<RefCell<TraceBuffer<TRACE_BUFFER_CAPACITY>>> =
    Mutex::new(RefCell::new(TraceBuffer::new()));

/// Record a diagnostic event in the global buffer
pub fn record(record: TraceRecord) {
    critical_section::with(|cs| TRACE.borrow_ref_mut(cs).push(record));
}

/// Drain the global buffer, oldest record first
pub fn drain<F: FnMut(TraceRecord)>(mut f: F) {
    while let Some(rec) = critical_section::with(|cs| TRACE.borrow_ref_mut(cs).pop()) {
        f(rec);
    }
}

/// Number of records waiting in the global buffer
pub fn pending() -> usize {
    critical_section::with(|cs| TRACE.borrow_ref(cs).len())
}

/// Number of records dropped from the global buffer since the last clear
pub fn dropped() -> u32 {
    critical_section::with(|cs| TRACE.borrow_ref(cs).dropped())
}

/// Discard all buffered records
pub fn clear() {
    critical_section::with(|cs| TRACE.borrow_ref_mut(cs).clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_fifo_and_bounded() {
        let mut buf: TraceBuffer<2> = TraceBuffer::new();

        buf.push(TraceRecord::JobAdmitted { name: "a" });
        buf.push(TraceRecord::JobAdmitted { name: "b" });
        buf.push(TraceRecord::JobAdmitted { name: "c" });

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.dropped(), 1);
        assert_eq!(buf.pop(), Some(TraceRecord::JobAdmitted { name: "a" }));
        assert_eq!(buf.pop(), Some(TraceRecord::JobAdmitted { name: "b" }));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn buffer_clear_resets_drop_count() {
        let mut buf: TraceBuffer<1> = TraceBuffer::new();

        buf.push(TraceRecord::JobAdmitted { name: "a" });
        buf.push(TraceRecord::JobAdmitted { name: "b" });
        assert_eq!(buf.dropped(), 1);

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.dropped(), 0);
    }
}

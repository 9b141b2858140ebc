#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # Cadence Sched
//!
//! The framework layer of the cadence fixed-priority scheduling extension:
//! the task registry, rate-/deadline-monotonic priority assignment, the
//! periodic task wrapper, the execution-time accounting hook, the scheduler
//! monitor, and the aperiodic admission queue with its polling server.
//!
//! All runtime state lives in a [`Scheduler`] context object backed by
//! fixed-size arrays; nothing is allocated and nothing survives a restart.
//! Kernel ports drive tasks through [`Scheduler::task_step`] /
//! [`Scheduler::monitor_step`] and feed every tick into
//! [`Scheduler::on_tick`].

pub mod monitor;
pub mod registry;
pub mod rms;
pub mod scheduler;
pub mod server;
pub mod task;

pub use monitor::*;
pub use registry::*;
pub use rms::*;
pub use scheduler::*;
pub use server::*;
pub use task::*;

/// Maximum number of periodic tasks, polling server included
pub const MAX_PERIODIC_TASKS: usize = 8;

/// Maximum number of queued aperiodic jobs
pub const MAX_APERIODIC_JOBS: usize = 8;

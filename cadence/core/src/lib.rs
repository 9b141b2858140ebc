#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # Cadence Core
//!
//! Core types and abstractions for the cadence fixed-priority scheduling
//! framework: tick-based time arithmetic, priority levels, the job
//! capability interface, and the kernel interface boundary that the
//! framework layer is written against.

use core::fmt;

pub mod job;
pub mod kernel;
pub mod priority;
pub mod time;

pub use job::*;
pub use kernel::*;
pub use priority::*;
pub use time::*;

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the framework
pub type SchedResult<T> = Result<T, SchedError>;

/// Error types for scheduling operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Task registry or admission queue is full
    CapacityExceeded,
    /// Operation referenced an unknown or removed task
    InvalidHandle,
    /// The underlying kernel refused an operation
    Kernel,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::CapacityExceeded => write!(f, "registry or queue is full"),
            SchedError::InvalidHandle => write!(f, "unknown or removed task handle"),
            SchedError::Kernel => write!(f, "kernel operation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SchedError {}

#[cfg(feature = "defmt")]
impl defmt::Format for SchedError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            SchedError::CapacityExceeded => defmt::write!(fmt, "CapacityExceeded"),
            SchedError::InvalidHandle => defmt::write!(fmt, "InvalidHandle"),
            SchedError::Kernel => defmt::write!(fmt, "Kernel"),
        }
    }
}

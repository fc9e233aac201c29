// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for defect-correction operations

use core::fmt;

/// Defect-correction errors
///
/// Per-item overflow and duplicate drops are normally absorbed into counters
/// by the caller; `Overflow` is returned only where a single request is
/// rejected outright (e.g. adding to a full manual list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpcError {
    /// Invalid coordinate or out-of-range parameter; no state changed
    Param(&'static str),

    /// Duplicate entry, precondition violation or error bit after a
    /// configuration write; local state unchanged
    Config(&'static str),

    /// A bounded container is at capacity
    Overflow {
        /// Which container
        what: &'static str,
        /// Its capacity
        capacity: usize,
    },

    /// A bounded wait exceeded its budget
    Timeout {
        /// What was being waited for
        stage: &'static str,
        /// Time spent waiting, in microseconds
        waited_us: u64,
    },

    /// A status read reported the error bit
    Hardware {
        /// Which hardware block
        block: &'static str,
        /// Raw status word
        status: u32,
    },

    /// The persistence collaborator failed to store the manual list
    Persistence(&'static str),
}

impl DpcError {
    /// Short category name, stable for logs and counters
    pub const fn kind(&self) -> &'static str {
        match self {
            DpcError::Param(_) => "param",
            DpcError::Config(_) => "config",
            DpcError::Overflow { .. } => "overflow",
            DpcError::Timeout { .. } => "timeout",
            DpcError::Hardware { .. } => "hardware",
            DpcError::Persistence(_) => "persistence",
        }
    }
}

impl fmt::Display for DpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DpcError::Param(msg) => write!(f, "Invalid parameter: {}", msg),
            DpcError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DpcError::Overflow { what, capacity } => {
                write!(f, "Overflow: {} is full (capacity {})", what, capacity)
            }
            DpcError::Timeout { stage, waited_us } => {
                write!(f, "Timeout: {} after {} us", stage, waited_us)
            }
            DpcError::Hardware { block, status } => {
                write!(f, "Hardware error: {} status 0x{:08X}", block, status)
            }
            DpcError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DpcError {}

/// Result type for defect-correction operations
pub type Result<T> = core::result::Result<T, DpcError>;

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Register-level drivers for the two accelerator blocks
//!
//! Drivers issue writes and decode status; they never retry. Retry and abort
//! policy belongs to the orchestrator.

pub mod corrector;
pub mod detector;

pub use corrector::CorrectorDriver;
pub use detector::DetectorDriver;

use core::fmt;

/// Decoded block status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// Not running
    Idle,
    /// Running
    Busy,
    /// Finished (detector) or table accepted (corrector)
    Done,
    /// Error bit set
    Error,
}

impl BlockStatus {
    /// Status name for logs
    pub const fn name(self) -> &'static str {
        match self {
            BlockStatus::Idle => "idle",
            BlockStatus::Busy => "busy",
            BlockStatus::Done => "done",
            BlockStatus::Error => "error",
        }
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime tunables of the pipeline

use irdpc_core::{DpcError, FrameGeometry, MergeOptions, Result};

use crate::channel::ChannelMode;
use crate::registers::RegisterMap;

/// Default detector sensitivity
pub const K_THRESHOLD_DEFAULT: u32 = 100;
/// Lowest accepted detector sensitivity
pub const K_THRESHOLD_MIN: u32 = 10;
/// Highest accepted detector sensitivity
pub const K_THRESHOLD_MAX: u32 = 1000;

/// Operator-visible configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConfig {
    /// Detector sensitivity, `K_THRESHOLD_MIN..=K_THRESHOLD_MAX`
    pub k_threshold: u32,
    /// Run the detector and collect automatic detections each frame
    pub auto_detect_enabled: bool,
    /// Include the manual list in the corrector table
    pub manual_correct_enabled: bool,
    /// Delivery strategy; fixed once the pipeline is built
    pub channel_mode: ChannelMode,
    /// Log every table entry after each merge
    pub debug: bool,
}

impl SystemConfig {
    /// Reject an out-of-range threshold
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.k_threshold)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            k_threshold: K_THRESHOLD_DEFAULT,
            auto_detect_enabled: true,
            manual_correct_enabled: true,
            channel_mode: ChannelMode::Polling,
            debug: false,
        }
    }
}

/// `Param` unless `K_THRESHOLD_MIN <= value <= K_THRESHOLD_MAX`
pub fn validate_threshold(value: u32) -> Result<()> {
    if (K_THRESHOLD_MIN..=K_THRESHOLD_MAX).contains(&value) {
        Ok(())
    } else {
        Err(DpcError::Param("k threshold out of range"))
    }
}

/// Wait budgets and delays, in ticks of `tick_us`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTiming {
    /// One poll/wait tick
    pub tick_us: u32,
    /// Polling drain budget
    pub polling_timeout_ticks: u32,
    /// Interrupt drain budget (wait for frame done)
    pub frame_timeout_ticks: u32,
    /// READY pulse width
    pub ack_pulse_us: u32,
    /// Settle time after resetting both blocks
    pub reset_settle_us: u32,
}

impl PipelineTiming {
    /// Drain budget for `mode`
    pub fn drain_timeout_ticks(&self, mode: ChannelMode) -> u32 {
        match mode {
            ChannelMode::Polling => self.polling_timeout_ticks,
            ChannelMode::Interrupt => self.frame_timeout_ticks,
        }
    }
}

impl Default for PipelineTiming {
    fn default() -> Self {
        Self {
            tick_us: 1_000,
            polling_timeout_ticks: 5_000,
            frame_timeout_ticks: 1_000,
            ack_pulse_us: 1_000,
            reset_settle_us: 10_000,
        }
    }
}

/// Everything needed to build a pipeline besides its collaborators
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineSettings {
    /// Register windows
    pub registers: RegisterMap,
    /// Initial configuration
    pub config: SystemConfig,
    /// Wait budgets
    pub timing: PipelineTiming,
    /// Frame size
    pub geometry: FrameGeometry,
    /// Merge switches
    pub merge: MergeOptions,
}

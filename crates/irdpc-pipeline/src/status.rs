// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Orchestrator state and counters

use core::fmt;

/// Frame-cycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Between cycles
    #[default]
    Idle,
    /// Uploading threshold and manual table
    ConfiguringDetector,
    /// Detector GO issued
    DetectorRunning,
    /// Draining the automatic channel
    AwaitingCompletion,
    /// Merging manual and automatic lists
    Merging,
    /// Uploading the merged table
    ConfiguringCorrector,
    /// Corrector GO issued
    CorrectorRunning,
    /// Last cycle aborted
    Error,
}

impl PipelineState {
    /// State name for logs
    pub const fn name(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::ConfiguringDetector => "configuring-detector",
            PipelineState::DetectorRunning => "detector-running",
            PipelineState::AwaitingCompletion => "awaiting-completion",
            PipelineState::Merging => "merging",
            PipelineState::ConfiguringCorrector => "configuring-corrector",
            PipelineState::CorrectorRunning => "corrector-running",
            PipelineState::Error => "error",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Summary of one successful frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frames processed including this one
    pub frame: u32,
    /// Manual entries in the corrector table
    pub manual_applied: usize,
    /// Automatic dead detections this frame
    pub auto_dead: usize,
    /// Automatic stuck detections this frame
    pub auto_stuck: usize,
    /// Corrector table length
    pub merged_total: usize,
    /// Automatic entries dropped as duplicates
    pub duplicates_dropped: usize,
    /// Entries truncated from the merged table
    pub overflow_dropped: usize,
    /// Ticks spent waiting for detections
    pub elapsed_ticks: u32,
}

/// Snapshot returned by `get_status`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemStatus {
    /// Manual list length
    pub manual_count: usize,
    /// Dead pixels in the last automatic batch
    pub auto_dead_count: usize,
    /// Stuck pixels in the last automatic batch
    pub auto_stuck_count: usize,
    /// Last corrector table length
    pub merged_total: usize,
    /// Successful frame cycles
    pub frames_processed: u32,
    /// Aborted frame cycles
    pub error_count: u32,
    /// Detections lost to channel overflow
    pub lost_detections: u32,
    /// Entries truncated from merged tables
    pub overflow_drops: u32,
    /// Detector STATUS busy bit
    pub detector_running: bool,
    /// Corrector STATUS busy bit
    pub corrector_running: bool,
    /// Current state
    pub state: PipelineState,
    /// Merged table as a percentage of the frame
    pub bad_pixel_ratio: f32,
}

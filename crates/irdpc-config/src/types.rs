// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Every struct maps to one section of `dpc_configuration.toml`. All sections
//! and fields are optional; missing values take the hardware defaults.

use serde::{Deserialize, Serialize};

use irdpc_core::{AUTO_BUFFER_SIZE, FRAME_HEIGHT, FRAME_WIDTH, MAX_ALL, MAX_AUTO, MAX_MANUAL};
use irdpc_pipeline::{IrqLines, RegisterMap, K_THRESHOLD_DEFAULT};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DpcConfig {
    pub frame: FrameConfig,
    pub limits: LimitsConfig,
    pub detector: DetectorConfig,
    pub corrector: CorrectorConfig,
    pub auto_channel: AutoChannelConfig,
    pub interrupts: InterruptsConfig,
    pub timing: TimingConfig,
    pub pipeline: PipelineConfig,
}

/// Sensor frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameConfig {
    pub width: u16,
    pub height: u16,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        }
    }
}

/// List capacities
///
/// The capacities are compiled into the firmware. The file records them so a
/// configuration written for another build is rejected by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_manual: usize,
    pub max_auto: usize,
    pub max_all: usize,
    pub auto_buffer_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_manual: MAX_MANUAL,
            max_auto: MAX_AUTO,
            max_all: MAX_ALL,
            auto_buffer_size: AUTO_BUFFER_SIZE,
        }
    }
}

/// Detector block: base address and register offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub base: u32,
    pub go: u32,
    pub manual_count: u32,
    pub k_threshold: u32,
    pub status: u32,
    pub manual_table: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let regs = RegisterMap::default().detector;
        Self {
            base: regs.base as u32,
            go: regs.go as u32,
            manual_count: regs.manual_count as u32,
            k_threshold: regs.k_threshold as u32,
            status: regs.status as u32,
            manual_table: regs.manual_table as u32,
        }
    }
}

impl DetectorConfig {
    pub(crate) fn offsets(&self) -> [(&'static str, u32); 5] {
        [
            ("detector.go", self.go),
            ("detector.manual_count", self.manual_count),
            ("detector.k_threshold", self.k_threshold),
            ("detector.status", self.status),
            ("detector.manual_table", self.manual_table),
        ]
    }
}

/// Corrector block: base address and register offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrectorConfig {
    pub base: u32,
    pub go: u32,
    pub all_count: u32,
    pub table_ready: u32,
    pub status: u32,
    pub all_table: u32,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        let regs = RegisterMap::default().corrector;
        Self {
            base: regs.base as u32,
            go: regs.go as u32,
            all_count: regs.all_count as u32,
            table_ready: regs.table_ready as u32,
            status: regs.status as u32,
            all_table: regs.all_table as u32,
        }
    }
}

impl CorrectorConfig {
    pub(crate) fn offsets(&self) -> [(&'static str, u32); 5] {
        [
            ("corrector.go", self.go),
            ("corrector.all_count", self.all_count),
            ("corrector.table_ready", self.table_ready),
            ("corrector.status", self.status),
            ("corrector.all_table", self.all_table),
        ]
    }
}

/// Automatic detection result registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AutoChannelConfig {
    pub base: u32,
    pub valid: u32,
    pub data: u32,
    pub ready: u32,
    pub status: u32,
}

impl Default for AutoChannelConfig {
    fn default() -> Self {
        let regs = RegisterMap::default().auto_channel;
        Self {
            base: regs.base as u32,
            valid: regs.valid as u32,
            data: regs.data as u32,
            ready: regs.ready as u32,
            status: regs.status as u32,
        }
    }
}

impl AutoChannelConfig {
    pub(crate) fn offsets(&self) -> [(&'static str, u32); 4] {
        [
            ("auto_channel.valid", self.valid),
            ("auto_channel.data", self.data),
            ("auto_channel.ready", self.ready),
            ("auto_channel.status", self.status),
        ]
    }
}

/// Interrupt line numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InterruptsConfig {
    pub defect_line: u16,
    pub frame_done_line: u16,
}

impl Default for InterruptsConfig {
    fn default() -> Self {
        let lines = IrqLines::default();
        Self {
            defect_line: lines.defect.0,
            frame_done_line: lines.frame_done.0,
        }
    }
}

/// Wait budgets and delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Poll/wait tick
    pub tick_us: u32,
    /// Polling drain budget
    pub polling_timeout_ms: u32,
    /// Interrupt drain budget
    pub frame_timeout_ms: u32,
    /// READY acknowledgment pulse width
    pub ack_pulse_us: u32,
    /// Settle time after a block reset
    pub reset_settle_us: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_us: 1000,
            polling_timeout_ms: 5000,
            frame_timeout_ms: 1000,
            ack_pulse_us: 1000,
            reset_settle_us: 10_000,
        }
    }
}

impl TimingConfig {
    /// `ms` expressed in ticks, rounded up so a budget never shrinks to zero
    pub fn ms_to_ticks(&self, ms: u32) -> u32 {
        let us = u64::from(ms) * 1000;
        let tick = u64::from(self.tick_us.max(1));
        u32::try_from(us.div_ceil(tick)).unwrap_or(u32::MAX)
    }
}

/// Delivery strategy as written in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelModeSetting {
    #[default]
    Polling,
    Interrupt,
}

impl ChannelModeSetting {
    /// Parse `polling` / `interrupt`, case-insensitive
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "polling" | "poll" => Some(Self::Polling),
            "interrupt" | "irq" => Some(Self::Interrupt),
            _ => None,
        }
    }
}

/// Operator tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub k_threshold: u32,
    pub auto_detect_enabled: bool,
    pub manual_correct_enabled: bool,
    pub channel_mode: ChannelModeSetting,
    pub debug: bool,
    /// Collapse repeated automatic detections of one pixel
    pub collapse_auto_duplicates: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            k_threshold: K_THRESHOLD_DEFAULT,
            auto_detect_enabled: true,
            manual_correct_enabled: true,
            channel_mode: ChannelModeSetting::Polling,
            debug: false,
            collapse_auto_duplicates: false,
        }
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conversion from the configuration file to pipeline settings

use irdpc_config::{ChannelModeSetting, DpcConfig};
use irdpc_core::{FrameGeometry, MergeOptions};
use irdpc_hal::IrqLine;
use irdpc_pipeline::{
    AutoChannelRegisters, ChannelMode, CorrectorRegisters, DetectorRegisters, IrqLines,
    PipelineSettings, PipelineTiming, RegisterMap, SystemConfig,
};

/// Delivery strategy named by the file
pub fn channel_mode(setting: ChannelModeSetting) -> ChannelMode {
    match setting {
        ChannelModeSetting::Polling => ChannelMode::Polling,
        ChannelModeSetting::Interrupt => ChannelMode::Interrupt,
    }
}

/// Register windows from the `[detector]`, `[corrector]` and `[auto_channel]` sections
pub fn register_map(config: &DpcConfig) -> RegisterMap {
    let d = &config.detector;
    let c = &config.corrector;
    let a = &config.auto_channel;
    RegisterMap {
        detector: DetectorRegisters {
            base: d.base as usize,
            go: d.go as usize,
            manual_count: d.manual_count as usize,
            k_threshold: d.k_threshold as usize,
            status: d.status as usize,
            manual_table: d.manual_table as usize,
        },
        corrector: CorrectorRegisters {
            base: c.base as usize,
            go: c.go as usize,
            all_count: c.all_count as usize,
            table_ready: c.table_ready as usize,
            status: c.status as usize,
            all_table: c.all_table as usize,
        },
        auto_channel: AutoChannelRegisters {
            base: a.base as usize,
            valid: a.valid as usize,
            data: a.data as usize,
            ready: a.ready as usize,
            status: a.status as usize,
        },
    }
}

/// Operator tunables from `[pipeline]`
pub fn system_config(config: &DpcConfig) -> SystemConfig {
    let p = &config.pipeline;
    SystemConfig {
        k_threshold: p.k_threshold,
        auto_detect_enabled: p.auto_detect_enabled,
        manual_correct_enabled: p.manual_correct_enabled,
        channel_mode: channel_mode(p.channel_mode),
        debug: p.debug,
    }
}

/// Wait budgets from `[timing]`, millisecond budgets converted to ticks
pub fn pipeline_timing(config: &DpcConfig) -> PipelineTiming {
    let t = &config.timing;
    PipelineTiming {
        tick_us: t.tick_us,
        polling_timeout_ticks: t.ms_to_ticks(t.polling_timeout_ms),
        frame_timeout_ticks: t.ms_to_ticks(t.frame_timeout_ms),
        ack_pulse_us: t.ack_pulse_us,
        reset_settle_us: t.reset_settle_us,
    }
}

/// Interrupt lines from `[interrupts]`
pub fn irq_lines(config: &DpcConfig) -> IrqLines {
    IrqLines {
        defect: IrqLine(config.interrupts.defect_line),
        frame_done: IrqLine(config.interrupts.frame_done_line),
    }
}

/// Everything `DpcPipeline::new` takes from the file
pub fn pipeline_settings(config: &DpcConfig) -> PipelineSettings {
    PipelineSettings {
        registers: register_map(config),
        config: system_config(config),
        timing: pipeline_timing(config),
        geometry: FrameGeometry::new(config.frame.width, config.frame.height),
        merge: MergeOptions {
            collapse_auto_duplicates: config.pipeline.collapse_auto_duplicates,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_convert_to_pipeline_defaults() {
        let config = DpcConfig::default();
        let settings = pipeline_settings(&config);
        let defaults = PipelineSettings::default();

        assert_eq!(settings.registers, defaults.registers);
        assert_eq!(settings.config, defaults.config);
        assert_eq!(settings.timing, defaults.timing);
        assert_eq!(settings.geometry, defaults.geometry);
        assert_eq!(irq_lines(&config), IrqLines::default());
    }

    #[test]
    fn test_timeouts_follow_tick() {
        let mut config = DpcConfig::default();
        config.timing.tick_us = 100;
        config.timing.frame_timeout_ms = 3;
        let timing = pipeline_timing(&config);
        assert_eq!(timing.frame_timeout_ticks, 30);
        assert_eq!(timing.polling_timeout_ticks, 50_000);
    }
}

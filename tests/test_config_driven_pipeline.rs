// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! A configuration file drives register addresses, mode and timing of a
//! pipeline running on the simulator.

use std::fs;

use irdpc::config::{load_config, CONFIG_FILE_NAME};
use irdpc::prelude::*;
use tempfile::tempdir;

const RELOCATED: &str = r#"
[detector]
base = 0x4000_0000

[corrector]
base = 0x4000_1000
all_table = 0x100

[auto_channel]
base = 0x4000_2000

[interrupts]
defect_line = 3
frame_done_line = 4

[timing]
tick_us = 500
frame_timeout_ms = 10

[pipeline]
k_threshold = 250
channel_mode = "interrupt"
"#;

#[test]
fn test_relocated_registers_and_interrupt_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, RELOCATED).unwrap();

    let config = load_config(Some(&path), None).unwrap();
    let settings = irdpc::pipeline_settings(&config);
    let lines = irdpc::irq_lines(&config);
    assert_eq!(settings.config.channel_mode, ChannelMode::Interrupt);
    assert_eq!(settings.timing.frame_timeout_ticks, 20);
    assert_eq!(lines.defect, IrqLine(3));

    let sim = SimulatedDpc::new(settings.registers);
    let irq = MockInterruptController::new();
    let mailbox = DefectMailbox::new();
    let clock = MockClock::new();
    let handler = IrqHandler::new(
        &mailbox,
        &sim,
        &irq,
        settings.registers.auto_channel,
        lines,
        settings.geometry,
    );
    let pump = IrqPumpClock::new(&sim, handler, &clock);
    let channel = InterruptChannel::new(
        &mailbox,
        &sim,
        &irq,
        &pump,
        settings.registers.auto_channel,
        lines,
        settings.timing.tick_us,
    );
    let mut dpc = DpcPipeline::new(&sim, channel, NoopStore, &clock, settings).unwrap();
    dpc.init();
    assert!(irq.is_enabled(IrqLine(3)));
    assert!(irq.is_enabled(IrqLine(4)));
    assert!(!irq.is_enabled(IrqLine(16)));

    dpc.add_manual_defect(7, 9, DefectCategory::Manual).unwrap();
    sim.schedule_detections(&[BadPixel::new(1, 1, DefectCategory::Stuck)]);
    let stats = dpc.run_frame_cycle().unwrap();

    assert_eq!(stats.merged_total, 2);
    assert_eq!(sim.get(0x4000_0008), 250);
    assert_eq!(sim.get(0x4000_1004), 2);
    assert_eq!(sim.get(0x4000_1100), BadPixel::new(1, 1, DefectCategory::Stuck).pack());
    assert_eq!(sim.corrector_table(), vec![(1, 1), (7, 9)]);
}

#[test]
fn test_invalid_file_never_reaches_the_pipeline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[interrupts]\ndefect_line = 5\nframe_done_line = 5\n").unwrap();

    let err = load_config(Some(&path), None).unwrap_err();
    assert!(err.to_string().contains("both use line 5"));
}

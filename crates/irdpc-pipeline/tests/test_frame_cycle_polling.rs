// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Frame cycles over the polling channel, against the simulated hardware.

use irdpc_core::{BadPixel, DefectCategory, DpcError};
use irdpc_hal::MockClock;
use irdpc_pipeline::prelude::*;

type Pipeline<'a> =
    DpcPipeline<&'a SimulatedDpc, PollingChannel<&'a SimulatedDpc, &'a MockClock>, MemoryStore, &'a MockClock>;

struct Bench {
    sim: SimulatedDpc,
    clock: MockClock,
}

impl Bench {
    fn new() -> Self {
        Self {
            sim: SimulatedDpc::new(RegisterMap::default()),
            clock: MockClock::new(),
        }
    }

    fn pipeline(&self, settings: PipelineSettings) -> Pipeline<'_> {
        let channel = PollingChannel::new(
            &self.sim,
            &self.clock,
            settings.registers.auto_channel,
            settings.geometry,
            settings.timing.tick_us,
            settings.timing.ack_pulse_us,
        );
        let mut dpc =
            DpcPipeline::new(&self.sim, channel, MemoryStore::new(), &self.clock, settings)
                .unwrap();
        dpc.init();
        dpc
    }

    fn corrector_count(&self) -> u32 {
        self.sim.get(self.sim.map().corrector.all_count_addr())
    }
}

fn px(x: u16, y: u16, category: DefectCategory) -> BadPixel {
    BadPixel::new(x, y, category)
}

#[test]
fn test_manual_entry_wins_over_detection() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    dpc.add_manual_defect(50, 100, DefectCategory::Manual).unwrap();
    bench
        .sim
        .schedule_detections(&[px(50, 100, DefectCategory::Dead), px(10, 10, DefectCategory::Stuck)]);

    let stats = dpc.run_frame_cycle().unwrap();

    assert_eq!(stats.merged_total, 2);
    assert_eq!(stats.duplicates_dropped, 1);
    assert_eq!(
        dpc.merged_defects(),
        &[px(10, 10, DefectCategory::Stuck), px(50, 100, DefectCategory::Manual)]
    );
    assert_eq!(bench.sim.corrector_table(), vec![(10, 10), (50, 100)]);
    assert_eq!(bench.sim.detector_table(), vec![(50, 100)]);
    assert_eq!(dpc.state(), PipelineState::Idle);

    let status = dpc.get_status();
    assert_eq!(status.frames_processed, 1);
    assert_eq!(status.auto_dead_count, 1);
    assert_eq!(status.auto_stuck_count, 1);
    assert!(status.corrector_running);
}

#[test]
fn test_timeout_aborts_before_corrector() {
    let bench = Bench::new();
    let mut settings = PipelineSettings::default();
    settings.timing.polling_timeout_ticks = 100;
    let mut dpc = bench.pipeline(settings);

    // one good frame so the corrector holds a table
    bench.sim.schedule_detections(&[px(1, 1, DefectCategory::Dead)]);
    dpc.run_frame_cycle().unwrap();
    let count_before = bench.corrector_count();
    let count_writes = bench
        .sim
        .writes_to(bench.sim.map().corrector.all_count_addr())
        .len();
    let delays_before = bench.clock.delay_calls();

    bench.sim.set_hang(true);
    let err = dpc.run_frame_cycle().unwrap_err();

    assert_eq!(
        err,
        DpcError::Timeout {
            stage: "automatic detection",
            waited_us: 100_000
        }
    );
    assert_eq!(bench.clock.delay_calls() - delays_before, 100);
    assert_eq!(dpc.get_status().error_count, 1);
    assert_eq!(dpc.state(), PipelineState::Error);
    assert_eq!(bench.corrector_count(), count_before);
    assert_eq!(
        bench
            .sim
            .writes_to(bench.sim.map().corrector.all_count_addr())
            .len(),
        count_writes
    );
    // detector left running
    assert_eq!(bench.sim.get(bench.sim.map().detector.go_addr()), 1);
    assert_eq!(dpc.merged_defects(), &[px(1, 1, DefectCategory::Dead)]);
}

#[test]
fn test_next_cycle_recovers_after_timeout() {
    let bench = Bench::new();
    let mut settings = PipelineSettings::default();
    settings.timing.polling_timeout_ticks = 10;
    let mut dpc = bench.pipeline(settings);

    bench.sim.set_hang(true);
    assert!(dpc.run_frame_cycle().is_err());
    bench.sim.set_hang(false);
    bench.sim.schedule_detections(&[px(3, 3, DefectCategory::Stuck)]);

    let stats = dpc.run_frame_cycle().unwrap();
    assert_eq!(stats.frame, 1);
    assert_eq!(dpc.get_status().error_count, 1);
    assert_eq!(dpc.state(), PipelineState::Idle);
}

#[test]
fn test_detector_error_after_scan_is_hardware_error() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    bench.sim.inject_detector_error_on_start(true);
    let writes_before = bench.sim.writes_to(bench.sim.map().corrector.table_ready_addr());

    let err = dpc.run_frame_cycle().unwrap_err();

    assert!(matches!(err, DpcError::Hardware { block: "detector", .. }));
    assert_eq!(dpc.get_status().error_count, 1);
    assert_eq!(
        bench.sim.writes_to(bench.sim.map().corrector.table_ready_addr()),
        writes_before
    );
    assert!(matches!(
        dpc.check_hardware(),
        Err(DpcError::Hardware { block: "detector", .. })
    ));
}

#[test]
fn test_detector_error_on_configuration_is_config_error() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    bench.sim.inject_detector_error(true);

    assert!(matches!(dpc.run_frame_cycle(), Err(DpcError::Config(_))));
    assert_eq!(dpc.state(), PipelineState::Error);
}

#[test]
fn test_corrector_error_is_reported() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    bench.sim.inject_corrector_error(true);

    assert!(matches!(dpc.run_frame_cycle(), Err(DpcError::Config(_))));
    assert!(matches!(
        dpc.check_hardware(),
        Err(DpcError::Hardware { block: "corrector", .. })
    ));
    assert_eq!(dpc.get_status().frames_processed, 0);
}

#[test]
fn test_auto_detect_disabled_uses_manual_only() {
    let bench = Bench::new();
    let mut settings = PipelineSettings::default();
    settings.config.auto_detect_enabled = false;
    let mut dpc = bench.pipeline(settings);
    dpc.add_manual_defect(7, 8, DefectCategory::Manual).unwrap();
    bench.sim.schedule_detections(&[px(1, 1, DefectCategory::Dead)]);

    let stats = dpc.run_frame_cycle().unwrap();

    assert_eq!(stats.merged_total, 1);
    assert_eq!(bench.sim.corrector_table(), vec![(7, 8)]);
    // detector never started
    assert!(bench.sim.writes_to(bench.sim.map().detector.go_addr()).iter().all(|v| *v == 0));
}

#[test]
fn test_manual_correction_disabled_excludes_manual_list() {
    let bench = Bench::new();
    let mut settings = PipelineSettings::default();
    settings.config.manual_correct_enabled = false;
    let mut dpc = bench.pipeline(settings);
    dpc.add_manual_defect(7, 8, DefectCategory::Manual).unwrap();
    bench.sim.schedule_detections(&[px(7, 8, DefectCategory::Dead)]);

    dpc.run_frame_cycle().unwrap();

    // detector still gets the manual table, corrector only the detection
    assert_eq!(bench.sim.detector_table(), vec![(7, 8)]);
    assert_eq!(dpc.merged_defects(), &[px(7, 8, DefectCategory::Dead)]);
}

#[test]
fn test_add_manual_defect_errors() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());

    assert!(matches!(
        dpc.add_manual_defect(640, 0, DefectCategory::Manual),
        Err(DpcError::Param(_))
    ));
    dpc.add_manual_defect(1, 1, DefectCategory::Manual).unwrap();
    assert!(matches!(
        dpc.add_manual_defect(1, 1, DefectCategory::Manual),
        Err(DpcError::Config(_))
    ));

    for i in 1..128u16 {
        dpc.add_manual_defect(i, 2, DefectCategory::Manual).unwrap();
    }
    assert_eq!(dpc.manual_defects().len(), 128);
    assert_eq!(
        dpc.add_manual_defect(0, 3, DefectCategory::Manual),
        Err(DpcError::Overflow {
            what: "manual defect list",
            capacity: 128
        })
    );
    assert_eq!(dpc.store().saved().len(), 128);
}

#[test]
fn test_remove_and_clear_manual_defects() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    dpc.add_manual_defect(1, 1, DefectCategory::Manual).unwrap();
    dpc.add_manual_defect(2, 2, DefectCategory::Manual).unwrap();
    dpc.add_manual_defect(3, 3, DefectCategory::Manual).unwrap();

    dpc.remove_manual_defect(2, 2).unwrap();
    assert_eq!(
        dpc.manual_defects(),
        &[BadPixel::manual(1, 1), BadPixel::manual(3, 3)]
    );
    assert!(matches!(dpc.remove_manual_defect(2, 2), Err(DpcError::Param(_))));

    dpc.clear_manual_defects().unwrap();
    assert!(dpc.manual_defects().is_empty());
    assert!(dpc.store().saved().is_empty());
    assert_eq!(dpc.store().save_count(), 5);
}

#[test]
fn test_persistence_failure_keeps_mutation() {
    let bench = Bench::new();
    let settings = PipelineSettings::default();
    let channel = PollingChannel::new(
        &bench.sim,
        &bench.clock,
        settings.registers.auto_channel,
        settings.geometry,
        settings.timing.tick_us,
        settings.timing.ack_pulse_us,
    );
    let mut store = MemoryStore::new();
    store.fail_saves(true);
    let mut dpc = DpcPipeline::new(&bench.sim, channel, store, &bench.clock, settings).unwrap();

    assert!(matches!(
        dpc.add_manual_defect(4, 4, DefectCategory::Manual),
        Err(DpcError::Persistence(_))
    ));
    assert_eq!(dpc.manual_defects(), &[BadPixel::manual(4, 4)]);
}

#[test]
fn test_restore_manual_defects_skips_bad_entries() {
    let bench = Bench::new();
    let settings = PipelineSettings::default();
    let channel = PollingChannel::new(
        &bench.sim,
        &bench.clock,
        settings.registers.auto_channel,
        settings.geometry,
        settings.timing.tick_us,
        settings.timing.ack_pulse_us,
    );
    let store = MemoryStore::with_entries(&[
        BadPixel::manual(1, 1),
        BadPixel::manual(900, 1),
        BadPixel::manual(1, 1),
        BadPixel::manual(2, 2),
    ]);
    let mut dpc = DpcPipeline::new(&bench.sim, channel, store, &bench.clock, settings).unwrap();

    assert_eq!(dpc.restore_manual_defects().unwrap(), 2);
    assert_eq!(
        dpc.manual_defects(),
        &[BadPixel::manual(1, 1), BadPixel::manual(2, 2)]
    );
}

#[test]
fn test_set_threshold_range_and_write_through() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    let k_addr = bench.sim.map().detector.k_threshold_addr();
    assert_eq!(bench.sim.get(k_addr), K_THRESHOLD_DEFAULT);

    assert!(matches!(dpc.set_threshold(5), Err(DpcError::Param(_))));
    assert!(matches!(dpc.set_threshold(1001), Err(DpcError::Param(_))));
    assert_eq!(dpc.config().k_threshold, K_THRESHOLD_DEFAULT);

    dpc.set_threshold(250).unwrap();
    assert_eq!(bench.sim.get(k_addr), 250);
    assert_eq!(dpc.config().k_threshold, 250);
}

#[test]
fn test_threshold_rejected_by_detector_is_config_error() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    bench.sim.inject_detector_error(true);

    assert!(matches!(dpc.set_threshold(300), Err(DpcError::Config(_))));
    assert_eq!(dpc.config().k_threshold, K_THRESHOLD_DEFAULT);

    let config = SystemConfig {
        k_threshold: 400,
        ..*dpc.config()
    };
    assert!(matches!(dpc.set_config(config), Err(DpcError::Config(_))));
    assert_eq!(dpc.config().k_threshold, K_THRESHOLD_DEFAULT);
}

#[test]
fn test_set_config_rejects_mode_change() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());

    let config = SystemConfig {
        channel_mode: ChannelMode::Interrupt,
        ..*dpc.config()
    };
    assert!(matches!(dpc.set_config(config), Err(DpcError::Config(_))));

    let config = SystemConfig {
        k_threshold: 400,
        debug: true,
        ..*dpc.config()
    };
    dpc.set_config(config).unwrap();
    assert_eq!(
        bench.sim.get(bench.sim.map().detector.k_threshold_addr()),
        400
    );
}

#[test]
fn test_new_rejects_mismatched_channel() {
    let bench = Bench::new();
    let mut settings = PipelineSettings::default();
    settings.config.channel_mode = ChannelMode::Interrupt;
    let channel = PollingChannel::new(
        &bench.sim,
        &bench.clock,
        settings.registers.auto_channel,
        settings.geometry,
        settings.timing.tick_us,
        settings.timing.ack_pulse_us,
    );
    assert!(matches!(
        DpcPipeline::new(&bench.sim, channel, NoopStore, &bench.clock, settings),
        Err(DpcError::Config(_))
    ));
}

#[test]
fn test_reset_keeps_manual_list_and_zeroes_counters() {
    let bench = Bench::new();
    let mut settings = PipelineSettings::default();
    // room for 300 READY handshakes of two ticks each
    settings.timing.polling_timeout_ticks = 1_000;
    let mut dpc = bench.pipeline(settings);
    dpc.add_manual_defect(9, 9, DefectCategory::Manual).unwrap();
    let detections: Vec<BadPixel> = (0..300u16)
        .map(|i| px(i, 1, DefectCategory::Dead))
        .collect();
    bench.sim.schedule_detections(&detections);
    dpc.run_frame_cycle().unwrap();
    assert_eq!(dpc.get_status().lost_detections, 44);
    bench.sim.set_hang(true);
    let _ = dpc.run_frame_cycle();

    dpc.reset();

    let status = dpc.get_status();
    assert_eq!(status.frames_processed, 0);
    assert_eq!(status.error_count, 0);
    assert_eq!(status.lost_detections, 0);
    assert_eq!(dpc.interrupt_stats().rejected, 0);
    assert_eq!(status.manual_count, 1);
    assert_eq!(status.merged_total, 0);
    assert_eq!(status.state, PipelineState::Idle);
    assert!(!status.detector_running);
    assert!(!status.corrector_running);
    let map = bench.sim.map();
    assert_eq!(bench.sim.get(map.corrector.table_ready_addr()), 0);
}

#[test]
fn test_shutdown_stops_both_blocks() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    dpc.run_frame_cycle().unwrap();
    assert!(dpc.get_status().corrector_running);

    dpc.shutdown();

    let map = bench.sim.map();
    assert_eq!(bench.sim.get(map.detector.go_addr()), 0);
    assert_eq!(bench.sim.get(map.corrector.go_addr()), 0);
    assert!(!dpc.get_status().corrector_running);
}

#[test]
fn test_batch_overflow_is_counted_as_lost() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    let detections: Vec<BadPixel> = (0..300u16)
        .map(|i| px(i, 0, DefectCategory::Dead))
        .collect();
    bench.sim.schedule_detections(&detections);

    let stats = dpc.run_frame_cycle().unwrap();

    assert_eq!(stats.auto_dead, 256);
    assert_eq!(dpc.get_status().lost_detections, 44);
    assert_eq!(dpc.interrupt_stats().accepted, 256);
}

#[test]
fn test_bad_pixel_ratio() {
    let bench = Bench::new();
    let mut dpc = bench.pipeline(PipelineSettings::default());
    dpc.add_manual_defect(0, 0, DefectCategory::Manual).unwrap();
    dpc.run_frame_cycle().unwrap();

    let ratio = dpc.get_status().bad_pixel_ratio;
    assert!((ratio - 100.0 / (640.0 * 512.0)).abs() < 1e-6);
}

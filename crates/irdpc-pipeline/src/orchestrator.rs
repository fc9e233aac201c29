// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Frame-cycle orchestration
//!
//! One cycle: configure detector, start it, drain automatic detections,
//! merge with the manual list, upload the merged table, start the corrector.
//! A timeout or hardware error aborts the cycle before the corrector is
//! touched, so the corrector keeps correcting with the previous table.

use irdpc_core::{
    merge, AutoDefectBatch, BadPixel, DefectCategory, DpcError, FrameGeometry, ManualDefectList,
    MergeOptions, MergedDefectList, Result, MAX_ALL, MAX_MANUAL,
};
use irdpc_hal::{RegisterPort, TimeProvider};
use tracing::{debug, info, trace, warn};

use crate::channel::{AutoDefectChannel, ChannelMode, InterruptStats};
use crate::config::{validate_threshold, PipelineSettings, PipelineTiming, SystemConfig};
use crate::drivers::{BlockStatus, CorrectorDriver, DetectorDriver};
use crate::registers::{CORRECTOR_STATUS_ERROR, DETECTOR_STATUS_ERROR};
use crate::status::{FrameStats, PipelineState, SystemStatus};
use crate::store::DefectStore;

/// The defect-pixel-correction pipeline
///
/// Owns both drivers, the automatic channel, the manual list and the
/// per-frame lists. All operations run on the caller's context; the only
/// blocking call is the bounded drain inside [`DpcPipeline::run_frame_cycle`].
pub struct DpcPipeline<P, C, S, T> {
    detector: DetectorDriver<P>,
    corrector: CorrectorDriver<P>,
    channel: C,
    store: S,
    clock: T,
    config: SystemConfig,
    timing: PipelineTiming,
    geometry: FrameGeometry,
    merge_options: MergeOptions,
    manual: ManualDefectList,
    last_auto: AutoDefectBatch,
    merged: MergedDefectList,
    state: PipelineState,
    frames_processed: u32,
    error_count: u32,
    overflow_drops: u32,
}

impl<P, C, S, T> DpcPipeline<P, C, S, T>
where
    P: RegisterPort + Clone,
    C: AutoDefectChannel,
    S: DefectStore,
    T: TimeProvider,
{
    /// Build a pipeline; the channel's strategy must match the configured mode
    pub fn new(port: P, channel: C, store: S, clock: T, settings: PipelineSettings) -> Result<Self> {
        settings.config.validate()?;
        if channel.mode() != settings.config.channel_mode {
            return Err(DpcError::Config("channel does not match the configured mode"));
        }

        Ok(Self {
            detector: DetectorDriver::new(port.clone(), settings.registers.detector),
            corrector: CorrectorDriver::new(port, settings.registers.corrector),
            channel,
            store,
            clock,
            config: settings.config,
            timing: settings.timing,
            geometry: settings.geometry,
            merge_options: settings.merge,
            manual: ManualDefectList::new(),
            last_auto: AutoDefectBatch::new(),
            merged: MergedDefectList::new(),
            state: PipelineState::Idle,
            frames_processed: 0,
            error_count: 0,
            overflow_drops: 0,
        })
    }

    /// Reset both blocks, wait for them to settle, program the threshold and
    /// enable the delivery path.
    ///
    /// The manual list is kept; per-frame lists are cleared.
    pub fn init(&mut self) {
        self.detector.reset();
        self.corrector.reset();
        self.clock.delay_us(self.timing.reset_settle_us);
        if let Err(e) = self.detector.set_threshold(self.config.k_threshold) {
            // the next frame cycle reprograms the block and reports it
            warn!(error = %e, "threshold not accepted during init");
        }
        self.channel.enable();
        self.channel.start_frame();
        self.last_auto.clear();
        self.merged.clear();
        self.state = PipelineState::Idle;
        info!(
            threshold = self.config.k_threshold,
            mode = self.config.channel_mode.name(),
            "defect correction initialised"
        );
    }

    /// Stop both blocks and the delivery path
    pub fn shutdown(&mut self) {
        self.detector.stop();
        self.corrector.stop();
        self.channel.disable();
        self.state = PipelineState::Idle;
        info!("defect correction stopped");
    }

    /// Shutdown, init and zero the counters; the manual list survives
    pub fn reset(&mut self) {
        self.shutdown();
        self.init();
        self.frames_processed = 0;
        self.error_count = 0;
        self.overflow_drops = 0;
        self.channel.reset_counters();
    }

    /// `Hardware` if either block reports its error bit
    pub fn check_hardware(&self) -> Result<()> {
        let status = self.detector.raw_status();
        if status & DETECTOR_STATUS_ERROR != 0 {
            return Err(DpcError::Hardware {
                block: "detector",
                status,
            });
        }
        let status = self.corrector.raw_status();
        if status & CORRECTOR_STATUS_ERROR != 0 {
            return Err(DpcError::Hardware {
                block: "corrector",
                status,
            });
        }
        Ok(())
    }

    /// Run one detect, drain, merge, correct cycle
    pub fn run_frame_cycle(&mut self) -> Result<FrameStats> {
        self.enter(PipelineState::ConfiguringDetector);
        if let Err(e) = self.detector.configure(self.config.k_threshold, &self.manual) {
            return Err(self.fail(e));
        }
        self.channel.start_frame();

        let mut auto = AutoDefectBatch::new();
        let mut elapsed_ticks = 0;
        if self.config.auto_detect_enabled {
            self.enter(PipelineState::DetectorRunning);
            if let Err(e) = self.detector.start() {
                return Err(self.fail(e));
            }

            self.enter(PipelineState::AwaitingCompletion);
            let timeout = self.timing.drain_timeout_ticks(self.channel.mode());
            let outcome = self.channel.drain(timeout);
            elapsed_ticks = outcome.elapsed_ticks;
            if !outcome.completed {
                // detector is left running; late results are discarded by
                // the next start_frame
                let waited_us = elapsed_ticks as u64 * self.timing.tick_us as u64;
                return Err(self.fail(DpcError::Timeout {
                    stage: "automatic detection",
                    waited_us,
                }));
            }

            let status = self.detector.raw_status();
            if self.detector.status() == BlockStatus::Error {
                return Err(self.fail(DpcError::Hardware {
                    block: "detector",
                    status,
                }));
            }
            auto = outcome.batch;
        }

        self.enter(PipelineState::Merging);
        let manual: &[BadPixel] = if self.config.manual_correct_enabled {
            &self.manual
        } else {
            &[]
        };
        let report = merge::<MAX_ALL>(manual, &auto, self.merge_options);
        if let Some(err) = report.overflow() {
            self.overflow_drops = self.overflow_drops.wrapping_add(report.overflow_dropped as u32);
            warn!(dropped = report.overflow_dropped, "{}", err);
        }

        self.enter(PipelineState::ConfiguringCorrector);
        if let Err(e) = self.corrector.configure(&report.merged) {
            return Err(self.fail(e));
        }

        self.enter(PipelineState::CorrectorRunning);
        if let Err(e) = self.corrector.start() {
            return Err(self.fail(e));
        }

        self.frames_processed = self.frames_processed.wrapping_add(1);
        let stats = FrameStats {
            frame: self.frames_processed,
            manual_applied: report.manual_kept,
            auto_dead: count(&auto, DefectCategory::Dead),
            auto_stuck: count(&auto, DefectCategory::Stuck),
            merged_total: report.merged.len(),
            duplicates_dropped: report.duplicates_dropped,
            overflow_dropped: report.overflow_dropped,
            elapsed_ticks,
        };

        self.last_auto = auto;
        self.merged = report.merged;
        if self.config.debug {
            for (i, px) in self.merged.iter().enumerate() {
                trace!(index = i, "{}", px);
            }
        }

        self.enter(PipelineState::Idle);
        info!(
            frame = stats.frame,
            merged = stats.merged_total,
            dead = stats.auto_dead,
            stuck = stats.auto_stuck,
            manual = stats.manual_applied,
            "frame cycle complete"
        );
        Ok(stats)
    }

    /// Replace the configuration, writing the threshold through.
    ///
    /// The delivery strategy cannot change after construction.
    pub fn set_config(&mut self, config: SystemConfig) -> Result<()> {
        config.validate()?;
        if config.channel_mode != self.channel.mode() {
            return Err(DpcError::Config("channel mode cannot change at runtime"));
        }
        self.detector.set_threshold(config.k_threshold)?;
        self.config = config;
        debug!(?config, "configuration updated");
        Ok(())
    }

    /// Validate and write through a new detector threshold
    pub fn set_threshold(&mut self, value: u32) -> Result<()> {
        validate_threshold(value)?;
        self.detector.set_threshold(value)?;
        self.config.k_threshold = value;
        debug!(threshold = value, "threshold updated");
        Ok(())
    }

    /// Append a manual entry, then persist the list.
    ///
    /// On a persistence failure the entry stays in the list and the error is
    /// returned.
    pub fn add_manual_defect(&mut self, x: u16, y: u16, category: DefectCategory) -> Result<()> {
        self.geometry.validate(x, y)?;
        let px = BadPixel::new(x, y, category);
        if self.manual.iter().any(|m| m.same_site(&px)) {
            return Err(DpcError::Config("manual defect already listed"));
        }
        if self.manual.push(px).is_err() {
            return Err(DpcError::Overflow {
                what: "manual defect list",
                capacity: MAX_MANUAL,
            });
        }
        debug!(x, y, total = self.manual.len(), "manual defect added");
        self.persist()
    }

    /// Remove the entry at `(x, y)`; `Param` if there is none
    pub fn remove_manual_defect(&mut self, x: u16, y: u16) -> Result<()> {
        let index = self
            .manual
            .iter()
            .position(|m| m.x == x && m.y == y)
            .ok_or(DpcError::Param("no manual defect at that coordinate"))?;
        self.manual.remove(index);
        debug!(x, y, total = self.manual.len(), "manual defect removed");
        self.persist()
    }

    /// Empty the manual list
    pub fn clear_manual_defects(&mut self) -> Result<()> {
        self.manual.clear();
        debug!("manual defects cleared");
        self.persist()
    }

    /// Replace the manual list with the stored one.
    ///
    /// Entries outside the frame or repeating an earlier coordinate are
    /// skipped. Returns the number of entries kept.
    pub fn restore_manual_defects(&mut self) -> Result<usize> {
        let mut loaded = ManualDefectList::new();
        self.store.load(&mut loaded)?;

        self.manual.clear();
        for px in loaded.iter() {
            if !self.geometry.contains(px.x, px.y) || self.manual.iter().any(|m| m.same_site(px)) {
                warn!(x = px.x, y = px.y, "skipping stored manual defect");
                continue;
            }
            // capacities are equal, the push cannot fail
            let _ = self.manual.push(*px);
        }
        info!(count = self.manual.len(), "manual defects restored");
        Ok(self.manual.len())
    }

    /// Snapshot of counters and hardware busy bits
    pub fn get_status(&self) -> SystemStatus {
        SystemStatus {
            manual_count: self.manual.len(),
            auto_dead_count: count(&self.last_auto, DefectCategory::Dead),
            auto_stuck_count: count(&self.last_auto, DefectCategory::Stuck),
            merged_total: self.merged.len(),
            frames_processed: self.frames_processed,
            error_count: self.error_count,
            lost_detections: self.channel.lost_count(),
            overflow_drops: self.overflow_drops,
            detector_running: self.detector.is_running(),
            corrector_running: self.corrector.is_running(),
            state: self.state,
            bad_pixel_ratio: self.geometry.bad_pixel_ratio(self.merged.len()),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Delivery strategy in use
    pub fn channel_mode(&self) -> ChannelMode {
        self.channel.mode()
    }

    /// Manual list
    pub fn manual_defects(&self) -> &[BadPixel] {
        &self.manual
    }

    /// Table uploaded by the last successful cycle
    pub fn merged_defects(&self) -> &[BadPixel] {
        &self.merged
    }

    /// Automatic batch of the last successful cycle
    pub fn last_auto_batch(&self) -> &[BadPixel] {
        &self.last_auto
    }

    /// Delivery counters of the channel
    pub fn interrupt_stats(&self) -> InterruptStats {
        self.channel.interrupt_stats()
    }

    /// The automatic channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The automatic channel, mutably (e.g. to re-enable its interrupts)
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// The persistence collaborator
    pub fn store(&self) -> &S {
        &self.store
    }

    fn enter(&mut self, next: PipelineState) {
        debug!(from = self.state.name(), to = next.name(), "state");
        self.state = next;
    }

    fn fail(&mut self, err: DpcError) -> DpcError {
        warn!(state = self.state.name(), kind = err.kind(), "frame cycle aborted: {}", err);
        self.state = PipelineState::Error;
        self.error_count = self.error_count.wrapping_add(1);
        err
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save(&self.manual).map_err(|e| {
            warn!("manual defect list not persisted: {}", e);
            e
        })
    }
}

fn count(list: &[BadPixel], category: DefectCategory) -> usize {
    list.iter().filter(|p| p.category == category).count()
}

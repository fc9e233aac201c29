// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Polling strategy: VALID / DATA / READY handshake in a bounded loop

use irdpc_core::{AutoDefectBatch, BadPixel, FrameGeometry};
use irdpc_hal::{Deadline, RegisterPort, TimeProvider};
use tracing::{debug, trace, warn};

use super::{AutoDefectChannel, ChannelMode, DrainOutcome, InterruptStats};
use crate::registers::{AutoChannelRegisters, AUTO_STATUS_FRAME_DONE, AUTO_VALID_PENDING};

/// Reads detections straight from the result registers
///
/// Each loop iteration consumes at most one detection, checks the
/// frame-done bit, then sleeps one tick. The wait is bounded by elapsed time
/// on `clock`, not by the iteration count.
pub struct PollingChannel<P, T> {
    port: P,
    clock: T,
    regs: AutoChannelRegisters,
    geometry: FrameGeometry,
    tick_us: u32,
    ack_pulse_us: u32,
    accepted: u32,
    lost: u32,
    rejected: u32,
}

impl<P: RegisterPort, T: TimeProvider> PollingChannel<P, T> {
    /// Channel over `regs`, sleeping `tick_us` between polls and holding
    /// READY high for `ack_pulse_us`
    pub fn new(
        port: P,
        clock: T,
        regs: AutoChannelRegisters,
        geometry: FrameGeometry,
        tick_us: u32,
        ack_pulse_us: u32,
    ) -> Self {
        Self {
            port,
            clock,
            regs,
            geometry,
            tick_us,
            ack_pulse_us,
            accepted: 0,
            lost: 0,
            rejected: 0,
        }
    }

    fn consume(&mut self, batch: &mut AutoDefectBatch, overflow: &mut usize) {
        let word = self.port.read32(self.regs.data_addr());
        let px = BadPixel::from_detection(word);

        if !BadPixel::is_valid_detection(word) || !self.geometry.contains(px.x, px.y) {
            self.rejected = self.rejected.wrapping_add(1);
            warn!(word, "discarding invalid detection");
        } else if batch.push(px).is_err() {
            *overflow += 1;
            self.lost = self.lost.wrapping_add(1);
            warn!(x = px.x, y = px.y, "auto defect batch full, detection dropped");
        } else {
            self.accepted = self.accepted.wrapping_add(1);
            trace!(x = px.x, y = px.y, category = px.category.name(), "detection");
        }

        // READY pulse: the detector may present the next value afterwards
        let ready = self.regs.ready_addr();
        self.port.write32(ready, 1);
        self.clock.delay_us(self.ack_pulse_us);
        self.port.write32(ready, 0);
    }

    /// Tick length in microseconds
    pub fn tick_us(&self) -> u32 {
        self.tick_us
    }
}

impl<P: RegisterPort, T: TimeProvider> AutoDefectChannel for PollingChannel<P, T> {
    fn mode(&self) -> ChannelMode {
        ChannelMode::Polling
    }

    fn start_frame(&mut self) {}

    fn drain(&mut self, timeout_ticks: u32) -> DrainOutcome {
        let tick_us = self.tick_us.max(1);
        let deadline = Deadline::after(&self.clock, timeout_ticks as u64 * tick_us as u64);
        let mut batch = AutoDefectBatch::new();
        let mut overflow = 0;

        let completed = loop {
            if self.port.read32(self.regs.valid_addr()) & AUTO_VALID_PENDING != 0 {
                self.consume(&mut batch, &mut overflow);
            }
            if self.port.read32(self.regs.status_addr()) & AUTO_STATUS_FRAME_DONE != 0 {
                break true;
            }
            if deadline.expired(&self.clock) {
                break false;
            }
            self.clock.delay_us(self.tick_us);
        };

        let elapsed_ticks = (deadline.elapsed_us(&self.clock) / tick_us as u64) as u32;
        if completed {
            debug!(found = batch.len(), elapsed_ticks, "polling drain complete");
        } else {
            warn!(found = batch.len(), elapsed_ticks, "polling drain timed out");
        }

        DrainOutcome {
            batch,
            completed,
            elapsed_ticks,
            overflow_dropped: overflow,
        }
    }

    fn lost_count(&self) -> u32 {
        self.lost
    }

    fn reset_counters(&mut self) {
        self.accepted = 0;
        self.lost = 0;
        self.rejected = 0;
    }

    fn interrupt_stats(&self) -> InterruptStats {
        InterruptStats {
            accepted: self.accepted,
            lost: self.lost,
            rejected: self.rejected,
            ..InterruptStats::default()
        }
    }
}

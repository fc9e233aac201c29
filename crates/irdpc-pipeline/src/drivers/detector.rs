// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Detector block driver

use irdpc_core::{BadPixel, DpcError, Result, MAX_MANUAL};
use irdpc_hal::RegisterPort;
use tracing::{debug, warn};

use super::BlockStatus;
use crate::registers::{
    DetectorRegisters, DETECTOR_STATUS_BUSY, DETECTOR_STATUS_DONE, DETECTOR_STATUS_ERROR,
};

/// Drives the detector: threshold, manual table upload, GO, STATUS
pub struct DetectorDriver<P> {
    port: P,
    regs: DetectorRegisters,
    configured: bool,
}

impl<P: RegisterPort> DetectorDriver<P> {
    /// Driver over `regs`; the block must be configured before it can start
    pub fn new(port: P, regs: DetectorRegisters) -> Self {
        Self {
            port,
            regs,
            configured: false,
        }
    }

    /// Upload threshold and manual table, then check STATUS for an error.
    ///
    /// Writing the same inputs twice leaves the block in the same state.
    pub fn configure(&mut self, threshold: u32, manual: &[BadPixel]) -> Result<()> {
        if manual.len() > MAX_MANUAL {
            return Err(DpcError::Overflow {
                what: "detector manual table",
                capacity: MAX_MANUAL,
            });
        }

        self.port.write32(self.regs.k_threshold_addr(), threshold);
        self.port
            .write32(self.regs.manual_count_addr(), manual.len() as u32);
        for (i, px) in manual.iter().enumerate() {
            self.port.write32(self.regs.table_addr(i), px.pack());
        }

        let status = self.raw_status();
        if status & DETECTOR_STATUS_ERROR != 0 {
            warn!(status, "detector reported an error after configuration");
            self.configured = false;
            return Err(DpcError::Config("detector rejected configuration"));
        }

        self.configured = true;
        debug!(threshold, manual = manual.len(), "detector configured");
        Ok(())
    }

    /// Write K_THRESHOLD only, then check STATUS for an error
    pub fn set_threshold(&mut self, threshold: u32) -> Result<()> {
        self.port.write32(self.regs.k_threshold_addr(), threshold);
        let status = self.raw_status();
        if status & DETECTOR_STATUS_ERROR != 0 {
            warn!(status, threshold, "detector reported an error after threshold write");
            self.configured = false;
            return Err(DpcError::Config("detector rejected threshold"));
        }
        Ok(())
    }

    /// Set GO
    pub fn start(&mut self) -> Result<()> {
        if !self.configured {
            return Err(DpcError::Config("detector started before configuration"));
        }
        self.port.write32(self.regs.go_addr(), 1);
        debug!("detector started");
        Ok(())
    }

    /// Clear GO
    pub fn stop(&mut self) {
        self.port.write32(self.regs.go_addr(), 0);
    }

    /// Clear GO and forget the configuration
    pub fn reset(&mut self) {
        self.stop();
        self.configured = false;
    }

    /// Raw STATUS word
    pub fn raw_status(&self) -> u32 {
        self.port.read32(self.regs.status_addr())
    }

    /// Decoded STATUS (error takes precedence over done over busy)
    pub fn status(&self) -> BlockStatus {
        let raw = self.raw_status();
        if raw & DETECTOR_STATUS_ERROR != 0 {
            BlockStatus::Error
        } else if raw & DETECTOR_STATUS_DONE != 0 {
            BlockStatus::Done
        } else if raw & DETECTOR_STATUS_BUSY != 0 {
            BlockStatus::Busy
        } else {
            BlockStatus::Idle
        }
    }

    /// STATUS busy bit
    pub fn is_running(&self) -> bool {
        self.raw_status() & DETECTOR_STATUS_BUSY != 0
    }

    /// Whether the last `configure` succeeded
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Register window
    pub fn registers(&self) -> &DetectorRegisters {
        &self.regs
    }
}

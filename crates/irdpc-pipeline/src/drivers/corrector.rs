// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Corrector block driver

use irdpc_core::{BadPixel, DpcError, Result, MAX_ALL};
use irdpc_hal::RegisterPort;
use tracing::{debug, warn};

use super::BlockStatus;
use crate::registers::{
    CorrectorRegisters, CORRECTOR_STATUS_BUSY, CORRECTOR_STATUS_ERROR, CORRECTOR_STATUS_READY,
};

/// Drives the corrector: merged table upload, TABLE_READY, GO, STATUS
pub struct CorrectorDriver<P> {
    port: P,
    regs: CorrectorRegisters,
    configured: bool,
}

impl<P: RegisterPort> CorrectorDriver<P> {
    /// Driver over `regs`
    pub fn new(port: P, regs: CorrectorRegisters) -> Self {
        Self {
            port,
            regs,
            configured: false,
        }
    }

    /// Stop the block, upload `table`, then raise TABLE_READY.
    ///
    /// The corrector never sees a half-written table: TABLE_READY is low
    /// for the whole upload.
    pub fn configure(&mut self, table: &[BadPixel]) -> Result<()> {
        if table.len() > MAX_ALL {
            return Err(DpcError::Overflow {
                what: "corrector table",
                capacity: MAX_ALL,
            });
        }

        self.port.write32(self.regs.go_addr(), 0);
        self.port.write32(self.regs.table_ready_addr(), 0);
        self.port
            .write32(self.regs.all_count_addr(), table.len() as u32);
        for (i, px) in table.iter().enumerate() {
            self.port.write32(self.regs.table_addr(i), px.pack());
        }
        self.port.write32(self.regs.table_ready_addr(), 1);

        let status = self.raw_status();
        if status & CORRECTOR_STATUS_ERROR != 0 {
            warn!(status, "corrector reported an error after table upload");
            self.configured = false;
            return Err(DpcError::Config("corrector rejected table"));
        }

        self.configured = true;
        debug!(entries = table.len(), "corrector table configured");
        Ok(())
    }

    /// Set GO
    pub fn start(&mut self) -> Result<()> {
        if !self.configured {
            return Err(DpcError::Config("corrector started without a table"));
        }
        self.port.write32(self.regs.go_addr(), 1);
        debug!("corrector started");
        Ok(())
    }

    /// Clear GO
    pub fn stop(&mut self) {
        self.port.write32(self.regs.go_addr(), 0);
    }

    /// Clear GO and TABLE_READY
    pub fn reset(&mut self) {
        self.stop();
        self.port.write32(self.regs.table_ready_addr(), 0);
        self.configured = false;
    }

    /// Raw STATUS word
    pub fn raw_status(&self) -> u32 {
        self.port.read32(self.regs.status_addr())
    }

    /// Decoded STATUS; `Done` means the table is accepted and the block idle
    pub fn status(&self) -> BlockStatus {
        let raw = self.raw_status();
        if raw & CORRECTOR_STATUS_ERROR != 0 {
            BlockStatus::Error
        } else if raw & CORRECTOR_STATUS_BUSY != 0 {
            BlockStatus::Busy
        } else if raw & CORRECTOR_STATUS_READY != 0 {
            BlockStatus::Done
        } else {
            BlockStatus::Idle
        }
    }

    /// STATUS busy bit
    pub fn is_running(&self) -> bool {
        self.raw_status() & CORRECTOR_STATUS_BUSY != 0
    }

    /// Register window
    pub fn registers(&self) -> &CorrectorRegisters {
        &self.regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irdpc_core::DefectCategory;
    use irdpc_hal::MockRegisters;

    #[test]
    fn test_upload_sequence() {
        let regs = MockRegisters::new();
        let map = CorrectorRegisters::default();
        let mut corr = CorrectorDriver::new(&regs, map);
        let table = [
            BadPixel::new(10, 10, DefectCategory::Stuck),
            BadPixel::manual(50, 100),
        ];

        corr.configure(&table).unwrap();

        assert_eq!(
            regs.writes(),
            vec![
                (map.go_addr(), 0),
                (map.table_ready_addr(), 0),
                (map.all_count_addr(), 2),
                (map.table_addr(0), (10 << 16) | 10),
                (map.table_addr(1), (50 << 16) | 100),
                (map.table_ready_addr(), 1),
            ]
        );
    }

    #[test]
    fn test_start_requires_table() {
        let regs = MockRegisters::new();
        let mut corr = CorrectorDriver::new(&regs, CorrectorRegisters::default());
        assert!(matches!(corr.start(), Err(DpcError::Config(_))));
        corr.configure(&[]).unwrap();
        corr.start().unwrap();
        assert!(matches!(corr.status(), BlockStatus::Idle));
    }

    #[test]
    fn test_error_bit_after_upload() {
        let regs = MockRegisters::new();
        let map = CorrectorRegisters::default();
        regs.set(map.status_addr(), CORRECTOR_STATUS_ERROR);
        let mut corr = CorrectorDriver::new(&regs, map);
        assert_eq!(
            corr.configure(&[]),
            Err(DpcError::Config("corrector rejected table"))
        );
        assert!(corr.start().is_err());
    }

    #[test]
    fn test_status_decoding() {
        let regs = MockRegisters::new();
        let map = CorrectorRegisters::default();
        let corr = CorrectorDriver::new(&regs, map);

        regs.set(map.status_addr(), CORRECTOR_STATUS_READY);
        assert_eq!(corr.status(), BlockStatus::Done);
        regs.set(map.status_addr(), CORRECTOR_STATUS_READY | CORRECTOR_STATUS_BUSY);
        assert_eq!(corr.status(), BlockStatus::Busy);
        assert!(corr.is_running());
    }
}

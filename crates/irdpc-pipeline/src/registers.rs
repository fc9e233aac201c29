// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Register map of the detector, corrector and automatic-result channel
//!
//! Base addresses and offsets are plain data so that a board configuration
//! can relocate any block. The defaults match the reference FPGA build.

use irdpc_hal::IrqLine;

/// Detector STATUS: scan in progress
pub const DETECTOR_STATUS_BUSY: u32 = 1 << 0;
/// Detector STATUS: scan finished
pub const DETECTOR_STATUS_DONE: u32 = 1 << 1;
/// Detector STATUS: error
pub const DETECTOR_STATUS_ERROR: u32 = 1 << 2;

/// Corrector STATUS: correcting
pub const CORRECTOR_STATUS_BUSY: u32 = 1 << 0;
/// Corrector STATUS: table accepted
pub const CORRECTOR_STATUS_READY: u32 = 1 << 1;
/// Corrector STATUS: error
pub const CORRECTOR_STATUS_ERROR: u32 = 1 << 2;

/// Auto channel VALID: a detection is waiting in DATA
pub const AUTO_VALID_PENDING: u32 = 1 << 0;
/// Auto channel STATUS: frame detection complete
pub const AUTO_STATUS_FRAME_DONE: u32 = 1 << 0;

/// Bytes between consecutive table entries
pub const TABLE_STRIDE: usize = 4;

/// Detector block registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorRegisters {
    /// Block base address
    pub base: usize,
    /// GO offset
    pub go: usize,
    /// MANUAL_COUNT offset
    pub manual_count: usize,
    /// K_THRESHOLD offset
    pub k_threshold: usize,
    /// STATUS offset
    pub status: usize,
    /// First MANUAL_TABLE entry offset
    pub manual_table: usize,
}

impl DetectorRegisters {
    /// GO address
    pub const fn go_addr(&self) -> usize {
        self.base + self.go
    }

    /// MANUAL_COUNT address
    pub const fn manual_count_addr(&self) -> usize {
        self.base + self.manual_count
    }

    /// K_THRESHOLD address
    pub const fn k_threshold_addr(&self) -> usize {
        self.base + self.k_threshold
    }

    /// STATUS address
    pub const fn status_addr(&self) -> usize {
        self.base + self.status
    }

    /// Address of MANUAL_TABLE\[index\]
    pub const fn table_addr(&self, index: usize) -> usize {
        self.base + self.manual_table + index * TABLE_STRIDE
    }
}

impl Default for DetectorRegisters {
    fn default() -> Self {
        Self {
            base: 0xE100_8000,
            go: 0x00,
            manual_count: 0x04,
            k_threshold: 0x08,
            status: 0x0C,
            manual_table: 0x10,
        }
    }
}

/// Corrector block registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectorRegisters {
    /// Block base address
    pub base: usize,
    /// GO offset
    pub go: usize,
    /// ALL_COUNT offset
    pub all_count: usize,
    /// TABLE_READY offset
    pub table_ready: usize,
    /// STATUS offset
    pub status: usize,
    /// First ALL_TABLE entry offset
    pub all_table: usize,
}

impl CorrectorRegisters {
    /// GO address
    pub const fn go_addr(&self) -> usize {
        self.base + self.go
    }

    /// ALL_COUNT address
    pub const fn all_count_addr(&self) -> usize {
        self.base + self.all_count
    }

    /// TABLE_READY address
    pub const fn table_ready_addr(&self) -> usize {
        self.base + self.table_ready
    }

    /// STATUS address
    pub const fn status_addr(&self) -> usize {
        self.base + self.status
    }

    /// Address of ALL_TABLE\[index\]
    pub const fn table_addr(&self, index: usize) -> usize {
        self.base + self.all_table + index * TABLE_STRIDE
    }
}

impl Default for CorrectorRegisters {
    fn default() -> Self {
        Self {
            base: 0xE100_C000,
            go: 0x00,
            all_count: 0x04,
            table_ready: 0x08,
            status: 0x0C,
            all_table: 0x10,
        }
    }
}

/// Automatic detection result registers (GPIO window)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoChannelRegisters {
    /// Window base address
    pub base: usize,
    /// VALID offset
    pub valid: usize,
    /// DATA offset
    pub data: usize,
    /// READY (acknowledge) offset
    pub ready: usize,
    /// STATUS offset
    pub status: usize,
}

impl AutoChannelRegisters {
    /// VALID address
    pub const fn valid_addr(&self) -> usize {
        self.base + self.valid
    }

    /// DATA address
    pub const fn data_addr(&self) -> usize {
        self.base + self.data
    }

    /// READY address
    pub const fn ready_addr(&self) -> usize {
        self.base + self.ready
    }

    /// STATUS address
    pub const fn status_addr(&self) -> usize {
        self.base + self.status
    }
}

impl Default for AutoChannelRegisters {
    // The legacy board firmware read frame-done at VALID + 4, which collides
    // with DATA; the dedicated STATUS register is used instead.
    fn default() -> Self {
        Self {
            base: 0x6000_1000,
            valid: 0x00,
            data: 0x04,
            ready: 0x08,
            status: 0x0C,
        }
    }
}

/// All register windows used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterMap {
    /// Detector block
    pub detector: DetectorRegisters,
    /// Corrector block
    pub corrector: CorrectorRegisters,
    /// Automatic detection result window
    pub auto_channel: AutoChannelRegisters,
}

/// Interrupt lines raised by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqLines {
    /// One detection is waiting in DATA
    pub defect: IrqLine,
    /// Frame scan complete
    pub frame_done: IrqLine,
}

impl Default for IrqLines {
    fn default() -> Self {
        Self {
            defect: IrqLine(16),
            frame_done: IrqLine(17),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addresses() {
        let map = RegisterMap::default();
        assert_eq!(map.detector.go_addr(), 0xE100_8000);
        assert_eq!(map.detector.table_addr(2), 0xE100_8018);
        assert_eq!(map.corrector.table_ready_addr(), 0xE100_C008);
        assert_eq!(map.corrector.table_addr(511), 0xE100_C010 + 511 * 4);
        assert_eq!(map.auto_channel.status_addr(), 0x6000_100C);
        assert_ne!(map.auto_channel.status_addr(), map.auto_channel.data_addr());
    }
}

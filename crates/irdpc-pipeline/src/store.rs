// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persistence hook for the manual defect list
//!
//! The pipeline hands the complete list to a [`DefectStore`] after every
//! successful mutation. Where the bytes go (SPI NOR, EEPROM, a host file) is
//! the store's business.

use irdpc_core::{BadPixel, ManualDefectList, Result};

/// Non-volatile storage for the manual list
pub trait DefectStore {
    /// Persist the full list
    fn save(&mut self, manual: &[BadPixel]) -> Result<()>;

    /// Load a previously saved list into `out`; returns the entry count
    fn load(&mut self, out: &mut ManualDefectList) -> Result<usize> {
        out.clear();
        Ok(0)
    }
}

/// Store that keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl DefectStore for NoopStore {
    fn save(&mut self, _manual: &[BadPixel]) -> Result<()> {
        Ok(())
    }
}

impl<S: DefectStore + ?Sized> DefectStore for &mut S {
    fn save(&mut self, manual: &[BadPixel]) -> Result<()> {
        (**self).save(manual)
    }

    fn load(&mut self, out: &mut ManualDefectList) -> Result<usize> {
        (**self).load(out)
    }
}

/// RAM-backed store for host runs and tests
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: ManualDefectList,
    saves: usize,
    fail: bool,
}

#[cfg(feature = "std")]
impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `entries` (extra entries are ignored)
    pub fn with_entries(entries: &[BadPixel]) -> Self {
        let mut store = Self::default();
        for px in entries {
            if store.saved.push(*px).is_err() {
                break;
            }
        }
        store
    }

    /// Make every later `save` fail
    pub fn fail_saves(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// Last saved list
    pub fn saved(&self) -> &[BadPixel] {
        &self.saved
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

#[cfg(feature = "std")]
impl DefectStore for MemoryStore {
    fn save(&mut self, manual: &[BadPixel]) -> Result<()> {
        if self.fail {
            return Err(irdpc_core::DpcError::Persistence("memory store write failed"));
        }
        self.saved.clear();
        for px in manual {
            if self.saved.push(*px).is_err() {
                break;
            }
        }
        self.saves += 1;
        Ok(())
    }

    fn load(&mut self, out: &mut ManualDefectList) -> Result<usize> {
        out.clone_from(&self.saved);
        Ok(out.len())
    }
}

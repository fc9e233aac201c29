// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Memory-mapped platform implementations
//!
//! These are the pieces that run on the target: volatile loads and stores to
//! the accelerator register windows, a free-running hardware counter used as
//! the monotonic clock, and an interrupt controller whose enable/disable/
//! pending registers are themselves memory mapped.

use core::ptr;

use crate::hal::{InterruptController, IrqLine, RegisterPort, TimeProvider};

/// Volatile 32-bit access to physical addresses
#[derive(Debug, Clone, Copy)]
pub struct MmioPort {
    _private: (),
}

impl MmioPort {
    /// Create a port over the physical address space
    ///
    /// # Safety
    /// Every address later passed to [`RegisterPort::read32`] or
    /// [`RegisterPort::write32`] must be a valid, 4-byte aligned device
    /// register on the running platform.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterPort for MmioPort {
    fn read32(&self, addr: usize) -> u32 {
        // SAFETY: guaranteed by the contract of `MmioPort::new`.
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    fn write32(&self, addr: usize, value: u32) {
        // SAFETY: guaranteed by the contract of `MmioPort::new`.
        unsafe { ptr::write_volatile(addr as *mut u32, value) }
    }
}

/// Monotonic clock backed by a 64-bit free-running counter split over two
/// 32-bit registers (e.g. RISC-V `mtime`).
#[derive(Debug, Clone)]
pub struct MmioTimer<P> {
    port: P,
    counter_lo: usize,
    counter_hi: usize,
    ticks_per_us: u32,
}

impl<P: RegisterPort> MmioTimer<P> {
    /// Create a timer reading `counter_lo`/`counter_hi` at `ticks_per_us`
    pub fn new(port: P, counter_lo: usize, counter_hi: usize, ticks_per_us: u32) -> Self {
        Self {
            port,
            counter_lo,
            counter_hi,
            ticks_per_us: ticks_per_us.max(1),
        }
    }

    fn read_ticks(&self) -> u64 {
        // Re-read until the high word is stable across the low-word read.
        loop {
            let hi = self.port.read32(self.counter_hi);
            let lo = self.port.read32(self.counter_lo);
            if self.port.read32(self.counter_hi) == hi {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }
}

impl<P: RegisterPort> TimeProvider for MmioTimer<P> {
    fn get_time_us(&self) -> u64 {
        self.read_ticks() / self.ticks_per_us as u64
    }

    fn delay_us(&self, us: u32) {
        let start = self.get_time_us();
        while self.get_time_us().saturating_sub(start) < us as u64 {
            core::hint::spin_loop();
        }
    }
}

/// Interrupt controller with set-enable / clear-enable / clear-pending
/// register banks (32 lines per word)
#[derive(Debug, Clone)]
pub struct RegisterIrqController<P> {
    port: P,
    base: usize,
    set_enable: usize,
    clear_enable: usize,
    clear_pending: usize,
}

impl<P: RegisterPort> RegisterIrqController<P> {
    /// Default bank offsets of a Cortex-M style controller
    pub const SET_ENABLE_OFFSET: usize = 0x100;
    /// Clear-enable bank offset
    pub const CLEAR_ENABLE_OFFSET: usize = 0x180;
    /// Clear-pending bank offset
    pub const CLEAR_PENDING_OFFSET: usize = 0x280;

    /// Controller at `base` with the default bank offsets
    pub fn new(port: P, base: usize) -> Self {
        Self::with_offsets(
            port,
            base,
            Self::SET_ENABLE_OFFSET,
            Self::CLEAR_ENABLE_OFFSET,
            Self::CLEAR_PENDING_OFFSET,
        )
    }

    /// Controller with explicit bank offsets
    pub fn with_offsets(
        port: P,
        base: usize,
        set_enable: usize,
        clear_enable: usize,
        clear_pending: usize,
    ) -> Self {
        Self {
            port,
            base,
            set_enable,
            clear_enable,
            clear_pending,
        }
    }

    fn bank(&self, offset: usize, line: IrqLine) -> usize {
        self.base + offset + line.word() * 4
    }
}

impl<P: RegisterPort> InterruptController for RegisterIrqController<P> {
    fn enable(&self, line: IrqLine) {
        self.port
            .write32(self.bank(self.set_enable, line), line.mask());
    }

    fn disable(&self, line: IrqLine) {
        self.port
            .write32(self.bank(self.clear_enable, line), line.mask());
    }

    fn clear_pending(&self, line: IrqLine) {
        self.port
            .write32(self.bank(self.clear_pending, line), line.mask());
    }

    fn is_enabled(&self, line: IrqLine) -> bool {
        self.port.read32(self.bank(self.set_enable, line)) & line.mask() != 0
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host-side doubles for the HAL traits
//!
//! Registers are plain memory, the mock clock only moves when something
//! delays on it, and the interrupt controller records every mask operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::hal::{InterruptController, IrqLine, RegisterPort, TimeProvider};

/// Register bank backed by a hash map, with a write log
#[derive(Debug, Default)]
pub struct MockRegisters {
    values: Mutex<HashMap<usize, u32>>,
    writes: Mutex<Vec<(usize, u32)>>,
}

impl MockRegisters {
    /// Empty bank; unwritten registers read as zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value without logging a write
    pub fn get(&self, addr: usize) -> u32 {
        self.values.lock().get(&addr).copied().unwrap_or(0)
    }

    /// Preload a value without logging a write (models the device side)
    pub fn set(&self, addr: usize, value: u32) {
        self.values.lock().insert(addr, value);
    }

    /// Every write issued through [`RegisterPort`], in order
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.writes.lock().clone()
    }

    /// Values written to one address, in order
    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.writes
            .lock()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Number of writes issued so far
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Forget the write log (values are kept)
    pub fn clear_log(&self) {
        self.writes.lock().clear();
    }
}

impl RegisterPort for MockRegisters {
    fn read32(&self, addr: usize) -> u32 {
        self.get(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        self.values.lock().insert(addr, value);
        self.writes.lock().push((addr, value));
    }
}

/// Clock that advances only when delayed on or advanced explicitly
#[derive(Debug, Default)]
pub struct MockClock {
    now_us: AtomicU64,
    delays: AtomicU64,
}

impl MockClock {
    /// Clock starting at t = 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without counting a delay
    pub fn advance_us(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::SeqCst);
    }

    /// Number of `delay_us` calls made so far
    pub fn delay_calls(&self) -> u64 {
        self.delays.load(Ordering::SeqCst)
    }
}

impl TimeProvider for MockClock {
    fn get_time_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }

    fn delay_us(&self, us: u32) {
        self.delays.fetch_add(1, Ordering::SeqCst);
        self.now_us.fetch_add(us as u64, Ordering::SeqCst);
    }
}

/// Wall-clock time source for host runs
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    /// Clock whose zero is "now"
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for StdClock {
    fn get_time_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn delay_us(&self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}

#[derive(Debug, Default)]
struct IrqState {
    enabled: u64,
    disable_calls: u64,
    enable_calls: u64,
    pending_clears: HashMap<u16, u32>,
}

/// Interrupt controller that records masking activity (lines 0..64)
#[derive(Debug, Default)]
pub struct MockInterruptController {
    state: Mutex<IrqState>,
}

impl MockInterruptController {
    /// Controller with every line masked
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `disable` calls so far
    pub fn disable_calls(&self) -> u64 {
        self.state.lock().disable_calls
    }

    /// Number of `enable` calls so far
    pub fn enable_calls(&self) -> u64 {
        self.state.lock().enable_calls
    }

    /// How often `clear_pending` was called for `line`
    pub fn pending_clears(&self, line: IrqLine) -> u32 {
        self.state
            .lock()
            .pending_clears
            .get(&line.0)
            .copied()
            .unwrap_or(0)
    }

    fn bit(line: IrqLine) -> u64 {
        1u64 << (line.0 % 64)
    }
}

impl InterruptController for MockInterruptController {
    fn enable(&self, line: IrqLine) {
        let mut state = self.state.lock();
        state.enabled |= Self::bit(line);
        state.enable_calls += 1;
    }

    fn disable(&self, line: IrqLine) {
        let mut state = self.state.lock();
        state.enabled &= !Self::bit(line);
        state.disable_calls += 1;
    }

    fn clear_pending(&self, line: IrqLine) {
        *self.state.lock().pending_clears.entry(line.0).or_insert(0) += 1;
    }

    fn is_enabled(&self, line: IrqLine) -> bool {
        self.state.lock().enabled & Self::bit(line) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{with_masked, Deadline};

    #[test]
    fn test_mock_registers_log_writes() {
        let regs = MockRegisters::new();
        regs.write32(0x10, 7);
        regs.write32(0x14, 9);
        regs.write32(0x10, 8);
        assert_eq!(regs.read32(0x10), 8);
        assert_eq!(regs.writes_to(0x10), vec![7, 8]);
        assert_eq!(regs.write_count(), 3);
    }

    #[test]
    fn test_set_bits_reads_modifies_writes() {
        let regs = MockRegisters::new();
        regs.set(0x20, 0b0100);
        regs.set_bits(0x20, 0b0001);
        regs.clear_bits(0x20, 0b0100);
        assert_eq!(regs.read32(0x20), 0b0001);
    }

    #[test]
    fn test_deadline_on_mock_clock() {
        let clock = MockClock::new();
        let deadline = Deadline::after(&clock, 3_000);
        assert!(!deadline.expired(&clock));
        clock.delay_ms(2);
        assert!(!deadline.expired(&clock));
        clock.delay_ms(1);
        assert!(deadline.expired(&clock));
        assert_eq!(clock.delay_calls(), 2);
    }

    #[test]
    fn test_mask_guard_restores_previous_state() {
        let irq = MockInterruptController::new();
        let line = IrqLine(16);
        irq.enable(line);

        with_masked(&irq, line, || assert!(!irq.is_enabled(line)));
        assert!(irq.is_enabled(line));

        irq.disable(line);
        with_masked(&irq, line, || {});
        assert!(!irq.is_enabled(line), "masked line must stay masked");
    }
}

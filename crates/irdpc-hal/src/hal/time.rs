// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Time and delay abstraction for embedded platforms
pub trait TimeProvider {
    /// Get current time in microseconds since system boot
    ///
    /// # Returns
    /// Monotonic timestamp in microseconds
    fn get_time_us(&self) -> u64;

    /// Block for the specified number of microseconds
    ///
    /// # Arguments
    /// * `us` - Microseconds to delay
    fn delay_us(&self, us: u32);

    /// Block for the specified number of milliseconds
    ///
    /// # Arguments
    /// * `ms` - Milliseconds to delay
    fn delay_ms(&self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

impl<T: TimeProvider + ?Sized> TimeProvider for &T {
    fn get_time_us(&self) -> u64 {
        (**self).get_time_us()
    }

    fn delay_us(&self, us: u32) {
        (**self).delay_us(us)
    }
}

/// A monotonic deadline measured against a [`TimeProvider`].
///
/// Replaces calibrated busy-loop counters: the bound is elapsed time, not
/// iteration count, so a wait stays bounded regardless of how long each
/// loop body takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start_us: u64,
    budget_us: u64,
}

impl Deadline {
    /// Start a deadline `budget_us` microseconds from now
    pub fn after<T: TimeProvider + ?Sized>(clock: &T, budget_us: u64) -> Self {
        Self {
            start_us: clock.get_time_us(),
            budget_us,
        }
    }

    /// Microseconds elapsed since the deadline was started
    pub fn elapsed_us<T: TimeProvider + ?Sized>(&self, clock: &T) -> u64 {
        clock.get_time_us().saturating_sub(self.start_us)
    }

    /// True once the full budget has elapsed
    pub fn expired<T: TimeProvider + ?Sized>(&self, clock: &T) -> bool {
        self.elapsed_us(clock) >= self.budget_us
    }

    /// Total budget in microseconds
    pub fn budget_us(&self) -> u64 {
        self.budget_us
    }
}

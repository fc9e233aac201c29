// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Interrupt line masking and critical sections.
pub mod interrupt;
/// 32-bit memory-mapped register access.
pub mod registers;
/// Timekeeping abstractions (monotonic timers, delays, deadlines).
pub mod time;

// Re-export trait types
pub use interrupt::{with_masked, InterruptController, IrqLine, IrqMaskGuard};
pub use registers::RegisterPort;
pub use time::{Deadline, TimeProvider};

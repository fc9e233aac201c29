// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Volatile memory-mapped register access, timer and interrupt controller
pub mod mmio;

pub use mmio::{MmioPort, MmioTimer, RegisterIrqController};

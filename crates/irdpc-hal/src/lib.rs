// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # IR-DPC HAL
//!
//! Platform abstraction for the defect-pixel-correction firmware.
//!
//! This crate provides:
//! - **HAL traits** (`hal` module) - 32-bit register access, monotonic time, interrupt masking
//! - **Platform implementations** (`platforms` module) - volatile MMIO access and a register-mapped timer
//! - **Host mocks** (`mock` module, `std` feature) - in-memory registers, controllable clocks
//!
//! ## Usage
//!
//! ```no_run
//! use irdpc_hal::prelude::*;
//!
//! // SAFETY: the detector block is mapped at this address on the target board.
//! let port = unsafe { MmioPort::new() };
//! port.write32(0xE100_8000, 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` - host mocks (`MockRegisters`, `MockClock`, `StdClock`, `MockInterruptController`)

/// Hardware abstraction traits shared by all platforms.
pub mod hal;

/// Concrete platform implementations.
pub mod platforms;

/// In-memory doubles for host-side testing.
#[cfg(feature = "std")]
pub mod mock;

pub use hal::{
    with_masked, Deadline, InterruptController, IrqLine, IrqMaskGuard, RegisterPort, TimeProvider,
};
pub use platforms::{MmioPort, MmioTimer, RegisterIrqController};

#[cfg(feature = "std")]
pub use mock::{MockClock, MockInterruptController, MockRegisters, StdClock};

/// Prelude module for convenient imports
///
/// ```no_run
/// use irdpc_hal::prelude::*;
/// ```
pub mod prelude {
    pub use crate::hal::*;
    pub use crate::platforms::*;

    #[cfg(feature = "std")]
    pub use crate::mock::*;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

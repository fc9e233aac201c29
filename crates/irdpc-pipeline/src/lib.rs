// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # IR-DPC Pipeline
//!
//! Orchestrates the defect detector and corrector accelerator blocks.
//!
//! This crate provides:
//! - **Drivers** (`drivers`) - detector and corrector register contracts
//! - **Channels** (`channel`) - polling and interrupt delivery of automatic detections
//! - **Orchestrator** (`orchestrator`) - the frame-cycle state machine
//! - **Persistence hook** (`store`) - where the manual list goes after each change
//! - **Simulator** (`sim`, `std` feature) - register-level model of the hardware
//!
//! ## Usage
//!
//! ```
//! use irdpc_core::DefectCategory;
//! use irdpc_hal::MockClock;
//! use irdpc_pipeline::prelude::*;
//!
//! let sim = SimulatedDpc::new(RegisterMap::default());
//! let clock = MockClock::new();
//! let settings = PipelineSettings::default();
//! let channel = PollingChannel::new(
//!     &sim,
//!     &clock,
//!     settings.registers.auto_channel,
//!     settings.geometry,
//!     settings.timing.tick_us,
//!     settings.timing.ack_pulse_us,
//! );
//!
//! let mut dpc = DpcPipeline::new(&sim, channel, NoopStore, &clock, settings).unwrap();
//! dpc.init();
//! dpc.add_manual_defect(50, 100, DefectCategory::Manual).unwrap();
//! sim.schedule_detections(&[irdpc_core::BadPixel::new(10, 10, DefectCategory::Stuck)]);
//!
//! let stats = dpc.run_frame_cycle().unwrap();
//! assert_eq!(stats.merged_total, 2);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default) - `std::error::Error` for errors, `MemoryStore`, the simulator

pub mod channel;
pub mod config;
pub mod drivers;
pub mod orchestrator;
pub mod registers;
pub mod status;
pub mod store;

#[cfg(feature = "std")]
pub mod sim;

pub use channel::{
    AutoDefectChannel, ChannelMode, ChannelSelector, DefectMailbox, DrainOutcome,
    InterruptChannel, InterruptStats, IrqEvent, IrqHandler, PollingChannel,
};
pub use config::{
    validate_threshold, PipelineSettings, PipelineTiming, SystemConfig, K_THRESHOLD_DEFAULT,
    K_THRESHOLD_MAX, K_THRESHOLD_MIN,
};
pub use drivers::{BlockStatus, CorrectorDriver, DetectorDriver};
pub use orchestrator::DpcPipeline;
pub use registers::{
    AutoChannelRegisters, CorrectorRegisters, DetectorRegisters, IrqLines, RegisterMap,
};
pub use status::{FrameStats, PipelineState, SystemStatus};
pub use store::{DefectStore, NoopStore};

#[cfg(feature = "std")]
pub use sim::{IrqPumpClock, SimulatedDpc};
#[cfg(feature = "std")]
pub use store::MemoryStore;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::channel::*;
    pub use crate::config::*;
    pub use crate::drivers::*;
    pub use crate::orchestrator::*;
    pub use crate::registers::{
        AutoChannelRegisters, CorrectorRegisters, DetectorRegisters, IrqLines, RegisterMap,
    };
    pub use crate::status::*;
    pub use crate::store::*;

    #[cfg(feature = "std")]
    pub use crate::sim::*;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

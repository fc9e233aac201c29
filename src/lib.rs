// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # irdpc - defective-pixel correction for infrared sensors
//!
//! The pipeline finds dead and stuck pixels with an on-chip detector, merges
//! them with an operator-maintained manual list, and uploads the result to
//! the on-chip corrector once per frame.
//!
//! ## Crates
//!
//! - [`hal`]: register, timer and interrupt abstractions (`no_std`)
//! - [`dpc_core`]: bad-pixel types, ring buffer, list merging (`no_std`)
//! - [`pipeline`]: drivers, detection channels, orchestrator (`no_std` + `std`)
//! - [`config`]: `dpc_configuration.toml` loader
//! - [`observability`]: logging setup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use irdpc::prelude::*;
//!
//! let config = irdpc::config::load_config(None, None)?;
//! let settings = irdpc::pipeline_settings(&config);
//!
//! let sim = SimulatedDpc::new(settings.registers);
//! let clock = MockClock::new();
//! let channel = PollingChannel::new(
//!     &sim,
//!     &clock,
//!     settings.registers.auto_channel,
//!     settings.geometry,
//!     settings.timing.tick_us,
//!     settings.timing.ack_pulse_us,
//! );
//! let mut dpc = DpcPipeline::new(&sim, channel, NoopStore, &clock, settings)?;
//! dpc.init();
//! let stats = dpc.run_frame_cycle()?;
//! println!("{} entries uploaded", stats.merged_total);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod settings;

// Re-export foundation
pub use irdpc_core as dpc_core;
pub use irdpc_hal as hal;

// Re-export the pipeline
pub use irdpc_pipeline as pipeline;

// Re-export host infrastructure
pub use irdpc_config as config;
pub use irdpc_observability as observability;

pub use settings::{
    channel_mode, irq_lines, pipeline_settings, pipeline_timing, register_map, system_config,
};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::dpc_core::{BadPixel, DefectCategory, DpcError, FrameGeometry, MergeOptions};
    pub use crate::hal::{
        InterruptController, IrqLine, MockClock, MockInterruptController, RegisterPort, StdClock,
        TimeProvider,
    };
    pub use crate::pipeline::prelude::*;
}

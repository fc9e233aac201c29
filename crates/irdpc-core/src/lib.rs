// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # IR-DPC Core
//!
//! Platform-agnostic building blocks of the defect-pixel-correction pipeline.
//!
//! This crate provides:
//! - **Types**: `BadPixel`, `DefectCategory`, `FrameGeometry` and the bounded
//!   defect lists (`ManualDefectList`, `AutoDefectBatch`, `MergedDefectList`)
//! - **Ring buffer**: fixed-capacity FIFO with drop-newest overflow accounting
//! - **Merger**: manual/automatic list merge with manual precedence and
//!   row-major ordering
//! - **Errors**: `DpcError`, shared by every layer above
//!
//! Everything is fixed-capacity (`heapless`); nothing allocates.
//!
//! ## Usage
//!
//! ```rust
//! use irdpc_core::{merge_defect_lists, BadPixel, DefectCategory};
//!
//! let manual = [BadPixel::manual(50, 100)];
//! let auto = [
//!     BadPixel::new(50, 100, DefectCategory::Dead),
//!     BadPixel::new(10, 10, DefectCategory::Stuck),
//! ];
//!
//! let report = merge_defect_lists(&manual, &auto);
//! assert_eq!(report.merged.len(), 2);
//! assert_eq!(report.merged[0], BadPixel::new(10, 10, DefectCategory::Stuck));
//! ```

#![no_std]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod merge;
pub mod ring_buffer;
pub mod types;

pub use error::{DpcError, Result};
pub use merge::{merge, merge_defect_lists, sort_row_major, MergeOptions, MergeReport};
pub use ring_buffer::RingBuffer;
pub use types::{
    AutoDefectBatch, BadPixel, DefectCategory, DefectList, FrameGeometry, ManualDefectList,
    MergedDefectList,
};

/// Sensor frame width in pixels
pub const FRAME_WIDTH: u16 = 640;

/// Sensor frame height in pixels
pub const FRAME_HEIGHT: u16 = 512;

/// Capacity of the persistent manual defect list
pub const MAX_MANUAL: usize = 128;

/// Capacity of one frame's automatic detection batch
pub const MAX_AUTO: usize = 256;

/// Capacity of the merged table programmed into the corrector
pub const MAX_ALL: usize = 512;

/// Capacity of the interrupt-fed detection ring buffer
pub const AUTO_BUFFER_SIZE: usize = 512;

/// Confidence assigned to hardware detections and manual entries
pub const FULL_CONFIDENCE: u8 = 255;

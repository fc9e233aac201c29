// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bad-pixel value types and bounded defect lists

use core::cmp::Ordering;
use core::fmt;

use crate::error::{DpcError, Result};
use crate::{FRAME_HEIGHT, FRAME_WIDTH, FULL_CONFIDENCE, MAX_ALL, MAX_AUTO, MAX_MANUAL};

/// Packed detection word: bit 31 marks a valid sample
pub const DETECTION_VALID_BIT: u32 = 1 << 31;
/// Packed detection word: bit 26 set means stuck, clear means dead
pub const DETECTION_TYPE_BIT: u32 = 1 << 26;
/// Packed detection word: x coordinate, bits 25:16
pub const DETECTION_X_MASK: u32 = 0x03FF_0000;
/// Packed detection word: y coordinate, bits 9:0
pub const DETECTION_Y_MASK: u32 = 0x0000_03FF;

/// Why a pixel is on a defect list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DefectCategory {
    /// Pixel with no response (detector k = 0)
    Dead = 0,
    /// Pixel whose response deviates strongly from its neighbours
    Stuck = 1,
    /// Operator- or factory-curated entry
    Manual = 2,
}

impl DefectCategory {
    /// Numeric code used on the wire and in persisted lists
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a numeric category code
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DefectCategory::Dead),
            1 => Some(DefectCategory::Stuck),
            2 => Some(DefectCategory::Manual),
            _ => None,
        }
    }

    /// Human-readable name
    pub const fn name(self) -> &'static str {
        match self {
            DefectCategory::Dead => "Dead",
            DefectCategory::Stuck => "Stuck",
            DefectCategory::Manual => "Manual",
        }
    }
}

impl fmt::Display for DefectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One defective pixel coordinate
///
/// Structural equality (`==`) compares every field. Deduplication compares
/// coordinates only; use [`BadPixel::same_site`] for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BadPixel {
    /// Column, `0 <= x < frame width`
    pub x: u16,
    /// Row, `0 <= y < frame height`
    pub y: u16,
    /// Why the pixel is listed
    pub category: DefectCategory,
    /// Detection confidence (0-255)
    pub confidence: u8,
}

impl BadPixel {
    /// Placeholder used to initialise fixed storage
    pub const EMPTY: BadPixel = BadPixel::new(0, 0, DefectCategory::Dead);

    /// Create a bad pixel with full confidence
    pub const fn new(x: u16, y: u16, category: DefectCategory) -> Self {
        Self {
            x,
            y,
            category,
            confidence: FULL_CONFIDENCE,
        }
    }

    /// Create a manual entry
    pub const fn manual(x: u16, y: u16) -> Self {
        Self::new(x, y, DefectCategory::Manual)
    }

    /// Same coordinate, regardless of category and confidence
    pub const fn same_site(&self, other: &BadPixel) -> bool {
        self.x == other.x && self.y == other.y
    }

    /// Table register format: `(x << 16) | y`
    pub const fn pack(&self) -> u32 {
        ((self.x as u32) << 16) | self.y as u32
    }

    /// Decode a detection data word (x bits 25:16, y bits 9:0, type bit 26).
    ///
    /// The valid bit is not inspected; see [`BadPixel::is_valid_detection`].
    pub const fn from_detection(word: u32) -> Self {
        let x = ((word & DETECTION_X_MASK) >> 16) as u16;
        let y = (word & DETECTION_Y_MASK) as u16;
        let category = if word & DETECTION_TYPE_BIT != 0 {
            DefectCategory::Stuck
        } else {
            DefectCategory::Dead
        };
        Self::new(x, y, category)
    }

    /// Whether a detection data word carries the valid bit
    pub const fn is_valid_detection(word: u32) -> bool {
        word & DETECTION_VALID_BIT != 0
    }

    /// Encode as a detection data word with the valid bit set
    pub const fn to_detection(&self) -> u32 {
        let type_bit = match self.category {
            DefectCategory::Stuck => DETECTION_TYPE_BIT,
            _ => 0,
        };
        DETECTION_VALID_BIT
            | (((self.x as u32) << 16) & DETECTION_X_MASK)
            | type_bit
            | (self.y as u32 & DETECTION_Y_MASK)
    }

    /// Row-major order: y, then x. Category and confidence break the
    /// remaining ties so that the order is total.
    pub fn row_major_cmp(&self, other: &BadPixel) -> Ordering {
        self.y
            .cmp(&other.y)
            .then(self.x.cmp(&other.x))
            .then(self.category.cmp(&other.category))
            .then(self.confidence.cmp(&other.confidence))
    }
}

impl fmt::Display for BadPixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:3}, {:3}) {} (conf: {})",
            self.x, self.y, self.category, self.confidence
        )
    }
}

/// Fixed-capacity defect list
pub type DefectList<const N: usize> = heapless::Vec<BadPixel, N>;

/// Persistent, operator-curated list
pub type ManualDefectList = DefectList<MAX_MANUAL>;

/// One frame's automatic detections
pub type AutoDefectBatch = DefectList<MAX_AUTO>;

/// Deduplicated, row-major table programmed into the corrector
pub type MergedDefectList = DefectList<MAX_ALL>;

/// Sensor frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
}

impl FrameGeometry {
    /// Geometry with explicit dimensions
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Whether `(x, y)` lies inside the frame
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Reject coordinates outside the frame
    pub fn validate(&self, x: u16, y: u16) -> Result<()> {
        if self.contains(x, y) {
            Ok(())
        } else {
            Err(DpcError::Param("coordinate outside the frame"))
        }
    }

    /// Total pixel count
    pub const fn pixel_count(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Percentage of the frame covered by `defects` entries
    pub fn bad_pixel_ratio(&self, defects: usize) -> f32 {
        match self.pixel_count() {
            0 => 0.0,
            total => defects as f32 * 100.0 / total as f32,
        }
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self::new(FRAME_WIDTH, FRAME_HEIGHT)
    }
}

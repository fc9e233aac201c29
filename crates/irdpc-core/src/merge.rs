// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Manual/automatic defect list merging
//!
//! Manual entries always win: an automatic detection at a coordinate that is
//! already on the manual list is discarded. Automatic entries are not
//! deduplicated against each other unless
//! [`MergeOptions::collapse_auto_duplicates`] is set.
//!
//! The output is sorted by `(y, x)`. Remaining ties are broken by category
//! and confidence, so the result does not depend on the order in which the
//! automatic detections arrived.

use crate::error::DpcError;
use crate::types::{BadPixel, DefectList};
use crate::MAX_ALL;

/// Merge behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    /// Collapse repeated automatic coordinates to a single entry.
    ///
    /// The survivor at each site is the entry that sorts first (category,
    /// then confidence), not the first to arrive, so the output still does
    /// not depend on arrival order. Off by default: two detections of the
    /// same pixel in one frame both reach the corrector table.
    pub collapse_auto_duplicates: bool,
}

/// Result of one merge, with the drop counters
#[derive(Debug, Clone)]
pub struct MergeReport<const N: usize> {
    /// Sorted output table
    pub merged: DefectList<N>,
    /// Manual entries copied into `merged`
    pub manual_kept: usize,
    /// Automatic entries copied into `merged`
    pub auto_kept: usize,
    /// Automatic entries dropped as duplicates
    pub duplicates_dropped: usize,
    /// Entries dropped because `merged` was full
    pub overflow_dropped: usize,
}

impl<const N: usize> MergeReport<N> {
    /// `Overflow` if any entry was truncated
    pub fn overflow(&self) -> Option<DpcError> {
        if self.overflow_dropped > 0 {
            Some(DpcError::Overflow {
                what: "merged defect list",
                capacity: N,
            })
        } else {
            None
        }
    }
}

/// Sort in place by `(y, x)` with a total tie-break
pub fn sort_row_major(pixels: &mut [BadPixel]) {
    pixels.sort_unstable_by(|a, b| a.row_major_cmp(b));
}

/// Merge `manual` and `auto` into a table of capacity `N`
pub fn merge<const N: usize>(
    manual: &[BadPixel],
    auto: &[BadPixel],
    options: MergeOptions,
) -> MergeReport<N> {
    let mut merged: DefectList<N> = DefectList::new();
    let mut manual_kept: usize = 0;
    let mut auto_kept: usize = 0;
    let mut duplicates_dropped: usize = 0;
    let mut overflow_dropped: usize = 0;

    for px in manual {
        if merged.push(*px).is_ok() {
            manual_kept += 1;
        } else {
            overflow_dropped += 1;
        }
    }

    for px in auto {
        // O(n*m) scan; both lists are a few hundred entries at most
        if manual.iter().any(|m| m.same_site(px)) {
            duplicates_dropped += 1;
            continue;
        }
        if merged.push(*px).is_ok() {
            auto_kept += 1;
        } else {
            overflow_dropped += 1;
        }
    }

    sort_row_major(&mut merged);

    if options.collapse_auto_duplicates {
        let before = merged.len();
        collapse_same_site(&mut merged);
        let collapsed = before - merged.len();
        auto_kept = auto_kept.saturating_sub(collapsed);
        duplicates_dropped += collapsed;
    }

    MergeReport {
        merged,
        manual_kept,
        auto_kept,
        duplicates_dropped,
        overflow_dropped,
    }
}

/// Merge into a [`MAX_ALL`] table with default options
pub fn merge_defect_lists(manual: &[BadPixel], auto: &[BadPixel]) -> MergeReport<MAX_ALL> {
    merge(manual, auto, MergeOptions::default())
}

// Keeps the first entry of each run of equal coordinates in a sorted list,
// i.e. the lowest in `row_major_cmp` order.
// Manual entries never share a site with a kept automatic entry, so only
// automatic entries are removed here.
fn collapse_same_site<const N: usize>(list: &mut DefectList<N>) {
    let mut write = 0;
    for read in 0..list.len() {
        if write > 0 && list[write - 1].same_site(&list[read]) {
            continue;
        }
        list[write] = list[read];
        write += 1;
    }
    list.truncate(write);
}

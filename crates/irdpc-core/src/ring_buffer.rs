// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-capacity FIFO for interrupt-delivered detections
//!
//! Uses a stack-allocated array for predictable memory usage. When full, the
//! incoming value is dropped and counted; existing entries are never
//! overwritten and a push never blocks.

use crate::error::{DpcError, Result};

/// Fixed-capacity circular buffer
///
/// `head` and `tail` are free-running counters; slots are addressed modulo
/// `N`. The buffer therefore holds exactly `N` entries when full (no
/// sacrificial slot) and `len() == head - tail` (wrapping) at all times.
pub struct RingBuffer<T: Copy, const N: usize> {
    slots: [T; N],
    head: usize,
    tail: usize,
    lost: u32,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Empty buffer whose slots are initialised with `fill`
    pub const fn new(fill: T) -> Self {
        Self {
            slots: [fill; N],
            head: 0,
            tail: 0,
            lost: 0,
        }
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail)
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// True when a push would be dropped
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Maximum number of buffered entries
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Values dropped on overflow since creation (or the last reset)
    pub fn lost_count(&self) -> u32 {
        self.lost
    }

    /// Append `value`; on overflow the value is dropped and counted
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.is_full() {
            self.lost = self.lost.wrapping_add(1);
            return Err(DpcError::Overflow {
                what: "ring buffer",
                capacity: N,
            });
        }
        self.slots[self.head % N] = value;
        self.head = self.head.wrapping_add(1);
        Ok(())
    }

    /// Remove the oldest entry
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.tail % N];
        self.tail = self.tail.wrapping_add(1);
        Some(value)
    }

    /// Oldest entry without removing it
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            Some(&self.slots[self.tail % N])
        }
    }

    /// Move every entry, oldest first, into `out`.
    ///
    /// The buffer is empty afterwards. Entries that do not fit in `out` are
    /// discarded; the number discarded is returned.
    pub fn drain_into<const M: usize>(&mut self, out: &mut heapless::Vec<T, M>) -> usize {
        let mut discarded = 0;
        while let Some(value) = self.pop() {
            if out.push(value).is_err() {
                discarded += 1;
            }
        }
        discarded
    }

    /// Drop every buffered entry (the lost counter is kept)
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    /// Zero the lost counter
    pub fn reset_lost_count(&mut self) {
        self.lost = 0;
    }

    /// Buffered entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).map(move |i| &self.slots[self.tail.wrapping_add(i) % N])
    }

    /// Get memory footprint in bytes
    pub const fn memory_footprint() -> usize {
        core::mem::size_of::<Self>()
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BadPixel, DefectCategory};
    use crate::AUTO_BUFFER_SIZE;

    fn pixel(i: usize) -> BadPixel {
        BadPixel::new((i % 640) as u16, (i / 640) as u16, DefectCategory::Dead)
    }

    #[test]
    fn test_fifo_order() {
        let mut ring = RingBuffer::<u32, 4>::new(0);
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        ring.push(3).unwrap();
        assert_eq!(ring.pop(), Some(1));
        ring.push(4).unwrap();
        ring.push(5).unwrap();
        let drained: heapless::Vec<u32, 8> = ring.iter().copied().collect();
        assert_eq!(drained.as_slice(), &[2, 3, 4, 5]);
    }

    #[test]
    fn test_exact_capacity_loses_nothing() {
        let mut ring = RingBuffer::<BadPixel, AUTO_BUFFER_SIZE>::new(BadPixel::EMPTY);
        for i in 0..512 {
            ring.push(pixel(i)).unwrap();
        }
        assert_eq!(ring.len(), 512);
        assert_eq!(ring.lost_count(), 0);
        assert!(ring.is_full());
    }

    #[test]
    fn test_overflow_drops_newest() {
        let mut ring = RingBuffer::<BadPixel, AUTO_BUFFER_SIZE>::new(BadPixel::EMPTY);
        for i in 0..513 {
            let _ = ring.push(pixel(i));
        }
        assert_eq!(ring.len(), 512);
        assert_eq!(ring.lost_count(), 1);
        // the oldest entry survived, the 513th was dropped
        assert_eq!(ring.peek(), Some(&pixel(0)));
        assert!(ring.iter().all(|p| *p != pixel(512)));
    }

    #[test]
    fn test_push_on_full_reports_overflow() {
        let mut ring = RingBuffer::<u8, 1>::new(0);
        ring.push(1).unwrap();
        assert_eq!(
            ring.push(2),
            Err(DpcError::Overflow {
                what: "ring buffer",
                capacity: 1
            })
        );
        assert_eq!(ring.pop(), Some(1));
    }

    #[test]
    fn test_drain_into_respects_output_capacity() {
        let mut ring = RingBuffer::<u16, 8>::new(0);
        for v in 0..6 {
            ring.push(v).unwrap();
        }
        let mut out: heapless::Vec<u16, 4> = heapless::Vec::new();
        assert_eq!(ring.drain_into(&mut out), 2);
        assert_eq!(out.as_slice(), &[0, 1, 2, 3]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_clear_keeps_lost_count() {
        let mut ring = RingBuffer::<u8, 2>::new(0);
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        let _ = ring.push(3);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.lost_count(), 1);
        ring.reset_lost_count();
        assert_eq!(ring.lost_count(), 0);
    }

    #[test]
    fn test_indices_wrap_around_many_cycles() {
        let mut ring = RingBuffer::<u32, 3>::new(0);
        for v in 0..1000u32 {
            ring.push(v).unwrap();
            assert_eq!(ring.pop(), Some(v));
        }
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
    }
}

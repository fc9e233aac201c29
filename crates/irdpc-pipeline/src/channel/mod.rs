// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Delivery of automatic detections from the detector to software
//!
//! Two strategies share one contract: [`PollingChannel`] reads the result
//! registers in a bounded loop, [`InterruptChannel`] drains a ring buffer
//! filled by interrupt handlers. The strategy is chosen once when the
//! pipeline is built, either statically (a concrete type) or at runtime
//! through [`ChannelSelector`].

pub mod interrupt;
pub mod polling;

pub use interrupt::{DefectMailbox, InterruptChannel, IrqEvent, IrqHandler};
pub use polling::PollingChannel;

use core::fmt;

use irdpc_core::AutoDefectBatch;
use irdpc_hal::{InterruptController, RegisterPort, TimeProvider};

/// Which delivery strategy a channel implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Busy-poll the VALID/DATA/STATUS registers
    #[default]
    Polling,
    /// Interrupt handlers feed a ring buffer
    Interrupt,
}

impl ChannelMode {
    /// Mode name for logs and configuration files
    pub const fn name(self) -> &'static str {
        match self {
            ChannelMode::Polling => "polling",
            ChannelMode::Interrupt => "interrupt",
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one [`AutoDefectChannel::drain`]
#[derive(Debug, Clone)]
pub struct DrainOutcome {
    /// Detections collected for this frame, in arrival order
    pub batch: AutoDefectBatch,
    /// False when the wait ran out before the frame completed
    pub completed: bool,
    /// Ticks spent waiting
    pub elapsed_ticks: u32,
    /// Detections dropped this frame because the batch was full
    pub overflow_dropped: usize,
}

impl DrainOutcome {
    pub(crate) fn timed_out(elapsed_ticks: u32) -> Self {
        Self {
            batch: AutoDefectBatch::new(),
            completed: false,
            elapsed_ticks,
            overflow_dropped: 0,
        }
    }
}

/// Delivery counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptStats {
    /// Detections accepted (enqueued or appended)
    pub accepted: u32,
    /// New-defect interrupts handled
    pub defect_irqs: u32,
    /// Frame-done interrupts handled
    pub frame_done_irqs: u32,
    /// Detections dropped on overflow
    pub lost: u32,
    /// Detections discarded as invalid or outside the frame
    pub rejected: u32,
    /// Detections currently buffered
    pub buffered: u32,
}

impl InterruptStats {
    /// Every interrupt handled, of either kind
    pub fn total_irqs(&self) -> u32 {
        self.defect_irqs.wrapping_add(self.frame_done_irqs)
    }
}

/// How automatic detections reach the orchestrator
pub trait AutoDefectChannel {
    /// Strategy implemented by this channel
    fn mode(&self) -> ChannelMode;

    /// Prepare the delivery path (unmask interrupt lines)
    fn enable(&mut self) {}

    /// Shut the delivery path (mask interrupt lines)
    fn disable(&mut self) {}

    /// Discard leftovers from a previous frame
    fn start_frame(&mut self);

    /// Collect this frame's detections, waiting at most `timeout_ticks`
    fn drain(&mut self, timeout_ticks: u32) -> DrainOutcome;

    /// Detections lost to overflow since the channel was created or since
    /// the last [`reset_counters`](Self::reset_counters)
    fn lost_count(&self) -> u32;

    /// Zero the lost count and the delivery counters
    fn reset_counters(&mut self);

    /// Delivery counters
    fn interrupt_stats(&self) -> InterruptStats {
        InterruptStats {
            lost: self.lost_count(),
            ..InterruptStats::default()
        }
    }
}

/// A channel whose strategy is picked at runtime, then fixed
pub enum ChannelSelector<'a, P, I, T> {
    /// Polling strategy
    Polling(PollingChannel<P, T>),
    /// Interrupt strategy
    Interrupt(InterruptChannel<'a, P, I, T>),
}

impl<'a, P, I, T> AutoDefectChannel for ChannelSelector<'a, P, I, T>
where
    P: RegisterPort,
    I: InterruptController,
    T: TimeProvider,
{
    fn mode(&self) -> ChannelMode {
        match self {
            ChannelSelector::Polling(c) => c.mode(),
            ChannelSelector::Interrupt(c) => c.mode(),
        }
    }

    fn enable(&mut self) {
        match self {
            ChannelSelector::Polling(c) => c.enable(),
            ChannelSelector::Interrupt(c) => c.enable(),
        }
    }

    fn disable(&mut self) {
        match self {
            ChannelSelector::Polling(c) => c.disable(),
            ChannelSelector::Interrupt(c) => c.disable(),
        }
    }

    fn start_frame(&mut self) {
        match self {
            ChannelSelector::Polling(c) => c.start_frame(),
            ChannelSelector::Interrupt(c) => c.start_frame(),
        }
    }

    fn drain(&mut self, timeout_ticks: u32) -> DrainOutcome {
        match self {
            ChannelSelector::Polling(c) => c.drain(timeout_ticks),
            ChannelSelector::Interrupt(c) => c.drain(timeout_ticks),
        }
    }

    fn lost_count(&self) -> u32 {
        match self {
            ChannelSelector::Polling(c) => c.lost_count(),
            ChannelSelector::Interrupt(c) => c.lost_count(),
        }
    }

    fn reset_counters(&mut self) {
        match self {
            ChannelSelector::Polling(c) => c.reset_counters(),
            ChannelSelector::Interrupt(c) => c.reset_counters(),
        }
    }

    fn interrupt_stats(&self) -> InterruptStats {
        match self {
            ChannelSelector::Polling(c) => c.interrupt_stats(),
            ChannelSelector::Interrupt(c) => c.interrupt_stats(),
        }
    }
}

impl<C: AutoDefectChannel + ?Sized> AutoDefectChannel for &mut C {
    fn mode(&self) -> ChannelMode {
        (**self).mode()
    }

    fn enable(&mut self) {
        (**self).enable()
    }

    fn disable(&mut self) {
        (**self).disable()
    }

    fn start_frame(&mut self) {
        (**self).start_frame()
    }

    fn drain(&mut self, timeout_ticks: u32) -> DrainOutcome {
        (**self).drain(timeout_ticks)
    }

    fn lost_count(&self) -> u32 {
        (**self).lost_count()
    }

    fn reset_counters(&mut self) {
        (**self).reset_counters()
    }

    fn interrupt_stats(&self) -> InterruptStats {
        (**self).interrupt_stats()
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Interrupt strategy: handlers enqueue, the orchestrator drains
//!
//! The ring buffer lives in a [`DefectMailbox`], normally a `static`, shared
//! by the two interrupt handlers ([`IrqHandler`]) and the consuming
//! [`InterruptChannel`]. Every ring access happens with the new-defect line
//! masked; on a single core that alone excludes the producer. The spin lock
//! inside only guards against misuse from a second core or a host thread
//! and is never contended on the target.

use atomic_polyfill::{AtomicBool, AtomicU32, Ordering};
use irdpc_core::{AutoDefectBatch, BadPixel, FrameGeometry, RingBuffer, AUTO_BUFFER_SIZE};
use irdpc_hal::{with_masked, Deadline, InterruptController, RegisterPort, TimeProvider};
use spin::Mutex;
use tracing::{debug, trace, warn};

use super::{AutoDefectChannel, ChannelMode, DrainOutcome, InterruptStats};
use crate::registers::{AutoChannelRegisters, IrqLines};

/// Interrupt sources raised by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqEvent {
    /// One detection is waiting in DATA
    NewDefect,
    /// The frame scan finished
    FrameDone,
}

/// State shared between interrupt handlers and the draining channel
pub struct DefectMailbox {
    ring: Mutex<RingBuffer<BadPixel, AUTO_BUFFER_SIZE>>,
    frame_done: AtomicBool,
    accepted: AtomicU32,
    defect_irqs: AtomicU32,
    frame_done_irqs: AtomicU32,
    rejected: AtomicU32,
}

impl DefectMailbox {
    /// Empty mailbox, usable in a `static`
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(BadPixel::EMPTY)),
            frame_done: AtomicBool::new(false),
            accepted: AtomicU32::new(0),
            defect_irqs: AtomicU32::new(0),
            frame_done_irqs: AtomicU32::new(0),
            rejected: AtomicU32::new(0),
        }
    }

    /// Whether the frame-done interrupt fired since the last drain
    pub fn is_frame_done(&self) -> bool {
        self.frame_done.load(Ordering::Acquire)
    }
}

impl Default for DefectMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-context half: call from the vector table
pub struct IrqHandler<'a, P, I> {
    mailbox: &'a DefectMailbox,
    port: P,
    irq: I,
    regs: AutoChannelRegisters,
    lines: IrqLines,
    geometry: FrameGeometry,
}

impl<'a, P: RegisterPort, I: InterruptController> IrqHandler<'a, P, I> {
    /// Handler pair feeding `mailbox`
    pub fn new(
        mailbox: &'a DefectMailbox,
        port: P,
        irq: I,
        regs: AutoChannelRegisters,
        lines: IrqLines,
        geometry: FrameGeometry,
    ) -> Self {
        Self {
            mailbox,
            port,
            irq,
            regs,
            lines,
            geometry,
        }
    }

    /// New-defect interrupt: decode DATA, enqueue, acknowledge.
    ///
    /// Never blocks; a full ring drops the detection and counts it.
    pub fn on_new_defect(&self) {
        self.mailbox.defect_irqs.fetch_add(1, Ordering::Relaxed);
        let word = self.port.read32(self.regs.data_addr());

        let px = BadPixel::from_detection(word);
        if !BadPixel::is_valid_detection(word) || !self.geometry.contains(px.x, px.y) {
            self.mailbox.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(word, "discarding invalid detection");
        } else {
            let pushed = with_masked(&self.irq, self.lines.defect, || {
                self.mailbox.ring.lock().push(px)
            });
            match pushed {
                Ok(()) => {
                    self.mailbox.accepted.fetch_add(1, Ordering::Relaxed);
                    trace!(x = px.x, y = px.y, "detection enqueued");
                }
                Err(_) => warn!(x = px.x, y = px.y, "defect ring full, detection dropped"),
            }
        }

        self.port.write32(self.regs.ready_addr(), 1);
        self.irq.clear_pending(self.lines.defect);
    }

    /// Frame-done interrupt: raise the flag, drop READY.
    ///
    /// Does not touch the ring.
    pub fn on_frame_done(&self) {
        self.mailbox.frame_done_irqs.fetch_add(1, Ordering::Relaxed);
        self.mailbox.frame_done.store(true, Ordering::Release);
        self.port.write32(self.regs.ready_addr(), 0);
        self.irq.clear_pending(self.lines.frame_done);
    }

    /// Whether the line raising `event` is unmasked
    pub fn is_unmasked(&self, event: IrqEvent) -> bool {
        let line = match event {
            IrqEvent::NewDefect => self.lines.defect,
            IrqEvent::FrameDone => self.lines.frame_done,
        };
        self.irq.is_enabled(line)
    }

    /// Route `event` to its handler
    pub fn dispatch(&self, event: IrqEvent) {
        match event {
            IrqEvent::NewDefect => self.on_new_defect(),
            IrqEvent::FrameDone => self.on_frame_done(),
        }
    }
}

/// Main-context half: waits for frame done and drains the ring
pub struct InterruptChannel<'a, P, I, T> {
    mailbox: &'a DefectMailbox,
    port: P,
    irq: I,
    clock: T,
    regs: AutoChannelRegisters,
    lines: IrqLines,
    tick_us: u32,
    drain_overflow: u32,
}

impl<'a, P, I, T> InterruptChannel<'a, P, I, T>
where
    P: RegisterPort,
    I: InterruptController,
    T: TimeProvider,
{
    /// Consumer over `mailbox`, polling the frame-done flag every `tick_us`
    pub fn new(
        mailbox: &'a DefectMailbox,
        port: P,
        irq: I,
        clock: T,
        regs: AutoChannelRegisters,
        lines: IrqLines,
        tick_us: u32,
    ) -> Self {
        Self {
            mailbox,
            port,
            irq,
            clock,
            regs,
            lines,
            tick_us,
            drain_overflow: 0,
        }
    }

    /// Entries currently buffered
    pub fn buffered(&self) -> usize {
        with_masked(&self.irq, self.lines.defect, || {
            self.mailbox.ring.lock().len()
        })
    }
}

impl<'a, P, I, T> AutoDefectChannel for InterruptChannel<'a, P, I, T>
where
    P: RegisterPort,
    I: InterruptController,
    T: TimeProvider,
{
    fn mode(&self) -> ChannelMode {
        ChannelMode::Interrupt
    }

    /// Clear stale requests and unmask both lines
    fn enable(&mut self) {
        self.port.write32(self.regs.ready_addr(), 0);
        for line in [self.lines.defect, self.lines.frame_done] {
            self.irq.clear_pending(line);
            self.irq.enable(line);
        }
        debug!(
            defect = self.lines.defect.0,
            frame_done = self.lines.frame_done.0,
            "defect interrupts enabled"
        );
    }

    fn disable(&mut self) {
        self.irq.disable(self.lines.defect);
        self.irq.disable(self.lines.frame_done);
    }

    fn start_frame(&mut self) {
        with_masked(&self.irq, self.lines.defect, || {
            self.mailbox.ring.lock().clear();
        });
        self.mailbox.frame_done.store(false, Ordering::Release);
    }

    fn drain(&mut self, timeout_ticks: u32) -> DrainOutcome {
        let tick_us = self.tick_us.max(1);
        let deadline = Deadline::after(&self.clock, timeout_ticks as u64 * tick_us as u64);

        while !self.mailbox.is_frame_done() {
            if deadline.expired(&self.clock) {
                let elapsed_ticks = (deadline.elapsed_us(&self.clock) / tick_us as u64) as u32;
                warn!(elapsed_ticks, "timed out waiting for frame-done interrupt");
                return DrainOutcome::timed_out(elapsed_ticks);
            }
            self.clock.delay_us(self.tick_us);
        }

        let mut batch = AutoDefectBatch::new();
        let dropped = with_masked(&self.irq, self.lines.defect, || {
            let mut ring = self.mailbox.ring.lock();
            let dropped = ring.drain_into(&mut batch);
            ring.clear();
            dropped
        });
        self.mailbox.frame_done.store(false, Ordering::Release);

        if dropped > 0 {
            self.drain_overflow = self.drain_overflow.wrapping_add(dropped as u32);
            warn!(dropped, "auto defect batch full while draining the ring");
        }

        let elapsed_ticks = (deadline.elapsed_us(&self.clock) / tick_us as u64) as u32;
        debug!(found = batch.len(), elapsed_ticks, "interrupt drain complete");

        DrainOutcome {
            batch,
            completed: true,
            elapsed_ticks,
            overflow_dropped: dropped,
        }
    }

    fn lost_count(&self) -> u32 {
        let ring_lost = with_masked(&self.irq, self.lines.defect, || {
            self.mailbox.ring.lock().lost_count()
        });
        ring_lost.wrapping_add(self.drain_overflow)
    }

    fn reset_counters(&mut self) {
        with_masked(&self.irq, self.lines.defect, || {
            self.mailbox.ring.lock().reset_lost_count();
        });
        self.drain_overflow = 0;
        let mb = self.mailbox;
        for counter in [&mb.accepted, &mb.defect_irqs, &mb.frame_done_irqs, &mb.rejected] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn interrupt_stats(&self) -> InterruptStats {
        let (ring_lost, buffered) = with_masked(&self.irq, self.lines.defect, || {
            let ring = self.mailbox.ring.lock();
            (ring.lost_count(), ring.len() as u32)
        });
        let mb = self.mailbox;
        InterruptStats {
            accepted: mb.accepted.load(Ordering::Relaxed),
            defect_irqs: mb.defect_irqs.load(Ordering::Relaxed),
            frame_done_irqs: mb.frame_done_irqs.load(Ordering::Relaxed),
            lost: ring_lost.wrapping_add(self.drain_overflow),
            rejected: mb.rejected.load(Ordering::Relaxed),
            buffered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irdpc_core::DefectCategory;
    use irdpc_hal::{MockClock, MockInterruptController, MockRegisters};

    struct Rig {
        mailbox: DefectMailbox,
        regs: MockRegisters,
        irq: MockInterruptController,
        clock: MockClock,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                mailbox: DefectMailbox::new(),
                regs: MockRegisters::new(),
                irq: MockInterruptController::new(),
                clock: MockClock::new(),
            }
        }

        fn handler(&self) -> IrqHandler<'_, &MockRegisters, &MockInterruptController> {
            IrqHandler::new(
                &self.mailbox,
                &self.regs,
                &self.irq,
                AutoChannelRegisters::default(),
                IrqLines::default(),
                FrameGeometry::default(),
            )
        }

        fn channel(
            &self,
        ) -> InterruptChannel<'_, &MockRegisters, &MockInterruptController, &MockClock> {
            InterruptChannel::new(
                &self.mailbox,
                &self.regs,
                &self.irq,
                &self.clock,
                AutoChannelRegisters::default(),
                IrqLines::default(),
                1000,
            )
        }

        fn raise_defect(&self, px: BadPixel) {
            self.regs
                .set(AutoChannelRegisters::default().data_addr(), px.to_detection());
            self.handler().on_new_defect();
        }
    }

    #[test]
    fn test_enable_unmasks_both_lines() {
        let rig = Rig::new();
        let mut ch = rig.channel();
        ch.enable();
        let lines = IrqLines::default();
        assert!(rig.irq.is_enabled(lines.defect));
        assert!(rig.irq.is_enabled(lines.frame_done));
        ch.disable();
        assert!(!rig.irq.is_enabled(lines.defect));
    }

    #[test]
    fn test_handlers_fill_ring_then_drain_empties_it() {
        let rig = Rig::new();
        let mut ch = rig.channel();
        ch.enable();
        ch.start_frame();

        let a = BadPixel::new(5, 5, DefectCategory::Dead);
        let b = BadPixel::new(6, 7, DefectCategory::Stuck);
        rig.raise_defect(a);
        rig.raise_defect(b);
        rig.handler().on_frame_done();

        assert_eq!(ch.buffered(), 2);
        let outcome = ch.drain(10);
        assert!(outcome.completed);
        assert_eq!(outcome.batch.as_slice(), &[a, b]);
        assert_eq!(ch.buffered(), 0);
        assert!(!rig.mailbox.is_frame_done());

        let ready = AutoChannelRegisters::default().ready_addr();
        assert_eq!(rig.regs.writes_to(ready), vec![0, 1, 1, 0]);
        assert_eq!(rig.irq.pending_clears(IrqLines::default().defect), 3);
    }

    #[test]
    fn test_identical_detections_are_both_buffered() {
        let rig = Rig::new();
        let mut ch = rig.channel();
        let px = BadPixel::new(5, 5, DefectCategory::Dead);
        rig.raise_defect(px);
        rig.raise_defect(px);
        rig.handler().on_frame_done();

        let outcome = ch.drain(1);
        assert_eq!(outcome.batch.len(), 2);
    }

    #[test]
    fn test_ring_overflow_counts_lost_and_batch_overflow() {
        let rig = Rig::new();
        let mut ch = rig.channel();
        for i in 0..513u16 {
            rig.raise_defect(BadPixel::new(i % 640, i / 640, DefectCategory::Dead));
        }
        assert_eq!(ch.buffered(), 512);
        assert_eq!(ch.lost_count(), 1);

        rig.handler().on_frame_done();
        let outcome = ch.drain(1);
        // 512 buffered, batch holds 256
        assert_eq!(outcome.batch.len(), 256);
        assert_eq!(outcome.overflow_dropped, 256);
        assert_eq!(ch.lost_count(), 257);
        assert_eq!(ch.interrupt_stats().defect_irqs, 513);
        assert_eq!(ch.interrupt_stats().accepted, 512);
    }

    #[test]
    fn test_timeout_leaves_ring_untouched() {
        let rig = Rig::new();
        let mut ch = rig.channel();
        rig.raise_defect(BadPixel::new(1, 1, DefectCategory::Dead));

        let outcome = ch.drain(100);

        assert!(!outcome.completed);
        assert_eq!(outcome.elapsed_ticks, 100);
        assert!(outcome.batch.is_empty());
        assert_eq!(ch.buffered(), 1);

        ch.start_frame();
        assert_eq!(ch.buffered(), 0);
    }

    #[test]
    fn test_invalid_and_out_of_frame_words_are_rejected() {
        let rig = Rig::new();
        let ch = rig.channel();
        let data = AutoChannelRegisters::default().data_addr();

        rig.regs.set(data, 0x0005_0005);
        rig.handler().on_new_defect();
        rig.raise_defect(BadPixel::new(5, 600, DefectCategory::Dead));

        let stats = ch.interrupt_stats();
        assert_eq!(stats.buffered, 0);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.defect_irqs, 2);
        assert_eq!(stats.total_irqs(), 2);
    }

    #[test]
    fn test_reset_counters_zeroes_ring_and_drain_losses() {
        let rig = Rig::new();
        let mut ch = rig.channel();
        for i in 0..600u16 {
            rig.raise_defect(BadPixel::new(i % 640, i / 640, DefectCategory::Dead));
        }
        rig.handler().on_frame_done();
        ch.drain(1);
        assert_eq!(ch.lost_count(), 88 + 256);

        ch.reset_counters();

        assert_eq!(ch.lost_count(), 0);
        let stats = ch.interrupt_stats();
        assert_eq!(stats.accepted, 0);
        assert_eq!(stats.total_irqs(), 0);
    }

    #[test]
    fn test_handler_masks_only_during_push() {
        let rig = Rig::new();
        let line = IrqLines::default().defect;
        rig.irq.enable(line);
        let before = rig.irq.disable_calls();

        rig.raise_defect(BadPixel::new(2, 2, DefectCategory::Dead));

        assert_eq!(rig.irq.disable_calls(), before + 1);
        assert!(rig.irq.is_enabled(line));
    }
}

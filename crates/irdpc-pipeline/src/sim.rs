// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Register-level model of the detector, corrector and result window
//!
//! Detections scheduled with [`SimulatedDpc::schedule_detections`] are
//! presented one at a time once the detector GO bit is set. A READY write of
//! 1 consumes the presented value. The frame is complete when the detector is
//! running, nothing is left to present and no hang was injected.
//!
//! Interrupt delivery is explicit: [`SimulatedDpc::take_irq_event`] yields the
//! next event a real detector would raise, and [`IrqPumpClock`] delivers them
//! whenever the main context sleeps.

use std::collections::{HashMap, VecDeque};

use irdpc_core::BadPixel;
use irdpc_hal::{InterruptController, RegisterPort, TimeProvider};
use parking_lot::Mutex;

use crate::channel::{IrqEvent, IrqHandler};
use crate::registers::{
    RegisterMap, AUTO_STATUS_FRAME_DONE, AUTO_VALID_PENDING, CORRECTOR_STATUS_BUSY,
    CORRECTOR_STATUS_ERROR, CORRECTOR_STATUS_READY, DETECTOR_STATUS_BUSY, DETECTOR_STATUS_DONE,
    DETECTOR_STATUS_ERROR,
};

#[derive(Debug, Default)]
struct SimState {
    regs: HashMap<usize, u32>,
    writes: Vec<(usize, u32)>,
    scheduled: VecDeque<u32>,
    pending: VecDeque<u32>,
    frame_done_armed: bool,
    hang: bool,
    detector_error: bool,
    error_on_start: bool,
    corrector_error: bool,
}

impl SimState {
    fn reg(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }
}

/// Simulated accelerator blocks behind a [`RegisterPort`]
#[derive(Debug)]
pub struct SimulatedDpc {
    map: RegisterMap,
    state: Mutex<SimState>,
}

impl SimulatedDpc {
    /// Blocks laid out per `map`
    pub fn new(map: RegisterMap) -> Self {
        Self {
            map,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Register layout
    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Detections to report on the next detector start, in order
    pub fn schedule_detections(&self, pixels: &[BadPixel]) {
        let words: Vec<u32> = pixels.iter().map(BadPixel::to_detection).collect();
        self.schedule_raw(&words);
    }

    /// Raw DATA words to report on the next detector start
    pub fn schedule_raw(&self, words: &[u32]) {
        self.state.lock().scheduled.extend(words.iter().copied());
    }

    /// Never report frame completion while set
    pub fn set_hang(&self, hang: bool) {
        self.state.lock().hang = hang;
    }

    /// Raise the detector STATUS error bit
    pub fn inject_detector_error(&self, on: bool) {
        self.state.lock().detector_error = on;
    }

    /// Raise the detector STATUS error bit at the next detector start
    pub fn inject_detector_error_on_start(&self, on: bool) {
        self.state.lock().error_on_start = on;
    }

    /// Raise the corrector STATUS error bit
    pub fn inject_corrector_error(&self, on: bool) {
        self.state.lock().corrector_error = on;
    }

    /// Stored register value, without the derived status bits
    pub fn get(&self, addr: usize) -> u32 {
        self.state.lock().reg(addr)
    }

    /// Values written to `addr`, in order
    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Total writes so far
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Detections not yet consumed
    pub fn pending_detections(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// `(x, y)` pairs currently loaded in the corrector table
    pub fn corrector_table(&self) -> Vec<(u16, u16)> {
        let regs = &self.map.corrector;
        let state = self.state.lock();
        let n = state.reg(regs.all_count_addr()) as usize;
        (0..n).map(|i| unpack(state.reg(regs.table_addr(i)))).collect()
    }

    /// `(x, y)` pairs currently loaded in the detector manual table
    pub fn detector_table(&self) -> Vec<(u16, u16)> {
        let regs = &self.map.detector;
        let state = self.state.lock();
        let n = state.reg(regs.manual_count_addr()) as usize;
        (0..n).map(|i| unpack(state.reg(regs.table_addr(i)))).collect()
    }

    /// Next interrupt the detector would raise, if any
    pub fn take_irq_event(&self) -> Option<IrqEvent> {
        self.next_irq_event(|_| true)
    }

    /// Deliver every due interrupt whose line `handler` has unmasked;
    /// returns how many
    pub fn deliver_irqs<P, I>(&self, handler: &IrqHandler<'_, P, I>) -> usize
    where
        P: RegisterPort,
        I: InterruptController,
    {
        let mut delivered = 0;
        while let Some(event) = self.next_irq_event(|e| handler.is_unmasked(e)) {
            handler.dispatch(event);
            delivered += 1;
        }
        delivered
    }

    // A masked event stays pending until its line is unmasked.
    fn next_irq_event(&self, unmasked: impl Fn(IrqEvent) -> bool) -> Option<IrqEvent> {
        let mut state = self.state.lock();
        let running = state.reg(self.map.detector.go_addr()) == 1;
        if running && !state.pending.is_empty() {
            Some(IrqEvent::NewDefect).filter(|e| unmasked(*e))
        } else if state.frame_done_armed && state.pending.is_empty() && !state.hang {
            if !unmasked(IrqEvent::FrameDone) {
                return None;
            }
            state.frame_done_armed = false;
            Some(IrqEvent::FrameDone)
        } else {
            None
        }
    }

    fn frame_complete(state: &SimState, map: &RegisterMap) -> bool {
        state.reg(map.detector.go_addr()) == 1 && state.pending.is_empty() && !state.hang
    }
}

fn unpack(word: u32) -> (u16, u16) {
    ((word >> 16) as u16, (word & 0xFFFF) as u16)
}

impl RegisterPort for SimulatedDpc {
    fn read32(&self, addr: usize) -> u32 {
        let state = self.state.lock();
        let map = &self.map;

        if addr == map.auto_channel.valid_addr() {
            if state.pending.is_empty() {
                0
            } else {
                AUTO_VALID_PENDING
            }
        } else if addr == map.auto_channel.data_addr() {
            state.pending.front().copied().unwrap_or(0)
        } else if addr == map.auto_channel.status_addr() {
            if Self::frame_complete(&state, map) {
                AUTO_STATUS_FRAME_DONE
            } else {
                0
            }
        } else if addr == map.detector.status_addr() {
            let mut status = 0;
            if state.reg(map.detector.go_addr()) == 1 {
                status |= if Self::frame_complete(&state, map) {
                    DETECTOR_STATUS_DONE
                } else {
                    DETECTOR_STATUS_BUSY
                };
            }
            if state.detector_error {
                status |= DETECTOR_STATUS_ERROR;
            }
            status
        } else if addr == map.corrector.status_addr() {
            let mut status = 0;
            if state.reg(map.corrector.go_addr()) == 1 {
                status |= CORRECTOR_STATUS_BUSY;
            }
            if state.reg(map.corrector.table_ready_addr()) == 1 {
                status |= CORRECTOR_STATUS_READY;
            }
            if state.corrector_error {
                status |= CORRECTOR_STATUS_ERROR;
            }
            status
        } else {
            state.reg(addr)
        }
    }

    fn write32(&self, addr: usize, value: u32) {
        let mut state = self.state.lock();
        state.writes.push((addr, value));
        state.regs.insert(addr, value);

        if addr == self.map.detector.go_addr() {
            if value == 1 {
                let scheduled: Vec<u32> = state.scheduled.drain(..).collect();
                state.pending.extend(scheduled);
                state.frame_done_armed = true;
                if state.error_on_start {
                    state.detector_error = true;
                }
            } else {
                state.pending.clear();
                state.frame_done_armed = false;
            }
        } else if addr == self.map.auto_channel.ready_addr() && value == 1 {
            state.pending.pop_front();
        }
    }
}

/// Clock that delivers due simulator interrupts whenever it is slept on
///
/// Models interrupts preempting the main context while it waits, on a single
/// thread and in virtual time.
pub struct IrqPumpClock<'a, P, I, C> {
    sim: &'a SimulatedDpc,
    handler: IrqHandler<'a, P, I>,
    clock: C,
}

impl<'a, P, I, C> IrqPumpClock<'a, P, I, C>
where
    P: RegisterPort,
    I: InterruptController,
    C: TimeProvider,
{
    /// Wrap `clock`, delivering `sim` interrupts to `handler`
    pub fn new(sim: &'a SimulatedDpc, handler: IrqHandler<'a, P, I>, clock: C) -> Self {
        Self {
            sim,
            handler,
            clock,
        }
    }
}

impl<'a, P, I, C> TimeProvider for IrqPumpClock<'a, P, I, C>
where
    P: RegisterPort,
    I: InterruptController,
    C: TimeProvider,
{
    fn get_time_us(&self) -> u64 {
        self.clock.get_time_us()
    }

    fn delay_us(&self, us: u32) {
        self.sim.deliver_irqs(&self.handler);
        self.clock.delay_us(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irdpc_core::DefectCategory;

    #[test]
    fn test_handshake_presents_one_detection_at_a_time() {
        let sim = SimulatedDpc::new(RegisterMap::default());
        let map = *sim.map();
        let a = BadPixel::new(1, 2, DefectCategory::Dead);
        let b = BadPixel::new(3, 4, DefectCategory::Stuck);
        sim.schedule_detections(&[a, b]);

        assert_eq!(sim.read32(map.auto_channel.valid_addr()), 0);
        sim.write32(map.detector.go_addr(), 1);
        assert_eq!(sim.read32(map.auto_channel.valid_addr()), AUTO_VALID_PENDING);
        assert_eq!(sim.read32(map.auto_channel.data_addr()), a.to_detection());
        assert_eq!(sim.read32(map.detector.status_addr()), DETECTOR_STATUS_BUSY);

        sim.write32(map.auto_channel.ready_addr(), 1);
        sim.write32(map.auto_channel.ready_addr(), 0);
        assert_eq!(sim.read32(map.auto_channel.data_addr()), b.to_detection());

        sim.write32(map.auto_channel.ready_addr(), 1);
        assert_eq!(sim.read32(map.auto_channel.status_addr()), AUTO_STATUS_FRAME_DONE);
        assert_eq!(sim.read32(map.detector.status_addr()), DETECTOR_STATUS_DONE);
    }

    #[test]
    fn test_hang_suppresses_frame_done() {
        let sim = SimulatedDpc::new(RegisterMap::default());
        let map = *sim.map();
        sim.set_hang(true);
        sim.write32(map.detector.go_addr(), 1);
        assert_eq!(sim.read32(map.auto_channel.status_addr()), 0);
        assert_eq!(sim.take_irq_event(), None);
    }

    #[test]
    fn test_irq_events_follow_detections() {
        let sim = SimulatedDpc::new(RegisterMap::default());
        let map = *sim.map();
        sim.schedule_detections(&[BadPixel::new(9, 9, DefectCategory::Dead)]);
        sim.write32(map.detector.go_addr(), 1);

        assert_eq!(sim.take_irq_event(), Some(IrqEvent::NewDefect));
        sim.write32(map.auto_channel.ready_addr(), 1);
        assert_eq!(sim.take_irq_event(), Some(IrqEvent::FrameDone));
        // frame done fires once per start
        assert_eq!(sim.take_irq_event(), None);
    }

    #[test]
    fn test_corrector_status_and_table() {
        let sim = SimulatedDpc::new(RegisterMap::default());
        let regs = sim.map().corrector;
        sim.write32(regs.all_count_addr(), 1);
        sim.write32(regs.table_addr(0), (7 << 16) | 8);
        sim.write32(regs.table_ready_addr(), 1);
        sim.write32(regs.go_addr(), 1);

        assert_eq!(sim.corrector_table(), vec![(7, 8)]);
        assert_eq!(
            sim.read32(regs.status_addr()),
            CORRECTOR_STATUS_BUSY | CORRECTOR_STATUS_READY
        );
        sim.inject_corrector_error(true);
        assert_ne!(sim.read32(regs.status_addr()) & CORRECTOR_STATUS_ERROR, 0);
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// An interrupt source number on the platform interrupt controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrqLine(pub u16);

impl IrqLine {
    /// Register word index (32 lines per enable/disable register)
    pub const fn word(self) -> usize {
        (self.0 / 32) as usize
    }

    /// Bit mask within the register word
    pub const fn mask(self) -> u32 {
        1 << (self.0 % 32)
    }
}

/// Per-line interrupt masking
///
/// The platform is single-core: the only concurrency is an interrupt handler
/// preempting the main flow. Masking the line that feeds a shared buffer is
/// therefore sufficient mutual exclusion for that buffer.
pub trait InterruptController {
    /// Unmask (enable) the line
    fn enable(&self, line: IrqLine);

    /// Mask (disable) the line
    fn disable(&self, line: IrqLine);

    /// Clear a latched pending request on the line
    fn clear_pending(&self, line: IrqLine);

    /// Whether the line is currently unmasked
    fn is_enabled(&self, line: IrqLine) -> bool;
}

impl<T: InterruptController + ?Sized> InterruptController for &T {
    fn enable(&self, line: IrqLine) {
        (**self).enable(line)
    }

    fn disable(&self, line: IrqLine) {
        (**self).disable(line)
    }

    fn clear_pending(&self, line: IrqLine) {
        (**self).clear_pending(line)
    }

    fn is_enabled(&self, line: IrqLine) -> bool {
        (**self).is_enabled(line)
    }
}

/// Masks one interrupt line for the guard's lifetime.
///
/// On drop the line is re-enabled only if it was enabled when the guard was
/// taken, so nesting and masking an already-disabled line are both safe.
pub struct IrqMaskGuard<'a, I: InterruptController + ?Sized> {
    controller: &'a I,
    line: IrqLine,
    was_enabled: bool,
}

impl<'a, I: InterruptController + ?Sized> IrqMaskGuard<'a, I> {
    /// Mask `line` until the guard is dropped
    pub fn new(controller: &'a I, line: IrqLine) -> Self {
        let was_enabled = controller.is_enabled(line);
        controller.disable(line);
        Self {
            controller,
            line,
            was_enabled,
        }
    }
}

impl<I: InterruptController + ?Sized> Drop for IrqMaskGuard<'_, I> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.controller.enable(self.line);
        }
    }
}

/// Run `f` with `line` masked
pub fn with_masked<I, R>(controller: &I, line: IrqLine, f: impl FnOnce() -> R) -> R
where
    I: InterruptController + ?Sized,
{
    let _guard = IrqMaskGuard::new(controller, line);
    f()
}

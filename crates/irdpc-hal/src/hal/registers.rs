// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Primitive access to 32-bit hardware registers at absolute addresses.
///
/// Implementations carry no logic of their own: a read returns whatever the
/// device presents, a write is issued exactly once. Both take `&self` because
/// volatile MMIO access does not need exclusive ownership of the bus.
pub trait RegisterPort {
    /// Read the register at `addr`
    fn read32(&self, addr: usize) -> u32;

    /// Write `value` to the register at `addr`
    fn write32(&self, addr: usize, value: u32);

    /// Set the bits in `mask`, leaving the others untouched
    fn set_bits(&self, addr: usize, mask: u32) {
        let value = self.read32(addr);
        self.write32(addr, value | mask);
    }

    /// Clear the bits in `mask`, leaving the others untouched
    fn clear_bits(&self, addr: usize, mask: u32) {
        let value = self.read32(addr);
        self.write32(addr, value & !mask);
    }
}

impl<T: RegisterPort + ?Sized> RegisterPort for &T {
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }
}

pub mod flat;

use crate::Chan;

use common::constants::MEM_ADDR_MASK;

/// Everything outside the channels: system memory, the I/O space, and the
/// host's side of the handshake lines. Only the byte primitives are
/// required; the 16 bit ones default to two byte accesses, low byte first.
pub trait Bus {
    fn read_mem8(&mut self, addr: u32) -> u8;
    fn write_mem8(&mut self, addr: u32, val: u8);

    fn read_io8(&mut self, addr: u16) -> u8;
    fn write_io8(&mut self, addr: u16, val: u8);

    fn read_mem16(&mut self, addr: u32) -> u16 {
        let low = self.read_mem8(addr) as u16;
        let high = self.read_mem8((addr + 1) & MEM_ADDR_MASK) as u16;
        low | (high << u8::BITS)
    }

    fn write_mem16(&mut self, addr: u32, val: u16) {
        self.write_mem8(addr, val as u8);
        self.write_mem8((addr + 1) & MEM_ADDR_MASK, (val >> u8::BITS) as u8);
    }

    fn read_io16(&mut self, addr: u16) -> u16 {
        let low = self.read_io8(addr) as u16;
        let high = self.read_io8(addr.wrapping_add(1)) as u16;
        low | (high << u8::BITS)
    }

    fn write_io16(&mut self, addr: u16, val: u16) {
        self.write_io8(addr, val as u8);
        self.write_io8(addr.wrapping_add(1), (val >> u8::BITS) as u8);
    }

    /// A channel executed sintr.
    fn on_interrupt_signal(&mut self, _chan: Chan) {}

    /// Polled once per transfer cycle when the channel's control word asks
    /// for external termination. A transfer must also carry a byte count,
    /// mask/compare or single termination, so a bus that never signals
    /// can't stall it.
    fn external_terminate(&mut self, _chan: Chan) -> bool {
        false
    }
}

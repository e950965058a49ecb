use crate::{Bus, Chan};

use common::constants::{IO_ADDR_MASK, MEM_ADDR_MASK, NUM_CHANNELS};

use log::trace;

/// Plain RAM behind both spaces, with counters standing in for the host's
/// handshake lines.
pub struct FlatBus {
    mem: Vec<u8>,
    io: Vec<u8>,
    interrupts: [usize; NUM_CHANNELS],
    terminate: [bool; NUM_CHANNELS],
}

impl FlatBus {
    pub fn new() -> FlatBus {
        FlatBus {
            mem: vec![0; MEM_ADDR_MASK as usize + 1],
            io: vec![0; IO_ADDR_MASK as usize + 1],
            interrupts: [0; NUM_CHANNELS],
            terminate: [false; NUM_CHANNELS],
        }
    }

    /// Copies data into memory starting at start, wrapping at the top of
    /// the address space.
    pub fn load_image(&mut self, data: &[u8], start: u32) {
        for (i, byte) in data.iter().enumerate() {
            let addr = (start as usize + i) & MEM_ADDR_MASK as usize;
            self.mem[addr] = *byte;
        }
    }

    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    pub fn io(&self) -> &[u8] {
        &self.io
    }

    pub fn mem_read_word(&self, addr: u32) -> u16 {
        let addr = addr & MEM_ADDR_MASK;
        let high = self.mem[((addr + 1) & MEM_ADDR_MASK) as usize] as u16;
        self.mem[addr as usize] as u16 | (high << u8::BITS)
    }

    pub fn interrupts(&self, chan: Chan) -> usize {
        self.interrupts[chan.index()]
    }

    /// Latches an external terminate request; the next poll consumes it.
    pub fn request_terminate(&mut self, chan: Chan) {
        self.terminate[chan.index()] = true;
    }
}

impl Default for FlatBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FlatBus {
    fn read_mem8(&mut self, addr: u32) -> u8 {
        let val = self.mem[(addr & MEM_ADDR_MASK) as usize];
        trace!("Mem: read {val:#04x} from {addr:#07x}");
        val
    }

    fn write_mem8(&mut self, addr: u32, val: u8) {
        trace!("Mem: writing {val:#04x} to {addr:#07x}");
        self.mem[(addr & MEM_ADDR_MASK) as usize] = val;
    }

    fn read_io8(&mut self, addr: u16) -> u8 {
        let val = self.io[addr as usize];
        trace!("IO: read {val:#04x} from {addr:#06x}");
        val
    }

    fn write_io8(&mut self, addr: u16, val: u8) {
        trace!("IO: writing {val:#04x} to {addr:#06x}");
        self.io[addr as usize] = val;
    }

    fn on_interrupt_signal(&mut self, chan: Chan) {
        self.interrupts[chan.index()] += 1;
    }

    fn external_terminate(&mut self, chan: Chan) -> bool {
        std::mem::take(&mut self.terminate[chan.index()])
    }
}

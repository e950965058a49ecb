use emu_lib::io::flat::FlatBus;
use emu_lib::{Chan, Emulator, StepError, StepFlags};

use common::asm::Reg;
use common::constants::MEM_ADDR_MASK;
use common::mem::Space;

use std::fmt;

use log::debug;

pub struct Disassembled {
    pub addr: u32,
    /// Bytes of instruction stream the line covers.
    pub len: u32,
    pub word: u16,
    pub line: Result<String, StepError>,
}

impl Disassembled {
    pub fn is_nop(&self) -> bool {
        self.word == 0 && self.len == 2 && self.line.is_ok()
    }
}

impl fmt::Display for Disassembled {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.line {
            Ok(line) => write!(f, "{line}"),
            Err(e) => write!(f, "{:05x}: {:04x}                .word {:#06x} ; {e}", self.addr, self.word, self.word),
        }
    }
}

/// Lists bin as if loaded at origin. An instruction that can't be listed is
/// reported and skipped a word at a time.
pub fn disassemble(bin: &[u8], origin: u32, validate: bool) -> Vec<Disassembled> {
    let mut bus = FlatBus::new();
    bus.load_image(bin, origin);
    let mut emu = Emulator::new(bus);

    let mut flags = StepFlags::LIST;
    if validate {
        flags |= StepFlags::VALIDATE;
    }

    // Walk by offset into bin; addresses wrap at the top of memory.
    let mut out = vec![];
    let mut offset = 0;
    while offset < bin.len() {
        let addr = (origin as usize + offset) as u32 & MEM_ADDR_MASK;
        emu.channel_mut(Chan::Ch0).load_reg(Reg::Tp, addr, Space::Mem);
        let word = emu.bus().mem_read_word(addr);
        let line = emu.step(Chan::Ch0, flags).map(|step| {
            step.listing.map(|listing| listing.to_string()).unwrap_or_default()
        });
        let len = match &line {
            Ok(_) => emu.channel(Chan::Ch0).reg(Reg::Tp).wrapping_sub(addr) & MEM_ADDR_MASK,
            Err(e) => {
                debug!("{addr:05x}: {e}");
                2
            },
        };
        out.push(Disassembled { addr, len, word, line });
        offset += len as usize;
    }

    out
}

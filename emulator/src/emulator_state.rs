use common::asm::{NUM_REGS, Reg, WidthMode};
use common::constants::NUM_CHANNELS;
use common::mem::Space;

use std::fmt;

use log::trace;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum Chan {
    Ch0 = 0,
    Ch1,
}

impl Chan {
    pub const ALL: [Chan; NUM_CHANNELS] = [Chan::Ch0, Chan::Ch1];

    pub fn index(self) -> usize {
        self.to_usize().unwrap_or_default()
    }
}

impl fmt::Display for Chan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

////////////////////////////////////////////////////////////////////////////////

/// One channel's register file. Each register carries a tag bit saying
/// whether it addresses memory or I/O space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    regs: [u32; NUM_REGS],
    tags: u16,
    wid: WidthMode,
    xfer: bool,
}

impl Channel {
    pub fn new() -> Channel {
        Default::default()
    }

    pub fn reg(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    /// Writes the value, truncated to the register's width. The tag is left
    /// alone.
    pub fn set_reg(&mut self, reg: Reg, val: u32) {
        let val = val & reg.mask();
        trace!("Reg: writing {val:#07x} to {reg}");
        self.regs[reg.index()] = val;
    }

    /// Writes the value and retags the register.
    pub fn load_reg(&mut self, reg: Reg, val: u32, space: Space) {
        self.set_reg(reg, val);
        self.set_tag(reg, space);
    }

    pub fn tag(&self, reg: Reg) -> Space {
        Space::from_tag((self.tags >> reg.index()) & 0x1 != 0)
    }

    pub fn set_tag(&mut self, reg: Reg, space: Space) {
        self.tags &= !(1 << reg.index());
        self.tags |= (space.tag() as u16) << reg.index();
    }

    /// The register as an address: its value and the space its tag selects.
    pub fn addr(&self, reg: Reg) -> (u32, Space) {
        (self.reg(reg), self.tag(reg))
    }

    pub fn wid(&self) -> WidthMode {
        self.wid
    }

    pub fn set_wid(&mut self, wid: WidthMode) {
        self.wid = wid;
    }

    pub fn xfer_pending(&self) -> bool {
        self.xfer
    }

    pub fn set_xfer(&mut self, xfer: bool) {
        self.xfer = xfer;
    }

    fn fmt_dump(&self, f: &mut fmt::Formatter, chan: Chan) -> fmt::Result {
        const INDENT: &str = "     ";
        write!(f, "{chan}: ")?;
        for reg in Reg::ALL {
            write!(f, "{reg}=")?;
            if reg == Reg::Bc || reg.is_pointer() {
                match self.tag(reg) {
                    Space::Io => write!(f, "IO:{:#06x}", self.reg(reg) & Space::Io.mask())?,
                    Space::Mem => write!(f, "MEM:{:#07x}", self.reg(reg) & Space::Mem.mask())?,
                }
            } else {
                write!(f, "{:#06x}", self.reg(reg))?;
            }
            if reg == Reg::Bc || reg == Reg::Pp {
                write!(f, "\n{INDENT}")?;
            } else {
                write!(f, " ")?;
            }
        }
        writeln!(f, "src={}bit dst={}bit", self.wid.src.bits(), self.wid.dst.bits())
    }
}

////////////////////////////////////////////////////////////////////////////////

// Kept apart from the bus so the bus can be borrowed alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorState {
    channels: [Channel; NUM_CHANNELS],
    // Control block address, found by the first channel attention.
    cb: Option<u32>,
}

impl EmulatorState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn channel(&self, chan: Chan) -> &Channel {
        &self.channels[chan.index()]
    }

    pub fn channel_mut(&mut self, chan: Chan) -> &mut Channel {
        &mut self.channels[chan.index()]
    }

    pub fn control_block(&self) -> Option<u32> {
        self.cb
    }

    pub fn set_control_block(&mut self, cb: Option<u32>) {
        self.cb = cb;
    }
}

impl fmt::Display for EmulatorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for chan in Chan::ALL {
            self.channel(chan).fmt_dump(f, chan)?;
        }
        Ok(())
    }
}

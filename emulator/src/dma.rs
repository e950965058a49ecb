use crate::access::{self, Size};
use crate::error::{StepError, Unsupported};
use crate::{Bus, Chan, Emulator};

use common::asm::{Reg, Width, WidthMode};

use log::{debug, trace};

/// The channel control register, as it steers a block transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelControl(u16);

impl ChannelControl {
    const DST_INC_SHIFT: u16 = 15;
    const SRC_INC_SHIFT: u16 = 14;
    const TRANSLATE_SHIFT: u16 = 13;
    const SRC_GB_SHIFT: u16 = 10;
    const SINGLE_SHIFT: u16 = 7;
    const EXT_TERM_SHIFT: u16 = 5;
    const BC_TERM_SHIFT: u16 = 3;
    const MC_NONMATCH_SHIFT: u16 = 2;
    const MC_TERM_SHIFT: u16 = 0;

    const TERM_MASK: u16 = 0x3;

    pub fn from_raw(raw: u16) -> Self {
        ChannelControl(raw)
    }

    pub fn to_raw(self) -> u16 {
        self.0
    }

    fn flag(self, shift: u16) -> bool {
        (self.0 >> shift) & 0x1 != 0
    }

    fn term(self, shift: u16) -> u8 {
        ((self.0 >> shift) & Self::TERM_MASK) as u8
    }

    pub fn dst_inc(self) -> bool {
        self.flag(Self::DST_INC_SHIFT)
    }

    pub fn src_inc(self) -> bool {
        self.flag(Self::SRC_INC_SHIFT)
    }

    pub fn translate(self) -> bool {
        self.flag(Self::TRANSLATE_SHIFT)
    }

    /// Source is gb and destination ga, rather than the other way round.
    pub fn src_gb(self) -> bool {
        self.flag(Self::SRC_GB_SHIFT)
    }

    pub fn single(self) -> bool {
        self.flag(Self::SINGLE_SHIFT)
    }

    pub fn ext_term(self) -> u8 {
        self.term(Self::EXT_TERM_SHIFT)
    }

    pub fn bc_term(self) -> u8 {
        self.term(Self::BC_TERM_SHIFT)
    }

    pub fn mc_term(self) -> u8 {
        self.term(Self::MC_TERM_SHIFT)
    }

    /// Mask/compare termination fires on a non-match rather than a match.
    pub fn mc_on_nonmatch(self) -> bool {
        self.flag(Self::MC_NONMATCH_SHIFT)
    }

    // External termination alone isn't enough: the bus may never signal.
    fn terminates(self) -> bool {
        self.single() || self.bc_term() != 0 || self.mc_term() != 0
    }
}

/// How far tp moves past the transfer, indexed by termination code.
const TERM_OFFSETS: [u32; 4] = [0, 0, 4, 8];

/// Whether byte matches mc: the high byte of mc selects which bits of the
/// low byte are compared.
pub fn mask_compare(mc: u32, byte: u32) -> bool {
    (mc ^ byte) & (mc >> u8::BITS) & 0xff == 0
}

impl<B: Bus> Emulator<B> {
    // Reads one unit through reg and advances it if asked to.
    fn transfer_read(&mut self, chan: Chan, reg: Reg, size: Size, inc: bool) -> u32 {
        let (addr, space) = self.channel(chan).addr(reg);
        let val = access::read(self.bus_mut(), addr, space, size);
        if inc {
            self.channel_mut(chan).set_reg(reg, addr + size.bytes());
        }
        val
    }

    fn transfer_write(&mut self, chan: Chan, reg: Reg, val: u32, size: Size, inc: bool) {
        let (addr, space) = self.channel(chan).addr(reg);
        access::write(self.bus_mut(), addr, space, val, size);
        if inc {
            self.channel_mut(chan).set_reg(reg, addr + size.bytes());
        }
    }

    // Moves one unit in the given widths. Returns whether any byte of it
    // matched the mask/compare register.
    fn transfer_unit(&mut self, chan: Chan, wid: WidthMode, cc: ChannelControl) -> bool {
        let (src, dst) = if cc.src_gb() { (Reg::Gb, Reg::Ga) } else { (Reg::Ga, Reg::Gb) };

        let (val, bytes) = match (wid.src, wid.dst) {
            (Width::Byte, Width::Byte) => (self.transfer_read(chan, src, Size::Byte, cc.src_inc()), 1),
            (Width::Byte, Width::Word) => {
                let low = self.transfer_read(chan, src, Size::Byte, cc.src_inc());
                let high = self.transfer_read(chan, src, Size::Byte, cc.src_inc());
                (low | (high << u8::BITS), 2)
            },
            (Width::Word, _) => (self.transfer_read(chan, src, Size::Word, cc.src_inc()), 2),
        };

        match wid.dst {
            Width::Word => self.transfer_write(chan, dst, val, Size::Word, cc.dst_inc()),
            Width::Byte => {
                for i in 0..bytes {
                    self.transfer_write(chan, dst, val >> (i * u8::BITS), Size::Byte, cc.dst_inc());
                }
            },
        }

        let ch = self.channel_mut(chan);
        let bc = ch.reg(Reg::Bc);
        ch.set_reg(Reg::Bc, bc.wrapping_sub(bytes));
        trace!("{chan}: moved {val:#06x}, bc {bc:#06x}");

        let mc = ch.reg(Reg::Mc);
        (0..bytes).any(|i| mask_compare(mc, (val >> (i * u8::BITS)) & 0xff))
    }

    /// Runs the pending block transfer to termination: ga or gb to the
    /// other, in the channel's width mode, steered by cc. Afterwards tp is
    /// advanced by the offset the terminating condition selects.
    pub(crate) fn transfer(&mut self, chan: Chan) -> Result<(), StepError> {
        let cc = ChannelControl::from_raw(self.channel(chan).reg(Reg::Cc) as u16);
        if cc.translate() {
            return Err(Unsupported::Translate.into());
        }
        if !cc.terminates() {
            return Err(Unsupported::Unterminated.into());
        }
        debug!("{chan}: transfer, cc {:#06x}, {:?}", cc.to_raw(), self.channel(chan).wid());

        let term = loop {
            if cc.ext_term() != 0 && self.bus_mut().external_terminate(chan) {
                break cc.ext_term();
            }

            let mut wid = self.channel(chan).wid();
            if cc.bc_term() != 0 {
                match self.channel(chan).reg(Reg::Bc) {
                    0 => break cc.bc_term(),
                    1 => wid = WidthMode::NARROW,
                    _ => {},
                }
            }

            let matched = self.transfer_unit(chan, wid, cc);

            if cc.mc_term() != 0 && matched != cc.mc_on_nonmatch() {
                break cc.mc_term();
            }
            if cc.single() {
                break 0;
            }
        };

        let ch = self.channel_mut(chan);
        ch.set_xfer(false);
        let tp = ch.reg(Reg::Tp) + TERM_OFFSETS[term as usize];
        ch.set_reg(Reg::Tp, tp);
        debug!("{chan}: transfer done, termination code {term}, tp {tp:05x}");
        Ok(())
    }
}

use crate::asm::{AddrMode, Ins, Opcode, Reg, Shape, Special};
use crate::validate::InvalidEncoding;

use std::fmt;

/// What gets rendered for one step: a single instruction, or the two halves
/// of a memory to memory move, which read as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disasm {
    Single(Ins),
    Move { load: Ins, store: Ins },
}

impl Disasm {
    pub fn render(&self) -> Result<String, InvalidEncoding> {
        if let Disasm::Single(ins) = self {
            if ins.opcode() == Some(Opcode::Special) && Special::decode(ins.raw).is_none() {
                return Err(InvalidEncoding::BadSpecial(ins.raw.0));
            }
        }
        Ok(self.to_string())
    }
}

impl fmt::Display for Disasm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Disasm::Single(ins) => write!(f, "{ins}"),
            Disasm::Move { load, store } => {
                store.fmt_mnemonic(f)?;
                let mut ops = Operands::new(f);
                store.fmt_operands(&mut ops)?;
                load.fmt_operands(&mut ops)
            },
        }
    }
}

// Space before the first operand, commas between the rest.
struct Operands<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    count: usize,
}

impl<'a, 'b> Operands<'a, 'b> {
    fn new(f: &'a mut fmt::Formatter<'b>) -> Self {
        Operands { f, count: 0 }
    }

    fn push(&mut self, arg: impl fmt::Display) -> fmt::Result {
        let sep = if self.count == 0 { ' ' } else { ',' };
        self.count += 1;
        write!(self.f, "{sep}{arg}")
    }
}

struct Location<'a>(&'a Ins);

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ins = self.0;
        write!(f, "[{}", ins.base())?;
        match ins.raw.addr_mode() {
            AddrMode::Base => write!(f, "]"),
            AddrMode::Offset => write!(f, "].{}", ins.offset),
            AddrMode::Indexed => write!(f, "+{}]", Reg::Ix),
            AddrMode::IndexedInc => write!(f, "+{}+]", Reg::Ix),
        }
    }
}

impl Ins {
    pub fn fmt_mnemonic(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let desc = self.descriptor();
        let Some(mnemonic) = desc.mnemonic else {
            return Ok(());
        };
        if desc.shape.contains(Shape::DD) && self.raw.wb() == 2 {
            write!(f, "l")?;
        }
        write!(f, "{mnemonic}")?;
        if desc.shape.contains(Shape::W) && self.raw.w() == 0 {
            write!(f, "b")?;
        }
        if desc.shape.contains(Shape::WB) {
            write!(f, "i")?;
        }
        Ok(())
    }

    fn fmt_operands(&self, ops: &mut Operands) -> fmt::Result {
        let shape = self.descriptor().shape;
        let reg_first = self.opcode().is_some_and(Opcode::reg_first);

        if shape.contains(Shape::PPP) {
            match Reg::from_ppp(self.raw.rrr()) {
                Some(reg) => ops.push(reg)?,
                None => ops.push(format_args!("?{}", self.raw.rrr()))?,
            }
        }
        if shape.contains(Shape::RRR) && reg_first {
            ops.push(self.reg())?;
        }
        if shape.contains(Shape::AA) {
            ops.push(Location(self))?;
        }
        if shape.contains(Shape::RRR) && !reg_first {
            ops.push(self.reg())?;
        }
        if shape.contains(Shape::BBB) {
            ops.push(self.bit())?;
        }
        if shape.contains(Shape::DD) {
            ops.push(format_args!("[{}].{}", Reg::Tp, self.imm as i16))?;
        }
        if shape.contains(Shape::WB) {
            match self.raw.wb() {
                1 => ops.push(format_args!("{:#04x}", self.imm & 0xff))?,
                2 => ops.push(format_args!("{:#06x}", self.imm & 0xffff))?,
                _ => {},
            }
        }
        match self.opcode() {
            Some(Opcode::Lpdi) => ops.push(format_args!("{:#010x}", self.imm)),
            Some(Opcode::Tsl) => {
                ops.push(format_args!("{:#04x}", self.imm & 0xff))?;
                ops.push(format_args!("[{}].{}", Reg::Tp, self.sdisp))
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Ins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let desc = self.descriptor();
        if self.opcode() == Some(Opcode::Special) {
            return match Special::decode(self.raw) {
                Some(special) => write!(f, "{special}"),
                None => write!(f, ".word {:#06x}", self.raw.0),
            };
        }
        if desc.is_invalid() {
            return write!(f, ".word {:#06x}", self.raw.0);
        }
        self.fmt_mnemonic(f)?;
        self.fmt_operands(&mut Operands::new(f))
    }
}

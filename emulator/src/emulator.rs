use crate::access::{self, Size};
use crate::dma::mask_compare;
use crate::error::StepError;
use crate::listing::{Fetched, Listing};
use crate::{Bus, Chan, Channel, EmulatorState};

use common::asm::*;
use common::disasm::Disasm;
use common::mem::{Space, pack_pointer, segoff, unpack_pointer};
use common::validate::{InvalidEncoding, validate};

use std::ops::{BitAnd, BitOr};

use bitflags::bitflags;
use delegate::delegate;
use derive_more::IsVariant;
use log::{debug, trace};

bitflags! {
    /// What a step does with the instruction it fetches. Any combination
    /// works: a disassembler only lists, a checker only validates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StepFlags: u8 {
        const VALIDATE = 0x01;
        const SHOW_ADDR = 0x02;
        const SHOW_DATA = 0x04;
        const SHOW_INSN = 0x08;
        const EXEC = 0x10;

        const LIST = Self::SHOW_ADDR.bits() | Self::SHOW_DATA.bits() | Self::SHOW_INSN.bits();
        const RUN = Self::VALIDATE.bits() | Self::EXEC.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum ExecRet {
    Ok,
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Present when any of the show flags were given.
    pub listing: Option<Listing>,
    pub ret: ExecRet,
}

// A resolved addressed operand.
#[derive(Debug, Clone, Copy)]
struct Location {
    addr: u32,
    space: Space,
}

pub struct Emulator<B: Bus> {
    state: EmulatorState,
    bus: B,
}

impl<B: Bus> Emulator<B> {
    pub fn new(bus: B) -> Emulator<B> {
        Emulator {
            state: EmulatorState::new(),
            bus,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn get_state(&self) -> &EmulatorState {
        &self.state
    }

    pub fn get_state_mut(&mut self) -> &mut EmulatorState {
        &mut self.state
    }

    delegate! {
        to self.state {
            pub fn channel(&self, chan: Chan) -> &Channel;
            pub fn channel_mut(&mut self, chan: Chan) -> &mut Channel;
        }
    }

    /// Runs the channel until it halts. Returns the number of steps taken.
    pub fn run(&mut self, chan: Chan) -> Result<usize, StepError> {
        let mut steps = 0;
        loop {
            steps += 1;
            if self.step(chan, StepFlags::RUN)?.ret.is_halt() {
                return Ok(steps);
            }
        }
    }

    /// Fetches one instruction at the channel's tp and does what flags ask
    /// with it. A memory to memory move is both of its halves. If a transfer
    /// was already pending before this instruction, it runs afterwards.
    pub fn step(&mut self, chan: Chan, flags: StepFlags) -> Result<Step, StepError> {
        let start = self.channel(chan).reg(Reg::Tp);
        let mut listing = Listing {
            addr: flags.contains(StepFlags::SHOW_ADDR).then_some(start),
            data: flags.contains(StepFlags::SHOW_DATA).then(Vec::new),
            text: None,
        };
        let exec = flags.contains(StepFlags::EXEC);

        let ins = self.fetch(chan, &mut listing);
        if flags.contains(StepFlags::VALIDATE) {
            validate(ins.raw)?;
            if ins.opcode() == Some(Opcode::MovStore) {
                return Err(InvalidEncoding::StoreWithoutLoad.into());
            }
        }

        let mut moved = 0;
        let disasm = if ins.opcode() == Some(Opcode::MovLoad) {
            if exec {
                moved = self.read_operand(chan, &ins, ins.raw.width().into());
            }
            let store = self.fetch(chan, &mut listing);
            if flags.contains(StepFlags::VALIDATE) {
                validate(store.raw)?;
            }
            if store.opcode() != Some(Opcode::MovStore) {
                return Err(InvalidEncoding::LoadWithoutStore.into());
            }
            Disasm::Move { load: ins, store }
        } else {
            Disasm::Single(ins)
        };

        if flags.contains(StepFlags::SHOW_INSN) {
            listing.text = Some(disasm.render()?);
        }
        let listing = flags.intersects(StepFlags::LIST).then_some(listing);

        if !exec {
            return Ok(Step { listing, ret: ExecRet::Ok });
        }

        debug!("{chan}: {start:05x}: {disasm}");
        let was_pending = self.channel(chan).xfer_pending();
        let ret = match disasm {
            Disasm::Single(ins) => self.exec(chan, &ins)?,
            Disasm::Move { store, .. } => {
                let size = store.raw.width().into();
                let loc = self.resolve(chan, &store, size);
                self.write_loc(loc, moved, size);
                ExecRet::Ok
            },
        };

        if ret.is_ok() && was_pending && self.channel(chan).xfer_pending() {
            self.transfer(chan)?;
        }
        Ok(Step { listing, ret })
    }

    ///////////////////////////////////////////////////////////////////////////
    // Fetch
    ///////////////////////////////////////////////////////////////////////////

    // The instruction stream is always in memory space, whatever tp's tag.
    fn fetch_unit(&mut self, chan: Chan, size: Size) -> u32 {
        let tp = self.channel(chan).reg(Reg::Tp);
        let val = access::read(&mut self.bus, tp, Space::Mem, size);
        self.channel_mut(chan).set_reg(Reg::Tp, tp + size.bytes());
        val
    }

    fn fetch(&mut self, chan: Chan, listing: &mut Listing) -> Ins {
        let raw = RawIns(self.fetch_unit(chan, Size::Word) as u16);
        listing.push(Fetched::Word(raw.0));
        let mut ins = Ins::new(raw);

        if raw.addr_mode() == AddrMode::Offset {
            ins.offset = self.fetch_unit(chan, Size::Byte) as u8;
            listing.push(Fetched::Byte(ins.offset));
        }

        match raw.wb() {
            1 => {
                let imm = self.fetch_unit(chan, Size::Byte) as u8;
                listing.push(Fetched::Byte(imm));
                ins.imm = imm as i8 as u32;
            },
            2 if raw.opcode_kind() == Some(Opcode::Lpdi) => {
                ins.imm = self.fetch_unit(chan, Size::Long);
                listing.push(Fetched::Long(ins.imm));
            },
            2 => {
                let imm = self.fetch_unit(chan, Size::Word) as u16;
                listing.push(Fetched::Word(imm));
                ins.imm = imm as i16 as u32;
            },
            3 => {
                let imm = self.fetch_unit(chan, Size::Byte) as u8;
                listing.push(Fetched::Byte(imm));
                let sdisp = self.fetch_unit(chan, Size::Byte) as u8;
                listing.push(Fetched::Byte(sdisp));
                ins.imm = imm as u32;
                ins.sdisp = sdisp as i8;
            },
            _ => {},
        }

        trace!("{chan}: fetched {ins:?}");
        ins
    }

    ///////////////////////////////////////////////////////////////////////////
    // Operands
    ///////////////////////////////////////////////////////////////////////////

    // Computes the addressed location. Has a side effect for [preg+ix+], so
    // an instruction that reads and writes its location resolves it once.
    fn resolve(&mut self, chan: Chan, ins: &Ins, size: Size) -> Location {
        let ch = self.state.channel_mut(chan);
        let (base, space) = ch.addr(ins.base());
        let addr = match ins.raw.addr_mode() {
            AddrMode::Base => base,
            AddrMode::Offset => base + ins.offset as u32,
            AddrMode::Indexed => base + ch.reg(Reg::Ix),
            AddrMode::IndexedInc => {
                let ix = ch.reg(Reg::Ix);
                ch.set_reg(Reg::Ix, ix + size.bytes());
                base + ix
            },
        };
        Location { addr, space }
    }

    fn read_loc(&mut self, loc: Location, size: Size) -> u32 {
        access::read(&mut self.bus, loc.addr, loc.space, size)
    }

    fn write_loc(&mut self, loc: Location, val: u32, size: Size) {
        access::write(&mut self.bus, loc.addr, loc.space, val, size)
    }

    fn read_operand(&mut self, chan: Chan, ins: &Ins, size: Size) -> u32 {
        let loc = self.resolve(chan, ins, size);
        self.read_loc(loc, size)
    }

    fn pointer_reg(ins: &Ins) -> Result<Reg, StepError> {
        let ppp = ins.raw.rrr();
        Reg::from_ppp(ppp).ok_or(InvalidEncoding::BadPointerReg(ppp).into())
    }

    fn unknown(ins: &Ins) -> StepError {
        StepError::UnknownOpcode { opcode: ins.raw.opcode(), word: ins.raw.0 }
    }

    ///////////////////////////////////////////////////////////////////////////
    // Execute
    ///////////////////////////////////////////////////////////////////////////

    fn jump(&mut self, chan: Chan, disp: i32) {
        let ch = self.channel_mut(chan);
        let tp = ch.reg(Reg::Tp);
        ch.set_reg(Reg::Tp, tp.wrapping_add(disp as u32));
    }

    fn jump_if(&mut self, chan: Chan, cond: bool, ins: &Ins) {
        if cond {
            self.jump(chan, ins.disp());
        }
    }

    fn alu_reg(&mut self, chan: Chan, reg: Reg, operand: u32, op: fn(u32, u32) -> u32) {
        let ch = self.channel_mut(chan);
        let val = op(ch.reg(reg), operand);
        ch.set_reg(reg, val);
    }

    fn alu_mem(&mut self, chan: Chan, ins: &Ins, size: Size, operand: u32, op: fn(u32, u32) -> u32) {
        let loc = self.resolve(chan, ins, size);
        let val = self.read_loc(loc, size);
        self.write_loc(loc, op(val, operand), size);
    }

    fn exec_special(&mut self, chan: Chan, ins: &Ins) -> Result<ExecRet, StepError> {
        match Special::decode(ins.raw) {
            Some(Special::Nop) => {},
            Some(Special::Sintr) => self.bus.on_interrupt_signal(chan),
            // Takes effect after the next instruction.
            Some(Special::Xfer) => self.channel_mut(chan).set_xfer(true),
            Some(Special::Wid(mode)) => self.channel_mut(chan).set_wid(mode),
            None => return Err(Self::unknown(ins)),
        }
        Ok(ExecRet::Ok)
    }

    fn exec(&mut self, chan: Chan, ins: &Ins) -> Result<ExecRet, StepError> {
        use Opcode::*;
        let Some(op) = ins.opcode() else {
            return Err(Self::unknown(ins));
        };
        let size: Size = ins.raw.width().into();
        let reg = ins.reg();
        let bit = 1u32 << ins.bit();

        match op {
            Special => return self.exec_special(chan, ins),
            Hlt => return Ok(ExecRet::Halt),

            // Register and immediate
            Lpdi => {
                let preg = Self::pointer_reg(ins)?;
                self.channel_mut(chan).load_reg(preg, segoff(ins.imm), Space::Mem);
            },
            AddRI => self.alu_reg(chan, reg, ins.imm, u32::wrapping_add),
            OrRI => self.alu_reg(chan, reg, ins.imm, u32::bitor),
            AndRI => self.alu_reg(chan, reg, ins.imm, u32::bitand),
            NotR => self.alu_reg(chan, reg, 0, |val, _| !val),
            MovRI => self.channel_mut(chan).load_reg(reg, ins.imm, Space::Io),
            IncR => self.alu_reg(chan, reg, 1, u32::wrapping_add),
            DecR => self.alu_reg(chan, reg, 1, u32::wrapping_sub),
            JnzR => self.jump_if(chan, self.channel(chan).reg(reg) != 0, ins),
            JzR => self.jump_if(chan, self.channel(chan).reg(reg) == 0, ins),

            // Register and memory
            MovRM => {
                let val = self.read_operand(chan, ins, size);
                self.channel_mut(chan).load_reg(reg, val, Space::Io);
            },
            MovMR => {
                let val = self.channel(chan).reg(reg);
                let loc = self.resolve(chan, ins, size);
                self.write_loc(loc, val, size);
            },
            AddRM | OrRM | AndRM => {
                let val = self.read_operand(chan, ins, size);
                let op: fn(u32, u32) -> u32 = match op {
                    AddRM => u32::wrapping_add,
                    OrRM => u32::bitor,
                    _ => u32::bitand,
                };
                self.alu_reg(chan, reg, val, op);
            },
            NotRM => {
                let val = self.read_operand(chan, ins, size);
                self.channel_mut(chan).set_reg(reg, !val);
            },
            AddMR => self.alu_mem(chan, ins, size, self.channel(chan).reg(reg), u32::wrapping_add),
            OrMR => self.alu_mem(chan, ins, size, self.channel(chan).reg(reg), u32::bitor),
            AndMR => self.alu_mem(chan, ins, size, self.channel(chan).reg(reg), u32::bitand),

            // Pointers
            Lpd => {
                let preg = Self::pointer_reg(ins)?;
                let ptr = self.read_operand(chan, ins, Size::Long);
                self.channel_mut(chan).load_reg(preg, segoff(ptr), Space::Mem);
            },
            MovpPM => {
                let preg = Self::pointer_reg(ins)?;
                let image = self.read_operand(chan, ins, Size::Pointer);
                let (val, space) = unpack_pointer(image);
                self.channel_mut(chan).load_reg(preg, val, space);
            },
            MovpMP => {
                let preg = Self::pointer_reg(ins)?;
                let (val, space) = self.channel(chan).addr(preg);
                let loc = self.resolve(chan, ins, Size::Pointer);
                self.write_loc(loc, pack_pointer(val, space), Size::Pointer);
            },
            Call => {
                let (ret, space) = self.channel(chan).addr(Reg::Tp);
                let loc = self.resolve(chan, ins, Size::Pointer);
                self.write_loc(loc, pack_pointer(ret, space), Size::Pointer);
                self.jump(chan, ins.disp());
            },

            // Memory
            MovMI => {
                let loc = self.resolve(chan, ins, size);
                self.write_loc(loc, ins.imm, size);
            },
            AddMI => self.alu_mem(chan, ins, size, ins.imm, u32::wrapping_add),
            OrMI => self.alu_mem(chan, ins, size, ins.imm, u32::bitor),
            AndMI => self.alu_mem(chan, ins, size, ins.imm, u32::bitand),
            NotM => self.alu_mem(chan, ins, size, 0, |val, _| !val),
            IncM => self.alu_mem(chan, ins, size, 1, u32::wrapping_add),
            DecM => self.alu_mem(chan, ins, size, 1, u32::wrapping_sub),
            Setb => self.alu_mem(chan, ins, Size::Byte, bit, u32::bitor),
            Clr => self.alu_mem(chan, ins, Size::Byte, !bit, u32::bitand),
            Tsl => {
                let loc = self.resolve(chan, ins, Size::Byte);
                if self.read_loc(loc, Size::Byte) == 0 {
                    self.write_loc(loc, ins.imm, Size::Byte);
                } else {
                    self.jump(chan, ins.sdisp as i32);
                }
            },

            // Jumps on memory
            JnzM => {
                let val = self.read_operand(chan, ins, size);
                self.jump_if(chan, val != 0, ins);
            },
            JzM => {
                let val = self.read_operand(chan, ins, size);
                self.jump_if(chan, val == 0, ins);
            },
            Jmce | Jmcne => {
                let val = self.read_operand(chan, ins, Size::Byte);
                let matched = mask_compare(self.channel(chan).reg(Reg::Mc), val);
                self.jump_if(chan, matched == (op == Jmce), ins);
            },
            Jnbt => {
                let val = self.read_operand(chan, ins, Size::Byte);
                self.jump_if(chan, val & bit == 0, ins);
            },
            Jbt => {
                let val = self.read_operand(chan, ins, Size::Byte);
                self.jump_if(chan, val & bit != 0, ins);
            },

            // Only reachable as a pair, through step.
            MovLoad | MovStore => return Err(Self::unknown(ins)),
        }

        Ok(ExecRet::Ok)
    }
}

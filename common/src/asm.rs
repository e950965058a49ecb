use std::fmt;

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};


#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum Reg {
    Ga = 0,
    Gb,
    Gc,
    Bc,
    Tp,
    Ix,
    Cc,
    Mc,
    Pp,
}

pub const NUM_REGS: usize = 9;

impl Reg {
    pub const NUM_BITS: usize = 3;
    pub const MASK: u16 = (1u16 << Self::NUM_BITS) - 1;

    pub const ALL: [Reg; NUM_REGS] = [
        Reg::Ga, Reg::Gb, Reg::Gc, Reg::Bc, Reg::Tp, Reg::Ix, Reg::Cc, Reg::Mc, Reg::Pp,
    ];

    const MM_REGS: [Reg; 4] = [Reg::Ga, Reg::Gb, Reg::Gc, Reg::Pp];

    pub fn index(self) -> usize {
        self.to_usize().unwrap_or_default()
    }

    /// Base register selected by the mm field.
    pub fn from_mm(mm: u8) -> Reg {
        Self::MM_REGS[(mm & 0x3) as usize]
    }

    /// Only ga, gb, gc and tp are pointer registers; the other encodings are
    /// reserved.
    pub fn from_ppp(ppp: u8) -> Option<Reg> {
        match ppp {
            0 => Some(Reg::Ga),
            1 => Some(Reg::Gb),
            2 => Some(Reg::Gc),
            4 => Some(Reg::Tp),
            _ => None,
        }
    }

    /// pp can't be named by an rrr field.
    pub fn from_rrr(rrr: u8) -> Reg {
        Reg::from_u8(rrr & Self::MASK as u8).unwrap_or(Reg::Ga)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, Reg::Ga | Reg::Gb | Reg::Gc | Reg::Tp | Reg::Pp)
    }

    pub fn mask(self) -> u32 {
        if self.is_pointer() { 0xf_ffff } else { 0xffff }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub fn from_bit(bit: bool) -> Width {
        if bit { Width::Word } else { Width::Byte }
    }

    pub fn bit(self) -> bool {
        self == Width::Word
    }

    pub fn bits(self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
        }
    }
}

/// Source and destination widths of a block transfer, as set by `wid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthMode {
    pub src: Width,
    pub dst: Width,
}

impl WidthMode {
    pub const NARROW: WidthMode = WidthMode { src: Width::Byte, dst: Width::Byte };

    const SRC_SHIFT: u8 = 1;

    pub fn from_bits(bits: u8) -> WidthMode {
        WidthMode {
            src: Width::from_bit((bits >> Self::SRC_SHIFT) & 0x1 != 0),
            dst: Width::from_bit(bits & 0x1 != 0),
        }
    }

    pub fn to_bits(self) -> u8 {
        ((self.src.bit() as u8) << Self::SRC_SHIFT) | (self.dst.bit() as u8)
    }
}

impl Default for WidthMode {
    fn default() -> Self {
        Self::NARROW
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum AddrMode {
    Base = 0,    // [preg]
    Offset,      // [preg].off
    Indexed,     // [preg+ix]
    IndexedInc,  // [preg+ix+]
}

/// A raw instruction word, with accessors for each field. Which fields are
/// meaningful depends on the opcode's descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawIns(pub u16);

impl RawIns {
    const OPCODE_SHIFT: u16 = 10;
    const MM_SHIFT: u16 = 8;
    const RRR_SHIFT: u16 = 5;
    const WB_SHIFT: u16 = 3;
    const AA_SHIFT: u16 = 1;

    pub const fn from_fields(opcode: u8, mm: u8, rrr: u8, wb: u8, aa: u8, w: u8) -> RawIns {
        RawIns(((opcode as u16 & 0x3f) << Self::OPCODE_SHIFT)
            | ((mm as u16 & 0x3) << Self::MM_SHIFT)
            | ((rrr as u16 & 0x7) << Self::RRR_SHIFT)
            | ((wb as u16 & 0x3) << Self::WB_SHIFT)
            | ((aa as u16 & 0x3) << Self::AA_SHIFT)
            | (w as u16 & 0x1))
    }

    pub const fn opcode(self) -> u8 {
        (self.0 >> Self::OPCODE_SHIFT) as u8
    }

    pub const fn mm(self) -> u8 {
        ((self.0 >> Self::MM_SHIFT) & 0x3) as u8
    }

    /// Also read as ppp or bbb.
    pub const fn rrr(self) -> u8 {
        ((self.0 >> Self::RRR_SHIFT) & 0x7) as u8
    }

    /// Also read as dd.
    pub const fn wb(self) -> u8 {
        ((self.0 >> Self::WB_SHIFT) & 0x3) as u8
    }

    pub const fn aa(self) -> u8 {
        ((self.0 >> Self::AA_SHIFT) & 0x3) as u8
    }

    pub const fn w(self) -> u8 {
        (self.0 & 0x1) as u8
    }

    /// The low byte, holding every operand field except mm.
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    pub fn addr_mode(self) -> AddrMode {
        AddrMode::from_u8(self.aa()).unwrap_or(AddrMode::Base)
    }

    pub fn width(self) -> Width {
        Width::from_bit(self.w() != 0)
    }

    pub fn opcode_kind(self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode())
    }

    pub fn descriptor(self) -> Descriptor {
        self.opcode_kind().map_or(Descriptor::INVALID, Opcode::descriptor)
    }
}

////////////////////////////////////////////////////////////////////////////////

bitflags! {
    /// Operand fields an opcode uses. The three register classes and SPECIAL
    /// all claim bits 7-5, WB and DD claim bits 4-3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Shape: u8 {
        const RRR = 1 << 0;
        const BBB = 1 << 1;
        const PPP = 1 << 2;
        const SPECIAL = 1 << 3;
        const WB = 1 << 4;
        const DD = 1 << 5;
        const AA = 1 << 6;
        const W = 1 << 7;
    }
}

impl Shape {
    const REG_CLASS: Shape = Shape::RRR.union(Shape::BBB).union(Shape::PPP).union(Shape::SPECIAL);
    const WIDTH_SELECT: Shape = Shape::WB.union(Shape::DD);

    /// Bits of the low byte the shape claims as operands.
    pub fn operand_bits(self) -> u8 {
        let mut bits = 0;
        if self.intersects(Self::REG_CLASS) {
            bits |= 0xe0;
        }
        if self.intersects(Self::WIDTH_SELECT) {
            bits |= 0x18;
        }
        if self.contains(Shape::AA) {
            bits |= 0x06;
        }
        if self.contains(Shape::W) {
            bits |= 0x01;
        }
        bits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub shape: Shape,
    /// Required value of the low byte bits the shape doesn't claim.
    pub extra: u8,
    pub mnemonic: Option<&'static str>,
}

impl Descriptor {
    pub const INVALID: Descriptor = Descriptor { shape: Shape::empty(), extra: 0, mnemonic: None };

    const fn new(shape: Shape, extra: u8, mnemonic: &'static str) -> Descriptor {
        Descriptor { shape, extra, mnemonic: Some(mnemonic) }
    }

    const fn unnamed(shape: Shape, extra: u8) -> Descriptor {
        Descriptor { shape, extra, mnemonic: None }
    }

    pub fn is_invalid(&self) -> bool {
        self.shape.is_empty() && self.extra == 0
    }
}

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum Opcode {
    Special = 0,  // nop, sintr, xfer, wid
    Lpdi = 2,
    AddRI = 8,
    OrRI,
    AndRI,
    NotR,
    MovRI,
    IncR = 14,
    DecR,
    JnzR,
    JzR,
    Hlt,
    MovMI,
    MovRM = 32,
    MovMR,
    Lpd,
    MovpPM,  // Restore pointer
    MovLoad, // Memory to memory move, source half
    Tsl,
    MovpMP,  // Store pointer
    Call,
    AddRM,
    OrRM,
    AndRM,
    NotRM,
    Jmce,
    Jmcne,
    Jnbt,
    Jbt,
    AddMI,
    OrMI,
    AndMI,
    MovStore, // Memory to memory move, destination half
    AddMR,
    OrMR,
    AndMR,
    NotM,
    JnzM,
    JzM,
    IncM,
    DecM,
    Setb = 61,
    Clr,
}

impl Opcode {
    pub fn descriptor(self) -> Descriptor {
        use Opcode::*;
        const RRR: Shape = Shape::RRR;
        const BBB: Shape = Shape::BBB;
        const PPP: Shape = Shape::PPP;
        const WB: Shape = Shape::WB;
        const DD: Shape = Shape::DD;
        const AA: Shape = Shape::AA;
        const W: Shape = Shape::W;

        match self {
            Special => Descriptor::unnamed(Shape::SPECIAL, 0x00),
            Lpdi => Descriptor::new(PPP, 0x11, "lpdi"),
            AddRI => Descriptor::new(RRR.union(WB).union(W), 0x00, "add"),
            OrRI => Descriptor::new(RRR.union(WB).union(W), 0x00, "or"),
            AndRI => Descriptor::new(RRR.union(WB).union(W), 0x00, "and"),
            NotR => Descriptor::new(RRR, 0x00, "not"),
            MovRI => Descriptor::new(RRR.union(WB).union(W), 0x00, "mov"),
            IncR => Descriptor::new(RRR, 0x00, "inc"),
            DecR => Descriptor::new(RRR, 0x00, "dec"),
            JnzR => Descriptor::new(RRR.union(DD), 0x00, "jnz"),
            JzR => Descriptor::new(RRR.union(DD), 0x00, "jz"),
            Hlt => Descriptor::new(Shape::empty(), 0x20, "hlt"),
            MovMI => Descriptor::new(WB.union(AA).union(W), 0x00, "mov"),
            MovRM => Descriptor::new(RRR.union(AA).union(W), 0x00, "mov"),
            MovMR => Descriptor::new(RRR.union(AA).union(W), 0x00, "mov"),
            Lpd => Descriptor::new(PPP.union(AA), 0x01, "lpd"),
            MovpPM => Descriptor::new(PPP.union(AA), 0x01, "movp"),
            MovLoad => Descriptor::unnamed(AA.union(W), 0x00),
            Tsl => Descriptor::new(AA, 0x18, "tsl"),
            MovpMP => Descriptor::new(PPP.union(AA), 0x01, "movp"),
            Call => Descriptor::new(DD.union(AA), 0x81, "call"),
            AddRM => Descriptor::new(RRR.union(AA).union(W), 0x00, "add"),
            OrRM => Descriptor::new(RRR.union(AA).union(W), 0x00, "or"),
            AndRM => Descriptor::new(RRR.union(AA).union(W), 0x00, "and"),
            NotRM => Descriptor::new(RRR.union(AA).union(W), 0x00, "not"),
            Jmce => Descriptor::new(DD.union(AA), 0x00, "jmce"),
            Jmcne => Descriptor::new(DD.union(AA), 0x00, "jmcne"),
            Jnbt => Descriptor::new(BBB.union(DD).union(AA), 0x00, "jnbt"),
            Jbt => Descriptor::new(BBB.union(DD).union(AA), 0x00, "jbt"),
            AddMI => Descriptor::new(WB.union(AA).union(W), 0x00, "add"),
            OrMI => Descriptor::new(WB.union(AA).union(W), 0x00, "or"),
            AndMI => Descriptor::new(WB.union(AA).union(W), 0x00, "and"),
            MovStore => Descriptor::new(AA.union(W), 0x00, "mov"),
            AddMR => Descriptor::new(RRR.union(AA).union(W), 0x00, "add"),
            OrMR => Descriptor::new(RRR.union(AA).union(W), 0x00, "or"),
            AndMR => Descriptor::new(RRR.union(AA).union(W), 0x00, "and"),
            NotM => Descriptor::new(AA.union(W), 0x00, "not"),
            JnzM => Descriptor::new(DD.union(AA).union(W), 0x00, "jnz"),
            JzM => Descriptor::new(DD.union(AA).union(W), 0x00, "jz"),
            IncM => Descriptor::new(AA.union(W), 0x00, "inc"),
            DecM => Descriptor::new(AA.union(W), 0x00, "dec"),
            Setb => Descriptor::new(BBB.union(AA), 0x00, "setb"),
            Clr => Descriptor::new(BBB.union(AA), 0x00, "clr"),
        }
    }

    /// The register operand goes before the addressed location rather than
    /// after it (add/or/and/not into a register).
    pub fn reg_first(self) -> bool {
        matches!(self, Opcode::AddRM | Opcode::OrRM | Opcode::AndRM | Opcode::NotRM)
    }

    pub fn to_raw(self) -> u8 {
        self.to_u8().unwrap_or_default()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Opcode 0 has no operands; bits 7-5 pick the operation instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Nop,
    Sintr,
    Xfer,
    Wid(WidthMode),
}

impl Special {
    const NOP: u16 = 0x0000;
    const SINTR: u16 = 0x0040;
    const XFER: u16 = 0x0060;
    const WID: u16 = 0x0080;
    const WID_SHIFT: u16 = 5;

    pub fn decode(raw: RawIns) -> Option<Special> {
        if raw.0 & 0xff00 != 0 {
            return None;
        }
        match raw.0 {
            Self::NOP => Some(Special::Nop),
            Self::SINTR => Some(Special::Sintr),
            Self::XFER => Some(Special::Xfer),
            w if w & Self::WID != 0 => {
                Some(Special::Wid(WidthMode::from_bits(((w >> Self::WID_SHIFT) & 0x3) as u8)))
            },
            _ => None,
        }
    }

    pub fn encode(self) -> RawIns {
        RawIns(match self {
            Special::Nop => Self::NOP,
            Special::Sintr => Self::SINTR,
            Special::Xfer => Self::XFER,
            Special::Wid(mode) => Self::WID | ((mode.to_bits() as u16) << Self::WID_SHIFT),
        })
    }
}

impl fmt::Display for Special {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Special::Nop => write!(f, "nop"),
            Special::Sintr => write!(f, "sintr"),
            Special::Xfer => write!(f, "xfer"),
            Special::Wid(mode) => write!(f, "wid {},{}", mode.src.bits(), mode.dst.bits()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// A fetched instruction: the instruction word plus whatever trailing bytes
/// its fields called for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ins {
    pub raw: RawIns,
    /// Offset byte of the [preg].off mode.
    pub offset: u8,
    /// Immediate or jump displacement, sign extended. For lpdi the raw 4 byte
    /// segmented pointer.
    pub imm: u32,
    /// tsl's jump displacement.
    pub sdisp: i8,
}

impl Ins {
    pub fn new(raw: RawIns) -> Ins {
        Ins { raw, offset: 0, imm: 0, sdisp: 0 }
    }

    pub fn opcode(&self) -> Option<Opcode> {
        self.raw.opcode_kind()
    }

    pub fn descriptor(&self) -> Descriptor {
        self.raw.descriptor()
    }

    pub fn reg(&self) -> Reg {
        Reg::from_rrr(self.raw.rrr())
    }

    pub fn base(&self) -> Reg {
        Reg::from_mm(self.raw.mm())
    }

    pub fn bit(&self) -> u8 {
        self.raw.rrr()
    }

    pub fn disp(&self) -> i32 {
        self.imm as i32
    }
}

use crate::Bus;

use common::asm::Width;
use common::mem::Space;

/// Width of a single access. Pointer is the 3 byte image movp and call use,
/// Long the 4 byte segmented pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte,
    Word,
    Pointer,
    Long,
}

impl Size {
    pub fn bytes(self) -> u32 {
        match self {
            Size::Byte => 1,
            Size::Word => 2,
            Size::Pointer => 3,
            Size::Long => 4,
        }
    }

    fn narrower(self, by: u32) -> Size {
        match self.bytes() - by {
            1 => Size::Byte,
            2 => Size::Word,
            _ => Size::Pointer,
        }
    }
}

impl From<Width> for Size {
    fn from(width: Width) -> Size {
        match width {
            Width::Byte => Size::Byte,
            Width::Word => Size::Word,
        }
    }
}

fn read8<B: Bus + ?Sized>(bus: &mut B, addr: u32, space: Space) -> u32 {
    match space {
        Space::Mem => bus.read_mem8(addr) as u32,
        Space::Io => bus.read_io8(addr as u16) as u32,
    }
}

fn read16<B: Bus + ?Sized>(bus: &mut B, addr: u32, space: Space) -> u32 {
    match space {
        Space::Mem => bus.read_mem16(addr) as u32,
        Space::Io => bus.read_io16(addr as u16) as u32,
    }
}

fn write8<B: Bus + ?Sized>(bus: &mut B, addr: u32, space: Space, val: u32) {
    match space {
        Space::Mem => bus.write_mem8(addr, val as u8),
        Space::Io => bus.write_io8(addr as u16, val as u8),
    }
}

fn write16<B: Bus + ?Sized>(bus: &mut B, addr: u32, space: Space, val: u32) {
    match space {
        Space::Mem => bus.write_mem16(addr, val as u16),
        Space::Io => bus.write_io16(addr as u16, val as u16),
    }
}

/// Reads size bytes at addr, little endian. Word primitives are only used
/// at even addresses; an odd address costs a byte access first.
pub fn read<B: Bus + ?Sized>(bus: &mut B, addr: u32, space: Space, size: Size) -> u32 {
    let addr = addr & space.mask();
    if size == Size::Byte {
        return read8(bus, addr, space);
    }
    if addr & 0x1 != 0 {
        let low = read8(bus, addr, space);
        return low | (read(bus, addr + 1, space, size.narrower(1)) << u8::BITS);
    }
    let low = read16(bus, addr, space);
    if size == Size::Word {
        return low;
    }
    low | (read(bus, addr + 2, space, size.narrower(2)) << u16::BITS)
}

pub fn write<B: Bus + ?Sized>(bus: &mut B, addr: u32, space: Space, val: u32, size: Size) {
    let addr = addr & space.mask();
    if size == Size::Byte {
        write8(bus, addr, space, val);
        return;
    }
    if addr & 0x1 != 0 {
        write8(bus, addr, space, val);
        write(bus, addr + 1, space, val >> u8::BITS, size.narrower(1));
        return;
    }
    write16(bus, addr, space, val);
    if size != Size::Word {
        write(bus, addr + 2, space, val >> u16::BITS, size.narrower(2));
    }
}

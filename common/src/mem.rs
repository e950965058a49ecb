use crate::constants::{IO_ADDR_MASK, MEM_ADDR_MASK};

use std::fmt;

use derive_more::IsVariant;

/// The two disjoint address domains. A register's tag bit selects which one
/// an access through that register goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum Space {
    Mem,
    Io,
}

impl Space {
    pub fn mask(self) -> u32 {
        match self {
            Space::Mem => MEM_ADDR_MASK,
            Space::Io => IO_ADDR_MASK,
        }
    }

    pub fn from_tag(tag: bool) -> Space {
        if tag { Space::Io } else { Space::Mem }
    }

    pub fn tag(self) -> bool {
        self.is_io()
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Space::Mem => write!(f, "MEM"),
            Space::Io => write!(f, "IO"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

pub const OFFSET_MASK: u32 = 0xffff;
pub const SEGMENT_SHIFT: u32 = 4;

/// Flattens a segmented pointer as it's laid out in memory (offset in the low
/// word, segment in the high word) into a 20 bit physical address.
pub fn segoff(ptr: u32) -> u32 {
    let offset = ptr & OFFSET_MASK;
    let segment = ptr >> u16::BITS;
    ((segment << SEGMENT_SHIFT) + offset) & MEM_ADDR_MASK
}

// Layout of the 3 byte image movp and call store: the low 16 bits of the
// register, the tag in bit 19, and the upper nibble of the register in
// bits 23-20.
const IMAGE_TAG_SHIFT: u32 = 19;
const IMAGE_NIBBLE_SHIFT: u32 = 4;
const NIBBLE_MASK: u32 = 0xf_0000;

pub fn pack_pointer(val: u32, space: Space) -> u32 {
    (val & OFFSET_MASK)
        | ((val & NIBBLE_MASK) << IMAGE_NIBBLE_SHIFT)
        | ((space.tag() as u32) << IMAGE_TAG_SHIFT)
}

pub fn unpack_pointer(image: u32) -> (u32, Space) {
    let space = Space::from_tag((image >> IMAGE_TAG_SHIFT) & 0x1 != 0);
    let val = (image & OFFSET_MASK) | ((image >> IMAGE_NIBBLE_SHIFT) & NIBBLE_MASK);
    (val, space)
}

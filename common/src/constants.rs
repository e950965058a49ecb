pub const MEM_ADDR_MASK: u32 = 0xf_ffff;
pub const IO_ADDR_MASK: u32 = 0xffff;

pub const NUM_CHANNELS: usize = 2;

// Channel attention pointer chain, fixed by the hardware.
pub const SYSBUS_ADDR: u32 = 0xffff6;
pub const SCP_ADDR: u32 = 0xffff8;
pub const SCB_CB_PTR: u32 = 2; // Offset of the control block pointer in the SCB
pub const CB_CHANNEL_STRIDE: u32 = 8; // Bytes per channel in the control block
pub const CB_PB_PTR: u32 = 2; // Offset of the parameter block pointer from the start of the CB

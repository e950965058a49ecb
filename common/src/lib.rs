pub mod asm;
pub mod constants;
pub mod disasm;
pub mod mem;
pub mod validate;

use crate::{load, mem, reg, run_with};

use emu_lib::{Chan, StepError, StepFlags};

use common::asm::Reg;
use common::validate::InvalidEncoding;

const DATA: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];

#[test]
fn moves() {
    let prog = [
        0x11, 0x08, 0x00, 0x20, 0x00, 0x00, // lpdi ga,0x00002000
        0x31, 0x08, 0x00, 0x30, 0x00, 0x00, // lpdi gb,0x00003000
        0x00, 0x90, 0x00, 0xcd, // movb [gb],[ga]
        0x03, 0x90, 0x02, 0x03, 0xcd, 0x02, // mov [gb].2,[ga].2
        0x20, 0x48, // hlt
    ];
    let (emu, steps) = run_with(&prog, &DATA);
    // A move is one step.
    assert_eq!(steps, 5);
    assert_eq!(mem(&emu, 0x3000, 5), [0x11, 0x00, 0x33, 0x44, 0x00]);
}

#[test]
fn copy_loop() {
    let prog = [
        0x11, 0x08, 0x00, 0x20, 0x00, 0x00, // lpdi ga,0x00002000
        0x31, 0x08, 0x00, 0x30, 0x00, 0x00, // lpdi gb,0x00003000
        0x71, 0x30, 0x04, 0x00, // movi bc,0x0004
        0xb1, 0x30, 0x04, 0x00, // movi ix,0x0004
        0x04, 0x90, 0x06, 0xcd, // loop: movb [gb+ix+],[ga+ix]
        0x60, 0x3c, // dec bc
        0x68, 0x40, 0xf7, // jnz bc,loop
        0x20, 0x48, // hlt
    ];
    let (emu, steps) = run_with(&prog, &DATA);
    assert_eq!(steps, 17);
    // Both halves see the same ix; only the store bumps it.
    assert_eq!(reg(&emu, Reg::Ix), 8);
    assert_eq!(mem(&emu, 0x3000, 8), [0, 0, 0, 0, 0x55, 0x66, 0x77, 0x88]);
}

#[test]
fn unpaired_halves() {
    let prog = [
        0x01, 0x90, // load half
        0x00, 0x00, // nop
    ];
    let mut emu = load(&prog);
    assert_eq!(
        emu.step(Chan::Ch0, StepFlags::RUN),
        Err(StepError::InvalidEncoding(InvalidEncoding::LoadWithoutStore))
    );

    let prog = [
        0x01, 0xcd, // store half
    ];
    let mut emu = load(&prog);
    assert_eq!(
        emu.step(Chan::Ch0, StepFlags::RUN),
        Err(StepError::InvalidEncoding(InvalidEncoding::StoreWithoutLoad))
    );
    let mut emu = load(&prog);
    assert_eq!(
        emu.step(Chan::Ch0, StepFlags::EXEC),
        Err(StepError::UnknownOpcode { opcode: 51, word: 0xcd01 })
    );
}

use crate::disk::{DISK_PROGRAM, PROGRAM};

use disassembler::disassemble;

use emu_lib::StepError;

use common::validate::InvalidEncoding;

fn line_at(offset: u32) -> String {
    let out = disassemble(&DISK_PROGRAM, PROGRAM, true);
    let dis = out.iter().find(|dis| dis.addr == PROGRAM + offset).unwrap();
    dis.to_string()
}

#[test]
fn whole_program() {
    let out = disassemble(&DISK_PROGRAM, PROGRAM, true);
    assert!(out.iter().all(|dis| dis.line.is_ok()));
    assert_eq!(out.len(), 70);
    let covered: u32 = out.iter().map(|dis| dis.len).sum();
    assert_eq!(covered, DISK_PROGRAM.len() as u32);
}

#[test]
fn lines() {
    assert_eq!(line_at(0x000), "ffeba: 3051 ffd0           movi gc,0xffd0");
    assert_eq!(line_at(0x00c), "ffec6: 9302 08 ce02 02     movb [gc].2,[pp].8");
    assert_eq!(line_at(0x01a), "ffed4: 4f13 14 0000        movi [pp].20,0x0000");
    assert_eq!(line_at(0x023), "ffedd: ba12 04 00e2        ljnbt [gc].4,0,[tp].226");
    assert_eq!(line_at(0x055), "fff0f: 9303 06 cf03 14     mov [pp].20,[pp].6");
    assert_eq!(line_at(0x06b), "fff25: 8b03 0c             lpd ga,[pp].12");
    assert_eq!(line_at(0x075), "fff2f: 9f8b 16 70          call [pp].22,[tp].112");
    assert_eq!(line_at(0x092), "fff4c: 00a0                wid 8,16");
    assert_eq!(line_at(0x09d), "fff57: 2088 0f             addbi tp,0x0f");
    assert_eq!(line_at(0x0bf), "fff79: b60a 06 33          jmcne [gc].6,[tp].51");
    assert_eq!(line_at(0x0f3), "fffad: 8f83 16             movp tp,[pp].22");
    assert_eq!(line_at(0x100), "fffba: f7e2 05             setb [pp].5,7");
    assert_eq!(line_at(0x111), "fffcb: 4820                hlt");
}

#[test]
fn bad_words_are_skipped() {
    let bin = [
        0x20, 0x00, // undefined special
        0x01, 0xcd, // store half
        0x40, 0x00, // sintr
    ];
    let out = disassemble(&bin, 0, true);
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].line, Err(StepError::InvalidEncoding(InvalidEncoding::BadSpecial(0x0020))));
    assert_eq!(out[1].line, Err(StepError::InvalidEncoding(InvalidEncoding::StoreWithoutLoad)));
    assert_eq!(
        out[1].to_string(),
        "00002: cd01                .word 0xcd01 ; Memory to memory store without a preceding load"
    );
    assert_eq!(out[2].to_string(), "00004: 0040                sintr");
}

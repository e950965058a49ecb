use emu_lib::io::flat::FlatBus;
use emu_lib::{Bus, Chan, Emulator, StepFlags};

use common::asm::Reg;
use common::constants::{SCP_ADDR, SYSBUS_ADDR};
use common::mem::Space;

// A hard disk controller driven by a channel program: select, seek, then
// read sectors through the controller's data port into local I/O memory,
// and finally block copy them out to the host's buffer.

const PB: u32 = 0x00ee9;
pub const PROGRAM: u32 = 0xffeba;
const BUFFER: u32 = 0x006ca;
const BUFFER_LEN: usize = 1024;

// Parameter block fields
const PB_STATUS: u32 = 0x05;
const PB_SECTOR: u32 = 0x09;
const PB_SECTOR_COUNT: u32 = 0x10;
const PB_CYLINDER_SAVE: u32 = 0x14;
const PB_RETURN: u32 = 0x16;

const SECTOR_FILL: u8 = 0x5a;
const LOCAL_MEM_SIZE: u16 = 0x4000;

pub const DISK_PROGRAM: [u8; 275] = [
    0x51, 0x30, 0xd0, 0xff, // 0000: movi gc,0xffd0
    0xaa, 0xbb, 0x04, 0x20, // 0004: jnbt [pp].0x4,5,cmd_no_bit5

    0x0a, 0x4e, 0x06, 0x80, // 0008: movbi [gc].0x6,0x80
    0x02, 0x93, 0x08, 0x02, 0xce, 0x02, // 000c: movb [gc].0x2,[pp].0x8
    0xea, 0xba, 0x06, 0xfc, // 0012: loop_0: jnbt [gc].0x6,7,loop_0

    0x0a, 0x4e, 0x06, 0x20, // 0016: movbi [gc].0x6,0x20
    0x13, 0x4f, 0x14, 0x00, 0x00, // 001a: movi [pp].0x14,0x0
    0x0a, 0xbe, 0x06, 0xfc, // 001f: loop_1: jbt [gc].0x6,0,loop_1
    0x12, 0xba, 0x04, 0xe2, 0x00, // 0023: ljnbt [gc].0x4,0,ret_81

    0x0a, 0xcb, 0x04, 0x0f, // 0028: cmd_no_bit5: andbi [pp].0x4,0xf
    0x12, 0xe7, 0x04, 0xb1, 0x00, // 002c: ljzb [pp].0x4,ret_00

    0x02, 0x93, 0x08, 0x02, 0xce, 0x02, // 0031: movb [gc].0x2,[pp].0x8
    0xea, 0xba, 0x06, 0xfc, // 0037: loop_2: jnbt [gc].0x6,7,loop_2

    0x02, 0x93, 0x14, 0x00, 0xce, // 003b: movb [gc],[pp].0x14
    0x02, 0x93, 0x15, 0x00, 0xce, // 0040: movb [gc],[pp].0x15
    0x02, 0x93, 0x06, 0x02, 0xce, 0x04, // 0045: movb [gc].0x4,[pp].0x6
    0x02, 0x93, 0x07, 0x02, 0xce, 0x04, // 004b: movb [gc].0x4,[pp].0x7
    0x0a, 0x4e, 0x06, 0x10, // 0051: movbi [gc].0x6,0x10
    0x03, 0x93, 0x06, 0x03, 0xcf, 0x14, // 0055: mov [pp].0x14,[pp].0x6
    0x0a, 0xbe, 0x06, 0xfc, // 005b: loop_3: jbt [gc].0x6,0,loop_3
    0x2a, 0xba, 0x04, 0xfc, // 005f: loop_4: jnbt [gc].0x4,1,loop_4
    0x0a, 0xe7, 0x10, 0x7b, // 0063: jzb [pp].0x10,ret_00
    0x0a, 0xbf, 0x04, 0x0e, // 0067: jbt [pp].0x4,0,read_op
    0x03, 0x8b, 0x0c, // 006b: lpd ga,[pp].0xc
    0x31, 0x30, 0x00, 0x00, // 006e: movi gb,0x0
    0x63, 0x83, 0x0a, // 0072: mov bc,[pp].0xa
    0x8b, 0x9f, 0x16, 0x70, // 0075: call [pp].0x16,mmxfer

    0x31, 0x30, 0x00, 0x00, // 0079: read_op: movi gb,0x0
    0xf1, 0x30, 0x80, 0xfe, // 007d: movi mc,0xfe80
    0x11, 0x30, 0xd0, 0xff, // 0081: movi ga,0xffd0
    0x13, 0x4f, 0x12, 0x00, 0x02, // 0085: movi [pp].0x12,512
    0x0a, 0xbb, 0x04, 0x12, // 008a: jnbt [pp].0x4,0,write_op
    0xd1, 0x30, 0x28, 0x8a, // 008e: movi cc,0x8a28
    0xa0, 0x00, // 0092: wid 8,16
    0x6a, 0xbb, 0x04, 0x17, // 0094: jnbt [pp].0x4,3,do_one_xfer
    0x13, 0x4f, 0x12, 0x05, 0x02, // 0098: movi [pp].0x12,517
    0x88, 0x20, 0x0f, // 009d: jmp do_one_xfer

    0xd1, 0x30, 0x28, 0x56, // 00a0: write_op: movi cc,0x5628
    0xc0, 0x00, // 00a4: wid 16,8
    0x4a, 0xbb, 0x04, 0x05, // 00a6: jnbt [pp].0x4,2,do_one_xfer
    0x13, 0x4f, 0x12, 0x04, 0x00, // 00aa: movi [pp].0x12,4

    0x63, 0x83, 0x12, // 00af: do_one_xfer: mov bc,[pp].0x12
    0x02, 0x93, 0x09, 0x00, 0xce, // 00b2: movb [gc],[pp].0x9
    0x60, 0x00, // 00b7: xfer
    0x02, 0x93, 0x04, 0x02, 0xce, 0x06, // 00b9: movb [gc].0x6,[pp].0x4
    0x0a, 0xb6, 0x06, 0x33, // 00bf: jmcne [gc].0x6,ret_err
    0x02, 0xef, 0x10, // 00c3: decb [pp].0x10
    0x0a, 0xe7, 0x10, 0x06, // 00c6: jzb [pp].0x10,xfers_done
    0x02, 0xeb, 0x09, // 00ca: incb [pp].0x9
    0x88, 0x20, 0xdf, // 00cd: jmp do_one_xfer

    0x0a, 0xbb, 0x04, 0x0e, // 00d0: xfers_done: jnbt [pp].0x4,0,ret_00
    0x23, 0x8b, 0x0c, // 00d4: lpd gb,[pp].0xc
    0x11, 0x30, 0x00, 0x00, // 00d7: movi ga,0x0
    0x63, 0x83, 0x0a, // 00db: mov bc,[pp].0xa
    0x8b, 0x9f, 0x16, 0x07, // 00de: call [pp].0x16,mmxfer
    0x0a, 0x4f, 0x05, 0x00, // 00e2: ret_00: movbi [pp].0x5,0x0
    0x88, 0x20, 0x26, // 00e6: jmp ret

    0xe0, 0x00, // 00e9: mmxfer: wid 16,16
    0xd1, 0x30, 0x08, 0xc2, // 00eb: movi cc,0xc208
    0x60, 0x00, // 00ef: xfer
    0x00, 0x00, // 00f1: nop
    0x83, 0x8f, 0x16, // 00f3: movp tp,[pp].0x16

    0x02, 0x92, 0x06, 0x02, 0xcf, 0x05, // 00f6: ret_err: movb [pp].0x5,[gc].0x6
    0x0a, 0xcb, 0x05, 0x7e, // 00fc: andbi [pp].0x5,0x7e
    0xe2, 0xf7, 0x05, // 0100: setb [pp].0x5,7
    0x0a, 0x4e, 0x06, 0x00, // 0103: movbi [gc].0x6,0x0
    0x88, 0x20, 0x05, // 0107: jmp ret

    0x13, 0x4f, 0x05, 0x81, 0x00, // 010a: ret_81: movi [pp].0x5,0x81
    0x40, 0x00, // 010f: ret: sintr
    0x20, 0x48, // 0111: hlt
];

#[derive(Default)]
struct Controller {
    status: u8,
    seek_status: u8,
    cylinder: u16,
    drive_head: u8,
    written: Vec<u8>,
}

impl Controller {
    const DATA: u16 = 0xffd0;
    const DRIVE_HEAD: u16 = 0xffd2;
    const CYLINDER: u16 = 0xffd4;
    const COMMAND: u16 = 0xffd6;

    const CMD_START: u8 = 0x01;
    const CMD_SEEK: u8 = 0x10;
    const CMD_SELECT: u8 = 0x20;
    const CMD_RESET: u8 = 0x80;

    const SELECTED: u8 = 0x80;
    const BUSY: u8 = 0x01;

    const HEAD_READY: u8 = 0x01;
    const SEEK_DONE: u8 = 0x02;
}

// Memory and I/O below 16K are plain RAM; the controller sits at the top
// of the I/O space.
struct DiskBus {
    ram: FlatBus,
    ctl: Controller,
}

impl DiskBus {
    fn new() -> DiskBus {
        let mut ram = FlatBus::new();
        ram.load_image(&[0x01], SYSBUS_ADDR);
        ram.load_image(&[0x10, 0x04, 0x00, 0x00], SCP_ADDR);
        ram.load_image(&[0x01, 0x00, 0x00, 0x00, 0x40, 0x00], 0x410);
        ram.load_image(&[0x03, 0x00, 0xe9, 0x0e, 0x00, 0x00], 0x400);
        ram.load_image(&[
            0xba, 0x1e, 0x00, 0xfe, // program
            0x21, // opcode
            0xff, // status
            0x34, 0x12, // cylinder
            0x56, // drive and head
            0x78, // first sector
            0x00, 0x04, // byte count
            0xca, 0x06, 0x00, 0x00, // buffer
            0x02, // sector count
        ], PB);
        ram.load_image(&DISK_PROGRAM, PROGRAM);
        DiskBus { ram, ctl: Controller::default() }
    }
}

impl Bus for DiskBus {
    fn read_mem8(&mut self, addr: u32) -> u8 {
        self.ram.read_mem8(addr)
    }

    fn write_mem8(&mut self, addr: u32, val: u8) {
        self.ram.write_mem8(addr, val)
    }

    fn read_io8(&mut self, addr: u16) -> u8 {
        match addr {
            Controller::DATA => SECTOR_FILL,
            Controller::CYLINDER => self.ctl.seek_status,
            Controller::COMMAND => self.ctl.status,
            a if a < LOCAL_MEM_SIZE => self.ram.read_io8(a),
            a => panic!("Read from unmapped I/O {a:#06x}"),
        }
    }

    fn write_io8(&mut self, addr: u16, val: u8) {
        let ctl = &mut self.ctl;
        match addr {
            Controller::DATA => ctl.written.push(val),
            Controller::DRIVE_HEAD => {
                ctl.drive_head = val;
                ctl.status |= Controller::SELECTED;
            },
            Controller::CYLINDER => ctl.cylinder = (ctl.cylinder >> u8::BITS) | ((val as u16) << u8::BITS),
            Controller::COMMAND => match val {
                Controller::CMD_START => {},
                Controller::CMD_SEEK => {
                    ctl.status &= !Controller::BUSY;
                    ctl.seek_status |= Controller::SEEK_DONE;
                },
                Controller::CMD_SELECT => ctl.seek_status |= Controller::HEAD_READY,
                Controller::CMD_RESET => {
                    ctl.status = 0;
                    ctl.seek_status = 0;
                    ctl.cylinder = 0;
                },
                v => panic!("Bad controller command {v:#04x}"),
            },
            a if a < LOCAL_MEM_SIZE => self.ram.write_io8(a, val),
            a => panic!("Write to unmapped I/O {a:#06x}"),
        }
    }

    fn on_interrupt_signal(&mut self, chan: Chan) {
        self.ram.on_interrupt_signal(chan)
    }
}

fn pb(emu: &Emulator<DiskBus>, field: u32) -> u8 {
    emu.bus().ram.mem()[(PB + field) as usize]
}

#[test]
fn read_two_sectors() {
    const MAX_STEPS: usize = 10_000;

    let mut emu = Emulator::new(DiskBus::new());
    assert_eq!(emu.channel_attention(Chan::Ch0), 0x03);
    assert_eq!(emu.channel(Chan::Ch0).addr(Reg::Pp), (PB, Space::Mem));

    let mut listing = vec![];
    let halted = (0..MAX_STEPS).any(|_| {
        let step = emu.step(Chan::Ch0, StepFlags::RUN | StepFlags::LIST).unwrap();
        listing.extend(step.listing.map(|l| l.to_string()));
        step.ret.is_halt()
    });
    assert!(halted);

    assert_eq!(listing[0], "ffeba: 3051 ffd0           movi gc,0xffd0");
    assert_eq!(listing[1], "ffebe: bbaa 04 20          jnbt [pp].4,5,[tp].32");
    assert_eq!(listing.last().map(String::as_str), Some("fffcb: 4820                hlt"));

    let bus = emu.bus();
    let buffer = &bus.ram.mem()[BUFFER as usize..BUFFER as usize + BUFFER_LEN];
    assert!(buffer.iter().all(|&b| b == SECTOR_FILL));
    // Nothing past the end.
    assert_eq!(bus.ram.mem()[BUFFER as usize + BUFFER_LEN], 0);
    // The sectors were staged in local I/O memory.
    assert!(bus.ram.io()[..BUFFER_LEN].iter().all(|&b| b == SECTOR_FILL));

    // Cylinder bytes, then one sector number per sector.
    assert_eq!(bus.ctl.written, [0x00, 0x00, 0x78, 0x79]);
    assert_eq!(bus.ctl.cylinder, 0x1234);
    assert_eq!(bus.ctl.drive_head, 0x56);

    assert_eq!(pb(&emu, PB_STATUS), 0);
    assert_eq!(pb(&emu, PB_SECTOR), 0x79);
    assert_eq!(pb(&emu, PB_SECTOR_COUNT), 0);
    assert_eq!(pb(&emu, PB_CYLINDER_SAVE), 0x34);
    assert_eq!(pb(&emu, PB_CYLINDER_SAVE + 1), 0x12);
    // Return address from the call to the copy routine, 0xfff9c.
    assert_eq!(pb(&emu, PB_RETURN), 0x9c);
    assert_eq!(pb(&emu, PB_RETURN + 1), 0xff);
    assert_eq!(pb(&emu, PB_RETURN + 2), 0xf0);

    assert_eq!(bus.ram.interrupts(Chan::Ch0), 1);
    assert_eq!(emu.channel(Chan::Ch0).addr(Reg::Gb), (BUFFER + BUFFER_LEN as u32, Space::Mem));
}

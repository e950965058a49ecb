use crate::access::{self, Size};
use crate::{Bus, Chan, Emulator, EmulatorState};

use common::asm::Reg;
use common::constants::*;
use common::mem::{Space, segoff};

use log::{debug, info};

impl<B: Bus> Emulator<B> {
    fn read_byte(&mut self, addr: u32) -> u8 {
        access::read(self.bus_mut(), addr, Space::Mem, Size::Byte) as u8
    }

    // A 4 byte segmented pointer in memory, flattened.
    fn read_pointer(&mut self, addr: u32) -> u32 {
        segoff(access::read(self.bus_mut(), addr, Space::Mem, Size::Long))
    }

    /// Returns both channels to their power on state and forgets the
    /// control block, so the next attention walks the configuration again.
    pub fn reset(&mut self) {
        *self.get_state_mut() = EmulatorState::new();
    }

    /// Handles a channel attention: reads the channel's command and busy
    /// bytes from its control block slot, then points pp at the parameter
    /// block the control block names and tp at the program it names. The first attention after reset locates the
    /// control block through the system configuration pointer. Returns the
    /// channel command word.
    pub fn channel_attention(&mut self, chan: Chan) -> u8 {
        let cb = match self.get_state().control_block() {
            Some(cb) => cb,
            None => {
                let sysbus = self.read_byte(SYSBUS_ADDR);
                let scb = self.read_pointer(SCP_ADDR);
                let soc = self.read_byte(scb);
                let cb = self.read_pointer(scb + SCB_CB_PTR);
                info!("Configured: sysbus {sysbus:#04x}, scb {scb:05x}, soc {soc:#04x}, cb {cb:05x}");
                self.get_state_mut().set_control_block(Some(cb));
                cb
            },
        };

        let base = cb + CB_CHANNEL_STRIDE * chan.index() as u32;
        let ccw = self.read_byte(base);
        let busy = self.read_byte(base + 1);
        // One parameter block pointer, shared by both channels.
        let pp = self.read_pointer(cb + CB_PB_PTR);
        let tp = self.read_pointer(pp);

        let ch = self.channel_mut(chan);
        ch.load_reg(Reg::Pp, pp, Space::Mem);
        ch.load_reg(Reg::Tp, tp, Space::Mem);
        debug!("{chan}: attention, ccw {ccw:#04x}, busy {busy:#04x}");
        info!("{chan}: parameter block {pp:05x}, program {tp:05x}");
        ccw
    }
}

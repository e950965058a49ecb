use emu_lib::io::flat::FlatBus;
use emu_lib::{Chan, Emulator, StepFlags};

use common::asm::Reg;
use common::mem::Space;

use std::process::ExitCode;

use clap::Parser;


fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// 8089 I/O Processor Emulator
#[derive(Parser)]
struct Args {
    /// Memory image to load
    image: String,

    /// Address (hex) to load the image at.
    #[arg(long, default_value = "0", value_parser = parse_hex)]
    load: u32,

    /// Address (hex) to start executing at. Without it, the channel is
    /// started through a channel attention.
    #[arg(long, value_parser = parse_hex)]
    start: Option<u32>,

    /// Channel to run.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    channel: u8,

    /// Print each instruction as it runs.
    #[arg(long)]
    trace: bool,

    /// Give up after this many instructions.
    #[arg(long)]
    max_steps: Option<usize>,
}


fn main() -> ExitCode {
    env_logger::init();

    let opt = Args::parse();

    let buf = match std::fs::read(&opt.image) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("{}: {e}", opt.image);
            return ExitCode::FAILURE;
        },
    };
    let mut bus = FlatBus::new();
    bus.load_image(&buf, opt.load);

    let chan = if opt.channel == 0 { Chan::Ch0 } else { Chan::Ch1 };
    let mut emu = Emulator::new(bus);
    match opt.start {
        Some(start) => emu.channel_mut(chan).load_reg(Reg::Tp, start, Space::Mem),
        None => {
            emu.channel_attention(chan);
        },
    }

    let mut flags = StepFlags::RUN;
    if opt.trace {
        flags |= StepFlags::LIST;
    }

    let mut steps = 0;
    let code = loop {
        if opt.max_steps.is_some_and(|max| steps >= max) {
            eprintln!("Stopped after {steps} instructions");
            break ExitCode::FAILURE;
        }
        steps += 1;
        match emu.step(chan, flags) {
            Ok(step) => {
                if let Some(listing) = step.listing {
                    println!("{listing}");
                }
                if step.ret.is_halt() {
                    break ExitCode::SUCCESS;
                }
            },
            Err(e) => {
                eprintln!("{chan}: {e}");
                break ExitCode::FAILURE;
            },
        }
    };

    print!("{}", emu.get_state());
    code
}

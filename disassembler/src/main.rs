use disassembler::{Disassembled, disassemble};

use common::constants::MEM_ADDR_MASK;

use std::io::Read;
use std::ops::Range;
use std::process::ExitCode;

use clap::Parser;
use clap_stdin::FileOrStdin;

fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// 8089 Disassembler
#[derive(Parser)]
struct Args {
    /// Binary to disassemble, or - for stdin.
    #[arg(default_value = "-")]
    bin: FileOrStdin,

    /// Address (hex) the binary is loaded at.
    #[arg(long, default_value = "0", value_parser = parse_hex)]
    origin: u32,

    /// List instructions even if their encoding is invalid.
    #[arg(long)]
    no_validate: bool,
}

fn remove_long_nops(disassembly: &mut Vec<Disassembled>) {
    const THRESH: usize = 8;

    let mut ranges = vec![];
    let mut range_start = None;
    for (i, dis) in disassembly.iter().enumerate() {
        if dis.is_nop() {
            if range_start.is_none() {
                range_start = Some(i);
            }
        } else if let Some(start) = range_start {
            ranges.push(Range{start, end: i});
            range_start = None;
        }
    }
    if let Some(start) = range_start {
        ranges.push(Range{start, end: disassembly.len()});
    }

    for range in ranges.iter().rev() {
        if range.len() > THRESH {
            // Leave the first and last, an ellipses will be added between.
            disassembly.drain(range.start + 1..range.end - 1);
        }
    }
}

fn read_input(input: FileOrStdin) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut buf = vec![];
    input.into_reader()?.read_to_end(&mut buf)?;
    Ok(buf)
}


fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let name = args.bin.filename().to_owned();
    let bin = match read_input(args.bin) {
        Ok(bin) => bin,
        Err(e) => {
            eprintln!("{name}: {e}");
            return ExitCode::FAILURE;
        },
    };

    let mut disassembly = disassemble(&bin, args.origin, !args.no_validate);
    let failed = disassembly.iter().any(|dis| dis.line.is_err());

    remove_long_nops(&mut disassembly);

    let mut prev: Option<Disassembled> = None;
    for dis in disassembly {
        if let Some(p) = &prev {
            if (p.addr + p.len) & MEM_ADDR_MASK != dis.addr {
                println!("...");
            }
        }
        println!("{}", dis);
        prev = Some(dis);
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

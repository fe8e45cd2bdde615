use clap::{Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use zdis::dis::listing::Listing;

//===========================================================================//

#[derive(Parser)]
#[clap(author, about, long_about = None, version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Disassembles a Z80 binary.
    Dis {
        /// The binary file to load (raw, or with an AMSDOS header).
        binary: PathBuf,
        /// The address to load the binary at (overrides any file header).
        #[clap(long, value_parser = parse_addr)]
        load: Option<u16>,
        /// The address to start disassembling from (default: entry point).
        #[clap(long, value_parser = parse_addr)]
        start: Option<u16>,
        /// The number of instructions to disassemble.
        #[clap(long, default_value_t = 16)]
        count: usize,
        /// The current program counter, to be marked in the listing.
        #[clap(long, value_parser = parse_addr)]
        pc: Option<u16>,
    },
}

//===========================================================================//

/// Parses a 16-bit address written as `$1234`, `&1234`, `0x1234`, or `4660`.
fn parse_addr(arg: &str) -> Result<u16, String> {
    let result = if let Some(hex) = arg
        .strip_prefix('$')
        .or_else(|| arg.strip_prefix('&'))
        .or_else(|| arg.strip_prefix("0x"))
        .or_else(|| arg.strip_prefix("0X"))
    {
        u16::from_str_radix(hex, 16)
    } else {
        arg.parse::<u16>()
    };
    result.map_err(|error| format!("invalid address {arg:?}: {error}"))
}

//===========================================================================//

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Dis { binary, load, start, count, pc } => {
            let image = {
                let file = File::open(&binary)?;
                zdis::load::load_binary(io::BufReader::new(file), load)?
            };
            let start = start.unwrap_or(image.entry);
            let listing = Listing::new(&image.bus, start).with_pc(pc);
            for line in listing.take(count) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::parse_addr;

    #[test]
    fn parse_addresses() {
        assert_eq!(parse_addr("$4000"), Ok(0x4000));
        assert_eq!(parse_addr("&BB5A"), Ok(0xbb5a));
        assert_eq!(parse_addr("0xffff"), Ok(0xffff));
        assert_eq!(parse_addr("256"), Ok(0x0100));
        assert!(parse_addr("$10000").is_err());
        assert!(parse_addr("65536").is_err());
        assert!(parse_addr("$").is_err());
        assert!(parse_addr("start").is_err());
    }
}

//===========================================================================//

//! Walking through memory one instruction at a time, for a debugger's
//! disassembly pane.

use super::z80::{DecodedInstruction, Instruction};
use crate::bus::SimBus;
use log::trace;
use std::fmt;

//===========================================================================//

/// The widest instruction is four bytes, printed as `XX XX XX XX`.
const BYTES_COLUMN_WIDTH: usize = 11;

/// One row of a disassembly listing.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DisassemblyLine {
    /// The address of the first byte of the instruction.
    pub address: u16,
    /// The raw bytes of the instruction (1 to 4 of them).
    pub bytes: Vec<u8>,
    /// The rendered instruction text.
    pub instruction: String,
    /// True if `address` is the processor's current program counter.
    pub is_current: bool,
}

impl fmt::Display for DisassemblyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let marker = if self.is_current { '>' } else { ' ' };
        let bytes = self
            .bytes
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<String>>()
            .join(" ");
        write!(
            f,
            "{marker} ${:04X}  {bytes:<width$}  {}",
            self.address,
            self.instruction,
            width = BYTES_COLUMN_WIDTH
        )
    }
}

//===========================================================================//

/// An endless iterator over consecutive instructions, starting from a given
/// address and wrapping around from `$ffff` to `$0000`.
///
/// Decoding is stateless, so to restart a listing, just construct a new one.
pub struct Listing<'a> {
    bus: &'a dyn SimBus,
    addr: u16,
    pc: Option<u16>,
}

impl<'a> Listing<'a> {
    /// Starts a listing at `start`, with no line marked as current.
    pub fn new(bus: &'a dyn SimBus, start: u16) -> Listing<'a> {
        Listing { bus, addr: start, pc: None }
    }

    /// Marks any line whose address equals `pc` as the current line.
    pub fn with_pc(mut self, pc: Option<u16>) -> Listing<'a> {
        self.pc = pc;
        self
    }
}

impl Iterator for Listing<'_> {
    type Item = DisassemblyLine;

    fn next(&mut self) -> Option<DisassemblyLine> {
        let address = self.addr;
        let instruction = Instruction::decode(self.bus, address);
        let decoded = DecodedInstruction::new(self.bus, address, instruction);
        if !instruction.is_defined() {
            trace!(
                "Undefined opcode at ${:04X}: {:02X?}",
                address, decoded.bytes
            );
        }
        // Every instruction is at least one byte, so the walk always advances.
        self.addr = address.wrapping_add(instruction.size());
        Some(DisassemblyLine {
            address,
            is_current: self.pc == Some(address),
            bytes: decoded.bytes,
            instruction: decoded.text,
        })
    }
}

//===========================================================================//

/// Disassembles exactly `count` consecutive instructions starting at `start`.
/// If `pc` is given, the line at that address (if any) is marked current.
pub fn disassemble_range(
    bus: &dyn SimBus,
    start: u16,
    count: usize,
    pc: Option<u16>,
) -> Vec<DisassemblyLine> {
    Listing::new(bus, start).with_pc(pc).take(count).collect()
}

//===========================================================================//


//===========================================================================//

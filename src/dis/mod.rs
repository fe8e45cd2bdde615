//! Facilities for disassembling binary code.

pub mod listing;
pub mod z80;

//===========================================================================//

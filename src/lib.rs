//! Z80 instruction decoding for live debugger disassembly views.

#![warn(missing_docs)]

pub mod bus;
pub mod dis;
pub mod load;

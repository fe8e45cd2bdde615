//! Facilities for representing a 16-bit memory bus.

use byteorder::{ByteOrder, LittleEndian};

mod func;
mod ram;

pub use func::FnBus;
pub use ram::{RamBus, new_ram_bus};

//===========================================================================//

/// A simulated 64KiB memory bus, as seen by a Z80 processor.
///
/// Addresses are 16 bits wide, so every address in the bus's range is valid;
/// implementations must not panic in `peek_byte`, whatever the address.
pub trait SimBus {
    /// Returns a human-readable description of this simulated memory bus.
    fn description(&self) -> String;

    /// Returns the value of a single byte in memory, if the processor were to
    /// read it, but without performing any side effects that would occur if
    /// the processor actually read the byte.
    fn peek_byte(&self, addr: u16) -> u8;

    /// Writes a single byte to memory.
    ///
    /// Depending on the implementation, the write may be ignored (e.g. if this
    /// bus represents read-only memory).
    fn write_byte(&mut self, addr: u16, data: u8);
}

//===========================================================================//

/// A read cursor over a bus.  Advancing past `$ffff` wraps around to `$0000`.
pub(crate) struct BusPeeker<'a> {
    bus: &'a dyn SimBus,
    addr: u16,
}

impl<'a> BusPeeker<'a> {
    pub fn new(bus: &'a dyn SimBus, start_addr: u16) -> BusPeeker<'a> {
        BusPeeker { bus, addr: start_addr }
    }

    pub fn next_u8(&mut self) -> u8 {
        let byte = self.bus.peek_byte(self.addr);
        self.addr = self.addr.wrapping_add(1);
        byte
    }

    pub fn next_i8(&mut self) -> i8 {
        self.next_u8() as i8
    }

    pub fn next_u16(&mut self) -> u16 {
        let lo = self.next_u8();
        let hi = self.next_u8();
        LittleEndian::read_u16(&[lo, hi])
    }
}

//===========================================================================//


//===========================================================================//

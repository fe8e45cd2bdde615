use super::SimBus;

//===========================================================================//

/// Wraps a plain `read(address) -> byte` function as a read-only bus, so that
/// memory owned elsewhere (e.g. by an emulator core) can be disassembled
/// without copying it.  All writes are ignored.
pub struct FnBus<F> {
    read: F,
}

impl<F: Fn(u16) -> u8> FnBus<F> {
    /// Returns a bus whose reads are served by the given function.
    pub fn new(read: F) -> FnBus<F> {
        FnBus { read }
    }
}

impl<F: Fn(u16) -> u8> SimBus for FnBus<F> {
    fn description(&self) -> String {
        "external memory".to_string()
    }

    fn peek_byte(&self, addr: u16) -> u8 {
        (self.read)(addr)
    }

    fn write_byte(&mut self, _addr: u16, _data: u8) {}
}

//===========================================================================//


//===========================================================================//

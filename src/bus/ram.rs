use super::SimBus;

//===========================================================================//

/// Returns a new simulated RAM bus using the given byte array as the contents
/// of RAM.  Panics if the length of the byte array is not a power of 2, or is
/// larger than 64KiB.
pub fn new_ram_bus(ram: Box<[u8]>) -> Box<dyn SimBus> {
    Box::new(RamBus::new(ram))
}

/// A simulated RAM bus.  Reads beyond the RAM size will be mirrored.
pub struct RamBus {
    ram: Box<[u8]>,
}

impl RamBus {
    /// Returns a new simulated RAM bus using the given byte array as the
    /// contents of RAM.  Panics if the length of the byte array is not a power
    /// of 2, or is larger than 64KiB.
    pub fn new(ram: Box<[u8]>) -> RamBus {
        assert!(ram.len().is_power_of_two());
        assert!(ram.len() <= 0x10000);
        RamBus { ram }
    }

    /// Returns the full contents of RAM.
    pub fn as_slice(&self) -> &[u8] {
        &self.ram
    }
}

impl SimBus for RamBus {
    fn description(&self) -> String {
        let size = self.ram.len();
        if size < 1024 {
            format!("{size}B RAM")
        } else {
            format!("{}kB RAM", size >> 10)
        }
    }

    fn peek_byte(&self, addr: u16) -> u8 {
        self.ram[(addr as usize) & (self.ram.len() - 1)]
    }

    fn write_byte(&mut self, addr: u16, data: u8) {
        let mask = self.ram.len() - 1;
        self.ram[(addr as usize) & mask] = data;
    }
}

//===========================================================================//


//===========================================================================//

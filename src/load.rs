//! Facilities for loading Z80 binary images into memory.

use crate::bus::RamBus;
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::{self, Read, Seek, SeekFrom, Write};

//===========================================================================//

macro_rules! invalid_data {
    ($e:expr) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidData,
                                         $e))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err(::std::io::Error::new(::std::io::ErrorKind::InvalidData,
                                         format!($fmt, $($arg)+)))
    };
}

//===========================================================================//

const AMSDOS_HEADER_LEN: usize = 128;
const AMSDOS_CHECKSUMMED_LEN: usize = 67;

/// A binary image, loaded into a full 64KiB of RAM.
pub struct Binary {
    /// The memory containing the image.  Everything outside the image is
    /// zero.
    pub bus: RamBus,
    /// The address of the first byte of the image.
    pub load_addr: u16,
    /// The address at which execution of the image begins.
    pub entry: u16,
    /// The size of the image, in bytes (not counting any stripped header).
    pub len: usize,
}

struct AmsdosHeader {
    load_addr: u16,
    entry: u16,
}

//===========================================================================//

/// Reads a binary image into RAM.
///
/// The following binary formats are currently supported:
/// * Raw memory dumps, loaded at `load_addr` (or `$0000` if not given), with
///   execution starting at the load address.
/// * AMSDOS files (a 128-byte header followed by the image), loaded at the
///   header's load address unless `load_addr` overrides it, with execution
///   starting at the header's entry address.
pub fn load_binary<R: Read>(
    mut reader: R,
    load_addr: Option<u16>,
) -> io::Result<Binary> {
    let mut data = Vec::<u8>::new();
    reader.read_to_end(&mut data)?;
    let (header, code) = match read_amsdos_header(&data)? {
        Some(header) => (Some(header), &data[AMSDOS_HEADER_LEN..]),
        None => (None, data.as_slice()),
    };
    let load_addr = load_addr
        .or(header.as_ref().map(|header| header.load_addr))
        .unwrap_or(0);
    let entry = header.as_ref().map_or(load_addr, |header| header.entry);
    if usize::from(load_addr) + code.len() > 0x10000 {
        invalid_data!("too much data");
    }
    // Load code into RAM at load_addr.
    let mut ram = vec![0u8; 0x10000].into_boxed_slice();
    let mut cursor = io::Cursor::new(&mut ram[..]);
    cursor.seek(SeekFrom::Start(load_addr.into()))?;
    cursor.write_all(code)?;
    debug!(
        "Loaded {} bytes at ${:04X} (entry ${:04X}, {})",
        code.len(),
        load_addr,
        entry,
        if header.is_some() { "AMSDOS header" } else { "raw" }
    );
    Ok(Binary { bus: RamBus::new(ram), load_addr, entry, len: code.len() })
}

/// Returns the AMSDOS header at the start of `data`, or `None` if `data`
/// doesn't start with one.  A header is recognized by its checksum, the
/// 16-bit sum of its first 67 bytes, which must be non-zero.
fn read_amsdos_header(data: &[u8]) -> io::Result<Option<AmsdosHeader>> {
    if data.len() < AMSDOS_HEADER_LEN {
        return Ok(None);
    }
    let checksum = data[..AMSDOS_CHECKSUMMED_LEN]
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(u16::from(byte)));
    let mut cursor = io::Cursor::new(&data[..AMSDOS_HEADER_LEN]);
    cursor.seek(SeekFrom::Start(AMSDOS_CHECKSUMMED_LEN as u64))?;
    let stored_checksum = cursor.read_u16::<LittleEndian>()?;
    if checksum == 0 || checksum != stored_checksum {
        return Ok(None);
    }
    cursor.seek(SeekFrom::Start(21))?;
    let load_addr = cursor.read_u16::<LittleEndian>()?;
    cursor.seek(SeekFrom::Start(26))?;
    let entry = cursor.read_u16::<LittleEndian>()?;
    Ok(Some(AmsdosHeader { load_addr, entry }))
}

//===========================================================================//


//===========================================================================//

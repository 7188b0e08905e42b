use std::fmt;
use std::io;

/*
 * Construction-time failures. Nothing that happens once emulation started is reported through this type:
 * misaligned accesses, unmapped addresses and undefined opcodes are all handled in-band.
 */
#[derive(Debug)]
pub enum Error {
    /// BIOS boot was requested but the boot image is empty.
    MissingBios,
    /// Boot image does not fit into the 16KB BIOS region.
    BiosTooLarge(usize),
    /// Program image does not fit into the 32MB cartridge window.
    RomTooLarge(usize),
    EmptyRom,
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingBios => write!(f, "BIOS image is required but none was provided"),
            Error::BiosTooLarge(size) => write!(f, "BIOS image is {} bytes, at most 16384 are allowed", size),
            Error::RomTooLarge(size) => write!(f, "ROM image is {} bytes, at most 32MB are allowed", size),
            Error::EmptyRom => write!(f, "ROM image is empty"),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self { Error::Io(err) }
}

pub type Result<T> = std::result::Result<T, Error>;

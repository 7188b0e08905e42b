use std::ops::Range;

use super::*;
use crate::dev::rtc::Rtc;
use crate::error::{Error, Result};
use crate::utils::CartHeader;

/*
 * Cartridge: program image, save chip and the GPIO port (only wired up on carts with a clock).
 */
pub struct Cartridge<B: BackupController> {
    rom: Vec<Byte>,
    header: Option<CartHeader>,
    pub backup: B,
    pub gpio: Gpio,
}

impl<B: BackupController> Cartridge<B> {
    pub fn new(backup: B) -> Self {
        let rtc = if backup.kind().rtc() { Some(Rtc::new()) } else { None };
        Self { rom: Vec::new(), header: None, backup: backup, gpio: Gpio::new(rtc) }
    }

    /*
     * Maps the image at the start of the first wait-state window.
     * Returns its size and the address range it occupies there.
     */
    pub fn load(&mut self, rom: Vec<Byte>) -> Result<(usize, Range<Addr>)> {
        if rom.is_empty() {
            return Err(Error::EmptyRom);
        }
        if rom.len() > ROM_MAX_SIZE {
            return Err(Error::RomTooLarge(rom.len()));
        }

        self.header = CartHeader::parse(&rom);
        match &self.header {
            Some(header) if !header.is_valid() => log::warn!("Header checksum mismatch: {}", header),
            Some(header) => log::info!("Loaded {}", header),
            None => log::warn!("Image too short for a header"),
        }

        let size = rom.len();
        self.rom = rom;
        Ok((size, ROM_WS0_ADDR..ROM_WS0_ADDR + size as Addr))
    }

    pub fn header(&self) -> Option<&CartHeader> {
        self.header.as_ref()
    }

    pub fn rom(&self) -> &[Byte] {
        &self.rom
    }

    pub fn rom_size(&self) -> usize {
        self.rom.len()
    }

    /* Any of the three windows. Past the end of the image the bus sees its own address halves. */
    pub fn read_rom(&self, addr: Addr) -> Byte {
        let offset = (addr as usize) & (ROM_MAX_SIZE - 1);
        match self.rom.get(offset) {
            Some(byte) => *byte,
            None => {
                let open = (addr >> 1) & 0xFFFF;
                (open >> (8 * (addr & 1))) as Byte
            }
        }
    }
}

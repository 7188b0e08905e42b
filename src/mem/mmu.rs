use super::*;
use crate::error::{Error, Result};

/*
 * Region an absolute address decodes to. Decoding goes by the top byte of the address,
 * so regions can never overlap and every address lands in exactly one of them.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Bios,
    Ewram,
    Iwram,
    Io,
    Palette,
    Vram,
    Oam,
    Rom,
    Eeprom,
    Backup,
    Unmapped,
}

/*
 * MMU struct is responsible for handling address space of CPU.
 * It routes writes/reads to proper places i.e.: work RAM, I/O registers or cartridge.
 */
pub struct MMU<B: BackupController> {
    /* boot ROM, executed first unless direct boot is requested */
    pub bios: Vec<Byte>,
    /* Different segments of memory map */
    pub ewram: Vec<Byte>,
    pub iwram: Vec<Byte>,
    pub ioregs: IORegs,
    pub palette: Vec<Byte>,
    pub vram: Vec<Byte>,
    pub oam: Vec<Byte>,
    /* ROM, backup chip and GPIO port */
    pub cart: Cartridge<B>,
}

impl<B: BackupController> MMU<B> {
    pub fn new(backup: B) -> Self {
        Self {
            bios: vec![0; BIOS_SIZE],
            ewram: vec![0; EWRAM_SIZE],
            iwram: vec![0; IWRAM_SIZE],
            ioregs: IORegs::new(),
            palette: vec![0; PALETTE_SIZE],
            vram: vec![0; VRAM_SIZE],
            oam: vec![0; OAM_SIZE],
            cart: Cartridge::new(backup),
        }
    }

    pub fn load_bios(&mut self, image: &[Byte]) -> Result<()> {
        if image.is_empty() {
            return Err(Error::MissingBios);
        }
        if image.len() > BIOS_SIZE {
            return Err(Error::BiosTooLarge(image.len()));
        }
        self.bios = vec![0; BIOS_SIZE];
        self.bios[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn region(&self, addr: Addr) -> Region {
        match addr >> 24 {
            0x00 if (addr as usize) < BIOS_SIZE => Region::Bios,
            0x02 => Region::Ewram,
            0x03 => Region::Iwram,
            0x04 if ((addr - IO_REGS_ADDR) as usize) < IO_REG_SIZE => Region::Io,
            0x05 => Region::Palette,
            0x06 => Region::Vram,
            0x07 => Region::Oam,
            0x08..=0x0C => Region::Rom,
            0x0D if self.is_eeprom(addr) => Region::Eeprom,
            0x0D => Region::Rom,
            0x0E | 0x0F => Region::Backup,
            _ => Region::Unmapped,
        }
    }

    /*
     * EEPROM answers in the upper wait-state window. With ROMs over 16MB only the last 256 bytes are taken by it.
     */
    fn is_eeprom(&self, addr: Addr) -> bool {
        if !self.cart.backup.kind().is_eeprom() {
            return false;
        }
        self.cart.rom_size() <= 0x100_0000 || addr >= 0x0DFF_FF00
    }

    fn vram_offset(addr: Addr) -> usize {
        // 96K mirrored in 128K steps, the last 32K mirror the object area
        let offset = (addr & 0x1FFFF) as usize;
        if offset >= VRAM_SIZE { offset - 0x8000 } else { offset }
    }

    /* Object tiles start at 0x10000, or at 0x14000 in bitmap modes */
    fn obj_vram_start(&self) -> usize {
        if self.ioregs.get16(DISPCNT) & 0x7 >= 3 { 0x14000 } else { 0x10000 }
    }

    /*
     * READs
     */
    pub fn read8(&mut self, addr: Addr) -> Byte {
        match self.region(addr) {
            Region::Bios => self.bios[addr as usize],
            Region::Ewram => self.ewram[(addr as usize) & (EWRAM_SIZE - 1)],
            Region::Iwram => self.iwram[(addr as usize) & (IWRAM_SIZE - 1)],
            Region::Io => self.ioregs.read(addr),
            Region::Palette => self.palette[(addr as usize) & (PALETTE_SIZE - 1)],
            Region::Vram => self.vram[MMU::<B>::vram_offset(addr)],
            Region::Oam => self.oam[(addr as usize) & (OAM_SIZE - 1)],
            Region::Rom | Region::Eeprom => self.read_rom(addr),
            Region::Backup => self.cart.backup.read((addr as usize) & (BACKUP_MAX_SIZE - 1)),
            Region::Unmapped => OPEN_BUS,
        }
    }

    fn read_rom(&mut self, addr: Addr) -> Byte {
        if let Some(value) = self.cart.gpio.read(addr) {
            return value;
        }
        self.cart.read_rom(addr)
    }

    pub fn read16(&mut self, addr: Addr) -> u16 {
        if addr & 1 != 0 {
            log::warn!("Misaligned halfword read at 0x{:08X}", addr);
            return OPEN_BUS as u16;
        }
        match self.region(addr) {
            Region::Eeprom => self.cart.backup.serial_read().unwrap_or(1),
            Region::Backup => self.read8(addr) as u16 * 0x0101,
            _ => self.read8(addr) as u16 | (self.read8(addr + 1) as u16) << 8,
        }
    }

    pub fn read32(&mut self, addr: Addr) -> u32 {
        if addr & 3 != 0 {
            log::warn!("Misaligned word read at 0x{:08X}", addr);
            return OPEN_BUS as u32;
        }
        match self.region(addr) {
            Region::Backup => self.read8(addr) as u32 * 0x0101_0101,
            _ => self.read16(addr) as u32 | (self.read16(addr + 2) as u32) << 16,
        }
    }

    /*
     * WRITEs
     */
    pub fn write8(&mut self, addr: Addr, value: Byte) {
        match self.region(addr) {
            Region::Bios => log::warn!("Write to BIOS at 0x{:08X} ignored", addr),
            Region::Ewram => self.ewram[(addr as usize) & (EWRAM_SIZE - 1)] = value,
            Region::Iwram => self.iwram[(addr as usize) & (IWRAM_SIZE - 1)] = value,
            Region::Io => self.ioregs.write(addr, value),
            // 8-bit writes land on both halves of the halfword
            Region::Palette => {
                let offset = (addr as usize) & (PALETTE_SIZE - 2);
                self.palette[offset] = value;
                self.palette[offset + 1] = value;
            }
            Region::Vram => {
                let offset = MMU::<B>::vram_offset(addr) & !1;
                if offset < self.obj_vram_start() {
                    self.vram[offset] = value;
                    self.vram[offset + 1] = value;
                }
            }
            Region::Oam => {}
            Region::Rom | Region::Eeprom => self.write_rom(addr, value),
            Region::Backup => self.cart.backup.write((addr as usize) & (BACKUP_MAX_SIZE - 1), value),
            Region::Unmapped => log::debug!("Write to unmapped 0x{:08X} ignored", addr),
        }
    }

    fn write_rom(&mut self, addr: Addr, value: Byte) {
        if !self.cart.gpio.write(addr, value) {
            log::debug!("Write to ROM at 0x{:08X} ignored", addr);
        }
    }

    /* Same as write8, without the byte duplication rules of the video memories */
    fn write8_raw(&mut self, addr: Addr, value: Byte) {
        match self.region(addr) {
            Region::Palette => self.palette[(addr as usize) & (PALETTE_SIZE - 1)] = value,
            Region::Vram => self.vram[MMU::<B>::vram_offset(addr)] = value,
            Region::Oam => self.oam[(addr as usize) & (OAM_SIZE - 1)] = value,
            _ => self.write8(addr, value),
        }
    }

    pub fn write16(&mut self, addr: Addr, value: u16) {
        if addr & 1 != 0 {
            log::warn!("Misaligned halfword write of 0x{:04X} at 0x{:08X} dropped", value, addr);
            return;
        }
        match self.region(addr) {
            Region::Eeprom => {
                self.cart.backup.serial_write(value);
            }
            Region::Backup => self.write8(addr, value as u8),
            // I/O side effects happen byte by byte, lower address first
            _ => {
                self.write8_raw(addr, value as u8);
                self.write8_raw(addr + 1, (value >> 8) as u8);
            }
        }
    }

    pub fn write32(&mut self, addr: Addr, value: u32) {
        if addr & 3 != 0 {
            log::warn!("Misaligned word write of 0x{:08X} at 0x{:08X} dropped", value, addr);
            return;
        }
        match self.region(addr) {
            Region::Backup => self.write8(addr, value as u8),
            _ => {
                self.write16(addr, value as u16);
                self.write16(addr + 2, (value >> 16) as u16);
            }
        }
    }

    /*
     * Raw register access for devices. Bypasses the CPU-facing write rules.
     */
    pub fn io16(&self, addr: Addr) -> u16 {
        self.ioregs.get16(addr)
    }

    pub fn set_io16(&mut self, addr: Addr, value: u16) {
        self.ioregs.set16(addr, value)
    }

    pub fn read_bit(&self, addr: Addr, bit: u32) -> bool {
        self.ioregs.read_bit(addr, bit)
    }

    pub fn set_bit(&mut self, addr: Addr, bit: u32, flg: bool) {
        self.ioregs.set_bit(addr, bit, flg)
    }

    pub fn request_interrupt(&mut self, irq: Interrupt) {
        self.ioregs.request(irq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::backup::NoBackup;

    #[test]
    fn region_decoding() {
        let mmu = MMU::new(NoBackup);
        assert_eq!(mmu.region(0x0000_0000), Region::Bios);
        assert_eq!(mmu.region(0x0000_4000), Region::Unmapped);
        assert_eq!(mmu.region(0x0203_FFFF), Region::Ewram);
        assert_eq!(mmu.region(0x0300_7FFF), Region::Iwram);
        assert_eq!(mmu.region(0x0400_0200), Region::Io);
        assert_eq!(mmu.region(0x0400_0400), Region::Unmapped);
        assert_eq!(mmu.region(0x0600_0000), Region::Vram);
        assert_eq!(mmu.region(0x0DFF_FFFF), Region::Rom);
        assert_eq!(mmu.region(0x0E00_0000), Region::Backup);
        assert_eq!(mmu.region(0x1000_0000), Region::Unmapped);
    }

    #[test]
    fn vram_mirror() {
        assert_eq!(MMU::<NoBackup>::vram_offset(0x0600_0000), 0);
        assert_eq!(MMU::<NoBackup>::vram_offset(0x0601_8000), 0x10000);
        assert_eq!(MMU::<NoBackup>::vram_offset(0x0602_0004), 4);
    }

    #[test]
    fn video_byte_writes() {
        let mut mmu = MMU::new(NoBackup);
        mmu.write8(PALETTE_ADDR + 3, 0x1F);
        assert_eq!(mmu.read16(PALETTE_ADDR + 2), 0x1F1F);

        mmu.write8(OAM_ADDR, 0x55);
        assert_eq!(mmu.read8(OAM_ADDR), 0);

        mmu.write8(VRAM_ADDR + 0x1_0000, 0x55);
        assert_eq!(mmu.read8(VRAM_ADDR + 0x1_0000), 0);
        mmu.write8(VRAM_ADDR + 0x10, 0x66);
        assert_eq!(mmu.read16(VRAM_ADDR + 0x10), 0x6666);
    }

    #[test]
    fn bios_load_checks() {
        let mut mmu = MMU::new(NoBackup);
        assert!(matches!(mmu.load_bios(&[]), Err(Error::MissingBios)));
        assert!(matches!(mmu.load_bios(&vec![0; BIOS_SIZE + 1]), Err(Error::BiosTooLarge(_))));
        assert!(mmu.load_bios(&[0x12, 0x34]).is_ok());
        assert_eq!(mmu.read16(0), 0x3412);
        mmu.write8(0, 0xFF);
        assert_eq!(mmu.read8(0), 0x12);
    }
}

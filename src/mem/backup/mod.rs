pub mod none;
pub mod sram;
pub mod flash;
pub mod eeprom;

pub use none::NoBackup;
pub use sram::Sram;
pub use flash::{Flash, FlashChip};
pub use eeprom::Eeprom;

use std::collections::HashMap;
use std::fmt;

/*
 * BackupController trait represents the save chip on the cartridge.
 * 0x0E000000-0x0E00FFFF is routed to read()/write() byte by byte. EEPROM instead
 * talks one bit per halfword access in the 0x0D window through serial_read()/serial_write().
 */
pub trait BackupController {
    fn kind(&self) -> BackupType;
    fn read(&mut self, offset: usize) -> u8;
    fn write(&mut self, offset: usize, value: u8);
    /* None when the chip has no serial interface */
    fn serial_read(&mut self) -> Option<u16> { None }
    /* Returns false when the chip has no serial interface */
    fn serial_write(&mut self, _value: u16) -> bool { false }
    /* Persistent contents, for writing a save file */
    fn data(&self) -> &[u8];
    fn load_data(&mut self, data: &[u8]);
}

impl<T: BackupController + ?Sized> BackupController for Box<T> {
    fn kind(&self) -> BackupType { (**self).kind() }
    fn read(&mut self, offset: usize) -> u8 { (**self).read(offset) }
    fn write(&mut self, offset: usize, value: u8) { (**self).write(offset, value) }
    fn serial_read(&mut self) -> Option<u16> { (**self).serial_read() }
    fn serial_write(&mut self, value: u16) -> bool { (**self).serial_write(value) }
    fn data(&self) -> &[u8] { (**self).data() }
    fn load_data(&mut self, data: &[u8]) { (**self).load_data(data) }
}

/* Copies a save image into chip memory, the rest of the chip keeps its erased state */
fn fill_from(memory: &mut [u8], data: &[u8]) {
    let len = memory.len().min(data.len());
    memory[..len].copy_from_slice(&data[..len]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupType {
    NoBackup,
    Eeprom512,
    Eeprom8K,
    Sram32K,
    Flash { chip: FlashChip, rtc: bool },
}

/* Library version strings that the official SDK links into the image */
const SIGNATURES: [(&[u8], BackupType); 6] = [
    (b"EEPROM_V", BackupType::Eeprom8K),
    (b"SRAM_V", BackupType::Sram32K),
    (b"SRAM_F_V", BackupType::Sram32K),
    (b"FLASH_V", BackupType::Flash { chip: FlashChip::Panasonic, rtc: false }),
    (b"FLASH512_V", BackupType::Flash { chip: FlashChip::Panasonic, rtc: false }),
    (b"FLASH1M_V", BackupType::Flash { chip: FlashChip::Sanyo, rtc: false }),
];

impl BackupType {
    pub fn size(&self) -> usize {
        match self {
            BackupType::NoBackup => 0,
            BackupType::Eeprom512 => 0x200,
            BackupType::Eeprom8K => 0x2000,
            BackupType::Sram32K => 0x8000,
            BackupType::Flash { chip, .. } => chip.size(),
        }
    }

    pub fn rtc(&self) -> bool {
        match self {
            BackupType::Flash { rtc, .. } => *rtc,
            _ => false,
        }
    }

    pub fn is_eeprom(&self) -> bool {
        matches!(self, BackupType::Eeprom512 | BackupType::Eeprom8K)
    }

    /*
     * Guess the chip from the SDK signature in the image. EEPROM size can't be told from the
     * signature, the bigger one is assumed.
     */
    pub fn detect(rom: &[u8]) -> BackupType {
        for (signature, kind) in SIGNATURES.iter() {
            if rom.windows(signature.len()).any(|w| w == *signature) {
                return *kind;
            }
        }
        BackupType::NoBackup
    }

    pub fn create(&self) -> Box<dyn BackupController> {
        match *self {
            BackupType::NoBackup => Box::new(NoBackup),
            BackupType::Eeprom512 | BackupType::Eeprom8K => Box::new(Eeprom::new(*self)),
            BackupType::Sram32K => Box::new(Sram::new()),
            BackupType::Flash { chip, rtc } => Box::new(Flash::new(chip, rtc)),
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackupType::NoBackup => write!(f, "none"),
            BackupType::Eeprom512 => write!(f, "EEPROM 512B"),
            BackupType::Eeprom8K => write!(f, "EEPROM 8K"),
            BackupType::Sram32K => write!(f, "SRAM 32K"),
            BackupType::Flash { chip, rtc } => {
                write!(f, "Flash {}K ({:?})", chip.size() / 1024, chip)?;
                if *rtc { write!(f, " + RTC") } else { Ok(()) }
            }
        }
    }
}

/*
 * Exact-match lookup of 4-character program codes. Codes missing from the table
 * are reported as None, which is not the same as BackupType::NoBackup.
 */
pub struct BackupDatabase {
    entries: HashMap<String, BackupType>,
}

impl BackupDatabase {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn insert(&mut self, code: &str, kind: BackupType) {
        self.entries.insert(String::from(code), kind);
    }

    pub fn lookup(&self, code: &str) -> Option<BackupType> {
        self.entries.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BackupDatabase {
    fn default() -> Self {
        let flash_rtc = |chip| BackupType::Flash { chip: chip, rtc: true };
        let flash = |chip| BackupType::Flash { chip: chip, rtc: false };

        let mut db = BackupDatabase::new();
        db.insert("AXVE", flash_rtc(FlashChip::Macronix128));
        db.insert("AXPE", flash_rtc(FlashChip::Macronix128));
        db.insert("BPEE", flash_rtc(FlashChip::Macronix128));
        db.insert("BPRE", flash(FlashChip::Macronix128));
        db.insert("BPGE", flash(FlashChip::Macronix128));
        db.insert("AMKE", BackupType::Eeprom512);
        db.insert("AMAE", BackupType::Eeprom512);
        db.insert("BMXE", BackupType::Eeprom8K);
        db.insert("AGSE", BackupType::Eeprom8K);
        db.insert("AZLE", BackupType::Eeprom8K);
        db.insert("A2NE", BackupType::Sram32K);
        db.insert("AFXE", flash(FlashChip::Sst));
        db.insert("AMTE", BackupType::NoBackup);
        db
    }
}

use std::fmt::{Display, Formatter, Result};
use std::str;

/* Data stored in cart ROM at 0x00-0xBF */
pub const HEADER_SIZE: usize = 0xC0;

const TITLE: usize = 0xA0;
const GAME_CODE: usize = 0xAC;
const MAKER_CODE: usize = 0xB0;
const FIXED_VALUE: usize = 0xB2;
const VERSION: usize = 0xBC;
const CHECKSUM: usize = 0xBD;

#[derive(Debug, Clone, PartialEq)]
pub struct CartHeader {
    entrypoint: u32,
    title: [u8; 12],
    game_code: [u8; 4],
    maker_code: [u8; 2],
    fixed: u8,
    version: u8,
    header_checksum: u8,
    computed_checksum: u8,
}

impl CartHeader {
    // Returns None when the image is too short to contain a header.
    pub fn parse(rom: &[u8]) -> Option<Self> {
        if rom.len() < HEADER_SIZE {
            return None;
        }

        let mut title = [0u8; 12];
        title.copy_from_slice(&rom[TITLE..TITLE + 12]);
        let mut game_code = [0u8; 4];
        game_code.copy_from_slice(&rom[GAME_CODE..GAME_CODE + 4]);
        let mut maker_code = [0u8; 2];
        maker_code.copy_from_slice(&rom[MAKER_CODE..MAKER_CODE + 2]);

        // Complement check: sum of 0xA0..=0xBC, negated, minus 0x19
        let sum = rom[TITLE..CHECKSUM].iter().fold(0u8, |acc, b| acc.wrapping_sub(*b));

        Some(Self {
            entrypoint: u32::from_le_bytes([rom[0], rom[1], rom[2], rom[3]]),
            title: title,
            game_code: game_code,
            maker_code: maker_code,
            fixed: rom[FIXED_VALUE],
            version: rom[VERSION],
            header_checksum: rom[CHECKSUM],
            computed_checksum: sum.wrapping_sub(0x19),
        })
    }

    pub fn title(&self) -> String {
        let end = self.title.iter().position(|b| *b == 0).unwrap_or(self.title.len());
        String::from_utf8_lossy(&self.title[..end]).into_owned()
    }

    /* 4-character program identifier used for backup lookups, ie. "AXVE" */
    pub fn game_code(&self) -> String {
        String::from(str::from_utf8(&self.game_code).unwrap_or("????"))
    }

    pub fn maker_code(&self) -> String {
        String::from(str::from_utf8(&self.maker_code).unwrap_or("??"))
    }

    pub fn entrypoint(&self) -> u32 { self.entrypoint }

    pub fn version(&self) -> u8 { self.version }

    pub fn checksum(&self) -> u8 { self.header_checksum }

    pub fn is_valid(&self) -> bool {
        self.fixed == 0x96 && self.header_checksum == self.computed_checksum
    }
}

impl Display for CartHeader {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f,
              "(Title: {}, Code: {}, Maker: {}, Version: {}, Valid: {})",
              self.title(), self.game_code(), self.maker_code(), self.version(), self.is_valid())
    }
}

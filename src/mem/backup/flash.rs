use super::{fill_from, BackupController, BackupType};

const BANK_SIZE: usize = 0x10000;
const SECTOR_SIZE: usize = 0x1000;

/* Command unlock addresses */
const CMD_ADDR_1: usize = 0x5555;
const CMD_ADDR_2: usize = 0x2AAA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashChip {
    /* 64K */
    Panasonic,
    Sst,
    /* 128K */
    Sanyo,
    Macronix128,
}

impl FlashChip {
    /* (manufacturer, device) reported in ID mode */
    pub fn id(&self) -> (u8, u8) {
        match self {
            FlashChip::Panasonic => (0x32, 0x1B),
            FlashChip::Sst => (0xBF, 0xD4),
            FlashChip::Sanyo => (0x62, 0x13),
            FlashChip::Macronix128 => (0xC2, 0x09),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            FlashChip::Panasonic | FlashChip::Sst => BANK_SIZE,
            FlashChip::Sanyo | FlashChip::Macronix128 => 2 * BANK_SIZE,
        }
    }
}

/*
 * Command sequencer. Every command starts with 0xAA -> 0x5555, 0x55 -> 0x2AAA.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Unlock1,
    Unlock2,
    /* 0x80 received, waiting for a second unlock and the erase kind */
    Erase,
    EraseUnlock1,
    EraseUnlock2,
    /* next write is data */
    Program,
    /* next write to 0x0000 selects the bank */
    BankSelect,
}

pub struct Flash {
    chip: FlashChip,
    rtc: bool,
    memory: Vec<u8>,
    state: State,
    id_mode: bool,
    bank: usize,
}

impl Flash {
    pub fn new(chip: FlashChip, rtc: bool) -> Self {
        Self {
            chip: chip, rtc: rtc,
            memory: vec![0xFF; chip.size()],
            state: State::Ready,
            id_mode: false,
            bank: 0,
        }
    }

    fn addr(&self, offset: usize) -> usize {
        (self.bank * BANK_SIZE + (offset & (BANK_SIZE - 1))) % self.memory.len()
    }

    fn command(&mut self, value: u8) {
        match value {
            0x90 => self.id_mode = true,
            0xF0 => self.id_mode = false,
            0x80 => { self.state = State::Erase; return; }
            0xA0 => { self.state = State::Program; return; }
            0xB0 if self.chip.size() > BANK_SIZE => { self.state = State::BankSelect; return; }
            _ => log::debug!("Unknown flash command 0x{:02X}", value),
        }
        self.state = State::Ready;
    }
}

impl BackupController for Flash {
    fn kind(&self) -> BackupType {
        BackupType::Flash { chip: self.chip, rtc: self.rtc }
    }

    fn read(&mut self, offset: usize) -> u8 {
        let offset = offset & (BANK_SIZE - 1);
        if self.id_mode && offset < 2 {
            let (manufacturer, device) = self.chip.id();
            return if offset == 0 { manufacturer } else { device };
        }
        self.memory[self.addr(offset)]
    }

    fn write(&mut self, offset: usize, value: u8) {
        let offset = offset & (BANK_SIZE - 1);
        self.state = match (self.state, offset, value) {
            (State::Program, _, _) => {
                // Programming can only clear bits
                let addr = self.addr(offset);
                self.memory[addr] &= value;
                State::Ready
            }
            (State::BankSelect, 0, _) => {
                self.bank = (value & 1) as usize;
                State::Ready
            }
            (State::Ready, CMD_ADDR_1, 0xAA) => State::Unlock1,
            (State::Unlock1, CMD_ADDR_2, 0x55) => State::Unlock2,
            (State::Unlock2, CMD_ADDR_1, cmd) => {
                self.command(cmd);
                self.state
            }
            (State::Erase, CMD_ADDR_1, 0xAA) => State::EraseUnlock1,
            (State::EraseUnlock1, CMD_ADDR_2, 0x55) => State::EraseUnlock2,
            (State::EraseUnlock2, CMD_ADDR_1, 0x10) => {
                for byte in self.memory.iter_mut() { *byte = 0xFF; }
                State::Ready
            }
            (State::EraseUnlock2, sector, 0x30) => {
                let start = self.addr(sector & !(SECTOR_SIZE - 1));
                for byte in self.memory[start..start + SECTOR_SIZE].iter_mut() { *byte = 0xFF; }
                State::Ready
            }
            // Reset command is accepted without the unlock sequence
            (_, _, 0xF0) => {
                self.id_mode = false;
                State::Ready
            }
            _ => State::Ready,
        };
    }

    fn data(&self) -> &[u8] { &self.memory }

    fn load_data(&mut self, data: &[u8]) {
        fill_from(&mut self.memory, data);
    }
}

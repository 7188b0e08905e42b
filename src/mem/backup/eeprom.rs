use super::{fill_from, BackupController, BackupType};

/* Transfers are done in 64-bit blocks */
const BLOCK_BITS: u32 = 64;
/* Reads start with 4 dummy bits */
const READ_PREFIX: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /* Waiting for the 2-bit request type */
    Request,
    ReadAddress,
    ReadStop,
    Reading,
    WriteAddress,
    WriteData,
    WriteStop,
}

/*
 * Serial EEPROM. Every halfword written to the 0x0D window carries one bit in bit 0,
 * every halfword read returns one bit. Games drive it with DMA 3.
 *
 * Read:  "11", address, "0", then 68 reads (4 dummy + 64 data bits, MSB first)
 * Write: "10", address, 64 data bits, "0"
 */
pub struct Eeprom {
    kind: BackupType,
    memory: Vec<u8>,
    state: State,
    /* Shift register and number of bits in it for the current field */
    shift: u64,
    count: u32,
    block: usize,
    /* Output cursor in Reading state */
    pos: u32,
}

impl Eeprom {
    pub fn new(kind: BackupType) -> Self {
        let size = if kind == BackupType::Eeprom512 { 0x200 } else { 0x2000 };
        Self {
            kind: kind,
            memory: vec![0xFF; size],
            state: State::Request,
            shift: 0, count: 0, block: 0, pos: 0,
        }
    }

    fn addr_bits(&self) -> u32 {
        if self.kind == BackupType::Eeprom512 { 6 } else { 14 }
    }

    fn blocks(&self) -> usize {
        self.memory.len() / 8
    }

    /* Shifts one bit in, returns the whole field once `len` bits arrived */
    fn take(&mut self, bit: u64, len: u32) -> Option<u64> {
        self.shift = (self.shift << 1) | bit;
        self.count += 1;
        if self.count < len {
            return None;
        }
        let value = self.shift;
        self.shift = 0;
        self.count = 0;
        Some(value)
    }

    fn block_value(&self) -> u64 {
        let start = self.block * 8;
        self.memory[start..start + 8].iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
    }
}

impl BackupController for Eeprom {
    fn kind(&self) -> BackupType { self.kind }

    /* Not reachable through the backup window */
    fn read(&mut self, _offset: usize) -> u8 { 0xFF }
    fn write(&mut self, _offset: usize, _value: u8) {}

    fn serial_read(&mut self) -> Option<u16> {
        if self.state != State::Reading {
            // Ready
            return Some(1);
        }
        let pos = self.pos;
        self.pos += 1;
        if self.pos == READ_PREFIX + BLOCK_BITS {
            self.state = State::Request;
        }
        if pos < READ_PREFIX {
            return Some(0);
        }
        let bit = (self.block_value() >> (BLOCK_BITS - 1 - (pos - READ_PREFIX))) & 1;
        Some(bit as u16)
    }

    fn serial_write(&mut self, value: u16) -> bool {
        let bit = (value & 1) as u64;
        let addr_bits = self.addr_bits();
        match self.state {
            State::Request | State::Reading => {
                if self.state == State::Reading {
                    // Abandoned read
                    self.state = State::Request;
                    self.shift = 0;
                    self.count = 0;
                }
                match self.take(bit, 2) {
                    Some(0b11) => self.state = State::ReadAddress,
                    Some(0b10) => self.state = State::WriteAddress,
                    Some(_) => log::debug!("Bad EEPROM request"),
                    None => {}
                }
            }
            State::ReadAddress => {
                if let Some(addr) = self.take(bit, addr_bits) {
                    self.block = (addr as usize) % self.blocks();
                    self.state = State::ReadStop;
                }
            }
            State::ReadStop => {
                self.pos = 0;
                self.state = State::Reading;
            }
            State::WriteAddress => {
                if let Some(addr) = self.take(bit, addr_bits) {
                    self.block = (addr as usize) % self.blocks();
                    self.state = State::WriteData;
                }
            }
            State::WriteData => {
                if let Some(data) = self.take(bit, BLOCK_BITS) {
                    let start = self.block * 8;
                    self.memory[start..start + 8].copy_from_slice(&data.to_be_bytes());
                    self.state = State::WriteStop;
                }
            }
            State::WriteStop => self.state = State::Request,
        }
        true
    }

    fn data(&self) -> &[u8] { &self.memory }

    fn load_data(&mut self, data: &[u8]) {
        fill_from(&mut self.memory, data);
    }
}

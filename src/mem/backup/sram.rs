use super::{fill_from, BackupController, BackupType};

const SRAM_SIZE: usize = 0x8000;

/* Battery-backed static RAM, plain byte access mirrored over the backup window */
pub struct Sram {
    ram: Vec<u8>,
}

impl Sram {
    pub fn new() -> Self {
        Self { ram: vec![0xFF; SRAM_SIZE] }
    }
}

impl BackupController for Sram {
    fn kind(&self) -> BackupType { BackupType::Sram32K }

    fn read(&mut self, offset: usize) -> u8 {
        self.ram[offset % SRAM_SIZE]
    }

    fn write(&mut self, offset: usize, value: u8) {
        self.ram[offset % SRAM_SIZE] = value;
    }

    fn data(&self) -> &[u8] { &self.ram }

    fn load_data(&mut self, data: &[u8]) {
        fill_from(&mut self.ram, data);
    }
}

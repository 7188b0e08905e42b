use super::{BackupController, BackupType};

/* Cartridge without a save chip. Reads float high. */
pub struct NoBackup;

impl BackupController for NoBackup {
    fn kind(&self) -> BackupType { BackupType::NoBackup }
    fn read(&mut self, _offset: usize) -> u8 { 0xFF }
    fn write(&mut self, _offset: usize, _value: u8) {}
    fn data(&self) -> &[u8] { &[] }
    fn load_data(&mut self, _data: &[u8]) {}
}

pub mod backup;
pub mod cart;
pub mod gpio;
pub mod ioregs;
pub mod mmu;

pub use backup::{BackupController, BackupDatabase, BackupType, Eeprom, Flash, FlashChip, NoBackup, Sram};
pub use cart::Cartridge;
pub use gpio::{Gpio, GPIO_CONTROL, GPIO_DATA, GPIO_DIRECTION};
pub use ioregs::*;
pub use mmu::{Region, MMU};

pub type Addr = u32;
pub type Byte = u8;

/*
 * Base addresses of different memory map segments.
 */
pub const BIOS_ADDR: Addr = 0x0000_0000;
pub const EWRAM_ADDR: Addr = 0x0200_0000;
pub const IWRAM_ADDR: Addr = 0x0300_0000;
pub const IO_REGS_ADDR: Addr = 0x0400_0000;
pub const PALETTE_ADDR: Addr = 0x0500_0000;
pub const VRAM_ADDR: Addr = 0x0600_0000;
pub const OAM_ADDR: Addr = 0x0700_0000;
/* Same ROM contents seen through three wait-state windows */
pub const ROM_WS0_ADDR: Addr = 0x0800_0000;
pub const ROM_WS1_ADDR: Addr = 0x0A00_0000;
pub const ROM_WS2_ADDR: Addr = 0x0C00_0000;
pub const EEPROM_ADDR: Addr = 0x0D00_0000;
pub const BACKUP_ADDR: Addr = 0x0E00_0000;

pub const BIOS_SIZE: usize = 0x4000;
pub const EWRAM_SIZE: usize = 0x40000;
pub const IWRAM_SIZE: usize = 0x8000;
pub const IO_REG_SIZE: usize = 0x400;
pub const PALETTE_SIZE: usize = 0x400;
pub const VRAM_SIZE: usize = 0x18000;
pub const OAM_SIZE: usize = 0x400;
pub const ROM_MAX_SIZE: usize = 0x200_0000;
pub const BACKUP_MAX_SIZE: usize = 0x10000;

/* Value seen on reads from addresses that are not backed by anything */
pub const OPEN_BUS: Byte = 0x00;

extern crate gba;
extern crate rand;

#[cfg(test)]
mod memtest {
    use gba::*;
    use rand::Rng;

    fn mock_memory() -> MMU<NoBackup> {
        MMU::new(NoBackup)
    }

    #[cfg(test)]
    mod routing {
        use super::*;

        #[test]
        fn work_ram_mirrors() {
            let mut memory = mock_memory();
            memory.write32(EWRAM_ADDR + EWRAM_SIZE as Addr + 8, 0xDEAD_BEEF);
            assert_eq!(memory.read32(EWRAM_ADDR + 8), 0xDEAD_BEEF);

            memory.write16(IWRAM_ADDR + 0x00FF_0000, 0x1234);
            assert_eq!(memory.read16(IWRAM_ADDR), 0x1234);
            assert_eq!(memory.read8(IWRAM_ADDR + 1), 0x12);
        }

        #[test]
        fn random_round_trips() {
            let mut memory = mock_memory();
            let mut rng = rand::thread_rng();

            for _ in 0..1000 {
                let base = [EWRAM_ADDR, IWRAM_ADDR, VRAM_ADDR][rng.gen_range(0, 3)];
                let addr = base + (rng.gen_range(0, 0x8000u32) & !3);
                let value: u32 = rng.gen();
                memory.write32(addr, value);
                assert_eq!(memory.read32(addr), value, "at 0x{:08X}", addr);
                assert_eq!(memory.read16(addr + 2), (value >> 16) as u16);
                assert_eq!(memory.read8(addr + 3), (value >> 24) as u8);
            }
        }

        #[test]
        fn misaligned_accesses_are_dropped() {
            let mut memory = mock_memory();
            memory.write32(IWRAM_ADDR, 0x1122_3344);

            memory.write32(IWRAM_ADDR + 2, 0xFFFF_FFFF);
            memory.write16(IWRAM_ADDR + 1, 0xFFFF);
            assert_eq!(memory.read32(IWRAM_ADDR), 0x1122_3344);

            assert_eq!(memory.read16(IWRAM_ADDR + 1), OPEN_BUS as u16);
            assert_eq!(memory.read32(IWRAM_ADDR + 2), OPEN_BUS as u32);
        }

        #[test]
        fn unmapped_reads_open_bus() {
            let mut memory = mock_memory();
            assert_eq!(memory.region(0x1000_0000), Region::Unmapped);
            assert_eq!(memory.region(BIOS_ADDR + BIOS_SIZE as Addr), Region::Unmapped);
            assert_eq!(memory.read32(0x1000_0000), OPEN_BUS as u32);
            assert_eq!(memory.read8(0x0000_4000), OPEN_BUS);

            memory.write32(0x1000_0000, 0xFFFF_FFFF);
            assert_eq!(memory.read32(0x1000_0000), OPEN_BUS as u32);
        }

        #[test]
        fn bios_is_read_only() {
            let mut memory = mock_memory();
            memory.load_bios(&[0x12, 0x34]).unwrap();
            memory.write8(BIOS_ADDR, 0xFF);
            assert_eq!(memory.read16(BIOS_ADDR), 0x3412);
        }
    }

    #[cfg(test)]
    mod cartridge {
        use super::*;

        #[test]
        fn three_windows_see_the_same_rom() {
            let mut memory = mock_memory();
            let rom: Vec<Byte> = (0..0x400).map(|i| i as u8).collect();
            let (size, range) = memory.cart.load(rom).unwrap();
            assert_eq!(size, 0x400);
            assert_eq!(range, ROM_WS0_ADDR..ROM_WS0_ADDR + 0x400);

            for base in [ROM_WS0_ADDR, ROM_WS1_ADDR, ROM_WS2_ADDR].iter() {
                assert_eq!(memory.read32(*base + 0x10), 0x1312_1110);
            }
        }

        #[test]
        fn past_the_image_is_address_open_bus() {
            let mut memory = mock_memory();
            memory.cart.load(vec![0xAA; 0x100]).unwrap();
            let addr = ROM_WS0_ADDR + 0x2468;
            assert_eq!(memory.read16(addr) as u32, (addr >> 1) & 0xFFFF);
        }

        #[test]
        fn rejects_bad_images() {
            let mut memory = mock_memory();
            assert!(matches!(memory.cart.load(Vec::new()), Err(Error::EmptyRom)));
            assert!(matches!(memory.cart.load(vec![0; ROM_MAX_SIZE + 1]), Err(Error::RomTooLarge(_))));
            assert!(matches!(memory.load_bios(&[]), Err(Error::MissingBios)));
            assert!(matches!(memory.load_bios(&vec![0; BIOS_SIZE + 1]), Err(Error::BiosTooLarge(_))));
        }

        #[test]
        fn sram_is_byte_wide() {
            let mut memory = MMU::new(Sram::new());
            memory.write8(BACKUP_ADDR + 5, 0x5A);
            assert_eq!(memory.read8(BACKUP_ADDR + 5), 0x5A);
            assert_eq!(memory.read16(BACKUP_ADDR + 4) & 0xFF, 0xFF);
            assert_eq!(memory.cart.backup.data()[5], 0x5A);
        }
    }

    #[cfg(test)]
    mod io {
        use super::*;

        #[test]
        fn interrupt_flags_write_one_to_clear() {
            let mut memory = mock_memory();
            let mut rng = rand::thread_rng();

            for _ in 0..10_000 {
                let flags: u16 = rng.gen();
                let written: u16 = rng.gen();
                memory.set_io16(IF, flags);
                memory.write16(IF, written);
                assert_eq!(memory.io16(IF), flags & !written, "IF 0x{:04X} written 0x{:04X}", flags, written);
            }
        }

        #[test]
        fn read_only_registers() {
            let mut memory = mock_memory();
            memory.write16(KEYINPUT, 0);
            memory.write16(VCOUNT, 0x55);
            assert_eq!(memory.read16(KEYINPUT), 0x03FF);
            assert_eq!(memory.read16(VCOUNT), 0);
        }

        #[test]
        fn unknown_registers_are_storage() {
            let mut memory = mock_memory();
            memory.write32(IO_REGS_ADDR + 0x80, 0x0102_0304);
            assert_eq!(memory.read32(IO_REGS_ADDR + 0x80), 0x0102_0304);
            assert!(!memory.ioregs.has_events());
        }
    }
}

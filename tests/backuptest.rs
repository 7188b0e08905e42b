extern crate gba;

#[cfg(test)]
mod backuptest {
    use gba::*;

    #[cfg(test)]
    mod flash {
        use super::*;

        fn command<B: BackupController>(state: &mut State<B>, cmd: u8) {
            state.write8(BACKUP_ADDR + 0x5555, 0xAA);
            state.write8(BACKUP_ADDR + 0x2AAA, 0x55);
            state.write8(BACKUP_ADDR + 0x5555, cmd);
        }

        #[test]
        fn chip_id_through_the_bus() {
            let mut state = State::new(Flash::new(FlashChip::Sanyo, false));
            command(&mut state, 0x90);
            assert_eq!(state.read8(BACKUP_ADDR), 0x62);
            assert_eq!(state.read8(BACKUP_ADDR + 1), 0x13);
            command(&mut state, 0xF0);
            assert_eq!(state.read8(BACKUP_ADDR), 0xFF);
        }

        #[test]
        fn program_survives_save_file() {
            let mut state = State::new(Flash::new(FlashChip::Panasonic, false));
            command(&mut state, 0xA0);
            state.write8(BACKUP_ADDR + 0x0100, 0x3C);
            assert_eq!(state.read8(BACKUP_ADDR + 0x0100), 0x3C);

            let save = state.mmu.cart.backup.data().to_vec();
            let mut restored = State::new(Flash::new(FlashChip::Panasonic, false));
            restored.mmu.cart.backup.load_data(&save);
            assert_eq!(restored.read8(BACKUP_ADDR + 0x0100), 0x3C);
        }

        #[test]
        fn save_file_round_trip() {
            let path = std::env::temp_dir().join(format!("gba-backuptest-{}.sav", std::process::id()));
            let mut runtime = Runtime::new(Flash::new(FlashChip::Sst, false));
            command(&mut runtime.state, 0xA0);
            runtime.state.write8(BACKUP_ADDR + 0x20, 0x42);
            assert_eq!(runtime.write_save(&path).unwrap(), 0x10000);

            let mut restored = Runtime::new(Flash::new(FlashChip::Sst, false));
            assert!(restored.load_save(&path).unwrap());
            assert_eq!(restored.state.read8(BACKUP_ADDR + 0x20), 0x42);
            std::fs::remove_file(&path).unwrap();
            assert!(!restored.load_save(&path).unwrap());
        }

        #[test]
        fn boxed_chip_from_type() {
            let kind = BackupType::Flash { chip: FlashChip::Macronix128, rtc: true };
            let mut state = State::new(kind.create());
            assert_eq!(state.mmu.cart.backup.kind(), kind);
            assert!(state.mmu.cart.gpio.present());
            command(&mut state, 0x90);
            assert_eq!(state.read8(BACKUP_ADDR), 0xC2);
        }
    }

    #[cfg(test)]
    mod eeprom {
        use super::*;

        const BUFFER: Addr = EWRAM_ADDR;
        /* DMA3 on, halfword units, immediate start */
        const START: u16 = 1 << 15;

        fn mock_state() -> State<Eeprom> {
            State::new(Eeprom::new(BackupType::Eeprom8K))
        }

        /* Stages a bit stream in work RAM and sends it with DMA3, one bit per halfword */
        fn send(state: &mut State<Eeprom>, bits: &[u16]) {
            for (i, bit) in bits.iter().enumerate() {
                state.write16(BUFFER + 2 * i as Addr, *bit);
            }
            state.write32(DMA3SAD, BUFFER);
            state.write32(DMA3DAD, EEPROM_ADDR);
            state.write16(DMA3CNT_L, bits.len() as u16);
            state.write16(DMA3CNT_H, START);
            state.dma.step(&mut state.mmu);
        }

        fn receive(state: &mut State<Eeprom>, len: usize) -> Vec<u16> {
            state.write32(DMA3SAD, EEPROM_ADDR);
            state.write32(DMA3DAD, BUFFER);
            state.write16(DMA3CNT_L, len as u16);
            state.write16(DMA3CNT_H, START);
            state.dma.step(&mut state.mmu);
            (0..len).map(|i| state.read16(BUFFER + 2 * i as Addr)).collect()
        }

        fn field(value: u64, len: usize) -> Vec<u16> {
            (0..len).rev().map(|i| ((value >> i) & 1) as u16).collect()
        }

        #[test]
        fn eeprom_window() {
            let state = mock_state();
            assert_eq!(state.mmu.region(EEPROM_ADDR), Region::Eeprom);
            assert_eq!(state.mmu.region(ROM_WS0_ADDR), Region::Rom);
        }

        #[test]
        fn block_write_then_read() {
            let mut state = mock_state();
            let value = 0xFEDC_BA98_7654_3210;

            let mut request = field(0b10, 2);
            request.extend(field(0x12, 14));
            request.extend(field(value, 64));
            request.push(0);
            send(&mut state, &request);
            assert_eq!(state.mmu.cart.backup.data()[0x90..0x98], value.to_be_bytes());

            let mut request = field(0b11, 2);
            request.extend(field(0x12, 14));
            request.push(0);
            send(&mut state, &request);

            let bits = receive(&mut state, 68);
            assert!(bits[..4].iter().all(|b| *b == 0));
            let read = bits[4..].iter().fold(0u64, |acc, b| (acc << 1) | (*b & 1) as u64);
            assert_eq!(read, value);
        }

        #[test]
        fn idle_reads_ready() {
            let mut state = mock_state();
            assert_eq!(state.read16(EEPROM_ADDR) & 1, 1);
        }
    }
}

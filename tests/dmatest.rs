extern crate gba;

#[cfg(test)]
mod dmatest {
    use gba::*;

    const ENABLE: u16 = 1 << 15;
    const WORD: u16 = 1 << 10;
    const VBLANK: u16 = 1 << 12;

    const SRC: Addr = EWRAM_ADDR + 0x100;
    const DST: Addr = IWRAM_ADDR + 0x200;

    fn mock_state() -> State<NoBackup> {
        let mut state = State::new(NoBackup);
        for i in 0..8 {
            state.write32(SRC + 4 * i, 0xA0A0_0000 | i);
        }
        state
    }

    fn setup(state: &mut State<NoBackup>, ch: usize, count: u16) {
        state.write32(dma_sad(ch), SRC);
        state.write32(dma_dad(ch), DST);
        state.write16(dma_cnt_l(ch), count);
    }

    fn copied(state: &mut State<NoBackup>) -> usize {
        (0..8).take_while(|&i| state.read32(DST + 4 * i) == 0xA0A0_0000 | i).count()
    }

    #[test]
    fn immediate_word_copy() {
        let mut state = mock_state();
        setup(&mut state, 3, 4);
        state.write16(DMA3CNT_H, ENABLE | WORD);
        assert!(state.dma.active());

        state.dma.step(&mut state.mmu);
        assert_eq!(copied(&mut state), 4);
        for i in 0..4 {
            assert_eq!(state.read32(DST + 4 * i), state.read32(SRC + 4 * i));
        }
        assert!(!DMA::CONTROL(&state.mmu, 3).contains(DmaControl::ENABLE));
        assert!(!state.dma.active());
    }

    #[test]
    fn enable_rewrite_does_not_retrigger() {
        let mut state = mock_state();
        setup(&mut state, 0, 2);
        state.write16(DMA0CNT_H, ENABLE | WORD | VBLANK);
        assert!(!state.dma.active());

        // Already enabled, the new count is not latched and nothing starts
        state.write16(dma_cnt_l(0), 6);
        state.write16(DMA0CNT_H, ENABLE | WORD);
        assert!(!state.dma.active());

        state.write16(DMA0CNT_H, WORD);
        state.write16(DMA0CNT_H, ENABLE | WORD);
        assert!(state.dma.active());
        state.dma.step(&mut state.mmu);
        assert_eq!(copied(&mut state), 6);
    }

    #[test]
    fn vblank_start_timing() {
        let mut state = mock_state();
        setup(&mut state, 1, 3);
        state.write16(dma_cnt_h(1), ENABLE | WORD | VBLANK);
        state.dma.step(&mut state.mmu);
        assert_eq!(copied(&mut state), 0);

        state.gpu.tick(&mut state.mmu, SCANLINE_CYCLES * SCREEN_HEIGHT as u64);
        for timing in state.gpu.take_blanks() {
            state.dma.trigger(&state.mmu, timing);
        }
        state.dma.step(&mut state.mmu);
        assert_eq!(copied(&mut state), 3);
    }

    #[test]
    fn completion_interrupt() {
        let mut state = mock_state();
        setup(&mut state, 2, 1);
        state.write16(dma_cnt_h(2), ENABLE | (1 << 14));
        state.dma.step(&mut state.mmu);
        assert_eq!(state.mmu.io16(IF), 1 << Interrupt::Dma2.bit());
    }
}

extern crate gba;

/*
 * Whole-machine runs: programs in the cartridge drive the devices through their registers.
 */
#[cfg(test)]
mod scenario {
    use gba::*;

    const LOOP: u32 = 0xEAFF_FFFE; // B .

    fn mock_runtime(program: &[u32]) -> Runtime<NoBackup> {
        let mut runtime = Runtime::new(NoBackup);
        runtime.skip_bios();
        let rom: Vec<Byte> = program.iter().flat_map(|word| word.to_le_bytes().to_vec()).collect();
        runtime.load(rom).unwrap();
        runtime
    }

    fn run(runtime: &mut Runtime<NoBackup>, steps: usize) {
        for _ in 0..steps {
            runtime.step();
        }
    }

    #[test]
    fn timer_overflow_interrupt() {
        let mut runtime = mock_runtime(&[
            0xE3A0_0301, // MOV r0, #0x04000000
            0xE280_1C01, // ADD r1, r0, #0x100
            0xE3A0_28C0, // MOV r2, #0xC00000
            0xE382_2CFF, // ORR r2, r2, #0xFF00
            0xE382_20F0, // ORR r2, r2, #0xF0
            0xE581_2000, // STR r2, [r1]    TM0 reload 0xFFF0, start with IRQ
            LOOP,
        ]);
        runtime.state.write16(IE, 1 << Interrupt::Timer0.bit());
        runtime.state.write16(IME, 1);

        // The store itself takes 2 cycles, every loop iteration 3
        run(&mut runtime, 6);
        assert_eq!(Timer::COUNTER(&runtime.state.mmu, 0), 0xFFF2);
        run(&mut runtime, 4);
        assert_eq!(Timer::COUNTER(&runtime.state.mmu, 0), 0xFFFE);
        assert_eq!(runtime.state.mmu.io16(IF), 0);
        assert_eq!(runtime.cpu.regs.mode(), Mode::System);

        run(&mut runtime, 1);
        assert_eq!(runtime.state.mmu.io16(IF), 1 << 3);
        assert_eq!(Timer::COUNTER(&runtime.state.mmu, 0), 0xFFF1);

        let regs = &runtime.cpu.regs;
        assert_eq!(regs.mode(), Mode::Irq);
        assert_eq!(regs.pc(), 0x18);
        assert_eq!(regs.r[14], ROM_ENTRY + 6 * 4 + 4);
        assert_eq!(regs.spsr().mode(), Some(Mode::System));
        assert!(regs.flag(Psr::I));
    }

    #[test]
    fn dma_block_copy() {
        let mut runtime = mock_runtime(&[
            0xE3A0_0301, // MOV r0, #0x04000000
            0xE280_00D4, // ADD r0, r0, #0xD4
            0xE3A0_1402, // MOV r1, #0x02000000
            0xE281_2C01, // ADD r2, r1, #0x100
            0xE3A0_3321, // MOV r3, #0x84000000
            0xE383_3004, // ORR r3, r3, #4
            0xE880_000E, // STMIA r0, {r1-r3}
            LOOP,
        ]);
        let words = [0x0123_4567, 0x89AB_CDEF, 0xDEAD_BEEF, 0x0BAD_F00D, 0x5555_5555];
        for (i, word) in words.iter().enumerate() {
            runtime.state.write32(EWRAM_ADDR + 4 * i as Addr, *word);
        }

        run(&mut runtime, 7);
        for (i, word) in words[..4].iter().enumerate() {
            assert_eq!(runtime.state.read32(EWRAM_ADDR + 0x100 + 4 * i as Addr), *word);
        }
        assert_eq!(runtime.state.read32(EWRAM_ADDR + 0x110), 0);
        assert!(!DMA::CONTROL(&runtime.state.mmu, 3).contains(DmaControl::ENABLE));
        assert!(!runtime.state.dma.active());
    }

    #[test]
    fn dma_into_dispstat_updates_vcount_match() {
        let mut runtime = mock_runtime(&[LOOP]);
        while GPU::VCOUNT(&runtime.state.mmu) != 5 {
            runtime.step();
        }
        assert!(!GPU::DISPSTAT(&runtime.state.mmu).contains(DispStat::VCOUNT));

        runtime.state.write16(EWRAM_ADDR, (5 << 8) | DispStat::VCOUNT_IRQ.bits());
        runtime.state.write32(DMA3SAD, EWRAM_ADDR);
        runtime.state.write32(DMA3DAD, DISPSTAT);
        runtime.state.write16(DMA3CNT_L, 1);
        runtime.state.write16(DMA3CNT_H, 1 << 15);
        run(&mut runtime, 1);

        assert_eq!(GPU::VCOUNT(&runtime.state.mmu), 5);
        assert!(GPU::DISPSTAT(&runtime.state.mmu).contains(DispStat::VCOUNT));
        assert!(runtime.state.mmu.read_bit(IF, Interrupt::VCount.bit()));
    }

    #[test]
    fn video_timing_follows_cycles() {
        let mut runtime = mock_runtime(&[LOOP]);
        let vblank_start = SCANLINE_CYCLES * SCREEN_HEIGHT as u64;
        let mut frames = 0;

        while runtime.cpu_cycles() < 2 * FRAME_CYCLES + SCANLINE_CYCLES {
            runtime.step();
            let cycles = runtime.cpu_cycles() % FRAME_CYCLES;
            let stat = GPU::DISPSTAT(&runtime.state.mmu);
            assert_eq!(stat.contains(DispStat::VBLANK), cycles >= vblank_start, "at {} cycles", runtime.cpu_cycles());
            assert_eq!(GPU::VCOUNT(&runtime.state.mmu) as u64, cycles / SCANLINE_CYCLES);
            if runtime.state.gpu.frame_ready() {
                frames += 1;
            }
        }
        assert_eq!(frames, 2);
    }

    #[test]
    fn halt_until_vblank() {
        let mut runtime = mock_runtime(&[
            0xE3A0_0301, // MOV r0, #0x04000000
            0xE5C0_0301, // STRB r0, [r0, #0x301]
            0xE3A0_1001, // MOV r1, #1
            LOOP,
        ]);
        runtime.state.write16(DISPSTAT, DispStat::VBLANK_IRQ.bits());
        runtime.state.write16(IE, 1 << Interrupt::VBlank.bit());

        run(&mut runtime, 2);
        assert!(runtime.cpu.halted());
        while runtime.cpu.halted() {
            runtime.step();
        }
        // Woken without IME, execution continues after the store
        assert_eq!(runtime.cpu_cycles(), SCANLINE_CYCLES * SCREEN_HEIGHT as u64);
        assert_eq!(runtime.cpu.regs.mode(), Mode::System);
        run(&mut runtime, 1);
        assert_eq!(runtime.cpu.regs.r[1], 1);
    }

    #[test]
    fn frame_carries_overshoot() {
        let mut runtime = mock_runtime(&[LOOP]);
        let frame = runtime.frame().to_vec();
        assert_eq!(frame.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        // Forced blank from power on
        assert!(frame.iter().all(|px| *px == WHITE));

        let first = runtime.cpu_cycles();
        assert!(first >= CPU_CYCLES_PER_FRAME && first < CPU_CYCLES_PER_FRAME + 3);
        runtime.frame();
        assert!(runtime.cpu_cycles() >= 2 * CPU_CYCLES_PER_FRAME);
        assert!(runtime.cpu_cycles() < 2 * CPU_CYCLES_PER_FRAME + 3);
    }

    #[test]
    fn keypad_through_registers() {
        let mut runtime = mock_runtime(&[LOOP]);
        runtime.set_button(Button::Start, true);
        runtime.step();
        assert_eq!(runtime.state.read16(KEYINPUT), 0x03FF & !(1 << 3));
        runtime.set_button(Button::Start, false);
        runtime.step();
        assert_eq!(runtime.state.read16(KEYINPUT), 0x03FF);
    }
}

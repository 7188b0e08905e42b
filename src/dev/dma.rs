#![allow(non_snake_case)]

use bitflags::bitflags;

use super::*;
use crate::config;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaControl: u16 {
        const DST_MODE = 0b11 << 5;
        const SRC_MODE = 0b11 << 7;
        const REPEAT = 1 << 9;
        /* 32-bit units when set, 16-bit otherwise */
        const WORD = 1 << 10;
        const GAMEPAK_DRQ = 1 << 11;
        const TIMING = 0b11 << 12;
        const IRQ = 1 << 14;
        const ENABLE = 1 << 15;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Increment,
    Decrement,
    Fixed,
    /* Increment, and restore the destination on every repeat */
    IncrementReload,
}

impl AddrMode {
    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => AddrMode::Increment,
            1 => AddrMode::Decrement,
            2 => AddrMode::Fixed,
            _ => AddrMode::IncrementReload,
        }
    }

    fn step(&self, unit: u32) -> u32 {
        match self {
            AddrMode::Increment | AddrMode::IncrementReload => unit,
            AddrMode::Decrement => unit.wrapping_neg(),
            AddrMode::Fixed => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTiming {
    Immediate,
    VBlank,
    HBlank,
    /* Sound FIFO / video capture, not driven by anything here */
    Special,
}

impl StartTiming {
    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => StartTiming::Immediate,
            1 => StartTiming::VBlank,
            2 => StartTiming::HBlank,
            _ => StartTiming::Special,
        }
    }
}

/* Internal address registers are narrower than 32 bits on the lower channels */
const SRC_MASK: [u32; 4] = [0x07FF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF];
const DST_MASK: [u32; 4] = [0x07FF_FFFF, 0x07FF_FFFF, 0x07FF_FFFF, 0x0FFF_FFFF];
/* Unit count of 0 means the maximum */
const COUNT_MAX: [u32; 4] = [0x4000, 0x4000, 0x4000, 0x1_0000];

#[derive(Debug, Default, Clone, Copy)]
struct Channel {
    src: u32,
    dst: u32,
    count: u32,
    /* start condition met, transfer runs on the next step() */
    pending: bool,
}

pub struct DMA {
    channels: [Channel; 4],
}

impl DMA {
    pub fn new() -> Self {
        Self { channels: [Channel::default(); 4] }
    }

    /*
     * Enable bit went 0 -> 1: latch addresses and count. Immediate transfers are queued right away,
     * timed ones wait for trigger().
     */
    pub fn enable<B: BackupController>(&mut self, mmu: &MMU<B>, ch: usize) {
        let control = DMA::CONTROL(mmu, ch);
        let channel = &mut self.channels[ch];
        channel.src = DMA::SOURCE(mmu, ch) & SRC_MASK[ch];
        channel.dst = DMA::DEST(mmu, ch) & DST_MASK[ch];
        channel.count = DMA::COUNT(mmu, ch);

        let timing = StartTiming::from_bits(control.bits() >> 12);
        channel.pending = timing == StartTiming::Immediate;
        if config::trace_dma() {
            log::debug!("DMA{} armed: 0x{:08X} -> 0x{:08X} x{} {:?}", ch, channel.src, channel.dst, channel.count, timing);
        }
    }

    /* Blanking periods start transfers of enabled channels waiting for them */
    pub fn trigger<B: BackupController>(&mut self, mmu: &MMU<B>, timing: StartTiming) {
        for ch in 0..4 {
            let control = DMA::CONTROL(mmu, ch);
            if control.contains(DmaControl::ENABLE) && StartTiming::from_bits(control.bits() >> 12) == timing {
                self.channels[ch].pending = true;
            }
        }
    }

    pub fn active(&self) -> bool {
        self.channels.iter().any(|c| c.pending)
    }

    /*
     * Runs every pending channel to completion, lowest channel first.
     * Returns the number of cycles the bus was taken for.
     */
    pub fn step<B: BackupController>(&mut self, mmu: &mut MMU<B>) -> u64 {
        let mut cycles = 0;
        for ch in 0..4 {
            if self.channels[ch].pending {
                cycles += self.transfer(mmu, ch);
            }
        }
        cycles
    }

    fn transfer<B: BackupController>(&mut self, mmu: &mut MMU<B>, ch: usize) -> u64 {
        let control = DMA::CONTROL(mmu, ch);
        let word = control.contains(DmaControl::WORD);
        let unit = if word { 4 } else { 2 };
        let dst_mode = AddrMode::from_bits(control.bits() >> 5);
        let src_mode = match AddrMode::from_bits(control.bits() >> 7) {
            // Reload is not a valid source mode
            AddrMode::IncrementReload => AddrMode::Increment,
            mode => mode,
        };

        let channel = &mut self.channels[ch];
        let (mut src, mut dst) = (channel.src, channel.dst);
        if config::trace_dma() {
            log::debug!("DMA{}: 0x{:08X} -> 0x{:08X} x{}", ch, src, dst, channel.count);
        }

        for _ in 0..channel.count {
            if word {
                let value = mmu.read32(src & !3);
                mmu.write32(dst & !3, value);
            } else {
                let value = mmu.read16(src & !1);
                mmu.write16(dst & !1, value);
            }
            src = src.wrapping_add(src_mode.step(unit)) & SRC_MASK[ch];
            dst = dst.wrapping_add(dst_mode.step(unit)) & DST_MASK[ch];
        }
        let cycles = 2 + 2 * channel.count as u64;

        channel.src = src;
        channel.dst = dst;
        channel.pending = false;

        let timing = StartTiming::from_bits(control.bits() >> 12);
        if control.contains(DmaControl::REPEAT) && timing != StartTiming::Immediate {
            channel.count = DMA::COUNT(mmu, ch);
            if dst_mode == AddrMode::IncrementReload {
                channel.dst = DMA::DEST(mmu, ch) & DST_MASK[ch];
            }
        } else {
            DMA::_ENABLE(mmu, ch, false);
        }

        if control.contains(DmaControl::IRQ) {
            mmu.request_interrupt(Interrupt::dma(ch));
        }
        cycles
    }

    pub fn SOURCE<B: BackupController>(mmu: &MMU<B>, ch: usize) -> u32 {
        mmu.ioregs.get32(ioregs::dma_sad(ch))
    }

    pub fn DEST<B: BackupController>(mmu: &MMU<B>, ch: usize) -> u32 {
        mmu.ioregs.get32(ioregs::dma_dad(ch))
    }

    pub fn COUNT<B: BackupController>(mmu: &MMU<B>, ch: usize) -> u32 {
        let count = mmu.io16(ioregs::dma_cnt_l(ch)) as u32 & (COUNT_MAX[ch] - 1);
        if count == 0 { COUNT_MAX[ch] } else { count }
    }

    pub fn CONTROL<B: BackupController>(mmu: &MMU<B>, ch: usize) -> DmaControl {
        DmaControl::from_bits_truncate(mmu.io16(ioregs::dma_cnt_h(ch)))
    }

    fn _ENABLE<B: BackupController>(mmu: &mut MMU<B>, ch: usize, flg: bool) {
        mmu.set_bit(ioregs::dma_cnt_h(ch), 15, flg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::backup::NoBackup;
    use crate::mem::*;

    fn program(mmu: &mut MMU<NoBackup>, ch: usize, src: u32, dst: u32, count: u16, control: u16) {
        mmu.write32(dma_sad(ch), src);
        mmu.write32(dma_dad(ch), dst);
        mmu.write16(dma_cnt_l(ch), count);
        mmu.write16(dma_cnt_h(ch), control);
    }

    #[test]
    fn count_zero_is_maximum() {
        let mut mmu = MMU::new(NoBackup);
        mmu.write16(dma_cnt_l(0), 0);
        mmu.write16(dma_cnt_l(3), 0);
        assert_eq!(DMA::COUNT(&mmu, 0), 0x4000);
        assert_eq!(DMA::COUNT(&mmu, 3), 0x10000);
    }

    #[test]
    fn decrementing_halfword_copy() {
        let mut mmu = MMU::new(NoBackup);
        let mut dma = DMA::new();
        for i in 0..4u32 {
            mmu.write16(EWRAM_ADDR + 2 * i, 0x1100 + i as u16);
        }
        // src decrement, dst increment, 16-bit
        program(&mut mmu, 1, EWRAM_ADDR + 6, IWRAM_ADDR, 4, 0x8000 | (1 << 7));
        dma.enable(&mmu, 1);
        assert!(dma.active());
        dma.step(&mut mmu);

        assert_eq!(mmu.read16(IWRAM_ADDR), 0x1103);
        assert_eq!(mmu.read16(IWRAM_ADDR + 6), 0x1100);
        assert!(!DMA::CONTROL(&mmu, 1).contains(DmaControl::ENABLE));
    }

    #[test]
    fn hblank_repeat_stays_armed() {
        let mut mmu = MMU::new(NoBackup);
        let mut dma = DMA::new();
        mmu.write32(EWRAM_ADDR, 0xDEAD_BEEF);
        // fixed dst, repeat, word, hblank, irq
        program(&mut mmu, 2, EWRAM_ADDR, IWRAM_ADDR, 1, 0x8000 | 0x4000 | (2 << 12) | 0x0400 | 0x0200 | (2 << 5));
        dma.enable(&mmu, 2);
        assert!(!dma.active());

        dma.trigger(&mmu, StartTiming::VBlank);
        assert!(!dma.active());
        dma.trigger(&mmu, StartTiming::HBlank);
        dma.step(&mut mmu);

        assert_eq!(mmu.read32(IWRAM_ADDR), 0xDEAD_BEEF);
        assert!(DMA::CONTROL(&mmu, 2).contains(DmaControl::ENABLE));
        assert!(mmu.read_bit(IF, 10));
    }
}

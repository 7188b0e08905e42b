#![allow(non_snake_case)]

use bitflags::bitflags;

use super::*;
use crate::mem::{PALETTE_SIZE, VRAM_SIZE};

pub const SCREEN_WIDTH: usize = 240;
pub const SCREEN_HEIGHT: usize = 160;
pub const VBLANK_HEIGHT: usize = 68;
pub const TOTAL_LINES: usize = SCREEN_HEIGHT + VBLANK_HEIGHT;

/*
 * Every line: 960 cycles of drawing followed by 272 cycles of horizontal blank.
 * 160 visible lines, then 68 lines of vertical blank.
 */
pub const HDRAW_CYCLES: u64 = 960;
pub const HBLANK_CYCLES: u64 = 272;
pub const SCANLINE_CYCLES: u64 = HDRAW_CYCLES + HBLANK_CYCLES;
pub const FRAME_CYCLES: u64 = SCANLINE_CYCLES * TOTAL_LINES as u64;

/* Mode 5 is a smaller bitmap */
const MODE5_WIDTH: usize = 160;
const MODE5_HEIGHT: usize = 128;
/* Second frame of modes 4 and 5 */
const PAGE_OFFSET: usize = 0xA000;

pub type Color = (u8, u8, u8);
pub const WHITE: Color = (255, 255, 255);
pub const BLACK: Color = (0, 0, 0);

/* 15-bit BGR to 24-bit RGB */
pub fn bgr555(value: u16) -> Color {
    let expand = |c: u16| ((c << 3) | (c >> 2)) as u8;
    (expand(value & 0x1F), expand((value >> 5) & 0x1F), expand((value >> 10) & 0x1F))
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DispCnt: u16 {
        const MODE = 0b0000_0111;
        const FRAME_SELECT = 1 << 4;
        const HBLANK_OAM_FREE = 1 << 5;
        const OBJ_1D = 1 << 6;
        const FORCED_BLANK = 1 << 7;
        const BG0 = 1 << 8;
        const BG1 = 1 << 9;
        const BG2 = 1 << 10;
        const BG3 = 1 << 11;
        const OBJ = 1 << 12;
    }
}

bitflags! {
    /* Bits 8-15 hold the line compared against VCOUNT */
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DispStat: u16 {
        const VBLANK = 1 << 0;
        const HBLANK = 1 << 1;
        const VCOUNT = 1 << 2;
        const VBLANK_IRQ = 1 << 3;
        const HBLANK_IRQ = 1 << 4;
        const VCOUNT_IRQ = 1 << 5;
    }
}

pub struct GPU {
    ly: usize,
    /* cycles into the current line */
    line_cycles: u64,
    hblank: bool,
    /* rows are drawn here and only copied out at the start of vblank */
    backbuff: Vec<Color>,
    pub framebuff: Vec<Color>,
    frame_ready: bool,
    /* blanking periods entered since the last take_blanks(), they start DMA */
    blanks: Vec<StartTiming>,
}

impl<B: BackupController> Clocked<B> for GPU {
    fn tick(&mut self, mmu: &mut MMU<B>, cycles: u64) {
        let mut left = cycles;
        while left > 0 {
            let target = if self.hblank { SCANLINE_CYCLES } else { HDRAW_CYCLES };
            let needed = target - self.line_cycles;
            if left < needed {
                self.line_cycles += left;
                return;
            }
            left -= needed;

            if self.hblank {
                self.line_cycles = 0;
                self.next_line(mmu);
            } else {
                self.line_cycles = HDRAW_CYCLES;
                self.enter_hblank(mmu);
            }
        }
    }
}

impl GPU {
    pub fn new<B: BackupController>(mmu: &mut MMU<B>) -> Self {
        let mut res = Self {
            ly: 0,
            line_cycles: 0,
            hblank: false,
            backbuff: vec![WHITE; SCREEN_WIDTH * SCREEN_HEIGHT],
            framebuff: vec![WHITE; SCREEN_WIDTH * SCREEN_HEIGHT],
            frame_ready: false,
            blanks: Vec::new(),
        };
        res.update(mmu);
        res
    }

    pub fn ly(&self) -> usize { self.ly }

    /* True once per frame, when framebuff was replaced */
    pub fn frame_ready(&mut self) -> bool {
        std::mem::replace(&mut self.frame_ready, false)
    }

    pub fn take_blanks(&mut self) -> Vec<StartTiming> {
        std::mem::take(&mut self.blanks)
    }

    fn enter_hblank<B: BackupController>(&mut self, mmu: &mut MMU<B>) {
        self.hblank = true;
        GPU::_STAT_FLAG(mmu, DispStat::HBLANK, true);

        if self.ly < SCREEN_HEIGHT {
            self.scanline(mmu);
            self.blanks.push(StartTiming::HBlank);
        }
        if GPU::DISPSTAT(mmu).contains(DispStat::HBLANK_IRQ) {
            mmu.request_interrupt(Interrupt::HBlank);
        }
    }

    fn next_line<B: BackupController>(&mut self, mmu: &mut MMU<B>) {
        self.hblank = false;
        GPU::_STAT_FLAG(mmu, DispStat::HBLANK, false);

        self.ly += 1;
        if self.ly == SCREEN_HEIGHT {
            GPU::_STAT_FLAG(mmu, DispStat::VBLANK, true);
            if GPU::DISPSTAT(mmu).contains(DispStat::VBLANK_IRQ) {
                mmu.request_interrupt(Interrupt::VBlank);
            }
            self.blanks.push(StartTiming::VBlank);
            self.framebuff.copy_from_slice(&self.backbuff);
            self.frame_ready = true;
        } else if self.ly == TOTAL_LINES {
            self.ly = 0;
            GPU::_STAT_FLAG(mmu, DispStat::VBLANK, false);
        }
        self.update(mmu);
    }

    /* VCOUNT and the match flag follow the current line */
    pub fn update<B: BackupController>(&mut self, mmu: &mut MMU<B>) {
        GPU::_VCOUNT(mmu, self.ly as u16);
        let matched = GPU::LYC(mmu) as usize == self.ly;
        let was_matched = GPU::DISPSTAT(mmu).contains(DispStat::VCOUNT);
        GPU::_STAT_FLAG(mmu, DispStat::VCOUNT, matched);
        if matched && !was_matched && GPU::DISPSTAT(mmu).contains(DispStat::VCOUNT_IRQ) {
            mmu.request_interrupt(Interrupt::VCount);
        }
    }

    // Draws line LY of the active bitmap mode into the back buffer.
    fn scanline<B: BackupController>(&mut self, mmu: &MMU<B>) {
        let y = self.ly;
        let control = GPU::DISPCNT(mmu);
        let page = if control.contains(DispCnt::FRAME_SELECT) { PAGE_OFFSET } else { 0 };
        let backdrop = bgr555(GPU::palette16(mmu, 0));
        let bg2 = control.contains(DispCnt::BG2);
        let row = &mut self.backbuff[y * SCREEN_WIDTH..(y + 1) * SCREEN_WIDTH];

        if control.contains(DispCnt::FORCED_BLANK) {
            for px in row.iter_mut() { *px = WHITE; }
            return;
        }

        match (control & DispCnt::MODE).bits() {
            3 if bg2 => {
                for (x, px) in row.iter_mut().enumerate() {
                    *px = bgr555(GPU::vram16(mmu, 2 * (y * SCREEN_WIDTH + x)));
                }
            }
            4 if bg2 => {
                for (x, px) in row.iter_mut().enumerate() {
                    let idx = mmu.vram[page + y * SCREEN_WIDTH + x] as usize;
                    *px = bgr555(GPU::palette16(mmu, idx));
                }
            }
            5 if bg2 => {
                for (x, px) in row.iter_mut().enumerate() {
                    *px = if x < MODE5_WIDTH && y < MODE5_HEIGHT {
                        bgr555(GPU::vram16(mmu, page + 2 * (y * MODE5_WIDTH + x)))
                    } else {
                        backdrop
                    };
                }
            }
            // Tile modes are not rendered
            _ => {
                for px in row.iter_mut() { *px = backdrop; }
            }
        }
    }

    fn vram16<B: BackupController>(mmu: &MMU<B>, offset: usize) -> u16 {
        let offset = offset % VRAM_SIZE;
        mmu.vram[offset] as u16 | (mmu.vram[offset + 1] as u16) << 8
    }

    fn palette16<B: BackupController>(mmu: &MMU<B>, idx: usize) -> u16 {
        let offset = (2 * idx) % PALETTE_SIZE;
        mmu.palette[offset] as u16 | (mmu.palette[offset + 1] as u16) << 8
    }

    pub fn DISPCNT<B: BackupController>(mmu: &MMU<B>) -> DispCnt {
        DispCnt::from_bits_truncate(mmu.io16(ioregs::DISPCNT))
    }

    pub fn DISPSTAT<B: BackupController>(mmu: &MMU<B>) -> DispStat {
        DispStat::from_bits_truncate(mmu.io16(ioregs::DISPSTAT))
    }
    fn _STAT_FLAG<B: BackupController>(mmu: &mut MMU<B>, flag: DispStat, value: bool) {
        let stat = mmu.io16(ioregs::DISPSTAT);
        let stat = if value { stat | flag.bits() } else { stat & !flag.bits() };
        mmu.set_io16(ioregs::DISPSTAT, stat);
    }

    pub fn LYC<B: BackupController>(mmu: &MMU<B>) -> u8 {
        (mmu.io16(ioregs::DISPSTAT) >> 8) as u8
    }

    pub fn VCOUNT<B: BackupController>(mmu: &MMU<B>) -> u16 {
        mmu.io16(ioregs::VCOUNT)
    }
    fn _VCOUNT<B: BackupController>(mmu: &mut MMU<B>, value: u16) {
        mmu.set_io16(ioregs::VCOUNT, value)
    }
}

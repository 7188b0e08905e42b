use super::{Addr, Byte, IO_REGS_ADDR, IO_REG_SIZE};
use crate::utils::Bits;

/* LCD */
pub const DISPCNT: Addr = 0x0400_0000;
pub const DISPSTAT: Addr = 0x0400_0004;
pub const VCOUNT: Addr = 0x0400_0006;
/* DMA, 12 bytes per channel */
pub const DMA0SAD: Addr = 0x0400_00B0;
pub const DMA0DAD: Addr = 0x0400_00B4;
pub const DMA0CNT_L: Addr = 0x0400_00B8;
pub const DMA0CNT_H: Addr = 0x0400_00BA;
pub const DMA3SAD: Addr = 0x0400_00D4;
pub const DMA3DAD: Addr = 0x0400_00D8;
pub const DMA3CNT_L: Addr = 0x0400_00DC;
pub const DMA3CNT_H: Addr = 0x0400_00DE;
pub const DMA_CHANNEL_SIZE: Addr = 12;
/* Timers, 4 bytes per channel */
pub const TM0CNT_L: Addr = 0x0400_0100;
pub const TM0CNT_H: Addr = 0x0400_0102;
pub const TM1CNT_L: Addr = 0x0400_0104;
pub const TM1CNT_H: Addr = 0x0400_0106;
pub const TM2CNT_L: Addr = 0x0400_0108;
pub const TM2CNT_H: Addr = 0x0400_010A;
pub const TM3CNT_L: Addr = 0x0400_010C;
pub const TM3CNT_H: Addr = 0x0400_010E;
pub const TIMER_CHANNEL_SIZE: Addr = 4;
/* Keypad */
pub const KEYINPUT: Addr = 0x0400_0130;
pub const KEYCNT: Addr = 0x0400_0132;
/* Interrupts, waitstates, power */
pub const IE: Addr = 0x0400_0200;
pub const IF: Addr = 0x0400_0202;
pub const WAITCNT: Addr = 0x0400_0204;
pub const IME: Addr = 0x0400_0208;
pub const POSTFLG: Addr = 0x0400_0300;
pub const HALTCNT: Addr = 0x0400_0301;

pub fn dma_sad(ch: usize) -> Addr { DMA0SAD + DMA_CHANNEL_SIZE * ch as Addr }
pub fn dma_dad(ch: usize) -> Addr { DMA0DAD + DMA_CHANNEL_SIZE * ch as Addr }
pub fn dma_cnt_l(ch: usize) -> Addr { DMA0CNT_L + DMA_CHANNEL_SIZE * ch as Addr }
pub fn dma_cnt_h(ch: usize) -> Addr { DMA0CNT_H + DMA_CHANNEL_SIZE * ch as Addr }
pub fn tm_cnt_l(ch: usize) -> Addr { TM0CNT_L + TIMER_CHANNEL_SIZE * ch as Addr }
pub fn tm_cnt_h(ch: usize) -> Addr { TM0CNT_H + TIMER_CHANNEL_SIZE * ch as Addr }

/*
 * Bit 0: V-Blank         Bit 7:  Serial
 * Bit 1: H-Blank         Bit 8-11: DMA 0-3
 * Bit 2: V-Counter match Bit 12: Keypad
 * Bit 3-6: Timer 0-3     Bit 13: Game Pak
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank, HBlank, VCount,
    Timer0, Timer1, Timer2, Timer3,
    Serial,
    Dma0, Dma1, Dma2, Dma3,
    Keypad, GamePak,
}

impl Interrupt {
    pub fn bit(self) -> u32 { self as u32 }

    pub fn timer(ch: usize) -> Self {
        [Interrupt::Timer0, Interrupt::Timer1, Interrupt::Timer2, Interrupt::Timer3][ch & 3]
    }

    pub fn dma(ch: usize) -> Self {
        [Interrupt::Dma0, Interrupt::Dma1, Interrupt::Dma2, Interrupt::Dma3][ch & 3]
    }
}

/*
 * Side effects of CPU-visible register writes which have to be handled by a device other than the register file.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEvent {
    /* DMAxCNT_H enable bit went 0 -> 1 */
    DmaEnable(usize),
    /* TMxCNT_H start bit went 0 -> 1. Counter was already reloaded. */
    TimerStart(usize),
    Halt,
}

/*
 * Register file of the I/O window. Plain byte storage with per-register write rules on top.
 * write() is what the CPU (and DMA) sees, get()/set() is raw access for devices.
 */
pub struct IORegs {
    regs: Vec<Byte>,
    /* TMxCNT_L reads give the counter, writes go here */
    timer_reload: [u16; 4],
    events: Vec<IoEvent>,
}

impl IORegs {
    pub fn new() -> Self {
        let mut res = Self { regs: vec![0u8; IO_REG_SIZE], timer_reload: [0; 4], events: Vec::new() };

        // All keys released
        res.set16(KEYINPUT, 0x03FF);
        // Forced blank until the program sets up the display
        res.set16(DISPCNT, 0x0080);

        res
    }

    fn offset(addr: Addr) -> usize {
        ((addr - IO_REGS_ADDR) as usize) % IO_REG_SIZE
    }

    pub fn get(&self, addr: Addr) -> Byte {
        self.regs[IORegs::offset(addr)]
    }

    pub fn set(&mut self, addr: Addr, value: Byte) {
        self.regs[IORegs::offset(addr)] = value;
    }

    pub fn get16(&self, addr: Addr) -> u16 {
        self.get(addr) as u16 | (self.get(addr + 1) as u16) << 8
    }

    pub fn set16(&mut self, addr: Addr, value: u16) {
        self.set(addr, value as u8);
        self.set(addr + 1, (value >> 8) as u8);
    }

    pub fn get32(&self, addr: Addr) -> u32 {
        self.get16(addr) as u32 | (self.get16(addr + 2) as u32) << 16
    }

    pub fn read_bit(&self, addr: Addr, bit: u32) -> bool {
        self.get16(addr).bit(bit)
    }

    pub fn set_bit(&mut self, addr: Addr, bit: u32, flg: bool) {
        let value = self.get16(addr).with_bit(bit, flg);
        self.set16(addr, value);
    }

    pub fn request(&mut self, irq: Interrupt) {
        self.set_bit(IF, irq.bit(), true);
    }

    pub fn timer_reload(&self, ch: usize) -> u16 {
        self.timer_reload[ch]
    }

    pub fn take_events(&mut self) -> Vec<IoEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn read(&self, addr: Addr) -> Byte {
        self.get(addr)
    }

    pub fn write(&mut self, addr: Addr, value: Byte) {
        let addr = IO_REGS_ADDR + IORegs::offset(addr) as Addr;
        match addr {
            // Status bits are owned by the GPU
            0x0400_0004 => {
                let status = self.get(addr) & 0x07;
                self.set(addr, (value & 0xF8) | status);
            }
            // Read-only
            0x0400_0006 | 0x0400_0007 => {}
            0x0400_0130 | 0x0400_0131 => {}

            // Write-1-to-clear
            0x0400_0202 | 0x0400_0203 => {
                let flags = self.get(addr) & !value;
                self.set(addr, flags);
            }

            // DMAxCNT_H upper byte holds the enable bit
            0x0400_00BB | 0x0400_00C7 | 0x0400_00D3 | 0x0400_00DF => {
                let ch = ((addr - DMA0CNT_H - 1) / DMA_CHANNEL_SIZE) as usize;
                let was_enabled = self.get(addr).bit(7);
                self.set(addr, value);
                if !was_enabled && value.bit(7) {
                    self.events.push(IoEvent::DmaEnable(ch));
                }
            }

            // TMxCNT_L sets the reload value, the counter itself is not writable
            0x0400_0100..=0x0400_010F if (addr - TM0CNT_L) % TIMER_CHANNEL_SIZE < 2 => {
                let ch = ((addr - TM0CNT_L) / TIMER_CHANNEL_SIZE) as usize;
                let byte = ((addr - TM0CNT_L) % TIMER_CHANNEL_SIZE) as usize;
                self.timer_reload[ch].set_byte(byte, value);
            }
            // TMxCNT_H lower byte holds the start bit
            0x0400_0102 | 0x0400_0106 | 0x0400_010A | 0x0400_010E => {
                let ch = ((addr - TM0CNT_H) / TIMER_CHANNEL_SIZE) as usize;
                let was_running = self.get(addr).bit(7);
                self.set(addr, value);
                if !was_running && value.bit(7) {
                    let reload = self.timer_reload[ch];
                    self.set16(tm_cnt_l(ch), reload);
                    self.events.push(IoEvent::TimerStart(ch));
                }
            }

            0x0400_0301 => {
                self.set(addr, value);
                self.events.push(IoEvent::Halt);
            }

            // Everything else is plain storage
            _ => self.set(addr, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let regs = IORegs::new();
        assert_eq!(regs.get16(KEYINPUT), 0x03FF);
        assert_eq!(regs.get16(IE), 0);
        assert_eq!(regs.get16(IF), 0);
    }

    #[test]
    fn dma_enable_edge() {
        let mut regs = IORegs::new();
        regs.write(DMA3CNT_H + 1, 0x80);
        regs.write(DMA3CNT_H + 1, 0x80);
        assert_eq!(regs.take_events(), vec![IoEvent::DmaEnable(3)]);

        regs.write(DMA3CNT_H + 1, 0x00);
        regs.write(DMA3CNT_H + 1, 0x84);
        assert_eq!(regs.take_events(), vec![IoEvent::DmaEnable(3)]);
    }

    #[test]
    fn timer_reload_and_start() {
        let mut regs = IORegs::new();
        regs.write(TM1CNT_L, 0x34);
        regs.write(TM1CNT_L + 1, 0x12);
        assert_eq!(regs.timer_reload(1), 0x1234);
        assert_eq!(regs.get16(TM1CNT_L), 0);

        regs.write(TM1CNT_H, 0x80);
        assert_eq!(regs.get16(TM1CNT_L), 0x1234);
        assert_eq!(regs.take_events(), vec![IoEvent::TimerStart(1)]);

        // Restarting a running timer does not reload it
        regs.set16(TM1CNT_L, 0x2000);
        regs.write(TM1CNT_H, 0xC0);
        assert_eq!(regs.get16(TM1CNT_L), 0x2000);
        assert!(!regs.has_events());
    }

    #[test]
    fn read_only_and_status_bits() {
        let mut regs = IORegs::new();
        regs.set(DISPSTAT, 0x03);
        regs.write(DISPSTAT, 0x18);
        assert_eq!(regs.get(DISPSTAT), 0x1B);

        regs.set16(VCOUNT, 100);
        regs.write(VCOUNT, 5);
        assert_eq!(regs.get16(VCOUNT), 100);

        regs.write(KEYINPUT, 0);
        assert_eq!(regs.get16(KEYINPUT), 0x03FF);
    }
}

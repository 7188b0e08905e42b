#![allow(non_snake_case)]

use bitflags::bitflags;

use super::*;

/* Input clock divisors, selected by TMxCNT_H bits 0-1 */
pub const PRESCALERS: [u64; 4] = [1, 64, 256, 1024];

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerControl: u16 {
        const PRESCALER = 0b0000_0011;
        /* Count overflows of the previous channel instead of cycles */
        const CASCADE = 0b0000_0100;
        const IRQ = 0b0100_0000;
        const START = 0b1000_0000;
    }
}

/*
 * Four 16-bit up-counters. TMxCNT_L holds the live counter, the reload value sits in IORegs.
 */
pub struct Timer {
    /* cycles not yet turned into a counter increment */
    sub: [u64; 4],
}

impl<B: BackupController> Clocked<B> for Timer {
    // Channels go in index order so an overflow of channel N is seen by N+1 within the same tick.
    fn tick(&mut self, mmu: &mut MMU<B>, cycles: u64) {
        let mut carry = 0u64;
        for ch in 0..4 {
            let control = Timer::CONTROL(mmu, ch);
            if !control.contains(TimerControl::START) {
                carry = 0;
                continue;
            }

            let increments = if ch > 0 && control.contains(TimerControl::CASCADE) {
                // One step per tick in which the previous channel overflowed, however often it wrapped
                carry.min(1)
            } else {
                let divisor = PRESCALERS[(control & TimerControl::PRESCALER).bits() as usize];
                self.sub[ch] += cycles;
                let inc = self.sub[ch] / divisor;
                self.sub[ch] %= divisor;
                inc
            };

            carry = Timer::count(mmu, ch, increments);
            if carry > 0 && control.contains(TimerControl::IRQ) {
                mmu.request_interrupt(Interrupt::timer(ch));
            }
        }
    }
}

impl Timer {
    pub fn new() -> Self {
        Self { sub: [0; 4] }
    }

    /* Start bit went high. The counter itself was reloaded by the register write. */
    pub fn start<B: BackupController>(&mut self, mmu: &MMU<B>, ch: usize) {
        self.sub[ch] = 0;
        log::debug!("Timer {} started, reload 0x{:04X}", ch, Timer::RELOAD(mmu, ch));
    }

    /* Adds to the counter and returns how many times it wrapped */
    fn count<B: BackupController>(mmu: &mut MMU<B>, ch: usize, increments: u64) -> u64 {
        if increments == 0 {
            return 0;
        }
        let reload = Timer::RELOAD(mmu, ch) as u64;
        let counter = Timer::COUNTER(mmu, ch) as u64 + increments;
        if counter <= 0xFFFF {
            Timer::_COUNTER(mmu, ch, counter as u16);
            return 0;
        }

        // After the first wrap the counter runs reload..=0xFFFF
        let over = counter - 0x10000;
        let period = 0x10000 - reload;
        Timer::_COUNTER(mmu, ch, (reload + over % period) as u16);
        1 + over / period
    }

    pub fn COUNTER<B: BackupController>(mmu: &MMU<B>, ch: usize) -> u16 {
        mmu.io16(ioregs::tm_cnt_l(ch))
    }
    fn _COUNTER<B: BackupController>(mmu: &mut MMU<B>, ch: usize, value: u16) {
        mmu.set_io16(ioregs::tm_cnt_l(ch), value)
    }

    pub fn RELOAD<B: BackupController>(mmu: &MMU<B>, ch: usize) -> u16 {
        mmu.ioregs.timer_reload(ch)
    }

    pub fn CONTROL<B: BackupController>(mmu: &MMU<B>, ch: usize) -> TimerControl {
        TimerControl::from_bits_truncate(mmu.io16(ioregs::tm_cnt_h(ch)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::backup::NoBackup;
    use crate::mem::ioregs::*;

    fn setup(ch: usize, reload: u16, control: u8) -> MMU<NoBackup> {
        let mut mmu = MMU::new(NoBackup);
        mmu.write16(tm_cnt_l(ch), reload);
        mmu.write8(tm_cnt_h(ch), control);
        mmu
    }

    #[test]
    fn prescaled_counting() {
        let mut mmu = setup(0, 0, 0x81);
        let mut timer = Timer::new();
        timer.tick(&mut mmu, 63);
        assert_eq!(Timer::COUNTER(&mmu, 0), 0);
        timer.tick(&mut mmu, 1);
        assert_eq!(Timer::COUNTER(&mmu, 0), 1);
        timer.tick(&mut mmu, 64 * 10 + 5);
        assert_eq!(Timer::COUNTER(&mmu, 0), 11);
    }

    #[test]
    fn wrap_reloads_and_counts_overflows() {
        let mut mmu = setup(2, 0xFFF0, 0xC0);
        let mut timer = Timer::new();
        timer.tick(&mut mmu, 15);
        assert_eq!(Timer::COUNTER(&mmu, 2), 0xFFFF);
        assert!(!mmu.read_bit(IF, 5));

        timer.tick(&mut mmu, 1);
        assert_eq!(Timer::COUNTER(&mmu, 2), 0xFFF0);
        assert!(mmu.read_bit(IF, 5));

        assert_eq!(Timer::count(&mut mmu, 2, 16 * 3 + 2), 3);
        assert_eq!(Timer::COUNTER(&mmu, 2), 0xFFF2);
    }

    #[test]
    fn cascade_steps_once_per_tick() {
        let mut mmu = setup(0, 0xFFFF, 0x80);
        mmu.write16(tm_cnt_l(1), 0x0100);
        mmu.write8(tm_cnt_h(1), 0x84);
        let mut timer = Timer::new();
        timer.tick(&mut mmu, 16);
        assert_eq!(Timer::COUNTER(&mmu, 0), 0xFFFF);
        assert_eq!(Timer::COUNTER(&mmu, 1), 0x0101);
    }

    #[test]
    fn stopped_channel_holds() {
        let mut mmu = setup(1, 0x1234, 0x00);
        let mut timer = Timer::new();
        timer.tick(&mut mmu, 10_000);
        assert_eq!(Timer::COUNTER(&mmu, 1), 0);
    }
}

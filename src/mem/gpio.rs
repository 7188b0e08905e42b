use super::{Addr, Byte};
use crate::dev::rtc::Rtc;

pub const GPIO_DATA: Addr = 0x0800_00C4;
pub const GPIO_DIRECTION: Addr = 0x0800_00C6;
pub const GPIO_CONTROL: Addr = 0x0800_00C8;

/*
 * 4-bit general purpose port overlaid on ROM. Each pin is an output when its direction
 * bit is set. The control register decides whether the port is visible to reads at all,
 * otherwise reads see the ROM underneath.
 */
pub struct Gpio {
    data: u8,
    direction: u8,
    readable: bool,
    pub rtc: Option<Rtc>,
}

impl Gpio {
    pub fn new(rtc: Option<Rtc>) -> Self {
        Self { data: 0, direction: 0, readable: false, rtc: rtc }
    }

    pub fn present(&self) -> bool {
        self.rtc.is_some()
    }

    fn is_port(&self, addr: Addr) -> bool {
        self.present() && addr & 0x01FF_FFFF >= 0xC4 && addr & 0x01FF_FFFF < 0xCA
    }

    pub fn read(&self, addr: Addr) -> Option<Byte> {
        if !self.is_port(addr) || !self.readable {
            return None;
        }
        let value = match addr & 0x01FF_FFFF {
            0xC4 => {
                let input = self.rtc.as_ref().map(|rtc| rtc.pins()).unwrap_or(0);
                (self.data & self.direction) | (input & !self.direction)
            }
            0xC6 => self.direction,
            0xC8 => self.readable as u8,
            _ => 0,
        };
        Some(value & 0xF)
    }

    /* Returns false when the address is plain ROM */
    pub fn write(&mut self, addr: Addr, value: Byte) -> bool {
        if !self.is_port(addr) {
            return false;
        }
        match addr & 0x01FF_FFFF {
            0xC4 => {
                self.data = value & 0xF;
                let pins = self.data & self.direction;
                if let Some(rtc) = self.rtc.as_mut() {
                    rtc.write_pins(pins);
                }
            }
            0xC6 => self.direction = value & 0xF,
            0xC8 => self.readable = value & 1 != 0,
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_port_is_rom() {
        let mut gpio = Gpio::new(None);
        assert!(!gpio.write(GPIO_CONTROL, 1));
        assert_eq!(gpio.read(GPIO_DATA), None);
    }

    #[test]
    fn control_gates_reads() {
        let mut gpio = Gpio::new(Some(Rtc::new()));
        assert!(gpio.write(GPIO_DIRECTION, 0x7));
        assert_eq!(gpio.read(GPIO_DIRECTION), None);

        gpio.write(GPIO_CONTROL, 1);
        assert_eq!(gpio.read(GPIO_DIRECTION), Some(0x7));
        gpio.write(GPIO_DATA, 0x5);
        assert_eq!(gpio.read(GPIO_DATA), Some(0x5));
    }
}

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

use crate::config;
use crate::utils::bcd;

/* GPIO pins */
pub const SCK: u8 = 1 << 0;
pub const SIO: u8 = 1 << 1;
pub const CS: u8 = 1 << 2;

/* Control register: 24-hour mode */
const CONTROL_24H: u8 = 1 << 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcState {
    Idle,
    CommandSetup,
    Reading,
    Writing,
}

/*
 * Registers selected by bits 1-3 of the command byte.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcRegister {
    Reset,
    Control,
    DateTime,
    Time,
    Irq,
    Unused,
}

impl RtcRegister {
    fn from_index(idx: u8) -> Self {
        match idx {
            0 => RtcRegister::Reset,
            1 => RtcRegister::Control,
            2 => RtcRegister::DateTime,
            3 => RtcRegister::Time,
            6 => RtcRegister::Irq,
            _ => RtcRegister::Unused,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RtcRegister::Control => 1,
            RtcRegister::DateTime => 7,
            RtcRegister::Time => 3,
            _ => 0,
        }
    }
}

/*
 * Serial real-time clock wired to the cartridge GPIO port.
 * Command bits come in LSB first on SCK rising edges, data goes out MSB first.
 */
pub struct Rtc {
    state: RtcState,
    /* last pin levels, for edge detection */
    sck: bool,
    cs: bool,
    sio_out: bool,

    command: u8,
    bits: u32,
    register: RtcRegister,
    buffer: Vec<u8>,
    byte: usize,
    bit: u32,

    control: u8,
    clock: fn() -> NaiveDateTime,
}

fn local_time() -> NaiveDateTime {
    Local::now().naive_local()
}

impl Rtc {
    pub fn new() -> Self {
        Rtc::with_clock(local_time)
    }

    /* Time source other than the host clock */
    pub fn with_clock(clock: fn() -> NaiveDateTime) -> Self {
        Self {
            state: RtcState::Idle,
            sck: false, cs: false, sio_out: false,
            command: 0, bits: 0,
            register: RtcRegister::Unused,
            buffer: Vec::new(), byte: 0, bit: 0,
            control: CONTROL_24H,
            clock: clock,
        }
    }

    pub fn state(&self) -> RtcState { self.state }
    pub fn control(&self) -> u8 { self.control }

    /* Pin levels driven by the chip */
    pub fn pins(&self) -> u8 {
        if self.sio_out { SIO } else { 0 }
    }

    /*
     * year, month, day, weekday, hour, minute, second in BCD
     */
    pub fn datetime(&self) -> [u8; 7] {
        let now = (self.clock)();
        let mut res = [0u8; 7];
        res[0] = bcd(now.year().rem_euclid(100) as u32);
        res[1] = bcd(now.month());
        res[2] = bcd(now.day());
        res[3] = bcd(now.weekday().num_days_from_sunday());
        res[4..].copy_from_slice(&self.time_of(&now));
        res
    }

    fn time_of(&self, now: &NaiveDateTime) -> [u8; 3] {
        let pm = if now.hour() >= 12 { 0x80 } else { 0 };
        let hour = if self.control & CONTROL_24H != 0 { bcd(now.hour()) } else { bcd(now.hour() % 12) };
        [hour | pm, bcd(now.minute()), bcd(now.second())]
    }

    pub fn write_pins(&mut self, pins: u8) {
        let sck = pins & SCK != 0;
        let sio = pins & SIO != 0;
        let cs = pins & CS != 0;
        let rising = !self.sck && sck;

        if self.cs && !cs && self.state != RtcState::Idle {
            if config::trace_rtc() { log::debug!("RTC transfer abandoned in {:?}", self.state); }
            self.state = RtcState::Idle;
        }

        match self.state {
            RtcState::Idle => {
                if !self.cs && cs && sck {
                    self.state = RtcState::CommandSetup;
                    self.command = 0;
                    self.bits = 0;
                }
            }
            RtcState::CommandSetup if cs && rising => {
                self.command |= (sio as u8) << self.bits;
                self.bits += 1;
                if self.bits == 8 {
                    self.decode();
                }
            }
            RtcState::Reading if cs && rising => self.shift_out(),
            RtcState::Writing if cs && rising => self.shift_in(sio),
            _ => {}
        }

        self.sck = sck;
        self.cs = cs;
    }

    /*
     * Canonical layout is 0110 RRR D (D = 1 for read). Some games send it bit-reversed.
     */
    fn decode(&mut self) {
        let cmd = if self.command >> 4 == 0x6 {
            self.command
        } else if self.command & 0xF == 0x6 {
            self.command.reverse_bits()
        } else {
            log::debug!("Bad RTC command 0x{:02X}", self.command);
            self.state = RtcState::Idle;
            return;
        };

        let read = cmd & 1 != 0;
        self.register = RtcRegister::from_index((cmd >> 1) & 0x7);
        if config::trace_rtc() {
            log::debug!("RTC command 0x{:02X}: {:?} {}", cmd, self.register, if read { "read" } else { "write" });
        }

        self.byte = 0;
        self.bit = 0;
        match self.register {
            RtcRegister::Reset => {
                self.control = 0;
                self.state = RtcState::Idle;
            }
            RtcRegister::Irq | RtcRegister::Unused => self.state = RtcState::Idle,
            _ if read => {
                self.buffer = self.latch();
                self.state = RtcState::Reading;
            }
            _ => {
                self.buffer = vec![0; self.register.len()];
                self.state = RtcState::Writing;
            }
        }
    }

    fn latch(&self) -> Vec<u8> {
        match self.register {
            RtcRegister::Control => vec![self.control],
            RtcRegister::DateTime => self.datetime().to_vec(),
            RtcRegister::Time => self.time_of(&(self.clock)()).to_vec(),
            _ => Vec::new(),
        }
    }

    fn shift_out(&mut self) {
        let byte = self.buffer[self.byte];
        self.sio_out = (byte >> (7 - self.bit)) & 1 != 0;
        self.advance();
    }

    fn shift_in(&mut self, sio: bool) {
        let shift = 7 - self.bit;
        self.buffer[self.byte] |= (sio as u8) << shift;
        let last = self.byte + 1 == self.buffer.len() && self.bit == 7;
        if last && self.register == RtcRegister::Control {
            self.control = self.buffer[0];
        }
        // Date and time writes are accepted but the clock keeps following the host
        self.advance();
    }

    fn advance(&mut self) {
        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.byte += 1;
            if self.byte == self.buffer.len() {
                self.state = RtcState::Idle;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9).and_then(|d| d.and_hms_opt(21, 45, 7)).unwrap()
    }

    fn begin(rtc: &mut Rtc) {
        rtc.write_pins(SCK);
        rtc.write_pins(SCK | CS);
    }

    /* Sends bits in the order given */
    fn send(rtc: &mut Rtc, bits: &[u8]) {
        for bit in bits {
            let sio = if *bit != 0 { SIO } else { 0 };
            rtc.write_pins(CS | sio);
            rtc.write_pins(CS | SCK | sio);
        }
    }

    fn command_bits(cmd: u8) -> Vec<u8> {
        (0..8).map(|i| (cmd >> i) & 1).collect()
    }

    fn receive(rtc: &mut Rtc, bytes: usize) -> Vec<u8> {
        let mut res = vec![0u8; bytes];
        for i in 0..bytes * 8 {
            rtc.write_pins(CS);
            rtc.write_pins(CS | SCK);
            res[i / 8] |= ((rtc.pins() & SIO != 0) as u8) << (7 - i % 8);
        }
        res
    }

    #[test]
    fn starts_on_cs_rise_with_sck_high() {
        let mut rtc = Rtc::with_clock(fixed_clock);
        rtc.write_pins(CS);
        assert_eq!(rtc.state(), RtcState::Idle);
        rtc.write_pins(0);
        begin(&mut rtc);
        assert_eq!(rtc.state(), RtcState::CommandSetup);
    }

    #[test]
    fn datetime_read() {
        let mut rtc = Rtc::with_clock(fixed_clock);
        begin(&mut rtc);
        send(&mut rtc, &command_bits(0x65));
        assert_eq!(rtc.state(), RtcState::Reading);
        assert_eq!(receive(&mut rtc, 7), vec![0x24, 0x03, 0x09, 0x06, 0xA1, 0x45, 0x07]);
        assert_eq!(rtc.state(), RtcState::Idle);
    }

    #[test]
    fn reversed_command() {
        let mut rtc = Rtc::with_clock(fixed_clock);
        begin(&mut rtc);
        // 0x65 sent MSB first
        send(&mut rtc, &[0, 1, 1, 0, 0, 1, 0, 1]);
        assert_eq!(rtc.state(), RtcState::Reading);
    }

    #[test]
    fn control_write_and_twelve_hour_mode() {
        let mut rtc = Rtc::with_clock(fixed_clock);
        begin(&mut rtc);
        send(&mut rtc, &command_bits(0x62));
        assert_eq!(rtc.state(), RtcState::Writing);
        send(&mut rtc, &[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(rtc.control(), 0);
        assert_eq!(rtc.state(), RtcState::Idle);
        assert_eq!(rtc.datetime()[4], 0x89);
    }

    #[test]
    fn cs_fall_abandons_transfer() {
        let mut rtc = Rtc::with_clock(fixed_clock);
        begin(&mut rtc);
        send(&mut rtc, &command_bits(0x65));
        receive(&mut rtc, 2);
        rtc.write_pins(SCK);
        assert_eq!(rtc.state(), RtcState::Idle);
    }
}

use bitflags::bitflags;

/*
 * Processor modes, by the value of the CPSR mode field.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    User,
    Fiq,
    Irq,
    Supervisor,
    Abort,
    Undefined,
    System,
}

impl Mode {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0x1F {
            0x10 => Some(Mode::User),
            0x11 => Some(Mode::Fiq),
            0x12 => Some(Mode::Irq),
            0x13 => Some(Mode::Supervisor),
            0x17 => Some(Mode::Abort),
            0x1B => Some(Mode::Undefined),
            0x1F => Some(Mode::System),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Mode::User => 0x10,
            Mode::Fiq => 0x11,
            Mode::Irq => 0x12,
            Mode::Supervisor => 0x13,
            Mode::Abort => 0x17,
            Mode::Undefined => 0x1B,
            Mode::System => 0x1F,
        }
    }

    /* User and System share a bank */
    fn bank(self) -> usize {
        match self {
            Mode::User | Mode::System => 0,
            Mode::Fiq => 1,
            Mode::Irq => 2,
            Mode::Supervisor => 3,
            Mode::Abort => 4,
            Mode::Undefined => 5,
        }
    }

    pub fn has_spsr(self) -> bool {
        self.bank() != 0
    }

    pub fn privileged(self) -> bool {
        self != Mode::User
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Psr: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
        /* IRQ disable */
        const I = 1 << 7;
        /* FIQ disable */
        const F = 1 << 6;
        /* THUMB state */
        const T = 1 << 5;
        const MODE = 0x1F;
    }
}

impl Psr {
    pub fn mode(&self) -> Option<Mode> {
        Mode::from_bits(self.bits())
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        Psr::from_bits_truncate((self.bits() & !0x1F) | mode.bits())
    }
}

/*
 * Copy of the registers a mode sees in place of the shared ones.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bank {
    pub r8_r12: [u32; 5],
    pub sp: u32,
    pub lr: u32,
    pub spsr: Option<Psr>,
}

/*
 * r holds what the current mode sees. Registers of the other modes sit in the side arrays
 * and are swapped in by enter_mode().
 * r[15] is the address of the next instruction to fetch.
 */
#[derive(Debug, Clone)]
pub struct Registers {
    pub r: [u32; 16],
    cpsr: Psr,
    /* R8-R12 of all modes but FIQ, while FIQ is active */
    user_hi: [u32; 5],
    /* R8-R12 of FIQ, while it is not active */
    fiq_hi: [u32; 5],
    sp: [u32; 6],
    lr: [u32; 6],
    spsr: [Psr; 6],
}

impl Registers {
    pub fn new() -> Self {
        Self {
            r: [0; 16],
            cpsr: Psr::I | Psr::F | Psr::from_bits_truncate(Mode::Supervisor.bits()),
            user_hi: [0; 5],
            fiq_hi: [0; 5],
            sp: [0; 6],
            lr: [0; 6],
            spsr: [Psr::empty(); 6],
        }
    }

    pub fn cpsr(&self) -> Psr { self.cpsr }

    pub fn mode(&self) -> Mode {
        // The mode field is only ever written through enter_mode()
        self.cpsr.mode().unwrap_or(Mode::System)
    }

    pub fn thumb(&self) -> bool { self.cpsr.contains(Psr::T) }

    pub fn flag(&self, flag: Psr) -> bool { self.cpsr.contains(flag) }

    pub fn set_flag(&mut self, flag: Psr, value: bool) { self.cpsr.set(flag, value) }

    pub fn pc(&self) -> u32 { self.r[15] }

    /* Full replacement, aligned to the current instruction width */
    pub fn set_pc(&mut self, value: u32) {
        self.r[15] = if self.thumb() { value & !1 } else { value & !3 };
    }

    /*
     * Swaps banked registers. Nothing happens to the registers when both modes share a bank.
     */
    pub fn enter_mode(&mut self, mode: Mode) {
        let old = self.mode();
        if old.bank() != mode.bank() {
            self.sp[old.bank()] = self.r[13];
            self.lr[old.bank()] = self.r[14];
            if old == Mode::Fiq {
                self.fiq_hi.copy_from_slice(&self.r[8..13]);
                self.r[8..13].copy_from_slice(&self.user_hi);
            } else if mode == Mode::Fiq {
                self.user_hi.copy_from_slice(&self.r[8..13]);
                self.r[8..13].copy_from_slice(&self.fiq_hi);
            }
            self.r[13] = self.sp[mode.bank()];
            self.r[14] = self.lr[mode.bank()];
        }
        self.cpsr = self.cpsr.with_mode(mode);
    }

    /* Writes the whole status register, switching banks if the mode changes */
    pub fn set_cpsr(&mut self, psr: Psr) {
        match psr.mode() {
            Some(mode) => self.enter_mode(mode),
            None => log::warn!("Invalid mode bits 0x{:02X} ignored", psr.bits() & 0x1F),
        }
        let mode = self.cpsr & Psr::MODE;
        self.cpsr = (psr - Psr::MODE) | mode;
    }

    /* User and System have no saved status, they read the current one */
    pub fn spsr(&self) -> Psr {
        let mode = self.mode();
        if mode.has_spsr() { self.spsr[mode.bank()] } else { self.cpsr }
    }

    pub fn set_spsr(&mut self, psr: Psr) {
        let mode = self.mode();
        if mode.has_spsr() {
            self.spsr[mode.bank()] = psr;
        }
    }

    /* Registers of the User bank, regardless of the current mode (LDM/STM with ^) */
    pub fn user_reg(&self, n: usize) -> u32 {
        let mode = self.mode();
        match n {
            8..=12 if mode == Mode::Fiq => self.user_hi[n - 8],
            13 if mode.has_spsr() => self.sp[0],
            14 if mode.has_spsr() => self.lr[0],
            _ => self.r[n],
        }
    }

    pub fn set_user_reg(&mut self, n: usize, value: u32) {
        let mode = self.mode();
        match n {
            8..=12 if mode == Mode::Fiq => self.user_hi[n - 8] = value,
            13 if mode.has_spsr() => self.sp[0] = value,
            14 if mode.has_spsr() => self.lr[0] = value,
            _ => self.r[n] = value,
        }
    }

    /*
     * Snapshot of the banked registers of any mode.
     */
    pub fn register_file(&self, mode: Mode) -> Bank {
        let current = self.mode();
        let mut r8_r12 = [0u32; 5];
        let hi_live = (mode == Mode::Fiq) == (current == Mode::Fiq);
        if hi_live {
            r8_r12.copy_from_slice(&self.r[8..13]);
        } else if mode == Mode::Fiq {
            r8_r12 = self.fiq_hi;
        } else {
            r8_r12 = self.user_hi;
        }

        let (sp, lr) = if mode.bank() == current.bank() {
            (self.r[13], self.r[14])
        } else {
            (self.sp[mode.bank()], self.lr[mode.bank()])
        };

        Bank {
            r8_r12: r8_r12,
            sp: sp,
            lr: lr,
            spsr: if mode.has_spsr() { Some(self.spsr[mode.bank()]) } else { None },
        }
    }
}

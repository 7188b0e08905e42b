pub mod alu;
pub mod arm;
pub mod condition;
pub mod registers;
pub mod thumb;

pub use alu::ShiftType;
pub use arm::{AluOp, ArmInstr, ArmOp, HalfKind};
pub use condition::Condition;
pub use registers::{Bank, Mode, Psr, Registers};
pub use thumb::{ThumbInstr, ThumbOp};

use super::BackupController;
use crate::config;
use crate::mem::ioregs::{IE, IF, IME};
use crate::state::State;
use crate::utils::Bits;

/* Stack pointers the BIOS leaves behind */
pub const SP_SVC: u32 = 0x0300_7FE0;
pub const SP_IRQ: u32 = 0x0300_7FA0;
pub const SP_SYS: u32 = 0x0300_7F00;
pub const ROM_ENTRY: u32 = 0x0800_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    Undefined,
    SoftwareInterrupt,
    Irq,
}

impl Exception {
    pub fn vector(self) -> u32 {
        match self {
            Exception::Undefined => 0x04,
            Exception::SoftwareInterrupt => 0x08,
            Exception::Irq => 0x18,
        }
    }

    pub fn mode(self) -> Mode {
        match self {
            Exception::Undefined => Mode::Undefined,
            Exception::SoftwareInterrupt => Mode::Supervisor,
            Exception::Irq => Mode::Irq,
        }
    }
}

/*
 * ARM7TDMI core. Instructions are decoded through two tables built once in new(),
 * one per instruction set, selected by the T bit.
 */
pub struct CPU {
    pub regs: Registers,
    halted: bool,
    arm_table: Box<[ArmOp]>,
    thumb_table: Box<[ThumbOp]>,
}

impl CPU {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            halted: false,
            arm_table: arm::build_table(),
            thumb_table: thumb::build_table(),
        }
    }

    /*
     * Register state after the BIOS boot sequence, entering the cartridge directly.
     */
    pub fn skip_bios(&mut self) {
        self.regs.enter_mode(Mode::Supervisor);
        self.regs.r[13] = SP_SVC;
        self.regs.enter_mode(Mode::Irq);
        self.regs.r[13] = SP_IRQ;
        self.regs.enter_mode(Mode::System);
        self.regs.r[13] = SP_SYS;
        self.regs.set_flag(Psr::I, false);
        self.regs.set_flag(Psr::F, false);
        self.regs.set_flag(Psr::T, false);
        self.regs.set_pc(ROM_ENTRY);
    }

    pub fn halted(&self) -> bool { self.halted }

    /*
     * Executes one instruction and returns its cycle count.
     * R15 is moved past the instruction before it executes.
     */
    pub fn step<B: BackupController>(&mut self, state: &mut State<B>) -> u64 {
        if self.halted {
            return 1;
        }

        let pc = self.regs.pc();
        let cycles = if self.regs.thumb() {
            let instr = ThumbInstr(state.read16(pc));
            self.regs.r[15] = pc.wrapping_add(2);
            let op = self.thumb_table[instr.key()];
            if config::trace_cpu() {
                log::trace!("{:08X}: {:04X}     {:?}", pc, instr.0, op);
            }
            self.execute_thumb(state, instr, op)
        } else {
            let instr = ArmInstr(state.read32(pc));
            self.regs.r[15] = pc.wrapping_add(4);
            let op = self.arm_table[instr.key()];
            if config::trace_cpu() {
                log::trace!("{:08X}: {:08X} {:?}", pc, instr.0, op);
            }
            if instr.condition().holds(self.regs.cpsr()) {
                self.execute_arm(state, instr, op)
            } else {
                1
            }
        };

        if state.take_halt() {
            self.halted = true;
        }
        cycles
    }

    /*
     * Wakes the core on any enabled pending interrupt, and takes the IRQ exception
     * when IME is set and the CPSR does not mask it.
     */
    pub fn interrupts<B: BackupController>(&mut self, state: &mut State<B>) -> u64 {
        let pending = state.mmu.io16(IE) & state.mmu.io16(IF) & 0x3FFF;
        if pending == 0 {
            return 0;
        }
        self.halted = false;

        if !state.mmu.read_bit(IME, 0) || self.regs.flag(Psr::I) {
            return 0;
        }
        self.exception(Exception::Irq)
    }

    /*
     * Common entry for every exception: bank switch, CPSR saved into the new SPSR, return address in LR.
     */
    pub fn exception(&mut self, kind: Exception) -> u64 {
        let cpsr = self.regs.cpsr();
        let next = self.regs.pc();
        let ret = match kind {
            Exception::Irq => next.wrapping_add(4),
            Exception::Undefined | Exception::SoftwareInterrupt => next,
        };

        self.regs.enter_mode(kind.mode());
        self.regs.set_spsr(cpsr);
        self.regs.r[14] = ret;
        self.regs.set_flag(Psr::T, false);
        self.regs.set_flag(Psr::I, true);
        self.regs.set_pc(kind.vector());
        3
    }

    /* Register as an operand. PC reads two instructions ahead of the one executing. */
    fn operand(&self, n: usize) -> u32 {
        if n == 15 {
            let width = if self.regs.thumb() { 2 } else { 4 };
            self.regs.r[15].wrapping_add(width)
        } else {
            self.regs.r[n]
        }
    }

    fn write_reg(&mut self, n: usize, value: u32) {
        if n == 15 {
            self.regs.set_pc(value);
        } else {
            self.regs.r[n] = value;
        }
    }

    fn set_nz(&mut self, value: u32) {
        self.regs.set_flag(Psr::N, value.bit(31));
        self.regs.set_flag(Psr::Z, value == 0);
    }

    fn set_arith(&mut self, value: u32, carry: bool, overflow: bool) {
        self.set_nz(value);
        self.regs.set_flag(Psr::C, carry);
        self.regs.set_flag(Psr::V, overflow);
    }

    /* Misaligned word loads rotate the aligned word */
    fn read_rotated<B: BackupController>(state: &mut State<B>, addr: u32) -> u32 {
        state.read32(addr & !3).rotate_right(8 * (addr & 3))
    }

    fn read_half<B: BackupController>(state: &mut State<B>, addr: u32, kind: HalfKind) -> u32 {
        match kind {
            HalfKind::Unsigned16 => (state.read16(addr & !1) as u32).rotate_right(8 * (addr & 1)),
            HalfKind::Signed8 => state.read8(addr) as i8 as i32 as u32,
            // Odd address loads the single byte, sign extended
            HalfKind::Signed16 if addr & 1 != 0 => state.read8(addr) as i8 as i32 as u32,
            HalfKind::Signed16 => state.read16(addr) as i16 as i32 as u32,
        }
    }
}

use super::*;

/*
 * View over one fetched 32-bit instruction.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmInstr(pub u32);

impl ArmInstr {
    pub fn condition(&self) -> Condition { Condition::from_bits(self.0 >> 28) }

    /* Bits 27-20 and 7-4, index into the dispatch table */
    pub fn key(&self) -> usize { (((self.0 >> 16) & 0xFF0) | ((self.0 >> 4) & 0xF)) as usize }

    pub fn rn(&self) -> usize { self.0.bits(16, 4) as usize }
    pub fn rd(&self) -> usize { self.0.bits(12, 4) as usize }
    pub fn rs(&self) -> usize { self.0.bits(8, 4) as usize }
    pub fn rm(&self) -> usize { self.0.bits(0, 4) as usize }

    pub fn shift_type(&self) -> ShiftType { ShiftType::from_bits(self.0 >> 5) }
    pub fn shift_amount(&self) -> u32 { self.0.bits(7, 5) }
    /* Shift amount comes from Rs */
    pub fn register_shift(&self) -> bool { self.0.bit(4) }

    pub fn imm8(&self) -> u32 { self.0 & 0xFF }
    pub fn rotate(&self) -> u32 { self.0.bits(8, 4) }
    pub fn offset12(&self) -> u32 { self.0 & 0xFFF }
    /* Split immediate of halfword transfers */
    pub fn offset8(&self) -> u32 { (self.0.bits(8, 4) << 4) | (self.0 & 0xF) }
    pub fn register_list(&self) -> u32 { self.0 & 0xFFFF }
    /* PSR fields written by MSR: flags, status, extension, control */
    pub fn field_mask(&self) -> u32 { self.0.bits(16, 4) }

    /* Signed word offset of B/BL, in bytes */
    pub fn branch_offset(&self) -> u32 { (((self.0 << 8) as i32) >> 6) as u32 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    And, Eor, Sub, Rsb, Add, Adc, Sbc, Rsc,
    Tst, Teq, Cmp, Cmn, Orr, Mov, Bic, Mvn,
}

impl AluOp {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => AluOp::And,
            0x1 => AluOp::Eor,
            0x2 => AluOp::Sub,
            0x3 => AluOp::Rsb,
            0x4 => AluOp::Add,
            0x5 => AluOp::Adc,
            0x6 => AluOp::Sbc,
            0x7 => AluOp::Rsc,
            0x8 => AluOp::Tst,
            0x9 => AluOp::Teq,
            0xA => AluOp::Cmp,
            0xB => AluOp::Cmn,
            0xC => AluOp::Orr,
            0xD => AluOp::Mov,
            0xE => AluOp::Bic,
            _ => AluOp::Mvn,
        }
    }

    /* Only sets flags, no destination */
    pub fn is_test(&self) -> bool {
        matches!(self, AluOp::Tst | AluOp::Teq | AluOp::Cmp | AluOp::Cmn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfKind {
    Unsigned16,
    Signed8,
    Signed16,
}

/*
 * Instruction classes, with the flags that can already be told from the table key.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOp {
    BranchExchange,
    Branch { link: bool },
    SoftwareInterrupt,
    Multiply { accumulate: bool, set_flags: bool },
    MultiplyLong { signed: bool, accumulate: bool, set_flags: bool },
    SingleDataSwap { byte: bool },
    HalfwordTransfer { kind: HalfKind, load: bool, pre: bool, up: bool, immediate: bool, writeback: bool },
    StatusRead { spsr: bool },
    StatusWrite { spsr: bool, immediate: bool },
    DataProcessing { op: AluOp, set_flags: bool, immediate: bool },
    SingleDataTransfer { load: bool, byte: bool, pre: bool, up: bool, writeback: bool, register_offset: bool },
    BlockDataTransfer { load: bool, pre: bool, up: bool, writeback: bool, user_bank: bool },
    Coprocessor,
    Undefined,
}

/*
 * Maps a 12-bit key (instruction bits 27-20 and 7-4) to its class.
 * Every key gets a class, the leftovers are Undefined.
 */
pub fn classify(key: usize) -> ArmOp {
    let hi = (key >> 4) as u32 & 0xFF;
    let lo = key as u32 & 0xF;
    let (p, u, b, w, l) = (hi.bit(4), hi.bit(3), hi.bit(2), hi.bit(1), hi.bit(0));

    match (hi >> 5, hi, lo) {
        (0b000, 0x12, 0x1) => ArmOp::BranchExchange,
        (0b000, 0x00..=0x03, 0x9) => ArmOp::Multiply { accumulate: w, set_flags: l },
        (0b000, 0x08..=0x0F, 0x9) => ArmOp::MultiplyLong { signed: b, accumulate: w, set_flags: l },
        (0b000, 0x10, 0x9) | (0b000, 0x14, 0x9) => ArmOp::SingleDataSwap { byte: b },
        (0b000, _, 0x9) => ArmOp::Undefined,
        (0b000, _, 0xB) | (0b000, _, 0xD) | (0b000, _, 0xF) => {
            let kind = match lo {
                0xB => HalfKind::Unsigned16,
                0xD => HalfKind::Signed8,
                _ => HalfKind::Signed16,
            };
            if !l && kind != HalfKind::Unsigned16 {
                return ArmOp::Undefined;
            }
            ArmOp::HalfwordTransfer { kind: kind, load: l, pre: p, up: u, immediate: b, writeback: w || !p }
        }
        (0b000, 0x10, 0x0) | (0b000, 0x14, 0x0) => ArmOp::StatusRead { spsr: b },
        (0b000, 0x12, 0x0) | (0b000, 0x16, 0x0) => ArmOp::StatusWrite { spsr: b, immediate: false },
        (0b001, 0x32, _) | (0b001, 0x36, _) => ArmOp::StatusWrite { spsr: b, immediate: true },
        // Test opcodes without S are the PSR space
        (0b000, 0x10, _) | (0b000, 0x12, _) | (0b000, 0x14, _) | (0b000, 0x16, _) => ArmOp::Undefined,
        (0b001, 0x30, _) | (0b001, 0x34, _) => ArmOp::Undefined,
        (0b000, _, _) | (0b001, _, _) => ArmOp::DataProcessing {
            op: AluOp::from_bits(hi >> 1),
            set_flags: l,
            immediate: hi.bit(5),
        },
        (0b011, _, _) if lo.bit(0) => ArmOp::Undefined,
        (0b010, _, _) | (0b011, _, _) => ArmOp::SingleDataTransfer {
            load: l, byte: b, pre: p, up: u,
            writeback: w || !p,
            register_offset: hi.bit(5),
        },
        (0b100, _, _) => ArmOp::BlockDataTransfer { load: l, pre: p, up: u, writeback: w, user_bank: b },
        (0b101, _, _) => ArmOp::Branch { link: p },
        (0b110, _, _) => ArmOp::Coprocessor,
        (0b111, _, _) if !hi.bit(4) => ArmOp::Coprocessor,
        (0b111, _, _) => ArmOp::SoftwareInterrupt,
        _ => ArmOp::Undefined,
    }
}

pub fn build_table() -> Box<[ArmOp]> {
    (0..ARM_TABLE_SIZE).map(classify).collect::<Vec<_>>().into_boxed_slice()
}

pub const ARM_TABLE_SIZE: usize = 1 << 12;

impl CPU {
    pub(super) fn execute_arm<B: BackupController>(&mut self, state: &mut State<B>, instr: ArmInstr, op: ArmOp) -> u64 {
        match op {
            ArmOp::BranchExchange => self.arm_bx(instr),
            ArmOp::Branch { link } => self.arm_branch(instr, link),
            ArmOp::SoftwareInterrupt => self.exception(Exception::SoftwareInterrupt),
            ArmOp::Multiply { accumulate, set_flags } => self.arm_multiply(instr, accumulate, set_flags),
            ArmOp::MultiplyLong { signed, accumulate, set_flags } =>
                self.arm_multiply_long(instr, signed, accumulate, set_flags),
            ArmOp::SingleDataSwap { byte } => self.arm_swap(state, instr, byte),
            ArmOp::HalfwordTransfer { kind, load, pre, up, immediate, writeback } =>
                self.arm_halfword(state, instr, kind, load, pre, up, immediate, writeback),
            ArmOp::StatusRead { spsr } => self.arm_mrs(instr, spsr),
            ArmOp::StatusWrite { spsr, immediate } => self.arm_msr(instr, spsr, immediate),
            ArmOp::DataProcessing { op, set_flags, immediate } => self.arm_alu(instr, op, set_flags, immediate),
            ArmOp::SingleDataTransfer { load, byte, pre, up, writeback, register_offset } =>
                self.arm_single_transfer(state, instr, load, byte, pre, up, writeback, register_offset),
            ArmOp::BlockDataTransfer { load, pre, up, writeback, user_bank } =>
                self.arm_block_transfer(state, instr, load, pre, up, writeback, user_bank),
            ArmOp::Coprocessor | ArmOp::Undefined => {
                log::warn!("Undefined instruction 0x{:08X} at 0x{:08X}", instr.0, self.regs.pc().wrapping_sub(4));
                self.exception(Exception::Undefined)
            }
        }
    }

    fn arm_bx(&mut self, instr: ArmInstr) -> u64 {
        let target = self.operand(instr.rm());
        self.regs.set_flag(Psr::T, target & 1 != 0);
        self.regs.set_pc(target);
        3
    }

    fn arm_branch(&mut self, instr: ArmInstr, link: bool) -> u64 {
        if link {
            self.regs.r[14] = self.regs.pc();
        }
        let target = self.operand(15).wrapping_add(instr.branch_offset());
        self.regs.set_pc(target);
        3
    }

    /* Second operand and the shifter carry out */
    fn shifter_operand(&self, instr: ArmInstr, immediate: bool) -> (u32, bool) {
        let carry = self.regs.flag(Psr::C);
        if immediate {
            return alu::rotated_imm(instr.imm8(), instr.rotate(), carry);
        }
        if instr.register_shift() {
            // PC reads one word further when the shift takes an extra cycle
            let rm = self.operand(instr.rm()).wrapping_add(if instr.rm() == 15 { 4 } else { 0 });
            let amount = self.regs.r[instr.rs()] & 0xFF;
            alu::shift_reg(instr.shift_type(), rm, amount, carry)
        } else {
            alu::shift_imm(instr.shift_type(), self.operand(instr.rm()), instr.shift_amount(), carry)
        }
    }

    fn arm_alu(&mut self, instr: ArmInstr, op: AluOp, set_flags: bool, immediate: bool) -> u64 {
        let (op2, shifter_carry) = self.shifter_operand(instr, immediate);
        let register_shift = !immediate && instr.register_shift();
        let op1 = self.operand(instr.rn()).wrapping_add(if register_shift && instr.rn() == 15 { 4 } else { 0 });
        let carry = self.regs.flag(Psr::C);

        let (result, arith) = match op {
            AluOp::And | AluOp::Tst => (op1 & op2, None),
            AluOp::Eor | AluOp::Teq => (op1 ^ op2, None),
            AluOp::Orr => (op1 | op2, None),
            AluOp::Mov => (op2, None),
            AluOp::Bic => (op1 & !op2, None),
            AluOp::Mvn => (!op2, None),
            AluOp::Sub | AluOp::Cmp => { let (r, c, v) = alu::sub(op1, op2, true); (r, Some((c, v))) }
            AluOp::Rsb => { let (r, c, v) = alu::sub(op2, op1, true); (r, Some((c, v))) }
            AluOp::Add | AluOp::Cmn => { let (r, c, v) = alu::add(op1, op2, false); (r, Some((c, v))) }
            AluOp::Adc => { let (r, c, v) = alu::add(op1, op2, carry); (r, Some((c, v))) }
            AluOp::Sbc => { let (r, c, v) = alu::sub(op1, op2, carry); (r, Some((c, v))) }
            AluOp::Rsc => { let (r, c, v) = alu::sub(op2, op1, carry); (r, Some((c, v))) }
        };

        let rd = instr.rd();
        if set_flags && rd == 15 && !op.is_test() {
            // Exception return, status comes back from SPSR
            let spsr = self.regs.spsr();
            self.regs.set_cpsr(spsr);
        } else if set_flags {
            self.set_nz(result);
            match arith {
                Some((c, v)) => {
                    self.regs.set_flag(Psr::C, c);
                    self.regs.set_flag(Psr::V, v);
                }
                None => self.regs.set_flag(Psr::C, shifter_carry),
            }
        }

        if !op.is_test() {
            self.write_reg(rd, result);
        }

        let mut cycles = 1;
        if register_shift { cycles += 1; }
        if rd == 15 && !op.is_test() { cycles += 2; }
        cycles
    }

    fn arm_multiply(&mut self, instr: ArmInstr, accumulate: bool, set_flags: bool) -> u64 {
        // Rd and Rn swap places compared to data processing
        let rd = instr.rn();
        let mut result = self.regs.r[instr.rm()].wrapping_mul(self.regs.r[instr.rs()]);
        if accumulate {
            result = result.wrapping_add(self.regs.r[instr.rd()]);
        }
        self.write_reg(rd, result);
        if set_flags {
            self.set_nz(result);
        }
        if accumulate { 3 } else { 2 }
    }

    fn arm_multiply_long(&mut self, instr: ArmInstr, signed: bool, accumulate: bool, set_flags: bool) -> u64 {
        let (rd_hi, rd_lo) = (instr.rn(), instr.rd());
        let rm = self.regs.r[instr.rm()];
        let rs = self.regs.r[instr.rs()];
        let mut result = if signed {
            ((rm as i32 as i64) * (rs as i32 as i64)) as u64
        } else {
            rm as u64 * rs as u64
        };
        if accumulate {
            let acc = ((self.regs.r[rd_hi] as u64) << 32) | self.regs.r[rd_lo] as u64;
            result = result.wrapping_add(acc);
        }
        self.write_reg(rd_lo, result as u32);
        self.write_reg(rd_hi, (result >> 32) as u32);
        if set_flags {
            self.regs.set_flag(Psr::N, result >> 63 != 0);
            self.regs.set_flag(Psr::Z, result == 0);
        }
        if accumulate { 4 } else { 3 }
    }

    fn arm_swap<B: BackupController>(&mut self, state: &mut State<B>, instr: ArmInstr, byte: bool) -> u64 {
        let addr = self.regs.r[instr.rn()];
        let source = self.regs.r[instr.rm()];
        let old = if byte {
            let old = state.read8(addr) as u32;
            state.write8(addr, source as u8);
            old
        } else {
            let old = CPU::read_rotated(state, addr);
            state.write32(addr & !3, source);
            old
        };
        self.write_reg(instr.rd(), old);
        4
    }

    fn arm_mrs(&mut self, instr: ArmInstr, spsr: bool) -> u64 {
        let psr = if spsr { self.regs.spsr() } else { self.regs.cpsr() };
        self.write_reg(instr.rd(), psr.bits());
        1
    }

    fn arm_msr(&mut self, instr: ArmInstr, spsr: bool, immediate: bool) -> u64 {
        let value = if immediate {
            instr.imm8().rotate_right(instr.rotate() * 2)
        } else {
            self.regs.r[instr.rm()]
        };

        let fields = instr.field_mask();
        let mut mask = 0u32;
        for i in 0..4 {
            if fields.bit(i) {
                mask |= 0xFF << (8 * i);
            }
        }

        if spsr {
            let old = self.regs.spsr().bits();
            self.regs.set_spsr(Psr::from_bits_truncate((old & !mask) | (value & mask)));
        } else {
            // User mode may only touch the condition flags, nobody may flip the state bit
            if !self.regs.mode().privileged() {
                mask &= 0xFF00_0000;
            }
            mask &= !Psr::T.bits();
            let old = self.regs.cpsr().bits();
            self.regs.set_cpsr(Psr::from_bits_truncate((old & !mask) | (value & mask)));
        }
        1
    }

    #[allow(clippy::too_many_arguments)]
    fn arm_single_transfer<B: BackupController>(&mut self, state: &mut State<B>, instr: ArmInstr,
                                                load: bool, byte: bool, pre: bool, up: bool,
                                                writeback: bool, register_offset: bool) -> u64 {
        let (rn, rd) = (instr.rn(), instr.rd());
        let base = self.operand(rn);
        let offset = if register_offset {
            let carry = self.regs.flag(Psr::C);
            alu::shift_imm(instr.shift_type(), self.regs.r[instr.rm()], instr.shift_amount(), carry).0
        } else {
            instr.offset12()
        };
        let target = if up { base.wrapping_add(offset) } else { base.wrapping_sub(offset) };
        let addr = if pre { target } else { base };

        if load {
            let value = if byte { state.read8(addr) as u32 } else { CPU::read_rotated(state, addr) };
            // Loaded value wins over the written back base
            if writeback {
                self.write_reg(rn, target);
            }
            self.write_reg(rd, value);
            if rd == 15 { 5 } else { 3 }
        } else {
            // Stored PC is one word further than the operand value
            let value = self.operand(rd).wrapping_add(if rd == 15 { 4 } else { 0 });
            if byte {
                state.write8(addr, value as u8);
            } else {
                state.write32(addr & !3, value);
            }
            if writeback {
                self.write_reg(rn, target);
            }
            2
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn arm_halfword<B: BackupController>(&mut self, state: &mut State<B>, instr: ArmInstr, kind: HalfKind,
                                         load: bool, pre: bool, up: bool, immediate: bool,
                                         writeback: bool) -> u64 {
        let (rn, rd) = (instr.rn(), instr.rd());
        let base = self.operand(rn);
        let offset = if immediate { instr.offset8() } else { self.regs.r[instr.rm()] };
        let target = if up { base.wrapping_add(offset) } else { base.wrapping_sub(offset) };
        let addr = if pre { target } else { base };

        if load {
            let value = CPU::read_half(state, addr, kind);
            if writeback {
                self.write_reg(rn, target);
            }
            self.write_reg(rd, value);
            3
        } else {
            let value = self.operand(rd).wrapping_add(if rd == 15 { 4 } else { 0 });
            state.write16(addr & !1, value as u16);
            if writeback {
                self.write_reg(rn, target);
            }
            2
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn arm_block_transfer<B: BackupController>(&mut self, state: &mut State<B>, instr: ArmInstr,
                                               load: bool, pre: bool, up: bool, writeback: bool,
                                               user_bank: bool) -> u64 {
        let rn = instr.rn();
        let list = instr.register_list();
        let base = self.regs.r[rn];

        // An empty list moves PC alone but steps the base as if all 16 registers were moved
        let regs: Vec<usize> = if list == 0 { vec![15] } else { (0..16).filter(|i| list.bit(*i as u32)).collect() };
        let span = if list == 0 { 0x40 } else { 4 * regs.len() as u32 };

        let final_base = if up { base.wrapping_add(span) } else { base.wrapping_sub(span) };
        // Registers always go lowest first to the lowest address
        let mut addr = match (pre, up) {
            (false, true) => base,
            (true, true) => base.wrapping_add(4),
            (false, false) => base.wrapping_sub(span).wrapping_add(4),
            (true, false) => base.wrapping_sub(span),
        };

        let pc_in_list = list.bit(15) || list == 0;
        // S bit with PC in an LDM means exception return, otherwise the User bank is transferred
        let user = user_bank && !(load && pc_in_list);

        if load {
            if writeback && !list.bit(rn as u32) {
                self.regs.r[rn] = final_base;
            }
            for reg in regs.iter() {
                let value = state.read32(addr & !3);
                if user {
                    self.regs.set_user_reg(*reg, value);
                } else if *reg == 15 {
                    if user_bank {
                        let spsr = self.regs.spsr();
                        self.regs.set_cpsr(spsr);
                    }
                    self.regs.set_pc(value);
                } else {
                    self.regs.r[*reg] = value;
                }
                addr = addr.wrapping_add(4);
            }
            regs.len() as u64 + 2 + if pc_in_list { 2 } else { 0 }
        } else {
            for (i, reg) in regs.iter().enumerate() {
                let value = match *reg {
                    15 => self.operand(15).wrapping_add(4),
                    // Base stored after the first transfer already sees the written back value
                    r if r == rn && i > 0 && writeback => final_base,
                    r if user => self.regs.user_reg(r),
                    r => self.regs.r[r],
                };
                state.write32(addr & !3, value);
                addr = addr.wrapping_add(4);
            }
            if writeback {
                self.regs.r[rn] = final_base;
            }
            regs.len() as u64 + 1
        }
    }
}

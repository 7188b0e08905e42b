use super::*;

/*
 * View over one fetched 16-bit instruction.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbInstr(pub u16);

impl ThumbInstr {
    /* Top byte, index into the dispatch table */
    pub fn key(&self) -> usize { (self.0 >> 8) as usize }

    fn word(&self) -> u32 { self.0 as u32 }

    pub fn rd(&self) -> usize { self.word().bits(0, 3) as usize }
    pub fn rs(&self) -> usize { self.word().bits(3, 3) as usize }
    /* Offset register, or the third operand of add/subtract */
    pub fn ro(&self) -> usize { self.word().bits(6, 3) as usize }
    /* Register held in bits 10-8 */
    pub fn rb_hi(&self) -> usize { self.word().bits(8, 3) as usize }

    pub fn offset5(&self) -> u32 { self.word().bits(6, 5) }
    pub fn imm8(&self) -> u32 { self.word() & 0xFF }
    pub fn offset11(&self) -> u32 { self.word() & 0x7FF }
    pub fn alu_op(&self) -> u32 { self.word().bits(6, 4) }
    pub fn register_list(&self) -> u32 { self.word() & 0xFF }

    pub fn h1(&self) -> bool { self.word().bit(7) }
    pub fn h2(&self) -> bool { self.word().bit(6) }
}

/* Sign extend the low `bits` of value */
fn sext(value: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    (((value << shift) as i32) >> shift) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbOp {
    MoveShifted { shift: ShiftType },
    AddSub { immediate: bool, sub: bool },
    /* MOV, CMP, ADD, SUB with an 8-bit immediate */
    Immediate { op: u32, rd: usize },
    Alu,
    HiReg { op: u32 },
    PcLoad { rd: usize },
    LoadStoreReg { load: bool, byte: bool },
    LoadStoreSigned { kind: u32 },
    LoadStoreImm { load: bool, byte: bool },
    LoadStoreHalf { load: bool },
    SpLoadStore { load: bool, rd: usize },
    LoadAddress { sp: bool, rd: usize },
    AddSp,
    PushPop { pop: bool, extra: bool },
    MultipleLoadStore { load: bool, rb: usize },
    CondBranch { cond: Condition },
    SoftwareInterrupt,
    Branch,
    LongBranch { high: bool },
    Undefined,
}

/*
 * Maps the top byte of an instruction to its format. Total over all 256 keys.
 */
pub fn classify(key: usize) -> ThumbOp {
    let key = key as u32 & 0xFF;
    let rd = (key & 7) as usize;
    match key {
        0x00..=0x17 => ThumbOp::MoveShifted { shift: ShiftType::from_bits(key >> 3) },
        0x18..=0x1F => ThumbOp::AddSub { immediate: key.bit(2), sub: key.bit(1) },
        0x20..=0x3F => ThumbOp::Immediate { op: key.bits(3, 2), rd: rd },
        0x40..=0x43 => ThumbOp::Alu,
        0x44..=0x47 => ThumbOp::HiReg { op: key & 3 },
        0x48..=0x4F => ThumbOp::PcLoad { rd: rd },
        0x50..=0x5F if key.bit(1) => ThumbOp::LoadStoreSigned { kind: key.bits(2, 2) },
        0x50..=0x5F => ThumbOp::LoadStoreReg { load: key.bit(3), byte: key.bit(2) },
        0x60..=0x7F => ThumbOp::LoadStoreImm { load: key.bit(3), byte: key.bit(4) },
        0x80..=0x8F => ThumbOp::LoadStoreHalf { load: key.bit(3) },
        0x90..=0x9F => ThumbOp::SpLoadStore { load: key.bit(3), rd: rd },
        0xA0..=0xAF => ThumbOp::LoadAddress { sp: key.bit(3), rd: rd },
        0xB0 => ThumbOp::AddSp,
        0xB4 | 0xB5 | 0xBC | 0xBD => ThumbOp::PushPop { pop: key.bit(3), extra: key.bit(0) },
        0xC0..=0xCF => ThumbOp::MultipleLoadStore { load: key.bit(3), rb: rd },
        0xDF => ThumbOp::SoftwareInterrupt,
        0xD0..=0xDD => ThumbOp::CondBranch { cond: Condition::from_bits(key) },
        0xE0..=0xE7 => ThumbOp::Branch,
        0xF0..=0xFF => ThumbOp::LongBranch { high: key.bit(3) },
        _ => ThumbOp::Undefined,
    }
}

pub const THUMB_TABLE_SIZE: usize = 1 << 8;

pub fn build_table() -> Box<[ThumbOp]> {
    (0..THUMB_TABLE_SIZE).map(classify).collect::<Vec<_>>().into_boxed_slice()
}

impl CPU {
    pub(super) fn execute_thumb<B: BackupController>(&mut self, state: &mut State<B>, instr: ThumbInstr, op: ThumbOp) -> u64 {
        match op {
            ThumbOp::MoveShifted { shift } => {
                let carry = self.regs.flag(Psr::C);
                let (result, carry) = alu::shift_imm(shift, self.regs.r[instr.rs()], instr.offset5(), carry);
                self.regs.r[instr.rd()] = result;
                self.set_nz(result);
                self.regs.set_flag(Psr::C, carry);
                1
            }
            ThumbOp::AddSub { immediate, sub } => {
                let a = self.regs.r[instr.rs()];
                let b = if immediate { instr.ro() as u32 } else { self.regs.r[instr.ro()] };
                let (result, c, v) = if sub { alu::sub(a, b, true) } else { alu::add(a, b, false) };
                self.regs.r[instr.rd()] = result;
                self.set_arith(result, c, v);
                1
            }
            ThumbOp::Immediate { op, rd } => self.thumb_immediate(instr, op, rd),
            ThumbOp::Alu => self.thumb_alu(instr),
            ThumbOp::HiReg { op } => self.thumb_hireg(instr, op),
            ThumbOp::PcLoad { rd } => {
                let addr = (self.operand(15) & !3).wrapping_add(instr.imm8() << 2);
                self.regs.r[rd] = state.read32(addr);
                3
            }
            ThumbOp::LoadStoreReg { load, byte } => {
                let addr = self.regs.r[instr.rs()].wrapping_add(self.regs.r[instr.ro()]);
                self.thumb_transfer(state, instr.rd(), addr, load, byte)
            }
            ThumbOp::LoadStoreSigned { kind } => {
                let addr = self.regs.r[instr.rs()].wrapping_add(self.regs.r[instr.ro()]);
                let rd = instr.rd();
                match kind {
                    // STRH
                    0 => {
                        state.write16(addr & !1, self.regs.r[rd] as u16);
                        2
                    }
                    1 => { self.regs.r[rd] = CPU::read_half(state, addr, HalfKind::Signed8); 3 }
                    2 => { self.regs.r[rd] = CPU::read_half(state, addr, HalfKind::Unsigned16); 3 }
                    _ => { self.regs.r[rd] = CPU::read_half(state, addr, HalfKind::Signed16); 3 }
                }
            }
            ThumbOp::LoadStoreImm { load, byte } => {
                let offset = if byte { instr.offset5() } else { instr.offset5() << 2 };
                let addr = self.regs.r[instr.rs()].wrapping_add(offset);
                self.thumb_transfer(state, instr.rd(), addr, load, byte)
            }
            ThumbOp::LoadStoreHalf { load } => {
                let addr = self.regs.r[instr.rs()].wrapping_add(instr.offset5() << 1);
                if load {
                    self.regs.r[instr.rd()] = CPU::read_half(state, addr, HalfKind::Unsigned16);
                    3
                } else {
                    state.write16(addr & !1, self.regs.r[instr.rd()] as u16);
                    2
                }
            }
            ThumbOp::SpLoadStore { load, rd } => {
                let addr = self.regs.r[13].wrapping_add(instr.imm8() << 2);
                self.thumb_transfer(state, rd, addr, load, false)
            }
            ThumbOp::LoadAddress { sp, rd } => {
                let base = if sp { self.regs.r[13] } else { self.operand(15) & !3 };
                self.regs.r[rd] = base.wrapping_add(instr.imm8() << 2);
                1
            }
            ThumbOp::AddSp => {
                let offset = (instr.word() & 0x7F) << 2;
                self.regs.r[13] = if instr.word().bit(7) {
                    self.regs.r[13].wrapping_sub(offset)
                } else {
                    self.regs.r[13].wrapping_add(offset)
                };
                1
            }
            ThumbOp::PushPop { pop, extra } => self.thumb_push_pop(state, instr, pop, extra),
            ThumbOp::MultipleLoadStore { load, rb } => self.thumb_multiple(state, instr, load, rb),
            ThumbOp::CondBranch { cond } => {
                if !cond.holds(self.regs.cpsr()) {
                    return 1;
                }
                let target = self.operand(15).wrapping_add(sext(instr.imm8(), 8) << 1);
                self.regs.set_pc(target);
                3
            }
            ThumbOp::SoftwareInterrupt => self.exception(Exception::SoftwareInterrupt),
            ThumbOp::Branch => {
                let target = self.operand(15).wrapping_add(sext(instr.offset11(), 11) << 1);
                self.regs.set_pc(target);
                3
            }
            ThumbOp::LongBranch { high } => {
                if !high {
                    self.regs.r[14] = self.operand(15).wrapping_add(sext(instr.offset11(), 11) << 12);
                    1
                } else {
                    let next = self.regs.pc();
                    let target = self.regs.r[14].wrapping_add(instr.offset11() << 1);
                    self.regs.r[14] = next | 1;
                    self.regs.set_pc(target);
                    3
                }
            }
            ThumbOp::Undefined => {
                log::warn!("Undefined instruction 0x{:04X} at 0x{:08X}", instr.0, self.regs.pc().wrapping_sub(2));
                self.exception(Exception::Undefined)
            }
        }
    }

    fn thumb_immediate(&mut self, instr: ThumbInstr, op: u32, rd: usize) -> u64 {
        let a = self.regs.r[rd];
        let imm = instr.imm8();
        match op {
            // MOV
            0 => {
                self.regs.r[rd] = imm;
                self.set_nz(imm);
            }
            // CMP
            1 => {
                let (result, c, v) = alu::sub(a, imm, true);
                self.set_arith(result, c, v);
            }
            // ADD
            2 => {
                let (result, c, v) = alu::add(a, imm, false);
                self.regs.r[rd] = result;
                self.set_arith(result, c, v);
            }
            // SUB
            _ => {
                let (result, c, v) = alu::sub(a, imm, true);
                self.regs.r[rd] = result;
                self.set_arith(result, c, v);
            }
        }
        1
    }

    fn thumb_alu(&mut self, instr: ThumbInstr) -> u64 {
        let (rd, rs) = (instr.rd(), instr.rs());
        let a = self.regs.r[rd];
        let b = self.regs.r[rs];
        let carry = self.regs.flag(Psr::C);

        let shift = |cpu: &mut CPU, kind: ShiftType| {
            let (result, c) = alu::shift_reg(kind, a, b & 0xFF, carry);
            cpu.regs.r[rd] = result;
            cpu.set_nz(result);
            cpu.regs.set_flag(Psr::C, c);
            2
        };

        match instr.alu_op() {
            0x0 => { self.regs.r[rd] = a & b; self.set_nz(a & b); 1 }
            0x1 => { self.regs.r[rd] = a ^ b; self.set_nz(a ^ b); 1 }
            0x2 => shift(self, ShiftType::Lsl),
            0x3 => shift(self, ShiftType::Lsr),
            0x4 => shift(self, ShiftType::Asr),
            0x5 => {
                let (result, c, v) = alu::add(a, b, carry);
                self.regs.r[rd] = result;
                self.set_arith(result, c, v);
                1
            }
            0x6 => {
                let (result, c, v) = alu::sub(a, b, carry);
                self.regs.r[rd] = result;
                self.set_arith(result, c, v);
                1
            }
            0x7 => shift(self, ShiftType::Ror),
            0x8 => { self.set_nz(a & b); 1 }
            // NEG
            0x9 => {
                let (result, c, v) = alu::sub(0, b, true);
                self.regs.r[rd] = result;
                self.set_arith(result, c, v);
                1
            }
            0xA => {
                let (result, c, v) = alu::sub(a, b, true);
                self.set_arith(result, c, v);
                1
            }
            0xB => {
                let (result, c, v) = alu::add(a, b, false);
                self.set_arith(result, c, v);
                1
            }
            0xC => { self.regs.r[rd] = a | b; self.set_nz(a | b); 1 }
            0xD => {
                let result = a.wrapping_mul(b);
                self.regs.r[rd] = result;
                self.set_nz(result);
                2
            }
            0xE => { self.regs.r[rd] = a & !b; self.set_nz(a & !b); 1 }
            _ => { self.regs.r[rd] = !b; self.set_nz(!b); 1 }
        }
    }

    /* ADD/CMP/MOV on any register and BX */
    fn thumb_hireg(&mut self, instr: ThumbInstr, op: u32) -> u64 {
        let rd = instr.rd() + if instr.h1() { 8 } else { 0 };
        let rs = instr.rs() + if instr.h2() { 8 } else { 0 };
        let value = self.operand(rs);
        match op {
            0 => {
                let result = self.operand(rd).wrapping_add(value);
                self.write_reg(rd, result);
                if rd == 15 { 3 } else { 1 }
            }
            1 => {
                let (result, c, v) = alu::sub(self.operand(rd), value, true);
                self.set_arith(result, c, v);
                1
            }
            2 => {
                self.write_reg(rd, value);
                if rd == 15 { 3 } else { 1 }
            }
            _ => {
                self.regs.set_flag(Psr::T, value & 1 != 0);
                self.regs.set_pc(value);
                3
            }
        }
    }

    fn thumb_transfer<B: BackupController>(&mut self, state: &mut State<B>, rd: usize, addr: u32,
                                           load: bool, byte: bool) -> u64 {
        match (load, byte) {
            (true, true) => { self.regs.r[rd] = state.read8(addr) as u32; 3 }
            (true, false) => { self.regs.r[rd] = CPU::read_rotated(state, addr); 3 }
            (false, true) => { state.write8(addr, self.regs.r[rd] as u8); 2 }
            (false, false) => { state.write32(addr & !3, self.regs.r[rd]); 2 }
        }
    }

    fn thumb_push_pop<B: BackupController>(&mut self, state: &mut State<B>, instr: ThumbInstr,
                                           pop: bool, extra: bool) -> u64 {
        let list = instr.register_list();
        let mut regs: Vec<usize> = (0..8).filter(|i| list.bit(*i as u32)).collect();
        if extra {
            regs.push(if pop { 15 } else { 14 });
        }
        // Empty list moves PC and steps SP by 0x40
        let (regs, span) = if regs.is_empty() { (vec![15], 0x40) } else { let n = regs.len() as u32; (regs, 4 * n) };

        if pop {
            let mut addr = self.regs.r[13];
            for reg in regs.iter() {
                let value = state.read32(addr & !3);
                if *reg == 15 {
                    // No state change, POP {PC} stays in THUMB
                    self.regs.set_pc(value);
                } else {
                    self.regs.r[*reg] = value;
                }
                addr = addr.wrapping_add(4);
            }
            self.regs.r[13] = self.regs.r[13].wrapping_add(span);
            regs.len() as u64 + 2
        } else {
            let base = self.regs.r[13].wrapping_sub(span);
            let mut addr = base;
            for reg in regs.iter() {
                let value = if *reg == 15 { self.operand(15).wrapping_add(2) } else { self.regs.r[*reg] };
                state.write32(addr & !3, value);
                addr = addr.wrapping_add(4);
            }
            self.regs.r[13] = base;
            regs.len() as u64 + 1
        }
    }

    fn thumb_multiple<B: BackupController>(&mut self, state: &mut State<B>, instr: ThumbInstr,
                                           load: bool, rb: usize) -> u64 {
        let list = instr.register_list();
        let base = self.regs.r[rb];
        let (regs, span): (Vec<usize>, u32) = if list == 0 {
            (vec![15], 0x40)
        } else {
            let regs: Vec<usize> = (0..8).filter(|i| list.bit(*i as u32)).collect();
            let n = regs.len() as u32;
            (regs, 4 * n)
        };
        let final_base = base.wrapping_add(span);
        let mut addr = base;

        if load {
            for reg in regs.iter() {
                let value = state.read32(addr & !3);
                self.write_reg(*reg, value);
                addr = addr.wrapping_add(4);
            }
            if !list.bit(rb as u32) {
                self.regs.r[rb] = final_base;
            }
            regs.len() as u64 + 2
        } else {
            for (i, reg) in regs.iter().enumerate() {
                let value = match *reg {
                    15 => self.operand(15).wrapping_add(2),
                    r if r == rb && i > 0 => final_base,
                    r => self.regs.r[r],
                };
                state.write32(addr & !3, value);
                addr = addr.wrapping_add(4);
            }
            self.regs.r[rb] = final_base;
            regs.len() as u64 + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_total() {
        let table = build_table();
        assert_eq!(table.len(), THUMB_TABLE_SIZE);
        assert_eq!(table[0xDE], ThumbOp::Undefined);
        assert_eq!(table[0xDF], ThumbOp::SoftwareInterrupt);
        assert_eq!(table[0xB1], ThumbOp::Undefined);
        assert_eq!(table[0xE8], ThumbOp::Undefined);
    }

    #[test]
    fn classify_known_encodings() {
        let op = |half: u16| classify(ThumbInstr(half).key());
        // LSL r0, r1, #2
        assert_eq!(op(0x0088), ThumbOp::MoveShifted { shift: ShiftType::Lsl });
        // SUB r0, r1, #1
        assert_eq!(op(0x1E48), ThumbOp::AddSub { immediate: true, sub: true });
        // MOV r3, #0x10
        assert_eq!(op(0x2310), ThumbOp::Immediate { op: 0, rd: 3 });
        // BX lr
        assert_eq!(op(0x4770), ThumbOp::HiReg { op: 3 });
        // LDR r0, [pc, #4]
        assert_eq!(op(0x4801), ThumbOp::PcLoad { rd: 0 });
        // LDSH r0, [r1, r2]
        assert_eq!(op(0x5E88), ThumbOp::LoadStoreSigned { kind: 3 });
        // STRB r0, [r1, #1]
        assert_eq!(op(0x7048), ThumbOp::LoadStoreImm { load: false, byte: true });
        // PUSH {r4, lr} / POP {r4, pc}
        assert_eq!(op(0xB510), ThumbOp::PushPop { pop: false, extra: true });
        assert_eq!(op(0xBD10), ThumbOp::PushPop { pop: true, extra: true });
        // BEQ / BL prefix and suffix
        assert_eq!(op(0xD0FE), ThumbOp::CondBranch { cond: Condition::EQ });
        assert_eq!(op(0xF000), ThumbOp::LongBranch { high: false });
        assert_eq!(op(0xF800), ThumbOp::LongBranch { high: true });
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sext(0xFE, 8), 0xFFFF_FFFE);
        assert_eq!(sext(0x7F, 8), 0x7F);
        assert_eq!(sext(0x400, 11), 0xFFFF_FC00);
    }
}

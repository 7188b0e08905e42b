/*
 * Barrel shifter and adder. Every function returns the carry out next to the result.
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftType {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftType {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => ShiftType::Lsl,
            1 => ShiftType::Lsr,
            2 => ShiftType::Asr,
            _ => ShiftType::Ror,
        }
    }
}

/*
 * Shift amount taken from a register (low byte). Amount 0 leaves value and carry alone.
 */
pub fn shift_reg(kind: ShiftType, value: u32, amount: u32, carry: bool) -> (u32, bool) {
    let amount = amount & 0xFF;
    if amount == 0 {
        return (value, carry);
    }
    match kind {
        ShiftType::Lsl => match amount {
            1..=31 => (value << amount, (value >> (32 - amount)) & 1 != 0),
            32 => (0, value & 1 != 0),
            _ => (0, false),
        },
        ShiftType::Lsr => match amount {
            1..=31 => (value >> amount, (value >> (amount - 1)) & 1 != 0),
            32 => (0, value >> 31 != 0),
            _ => (0, false),
        },
        ShiftType::Asr => match amount {
            1..=31 => (((value as i32) >> amount) as u32, (value >> (amount - 1)) & 1 != 0),
            _ => (((value as i32) >> 31) as u32, value >> 31 != 0),
        },
        ShiftType::Ror => {
            let amount = amount % 32;
            if amount == 0 {
                (value, value >> 31 != 0)
            } else {
                (value.rotate_right(amount), (value >> (amount - 1)) & 1 != 0)
            }
        }
    }
}

/*
 * Shift amount encoded in the instruction. Amount 0 encodes LSR #32, ASR #32 and RRX.
 */
pub fn shift_imm(kind: ShiftType, value: u32, amount: u32, carry: bool) -> (u32, bool) {
    match (kind, amount) {
        (ShiftType::Lsl, 0) => (value, carry),
        (ShiftType::Lsr, 0) | (ShiftType::Asr, 0) => shift_reg(kind, value, 32, carry),
        (ShiftType::Ror, 0) => (((carry as u32) << 31) | (value >> 1), value & 1 != 0),
        _ => shift_reg(kind, value, amount, carry),
    }
}

/* 8-bit immediate rotated right by twice the 4-bit rotate field */
pub fn rotated_imm(imm: u32, rotate: u32, carry: bool) -> (u32, bool) {
    if rotate == 0 {
        (imm, carry)
    } else {
        let value = imm.rotate_right(rotate * 2);
        (value, value >> 31 != 0)
    }
}

/* a + b + carry, returns (result, carry, overflow) */
pub fn add(a: u32, b: u32, carry: bool) -> (u32, bool, bool) {
    let wide = a as u64 + b as u64 + carry as u64;
    let result = wide as u32;
    let overflow = (!(a ^ b) & (a ^ result)) >> 31 != 0;
    (result, wide > 0xFFFF_FFFF, overflow)
}

/* a - b - !carry. Carry out is NOT borrow. */
pub fn sub(a: u32, b: u32, carry: bool) -> (u32, bool, bool) {
    let wide = (a as u64).wrapping_sub(b as u64).wrapping_sub(!carry as u64);
    let result = wide as u32;
    let overflow = ((a ^ b) & (a ^ result)) >> 31 != 0;
    (result, wide >> 32 == 0, overflow)
}

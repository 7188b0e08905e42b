use super::registers::Psr;

/* Values for the instruction condition field */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    EQ, NE, CS, CC, MI, PL, VS, VC,
    HI, LS, GE, LT, GT, LE, AL,
    /* never, on this architecture version */
    NV,
}

impl Condition {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Condition::EQ,
            0x1 => Condition::NE,
            0x2 => Condition::CS,
            0x3 => Condition::CC,
            0x4 => Condition::MI,
            0x5 => Condition::PL,
            0x6 => Condition::VS,
            0x7 => Condition::VC,
            0x8 => Condition::HI,
            0x9 => Condition::LS,
            0xA => Condition::GE,
            0xB => Condition::LT,
            0xC => Condition::GT,
            0xD => Condition::LE,
            0xE => Condition::AL,
            _ => Condition::NV,
        }
    }

    pub fn holds(self, psr: Psr) -> bool {
        let n = psr.contains(Psr::N);
        let z = psr.contains(Psr::Z);
        let c = psr.contains(Psr::C);
        let v = psr.contains(Psr::V);
        match self {
            Condition::EQ => z,
            Condition::NE => !z,
            Condition::CS => c,
            Condition::CC => !c,
            Condition::MI => n,
            Condition::PL => !n,
            Condition::VS => v,
            Condition::VC => !v,
            Condition::HI => c && !z,
            Condition::LS => !c || z,
            Condition::GE => n == v,
            Condition::LT => n != v,
            Condition::GT => !z && n == v,
            Condition::LE => z || n != v,
            Condition::AL => true,
            Condition::NV => false,
        }
    }
}

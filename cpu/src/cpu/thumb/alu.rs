use crate::bitwise::Bits;

/// The 16 operations of the Thumb ALU format, bits 9-6 of the instruction.
///
/// All of them operate on low registers and set at least N and Z; the
/// shifts take C from the barrel shifter, the add/subtract family computes
/// C and V, and MUL leaves C and V alone.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ThumbAluOp {
    And = 0x0,
    Eor = 0x1,
    Lsl = 0x2,
    Lsr = 0x3,
    Asr = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Ror = 0x7,
    Tst = 0x8,
    Neg = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mul = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl From<u16> for ThumbAluOp {
    fn from(op_code: u16) -> Self {
        use ThumbAluOp::*;
        match op_code.get_bits(0..=3) {
            0x0 => And,
            0x1 => Eor,
            0x2 => Lsl,
            0x3 => Lsr,
            0x4 => Asr,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Ror,
            0x8 => Tst,
            0x9 => Neg,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mul,
            0xE => Bic,
            0xF => Mvn,
            _ => unreachable!(),
        }
    }
}

impl std::fmt::Display for ThumbAluOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Lsl => f.write_str("LSL"),
            Self::Lsr => f.write_str("LSR"),
            Self::Asr => f.write_str("ASR"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Ror => f.write_str("ROR"),
            Self::Tst => f.write_str("TST"),
            Self::Neg => f.write_str("NEG"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mul => f.write_str("MUL"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

/// Hi-register operations and BX, bits 9-8 of the format.
///
/// These are the only Thumb data operations that can name r8-r15. ADD and
/// MOV never set flags here; CMP always does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HiRegisterOp {
    Add,
    Cmp,
    Mov,
    Bx,
}

impl From<u16> for HiRegisterOp {
    fn from(op: u16) -> Self {
        match op.get_bits(0..=1) {
            0 => Self::Add,
            1 => Self::Cmp,
            2 => Self::Mov,
            3 => Self::Bx,
            _ => unreachable!(),
        }
    }
}

impl std::fmt::Display for HiRegisterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => f.write_str("ADD"),
            Self::Cmp => f.write_str("CMP"),
            Self::Mov => f.write_str("MOV"),
            Self::Bx => f.write_str("BX"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn thumb_alu_op_roundtrip() {
        let op: ThumbAluOp = 0b0000_u16.into();
        assert_eq!(op, ThumbAluOp::And);
        let op: ThumbAluOp = 0b0111_u16.into();
        assert_eq!(op, ThumbAluOp::Ror);
        let op: ThumbAluOp = 0b1101_u16.into();
        assert_eq!(op, ThumbAluOp::Mul);
        let op: ThumbAluOp = 0b1111_u16.into();
        assert_eq!(op, ThumbAluOp::Mvn);
    }

    #[test]
    fn hi_register_op_roundtrip() {
        assert_eq!(HiRegisterOp::from(0_u16), HiRegisterOp::Add);
        assert_eq!(HiRegisterOp::from(3_u16), HiRegisterOp::Bx);
    }
}

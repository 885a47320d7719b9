//! # ALU opcodes and the barrel shifter
//!
//! Data processing instructions route their second operand through the
//! barrel shifter before it reaches the ALU:
//!
//! ```text
//! 31-28  27-26  25   24-21   20   19-16  15-12  11-0
//! [Cond] [ 00 ] [I] [OpCode] [S] [ Rn ] [ Rd ] [Operand2]
//! ```
//!
//! With I=0 Operand2 is a register shifted by an immediate or by another
//! register; with I=1 it is an 8-bit immediate rotated right by twice the
//! 4-bit rotate field.
//!
//! The carry flag has two sources, which is why the opcodes are split into
//! kinds: logical operations take C from the shifter carry-out, arithmetic
//! operations compute it from the add or subtract itself (where C means
//! "no borrow" for the subtractive family).

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::flags::ShiftKind;

/// The 16 data processing opcodes, bits 24-21 of the instruction.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ArmAluOp {
    /// `Rd = Rn AND Op2`
    And = 0x0,
    /// `Rd = Rn XOR Op2`
    Eor = 0x1,
    /// `Rd = Rn - Op2`
    Sub = 0x2,
    /// `Rd = Op2 - Rn`
    Rsb = 0x3,
    /// `Rd = Rn + Op2`
    Add = 0x4,
    /// `Rd = Rn + Op2 + C`
    Adc = 0x5,
    /// `Rd = Rn - Op2 - !C`
    Sbc = 0x6,
    /// `Rd = Op2 - Rn - !C`
    Rsc = 0x7,
    /// AND, flags only.
    Tst = 0x8,
    /// XOR, flags only.
    Teq = 0x9,
    /// SUB, flags only.
    Cmp = 0xA,
    /// ADD, flags only.
    Cmn = 0xB,
    /// `Rd = Rn OR Op2`
    Orr = 0xC,
    /// `Rd = Op2` (Rn ignored)
    Mov = 0xD,
    /// `Rd = Rn AND NOT Op2`
    Bic = 0xE,
    /// `Rd = NOT Op2` (Rn ignored)
    Mvn = 0xF,
}

impl std::fmt::Display for ArmAluOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

impl From<u32> for ArmAluOp {
    fn from(alu_op_code: u32) -> Self {
        match alu_op_code {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            0xF => Self::Mvn,
            _ => unreachable!(),
        }
    }
}

/// Classification of ALU opcodes for carry handling.
#[derive(Eq, PartialEq, Debug)]
pub enum AluKind {
    /// C comes from the barrel shifter; V is untouched.
    Logical,
    /// C and V come from the add/subtract itself.
    Arithmetic,
}

pub trait Kind {
    fn kind(&self) -> AluKind;
}

impl Kind for ArmAluOp {
    fn kind(&self) -> AluKind {
        match self {
            Self::And
            | Self::Eor
            | Self::Tst
            | Self::Teq
            | Self::Orr
            | Self::Mov
            | Self::Bic
            | Self::Mvn => AluKind::Logical,
            Self::Sub
            | Self::Rsb
            | Self::Add
            | Self::Adc
            | Self::Sbc
            | Self::Rsc
            | Self::Cmp
            | Self::Cmn => AluKind::Arithmetic,
        }
    }
}

/// Result of an arithmetic operation together with the four condition flags
/// it would set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub result: u32,
    /// Unsigned overflow for additions, "no borrow" for subtractions.
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
    /// Bit 31 of the result.
    pub sign: bool,
    /// Result is exactly zero.
    pub zero: bool,
}

/// Shifted value plus the shifter carry-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftOutput {
    pub value: u32,
    pub carry: bool,
}

/// Applies one barrel shifter operation.
///
/// Implements the immediate-form special encodings: `LSL #0` is the identity
/// with carry preserved, `LSR #0` and `ASR #0` encode a shift by 32, and
/// `ROR #0` is RRX (rotate right through carry by one). A rotate amount above
/// 32 behaves like the amount modulo 32, with multiples of 32 acting as
/// `ROR #32`.
///
/// The register-sourced amount-zero case (no shift at all, carry preserved)
/// must be handled by the caller, since amount zero is reserved for the
/// encodings above.
pub fn shift(kind: ShiftKind, shift_amount: u32, value: u32, carry: bool) -> ShiftOutput {
    match kind {
        ShiftKind::Lsl => match shift_amount {
            0 => ShiftOutput { value, carry },
            1..=31 => ShiftOutput {
                value: value << shift_amount,
                carry: value.get_bit((32 - shift_amount) as u8),
            },
            32 => ShiftOutput {
                value: 0,
                carry: value.get_bit(0),
            },
            _ => ShiftOutput {
                value: 0,
                carry: false,
            },
        },
        ShiftKind::Lsr => match shift_amount {
            // LSR#0 encodes LSR#32.
            0 | 32 => ShiftOutput {
                value: 0,
                carry: value.get_bit(31),
            },
            1..=31 => ShiftOutput {
                value: value >> shift_amount,
                carry: value.get_bit((shift_amount - 1) as u8),
            },
            _ => ShiftOutput {
                value: 0,
                carry: false,
            },
        },
        ShiftKind::Asr => match shift_amount {
            1..=31 => ShiftOutput {
                value: ((value as i32) >> shift_amount) as u32,
                carry: value.get_bit((shift_amount - 1) as u8),
            },
            // ASR#0 encodes ASR#32; every amount from 32 up fills with the
            // sign bit.
            _ => ShiftOutput {
                value: ((value as i32) >> 31) as u32,
                carry: value.get_bit(31),
            },
        },
        ShiftKind::Ror => {
            let mut amount = shift_amount;
            if amount > 32 {
                amount %= 32;
                if amount == 0 {
                    amount = 32;
                }
            }

            match amount {
                // ROR#0 encodes RRX.
                0 => ShiftOutput {
                    value: (value >> 1) | (u32::from(carry) << 31),
                    carry: value.get_bit(0),
                },
                1..=31 => ShiftOutput {
                    value: value.rotate_right(amount),
                    carry: value.get_bit((amount - 1) as u8),
                },
                32 => ShiftOutput {
                    value,
                    carry: value.get_bit(31),
                },
                _ => unreachable!(),
            }
        }
    }
}

/// `first_op + second_op + carry_in` with full flag computation.
pub fn adc_inner(first_op: u32, second_op: u32, carry_in: bool) -> AluResult {
    let full = u64::from(first_op) + u64::from(second_op) + u64::from(carry_in);
    let result = full as u32;

    AluResult {
        result,
        carry: full > u64::from(u32::MAX),
        // Signed overflow: both operands share a sign the result does not.
        overflow: (first_op ^ result) & (second_op ^ result) & 0x8000_0000 != 0,
        sign: result.get_bit(31),
        zero: result == 0,
    }
}

pub fn add_inner(first_op: u32, second_op: u32) -> AluResult {
    adc_inner(first_op, second_op, false)
}

/// `first_op - second_op - !carry_in` with full flag computation. C is set
/// when no borrow occurred, i.e. when the minuend covers the subtrahend as
/// unsigned.
pub fn sbc_inner(first_op: u32, second_op: u32, carry_in: bool) -> AluResult {
    let subtrahend = u64::from(second_op) + u64::from(!carry_in);
    let result = first_op
        .wrapping_sub(second_op)
        .wrapping_sub(u32::from(!carry_in));

    AluResult {
        result,
        carry: u64::from(first_op) >= subtrahend,
        overflow: (first_op ^ second_op) & (first_op ^ result) & 0x8000_0000 != 0,
        sign: result.get_bit(31),
        zero: result == 0,
    }
}

pub fn sub_inner(first_op: u32, second_op: u32) -> AluResult {
    sbc_inner(first_op, second_op, true)
}

/// Which program status register a PSR transfer targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsrKind {
    Cpsr,
    Spsr,
}

impl From<bool> for PsrKind {
    fn from(value: bool) -> Self {
        if value {
            Self::Spsr
        } else {
            Self::Cpsr
        }
    }
}

impl std::fmt::Display for PsrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpsr => write!(f, "CPSR"),
            Self::Spsr => write!(f, "SPSR"),
        }
    }
}

/// The PSR transfer operations living in the test-opcode space with S=0.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PsrOp {
    /// `MRS Rd, PSR`: read the PSR into a register.
    Mrs { destination_register: u32 },
    /// `MSR PSR, Rm`: write a register into the PSR.
    Msr { source_register: u32 },
    /// `MSR PSR_flg, op`: write the flag bits only.
    MsrFlags { operand: AluSecondOperand },
}

impl TryFrom<u32> for PsrOp {
    type Error = String;

    fn try_from(op_code: u32) -> Result<Self, Self::Error> {
        if op_code.get_bits(23..=27) == 0b00010
            && op_code.get_bits(16..=21) == 0b001111
            && op_code.get_bits(0..=11) == 0
        {
            Ok(Self::Mrs {
                destination_register: op_code.get_bits(12..=15),
            })
        } else if op_code.get_bits(23..=27) == 0b00010
            && op_code.get_bits(12..=21) == 0b10_1001_1111
            && op_code.get_bits(4..=11) == 0
        {
            Ok(Self::Msr {
                source_register: op_code.get_bits(0..=3),
            })
        } else if op_code.get_bits(26..=27) == 0b00
            && op_code.get_bits(23..=24) == 0b10
            && op_code.get_bits(20..=21) == 0b10
            && op_code.get_bits(12..=15) == 0b1111
        {
            Ok(Self::MsrFlags {
                operand: if op_code.get_bit(25) {
                    AluSecondOperand::Immediate {
                        base: op_code.get_bits(0..=7),
                        shift: op_code.get_bits(8..=11) * 2,
                    }
                } else {
                    AluSecondOperand::Register {
                        shift_source: ShiftSource::Immediate(0),
                        shift_kind: ShiftKind::Lsl,
                        register: op_code.get_bits(0..=3),
                    }
                },
            })
        } else {
            Err(format!("not a PSR transfer encoding: {op_code:#010X}"))
        }
    }
}

/// Where a register operand's shift amount comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShiftSource {
    /// 5-bit amount encoded in the instruction (0 selects the special
    /// encodings of [`shift`]).
    Immediate(u32),
    /// Bottom byte of the named register.
    Register(u32),
}

impl std::fmt::Display for ShiftSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate(value) => write!(f, "#{value}"),
            Self::Register(register) => write!(f, "R{register}"),
        }
    }
}

/// The flexible second operand of a data processing instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AluSecondOperand {
    /// A register, optionally shifted.
    Register {
        shift_source: ShiftSource,
        shift_kind: ShiftKind,
        register: u32,
    },
    /// An 8-bit immediate rotated right by an even amount.
    Immediate { base: u32, shift: u32 },
}

impl std::fmt::Display for AluSecondOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Register {
                shift_source,
                shift_kind,
                register,
            } => {
                if shift_source == ShiftSource::Immediate(0) {
                    return match shift_kind {
                        ShiftKind::Lsl => write!(f, "R{register}"),
                        ShiftKind::Ror => write!(f, "R{register}, RRX"),
                        _ => write!(f, "R{register}, {shift_kind} #32"),
                    };
                }

                write!(f, "R{register}, {shift_kind} {shift_source}")
            }
            Self::Immediate { base, shift } => {
                write!(f, "#{}", base.rotate_right(shift))
            }
        }
    }
}

use crate::bitwise::Bits;
use crate::cpu::arm::alu::{AluSecondOperand, ArmAluOp, PsrKind, PsrOp, ShiftSource};
use crate::cpu::condition::Condition;
use crate::cpu::flags::{Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind, ShiftKind};

/// Offset operand of a single data transfer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SingleDataTransferOffset {
    /// 12-bit unsigned immediate.
    Immediate { offset: u32 },
    /// Register shifted by an immediate amount; the shifter carry-out is
    /// discarded.
    Register {
        shift_amount: u32,
        shift_kind: ShiftKind,
        register: u32,
    },
}

impl std::fmt::Display for SingleDataTransferOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate { offset } => write!(f, "#{offset}"),
            Self::Register {
                shift_amount,
                shift_kind,
                register,
            } => write!(f, "R{register}, {shift_kind} #{shift_amount}"),
        }
    }
}

/// An ARM instruction as a tagged variant.
///
/// Decoding is total: every 32-bit word maps to exactly one variant, with
/// the encodings this core does not implement (multiplies, halfword
/// transfers, coprocessor space) collapsing into [`Undefined`]. Execution
/// reports `Undefined` instead of dispatching it.
///
/// [`Undefined`]: ArmInstruction::Undefined
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ArmInstruction {
    DataProcessing {
        alu_op: ArmAluOp,
        set_conditions: bool,
        op_kind: OperandKind,
        rn: u32,
        rd: u32,
        op2: AluSecondOperand,
    },
    PsrTransfer {
        psr_kind: PsrKind,
        op: PsrOp,
    },
    BranchAndExchange {
        register: usize,
    },
    SingleDataTransfer {
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        offsetting: Offsetting,
        rd: u32,
        base_register: u32,
        offset_info: SingleDataTransferOffset,
    },
    BlockDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        base_register: u32,
        register_list: u32,
    },
    Branch {
        link: bool,
        offset: u32,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    Undefined,
}

impl From<u32> for ArmInstruction {
    fn from(op_code: u32) -> Self {
        // BX has a fixed pattern across bits 27..4.
        if op_code.get_bits(4..=27) == 0x0012_FFF1 {
            return Self::BranchAndExchange {
                register: op_code.get_bits(0..=3) as usize,
            };
        }

        match op_code.get_bits(25..=27) {
            0b000 | 0b001 => Self::decode_alu(op_code),
            0b010 | 0b011 => Self::decode_single_data_transfer(op_code),
            0b100 => Self::BlockDataTransfer {
                indexing: op_code.get_bit(24).into(),
                offsetting: op_code.get_bit(23).into(),
                load_psr: op_code.get_bit(22),
                write_back: op_code.get_bit(21),
                load_store: op_code.get_bit(20).into(),
                base_register: op_code.get_bits(16..=19),
                register_list: op_code.get_bits(0..=15),
            },
            0b101 => Self::Branch {
                link: op_code.get_bit(24),
                offset: op_code.get_bits(0..=23),
            },
            0b111 if op_code.get_bit(24) => Self::SoftwareInterrupt {
                comment: op_code.get_bits(0..=23),
            },
            // Coprocessor space and everything else this core leaves alone.
            _ => Self::Undefined,
        }
    }
}

impl ArmInstruction {
    fn decode_alu(op_code: u32) -> Self {
        let op_kind: OperandKind = op_code.get_bit(25).into();

        // Multiply and halfword-transfer encodings live in class 000 with
        // bits 4 and 7 both set; neither is implemented by this core.
        if op_kind == OperandKind::Register && op_code.get_bit(4) && op_code.get_bit(7) {
            return Self::Undefined;
        }

        let alu_op: ArmAluOp = op_code.get_bits(21..=24).into();
        let set_conditions = op_code.get_bit(20);

        // The test opcodes with S=0 are the PSR transfer space.
        if !set_conditions
            && matches!(
                alu_op,
                ArmAluOp::Tst | ArmAluOp::Teq | ArmAluOp::Cmp | ArmAluOp::Cmn
            )
        {
            return match PsrOp::try_from(op_code) {
                Ok(op) => Self::PsrTransfer {
                    psr_kind: op_code.get_bit(22).into(),
                    op,
                },
                Err(_) => Self::Undefined,
            };
        }

        let op2 = match op_kind {
            OperandKind::Immediate => AluSecondOperand::Immediate {
                base: op_code.get_bits(0..=7),
                shift: op_code.get_bits(8..=11) * 2,
            },
            OperandKind::Register => AluSecondOperand::Register {
                shift_source: if op_code.get_bit(4) {
                    ShiftSource::Register(op_code.get_bits(8..=11))
                } else {
                    ShiftSource::Immediate(op_code.get_bits(7..=11))
                },
                shift_kind: op_code.get_bits(5..=6).into(),
                register: op_code.get_bits(0..=3),
            },
        };

        Self::DataProcessing {
            alu_op,
            set_conditions,
            op_kind,
            rn: op_code.get_bits(16..=19),
            rd: op_code.get_bits(12..=15),
            op2,
        }
    }

    fn decode_single_data_transfer(op_code: u32) -> Self {
        let offset_info = if op_code.get_bit(25) {
            SingleDataTransferOffset::Register {
                shift_amount: op_code.get_bits(7..=11),
                shift_kind: op_code.get_bits(5..=6).into(),
                register: op_code.get_bits(0..=3),
            }
        } else {
            SingleDataTransferOffset::Immediate {
                offset: op_code.get_bits(0..=11),
            }
        };

        Self::SingleDataTransfer {
            kind: op_code.get_bit(20).into(),
            quantity: op_code.get_bit(22).into(),
            write_back: op_code.get_bit(21),
            indexing: op_code.get_bit(24).into(),
            offsetting: op_code.get_bit(23).into(),
            rd: op_code.get_bits(12..=15),
            base_register: op_code.get_bits(16..=19),
            offset_info,
        }
    }

    pub(crate) fn disassembler(&self, condition: Condition) -> String {
        match self {
            Self::DataProcessing {
                alu_op,
                set_conditions,
                op_kind: _,
                rn,
                rd,
                op2,
            } => {
                let set_string = if *set_conditions { "S" } else { "" };
                match alu_op {
                    ArmAluOp::And
                    | ArmAluOp::Eor
                    | ArmAluOp::Sub
                    | ArmAluOp::Rsb
                    | ArmAluOp::Add
                    | ArmAluOp::Adc
                    | ArmAluOp::Sbc
                    | ArmAluOp::Rsc
                    | ArmAluOp::Orr
                    | ArmAluOp::Bic => {
                        format!("{alu_op}{condition}{set_string} R{rd}, R{rn}, {op2}")
                    }
                    ArmAluOp::Tst | ArmAluOp::Teq | ArmAluOp::Cmp | ArmAluOp::Cmn => {
                        format!("{alu_op}{condition} R{rn}, {op2}")
                    }
                    ArmAluOp::Mov | ArmAluOp::Mvn => {
                        format!("{alu_op}{condition}{set_string} R{rd}, {op2}")
                    }
                }
            }
            Self::PsrTransfer { psr_kind, op } => match op {
                PsrOp::Mrs {
                    destination_register,
                } => format!("MRS{condition} R{destination_register}, {psr_kind}"),
                PsrOp::Msr { source_register } => {
                    format!("MSR{condition} {psr_kind}, R{source_register}")
                }
                PsrOp::MsrFlags { operand } => {
                    format!("MSR{condition} {psr_kind}_flg, {operand}")
                }
            },
            Self::BranchAndExchange { register } => format!("BX{condition} R{register}"),
            Self::SingleDataTransfer {
                kind,
                quantity,
                rd,
                base_register,
                offset_info,
                ..
            } => {
                let instr = match (kind, quantity) {
                    (LoadStoreKind::Load, ReadWriteKind::Byte) => "LDRB",
                    (LoadStoreKind::Load, ReadWriteKind::Word) => "LDR",
                    (LoadStoreKind::Store, ReadWriteKind::Byte) => "STRB",
                    (LoadStoreKind::Store, ReadWriteKind::Word) => "STR",
                };
                format!("{instr}{condition} R{rd}, [R{base_register}, {offset_info}]")
            }
            Self::BlockDataTransfer {
                load_store,
                write_back,
                base_register,
                register_list,
                ..
            } => {
                let instr = match load_store {
                    LoadStoreKind::Load => "LDM",
                    LoadStoreKind::Store => "STM",
                };

                let mut registers = String::new();
                for i in 0..16 {
                    if register_list.get_bit(i) {
                        if !registers.is_empty() {
                            registers.push_str(", ");
                        }
                        registers.push_str(&format!("R{i}"));
                    }
                }

                let bang = if *write_back { "!" } else { "" };
                format!("{instr}{condition} R{base_register}{bang}, {{{registers}}}")
            }
            Self::Branch { link, offset } => {
                let link_string = if *link { "L" } else { "" };
                let offset = (offset << 2).sign_extended(26) as i32;
                format!("B{link_string}{condition} #{offset}")
            }
            Self::SoftwareInterrupt { comment } => format!("SWI{condition} #{comment}"),
            Self::Undefined => "UNDEFINED".to_string(),
        }
    }
}

impl std::fmt::Display for ArmInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

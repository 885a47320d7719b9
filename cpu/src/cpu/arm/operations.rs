use crate::bitwise::Bits;
use crate::cpu::arm::alu::{
    self, AluSecondOperand, ArmAluOp, PsrKind, PsrOp, ShiftOutput, ShiftSource,
};
use crate::cpu::arm::instructions::SingleDataTransferOffset;
use crate::cpu::arm7tdmi::{Arm7tdmi, SWI_VECTOR};
use crate::cpu::cpu_modes::Mode;
use crate::cpu::flags::{Indexing, LoadStoreKind, Offsetting, ReadWriteKind, ShiftKind};
use crate::cpu::psr::CpuState;
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER};
use crate::memory::io_device::IoDevice;

pub const SIZE_OF_ARM_INSTRUCTION: u32 = 4;

impl Arm7tdmi {
    /// Evaluates the flexible second operand, producing the value and the
    /// shifter carry-out.
    ///
    /// An immediate with rotation zero and a register shift amount of zero
    /// both leave the carry untouched; every other path goes through the
    /// barrel shifter.
    pub(crate) fn second_operand(&self, op2: AluSecondOperand) -> ShiftOutput {
        let carry_in = self.cpsr.carry_flag();

        match op2 {
            AluSecondOperand::Immediate { base, shift } => {
                if shift == 0 {
                    ShiftOutput {
                        value: base,
                        carry: carry_in,
                    }
                } else {
                    alu::shift(ShiftKind::Ror, shift, base, carry_in)
                }
            }
            AluSecondOperand::Register {
                shift_source,
                shift_kind,
                register,
            } => {
                let rm = self.read_register(register as usize);

                match shift_source {
                    ShiftSource::Immediate(amount) => alu::shift(shift_kind, amount, rm, carry_in),
                    ShiftSource::Register(rs) => {
                        let amount = self.registers.register_at(rs as usize) & 0xFF;
                        if amount == 0 {
                            ShiftOutput {
                                value: rm,
                                carry: carry_in,
                            }
                        } else {
                            alu::shift(shift_kind, amount, rm, carry_in)
                        }
                    }
                }
            }
        }
    }

    pub(crate) fn data_processing(
        &mut self,
        alu_op: ArmAluOp,
        set_conditions: bool,
        rn: u32,
        rd: u32,
        op2: AluSecondOperand,
    ) -> Option<u32> {
        let op1 = self.read_register(rn as usize);
        let op2 = self.second_operand(op2);

        // With Rd=15 the flags are not updated; CPSR is restored below.
        let s = set_conditions && rd != REG_PROGRAM_COUNTER;
        let rd = rd as usize;

        use ArmAluOp::*;
        match alu_op {
            And => self.and(rd, op1, op2, s),
            Eor => self.eor(rd, op1, op2, s),
            Sub => self.sub(rd, op1, op2.value, s),
            Rsb => self.sub(rd, op2.value, op1, s),
            Add => self.add(rd, op1, op2.value, s),
            Adc => self.adc(rd, op1, op2.value, s),
            Sbc => self.sbc(rd, op1, op2.value, s),
            Rsc => self.sbc(rd, op2.value, op1, s),
            Tst => {
                if s {
                    self.set_logical_flags(op1 & op2.value, op2.carry);
                }
            }
            Teq => {
                if s {
                    self.set_logical_flags(op1 ^ op2.value, op2.carry);
                }
            }
            Cmp => {
                if s {
                    self.cpsr.set_flags(alu::sub_inner(op1, op2.value));
                }
            }
            Cmn => {
                if s {
                    self.cpsr.set_flags(alu::add_inner(op1, op2.value));
                }
            }
            Orr => self.orr(rd, op1, op2, s),
            Mov => self.mov(rd, op2, s),
            Bic => self.bic(rd, op1, op2, s),
            Mvn => self.mvn(rd, op2, s),
        };

        // S=1 with Rd=15 restores CPSR from SPSR (mode restore).
        if set_conditions && rd == REG_PROGRAM_COUNTER as usize {
            self.cpsr = self.spsr;
        }

        let writes_result = !matches!(alu_op, Tst | Teq | Cmp | Cmn);
        if writes_result && rd == REG_PROGRAM_COUNTER as usize {
            let pc = self.registers.program_counter();
            let masked = match self.cpsr.cpu_state() {
                CpuState::Arm => pc & !3,
                CpuState::Thumb => pc & !1,
            };
            self.registers.set_program_counter(masked);
            None
        } else {
            Some(SIZE_OF_ARM_INSTRUCTION)
        }
    }

    pub(crate) fn set_logical_flags(&mut self, result: u32, shifter_carry: bool) {
        self.cpsr.set_sign_flag(result.get_bit(31));
        self.cpsr.set_zero_flag(result == 0);
        self.cpsr.set_carry_flag(shifter_carry);
    }

    fn and(&mut self, rd: usize, rn: u32, op2: ShiftOutput, s: bool) {
        let result = rn & op2.value;

        self.registers.set_register_at(rd, result);

        if s {
            self.set_logical_flags(result, op2.carry);
        }
    }

    fn eor(&mut self, rd: usize, rn: u32, op2: ShiftOutput, s: bool) {
        let result = rn ^ op2.value;

        self.registers.set_register_at(rd, result);

        if s {
            self.set_logical_flags(result, op2.carry);
        }
    }

    fn orr(&mut self, rd: usize, rn: u32, op2: ShiftOutput, s: bool) {
        let result = rn | op2.value;

        self.registers.set_register_at(rd, result);

        if s {
            self.set_logical_flags(result, op2.carry);
        }
    }

    fn bic(&mut self, rd: usize, rn: u32, op2: ShiftOutput, s: bool) {
        let result = rn & !op2.value;

        self.registers.set_register_at(rd, result);

        if s {
            self.set_logical_flags(result, op2.carry);
        }
    }

    fn mov(&mut self, rd: usize, op2: ShiftOutput, s: bool) {
        self.registers.set_register_at(rd, op2.value);

        if s {
            self.set_logical_flags(op2.value, op2.carry);
        }
    }

    fn mvn(&mut self, rd: usize, op2: ShiftOutput, s: bool) {
        let result = !op2.value;

        self.registers.set_register_at(rd, result);

        if s {
            self.set_logical_flags(result, op2.carry);
        }
    }

    fn add(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = alu::add_inner(rn, op2);

        self.registers.set_register_at(rd, result.result);

        if s {
            self.cpsr.set_flags(result);
        }
    }

    fn adc(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = alu::adc_inner(rn, op2, self.cpsr.carry_flag());

        self.registers.set_register_at(rd, result.result);

        if s {
            self.cpsr.set_flags(result);
        }
    }

    fn sub(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = alu::sub_inner(rn, op2);

        self.registers.set_register_at(rd, result.result);

        if s {
            self.cpsr.set_flags(result);
        }
    }

    fn sbc(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = alu::sbc_inner(rn, op2, self.cpsr.carry_flag());

        self.registers.set_register_at(rd, result.result);

        if s {
            self.cpsr.set_flags(result);
        }
    }

    pub(crate) fn psr_transfer(&mut self, psr_kind: PsrKind, op: PsrOp) -> Option<u32> {
        match op {
            PsrOp::Mrs {
                destination_register,
            } => {
                let psr = match psr_kind {
                    PsrKind::Cpsr => self.cpsr,
                    PsrKind::Spsr => self.spsr,
                };

                self.registers
                    .set_register_at(destination_register as usize, psr.into());
            }
            PsrOp::Msr { source_register } => {
                let value = self.registers.register_at(source_register as usize);
                self.write_psr(psr_kind, value, true);
            }
            PsrOp::MsrFlags { operand } => {
                let value = self.second_operand(operand).value;
                self.write_psr(psr_kind, value, false);
            }
        }

        Some(SIZE_OF_ARM_INSTRUCTION)
    }

    /// Applies an MSR write. In User mode only the condition flags of the
    /// CPSR can change; the control part of the write is dropped silently.
    fn write_psr(&mut self, psr_kind: PsrKind, value: u32, control: bool) {
        let user = self.cpsr.mode() == Mode::User;

        let psr = match psr_kind {
            PsrKind::Cpsr => &mut self.cpsr,
            PsrKind::Spsr => &mut self.spsr,
        };

        psr.set_sign_flag(value.get_bit(31));
        psr.set_zero_flag(value.get_bit(30));
        psr.set_carry_flag(value.get_bit(29));
        psr.set_overflow_flag(value.get_bit(28));

        if control && (psr_kind == PsrKind::Spsr || !user) {
            if psr.state_bit() != value.get_bit(5) {
                tracing::warn!("MSR is changing the state bit, software should use BX");
            }
            psr.set_state_bit(value.get_bit(5));
            psr.set_mode_raw(value & 0b11111);
        }
    }

    pub(crate) fn branch_and_exchange(&mut self, register: usize) -> Option<u32> {
        let target = self.read_register(register);
        let state: CpuState = target.get_bit(0).into();
        self.cpsr.set_cpu_state(state);

        let masked = match state {
            CpuState::Thumb => target & !1,
            CpuState::Arm => target & !3,
        };
        self.registers.set_program_counter(masked);

        None
    }

    pub(crate) fn branch(&mut self, link: bool, offset: u32) -> Option<u32> {
        let offset = (offset << 2).sign_extended(26);
        let pc = self.registers.program_counter();

        if link {
            self.registers
                .set_register_at(REG_LR, pc.wrapping_add(SIZE_OF_ARM_INSTRUCTION));
        }

        // The branch target is relative to the pipelined pc.
        self.registers
            .set_program_counter(pc.wrapping_add(8).wrapping_add(offset));

        None
    }

    pub(crate) fn software_interrupt(&mut self) -> Option<u32> {
        let pc = self.registers.program_counter();

        self.spsr = self.cpsr;
        self.registers
            .set_register_at(REG_LR, pc.wrapping_add(SIZE_OF_ARM_INSTRUCTION));
        self.cpsr.set_mode(Mode::Supervisor);
        self.cpsr.set_cpu_state(CpuState::Arm);
        self.registers.set_program_counter(SWI_VECTOR);

        None
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn single_data_transfer(
        &mut self,
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        offsetting: Offsetting,
        rd: u32,
        base_register: u32,
        offset_info: SingleDataTransferOffset,
    ) -> Option<u32> {
        let offset = match offset_info {
            SingleDataTransferOffset::Immediate { offset } => offset,
            SingleDataTransferOffset::Register {
                shift_amount,
                shift_kind,
                register,
            } => {
                let rm = self.read_register(register as usize);
                // The shifter carry-out is discarded here.
                alu::shift(shift_kind, shift_amount, rm, self.cpsr.carry_flag()).value
            }
        };

        let base = self.read_register(base_register as usize);
        let effective = match offsetting {
            Offsetting::Up => base.wrapping_add(offset),
            Offsetting::Down => base.wrapping_sub(offset),
        };
        let address = match indexing {
            Indexing::Pre => effective,
            Indexing::Post => base,
        } as usize;

        // Base writeback lands before the loaded value, so a load with
        // Rd == Rn keeps the loaded value.
        if write_back || indexing == Indexing::Post {
            self.registers
                .set_register_at(base_register as usize, effective);
        }

        match kind {
            LoadStoreKind::Load => {
                let value = match quantity {
                    ReadWriteKind::Word => self.memory.read_word(address),
                    ReadWriteKind::Byte => self.memory.read_at(address).into(),
                };

                if rd == REG_PROGRAM_COUNTER {
                    self.registers.set_program_counter(value & !3);
                    return None;
                }

                self.registers.set_register_at(rd as usize, value);
            }
            LoadStoreKind::Store => {
                let value = self.read_register(rd as usize);
                match quantity {
                    ReadWriteKind::Word => self.memory.write_word(address, value),
                    ReadWriteKind::Byte => self.memory.write_at(address, value as u8),
                }
            }
        }

        Some(SIZE_OF_ARM_INSTRUCTION)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn block_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        base_register: u32,
        register_list: u32,
    ) -> Option<u32> {
        let base = self.registers.register_at(base_register as usize);
        let transferred = 4 * register_list.count_ones();

        // The lowest-numbered register always occupies the lowest address:
        // a descending transfer walks the same ascending slots from a
        // lowered start.
        let mut address = match (offsetting, indexing) {
            (Offsetting::Up, Indexing::Post) => base,
            (Offsetting::Up, Indexing::Pre) => base.wrapping_add(4),
            (Offsetting::Down, Indexing::Pre) => base.wrapping_sub(transferred),
            (Offsetting::Down, Indexing::Post) => base.wrapping_sub(transferred).wrapping_add(4),
        };

        let final_base = match offsetting {
            Offsetting::Up => base.wrapping_add(transferred),
            Offsetting::Down => base.wrapping_sub(transferred),
        };

        let mut branch_taken = false;

        match load_store {
            LoadStoreKind::Load => {
                // Writeback first: a base register that is also loaded keeps
                // the loaded value.
                if write_back {
                    self.registers
                        .set_register_at(base_register as usize, final_base);
                }

                for r in 0..16_u8 {
                    if !register_list.get_bit(r) {
                        continue;
                    }

                    let value = self.memory.read_word(address as usize);
                    if u32::from(r) == REG_PROGRAM_COUNTER {
                        if load_psr {
                            self.cpsr = self.spsr;
                        }
                        let masked = match self.cpsr.cpu_state() {
                            CpuState::Arm => value & !3,
                            CpuState::Thumb => value & !1,
                        };
                        self.registers.set_program_counter(masked);
                        branch_taken = true;
                    } else {
                        self.registers.set_register_at(r as usize, value);
                    }

                    address = address.wrapping_add(4);
                }
            }
            LoadStoreKind::Store => {
                for r in 0..16_u8 {
                    if !register_list.get_bit(r) {
                        continue;
                    }

                    let value = self.read_register(r as usize);
                    self.memory.write_word(address as usize, value);
                    address = address.wrapping_add(4);
                }

                if write_back {
                    self.registers
                        .set_register_at(base_register as usize, final_base);
                }
            }
        }

        if branch_taken {
            None
        } else {
            Some(SIZE_OF_ARM_INSTRUCTION)
        }
    }
}

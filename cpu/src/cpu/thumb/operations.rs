use crate::bitwise::Bits;
use crate::cpu::arm::alu;
use crate::cpu::arm7tdmi::{Arm7tdmi, SWI_VECTOR};
use crate::cpu::condition::Condition;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::flags::{LoadStoreKind, OperandKind, Operation, ReadWriteKind, ShiftKind};
use crate::cpu::psr::CpuState;
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER, REG_SP};
use crate::cpu::thumb::alu::{HiRegisterOp, ThumbAluOp};
use crate::memory::io_device::IoDevice;

pub const SIZE_OF_THUMB_INSTRUCTION: u32 = 2;

impl Arm7tdmi {
    /// N and Z from a result; C and V untouched.
    pub(crate) fn set_nz(&mut self, result: u32) {
        self.cpsr.set_sign_flag(result.get_bit(31));
        self.cpsr.set_zero_flag(result == 0);
    }

    /// Shift by the bottom byte of a register. Amount zero leaves the value
    /// and the carry alone; everything else goes through the barrel shifter.
    fn shift_by_register(&mut self, kind: ShiftKind, rd: usize, value: u32, amount_source: u32) {
        let amount = amount_source & 0xFF;

        if amount == 0 {
            self.set_nz(value);
            return;
        }

        let r = alu::shift(kind, amount, value, self.cpsr.carry_flag());
        self.registers.set_register_at(rd, r.value);
        self.set_logical_flags(r.value, r.carry);
    }

    pub(crate) fn move_shifted_register(
        &mut self,
        op: ShiftKind,
        offset5: u16,
        rs: u16,
        rd: u16,
    ) -> Option<u32> {
        let source = self.registers.register_at(rs as usize);
        let r = alu::shift(op, offset5.into(), source, self.cpsr.carry_flag());

        self.registers.set_register_at(rd as usize, r.value);
        self.set_logical_flags(r.value, r.carry);

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn add_subtract(
        &mut self,
        operand_kind: OperandKind,
        subtract: bool,
        rn_offset3: u16,
        rs: u16,
        rd: u16,
    ) -> Option<u32> {
        let rs_value = self.registers.register_at(rs as usize);
        let operand = match operand_kind {
            OperandKind::Immediate => u32::from(rn_offset3),
            OperandKind::Register => self.registers.register_at(rn_offset3 as usize),
        };

        let result = if subtract {
            alu::sub_inner(rs_value, operand)
        } else {
            alu::add_inner(rs_value, operand)
        };

        self.registers.set_register_at(rd as usize, result.result);
        self.cpsr.set_flags(result);

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn move_compare_add_sub_imm(
        &mut self,
        operation: Operation,
        rd: u16,
        offset: u32,
    ) -> Option<u32> {
        let rd = rd as usize;
        let rd_value = self.registers.register_at(rd);

        match operation {
            Operation::Mov => {
                self.registers.set_register_at(rd, offset);
                self.set_nz(offset);
            }
            Operation::Cmp => {
                self.cpsr.set_flags(alu::sub_inner(rd_value, offset));
            }
            Operation::Add => {
                let result = alu::add_inner(rd_value, offset);
                self.registers.set_register_at(rd, result.result);
                self.cpsr.set_flags(result);
            }
            Operation::Sub => {
                let result = alu::sub_inner(rd_value, offset);
                self.registers.set_register_at(rd, result.result);
                self.cpsr.set_flags(result);
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn alu_op(&mut self, op: ThumbAluOp, rs: u16, rd: u16) -> Option<u32> {
        let rs_value = self.registers.register_at(rs as usize);
        let rd_value = self.registers.register_at(rd as usize);
        let rd = rd as usize;

        use ThumbAluOp::*;
        match op {
            And => {
                let result = rd_value & rs_value;
                self.registers.set_register_at(rd, result);
                self.set_nz(result);
            }
            Eor => {
                let result = rd_value ^ rs_value;
                self.registers.set_register_at(rd, result);
                self.set_nz(result);
            }
            Lsl => self.shift_by_register(ShiftKind::Lsl, rd, rd_value, rs_value),
            Lsr => self.shift_by_register(ShiftKind::Lsr, rd, rd_value, rs_value),
            Asr => self.shift_by_register(ShiftKind::Asr, rd, rd_value, rs_value),
            Ror => self.shift_by_register(ShiftKind::Ror, rd, rd_value, rs_value),
            Adc => {
                let result = alu::adc_inner(rd_value, rs_value, self.cpsr.carry_flag());
                self.registers.set_register_at(rd, result.result);
                self.cpsr.set_flags(result);
            }
            Sbc => {
                let result = alu::sbc_inner(rd_value, rs_value, self.cpsr.carry_flag());
                self.registers.set_register_at(rd, result.result);
                self.cpsr.set_flags(result);
            }
            Tst => self.set_nz(rd_value & rs_value),
            Neg => {
                let result = alu::sub_inner(0, rs_value);
                self.registers.set_register_at(rd, result.result);
                self.cpsr.set_flags(result);
            }
            Cmp => self.cpsr.set_flags(alu::sub_inner(rd_value, rs_value)),
            Cmn => self.cpsr.set_flags(alu::add_inner(rd_value, rs_value)),
            Orr => {
                let result = rd_value | rs_value;
                self.registers.set_register_at(rd, result);
                self.set_nz(result);
            }
            Mul => {
                let result = rd_value.wrapping_mul(rs_value);
                self.registers.set_register_at(rd, result);
                self.set_nz(result);
            }
            Bic => {
                let result = rd_value & !rs_value;
                self.registers.set_register_at(rd, result);
                self.set_nz(result);
            }
            Mvn => {
                let result = !rs_value;
                self.registers.set_register_at(rd, result);
                self.set_nz(result);
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn hi_register_op(&mut self, op: HiRegisterOp, rs: u16, rd: u16) -> Option<u32> {
        let rs_value = self.read_register(rs as usize);
        let rd_value = self.read_register(rd as usize);
        let writes_pc = u32::from(rd) == REG_PROGRAM_COUNTER;

        match op {
            HiRegisterOp::Add => {
                let result = rd_value.wrapping_add(rs_value);

                if writes_pc {
                    self.registers.set_program_counter(result & !1);
                    return None;
                }

                self.registers.set_register_at(rd as usize, result);
            }
            HiRegisterOp::Cmp => {
                self.cpsr.set_flags(alu::sub_inner(rd_value, rs_value));
            }
            HiRegisterOp::Mov => {
                if writes_pc {
                    self.registers.set_program_counter(rs_value & !1);
                    return None;
                }

                self.registers.set_register_at(rd as usize, rs_value);
            }
            HiRegisterOp::Bx => {
                let state: CpuState = rs_value.get_bit(0).into();
                self.cpsr.set_cpu_state(state);

                let masked = match state {
                    CpuState::Thumb => rs_value & !1,
                    CpuState::Arm => rs_value & !3,
                };
                self.registers.set_program_counter(masked);

                return None;
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn pc_relative_load(&mut self, rd: u16, immediate_value: u16) -> Option<u32> {
        // The pc reads word-aligned in this format.
        let base = self.read_register(REG_PROGRAM_COUNTER as usize) & !2;
        let address = base.wrapping_add(u32::from(immediate_value));

        let value = self.memory.read_word(address as usize);
        self.registers.set_register_at(rd as usize, value);

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn load_store_register_offset(
        &mut self,
        load_store: LoadStoreKind,
        byte_word: ReadWriteKind,
        ro: u16,
        rb: u16,
        rd: u16,
    ) -> Option<u32> {
        let offset = self.registers.register_at(ro as usize);
        let base = self.registers.register_at(rb as usize);
        let address = base.wrapping_add(offset) as usize;
        let rd = rd as usize;

        match (load_store, byte_word) {
            (LoadStoreKind::Store, ReadWriteKind::Byte) => {
                let value = self.registers.register_at(rd);
                self.memory.write_at(address, value as u8);
            }
            (LoadStoreKind::Store, ReadWriteKind::Word) => {
                let value = self.registers.register_at(rd);
                self.memory.write_word(address, value);
            }
            (LoadStoreKind::Load, ReadWriteKind::Byte) => {
                let value = self.memory.read_at(address);
                self.registers.set_register_at(rd, value.into());
            }
            (LoadStoreKind::Load, ReadWriteKind::Word) => {
                let value = self.memory.read_word(address);
                self.registers.set_register_at(rd, value);
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn load_store_sign_extended(
        &mut self,
        h: bool,
        sign_extend: bool,
        ro: u16,
        rb: u16,
        rd: u16,
    ) -> Option<u32> {
        let offset = self.registers.register_at(ro as usize);
        let base = self.registers.register_at(rb as usize);
        let address = base.wrapping_add(offset) as usize;
        let rd = rd as usize;

        match (sign_extend, h) {
            // Store halfword.
            (false, false) => {
                let value = self.registers.register_at(rd);
                self.memory.write_half_word(address, value as u16);
            }
            // Load halfword, zero-extended.
            (false, true) => {
                let value = self.memory.read_half_word(address);
                self.registers.set_register_at(rd, value.into());
            }
            // Load byte, sign-extended.
            (true, false) => {
                let value = u32::from(self.memory.read_at(address));
                self.registers.set_register_at(rd, value.sign_extended(8));
            }
            // Load halfword, sign-extended.
            (true, true) => {
                let value = u32::from(self.memory.read_half_word(address));
                self.registers.set_register_at(rd, value.sign_extended(16));
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn load_store_imm_offset(
        &mut self,
        load_store: LoadStoreKind,
        byte_word: ReadWriteKind,
        offset: u16,
        rb: u16,
        rd: u16,
    ) -> Option<u32> {
        let base = self.registers.register_at(rb as usize);
        let address = base.wrapping_add(u32::from(offset)) as usize;
        let rd = rd as usize;

        match (load_store, byte_word) {
            (LoadStoreKind::Store, ReadWriteKind::Word) => {
                let value = self.registers.register_at(rd);
                self.memory.write_word(address, value);
            }
            (LoadStoreKind::Store, ReadWriteKind::Byte) => {
                let value = self.registers.register_at(rd);
                self.memory.write_at(address, value as u8);
            }
            (LoadStoreKind::Load, ReadWriteKind::Word) => {
                let value = self.memory.read_word(address);
                self.registers.set_register_at(rd, value);
            }
            (LoadStoreKind::Load, ReadWriteKind::Byte) => {
                let value = self.memory.read_at(address);
                self.registers.set_register_at(rd, value.into());
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn load_store_halfword(
        &mut self,
        load_store: LoadStoreKind,
        offset: u16,
        rb: u16,
        rd: u16,
    ) -> Option<u32> {
        let base = self.registers.register_at(rb as usize);
        let address = base.wrapping_add(u32::from(offset)) as usize;
        let rd = rd as usize;

        match load_store {
            LoadStoreKind::Load => {
                let value = self.memory.read_half_word(address);
                self.registers.set_register_at(rd, value.into());
            }
            LoadStoreKind::Store => {
                let value = self.registers.register_at(rd);
                self.memory.write_half_word(address, value as u16);
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn sp_relative_load_store(
        &mut self,
        load_store: LoadStoreKind,
        rd: u16,
        word8: u16,
    ) -> Option<u32> {
        let address = self
            .registers
            .register_at(REG_SP)
            .wrapping_add(u32::from(word8)) as usize;
        let rd = rd as usize;

        match load_store {
            LoadStoreKind::Load => {
                let value = self.memory.read_word(address);
                self.registers.set_register_at(rd, value);
            }
            LoadStoreKind::Store => {
                let value = self.registers.register_at(rd);
                self.memory.write_word(address, value);
            }
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn load_address(&mut self, sp: bool, rd: u16, offset: u32) -> Option<u32> {
        let value = if sp {
            self.registers.register_at(REG_SP).wrapping_add(offset)
        } else {
            (self.read_register(REG_PROGRAM_COUNTER as usize) & !2).wrapping_add(offset)
        };

        self.registers.set_register_at(rd as usize, value);

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn add_offset_sp(&mut self, negative: bool, word7: u16) -> Option<u32> {
        let sp = self.registers.register_at(REG_SP);
        let new_sp = if negative {
            sp.wrapping_sub(u32::from(word7))
        } else {
            sp.wrapping_add(u32::from(word7))
        };

        self.registers.set_register_at(REG_SP, new_sp);

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn push_pop_registers(
        &mut self,
        load_store: LoadStoreKind,
        pc_lr: bool,
        register_list: u16,
    ) -> Option<u32> {
        let mut sp = self.registers.register_at(REG_SP);
        let mut branch_taken = false;

        match load_store {
            LoadStoreKind::Store => {
                // Full descending stack: LR sits above the low registers.
                if pc_lr {
                    sp = sp.wrapping_sub(4);
                    self.memory
                        .write_word(sp as usize, self.registers.register_at(REG_LR));
                }

                for r in (0..8_u8).rev() {
                    if register_list.get_bit(r) {
                        sp = sp.wrapping_sub(4);
                        self.memory
                            .write_word(sp as usize, self.registers.register_at(r as usize));
                    }
                }
            }
            LoadStoreKind::Load => {
                for r in 0..8_u8 {
                    if register_list.get_bit(r) {
                        let value = self.memory.read_word(sp as usize);
                        self.registers.set_register_at(r as usize, value);
                        sp = sp.wrapping_add(4);
                    }
                }

                if pc_lr {
                    let value = self.memory.read_word(sp as usize);
                    self.registers.set_program_counter(value & !1);
                    sp = sp.wrapping_add(4);
                    branch_taken = true;
                }
            }
        }

        self.registers.set_register_at(REG_SP, sp);

        if branch_taken {
            None
        } else {
            Some(SIZE_OF_THUMB_INSTRUCTION)
        }
    }

    pub(crate) fn multiple_load_store(
        &mut self,
        load_store: LoadStoreKind,
        rb: u16,
        register_list: u16,
    ) -> Option<u32> {
        let rb = rb as usize;
        let mut address = self.registers.register_at(rb);

        match load_store {
            LoadStoreKind::Store => {
                for r in 0..8_u8 {
                    if register_list.get_bit(r) {
                        let value = self.registers.register_at(r as usize);
                        self.memory.write_word(address as usize, value);
                        address = address.wrapping_add(4);
                    }
                }
            }
            LoadStoreKind::Load => {
                for r in 0..8_u8 {
                    if register_list.get_bit(r) {
                        let value = self.memory.read_word(address as usize);
                        self.registers.set_register_at(r as usize, value);
                        address = address.wrapping_add(4);
                    }
                }
            }
        }

        // A loaded base keeps the loaded value instead of the writeback.
        let base_was_loaded =
            load_store == LoadStoreKind::Load && register_list.get_bit(rb as u8);
        if !base_was_loaded {
            self.registers.set_register_at(rb, address);
        }

        Some(SIZE_OF_THUMB_INSTRUCTION)
    }

    pub(crate) fn cond_branch(
        &mut self,
        condition: Condition,
        immediate_offset: i32,
    ) -> Option<u32> {
        if !self.cpsr.can_execute(condition) {
            return Some(SIZE_OF_THUMB_INSTRUCTION);
        }

        let pc = self.registers.program_counter();
        self.registers
            .set_program_counter(pc.wrapping_add(4).wrapping_add(immediate_offset as u32));

        None
    }

    pub(crate) fn thumb_software_interrupt(&mut self) -> Option<u32> {
        let pc = self.registers.program_counter();

        self.spsr = self.cpsr;
        self.registers
            .set_register_at(REG_LR, pc.wrapping_add(SIZE_OF_THUMB_INSTRUCTION));
        self.cpsr.set_mode(Mode::Supervisor);
        self.cpsr.set_cpu_state(CpuState::Arm);
        self.registers.set_program_counter(SWI_VECTOR);

        None
    }

    pub(crate) fn uncond_branch(&mut self, offset: u32) -> Option<u32> {
        let offset = offset.sign_extended(12);
        let pc = self.registers.program_counter();

        self.registers
            .set_program_counter(pc.wrapping_add(4).wrapping_add(offset));

        None
    }

    pub(crate) fn long_branch_link(&mut self, h: bool, offset: u32) -> Option<u32> {
        if h {
            // Second half: jump to lr plus the low part, leave the return
            // address (with bit 0 set) in lr.
            let offset = offset << 1;
            let next_instruction = self
                .registers
                .program_counter()
                .wrapping_add(SIZE_OF_THUMB_INSTRUCTION);
            let target = self.registers.register_at(REG_LR).wrapping_add(offset);

            self.registers.set_program_counter(target);
            self.registers.set_register_at(REG_LR, next_instruction | 1);

            None
        } else {
            // First half: stage the high part of the target in lr.
            let offset = (offset << 12).sign_extended(23);
            let pc = self.read_register(REG_PROGRAM_COUNTER as usize);

            self.registers
                .set_register_at(REG_LR, pc.wrapping_add(offset));

            Some(SIZE_OF_THUMB_INSTRUCTION)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cpu::arm7tdmi::Arm7tdmi;
    use crate::cpu::psr::CpuState;
    use crate::cpu::thumb::opcode::ThumbOpcode;
    use pretty_assertions::assert_eq;

    fn thumb_cpu() -> Arm7tdmi {
        let mut cpu = Arm7tdmi::default();
        cpu.cpsr.set_cpu_state(CpuState::Thumb);
        cpu
    }

    fn execute(cpu: &mut Arm7tdmi, raw: u16) -> Option<u32> {
        let op_code: ThumbOpcode = Arm7tdmi::decode(raw);
        cpu.execute_thumb(op_code).unwrap()
    }

    #[test]
    fn check_move_shifted_register() {
        // LSL R0, R1, #3
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(1, 0b101);

        let advance = execute(&mut cpu, 0b000_00_00011_001_000);

        assert_eq!(advance, Some(2));
        assert_eq!(cpu.registers.register_at(0), 0b101_000);
        assert!(!cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.zero_flag());

        // LSR R0, R1, #1 shifts the low bit into the carry.
        cpu.registers.set_register_at(1, 1);
        execute(&mut cpu, 0b000_01_00001_001_000);

        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_add_subtract() {
        // ADD R0, R1, R2
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(1, 0xFFFF_FFFF);
        cpu.registers.set_register_at(2, 1);

        execute(&mut cpu, 0b00011_0_0_010_001_000);

        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());

        // SUB R0, R1, #2 with r1=1 borrows.
        cpu.registers.set_register_at(1, 1);
        execute(&mut cpu, 0b00011_1_1_010_001_000);

        assert_eq!(cpu.registers.register_at(0), 0xFFFF_FFFF);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_move_compare_add_sub_imm() {
        let mut cpu = thumb_cpu();

        // MOV R0, #0 leaves C and V alone.
        cpu.cpsr.set_carry_flag(true);
        cpu.cpsr.set_overflow_flag(true);
        execute(&mut cpu, 0b001_00_000_00000000);

        assert!(cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.sign_flag());
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.overflow_flag());

        // CMP R0, #1 with r0=0 borrows.
        execute(&mut cpu, 0b001_01_000_00000001);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());

        // ADD R0, #255
        execute(&mut cpu, 0b001_10_000_11111111);
        assert_eq!(cpu.registers.register_at(0), 255);

        // SUB R0, #255
        execute(&mut cpu, 0b001_11_000_11111111);
        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_alu_op_logical() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(0, 0b1100);
        cpu.registers.set_register_at(1, 0b1010);

        // AND R0, R1
        execute(&mut cpu, 0b010000_0000_001_000);
        assert_eq!(cpu.registers.register_at(0), 0b1000);

        // EOR R0, R1
        execute(&mut cpu, 0b010000_0001_001_000);
        assert_eq!(cpu.registers.register_at(0), 0b0010);

        // ORR R0, R1
        execute(&mut cpu, 0b010000_1100_001_000);
        assert_eq!(cpu.registers.register_at(0), 0b1010);

        // BIC R0, R1
        execute(&mut cpu, 0b010000_1110_001_000);
        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());

        // MVN R0, R1
        execute(&mut cpu, 0b010000_1111_001_000);
        assert_eq!(cpu.registers.register_at(0), !0b1010);
        assert!(cpu.cpsr.sign_flag());
    }

    #[test]
    fn check_alu_op_shifts_by_register() {
        let mut cpu = thumb_cpu();

        // LSL R0, R1 with r1=0: value and carry untouched.
        cpu.cpsr.set_carry_flag(true);
        cpu.registers.set_register_at(0, 0x8000_0000);
        cpu.registers.set_register_at(1, 0);
        execute(&mut cpu, 0b010000_0010_001_000);

        assert_eq!(cpu.registers.register_at(0), 0x8000_0000);
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.sign_flag());

        // LSR R0, R1 with r1=32: result 0, carry = old bit 31.
        cpu.registers.set_register_at(1, 32);
        execute(&mut cpu, 0b010000_0011_001_000);

        assert_eq!(cpu.registers.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());

        // ROR R0, R1 by 4.
        cpu.registers.set_register_at(0, 0xF);
        cpu.registers.set_register_at(1, 4);
        execute(&mut cpu, 0b010000_0111_001_000);

        assert_eq!(cpu.registers.register_at(0), 0xF000_0000);
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.sign_flag());
    }

    #[test]
    fn check_alu_op_arithmetic() {
        let mut cpu = thumb_cpu();

        // ADC R0, R1 with carry set.
        cpu.cpsr.set_carry_flag(true);
        cpu.registers.set_register_at(0, 5);
        cpu.registers.set_register_at(1, 2);
        execute(&mut cpu, 0b010000_0101_001_000);
        assert_eq!(cpu.registers.register_at(0), 8);

        // NEG R0, R1.
        execute(&mut cpu, 0b010000_1001_001_000);
        assert_eq!(cpu.registers.register_at(0), (-2_i32) as u32);
        assert!(cpu.cpsr.sign_flag());

        // MUL R0, R1 updates N and Z but not C or V.
        cpu.cpsr.set_carry_flag(true);
        cpu.registers.set_register_at(0, 3);
        cpu.registers.set_register_at(1, 4);
        execute(&mut cpu, 0b010000_1101_001_000);
        assert_eq!(cpu.registers.register_at(0), 12);
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.zero_flag());

        // TST R0, R1 with disjoint bits.
        cpu.registers.set_register_at(1, 0x10);
        execute(&mut cpu, 0b010000_1000_001_000);
        assert!(cpu.cpsr.zero_flag());
        assert_eq!(cpu.registers.register_at(0), 12);

        // CMP R0, R1: 12 - 16 borrows.
        execute(&mut cpu, 0b010000_1010_001_000);
        assert!(!cpu.cpsr.carry_flag());

        // CMN R0, R1.
        execute(&mut cpu, 0b010000_1011_001_000);
        assert!(!cpu.cpsr.zero_flag());
    }

    #[test]
    fn check_hi_register_ops() {
        let mut cpu = thumb_cpu();

        // ADD R1, R8 does not set flags.
        cpu.registers.set_register_at(1, 1);
        cpu.registers.set_register_at(8, 0xFFFF_FFFF);
        execute(&mut cpu, 0b010001_00_0_1_000_001);
        assert_eq!(cpu.registers.register_at(1), 0);
        assert!(!cpu.cpsr.zero_flag());

        // CMP R1, R8 does.
        execute(&mut cpu, 0b010001_01_0_1_000_001);
        assert!(!cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.carry_flag());

        // MOV R9, R2
        cpu.registers.set_register_at(2, 42);
        execute(&mut cpu, 0b010001_10_1_0_010_001);
        assert_eq!(cpu.registers.register_at(9), 42);
    }

    #[test]
    fn check_hi_register_bx_to_arm() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(14, 0x0800_0002);

        // BX R14: bit 0 clear, back to ARM.
        let advance = execute(&mut cpu, 0b010001_11_0_1_110_000);

        assert_eq!(advance, None);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.program_counter(), 0x0800_0000);
    }

    #[test]
    fn check_pc_relative_load() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_program_counter(0x0300_0002);
        // Base is (pc + 4) & !2 = 0x03000004, plus 8.
        cpu.memory.write_word(0x0300_000C, 0xAABB_CCDD);

        // LDR R1, [PC, #8]
        execute(&mut cpu, 0b01001_001_00000010);

        assert_eq!(cpu.registers.register_at(1), 0xAABB_CCDD);
    }

    #[test]
    fn check_load_store_register_offset() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(0, 4);
        cpu.registers.set_register_at(1, 0x0300_0000);
        cpu.registers.set_register_at(2, 0x1234_5678);

        // STR R2, [R1, R0]
        execute(&mut cpu, 0b0101_00_0_000_001_010);
        assert_eq!(cpu.memory.read_word(0x0300_0004), 0x1234_5678);

        // LDRB R3, [R1, R0]
        execute(&mut cpu, 0b0101_11_0_000_001_011);
        assert_eq!(cpu.registers.register_at(3), 0x78);
    }

    #[test]
    fn check_load_store_sign_extended() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(0, 0);
        cpu.registers.set_register_at(1, 0x0300_0000);
        cpu.memory.write_half_word(0x0300_0000, 0x8001);

        // LDSH R2, [R1, R0]
        execute(&mut cpu, 0b0101_11_1_000_001_010);
        assert_eq!(cpu.registers.register_at(2), 0xFFFF_8001);

        // LDSB R2, [R1, R0]
        execute(&mut cpu, 0b0101_01_1_000_001_010);
        assert_eq!(cpu.registers.register_at(2), 1);

        // STRH R3, [R1, R0] then LDRH R4, [R1, R0]
        cpu.registers.set_register_at(3, 0xBEEF);
        execute(&mut cpu, 0b0101_00_1_000_001_011);
        execute(&mut cpu, 0b0101_10_1_000_001_100);
        assert_eq!(cpu.registers.register_at(4), 0xBEEF);
    }

    #[test]
    fn check_load_store_imm_offset() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(1, 0x0300_0000);
        cpu.registers.set_register_at(0, 0xCAFE_F00D);

        // STR R0, [R1, #12]
        execute(&mut cpu, 0b011_0_0_00011_001_000);
        assert_eq!(cpu.memory.read_word(0x0300_000C), 0xCAFE_F00D);

        // LDR R2, [R1, #12]
        execute(&mut cpu, 0b011_0_1_00011_001_010);
        assert_eq!(cpu.registers.register_at(2), 0xCAFE_F00D);

        // LDRB R2, [R1, #12]
        execute(&mut cpu, 0b011_1_1_01100_001_010);
        assert_eq!(cpu.registers.register_at(2), 0x0D);
    }

    #[test]
    fn check_load_store_halfword() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(0, 0x0300_0000);
        cpu.registers.set_register_at(1, 0x0001_8001);

        // STRH R1, [R0, #2]
        execute(&mut cpu, 0b1000_0_00001_000_001);
        assert_eq!(cpu.memory.read_half_word(0x0300_0002), 0x8001);

        // LDRH R2, [R0, #2] zero-extends.
        execute(&mut cpu, 0b1000_1_00001_000_010);
        assert_eq!(cpu.registers.register_at(2), 0x8001);
    }

    #[test]
    fn check_sp_relative_load_store() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(13, 0x0300_7F00);
        cpu.registers.set_register_at(1, 99);

        // STR R1, [SP, #8]
        execute(&mut cpu, 0b1001_0_001_00000010);
        assert_eq!(cpu.memory.read_word(0x0300_7F08), 99);

        // LDR R2, [SP, #8]
        execute(&mut cpu, 0b1001_1_010_00000010);
        assert_eq!(cpu.registers.register_at(2), 99);
    }

    #[test]
    fn check_load_address() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_program_counter(0x0800_0002);
        cpu.registers.set_register_at(13, 0x0300_7F00);

        // ADD R2, PC, #4: pc reads aligned.
        execute(&mut cpu, 0b1010_0_010_00000001);
        assert_eq!(cpu.registers.register_at(2), 0x0800_0008);

        // ADD R3, SP, #4
        execute(&mut cpu, 0b1010_1_011_00000001);
        assert_eq!(cpu.registers.register_at(3), 0x0300_7F04);
    }

    #[test]
    fn check_add_offset_sp() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(13, 0x0300_7F00);

        // SUB SP, #20
        execute(&mut cpu, 0b10110000_1_0000101);
        assert_eq!(cpu.registers.register_at(13), 0x0300_7EEC);

        // ADD SP, #20
        execute(&mut cpu, 0b10110000_0_0000101);
        assert_eq!(cpu.registers.register_at(13), 0x0300_7F00);
    }

    #[test]
    fn check_push_pop_roundtrip() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(13, 0x0300_7F00);
        for r in 0..4 {
            cpu.registers.set_register_at(r, 0x10 + r as u32);
        }

        // PUSH {R0-R3}
        execute(&mut cpu, 0b1011_0_10_0_00001111);
        assert_eq!(cpu.registers.register_at(13), 0x0300_7EF0);

        // POP {R4-R7}
        execute(&mut cpu, 0b1011_1_10_0_11110000);

        assert_eq!(cpu.registers.register_at(4), 0x10);
        assert_eq!(cpu.registers.register_at(5), 0x11);
        assert_eq!(cpu.registers.register_at(6), 0x12);
        assert_eq!(cpu.registers.register_at(7), 0x13);
        assert_eq!(cpu.registers.register_at(13), 0x0300_7F00);
    }

    #[test]
    fn check_push_lr_pop_pc() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(13, 0x0300_7F00);
        cpu.registers.set_register_at(14, 0x0800_0101);

        // PUSH {LR}
        execute(&mut cpu, 0b1011_0_10_1_00000000);
        assert_eq!(cpu.registers.register_at(13), 0x0300_7EFC);

        // POP {PC}: bit 0 masked away, branch taken, still Thumb.
        let advance = execute(&mut cpu, 0b1011_1_10_1_00000000);

        assert_eq!(advance, None);
        assert_eq!(cpu.registers.program_counter(), 0x0800_0100);
        assert_eq!(cpu.registers.register_at(13), 0x0300_7F00);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Thumb);
    }

    #[test]
    fn check_multiple_load_store() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(1, 0x0300_1000);
        cpu.registers.set_register_at(5, 55);
        cpu.registers.set_register_at(7, 77);

        // STMIA R1!, {R5, R7}
        execute(&mut cpu, 0b1100_0_001_10100000);

        assert_eq!(cpu.memory.read_word(0x0300_1000), 55);
        assert_eq!(cpu.memory.read_word(0x0300_1004), 77);
        assert_eq!(cpu.registers.register_at(1), 0x0300_1008);

        // LDMIA R1!, {R5, R7} from fresh values.
        cpu.registers.set_register_at(1, 0x0300_1000);
        cpu.memory.write_word(0x0300_1000, 500);
        cpu.memory.write_word(0x0300_1004, 700);
        execute(&mut cpu, 0b1100_1_001_10100000);

        assert_eq!(cpu.registers.register_at(5), 500);
        assert_eq!(cpu.registers.register_at(7), 700);
        assert_eq!(cpu.registers.register_at(1), 0x0300_1008);
    }

    #[test]
    fn check_ldmia_with_base_in_list_keeps_loaded_value() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_register_at(1, 0x0300_1000);
        cpu.memory.write_word(0x0300_1000, 0xAAAA);

        // LDMIA R1!, {R1}
        execute(&mut cpu, 0b1100_1_001_00000010);

        assert_eq!(cpu.registers.register_at(1), 0xAAAA);
    }

    #[test]
    fn check_cond_branch() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_program_counter(0x0800_0010);

        // BEQ #-10 with Z clear: skipped.
        let advance = execute(&mut cpu, 0b1101_0000_11111011);
        assert_eq!(advance, Some(2));
        assert_eq!(cpu.registers.program_counter(), 0x0800_0010);

        // With Z set: taken, target pc + 4 - 10.
        cpu.cpsr.set_zero_flag(true);
        let advance = execute(&mut cpu, 0b1101_0000_11111011);
        assert_eq!(advance, None);
        assert_eq!(cpu.registers.program_counter(), 0x0800_000A);
    }

    #[test]
    fn check_uncond_branch() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_program_counter(0x0800_0000);

        // B #606
        execute(&mut cpu, 0b11100_00100101111);
        assert_eq!(cpu.registers.program_counter(), 0x0800_0000 + 4 + 606);

        // B #-4 (offset11 = 0x7FE)
        cpu.registers.set_program_counter(0x0800_0010);
        execute(&mut cpu, 0b11100_11111111110);
        assert_eq!(cpu.registers.program_counter(), 0x0800_0010);
    }

    #[test]
    fn check_long_branch_link_pair() {
        let mut cpu = thumb_cpu();
        cpu.registers.set_program_counter(0x0800_0000);

        // BL first half, offset 1: lr = pc + 4 + (1 << 12).
        let advance = execute(&mut cpu, 0b1111_0_00000000001);
        assert_eq!(advance, Some(2));
        assert_eq!(cpu.registers.register_at(14), 0x0800_1004);

        // Second half at the next halfword, offset 4: target lr + 8.
        cpu.registers.set_program_counter(0x0800_0002);
        let advance = execute(&mut cpu, 0b1111_1_00000000100);

        assert_eq!(advance, None);
        assert_eq!(cpu.registers.program_counter(), 0x0800_100C);
        // Return address points past the pair, with bit 0 set.
        assert_eq!(cpu.registers.register_at(14), 0x0800_0005);
    }

    #[test]
    fn check_thumb_swi() {
        use crate::cpu::cpu_modes::Mode;

        let mut cpu = thumb_cpu();
        cpu.cpsr.set_carry_flag(true);
        cpu.registers.set_program_counter(0x0800_0010);

        // SWI #42
        let advance = execute(&mut cpu, 0b1101_1111_00101010);

        assert_eq!(advance, None);
        assert_eq!(cpu.registers.register_at(14), 0x0800_0012);
        assert_eq!(cpu.registers.program_counter(), 0x08);
        assert_eq!(cpu.cpsr.mode(), Mode::Supervisor);
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert!(cpu.spsr.carry_flag());
        assert_eq!(cpu.spsr.cpu_state(), CpuState::Thumb);
    }
}

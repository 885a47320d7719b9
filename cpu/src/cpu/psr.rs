//! # Program status registers (CPSR and SPSR)
//!
//! ```text
//! 31 30 29 28 27        6 5 4   0
//! ┌──┬──┬──┬──┬───────────┬─┬─────┐
//! │N │Z │C │V │ Reserved  │T│Mode │
//! └──┴──┴──┴──┴───────────┴─┴─────┘
//! ```
//!
//! - **Flags (31-28)**: set by data-processing instructions, tested by the
//!   condition evaluator.
//! - **T bit (5)**: instruction state, 0 for ARM and 1 for Thumb. This is the
//!   canonical ARMv4 position of the T bit.
//! - **Mode (4-0)**: operating mode, see [`Mode`].
//!
//! Mutating one field never disturbs the others; reserved bits are carried
//! through untouched.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::alu::AluResult;
use crate::cpu::{condition::Condition, cpu_modes::Mode};

/// A program status register, used for both the CPSR and the SPSR.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr(u32);

impl Psr {
    /// Evaluates a condition code against the current flags.
    pub(crate) fn can_execute(self, cond: Condition) -> bool {
        use Condition::{AL, CC, CS, EQ, GE, GT, HI, LE, LS, LT, MI, NE, NV, PL, VC, VS};
        match cond {
            EQ => self.zero_flag(),
            NE => !self.zero_flag(),
            CS => self.carry_flag(),
            CC => !self.carry_flag(),
            MI => self.sign_flag(),
            PL => !self.sign_flag(),
            VS => self.overflow_flag(),
            VC => !self.overflow_flag(),
            HI => self.carry_flag() && !self.zero_flag(),
            LS => !self.carry_flag() || self.zero_flag(),
            GE => self.sign_flag() == self.overflow_flag(),
            LT => self.sign_flag() != self.overflow_flag(),
            GT => !self.zero_flag() && (self.sign_flag() == self.overflow_flag()),
            LE => self.zero_flag() || (self.sign_flag() != self.overflow_flag()),
            AL => true,
            NV => false,
        }
    }

    /// N => Bit 31, set when the result is negative.
    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    /// Z => Bit 30, set when the result is zero.
    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    /// C => Bit 29, carry out of the shifter or ALU; for subtraction it
    /// means "no borrow".
    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    /// V => Bit 28, signed overflow.
    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    /// T => Bit 5, the instruction state: 0 for ARM, 1 for Thumb.
    #[must_use]
    pub fn state_bit(self) -> bool {
        self.0.get_bit(5)
    }

    /// M4-M0 => Bits 4-0.
    ///
    /// Hosts occasionally write invalid mode patterns (such as 0) into a PSR
    /// image; those read back as Supervisor rather than poisoning the core.
    #[must_use]
    pub fn mode(self) -> Mode {
        let mode_bits = self.0 & 0b11111;
        Mode::try_from(mode_bits).unwrap_or_else(|_| {
            tracing::debug!(
                "invalid mode bits 0b{:05b} in PSR={:#010X}, defaulting to Supervisor",
                mode_bits,
                self.0
            );
            Mode::Supervisor
        })
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    /// Applies all four flags of an ALU result at once.
    pub fn set_flags(&mut self, op_result: AluResult) {
        self.set_carry_flag(op_result.carry);
        self.set_zero_flag(op_result.zero);
        self.set_sign_flag(op_result.sign);
        self.set_overflow_flag(op_result.overflow);
    }

    pub fn set_state_bit(&mut self, value: bool) {
        self.0.set_bit(5, value);
    }

    /// Writes the mode field from raw bits without validating them.
    pub fn set_mode_raw(&mut self, m: u32) {
        self.0 = (self.0 & !0b11111) | (m & 0b11111);
    }

    pub fn set_mode(&mut self, m: Mode) {
        self.set_mode_raw(m as u32);
    }

    #[must_use]
    pub fn cpu_state(self) -> CpuState {
        self.state_bit().into()
    }

    pub fn set_cpu_state(&mut self, state: CpuState) {
        self.set_state_bit(state.into());
    }
}

impl From<Mode> for Psr {
    fn from(m: Mode) -> Self {
        let mut s = Self(0);

        s.set_mode(m);

        s
    }
}

impl From<Psr> for u32 {
    fn from(p: Psr) -> Self {
        p.0
    }
}

impl From<u32> for Psr {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// The instruction state, controlled by the T bit. `BX Rn` switches state
/// based on bit 0 of the target address.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum CpuState {
    /// 16-bit instructions.
    Thumb,
    /// 32-bit instructions.
    Arm,
}

impl From<CpuState> for bool {
    fn from(state: CpuState) -> Self {
        match state {
            CpuState::Arm => false,
            CpuState::Thumb => true,
        }
    }
}

impl From<bool> for CpuState {
    fn from(state: bool) -> Self {
        if state {
            Self::Thumb
        } else {
            Self::Arm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_flags() {
        let mut cpsr = Psr::default();

        cpsr.set_sign_flag(true);
        assert!(cpsr.sign_flag());

        cpsr.set_zero_flag(true);
        assert!(cpsr.zero_flag());

        cpsr.set_carry_flag(true);
        assert!(cpsr.carry_flag());

        cpsr.set_overflow_flag(true);
        assert!(cpsr.overflow_flag());

        assert_eq!(u32::from(cpsr), 0xF000_0000);
    }

    #[test]
    fn flag_mutation_preserves_other_bits() {
        let mut cpsr = Psr::from(0xFFFF_FFFF);

        cpsr.set_zero_flag(false);
        assert_eq!(u32::from(cpsr), 0xBFFF_FFFF);

        cpsr.set_zero_flag(true);
        assert_eq!(u32::from(cpsr), 0xFFFF_FFFF);

        let mut cpsr = Psr::from(Mode::System);
        cpsr.set_carry_flag(true);
        assert_eq!(cpsr.mode(), Mode::System);
    }

    #[test]
    fn check_state_bit() {
        let mut cpsr = Psr::default();
        assert_eq!(cpsr.cpu_state(), CpuState::Arm);

        cpsr.set_cpu_state(CpuState::Thumb);
        assert!(cpsr.state_bit());
        assert_eq!(u32::from(cpsr), 0b10_0000);
    }

    #[test]
    fn check_modes() {
        for (mode, bits) in [
            (Mode::User, 0b10000),
            (Mode::Fiq, 0b10001),
            (Mode::Irq, 0b10010),
            (Mode::Supervisor, 0b10011),
            (Mode::Abort, 0b10111),
            (Mode::Undefined, 0b11011),
            (Mode::System, 0b11111),
        ] {
            let mut cpsr = Psr::default();
            cpsr.set_mode(mode);
            assert_eq!(u32::from(cpsr) & 0b11111, bits);
            assert_eq!(cpsr.mode(), mode);
        }
    }

    #[test]
    fn invalid_mode_reads_as_supervisor() {
        let cpsr = Psr::from(0b00000_u32);
        assert_eq!(cpsr.mode(), Mode::Supervisor);
    }

    #[test]
    fn condition_table_is_complete() {
        use Condition::*;

        // Every 4-bit condition against every flag nibble.
        for nibble in 0..=0xF_u32 {
            let cpsr = Psr::from(nibble << 28);
            let (n, z, c, v) = (
                cpsr.sign_flag(),
                cpsr.zero_flag(),
                cpsr.carry_flag(),
                cpsr.overflow_flag(),
            );

            for raw_cond in 0..=0xF_u8 {
                let cond = Condition::from(raw_cond);
                let expected = match cond {
                    EQ => z,
                    NE => !z,
                    CS => c,
                    CC => !c,
                    MI => n,
                    PL => !n,
                    VS => v,
                    VC => !v,
                    HI => c && !z,
                    LS => !c || z,
                    GE => n == v,
                    LT => n != v,
                    GT => !z && n == v,
                    LE => z || n != v,
                    AL => true,
                    NV => false,
                };

                assert_eq!(
                    cpsr.can_execute(cond),
                    expected,
                    "cond {cond:?} with flags N={n} Z={z} C={c} V={v}"
                );
            }
        }
    }
}

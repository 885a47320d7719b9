//! # Operating modes
//!
//! The ARM7TDMI defines seven operating modes, encoded in bits 4:0 of the
//! CPSR. This core keeps a single flat register bank for all of them, so a
//! mode switch only rewrites the mode field; it still tracks the current
//! mode because the MSR restriction and the SWI entry depend on it.
//!
//! ```text
//! ┌─────────────┬──────────┬───────────────────────────────────────────────┐
//! │    Mode     │  Binary  │                  Purpose                      │
//! ├─────────────┼──────────┼───────────────────────────────────────────────┤
//! │ User        │  10000   │ Normal program execution (unprivileged)       │
//! │ FIQ         │  10001   │ Fast interrupt handling                       │
//! │ IRQ         │  10010   │ General interrupt handling                    │
//! │ Supervisor  │  10011   │ Protected mode (entered via SWI)              │
//! │ Abort       │  10111   │ Memory access failures                        │
//! │ Undefined   │  11011   │ Undefined instruction handling                │
//! │ System      │  11111   │ Privileged mode sharing User registers        │
//! └─────────────┴──────────┴───────────────────────────────────────────────┘
//! ```
//!
//! User is the only unprivileged mode: User-mode code may only change the
//! condition flags of the CPSR, never the control bits.

use serde::{Deserialize, Serialize};

/// The CPU operating mode, stored in bits 4:0 of the CPSR/SPSR.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Mode {
    /// Normal program execution (unprivileged).
    User = 0b10000,

    /// Fast interrupt request mode.
    Fiq = 0b10001,

    /// Interrupt request mode.
    Irq = 0b10010,

    /// Privileged mode entered via Reset or SWI.
    Supervisor = 0b10011,

    /// Entered after a failed memory access.
    Abort = 0b10111,

    /// Entered when the CPU hits an instruction it does not recognize.
    Undefined = 0b11011,

    /// Privileged, but shares the User register bank.
    System = 0b11111,
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            _ => Err(String::from("Unexpected value for Mode")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrip_all_modes() {
        for mode in [
            Mode::User,
            Mode::Fiq,
            Mode::Irq,
            Mode::Supervisor,
            Mode::Abort,
            Mode::Undefined,
            Mode::System,
        ] {
            let raw: u32 = mode.into();
            assert_eq!(Mode::try_from(raw), Ok(mode));
        }
    }

    #[test]
    fn invalid_mode_bits_are_rejected() {
        assert!(Mode::try_from(0).is_err());
        assert!(Mode::try_from(0b00111).is_err());
    }
}

use serde::{Deserialize, Serialize};

/// First address past the mapped space; execution halts when the program
/// counter reaches it.
pub const DEFAULT_PC_CEILING: u32 = 0x0E01_0000;

/// Knobs for a run of the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Address of the first fetch. 0 boots from the BIOS reset vector;
    /// 0x08000000 starts directly in cartridge ROM.
    pub initial_pc: u32,

    /// Execution halts once the program counter reaches this address.
    pub pc_ceiling: u32,

    /// How many of the most recent instructions the trace window retains.
    pub trace_capacity: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            initial_pc: 0,
            pc_ceiling: DEFAULT_PC_CEILING,
            trace_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_boots_from_reset_vector() {
        let config = ExecutionConfig::default();
        assert_eq!(config.initial_pc, 0);
        assert_eq!(config.pc_ceiling, DEFAULT_PC_CEILING);
    }
}

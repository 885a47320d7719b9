pub mod alu;
pub mod instruction;
pub mod opcode;
pub mod operations;

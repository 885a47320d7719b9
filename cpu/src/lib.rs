//! # Satsuma CPU core
//!
//! An interpretive core for the ARMv4T instruction set as used by the Game
//! Boy Advance: fetch, decode and execute over a flat memory image, updating
//! the register file until a termination condition is reached.
//!
//! ## Quick start
//!
//! ```ignore
//! use cpu::cpu::arm7tdmi::Arm7tdmi;
//! use cpu::memory::internal_memory::InternalMemory;
//!
//! let bios: [u8; 0x4000] = std::fs::read("gba_bios.bin")?.try_into().unwrap();
//! let rom = std::fs::read("game.gba")?;
//!
//! let mut cpu = Arm7tdmi::new(InternalMemory::new(bios, rom));
//! let termination = cpu.run();
//! ```
//!
//! The core is single-threaded and synchronous: every instruction runs to
//! completion before the next fetch, and memory effects are visible to the
//! following instruction. Multi-byte memory accesses assume a little-endian
//! layout.
//!
//! ## Module overview
//!
//! | Module          | Description                                  |
//! |-----------------|----------------------------------------------|
//! | [`cpu`]         | ARM7TDMI state and both instruction sets     |
//! | [`memory`]      | The GBA address map over flat buffers        |
//! | [`bitwise`]     | Bit-level helpers shared by the decoders     |
//! | [`ring_buffer`] | Bounded window used by the execution trace   |

#[allow(clippy::cast_possible_truncation)]
pub mod bitwise;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
pub mod cpu;

pub mod memory;
pub mod ring_buffer;

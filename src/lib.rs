pub mod constants;
mod cpu;
mod disasm;
mod error;
mod isa;
mod vm;

use constants::DISPLAY_BUFFER_SIZE;

/// Read-only view of the 64x32 display cells, row-major.
/// Translating cells into pixels or characters is the host's job.
pub type Chip8DisplayBuffer<'a> = &'a [bool; DISPLAY_BUFFER_SIZE];

pub mod prelude {
    pub use super::{
        cpu::{Chip8Cpu, MachineSnapshot},
        disasm::{render, Disassembler},
        error::{Chip8Error, Chip8Result},
        isa::{decode, Args, ArgRule, Field, InstructionDef, Opcode, INSTRUCTIONS},
        vm::{Chip8Conf, Chip8Vm},
        Chip8DisplayBuffer,
    };
}

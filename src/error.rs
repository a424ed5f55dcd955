//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::cpu::MachineSnapshot;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

/// Faults raised by the interpreter.
///
/// Step faults are unrecoverable at the instruction level and carry a
/// [`MachineSnapshot`] so the host can dump the machine post-mortem.
#[derive(Debug)]
pub enum Chip8Error {
    /// Program counter exceeds the last valid instruction slot.
    Bounds(Box<MachineSnapshot>),
    /// Fetched opcode matches no entry in the instruction table.
    Decode(Box<MachineSnapshot>),
    /// CALL with all 16 stack slots in use.
    StackOverflow(Box<MachineSnapshot>),
    /// RET with an empty call stack.
    StackUnderflow(Box<MachineSnapshot>),
    /// Attempt to load a program that can't fit in memory.
    ProgramTooLarge { size: usize },
    Fmt(fmt::Error),
}

impl Chip8Error {
    /// The machine snapshot attached to a step fault, if any.
    pub fn snapshot(&self) -> Option<&MachineSnapshot> {
        match self {
            Self::Bounds(snapshot)
            | Self::Decode(snapshot)
            | Self::StackOverflow(snapshot)
            | Self::StackUnderflow(snapshot) => Some(snapshot),
            Self::ProgramTooLarge { .. } | Self::Fmt(_) => None,
        }
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounds(snapshot) => {
                write!(f, "program counter {:04X} out of bounds", snapshot.pc)
            }
            Self::Decode(snapshot) => {
                write!(f, "unknown opcode {:04X}", snapshot.opcode)
            }
            Self::StackOverflow(snapshot) => {
                write!(f, "call stack overflow at {:04X}", snapshot.pc)
            }
            Self::StackUnderflow(snapshot) => {
                write!(f, "call stack underflow at {:04X}", snapshot.pc)
            }
            Self::ProgramTooLarge { size } => {
                write!(f, "program of {size} bytes too large for VM memory")
            }
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

//! Disassembler.
//!
//! Renders raw opcodes as mnemonics by substituting the operand
//! placeholders of the instruction table's display templates with
//! hexadecimal values.
use std::fmt::{self, Write as FmtWrite};

use crate::isa::{self, Field, InstructionDef};

/// Substitute the operand placeholders in `def`'s display template
/// with the values extracted from `opcode`, formatted as hexadecimal.
pub fn render(def: &InstructionDef, opcode: u16) -> String {
    let args = def.args(opcode);
    let mut text = def.template.to_string();

    for rule in def.args {
        let value = match rule.field {
            Field::X => format!("{:X}", args.x),
            Field::Y => format!("{:X}", args.y),
            Field::N => format!("{:X}", args.n),
            Field::Kk => format!("{:02X}", args.kk),
            Field::Nnn => format!("{:03X}", args.nnn),
        };
        text = text.replacen(rule.field.placeholder(), &value, 1);
    }

    text
}

/// Walks a bytecode slice two bytes at a time, writing one mnemonic
/// line per instruction word.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    /// Disassemble the whole slice into a human readable listing.
    pub fn dump(mut self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        while self.cursor + 1 < self.bytecode.len() {
            self.disassemble(&mut buf)?;
            self.cursor += 2;
        }
        Ok(buf)
    }

    /// Write the instruction at the cursor to the given writer.
    ///
    /// Words that match no instruction definition are rendered as
    /// raw data.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        let opcode =
            u16::from_be_bytes([self.bytecode[self.cursor], self.bytecode[self.cursor + 1]]);

        match isa::decode(opcode) {
            Some(def) => writeln!(w, "{:04X}: {:04X}  {}", self.cursor, opcode, render(def, opcode)),
            None => writeln!(w, "{:04X}: {:04X}  .data", self.cursor, opcode),
        }
    }
}

//! Instruction table and decoder.
//!
//! Every instruction family is described by one [`InstructionDef`]
//! record: a tag, a display template, a mask/pattern pair used to
//! recognize the opcode, and the rules for pulling operand fields
//! out of the raw 16-bit word.

/// Identity of a decoded instruction. One variant per table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 00E0 - clear the display.
    Cls,
    /// Annn - load address into I.
    LdIAddr,
    /// 6xkk - load byte into Vx.
    LdVxByte,
    /// Dxyn - draw n-row sprite from memory[I] at (Vx, Vy).
    Drw,
    /// 7xkk - add byte to Vx, no carry flag.
    AddVxByte,
    /// 1nnn - jump to address.
    JpAddr,
    /// 3xkk - skip next if Vx == kk.
    SeVxByte,
    /// 4xkk - skip next if Vx != kk.
    SneVxByte,
    /// 5xy0 - skip next if Vx == Vy.
    SeVxVy,
    /// 9xy0 - skip next if Vx != Vy.
    SneVxVy,
    /// 2nnn - call subroutine.
    CallAddr,
    /// 00EE - return from subroutine.
    Ret,
    /// 8xy0 - copy Vy into Vx.
    LdVxVy,
    /// 8xy1 - bitwise OR into Vx.
    OrVxVy,
    /// 8xy2 - bitwise AND into Vx.
    AndVxVy,
    /// 8xy3 - bitwise XOR into Vx.
    XorVxVy,
    /// 8xy4 - add Vy to Vx, VF is carry.
    AddVxVy,
    /// 8xy5 - subtract Vy from Vx, VF is no-borrow.
    SubVxVy,
    /// 8xy6 - shift Vx right, VF is the shifted out bit.
    ShrVx,
    /// 8xyE - shift Vx left, VF is the shifted out bit.
    ShlVx,
    /// Fx15 - load Vx into the delay timer.
    LdDtVx,
    /// Fx55 - store V0..Vx into memory at I.
    StoreRegs,
    /// Fx65 - load memory at I into V0..Vx.
    LoadRegs,
    /// Fx33 - store the decimal digits of Vx at I, I+1, I+2.
    LdBVx,
    /// 8xy7 - subtract Vx from Vy into Vx, VF is no-borrow.
    SubnVxVy,
    /// Fx29 - point I at the builtin glyph for digit Vx.
    LdFVx,
    /// Fx1E - add Vx to I.
    AddIVx,
}

/// Operand fields an instruction may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Register index, high nibble of the low byte pair.
    X,
    /// Register index, second operand.
    Y,
    /// Nibble sized count.
    N,
    /// 12-bit address or literal.
    Nnn,
    /// 8-bit literal.
    Kk,
}

impl Field {
    /// Placeholder text used in display templates.
    pub fn placeholder(self) -> &'static str {
        match self {
            Field::X => "x",
            Field::Y => "y",
            Field::N => "n",
            Field::Nnn => "nnn",
            Field::Kk => "kk",
        }
    }
}

/// Rule for extracting one operand field from an opcode.
#[derive(Debug, Clone, Copy)]
pub struct ArgRule {
    pub field: Field,
    pub mask: u16,
    pub shift: u16,
}

const X: ArgRule = ArgRule { field: Field::X, mask: 0x0F00, shift: 8 };
const Y: ArgRule = ArgRule { field: Field::Y, mask: 0x00F0, shift: 4 };
const N: ArgRule = ArgRule { field: Field::N, mask: 0x000F, shift: 0 };
const KK: ArgRule = ArgRule { field: Field::Kk, mask: 0x00FF, shift: 0 };
const NNN: ArgRule = ArgRule { field: Field::Nnn, mask: 0x0FFF, shift: 0 };

/// Static description of one instruction family.
#[derive(Debug)]
pub struct InstructionDef {
    pub op: Opcode,
    /// Human readable mnemonic with operand placeholders,
    /// e.g. `"LD Vx,kk"`.
    pub template: &'static str,
    pub mask: u16,
    pub pattern: u16,
    pub args: &'static [ArgRule],
}

/// Operand values extracted from an opcode. Fields the
/// instruction does not carry stay zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Args {
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub kk: u8,
    pub nnn: u16,
}

impl InstructionDef {
    /// Extract this instruction's operand values from a raw opcode.
    pub fn args(&self, opcode: u16) -> Args {
        let mut args = Args::default();
        for rule in self.args {
            let value = (opcode & rule.mask) >> rule.shift;
            match rule.field {
                Field::X => args.x = value as u8,
                Field::Y => args.y = value as u8,
                Field::N => args.n = value as u8,
                Field::Kk => args.kk = value as u8,
                Field::Nnn => args.nnn = value,
            }
        }
        args
    }

    /// Build the opcode that decodes back to this instruction with
    /// the given operand values. Inverse of [`InstructionDef::args`].
    pub fn encode(&self, args: &Args) -> u16 {
        let mut opcode = self.pattern;
        for rule in self.args {
            let value = match rule.field {
                Field::X => args.x as u16,
                Field::Y => args.y as u16,
                Field::N => args.n as u16,
                Field::Kk => args.kk as u16,
                Field::Nnn => args.nnn,
            };
            opcode |= (value << rule.shift) & rule.mask;
        }
        opcode
    }
}

/// The instruction catalog.
///
/// Entries with full-word masks come before the nibble-keyed
/// families they would otherwise shadow, although the mask/pattern
/// pairs are mutually selective for every valid opcode.
pub static INSTRUCTIONS: [InstructionDef; 27] = [
    InstructionDef { op: Opcode::Cls, template: "CLS", mask: 0xFFFF, pattern: 0x00E0, args: &[] },
    InstructionDef { op: Opcode::LdIAddr, template: "LD I,nnn", mask: 0xF000, pattern: 0xA000, args: &[NNN] },
    InstructionDef { op: Opcode::LdVxByte, template: "LD Vx,kk", mask: 0xF000, pattern: 0x6000, args: &[X, KK] },
    InstructionDef { op: Opcode::Drw, template: "DRW Vx,Vy,n", mask: 0xF000, pattern: 0xD000, args: &[X, Y, N] },
    InstructionDef { op: Opcode::AddVxByte, template: "ADD Vx,kk", mask: 0xF000, pattern: 0x7000, args: &[X, KK] },
    InstructionDef { op: Opcode::JpAddr, template: "JP nnn", mask: 0xF000, pattern: 0x1000, args: &[NNN] },
    InstructionDef { op: Opcode::SeVxByte, template: "SE Vx,kk", mask: 0xF000, pattern: 0x3000, args: &[X, KK] },
    InstructionDef { op: Opcode::SneVxByte, template: "SNE Vx,kk", mask: 0xF000, pattern: 0x4000, args: &[X, KK] },
    InstructionDef { op: Opcode::SeVxVy, template: "SE Vx,Vy", mask: 0xF00F, pattern: 0x5000, args: &[X, Y] },
    InstructionDef { op: Opcode::SneVxVy, template: "SNE Vx,Vy", mask: 0xF00F, pattern: 0x9000, args: &[X, Y] },
    InstructionDef { op: Opcode::CallAddr, template: "CALL nnn", mask: 0xF000, pattern: 0x2000, args: &[NNN] },
    InstructionDef { op: Opcode::Ret, template: "RET", mask: 0xFFFF, pattern: 0x00EE, args: &[] },
    InstructionDef { op: Opcode::LdVxVy, template: "LD Vx,Vy", mask: 0xF00F, pattern: 0x8000, args: &[X, Y] },
    InstructionDef { op: Opcode::OrVxVy, template: "OR Vx,Vy", mask: 0xF00F, pattern: 0x8001, args: &[X, Y] },
    InstructionDef { op: Opcode::AndVxVy, template: "AND Vx,Vy", mask: 0xF00F, pattern: 0x8002, args: &[X, Y] },
    InstructionDef { op: Opcode::XorVxVy, template: "XOR Vx,Vy", mask: 0xF00F, pattern: 0x8003, args: &[X, Y] },
    InstructionDef { op: Opcode::AddVxVy, template: "ADD Vx,Vy", mask: 0xF00F, pattern: 0x8004, args: &[X, Y] },
    InstructionDef { op: Opcode::SubVxVy, template: "SUB Vx,Vy", mask: 0xF00F, pattern: 0x8005, args: &[X, Y] },
    InstructionDef { op: Opcode::ShrVx, template: "SHR Vx,Vy", mask: 0xF00F, pattern: 0x8006, args: &[X, Y] },
    InstructionDef { op: Opcode::ShlVx, template: "SHL Vx,Vy", mask: 0xF00F, pattern: 0x800E, args: &[X, Y] },
    InstructionDef { op: Opcode::LdDtVx, template: "LD DT,Vx", mask: 0xF0FF, pattern: 0xF015, args: &[X] },
    InstructionDef { op: Opcode::StoreRegs, template: "LD [I],Vx", mask: 0xF0FF, pattern: 0xF055, args: &[X] },
    InstructionDef { op: Opcode::LoadRegs, template: "LD Vx,[I]", mask: 0xF0FF, pattern: 0xF065, args: &[X] },
    InstructionDef { op: Opcode::LdBVx, template: "LD B,Vx", mask: 0xF0FF, pattern: 0xF033, args: &[X] },
    InstructionDef { op: Opcode::SubnVxVy, template: "SUBN Vx,Vy", mask: 0xF00F, pattern: 0x8007, args: &[X, Y] },
    InstructionDef { op: Opcode::LdFVx, template: "LD F,Vx", mask: 0xF0FF, pattern: 0xF029, args: &[X] },
    InstructionDef { op: Opcode::AddIVx, template: "ADD I,Vx", mask: 0xF0FF, pattern: 0xF01E, args: &[X] },
];

/// Match a raw opcode against the catalog, returning the first
/// definition whose masked bits equal its pattern.
pub fn decode(opcode: u16) -> Option<&'static InstructionDef> {
    INSTRUCTIONS.iter().find(|def| opcode & def.mask == def.pattern)
}

//! Virtual machine.
use std::fmt::{self, Write as FmtWrite};

use log::{debug, trace};

use crate::{
    constants::*,
    cpu::Chip8Cpu,
    disasm,
    error::{Chip8Error, Chip8Result},
    isa::{self, Args, InstructionDef, Opcode},
    Chip8DisplayBuffer,
};

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
pub struct Chip8Conf {
    /// Reproduce the legacy draw collision flag, where VF reflects
    /// only the last sprite bit examined instead of any collision
    /// in the whole sprite.
    ///
    /// Off by default; the canonical instruction set defines the
    /// any-collision behavior.
    pub legacy_collision: bool,
}

/// A single CHIP-8 machine: owns the machine state and advances it
/// one instruction per [`Chip8Vm::step`] call.
///
/// The host owns the execution loop, pacing and all I/O. The VM never
/// blocks and performs no I/O of its own.
pub struct Chip8Vm {
    cpu: Chip8Cpu,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Borrow the machine state, e.g. for register and timer access.
    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    /// Mutably borrow the machine state. Intended for the host's
    /// timer countdown and for diagnostics; must not be interleaved
    /// with stepping.
    pub fn cpu_mut(&mut self) -> &mut Chip8Cpu {
        &mut self.cpu
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer {
        &self.cpu.display
    }
}

/// Loader
impl Chip8Vm {
    /// Initialize the machine for a program image: reset all state,
    /// write the builtin glyph sprites to the font area and copy the
    /// image byte-for-byte to `0x200`.
    ///
    /// The image contents are not validated; an invalid opcode only
    /// surfaces when a later [`Chip8Vm::step`] decodes it.
    pub fn load_rom(&mut self, image: &[u8]) -> Chip8Result<()> {
        if image.len() > MEM_SIZE - MEM_START {
            return Err(Chip8Error::ProgramTooLarge { size: image.len() });
        }

        // Start with clean memory to avoid leaking a previous program.
        self.cpu.reset();

        self.cpu.ram[FONTSET_START..FONTSET_START + FONTSET.len()].copy_from_slice(&FONTSET);
        self.cpu.ram[MEM_START..MEM_START + image.len()].copy_from_slice(image);

        debug!("loaded {} byte program at {MEM_START:04X}", image.len());

        Ok(())
    }

    /// Load a program given as 16-bit big-endian words, the native
    /// shape of a CHIP-8 image. Each word lands most-significant
    /// byte first.
    pub fn load_words(&mut self, words: &[u16]) -> Chip8Result<()> {
        let mut image = Vec::with_capacity(words.len() * 2);
        for word in words {
            image.extend_from_slice(&word.to_be_bytes());
        }
        self.load_rom(&image)
    }
}

/// Interpreter
impl Chip8Vm {
    /// Advance the machine by exactly one instruction.
    ///
    /// A fault leaves the machine state untouched for that step; the
    /// host decides whether to halt, reset or surface the error.
    pub fn step(&mut self) -> Chip8Result<()> {
        let opcode = self.fetch()?;

        let def = match isa::decode(opcode) {
            Some(def) => def,
            None => {
                // Rewind the fetch so a failed step has no effect.
                self.cpu.pc -= 2;
                return Err(Chip8Error::Decode(Box::new(self.cpu.snapshot(opcode))));
            }
        };

        trace!("{:04X}: {}", self.cpu.pc - 2, disasm::render(def, opcode));

        self.execute(opcode, def)
    }

    /// Run up to `step_count` instructions, stopping at the first fault.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<()> {
        for _ in 0..step_count {
            self.step()?;
        }
        Ok(())
    }

    /// Read the big-endian word at the program counter and advance
    /// past it. Advancing is an inseparable part of fetching; handlers
    /// only adjust the program counter for jumps, skips and returns.
    fn fetch(&mut self) -> Chip8Result<u16> {
        let pc = self.cpu.pc;
        if pc > LAST_INSTR_ADDR {
            return Err(Chip8Error::Bounds(Box::new(self.cpu.snapshot(0))));
        }

        let opcode = u16::from_be_bytes([
            self.cpu.ram[pc as usize],
            self.cpu.ram[pc as usize + 1],
        ]);
        self.cpu.pc = pc + 2;

        Ok(opcode)
    }

    /// Dispatch on the decoded instruction tag.
    fn execute(&mut self, opcode: u16, def: &'static InstructionDef) -> Chip8Result<()> {
        let Args { x, y, n, kk, nnn } = def.args(opcode);
        let (x, y) = (x as usize, y as usize);

        match def.op {
            // 00E0 (CLS)
            //
            // Clear display.
            Opcode::Cls => {
                self.cpu.clear_display();
            }
            // 1nnn (JP addr)
            //
            // Jump to address, replacing the program counter.
            Opcode::JpAddr => {
                self.cpu.pc = nnn;
            }
            // 2nnn (CALL addr)
            //
            // Push the post-fetch program counter, then jump.
            Opcode::CallAddr => {
                if self.cpu.sp >= STACK_SIZE as i8 - 1 {
                    return Err(Chip8Error::StackOverflow(Box::new(self.cpu.snapshot(opcode))));
                }
                self.cpu.sp += 1;
                self.cpu.stack[self.cpu.sp as usize] = self.cpu.pc;
                self.cpu.pc = nnn;
            }
            // 00EE (RET)
            //
            // Return from a subroutine: pop the return address into
            // the program counter.
            Opcode::Ret => {
                if self.cpu.sp < 0 {
                    return Err(Chip8Error::StackUnderflow(Box::new(self.cpu.snapshot(opcode))));
                }
                self.cpu.pc = self.cpu.stack[self.cpu.sp as usize];
                self.cpu.sp -= 1;
            }
            // 3xkk (SE Vx, byte)
            Opcode::SeVxByte => {
                if self.cpu.registers[x] == kk {
                    self.cpu.pc += 2;
                }
            }
            // 4xkk (SNE Vx, byte)
            Opcode::SneVxByte => {
                if self.cpu.registers[x] != kk {
                    self.cpu.pc += 2;
                }
            }
            // 5xy0 (SE Vx, Vy)
            Opcode::SeVxVy => {
                if self.cpu.registers[x] == self.cpu.registers[y] {
                    self.cpu.pc += 2;
                }
            }
            // 9xy0 (SNE Vx, Vy)
            Opcode::SneVxVy => {
                if self.cpu.registers[x] != self.cpu.registers[y] {
                    self.cpu.pc += 2;
                }
            }
            // 6xkk (LD Vx, byte)
            Opcode::LdVxByte => {
                self.cpu.registers[x] = kk;
            }
            // 8xy0 (LD Vx, Vy)
            Opcode::LdVxVy => {
                self.cpu.registers[x] = self.cpu.registers[y];
            }
            // Annn (LD I, addr)
            Opcode::LdIAddr => {
                self.cpu.index = nnn;
            }
            // 7xkk (ADD Vx, byte)
            //
            // Wrapping add. The carry flag is not touched.
            Opcode::AddVxByte => {
                self.cpu.registers[x] = self.cpu.registers[x].wrapping_add(kk);
            }
            // 8xy4 (ADD Vx, Vy)
            //
            // Wrapping add; VF is 1 when the unsigned sum exceeds 255.
            Opcode::AddVxVy => {
                let sum = self.cpu.registers[x] as u16 + self.cpu.registers[y] as u16;
                self.cpu.registers[x] = sum as u8;
                self.cpu.registers[0xF] = (sum > 0xFF) as u8;
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // Wrapping subtract; VF is 1 when there was no borrow,
            // judged before the subtraction.
            Opcode::SubVxVy => {
                let (vx, vy) = (self.cpu.registers[x], self.cpu.registers[y]);
                self.cpu.registers[x] = vx.wrapping_sub(vy);
                self.cpu.registers[0xF] = (vx > vy) as u8;
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // Vx becomes Vy - Vx; VF is 1 when there was no borrow.
            Opcode::SubnVxVy => {
                let (vx, vy) = (self.cpu.registers[x], self.cpu.registers[y]);
                self.cpu.registers[x] = vy.wrapping_sub(vx);
                self.cpu.registers[0xF] = (vy > vx) as u8;
            }
            // 8xy1 (OR Vx, Vy)
            Opcode::OrVxVy => {
                self.cpu.registers[x] |= self.cpu.registers[y];
            }
            // 8xy2 (AND Vx, Vy)
            Opcode::AndVxVy => {
                self.cpu.registers[x] &= self.cpu.registers[y];
            }
            // 8xy3 (XOR Vx, Vy)
            Opcode::XorVxVy => {
                self.cpu.registers[x] ^= self.cpu.registers[y];
            }
            // 8xy6 (SHR Vx)
            //
            // VF receives the shifted out bit. Vy is decoded but unused.
            Opcode::ShrVx => {
                let vx = self.cpu.registers[x];
                self.cpu.registers[x] = vx >> 1;
                self.cpu.registers[0xF] = vx & 1;
            }
            // 8xyE (SHL Vx)
            //
            // VF receives the shifted out bit. Vy is decoded but unused.
            Opcode::ShlVx => {
                let vx = self.cpu.registers[x];
                self.cpu.registers[x] = vx << 1;
                self.cpu.registers[0xF] = (vx >> 7) & 1;
            }
            // Fx15 (LD DT, Vx)
            Opcode::LdDtVx => {
                self.cpu.delay_timer = self.cpu.registers[x];
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at I.
            Opcode::StoreRegs => {
                let addr = self.cpu.index as usize;
                for i in 0..=x {
                    self.cpu.ram[(addr + i) & (MEM_SIZE - 1)] = self.cpu.registers[i];
                }
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at I.
            Opcode::LoadRegs => {
                let addr = self.cpu.index as usize;
                for i in 0..=x {
                    self.cpu.registers[i] = self.cpu.ram[(addr + i) & (MEM_SIZE - 1)];
                }
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1 and I+2.
            #[rustfmt::skip]
            Opcode::LdBVx => {
                let addr = self.cpu.index as usize;
                let vx = self.cpu.registers[x];
                self.cpu.ram[addr & (MEM_SIZE - 1)]       = vx / 100 % 10;
                self.cpu.ram[(addr + 1) & (MEM_SIZE - 1)] = vx / 10  % 10;
                self.cpu.ram[(addr + 2) & (MEM_SIZE - 1)] = vx       % 10;
            }
            // Fx29 (LD F, Vx)
            //
            // Point I at the builtin glyph sprite for digit Vx.
            Opcode::LdFVx => {
                let vx = self.cpu.registers[x];
                self.cpu.index =
                    FONTSET_START as u16 + vx as u16 * FONTSET_GLYPH_HEIGHT as u16;
            }
            // Fx1E (ADD I, Vx)
            Opcode::AddIVx => {
                let vx = self.cpu.registers[x] as u16;
                self.cpu.index = self.cpu.index.wrapping_add(vx);
            }
            // Dxyn (DRW Vx, Vy, nibble)
            Opcode::Drw => {
                self.draw(x, y, n as usize);
            }
        }

        Ok(())
    }

    /// XOR-blit an `n`-row, 8-bit-wide sprite from `memory[I..I+n)`
    /// onto the framebuffer at `(Vx, Vy)`.
    ///
    /// Pixels falling outside the 64x32 grid are clipped. VF is set
    /// to 1 when any on pixel coincides with an on sprite bit across
    /// the whole blit; with [`Chip8Conf::legacy_collision`] the flag
    /// instead tracks each bit individually and the last examined
    /// bit's result persists.
    fn draw(&mut self, x: usize, y: usize, n: usize) {
        let vx = self.cpu.registers[x] as usize;
        let vy = self.cpu.registers[y] as usize;
        let addr = self.cpu.index as usize;

        let mut collision = false;

        for row in 0..n {
            let line = self.cpu.ram[(addr + row) & (MEM_SIZE - 1)];
            let py = vy + row;
            if py >= DISPLAY_HEIGHT {
                break;
            }

            // Sprite bits are read most-significant first.
            for bit in 0..8 {
                let px = vx + bit;
                if px >= DISPLAY_WIDTH {
                    continue;
                }

                let sprite_on = (line >> (7 - bit)) & 1 != 0;
                let cell = py * DISPLAY_WIDTH + px;
                let old = self.cpu.display[cell];

                if self.conf.legacy_collision {
                    self.cpu.registers[0xF] = (old && sprite_on) as u8;
                } else {
                    collision |= old && sprite_on;
                }

                self.cpu.display[cell] = old ^ sprite_on;
            }
        }

        if !self.conf.legacy_collision {
            self.cpu.registers[0xF] = collision as u8;
        }
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        for (addr, byte) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", addr, byte, self.cpu.ram[addr + 1])?;
        }

        Ok(buf)
    }

    /// Returns the display buffer rendered as ASCII art.
    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.cpu.display[y * DISPLAY_WIDTH + x] {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

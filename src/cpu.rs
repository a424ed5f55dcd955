//! CPU and memory state.
use std::fmt::{self, Write as FmtWrite};

use crate::constants::*;

/// Core state for a chip8 interpreter.
///
/// Pure data with no instruction behavior; one [`crate::vm::Chip8Vm`]
/// exclusively owns and mutates an instance.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    pub(crate) pc: u16,
    /// Stack pointer, indexing the top of the call stack.
    /// -1 when the stack is empty.
    pub(crate) sp: i8,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) doubles as the carry, borrow and collision
    /// flag depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address. Since addresses
    /// are 12 bits, only the lowest (rightmost) bits are used.
    pub(crate) index: Address,
    /// (DT) Delay timer that counts down to 0. The countdown itself is
    /// driven by the host, not by instruction stepping.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value,
    /// the host should play a beep.
    pub(crate) sound_timer: u8,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to. Row-major, one `bool` per pixel.
    pub(crate) display: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START as u16,
            sp: -1,
            registers: [0; REGISTER_COUNT],
            index: 0,
            delay_timer: 0,
            sound_timer: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Return the machine to its power-on state, erasing the contents
    /// of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as u16;
        self.sp = -1;
        self.registers.fill(0);
        self.index = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;

        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(false);
    }

    pub(crate) fn clear_display(&mut self) {
        self.display.fill(false);
    }

    /// Capture the full machine state for post-mortem inspection,
    /// recording `opcode` as the word that was being processed.
    pub(crate) fn snapshot(&self, opcode: u16) -> MachineSnapshot {
        MachineSnapshot {
            opcode,
            pc: self.pc,
            sp: self.sp,
            registers: self.registers,
            stack: self.stack,
            index: self.index,
            delay_timer: self.delay_timer,
            sound_timer: self.sound_timer,
            memory: self.ram.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Host accessors

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> i8 {
        self.sp
    }

    /// Value of general purpose register `Vi`.
    ///
    /// # Panics
    ///
    /// Panics when the register index is out of range.
    pub fn register(&self, index: u8) -> u8 {
        self.registers[index as usize]
    }

    /// Value of the flag register VF.
    pub fn vf(&self) -> u8 {
        self.registers[0xF]
    }

    pub fn index(&self) -> Address {
        self.index
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    /// Write the delay timer. Called by the host's 60Hz countdown.
    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// Write the sound timer. Called by the host's 60Hz countdown.
    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }

    pub fn memory(&self) -> &[u8] {
        &*self.ram
    }

    /// State of a single display cell. `true` is on.
    ///
    /// # Panics
    ///
    /// Panics when the coordinate falls outside the 64x32 grid.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        assert!(x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT);
        self.display[y * DISPLAY_WIDTH + x]
    }
}

/// Copy of the whole machine state at the moment a fault was raised,
/// attached to errors for diagnostic dumping.
#[derive(Debug, Clone)]
pub struct MachineSnapshot {
    /// The opcode being processed when the fault was raised. Zero for
    /// faults raised before a word could be fetched.
    pub opcode: u16,
    pub pc: u16,
    pub sp: i8,
    pub registers: [u8; REGISTER_COUNT],
    pub stack: [Address; STACK_SIZE],
    pub index: Address,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub memory: Box<[u8; MEM_SIZE]>,
}

impl MachineSnapshot {
    /// Render the captured memory as paired hexadecimal bytes,
    /// one 16-bit word per line.
    pub fn dump_memory(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        for (addr, pair) in self.memory.chunks_exact(2).enumerate() {
            writeln!(buf, "{:04X}: {:02X}{:02X}", addr * 2, pair[0], pair[1])?;
        }
        Ok(buf)
    }
}

impl fmt::Display for MachineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "opcode {:04X} at PC {:04X}; I {:04X}; DT {:02X}; ST {:02X}",
            self.opcode, self.pc, self.index, self.delay_timer, self.sound_timer
        )?;
        write!(f, "registers:")?;
        for (i, value) in self.registers.iter().enumerate() {
            write!(f, " V{:X}={:02X}", i, value)?;
        }
        writeln!(f)?;
        write!(f, "stack (SP {}):", self.sp)?;
        for slot in 0..=self.sp {
            write!(f, " {:04X}", self.stack[slot as usize])?;
        }
        Ok(())
    }
}

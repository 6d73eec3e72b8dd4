// CHIP-8 interpreter
//
// Useful links:
// * [Guide to making a CHIP-8 emulator](https://tobiasvl.github.io/blog/write-a-chip-8-emulator/)
// * [Building a CHIP-8 Emulator](https://austinmorlan.com/posts/chip8_emulator/)
// * [Cowgod's Chip-8 Technical Reference](http://devernay.free.fr/hacks/chip8/C8TECH10.HTM)
//

use std::ops::Range;
use std::time::Instant;

use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::color::{Chip8Color, DEFAULT_BACKGROUND_COLOR, DEFAULT_FOREGROUND_COLOR};
use crate::display::{DisplayBuffer, DrawMode};
use crate::error::Chip8Error;
use crate::keypad::{Keypad, KEY_COUNT};
use crate::timer::{SoundEvent, TimerMode, Timers};

pub const MEMORY_SIZE: usize = 0x1000;
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
pub const FONT_ADDR: u16 = 0x000;
pub const FONT_SIZE: usize = 80;
const GLYPH_SIZE: u16 = 5;
pub const STACK_SIZE: usize = 16;

pub static DEFAULT_FONT: [u8; FONT_SIZE] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Behaviour that differs between historical interpreters. The default is
/// the classic behaviour used throughout this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quirks {
    /// Bitwise shift (8XY6 and 8XYE): if true VY is copied into VX before shifting (COSMAC VIP)
    pub shift_copies_vy: bool,
    /// Jump with offset (BNNN/BXNN): jump to the address XNN plus the value in the register VX (CHIP-48 and SUPER-CHIP),
    /// instead of the address NNN plus the value in the register V0
    pub jump_uses_vx: bool,
    /// Store and load memory (FX55/FX65): advance I past the last register transferred
    pub load_store_increments_index: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            shift_copies_vy: false,
            jump_uses_vx: false,
            load_store_increments_index: true,
        }
    }
}

#[derive(Debug)]
pub struct Chip8Builder {
    /// ROM
    rom: Option<Vec<u8>>,
    /// Font sprite
    font: Option<Vec<u8>>,
    // PRNG Seed
    rng_seed: Option<u64>,
    quirks: Quirks,
    draw_mode: DrawMode,
    timer_mode: TimerMode,
    dump_registers: bool,
    foreground: Chip8Color,
    background: Chip8Color,
}

impl Default for Chip8Builder {
    fn default() -> Self {
        Chip8Builder::new()
    }
}

impl Chip8Builder {
    pub fn new() -> Chip8Builder {
        Chip8Builder {
            rom: None,
            font: None,
            rng_seed: None,
            quirks: Quirks::default(),
            draw_mode: DrawMode::default(),
            timer_mode: TimerMode::default(),
            dump_registers: false,
            foreground: DEFAULT_FOREGROUND_COLOR,
            background: DEFAULT_BACKGROUND_COLOR,
        }
    }

    pub fn with_rom(mut self, rom: Vec<u8>) -> Self {
        self.rom = Some(rom);
        self
    }

    pub fn with_font(mut self, font: Vec<u8>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = draw_mode;
        self
    }

    pub fn with_timer_mode(mut self, timer_mode: TimerMode) -> Self {
        self.timer_mode = timer_mode;
        self
    }

    /// Log the register file after every instruction, at debug level.
    pub fn with_register_dump(mut self, dump: bool) -> Self {
        self.dump_registers = dump;
        self
    }

    pub fn with_foreground(mut self, color: Chip8Color) -> Self {
        self.foreground = color;
        self
    }

    pub fn with_background(mut self, color: Chip8Color) -> Self {
        self.background = color;
        self
    }

    /// Build the machine. In background timer mode this also starts the
    /// timer thread, which runs until [`Chip8::shutdown`] or drop.
    pub fn build(&self) -> Result<Chip8, Chip8Error> {
        let mut font = [0u8; FONT_SIZE];
        match &self.font {
            Some(custom) if custom.len() != FONT_SIZE => {
                return Err(Chip8Error::InvalidFont {
                    size: custom.len(),
                    expected: FONT_SIZE,
                });
            }
            Some(custom) => font.copy_from_slice(custom),
            None => font.copy_from_slice(&DEFAULT_FONT),
        }

        let rom = self.rom.as_deref().unwrap_or_default();
        check_rom_size(rom)?;

        // Create memory, font at the bottom and the program at 0x200
        let mut memory = vec![0u8; MEMORY_SIZE];
        copy_image(&mut memory, &font, rom);

        // Pseudo random number generator
        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::info!("Loaded ROM [size: {}]", rom.len());

        Ok(Chip8 {
            regs: [0u8; 16],
            index: 0,
            pc: PROGRAM_START,
            stack: [0u16; STACK_SIZE],
            sp: 0,
            timers: Timers::new(self.timer_mode),
            memory,
            font,
            display: DisplayBuffer::new(self.foreground, self.background),
            keypad: Keypad::new(),
            key_wait: None,
            quirks: self.quirks,
            draw_mode: self.draw_mode,
            dump_registers: self.dump_registers,
            rng,
        })
    }
}

fn check_rom_size(rom: &[u8]) -> Result<(), Chip8Error> {
    if rom.len() > MAX_ROM_SIZE {
        return Err(Chip8Error::RomTooLarge {
            size: rom.len(),
            max: MAX_ROM_SIZE,
        });
    }
    Ok(())
}

fn copy_image(memory: &mut [u8], font: &[u8], rom: &[u8]) {
    memory.iter_mut().for_each(|b| *b = 0);
    let font_start = FONT_ADDR as usize;
    memory[font_start..font_start + font.len()].copy_from_slice(font);
    let start = PROGRAM_START as usize;
    memory[start..start + rom.len()].copy_from_slice(rom);
}

pub struct Chip8 {
    /// General purpose registers, VF doubles as carry/borrow/collision flag
    regs: [u8; 16],
    /// Index register
    index: u16,
    /// Program counter
    pc: u16,
    /// Call stack
    stack: [u16; STACK_SIZE],
    /// Stack pointer, number of return addresses on the stack
    sp: u8,
    /// Delay and sound timers
    timers: Timers,
    /// Memory
    memory: Vec<u8>,
    /// Font kept around for reloading
    font: [u8; FONT_SIZE],
    /// Display: 64x32 pixels 1 bit monochrome
    display: DisplayBuffer,
    /// Keypad snapshot
    keypad: Keypad,
    /// Set while FX0A is blocked waiting for a key press
    key_wait: Option<u8>,
    quirks: Quirks,
    draw_mode: DrawMode,
    dump_registers: bool,
    /// PRNG Generator
    rng: StdRng,
}

impl Chip8 {
    /// Replace the running program. Everything except the font, palette and
    /// configuration goes back to its power-on state.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        check_rom_size(rom)?;

        copy_image(&mut self.memory, &self.font, rom);
        self.regs = [0u8; 16];
        self.index = 0;
        self.pc = PROGRAM_START;
        self.stack = [0u16; STACK_SIZE];
        self.sp = 0;
        self.timers.reset(Instant::now());
        self.keypad.release_all();
        self.key_wait = None;
        self.display.clear();

        log::info!("Loaded ROM [size: {}]", rom.len());
        Ok(())
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// On error nothing has been changed by the failing instruction; the
    /// session is expected to end.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        let pc = self.pc;

        // Instruction
        let inst = self.fetch()?;
        let opcode = u16::from_be_bytes(inst);

        // Instruction split into nibbels(4bits) 1-4
        let n1 = (0xf0 & inst[0]) >> 4;
        let n2 = 0x0f & inst[0];
        let n3 = (0xf0 & inst[1]) >> 4;
        let n4 = 0x0f & inst[1];

        // Operands
        let x = n2 as usize;
        let y = n3 as usize;
        let nn = inst[1];
        let nnn = opcode & 0x0FFF;

        match (n1, n2, n3, n4) {
            // 00E0: Clear screen
            (0x0, 0x0, 0xE, 0x0) => {
                log::trace!("{:04x}: {:04x} CLEAR", pc, opcode);

                self.display.clear();
                self.pc += 2;
            }
            // 00EE: Return from subroutine
            (0x0, 0x0, 0xE, 0xE) => {
                log::trace!("{:04x}: {:04x} RET", pc, opcode);

                // Pop the address of the call instruction and continue after it
                if self.sp == 0 {
                    return Err(Chip8Error::StackUnderflow { pc });
                }
                self.sp -= 1;
                self.pc = self.stack[self.sp as usize] + 2;
            }
            // 0NNN: Call machine code routine, not supported so treated as no-op
            (0x0, _, _, _) => {
                log::trace!("{:04x}: {:04x} SYS 0x{:03x} (ignored)", pc, opcode, nnn);

                self.pc += 2;
            }
            // 1NNN: Jump to memory location NNN
            (0x1, _, _, _) => {
                log::trace!("{:04x}: {:04x} JMP 0x{:03x}", pc, opcode, nnn);

                self.pc = nnn;
            }
            // 2NNN: Call subroutine at memory location NNN
            (0x2, _, _, _) => {
                log::trace!("{:04x}: {:04x} CALL 0x{:03x}", pc, opcode, nnn);

                // Push program counter to stack
                if self.sp as usize >= STACK_SIZE {
                    return Err(Chip8Error::StackOverflow { pc });
                }
                self.stack[self.sp as usize] = self.pc;
                self.sp += 1;

                self.pc = nnn;
            }
            // 3XNN: Skip next instruction if VX == NN
            (0x3, _, _, _) => {
                log::trace!("{:04x}: {:04x} SKIP V{:x}=={:02x}", pc, opcode, x, nn);

                self.skip_if(self.regs[x] == nn);
            }
            // 4XNN: Skip next instruction if VX != NN
            (0x4, _, _, _) => {
                log::trace!("{:04x}: {:04x} SKIP V{:x}!={:02x}", pc, opcode, x, nn);

                self.skip_if(self.regs[x] != nn);
            }
            // 5XY0: Skip next instruction if VX == VY
            (0x5, _, _, 0x0) => {
                log::trace!("{:04x}: {:04x} SKIP V{:x}==V{:x}", pc, opcode, x, y);

                self.skip_if(self.regs[x] == self.regs[y]);
            }
            // 6XNN: Set register VX to the value NN
            (0x6, _, _, _) => {
                log::trace!("{:04x}: {:04x} SET V{:x} {:02x}", pc, opcode, x, nn);

                self.regs[x] = nn;
                self.pc += 2;
            }
            // 7XNN: Add the value NN to VX, carry flag untouched
            (0x7, _, _, _) => {
                log::trace!("{:04x}: {:04x} ADD V{:x} {:02x}", pc, opcode, x, nn);

                self.regs[x] = self.regs[x].wrapping_add(nn);
                self.pc += 2;
            }
            // 8XY0: Set register VX to the value of VY
            (0x8, _, _, 0x0) => {
                log::trace!("{:04x}: {:04x} SET V{:x} V{:x}", pc, opcode, x, y);

                self.regs[x] = self.regs[y];
                self.pc += 2;
            }
            // 8XY1: Binary OR register VX and register VY and store result in VX
            (0x8, _, _, 0x1) => {
                log::trace!("{:04x}: {:04x} OR V{:x} V{:x}", pc, opcode, x, y);

                self.regs[x] |= self.regs[y];
                self.pc += 2;
            }
            // 8XY2: Binary AND register VX and register VY and store result in VX
            (0x8, _, _, 0x2) => {
                log::trace!("{:04x}: {:04x} AND V{:x} V{:x}", pc, opcode, x, y);

                self.regs[x] &= self.regs[y];
                self.pc += 2;
            }
            // 8XY3: Binary XOR register VX and register VY and store result in VX
            (0x8, _, _, 0x3) => {
                log::trace!("{:04x}: {:04x} XOR V{:x} V{:x}", pc, opcode, x, y);

                self.regs[x] ^= self.regs[y];
                self.pc += 2;
            }
            // 8XY4: Add register VY to VX, VF is set on carry
            (0x8, _, _, 0x4) => {
                log::trace!("{:04x}: {:04x} ADD V{:x} V{:x}", pc, opcode, x, y);

                let (res, carry) = self.regs[x].overflowing_add(self.regs[y]);
                self.set_result_and_flag(x, res, carry);
            }
            // 8XY5: Subtract, sets VX to the result of VX - VY, VF is cleared on borrow
            (0x8, _, _, 0x5) => {
                log::trace!("{:04x}: {:04x} SUB V{:x} V{:x}", pc, opcode, x, y);

                let (res, borrow) = self.regs[x].overflowing_sub(self.regs[y]);
                self.set_result_and_flag(x, res, !borrow);
            }
            // 8XY6: Shift VX to the right by 1 bit, VF gets the bit shifted out
            (0x8, _, _, 0x6) => {
                log::trace!("{:04x}: {:04x} SHR V{:x} V{:x}", pc, opcode, x, y);

                let src = if self.quirks.shift_copies_vy {
                    self.regs[y]
                } else {
                    self.regs[x]
                };
                self.set_result_and_flag(x, src >> 1, src & 0x01 != 0);
            }
            // 8XY7: Subtract, sets VX to the result of VY - VX, VF is cleared on borrow
            (0x8, _, _, 0x7) => {
                log::trace!("{:04x}: {:04x} SUBN V{:x} V{:x}", pc, opcode, x, y);

                let (res, borrow) = self.regs[y].overflowing_sub(self.regs[x]);
                self.set_result_and_flag(x, res, !borrow);
            }
            // 8XYE: Shift VX to the left by 1 bit, VF gets the bit shifted out
            (0x8, _, _, 0xE) => {
                log::trace!("{:04x}: {:04x} SHL V{:x} V{:x}", pc, opcode, x, y);

                let src = if self.quirks.shift_copies_vy {
                    self.regs[y]
                } else {
                    self.regs[x]
                };
                self.set_result_and_flag(x, src << 1, src & 0x80 != 0);
            }
            // 9XY0: Skip next instruction if VX != VY
            (0x9, _, _, 0x0) => {
                log::trace!("{:04x}: {:04x} SKIP V{:x}!=V{:x}", pc, opcode, x, y);

                self.skip_if(self.regs[x] != self.regs[y]);
            }
            // ANNN: Set index register I to the value NNN
            (0xA, _, _, _) => {
                log::trace!("{:04x}: {:04x} SET I 0x{:03x}", pc, opcode, nnn);

                self.index = nnn;
                self.pc += 2;
            }
            // BNNN: Jump to address NNN plus the value in the register V0,
            // (optionally) jump to the address XNN plus the value in the register VX
            (0xB, _, _, _) => {
                let offset = if self.quirks.jump_uses_vx {
                    log::trace!("{:04x}: {:04x} JMP 0x{:03x} V{:x}", pc, opcode, nnn, x);
                    self.regs[x]
                } else {
                    log::trace!("{:04x}: {:04x} JMP 0x{:03x} V0", pc, opcode, nnn);
                    self.regs[0]
                };

                self.pc = nnn + offset as u16;
            }
            // CXNN: Random - generates a random number and AND it with the value NN, and puts the result in VX
            (0xC, _, _, _) => {
                log::trace!("{:04x}: {:04x} RNG V{:x} 0x{:02x}", pc, opcode, x, nn);

                let n = self.rng.next_u32() as u8;
                self.regs[x] = n & nn;
                self.pc += 2;
            }
            // DXYN: Display - draw an N pixels tall sprite from the memory location that the I index register
            // is holding to the screen, at the horizontal X coordinate in VX and the Y coordinate in VY
            (0xD, _, _, _) => {
                log::trace!("{:04x}: {:04x} DRAW V{:x} V{:x} {:x}", pc, opcode, x, y, n4);

                let sprite = self.mem_range(self.index, n4 as usize)?;
                let collision = self.display.draw_sprite(
                    self.regs[x],
                    self.regs[y],
                    &self.memory[sprite],
                    self.draw_mode,
                )?;

                self.regs[0xF] = collision as u8;
                self.pc += 2;
            }
            // EX9E: Skip next instruction if key VX is pressed
            (0xE, _, 0x9, 0xE) => {
                log::trace!("{:04x}: {:04x} SKIP KEY V{:x}", pc, opcode, x);

                let pressed = self.keypad.is_pressed(self.regs[x])?;
                self.skip_if(pressed);
            }
            // EXA1: Skip next instruction if key VX is not pressed
            (0xE, _, 0xA, 0x1) => {
                log::trace!("{:04x}: {:04x} SKIP !KEY V{:x}", pc, opcode, x);

                let pressed = self.keypad.is_pressed(self.regs[x])?;
                self.skip_if(!pressed);
            }
            // FX07: Set VX to the delay timer
            (0xF, _, 0x0, 0x7) => {
                log::trace!("{:04x}: {:04x} GET V{:x} DT", pc, opcode, x);

                self.regs[x] = self.timers.delay();
                self.pc += 2;
            }
            // FX0A: Block until a key is pressed, then store it in VX
            (0xF, _, 0x0, 0xA) => {
                log::trace!("{:04x}: {:04x} WAIT KEY V{:x}", pc, opcode, x);

                match self.keypad.first_pressed() {
                    Some(key) => {
                        self.regs[x] = key;
                        self.key_wait = None;
                        self.pc += 2;
                    }
                    None => {
                        if self.key_wait.is_none() {
                            log::debug!("Waiting for key press [register: V{:x}]", x);
                        }
                        // Leave PC alone so the driver re-executes this instruction
                        self.key_wait = Some(n2);
                    }
                }
            }
            // FX15: Set the delay timer to VX
            (0xF, _, 0x1, 0x5) => {
                log::trace!("{:04x}: {:04x} SET DT V{:x}", pc, opcode, x);

                self.timers.set_delay(self.regs[x], Instant::now());
                self.pc += 2;
            }
            // FX18: Set the sound timer to VX
            (0xF, _, 0x1, 0x8) => {
                log::trace!("{:04x}: {:04x} SET ST V{:x}", pc, opcode, x);

                self.timers.set_sound(self.regs[x], Instant::now());
                self.pc += 2;
            }
            // FX1E: Add VX to the index register, VF is set if I leaves the address space
            (0xF, _, 0x1, 0xE) => {
                log::trace!("{:04x}: {:04x} ADD I V{:x}", pc, opcode, x);

                self.index = self.index.wrapping_add(self.regs[x] as u16);
                self.regs[0xF] = (self.index > 0x0FFF) as u8;
                self.pc += 2;
            }
            // FX29: Point the index register at the font glyph for VX
            (0xF, _, 0x2, 0x9) => {
                log::trace!("{:04x}: {:04x} FONT V{:x}", pc, opcode, x);

                self.index = FONT_ADDR + self.regs[x] as u16 * GLYPH_SIZE;
                self.pc += 2;
            }
            // FX33: Store the decimal digits of VX at I, I+1 and I+2
            (0xF, _, 0x3, 0x3) => {
                log::trace!("{:04x}: {:04x} BCD V{:x}", pc, opcode, x);

                let dst = self.mem_range(self.index, 3)?;
                let value = self.regs[x];
                self.memory[dst].copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
                self.pc += 2;
            }
            // FX55: Store - Store of each register from V0-VX at memory addresses starting at I until I + X
            (0xF, _, 0x5, 0x5) => {
                log::trace!("{:04x}: {:04x} STORE V{:x}", pc, opcode, x);

                let dst = self.mem_range(self.index, x + 1)?;
                self.memory[dst].copy_from_slice(&self.regs[..=x]);

                if self.quirks.load_store_increments_index {
                    self.index += x as u16 + 1;
                }

                self.pc += 2;
            }
            // FX65: Load - Load of each register from V0-VX from memory addresses starting at I until I + X
            (0xF, _, 0x6, 0x5) => {
                log::trace!("{:04x}: {:04x} LOAD V{:x}", pc, opcode, x);

                let src = self.mem_range(self.index, x + 1)?;
                self.regs[..=x].copy_from_slice(&self.memory[src]);

                if self.quirks.load_store_increments_index {
                    self.index += x as u16 + 1;
                }

                self.pc += 2;
            }
            _ => return Err(Chip8Error::InvalidOpcode { opcode, pc }),
        }

        if self.dump_registers && log::log_enabled!(log::Level::Debug) {
            self.dump_state();
        }

        Ok(())
    }

    /// Catch the timers up with the wall clock. Call once per driver iteration.
    pub fn update_timers(&mut self) {
        self.update_timers_at(Instant::now());
    }

    pub fn update_timers_at(&mut self, now: Instant) {
        self.timers.update(now);
    }

    /// Sound timer edge since the last call, if any.
    pub fn take_sound_event(&mut self) -> Option<SoundEvent> {
        self.timers.take_sound_event()
    }

    /// Stop the background timer service, if running.
    pub fn shutdown(&mut self) {
        self.timers.shutdown();
    }

    pub fn display(&self) -> &DisplayBuffer {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayBuffer {
        &mut self.display
    }

    /// Replace the keypad snapshot, typically once per driver iteration.
    pub fn set_keys(&mut self, keys: [bool; KEY_COUNT]) {
        self.keypad.set_all(keys);
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<(), Chip8Error> {
        self.keypad.set(key, pressed)
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn set_register_dump(&mut self, dump: bool) {
        self.dump_registers = dump;
    }

    pub fn register_dump(&self) -> bool {
        self.dump_registers
    }

    pub fn is_waiting_for_key(&self) -> bool {
        self.key_wait.is_some()
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.regs
    }

    /// Return addresses currently on the stack, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp as usize]
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay()
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound()
    }

    pub fn read_memory(&self, addr: u16, len: usize) -> Result<&[u8], Chip8Error> {
        let range = self.mem_range(addr, len)?;
        Ok(&self.memory[range])
    }

    fn fetch(&self) -> Result<[u8; 2], Chip8Error> {
        if self.pc % 2 != 0 {
            return Err(Chip8Error::MisalignedProgramCounter { pc: self.pc });
        }
        let range = self.mem_range(self.pc, 2)?;
        let mut buffer = [0u8; 2];
        buffer.copy_from_slice(&self.memory[range]);
        Ok(buffer)
    }

    /// Bounds checked memory range starting at `addr`.
    fn mem_range(&self, addr: u16, len: usize) -> Result<Range<usize>, Chip8Error> {
        let start = addr as usize;
        let end = start + len;
        if end > MEMORY_SIZE {
            return Err(Chip8Error::AddressOutOfRange {
                addr: start.max(MEMORY_SIZE),
            });
        }
        Ok(start..end)
    }

    fn skip_if(&mut self, cond: bool) {
        self.pc += if cond { 4 } else { 2 };
    }

    /// Write the result first and VF last, so with X = F the flag wins.
    fn set_result_and_flag(&mut self, x: usize, res: u8, flag: bool) {
        self.regs[x] = res;
        self.regs[0xF] = flag as u8;
        self.pc += 2;
    }

    fn dump_state(&self) {
        log::debug!(
            "  V: {:02x?} I: {:04x} PC: {:04x} SP: {} DT: {} ST: {}",
            self.regs,
            self.index,
            self.pc,
            self.sp,
            self.timers.delay(),
            self.timers.sound()
        );
        if self.sp > 0 {
            log::debug!("  stack: {:04x?}", self.stack());
        }
    }
}

mod chip8;
mod color;
mod display;
mod error;
mod keypad;
mod timer;

pub use chip8::{
    Chip8, Chip8Builder, Quirks, DEFAULT_FONT, FONT_ADDR, FONT_SIZE, MAX_ROM_SIZE, MEMORY_SIZE,
    PROGRAM_START, STACK_SIZE,
};
pub use color::{
    Chip8Color, Chip8ColorParseError, DEFAULT_BACKGROUND_COLOR, DEFAULT_FOREGROUND_COLOR,
};
pub use display::{DisplayBuffer, DrawMode, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use error::Chip8Error;
pub use keypad::{Keypad, KEY_COUNT};
pub use timer::{SoundEvent, TimerCounter, TimerMode, Timers};

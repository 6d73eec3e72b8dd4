use thiserror::Error;

/// Everything that can go wrong while building or running a [`crate::Chip8`].
///
/// Apart from the two load errors every variant is fatal for the running
/// session: the machine state is left as it was right before the failing
/// instruction so a frontend can still tear down cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Chip8Error {
    #[error("ROM is {size} bytes, the maximum is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("font sprite must be {expected} bytes, got {size}")]
    InvalidFont { size: usize, expected: usize },

    #[error("invalid instruction 0x{opcode:04x} at 0x{pc:04x}")]
    InvalidOpcode { opcode: u16, pc: u16 },

    #[error("stack overflow calling from 0x{pc:04x}")]
    StackOverflow { pc: u16 },

    #[error("return at 0x{pc:04x} with an empty stack")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of range at 0x{addr:04x}")]
    AddressOutOfRange { addr: usize },

    #[error("key 0x{key:02x} is outside the keypad")]
    KeyOutOfRange { key: u8 },

    #[error("program counter 0x{pc:04x} is not 2 byte aligned")]
    MisalignedProgramCounter { pc: u16 },

    #[error("sprite pixel ({x}, {y}) is outside the display")]
    PixelOutOfBounds { x: usize, y: usize },
}

impl Chip8Error {
    /// Errors raised while loading a ROM or font, before anything ran.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Chip8Error::RomTooLarge { .. } | Chip8Error::InvalidFont { .. }
        )
    }
}

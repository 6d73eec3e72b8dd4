use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

pub const DEFAULT_BACKGROUND_COLOR: Chip8Color = Chip8Color::new(0, 0, 0);
pub const DEFAULT_FOREGROUND_COLOR: Chip8Color = Chip8Color::new(255, 255, 255);

/// One display pixel as laid out in an RGBX8888 texture on a little endian host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C, packed)]
pub struct Chip8Color {
    padding: u8,
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Chip8Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Chip8Color {
        Chip8Color { r, g, b, padding: 0 }
    }
}

impl Default for Chip8Color {
    fn default() -> Self {
        DEFAULT_BACKGROUND_COLOR
    }
}

impl FromStr for Chip8Color {
    type Err = Chip8ColorParseError;

    /// Parses `RRGGBB`, optionally prefixed with `0x` or `#`.
    fn from_str(s: &str) -> Result<Chip8Color, Chip8ColorParseError> {
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix('#'))
            .unwrap_or(s);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Chip8ColorParseError(s.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| Chip8ColorParseError(s.to_string()))
        };

        Ok(Chip8Color::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse hex color {0:?}, expected RRGGBB")]
pub struct Chip8ColorParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed() {
        let color: Chip8Color = "0x1A2B3C".parse().unwrap();
        assert_eq!(color, Chip8Color::new(0x1A, 0x2B, 0x3C));
    }

    #[test]
    fn test_parse_bare_and_hash() {
        assert_eq!("ff8000".parse::<Chip8Color>(), Ok(Chip8Color::new(0xFF, 0x80, 0x00)));
        assert_eq!("#00ff00".parse::<Chip8Color>(), Ok(Chip8Color::new(0x00, 0xFF, 0x00)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("0x12345".parse::<Chip8Color>().is_err());
        assert!("0xGG0000".parse::<Chip8Color>().is_err());
        assert!("".parse::<Chip8Color>().is_err());
    }

    #[test]
    fn test_rgbx_byte_layout() {
        let color = Chip8Color::new(0x11, 0x22, 0x33);
        let bytes: &[u8] = bytemuck::bytes_of(&color);
        assert_eq!(bytes, &[0x00, 0x33, 0x22, 0x11]);
    }
}

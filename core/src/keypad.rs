use crate::error::Chip8Error;

pub const KEY_COUNT: usize = 16;

/// Snapshot of the 16 key hexadecimal keypad, refreshed by the frontend once
/// per driver iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Keypad {
        Keypad::default()
    }

    /// Replace the whole snapshot.
    pub fn set_all(&mut self, keys: [bool; KEY_COUNT]) {
        self.keys = keys;
    }

    pub fn set(&mut self, key: u8, pressed: bool) -> Result<(), Chip8Error> {
        let slot = self
            .keys
            .get_mut(key as usize)
            .ok_or(Chip8Error::KeyOutOfRange { key })?;
        *slot = pressed;
        Ok(())
    }

    pub fn is_pressed(&self, key: u8) -> Result<bool, Chip8Error> {
        self.keys
            .get(key as usize)
            .copied()
            .ok_or(Chip8Error::KeyOutOfRange { key })
    }

    /// Lowest numbered key currently held down.
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&k| k).map(|k| k as u8)
    }

    pub fn release_all(&mut self) {
        self.keys = [false; KEY_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pressed() {
        let mut keypad = Keypad::new();
        assert_eq!(keypad.first_pressed(), None);

        keypad.set(0xC, true).unwrap();
        keypad.set(0x7, true).unwrap();
        assert_eq!(keypad.first_pressed(), Some(0x7));
    }

    #[test]
    fn test_out_of_range() {
        let mut keypad = Keypad::new();
        assert_eq!(
            keypad.is_pressed(0x10),
            Err(Chip8Error::KeyOutOfRange { key: 0x10 })
        );
        assert_eq!(
            keypad.set(0xFF, true),
            Err(Chip8Error::KeyOutOfRange { key: 0xFF })
        );
    }

    #[test]
    fn test_set_all_and_release() {
        let mut keypad = Keypad::new();
        let mut keys = [false; KEY_COUNT];
        keys[0xF] = true;
        keypad.set_all(keys);
        assert_eq!(keypad.is_pressed(0xF), Ok(true));

        keypad.release_all();
        assert_eq!(keypad.first_pressed(), None);
    }
}

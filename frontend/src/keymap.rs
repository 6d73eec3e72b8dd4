use sdl2::keyboard::Keycode;

/// Host key to keypad index, COSMAC VIP layout on the left of a QWERTY keyboard:
///
/// ```text
/// 1 2 3 4      1 2 3 C
/// Q W E R  ->  4 5 6 D
/// A S D F      7 8 9 E
/// Z X C V      A 0 B F
/// ```
pub fn chip8_key(keycode: Keycode) -> Option<u8> {
    let key = match keycode {
        Keycode::Num1 => 0x1,
        Keycode::Num2 => 0x2,
        Keycode::Num3 => 0x3,
        Keycode::Num4 => 0xC,
        Keycode::Q => 0x4,
        Keycode::W => 0x5,
        Keycode::E => 0x6,
        Keycode::R => 0xD,
        Keycode::A => 0x7,
        Keycode::S => 0x8,
        Keycode::D => 0x9,
        Keycode::F => 0xE,
        Keycode::Z => 0xA,
        Keycode::X => 0x0,
        Keycode::C => 0xB,
        Keycode::V => 0xF,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let rows = [
            [Keycode::Num1, Keycode::Num2, Keycode::Num3, Keycode::Num4],
            [Keycode::Q, Keycode::W, Keycode::E, Keycode::R],
            [Keycode::A, Keycode::S, Keycode::D, Keycode::F],
            [Keycode::Z, Keycode::X, Keycode::C, Keycode::V],
        ];
        let expected = [
            [0x1, 0x2, 0x3, 0xC],
            [0x4, 0x5, 0x6, 0xD],
            [0x7, 0x8, 0x9, 0xE],
            [0xA, 0x0, 0xB, 0xF],
        ];

        for (row, keys) in rows.iter().zip(expected.iter()) {
            for (&keycode, &key) in row.iter().zip(keys.iter()) {
                assert_eq!(chip8_key(keycode), Some(key), "{:?}", keycode);
            }
        }
    }

    #[test]
    fn test_every_key_mapped_once() {
        let mut seen = [false; 16];
        for keycode in [
            Keycode::Num1, Keycode::Num2, Keycode::Num3, Keycode::Num4,
            Keycode::Q, Keycode::W, Keycode::E, Keycode::R,
            Keycode::A, Keycode::S, Keycode::D, Keycode::F,
            Keycode::Z, Keycode::X, Keycode::C, Keycode::V,
        ] {
            let key = chip8_key(keycode).unwrap() as usize;
            assert!(!seen[key], "key {:x} mapped twice", key);
            seen[key] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_unmapped() {
        assert_eq!(chip8_key(Keycode::P), None);
        assert_eq!(chip8_key(Keycode::Escape), None);
        assert_eq!(chip8_key(Keycode::Num5), None);
    }
}

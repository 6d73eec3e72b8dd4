use crate::color::{Chip8Color, DEFAULT_BACKGROUND_COLOR, DEFAULT_FOREGROUND_COLOR};
use crate::error::Chip8Error;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// What happens to sprite pixels that land outside the 64x32 grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// Every pixel coordinate wraps around the screen edges.
    #[default]
    Wrap,
    /// The origin wraps, pixels running off the right or bottom edge are dropped.
    Clip,
    /// Any pixel outside the grid aborts the draw with [`Chip8Error::PixelOutOfBounds`].
    Strict,
}

/// 64x32 monochrome display.
///
/// Pixel state is kept as one bit per pixel (well, a `bool`) and mirrored into
/// an RGBX8888 frame so a frontend can upload [`DisplayBuffer::buffer`] to a
/// streaming texture as is.
#[derive(Debug, Clone)]
pub struct DisplayBuffer {
    pixels: Vec<bool>,
    frame: Vec<Chip8Color>,
    foreground: Chip8Color,
    background: Chip8Color,
    dirty: bool,
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        DisplayBuffer::new(DEFAULT_FOREGROUND_COLOR, DEFAULT_BACKGROUND_COLOR)
    }
}

impl DisplayBuffer {
    pub fn new(foreground: Chip8Color, background: Chip8Color) -> DisplayBuffer {
        DisplayBuffer {
            pixels: vec![false; SCREEN_WIDTH * SCREEN_HEIGHT],
            frame: vec![background; SCREEN_WIDTH * SCREEN_HEIGHT],
            foreground,
            background,
            dirty: false,
        }
    }

    /// Change the palette, repainting the frame.
    pub fn set_colors(&mut self, foreground: Chip8Color, background: Chip8Color) {
        self.foreground = foreground;
        self.background = background;
        for (pxl, color) in self.pixels.iter().zip(self.frame.iter_mut()) {
            *color = if *pxl { foreground } else { background };
        }
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = false);
        let background = self.background;
        self.frame.iter_mut().for_each(|p| *p = background);
        self.dirty = true;
    }

    /// State of the pixel at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is outside the 64x32 grid. Sprite drawing goes
    /// through [`DisplayBuffer::draw_sprite`], which never panics.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::idx(x, y)]
    }

    /// Flip a single pixel, returns true if it was switched off.
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is outside the 64x32 grid.
    pub fn xor_pixel(&mut self, x: usize, y: usize) -> bool {
        let idx = Self::idx(x, y);
        let on = !self.pixels[idx];
        self.pixels[idx] = on;
        self.frame[idx] = if on { self.foreground } else { self.background };
        self.dirty = true;
        !on
    }

    /// XOR an 8 pixel wide sprite onto the screen, one byte per row, most
    /// significant bit leftmost. Returns whether any lit pixel was erased.
    pub fn draw_sprite(
        &mut self,
        x: u8,
        y: u8,
        sprite: &[u8],
        mode: DrawMode,
    ) -> Result<bool, Chip8Error> {
        let (ox, oy) = match mode {
            DrawMode::Strict => (x as usize, y as usize),
            DrawMode::Wrap | DrawMode::Clip => {
                (x as usize % SCREEN_WIDTH, y as usize % SCREEN_HEIGHT)
            }
        };

        // Validate up front so a failed draw leaves the screen untouched
        if mode == DrawMode::Strict {
            if let Some((x, y)) = sprite_pixels(ox, oy, sprite)
                .find(|&(x, y)| x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT)
            {
                return Err(Chip8Error::PixelOutOfBounds { x, y });
            }
        }

        let mut collision = false;
        for (x, y) in sprite_pixels(ox, oy, sprite) {
            let (x, y) = match mode {
                DrawMode::Wrap => (x % SCREEN_WIDTH, y % SCREEN_HEIGHT),
                DrawMode::Clip if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT => continue,
                DrawMode::Clip | DrawMode::Strict => (x, y),
            };
            collision |= self.xor_pixel(x, y);
        }

        self.dirty = true;
        Ok(collision)
    }

    /// Pending redraw.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the frontend once the current frame is on screen.
    pub fn mark_rendered(&mut self) {
        self.dirty = false;
    }

    /// RGBX8888 frame, `SCREEN_WIDTH * 4` bytes per row.
    pub fn buffer(&self) -> &[u8] {
        bytemuck::cast_slice(&self.frame[..])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(SCREEN_WIDTH)
    }

    fn idx(x: usize, y: usize) -> usize {
        assert!(
            x < SCREEN_WIDTH && y < SCREEN_HEIGHT,
            "pixel ({}, {}) outside the display",
            x,
            y
        );
        y * SCREEN_WIDTH + x
    }
}

/// Screen coordinates of every set bit in a sprite drawn at the origin,
/// before any wrapping or clipping.
fn sprite_pixels(ox: usize, oy: usize, sprite: &[u8]) -> impl Iterator<Item = (usize, usize)> + '_ {
    sprite.iter().enumerate().flat_map(move |(row, &data)| {
        (0..8usize)
            .filter(move |&column| data & (0x80 >> column) != 0)
            .map(move |column| (ox + column, oy + row))
    })
}

use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};
use sdl2::Sdl;

const TONE_HZ: f32 = 440.0;
const SAMPLE_RATE: i32 = 44_100;
const VOLUME: f32 = 0.15;

/// Square wave generator fed to the SDL audio thread.
pub struct SquareWave {
    phase_inc: f32,
    phase: f32,
    volume: f32,
}

impl AudioCallback for SquareWave {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        for x in out.iter_mut() {
            *x = if self.phase < 0.5 {
                self.volume
            } else {
                -self.volume
            };
            self.phase = (self.phase + self.phase_inc) % 1.0;
        }
    }
}

/// Buzzer driven by the sound timer edges. Runs silent when no audio device
/// could be opened.
pub struct Beeper {
    device: Option<AudioDevice<SquareWave>>,
    playing: bool,
}

impl Beeper {
    pub fn open(sdl: &Sdl) -> Beeper {
        let device = sdl.audio().and_then(|audio| {
            let spec = AudioSpecDesired {
                freq: Some(SAMPLE_RATE),
                channels: Some(1),
                samples: None,
            };
            audio.open_playback(None, &spec, |spec| SquareWave {
                phase_inc: TONE_HZ / spec.freq as f32,
                phase: 0.0,
                volume: VOLUME,
            })
        });

        let device = match device {
            Ok(device) => Some(device),
            Err(err) => {
                log::warn!("No audio device, sound disabled: {}", err);
                None
            }
        };

        Beeper {
            device,
            playing: false,
        }
    }

    pub fn start(&mut self) {
        if let (Some(device), false) = (&self.device, self.playing) {
            device.resume();
            log::debug!("Beep on");
        }
        self.playing = true;
    }

    pub fn stop(&mut self) {
        if let (Some(device), true) = (&self.device, self.playing) {
            device.pause();
            log::debug!("Beep off");
        }
        self.playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_wave_alternates() {
        let mut wave = SquareWave {
            phase_inc: 0.25,
            phase: 0.0,
            volume: 0.5,
        };
        let mut out = [0.0f32; 8];

        wave.callback(&mut out);

        assert_eq!(out, [0.5, 0.5, -0.5, -0.5, 0.5, 0.5, -0.5, -0.5]);
    }
}

mod audio;
mod keymap;

use std::{
    path::PathBuf,
    process::ExitCode,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use chip8_vm_core::{
    Chip8Builder, Chip8Color, DisplayBuffer, DrawMode, SoundEvent, TimerMode, KEY_COUNT,
    SCREEN_HEIGHT, SCREEN_WIDTH,
};
use clap::{ArgGroup, Parser, ValueEnum};
use log::LevelFilter;
use sdl2::{
    event::Event,
    keyboard::Keycode,
    pixels::{Color, PixelFormatEnum},
    render::{Canvas, Texture},
    video::Window,
};

use crate::audio::Beeper;

/// How often the window is re-presented while the machine is paused
const PAUSED_PRESENT_INTERVAL: Duration = Duration::from_millis(100);

/// CHIP-8 virtual machine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("speed").args(["slow", "med", "fast"])))]
struct Args {
    /// Filepath to Chip-8 ROM file that will be executed
    #[clap(index = 1)]
    rom: PathBuf,

    /// Run at about 540 instructions per second
    #[clap(long)]
    slow: bool,

    /// Run at about 960 instructions per second [default]
    #[clap(long)]
    med: bool,

    /// Run at about 1380 instructions per second
    #[clap(long)]
    fast: bool,

    /// Filepath to font file
    #[clap(long)]
    font: Option<PathBuf>,

    /// Background Color as HEX 0xAABBFF [default: 0x000000]
    #[clap(long)]
    background: Option<Chip8Color>,

    /// Foreground Color as HEX 0xAABBFF [default: 0xFFFFFF]
    #[clap(long)]
    foreground: Option<Chip8Color>,

    /// Display scaling factor
    #[clap(short, long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=100))]
    scale: u32,

    /// PRNG seed
    #[clap(long)]
    seed: Option<u64>,

    /// What happens to sprites drawn past the screen edge
    #[clap(long, value_enum, default_value_t = DrawModeArg::Wrap)]
    draw_mode: DrawModeArg,

    /// Where the 60 Hz timers are serviced
    #[clap(long, value_enum, default_value_t = TimerArg::Inline)]
    timer: TimerArg,

    /// Start with instruction tracing and register dumps switched on
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn speed(&self) -> Speed {
        if self.slow {
            Speed::Slow
        } else if self.fast {
            Speed::Fast
        } else {
            Speed::Medium
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Speed {
    Slow,
    Medium,
    Fast,
}

impl Speed {
    /// Delay between two instructions
    fn cycle_time(self) -> Duration {
        match self {
            Speed::Slow => Duration::from_nanos(1_851_852),
            Speed::Medium => Duration::from_nanos(1_041_667),
            Speed::Fast => Duration::from_nanos(724_638),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DrawModeArg {
    Wrap,
    Clip,
    Strict,
}

impl From<DrawModeArg> for DrawMode {
    fn from(arg: DrawModeArg) -> DrawMode {
        match arg {
            DrawModeArg::Wrap => DrawMode::Wrap,
            DrawModeArg::Clip => DrawMode::Clip,
            DrawModeArg::Strict => DrawMode::Strict,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TimerArg {
    Inline,
    Background,
}

impl From<TimerArg> for TimerMode {
    fn from(arg: TimerArg) -> TimerMode {
        match arg {
            TimerArg::Inline => TimerMode::Inline,
            TimerArg::Background => TimerMode::Background,
        }
    }
}

/// `--help` and `--version` end up here too and are not failures.
fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn log_env() -> env_logger::Env<'static> {
    env_logger::Env::default().default_filter_or("info")
}

/// Install the logger and return the level picked from the environment.
///
/// The core is always let through by the logger itself so tracing can be
/// switched on at run time with `log::set_max_level`.
fn init_logger(debug: bool) -> LevelFilter {
    let base = env_logger::Builder::from_env(log_env()).build().filter();

    let mut builder = env_logger::Builder::from_env(log_env());
    if debug {
        builder.filter_level(LevelFilter::Trace);
    }
    builder.filter_module("chip8_vm_core", LevelFilter::Trace);
    builder.init();

    log::set_max_level(debug_level(base, debug, debug));
    base
}

/// Max log level for the debugger switches: instructions are logged at
/// trace level, register dumps at debug level.
fn debug_level(base: LevelFilter, trace_instructions: bool, dump_registers: bool) -> LevelFilter {
    if trace_instructions {
        LevelFilter::Trace
    } else if dump_registers {
        base.max(LevelFilter::Debug)
    } else {
        base
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_exit_code(&err));
        }
    };

    let base_level = init_logger(args.debug);

    match run(&args, base_level) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, base_level: LevelFilter) -> Result<()> {
    let mut builder = Chip8Builder::new()
        .with_draw_mode(args.draw_mode.into())
        .with_timer_mode(args.timer.into());

    let rom_data = std::fs::read(&args.rom)
        .with_context(|| format!("failed to read ROM file {}", args.rom.display()))?;
    builder = builder.with_rom(rom_data);

    if let Some(font) = &args.font {
        let font_data = std::fs::read(font)
            .with_context(|| format!("failed to read font file {}", font.display()))?;
        builder = builder.with_font(font_data);
    }

    if let Some(foreground) = args.foreground {
        builder = builder.with_foreground(foreground);
    }

    let background = args.background.unwrap_or_default();
    builder = builder.with_background(background);

    if let Some(seed) = args.seed {
        builder = builder.with_rng_seed(seed);
    }

    builder = builder.with_register_dump(args.debug);

    let mut chip = builder.build().context("failed to load ROM")?;

    let sdl_context = sdl2::init()
        .map_err(|e| anyhow!(e))
        .context("failed to initialize SDL")?;
    let video_subsystem = sdl_context
        .video()
        .map_err(|e| anyhow!(e))
        .context("failed to initialize video")?;

    let window = video_subsystem
        .window(
            "chip8-vm",
            SCREEN_WIDTH as u32 * args.scale,
            SCREEN_HEIGHT as u32 * args.scale,
        )
        .position_centered()
        .build()
        .context("failed to create window")?;

    let mut canvas = window
        .into_canvas()
        .build()
        .context("failed to create canvas")?;

    canvas.set_draw_color(Color::RGB(background.r, background.g, background.b));
    canvas.clear();
    canvas.present();

    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(
            PixelFormatEnum::RGBX8888,
            SCREEN_WIDTH as u32,
            SCREEN_HEIGHT as u32,
        )
        .context("failed to create texture")?;

    let mut event_pump = sdl_context
        .event_pump()
        .map_err(|e| anyhow!(e))
        .context("failed to open event pump")?;

    let mut beeper = Beeper::open(&sdl_context);

    let delta_update = args.speed().cycle_time();
    let mut next_update = Instant::now();
    let mut last_present = next_update;
    let mut keys = [false; KEY_COUNT];
    let mut paused = false;
    let mut trace_instructions = args.debug;

    log::info!(
        "Running {} [speed: {:?}, timers: {:?}]",
        args.rom.display(),
        args.speed(),
        args.timer
    );

    let outcome: Result<()> = 'running: loop {
        // Wait until next update
        let now = Instant::now();
        if let Some(delay) = next_update.checked_duration_since(now) {
            ::std::thread::sleep(delay);
        }
        next_update += delta_update;

        chip.update_timers();

        // Process events
        let mut single_step = false;
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running Ok(()),
                Event::KeyDown {
                    keycode: Some(Keycode::P),
                    repeat: false,
                    ..
                } => {
                    paused = !paused;
                    log::info!("{}", if paused { "Paused" } else { "Resumed" });
                    // Don't try to catch up on the time spent paused
                    next_update = Instant::now();
                }
                Event::KeyDown {
                    keycode: Some(Keycode::N),
                    ..
                } if paused => single_step = true,
                Event::KeyDown {
                    keycode: Some(Keycode::I),
                    repeat: false,
                    ..
                } => {
                    trace_instructions = !trace_instructions;
                    log::set_max_level(debug_level(
                        base_level,
                        trace_instructions,
                        chip.register_dump(),
                    ));
                    log::info!("Instruction trace {}", on_off(trace_instructions));
                }
                Event::KeyDown {
                    keycode: Some(Keycode::O),
                    repeat: false,
                    ..
                } => {
                    let dump = !chip.register_dump();
                    chip.set_register_dump(dump);
                    log::set_max_level(debug_level(base_level, trace_instructions, dump));
                    log::info!("Register dump {}", on_off(dump));
                }
                Event::KeyDown {
                    keycode: Some(keycode),
                    ..
                } => {
                    if let Some(key) = keymap::chip8_key(keycode) {
                        keys[key as usize] = true;
                    }
                }
                Event::KeyUp {
                    keycode: Some(keycode),
                    ..
                } => {
                    if let Some(key) = keymap::chip8_key(keycode) {
                        keys[key as usize] = false;
                    }
                }
                _ => {}
            }
        }
        chip.set_keys(keys);

        // Execute one CHIP-8 instruction
        if !paused || single_step {
            if let Err(err) = chip.step() {
                break 'running Err(anyhow::Error::from(err).context("emulation stopped"));
            }
        }

        match chip.take_sound_event() {
            Some(SoundEvent::Start) => beeper.start(),
            Some(SoundEvent::Stop) => beeper.stop(),
            None => {}
        }

        // If display buffer was changed then draw changes on canvas
        let stale = paused && last_present.elapsed() >= PAUSED_PRESENT_INTERVAL;
        if chip.display().dirty() || stale {
            if let Err(err) = present(&mut canvas, &mut texture, chip.display()) {
                break 'running Err(err);
            }
            chip.display_mut().mark_rendered();
            last_present = Instant::now();
        }
    };

    if outcome.is_err() {
        // Leave a blank window behind rather than the last frame
        chip.display_mut().clear();
        if let Err(err) = present(&mut canvas, &mut texture, chip.display()) {
            log::warn!("Final render failed: {:#}", err);
        }
    }
    beeper.stop();
    chip.shutdown();

    outcome
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn present(
    canvas: &mut Canvas<Window>,
    texture: &mut Texture<'_>,
    display: &DisplayBuffer,
) -> Result<()> {
    // Copy CHIP-8 display buffer into GPU texture
    texture
        .update(None, display.buffer(), SCREEN_WIDTH * 4)
        .context("failed to upload frame")?;

    // Copy texture to Canvas
    canvas
        .copy(texture, None, None)
        .map_err(|e| anyhow!(e))
        .context("failed to copy frame")?;

    // present canvas on screen
    canvas.present();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("chip8-vm").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_speed_is_medium() {
        let args = parse(&["pong.ch8"]).unwrap();
        assert_eq!(args.speed(), Speed::Medium);
        assert_eq!(args.rom, PathBuf::from("pong.ch8"));
        assert_eq!(args.scale, 10);
        assert_eq!(args.draw_mode, DrawModeArg::Wrap);
        assert_eq!(args.timer, TimerArg::Inline);
    }

    #[test]
    fn test_speed_flags() {
        assert_eq!(parse(&["pong.ch8", "--slow"]).unwrap().speed(), Speed::Slow);
        assert_eq!(parse(&["pong.ch8", "--med"]).unwrap().speed(), Speed::Medium);
        assert_eq!(parse(&["--fast", "pong.ch8"]).unwrap().speed(), Speed::Fast);
    }

    #[test]
    fn test_cycle_times() {
        assert_eq!(Speed::Slow.cycle_time(), Duration::from_nanos(1_851_852));
        assert_eq!(Speed::Medium.cycle_time(), Duration::from_nanos(1_041_667));
        assert_eq!(Speed::Fast.cycle_time(), Duration::from_nanos(724_638));
        assert!(Speed::Slow.cycle_time() > Speed::Fast.cycle_time());
    }

    #[test]
    fn test_usage_errors_exit_1() {
        for bad in [
            &[][..],
            &["a.ch8", "b.ch8"][..],
            &["a.ch8", "--turbo"][..],
            &["a.ch8", "--slow", "--fast"][..],
            &["a.ch8", "--scale", "0"][..],
            &["a.ch8", "--draw-mode", "bounce"][..],
        ] {
            let err = parse(bad).unwrap_err();
            assert_eq!(usage_exit_code(&err), 1, "{:?}", bad);
        }
    }

    #[test]
    fn test_help_exits_0() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert_eq!(usage_exit_code(&err), 0);
    }

    #[test]
    fn test_debug_level_switches() {
        let base = LevelFilter::Info;
        assert_eq!(debug_level(base, false, false), LevelFilter::Info);
        assert_eq!(debug_level(base, false, true), LevelFilter::Debug);
        assert_eq!(debug_level(base, true, false), LevelFilter::Trace);
        assert_eq!(debug_level(base, true, true), LevelFilter::Trace);

        // Never quieter than what the environment asked for
        assert_eq!(debug_level(LevelFilter::Trace, false, true), LevelFilter::Trace);
        assert_eq!(debug_level(LevelFilter::Warn, false, false), LevelFilter::Warn);
    }

    #[test]
    fn test_options() {
        let args = parse(&[
            "pong.ch8",
            "--foreground",
            "0x33FF66",
            "--seed",
            "42",
            "--draw-mode",
            "strict",
            "--timer",
            "background",
            "-d",
        ])
        .unwrap();

        assert_eq!(args.foreground, Some(Chip8Color::new(0x33, 0xFF, 0x66)));
        assert_eq!(args.seed, Some(42));
        assert_eq!(DrawMode::from(args.draw_mode), DrawMode::Strict);
        assert_eq!(TimerMode::from(args.timer), TimerMode::Background);
        assert!(args.debug);
    }
}

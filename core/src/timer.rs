// Delay and sound timers.
//
// Both counters tick down at 60Hz of wall clock time no matter how fast the
// interpreter is stepped. Two strategies are available: the driver can catch
// the counters up inline every iteration, or a background thread can tick
// them on its own.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Length of one 60Hz tick
pub const TICK_NANOS: u64 = 16_666_666;
const HALF_TICK_NANOS: u64 = 8_333_333;

/// Wake up period of the background service
pub const SERVICE_PERIOD: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimerMode {
    /// Counters are caught up from elapsed time whenever [`Timers::update`] runs.
    #[default]
    Inline,
    /// A dedicated thread decrements the counters every [`SERVICE_PERIOD`].
    Background,
}

/// Edge of the sound timer, for driving a beeper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundEvent {
    Start,
    Stop,
}

/// An 8-bit countdown that can be shared with the background service.
///
/// There must only ever be one setter (the interpreter, through FX15/FX18)
/// and one decrementer (inline catch-up or the service thread). With that
/// contract a plain atomic is all the synchronisation needed.
#[derive(Debug, Clone, Default)]
pub struct TimerCounter(Arc<AtomicU8>);

impl TimerCounter {
    pub fn new() -> TimerCounter {
        TimerCounter::default()
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, value: u8) {
        self.0.store(value, Ordering::Release);
    }

    /// Count down by `ticks`, stopping at zero. Returns the new value.
    pub fn decrement(&self, ticks: u8) -> u8 {
        let res = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                (v > 0).then(|| v.saturating_sub(ticks))
            });
        match res {
            Ok(prev) => prev.saturating_sub(ticks),
            Err(_) => 0,
        }
    }
}

#[derive(Debug, Default)]
struct Countdown {
    counter: TimerCounter,
    /// Start of the tick in progress, `None` while the counter is idle
    since: Option<Instant>,
}

impl Countdown {
    fn set(&mut self, value: u8, now: Instant) {
        self.counter.set(value);
        if value == 0 {
            self.since = None;
        } else if self.since.is_none() {
            self.since = Some(now);
        }
    }

    fn catch_up(&mut self, now: Instant) {
        let Some(since) = self.since else {
            return;
        };

        if self.counter.get() == 0 {
            self.since = None;
            return;
        }

        // Round to the nearest tick so jitter in the driver loop doesn't
        // accumulate into drift
        let elapsed = now.saturating_duration_since(since).as_nanos() as u64;
        let ticks = (elapsed + HALF_TICK_NANOS) / TICK_NANOS;
        if ticks == 0 {
            return;
        }

        let left = self.counter.decrement(ticks.min(u8::MAX as u64) as u8);
        self.since = if left == 0 {
            None
        } else {
            Some(since + Duration::from_nanos(ticks * TICK_NANOS))
        };
    }
}

/// The delay and sound timers of one machine.
#[derive(Debug)]
pub struct Timers {
    mode: TimerMode,
    delay: Countdown,
    sound: Countdown,
    /// Sound state last reported through `take_sound_event`
    sound_playing: bool,
    /// FX18 started the sound, kept until reported even if the counter has
    /// already run out
    sound_started: bool,
    service: Option<TimerService>,
}

impl Timers {
    /// Create the timers, starting the service thread in background mode.
    pub fn new(mode: TimerMode) -> Timers {
        let delay = Countdown::default();
        let sound = Countdown::default();

        let service = match mode {
            TimerMode::Inline => None,
            TimerMode::Background => Some(TimerService::start(
                delay.counter.clone(),
                sound.counter.clone(),
            )),
        };

        Timers {
            mode,
            delay,
            sound,
            sound_playing: false,
            sound_started: false,
            service,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Catch both counters up to `now`. Does nothing in background mode.
    pub fn update(&mut self, now: Instant) {
        if self.mode == TimerMode::Inline {
            self.delay.catch_up(now);
            self.sound.catch_up(now);
        }
    }

    pub fn delay(&self) -> u8 {
        self.delay.counter.get()
    }

    pub fn sound(&self) -> u8 {
        self.sound.counter.get()
    }

    pub fn set_delay(&mut self, value: u8, now: Instant) {
        self.delay.set(value, now);
    }

    pub fn set_sound(&mut self, value: u8, now: Instant) {
        self.sound.set(value, now);
        self.sound_started |= value > 0;
    }

    pub fn is_delay_active(&self) -> bool {
        self.delay() > 0
    }

    pub fn is_sound_active(&self) -> bool {
        self.sound() > 0
    }

    /// Report the sound timer crossing between zero and non-zero. Each edge
    /// is reported once.
    pub fn take_sound_event(&mut self) -> Option<SoundEvent> {
        if self.sound_started && !self.sound_playing {
            self.sound_started = false;
            self.sound_playing = true;
            return Some(SoundEvent::Start);
        }
        self.sound_started = false;

        let active = self.is_sound_active();
        if active == self.sound_playing {
            return None;
        }

        self.sound_playing = active;
        Some(if active {
            SoundEvent::Start
        } else {
            SoundEvent::Stop
        })
    }

    /// Zero both counters, e.g. when a new ROM is loaded.
    pub fn reset(&mut self, now: Instant) {
        self.delay.set(0, now);
        self.sound.set(0, now);
        self.sound_started = false;
    }

    /// Stop and join the background service, if any. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(mut service) = self.service.take() {
            service.stop();
        }
    }
}

/// Background thread ticking both counters.
#[derive(Debug)]
struct TimerService {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerService {
    fn start(delay: TimerCounter, sound: TimerCounter) -> TimerService {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while flag.load(Ordering::Acquire) {
                delay.decrement(1);
                sound.decrement(1);
                thread::sleep(SERVICE_PERIOD);
            }
        });
        log::debug!("Timer service started");

        TimerService {
            running,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Timer service thread panicked");
            } else {
                log::debug!("Timer service stopped");
            }
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.stop();
    }
}

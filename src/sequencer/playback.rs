/// Playback engine - loop position, tempo and the clock thread that drives it
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_BPM: f64 = 120.0;
pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;

/// Columns are sixteenth notes.
const STEPS_PER_BEAT: f64 = 4.0;

/// Length of one column at `bpm`, in milliseconds.
pub fn tick_duration_ms(bpm: f64) -> f64 {
    60_000.0 / bpm / STEPS_PER_BEAT
}

/// Sounding time of a note `length` columns long at `bpm`.
pub fn note_duration_ms(length: u32, bpm: f64) -> f64 {
    length as f64 * tick_duration_ms(bpm)
}

/// Transport state: whether we are playing, where the playhead is and the
/// current tempo. `position` is `None` until the first tick after start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    playing: bool,
    position: Option<u32>,
    bpm: f64,
}

impl Playback {
    pub fn new(bpm: f64) -> Self {
        let mut playback = Self {
            playing: false,
            position: None,
            bpm: DEFAULT_BPM,
        };
        playback.set_bpm(bpm);
        playback
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Resumes from the current position.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Halts without rewinding.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn position(&self) -> Option<u32> {
        self.position
    }

    pub fn reset_position(&mut self) {
        self.position = Some(0);
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Non-finite tempos are ignored, everything else is clamped.
    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm.is_finite() {
            self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(tick_duration_ms(self.bpm) / 1000.0)
    }

    pub fn note_duration_ms(&self, length: u32) -> f64 {
        note_duration_ms(length, self.bpm)
    }

    /// Moves the playhead one column, wrapping at `pattern_length`.
    /// Returns the new position, or `None` when stopped.
    pub fn advance(&mut self, pattern_length: u32) -> Option<u32> {
        if !self.playing {
            return None;
        }
        let next = self.position.map_or(0, |p| p + 1);
        let next = if next >= pattern_length { 0 } else { next };
        self.position = Some(next);
        self.position
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

/// Something the clock can drive. The interval is asked for again before
/// every tick, so tempo changes apply from the next step.
pub trait Clocked {
    fn tick(&mut self);
    fn tick_interval(&self) -> Duration;
}

/// Spawns the clock thread for a shared target.
pub struct Transport;

impl Transport {
    pub fn start<T>(target: Arc<Mutex<T>>) -> TransportHandle
    where
        T: Clocked + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let thread = thread::spawn(move || {
            let mut last_step_time = Instant::now();

            while thread_running.load(Ordering::Acquire) {
                let now = Instant::now();
                let interval = target.lock().tick_interval();

                if now.duration_since(last_step_time) >= interval {
                    target.lock().tick();
                    last_step_time = next_step_time(last_step_time, interval, now);
                }

                thread::sleep(Duration::from_millis(1));
            }
            log::debug!("Clock thread exited");
        });

        log::info!("Transport clock started");
        TransportHandle {
            running,
            thread: Some(thread),
        }
    }
}

/// Step times advance by exactly one interval so sleep overshoot does not
/// accumulate. A clock a whole interval behind resyncs to `now`.
fn next_step_time(last: Instant, interval: Duration, now: Instant) -> Instant {
    let next = last + interval;
    if now.saturating_duration_since(next) >= interval {
        now
    } else {
        next
    }
}

/// Owns the clock thread. Stopping or dropping the handle cancels it.
pub struct TransportHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TransportHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Clock thread panicked");
            }
            log::info!("Transport clock stopped");
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_starts_at_zero() {
        let mut playback = Playback::default();
        assert_eq!(playback.position(), None);
        playback.play();
        assert_eq!(playback.advance(8), Some(0));
        assert_eq!(playback.advance(8), Some(1));
    }

    #[test]
    fn test_wraparound() {
        let mut playback = Playback::default();
        playback.play();
        for _ in 0..8 {
            playback.advance(8);
        }
        assert_eq!(playback.position(), Some(7));
        assert_eq!(playback.advance(8), Some(0));
    }

    #[test]
    fn test_stopped_does_not_advance() {
        let mut playback = Playback::default();
        playback.play();
        playback.advance(8);
        playback.advance(8);
        playback.stop();
        assert_eq!(playback.advance(8), None);
        assert_eq!(playback.position(), Some(1));

        playback.play();
        assert_eq!(playback.advance(8), Some(2));
    }

    #[test]
    fn test_durations() {
        assert_eq!(tick_duration_ms(120.0), 125.0);
        assert_eq!(note_duration_ms(4, 120.0), 500.0);

        let playback = Playback::new(120.0);
        assert_eq!(playback.tick_duration(), Duration::from_millis(125));
        assert_eq!(playback.note_duration_ms(1), 125.0);
    }

    #[test]
    fn test_bpm_clamped() {
        let mut playback = Playback::default();
        playback.set_bpm(1000.0);
        assert_eq!(playback.bpm(), MAX_BPM);
        playback.set_bpm(0.0);
        assert_eq!(playback.bpm(), MIN_BPM);
        playback.set_bpm(f64::NAN);
        assert_eq!(playback.bpm(), MIN_BPM);
    }

    #[test]
    fn test_step_times_do_not_drift() {
        let start = Instant::now();
        let interval = Duration::from_millis(10);

        let late = start + Duration::from_millis(11);
        assert_eq!(next_step_time(start, interval, late), start + interval);

        let mut last = start;
        for step in 1..=5u32 {
            let now = start + interval * step + Duration::from_millis(1);
            last = next_step_time(last, interval, now);
        }
        assert_eq!(last, start + interval * 5);
    }

    #[test]
    fn test_step_times_resync_when_far_behind() {
        let start = Instant::now();
        let interval = Duration::from_millis(10);
        let stalled = start + Duration::from_millis(35);
        assert_eq!(next_step_time(start, interval, stalled), stalled);
    }

    struct Counter {
        ticks: usize,
    }

    impl Clocked for Counter {
        fn tick(&mut self) {
            self.ticks += 1;
        }

        fn tick_interval(&self) -> Duration {
            Duration::from_millis(2)
        }
    }

    #[test]
    fn test_transport_ticks_until_stopped() {
        let counter = Arc::new(Mutex::new(Counter { ticks: 0 }));
        let mut handle = Transport::start(Arc::clone(&counter));
        assert!(handle.is_running());

        thread::sleep(Duration::from_millis(60));
        handle.stop();
        assert!(!handle.is_running());

        let ticks = counter.lock().ticks;
        assert!(ticks > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.lock().ticks, ticks);
    }

    #[test]
    fn test_dropping_handle_stops_clock() {
        let counter = Arc::new(Mutex::new(Counter { ticks: 0 }));
        {
            let _handle = Transport::start(Arc::clone(&counter));
            thread::sleep(Duration::from_millis(20));
        }
        let ticks = counter.lock().ticks;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.lock().ticks, ticks);
        assert_eq!(Arc::strong_count(&counter), 1);
    }
}

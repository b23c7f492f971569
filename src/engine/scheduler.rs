use std::time::Duration;

use tracing::debug;

use super::frame::to_sample_index;
use crate::models::playback::{PlaybackCommand, PlaybackState, PlaybackStatus};

/// Shortest effective step interval; keeps absurd speed multipliers from
/// spinning the advance loop on a zero-length interval.
const MIN_STEP_INTERVAL: Duration = Duration::from_micros(50);

/// Outcome of one advance call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Advance {
    /// Stride-sized steps taken.
    pub steps: u64,
    /// The cursor hit the last tick and playback auto-paused.
    pub reached_end: bool,
}

/// Playback cursor and state machine over one sample series.
///
/// Time enters only through [`PlaybackScheduler::advance`], which carries the
/// fractional remainder of elapsed time from call to call. The owner decides
/// how often to call it.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    tick: u64,
    status: PlaybackStatus,
    speed: f64,
    total_ticks: u64,
    stride: u64,
    sample_count: usize,
    base_interval: Duration,
    accumulated: Duration,
}

impl PlaybackScheduler {
    pub fn new(total_ticks: u64, stride: u64, sample_count: usize, base_interval: Duration) -> Self {
        Self {
            tick: 0,
            status: PlaybackStatus::Stopped,
            speed: 1.0,
            total_ticks,
            stride: stride.max(1),
            sample_count,
            base_interval,
            accumulated: Duration::ZERO,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            tick: self.tick,
            playing: self.is_playing(),
            speed_multiplier: self.speed,
            status: self.status,
            total_ticks: self.total_ticks,
            stride: self.stride,
            sample_index: to_sample_index(self.tick, self.stride, self.sample_count),
        }
    }

    /// Wall-clock time per stride-sized step at the current speed.
    pub fn step_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_interval.as_secs_f64() / self.speed)
            .unwrap_or(Duration::MAX)
            .max(MIN_STEP_INTERVAL)
    }

    fn last_tick(&self) -> u64 {
        self.total_ticks.saturating_sub(1)
    }

    // ── Commands ──

    pub fn apply(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Stop => self.stop(),
            PlaybackCommand::Seek(t) => self.seek(t),
            PlaybackCommand::Jump(d) => self.jump(d),
            PlaybackCommand::SetSpeed(s) => self.set_speed(s),
        }
    }

    /// Start advancing. An empty stream never enters `Playing`.
    pub fn play(&mut self) {
        if self.is_playing() || self.total_ticks == 0 {
            return;
        }
        self.status = PlaybackStatus::Playing;
        self.accumulated = Duration::ZERO;
        debug!("play from tick {}", self.tick);
    }

    pub fn pause(&mut self) {
        if self.is_playing() {
            self.status = PlaybackStatus::Paused;
            debug!("pause at tick {}", self.tick);
        }
    }

    pub fn stop(&mut self) {
        self.status = PlaybackStatus::Stopped;
        self.tick = 0;
        self.accumulated = Duration::ZERO;
        debug!("stop");
    }

    /// Move to an absolute tick, clamped into the stream. Play state is kept.
    pub fn seek(&mut self, tick: i64) {
        self.move_to(u64::try_from(tick).unwrap_or(0));
    }

    /// Move by a signed number of ticks, clamped into the stream.
    pub fn jump(&mut self, delta: i64) {
        let target = if delta >= 0 {
            self.tick.saturating_add(delta as u64)
        } else {
            self.tick.saturating_sub(delta.unsigned_abs())
        };
        self.move_to(target);
    }

    fn move_to(&mut self, tick: u64) {
        self.tick = tick.min(self.last_tick());
    }

    /// Change speed. Non-positive or non-finite multipliers are ignored.
    /// Time already accumulated is kept and measured against the new interval.
    pub fn set_speed(&mut self, multiplier: f64) {
        if multiplier.is_finite() && multiplier > 0.0 {
            self.speed = multiplier;
        } else {
            debug!("ignoring speed multiplier {}", multiplier);
        }
    }

    // ── Time ──

    /// Account for `elapsed` wall-clock time and take every step it pays for.
    ///
    /// Each step consumes exactly one step interval from the accumulator so
    /// overshoot carries into the next call. Reaching the end clamps the
    /// cursor to the last tick and pauses.
    pub fn advance(&mut self, elapsed: Duration) -> Advance {
        let mut result = Advance::default();
        if !self.is_playing() {
            return result;
        }

        let interval = self.step_interval();
        self.accumulated += elapsed;
        while self.accumulated >= interval {
            self.accumulated -= interval;
            result.steps += 1;
            let next = self.tick.saturating_add(self.stride);
            if next >= self.total_ticks {
                self.tick = self.last_tick();
                self.status = PlaybackStatus::Paused;
                self.accumulated = Duration::ZERO;
                result.reached_end = true;
                debug!("end of stream at tick {}", self.tick);
                break;
            }
            self.tick = next;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const BASE: Duration = Duration::from_millis(500);

    fn scheduler(total: u64, stride: u64) -> PlaybackScheduler {
        PlaybackScheduler::new(total, stride, total.div_ceil(stride) as usize, BASE)
    }

    #[test]
    fn test_initial_state() {
        let s = scheduler(5_000, 1);
        let state = s.state();
        assert_eq!(state.tick, 0);
        assert!(!state.playing);
        assert_eq!(state.status, PlaybackStatus::Stopped);
        assert_eq!(state.speed_multiplier, 1.0);
    }

    #[test]
    fn test_transitions() {
        let mut s = scheduler(5_000, 1);
        s.pause();
        assert_eq!(s.status(), PlaybackStatus::Stopped);
        s.play();
        assert_eq!(s.status(), PlaybackStatus::Playing);
        s.play();
        assert_eq!(s.status(), PlaybackStatus::Playing);
        s.pause();
        assert_eq!(s.status(), PlaybackStatus::Paused);
        s.play();
        assert_eq!(s.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_stop_always_resets_tick() {
        let mut s = scheduler(5_000, 1);
        for status_setup in [0, 1, 2] {
            s.seek(1_234);
            match status_setup {
                0 => s.play(),
                1 => {
                    s.play();
                    s.pause();
                }
                _ => {}
            }
            s.stop();
            assert_eq!(s.tick(), 0);
            assert_eq!(s.status(), PlaybackStatus::Stopped);
        }
    }

    #[test]
    fn test_seek_and_jump_clamp() {
        let mut s = scheduler(5_000, 1);
        s.seek(250);
        s.jump(-1_000);
        assert_eq!(s.tick(), 0);
        s.seek(9_999_999);
        assert_eq!(s.tick(), 4_999);
        s.seek(-5);
        assert_eq!(s.tick(), 0);
        s.seek(i64::MAX);
        assert_eq!(s.tick(), 4_999);
        s.jump(i64::MAX);
        assert_eq!(s.tick(), 4_999);
        s.jump(i64::MIN);
        assert_eq!(s.tick(), 0);
        s.jump(100);
        assert_eq!(s.tick(), 100);
    }

    #[test]
    fn test_negative_seek_from_wire_lands_on_zero() {
        let mut s = scheduler(5_000, 1);
        s.seek(300);
        let cmd: PlaybackCommand = serde_json::from_str(r#"{"type":"seek","value":-5}"#).unwrap();
        s.apply(cmd);
        assert_eq!(s.tick(), 0);
    }

    #[test]
    fn test_seek_keeps_play_state() {
        let mut s = scheduler(5_000, 1);
        s.play();
        s.seek(42);
        assert!(s.is_playing());
        s.pause();
        s.jump(8);
        assert_eq!(s.status(), PlaybackStatus::Paused);
        assert_eq!(s.tick(), 50);
    }

    #[test]
    fn test_no_advance_unless_playing() {
        let mut s = scheduler(5_000, 10);
        assert_eq!(s.advance(Duration::from_secs(10)), Advance::default());
        assert_eq!(s.tick(), 0);
    }

    #[test]
    fn test_advance_carries_remainder() {
        let mut s = scheduler(5_000, 10);
        s.play();
        assert_eq!(s.advance(Duration::from_millis(300)).steps, 0);
        assert_eq!(s.advance(Duration::from_millis(300)).steps, 1);
        assert_eq!(s.tick(), 10);
        // 100ms carried over + 400ms = one more step.
        assert_eq!(s.advance(Duration::from_millis(400)).steps, 1);
        assert_eq!(s.tick(), 20);
        assert_eq!(s.advance(Duration::from_millis(1_000)).steps, 2);
        assert_eq!(s.tick(), 40);
    }

    #[test]
    fn test_end_of_stream_auto_pauses() {
        let mut s = scheduler(25, 10);
        s.play();
        let adv = s.advance(Duration::from_secs(60));
        assert!(adv.reached_end);
        assert_eq!(adv.steps, 3);
        assert_eq!(s.tick(), 24);
        assert_eq!(s.status(), PlaybackStatus::Paused);
        assert_ne!(s.status(), PlaybackStatus::Stopped);
        assert_eq!(s.state().sample_index, 2);
    }

    #[test]
    fn test_empty_stream_never_plays() {
        let mut s = PlaybackScheduler::new(0, 1, 0, BASE);
        s.play();
        assert_eq!(s.status(), PlaybackStatus::Stopped);
        s.seek(10);
        assert_eq!(s.tick(), 0);
    }

    #[test]
    fn test_set_speed_rejects_non_positive() {
        let mut s = scheduler(100, 1);
        s.set_speed(4.0);
        s.set_speed(0.0);
        s.set_speed(-2.0);
        s.set_speed(f64::NAN);
        assert_eq!(s.speed(), 4.0);
        assert_eq!(s.step_interval(), Duration::from_millis(125));
    }

    #[test]
    fn test_playback_monotonic_in_stride_multiples() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut s = scheduler(100_000, 37);
        s.play();
        let mut last = s.tick();
        while s.is_playing() {
            s.advance(Duration::from_millis(rng.gen_range(1..40)));
            let now = s.tick();
            assert!(now >= last);
            if s.is_playing() {
                assert_eq!((now - last) % 37, 0);
            }
            last = now;
        }
        assert_eq!(s.tick(), 99_999);
    }

    #[test]
    fn test_double_speed_doubles_long_run_rate() {
        fn steps_over(speed: f64, seed: u64) -> u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut s = scheduler(u64::MAX, 1);
            s.set_speed(speed);
            s.play();
            let mut steps = 0;
            // ~10 minutes of jittery 8..25ms frames.
            for _ in 0..40_000 {
                steps += s.advance(Duration::from_micros(rng.gen_range(8_000..25_000))).steps;
            }
            steps
        }
        let normal = steps_over(1.0, 11) as f64;
        let double = steps_over(2.0, 11) as f64;
        let ratio = double / normal;
        assert!((ratio - 2.0).abs() < 0.01, "ratio was {}", ratio);
    }

    #[test]
    fn test_speed_change_keeps_accumulated_time() {
        let mut s = scheduler(5_000, 1);
        s.play();
        s.advance(Duration::from_millis(300));
        // At 2x the interval is 250ms; the 300ms already banked pays for a step.
        s.set_speed(2.0);
        assert_eq!(s.advance(Duration::ZERO).steps, 1);
        assert_eq!(s.tick(), 1);
    }
}

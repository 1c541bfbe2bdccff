use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Delta-time source for the update step.
///
/// Delta time is clamped so a stalled window (dragging, debugger) does not
/// spin the orbital camera by a large jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            last: now,
            frame_index: 0,
            dt_max: Duration::from_millis(250),
        }
    }

    /// Advances the clock and returns the clamped delta in seconds.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).min(self.dt_max);
        self.last = now;
        self.frame_index = self.frame_index.wrapping_add(1);
        dt.as_secs_f32()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

const FPS_SAMPLES: usize = 30;
const FPS_REFRESH: Duration = Duration::from_millis(500);

/// Frame-rate readout averaged over the last 30 frames, refreshed twice a second.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    samples: VecDeque<f32>,
    since_refresh: Duration,
    shown: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        if self.samples.len() == FPS_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(dt);

        self.since_refresh += Duration::from_secs_f32(dt);
        if self.shown == 0 || self.since_refresh >= FPS_REFRESH {
            self.since_refresh = Duration::ZERO;
            let average = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
            self.shown = (1.0 / average).round() as u32;
        }
    }

    pub fn fps(&self) -> u32 {
        self.shown
    }
}

/// Schedules redraws at a fixed target rate.
#[derive(Debug, Clone)]
pub struct FramePacer {
    period: Duration,
    next: Instant,
}

impl FramePacer {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, next: now }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    pub fn next_deadline(&self) -> Instant {
        self.next
    }

    /// Books the next frame one period after the previous deadline, or one
    /// period from now if the loop fell behind.
    pub fn frame_started(&mut self, now: Instant) {
        let scheduled = self.next + self.period;
        self.next = if scheduled > now {
            scheduled
        } else {
            now + self.period
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_ignores_non_finite_delta() {
        let mut fps = FpsCounter::new();
        fps.record(f32::NAN);
        fps.record(f32::INFINITY);
        assert_eq!(fps.fps(), 0);

        fps.record(0.02);
        fps.record(f32::NAN);
        assert_eq!(fps.fps(), 50);
    }

    #[test]
    fn clock_clamps_long_stalls() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start);
        let dt = clock.tick(start + Duration::from_secs(3));
        assert!((dt - 0.25).abs() < 1e-6);
        assert_eq!(clock.frame_index(), 1);
    }

    #[test]
    fn fps_averages_recent_frames() {
        let mut fps = FpsCounter::new();
        for _ in 0..60 {
            fps.record(1.0 / 60.0);
        }
        assert_eq!(fps.fps(), 60);

        for _ in 0..60 {
            fps.record(1.0 / 30.0);
        }
        assert_eq!(fps.fps(), 30);
    }

    #[test]
    fn fps_ignores_zero_delta() {
        let mut fps = FpsCounter::new();
        fps.record(0.0);
        assert_eq!(fps.fps(), 0);
    }

    #[test]
    fn pacer_keeps_cadence_and_recovers_when_late() {
        let start = Instant::now();
        let period = Duration::from_millis(16);
        let mut pacer = FramePacer::new(period, start);
        assert!(pacer.is_due(start));

        pacer.frame_started(start);
        assert_eq!(pacer.next_deadline(), start + period);
        assert!(!pacer.is_due(start + Duration::from_millis(10)));

        let late = start + Duration::from_millis(100);
        pacer.frame_started(late);
        assert_eq!(pacer.next_deadline(), late + period);
    }
}

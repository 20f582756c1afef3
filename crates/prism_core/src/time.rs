use std::time::{Duration, Instant};

/// Frame clock. All readings are sampled at the last `update`, so every
/// consumer within one frame sees the same time.
pub struct Time {
    startup: Instant,
    frame_start: Instant,
    delta: Duration,
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::starting_at(Instant::now())
    }
}

impl Time {
    pub fn starting_at(startup: Instant) -> Self {
        Self {
            startup,
            frame_start: startup,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Called by the frame driver once per frame.
    pub fn update(&mut self) {
        self.advance_to(Instant::now());
    }

    pub fn advance_to(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.frame_start);
        self.frame_start = now;
        self.frame_count += 1;
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Seconds from startup to the current frame. Drives light motion.
    pub fn elapsed_seconds(&self) -> f32 {
        self.since_startup().as_secs_f32()
    }

    pub fn frame_timestamp_ms(&self) -> f64 {
        self.since_startup().as_secs_f64() * 1000.0
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn since_startup(&self) -> Duration {
        self.frame_start.saturating_duration_since(self.startup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_are_sampled_per_frame() {
        let start = Instant::now();
        let mut time = Time::starting_at(start);
        assert_eq!(time.frame_count(), 0);
        assert_eq!(time.elapsed_seconds(), 0.0);

        time.advance_to(start + Duration::from_millis(16));
        time.advance_to(start + Duration::from_millis(40));

        assert_eq!(time.frame_count(), 2);
        assert!((time.delta_seconds() - 0.024).abs() < 1e-6);
        assert!((time.frame_timestamp_ms() - 40.0).abs() < 1e-9);
    }
}

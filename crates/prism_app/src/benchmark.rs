//! Frame-rate benchmark driven by the frame loop's post-frame hook.

/// One run in progress. Feed it a timestamp after every presented frame.
#[derive(Debug, Clone)]
pub struct Benchmark {
    frames: u32,
    warmup_frames: u32,
    frame_count: u32,
    start_ms: f64,
}

impl Benchmark {
    pub fn new(frames: u32, warmup_frames: u32) -> Self {
        Self {
            frames: frames.max(2),
            warmup_frames: warmup_frames.min(frames.saturating_sub(1)),
            frame_count: 0,
            start_ms: 0.0,
        }
    }

    /// Returns the average fps once `frames` frames have been seen.
    ///
    /// The clock restarts at the last warm-up frame, so frames inside the
    /// warm-up window never count towards the measurement.
    pub fn on_frame(&mut self, timestamp_ms: f64) -> Option<f64> {
        if self.frame_count == 0 {
            self.start_ms = timestamp_ms;
        }
        self.frame_count += 1;

        if self.frame_count == self.warmup_frames {
            self.start_ms = timestamp_ms;
            None
        } else if self.frame_count >= self.frames {
            let duration_ms = timestamp_ms - self.start_ms;
            if duration_ms <= 0.0 {
                // Keep measuring until the window has a positive length.
                log::debug!("Benchmark window has no measurable duration after {} frames", self.frame_count);
                return None;
            }
            Some(1000.0 * (self.frame_count - 1) as f64 / duration_ms)
        } else {
            None
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }
}

/// Results of every completed run this session.
#[derive(Debug, Default, Clone)]
pub struct BenchmarkHistory {
    results: Vec<f64>,
}

impl BenchmarkHistory {
    pub fn record(&mut self, fps: f64) {
        self.results.push(fps);
    }

    pub fn runs(&self) -> usize {
        self.results.len()
    }

    pub fn average_fps(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        Some(self.results.iter().sum::<f64>() / self.results.len() as f64)
    }
}

use std::time::Instant;

/// Instantaneous frame rate from the spacing of consecutive frames
#[derive(Debug, Clone, Copy)]
pub struct FpsMeter {
    last: Instant,
    current: u32,
}

impl FpsMeter {
    pub fn new(start: Instant) -> Self {
        Self {
            last: start,
            current: 0,
        }
    }

    /// `floor(1 / elapsed)`, or 0 when no time has passed
    pub fn tick(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.current = if elapsed > 0.0 {
            (1.0 / elapsed).floor() as u32
        } else {
            0
        };
        self.current
    }

    pub fn current(&self) -> u32 {
        self.current
    }
}

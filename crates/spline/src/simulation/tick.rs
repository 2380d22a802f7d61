/// Splits wall-clock time into fixed millisecond steps.
pub struct FixedTimestep {
    step_ms: u32,
    accumulator_ms: u32,
}

impl FixedTimestep {
    /// Longest catch-up accepted per call to [`FixedTimestep::accumulate`].
    pub const MAX_CATCH_UP_MS: u32 = 250;

    pub fn new(tick_rate: u32) -> Self {
        Self {
            step_ms: (1000 / tick_rate.max(1)).max(1),
            accumulator_ms: 0,
        }
    }

    pub fn step_ms(&self) -> u32 {
        self.step_ms
    }

    pub fn accumulate(&mut self, delta_ms: u32) {
        self.accumulator_ms += delta_ms.min(Self::MAX_CATCH_UP_MS);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator_ms >= self.step_ms {
            self.accumulator_ms -= self.step_ms;
            true
        } else {
            false
        }
    }
}

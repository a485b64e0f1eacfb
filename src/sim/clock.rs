/// Fixed-step simulation clock. Time is derived from the step counter so it
/// never accumulates rounding drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    step: u64,
    dt: f64,
}

impl SimulationClock {
    pub fn new(dt: f64) -> Self {
        Self { step: 0, dt }
    }

    pub fn tick(&mut self) {
        self.step += 1;
    }

    pub fn time(&self) -> f64 {
        self.step as f64 * self.dt
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    /// Tolerance for comparing clock time against event thresholds.
    pub fn epsilon(&self) -> f64 {
        self.dt * 1e-9
    }
}

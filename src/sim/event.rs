use std::collections::BTreeMap;

use crate::dynamics::state::{BodyId, CoupledSystem};

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// Scalar observables a sign-change trigger can watch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    VerticalVelocity(BodyId),
    Altitude(BodyId),
}

impl Signal {
    pub fn body(&self) -> BodyId {
        match *self {
            Signal::VerticalVelocity(id) | Signal::Altitude(id) => id,
        }
    }

    pub fn value(&self, system: &CoupledSystem) -> f64 {
        match *self {
            Signal::VerticalVelocity(id) => system.body(id).vel.z,
            Signal::Altitude(id) => system.body(id).altitude(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// Previous value > 0, current value <= 0.
    Falling,
    /// Previous value < 0, current value >= 0.
    Rising,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    SignChange { signal: Signal, crossing: Crossing },
    /// First step with `time >= t`.
    AtTime(f64),
    /// First step with `time >= times[reference] + delay`.
    AfterEvent { reference: String, delay: f64 },
}

// ---------------------------------------------------------------------------
// Named event timestamps
// ---------------------------------------------------------------------------

/// Write-once registry of event firing times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTimes(BTreeMap<String, f64>);

impl EventTimes {
    /// Record `name` at `time`. Returns false (and keeps the first value) if
    /// the name was already recorded.
    pub fn record(&mut self, name: &str, time: f64) -> bool {
        if self.0.contains_key(name) {
            return false;
        }
        self.0.insert(name.to_string(), time);
        true
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// What a detector may look at when evaluated after a step.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub time: f64,
    /// Tolerance for time thresholds.
    pub epsilon: f64,
    pub prev: &'a CoupledSystem,
    pub current: &'a CoupledSystem,
    pub times: &'a EventTimes,
}

/// A named, edge-triggered event. Once latched it stays retired until
/// [`EventDetector::reset`] is called.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetector {
    name: String,
    priority: i32,
    trigger: Trigger,
    fired_at: Option<f64>,
}

impl EventDetector {
    /// Lower `priority` values are evaluated first.
    pub fn new(name: impl Into<String>, priority: i32, trigger: Trigger) -> Self {
        Self { name: name.into(), priority, trigger, fired_at: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn fired_at(&self) -> Option<f64> {
        self.fired_at
    }

    pub fn has_fired(&self) -> bool {
        self.fired_at.is_some()
    }

    /// Raw predicate, side-effect free.
    pub fn evaluate(&self, ctx: &EventContext) -> bool {
        match &self.trigger {
            Trigger::SignChange { signal, crossing } => {
                let before = signal.value(ctx.prev);
                let after = signal.value(ctx.current);
                match crossing {
                    Crossing::Falling => before > 0.0 && after <= 0.0,
                    Crossing::Rising => before < 0.0 && after >= 0.0,
                }
            }
            Trigger::AtTime(t) => ctx.time >= *t - ctx.epsilon,
            Trigger::AfterEvent { reference, delay } => match ctx.times.get(reference) {
                Some(t_ref) => ctx.time >= t_ref + delay - ctx.epsilon,
                None => false,
            },
        }
    }

    /// Edge-triggered poll: true exactly once, on the first step the
    /// predicate holds.
    pub fn poll(&mut self, ctx: &EventContext) -> bool {
        if self.fired_at.is_some() {
            return false;
        }
        if self.evaluate(ctx) {
            self.latch(ctx.time);
            return true;
        }
        false
    }

    /// Mark the detector as fired at `time` without evaluating it.
    pub fn latch(&mut self, time: f64) {
        self.fired_at = Some(time);
    }

    pub fn reset(&mut self) {
        self.fired_at = None;
    }
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredEvent {
    pub name: String,
    pub time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::RigidBodyState;
    use nalgebra::Vector3;

    fn make_system(alt: f64, vz: f64) -> CoupledSystem {
        CoupledSystem::new(vec![RigidBodyState::point(
            Vector3::new(0.0, 0.0, alt),
            Vector3::new(0.0, 0.0, vz),
            10.0,
        )])
    }

    fn apogee() -> EventDetector {
        EventDetector::new(
            "apogee",
            0,
            Trigger::SignChange {
                signal: Signal::VerticalVelocity(BodyId(0)),
                crossing: Crossing::Falling,
            },
        )
    }

    #[test]
    fn apogee_fires_once_on_first_sign_change() {
        let trace = [30.0, 20.0, 10.0, 0.5, -9.5, -19.5, -29.5, -10.0, 5.0, -5.0];
        let times = EventTimes::default();
        let mut det = apogee();
        let mut fired = vec![];
        for (i, w) in trace.windows(2).enumerate() {
            let prev = make_system(100.0, w[0]);
            let curr = make_system(100.0, w[1]);
            let ctx = EventContext {
                time: (i + 1) as f64,
                epsilon: 1e-9,
                prev: &prev,
                current: &curr,
                times: &times,
            };
            if det.poll(&ctx) {
                fired.push(ctx.time);
            }
        }
        // Index 4 is the first negative sample; the later re-crossing is ignored
        assert_eq!(fired, vec![4.0]);
        assert_eq!(det.fired_at(), Some(4.0));
    }

    #[test]
    fn latched_detector_does_not_refire() {
        let times = EventTimes::default();
        let prev = make_system(5000.0, 10.0);
        let curr = make_system(5005.0, -1.0);
        let ctx = EventContext { time: 1.0, epsilon: 0.0, prev: &prev, current: &curr, times: &times };
        let mut det = apogee();
        assert!(det.evaluate(&ctx));
        assert!(det.poll(&ctx));
        assert!(!det.poll(&ctx));
        assert_eq!(det.fired_at(), Some(1.0));
        det.reset();
        assert!(det.poll(&ctx), "explicit reset re-arms");
    }

    #[test]
    fn level_condition_alone_does_not_fire() {
        // Already descending on both samples: no crossing
        let times = EventTimes::default();
        let prev = make_system(100.0, -1.0);
        let curr = make_system(99.0, -2.0);
        let ctx = EventContext { time: 1.0, epsilon: 0.0, prev: &prev, current: &curr, times: &times };
        assert!(!apogee().evaluate(&ctx));
    }

    #[test]
    fn rising_altitude_crossing() {
        let det = EventDetector::new(
            "ground",
            0,
            Trigger::SignChange { signal: Signal::Altitude(BodyId(0)), crossing: Crossing::Rising },
        );
        let times = EventTimes::default();
        let prev = make_system(-0.2, 1.0);
        let curr = make_system(0.0, 1.0);
        let ctx = EventContext { time: 1.0, epsilon: 0.0, prev: &prev, current: &curr, times: &times };
        assert!(det.evaluate(&ctx));
    }

    #[test]
    fn absolute_time_threshold() {
        let mut det = EventDetector::new("timer", 1, Trigger::AtTime(9.0));
        let times = EventTimes::default();
        let sys = make_system(0.0, 0.0);
        let mut ctx = EventContext { time: 8.95, epsilon: 1e-11, prev: &sys, current: &sys, times: &times };
        assert!(!det.poll(&ctx));
        ctx.time = 0.05 * 180.0;
        assert!(det.poll(&ctx));
    }

    #[test]
    fn relative_threshold_waits_for_reference() {
        let mut det = EventDetector::new(
            "full",
            2,
            Trigger::AfterEvent { reference: "apogee".into(), delay: 0.1 },
        );
        let sys = make_system(0.0, 0.0);
        let mut times = EventTimes::default();
        let ctx = EventContext { time: 50.0, epsilon: 1e-12, prev: &sys, current: &sys, times: &times };
        assert!(!det.poll(&ctx), "no reference recorded yet");

        // Apogee at step 253 of dt = 0.01; full deployment due on step 263
        let dt = 0.01;
        assert!(times.record("apogee", 253.0 * dt));
        assert!(!times.record("apogee", 300.0 * dt), "write once");
        let before = EventContext { time: 262.0 * dt, epsilon: dt * 1e-9, prev: &sys, current: &sys, times: &times };
        assert!(!det.poll(&before));
        let on = EventContext { time: 263.0 * dt, ..before };
        assert!(det.poll(&on));
    }
}

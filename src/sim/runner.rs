use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::dynamics::state::{BodyId, CoupledSystem, SimConfig};
use crate::error::{SimError, SimResult};

use super::clock::SimulationClock;
use super::event::{EventContext, EventDetector, EventTimes, FiredEvent, Trigger};
use super::initial::InitialConditions;
use super::integrator::{rk4_step, SystemDynamics};
use super::recorder::{FieldPath, FieldValue, RecordConfig, Recorder, Snapshot};
use super::transition::{apply_updates, TransitionHandler};

// ---------------------------------------------------------------------------
// Stop condition and status
// ---------------------------------------------------------------------------

/// Terminates the run when it returns true. Evaluated after every step.
pub type StopPredicate = Box<dyn Fn(f64, &CoupledSystem) -> bool>;

/// Stop once `body` is strictly below `altitude`.
pub fn stop_below(body: BodyId, altitude: f64) -> StopPredicate {
    Box::new(move |_t, sys: &CoupledSystem| sys.body(body).altitude() < altitude)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop predicate held.
    Condition,
    /// `max_time` reached first.
    TimeLimit,
    /// A transition was rejected. The step that hit it returned the error.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Stopped(StopReason),
}

impl RunStatus {
    pub fn is_running(self) -> bool {
        self == RunStatus::Running
    }
}

// ---------------------------------------------------------------------------
// Run result
// ---------------------------------------------------------------------------

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct FlightLog {
    pub fields: Vec<FieldPath>,
    pub snapshots: Vec<Snapshot>,
    pub events: Vec<FiredEvent>,
    pub stop_reason: StopReason,
    pub final_time: f64,
    pub steps: u64,
    pub final_state: CoupledSystem,
}

impl FlightLog {
    pub fn event_time(&self, name: &str) -> Option<f64> {
        self.events.iter().find(|e| e.name == name).map(|e| e.time)
    }

    /// Recorded samples of one field, skipping ticks where it had no value.
    pub fn series(&self, path: FieldPath) -> Vec<(f64, FieldValue)> {
        let Some(col) = self.fields.iter().position(|f| *f == path) else {
            return vec![];
        };
        self.snapshots
            .iter()
            .filter_map(|s| s.values[col].clone().map(|v| (s.time, v)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

struct BoundEvent {
    detector: EventDetector,
    handler: Box<dyn TransitionHandler>,
}

/// Fixed-step hybrid simulation: continuous RK4 integration interleaved with
/// edge-triggered events that rewrite the coupled state between steps.
pub struct Simulation<D: SystemDynamics> {
    dynamics: D,
    config: SimConfig,
    clock: SimulationClock,
    system: CoupledSystem,
    events: Vec<BoundEvent>,
    times: EventTimes,
    fired: Vec<FiredEvent>,
    stop: StopPredicate,
    recorder: Recorder,
    status: RunStatus,
}

impl<D: SystemDynamics> Simulation<D> {
    pub fn builder(dynamics: D, system: CoupledSystem) -> SimulationBuilder<D> {
        SimulationBuilder::new(dynamics, system)
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn system(&self) -> &CoupledSystem {
        &self.system
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Every firing in order. A detector re-armed with
    /// [`Simulation::reset_event`] appears once per firing, while
    /// [`Simulation::event_times`] keeps its first time.
    pub fn fired_events(&self) -> &[FiredEvent] {
        &self.fired
    }

    pub fn event_times(&self) -> &EventTimes {
        &self.times
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        self.recorder.snapshots()
    }

    /// Detectors in evaluation order.
    pub fn detectors(&self) -> impl Iterator<Item = &EventDetector> {
        self.events.iter().map(|e| &e.detector)
    }

    /// Re-arm a latched detector. Returns false if no event has that name.
    pub fn reset_event(&mut self, name: &str) -> bool {
        match self.events.iter_mut().find(|e| e.detector.name() == name) {
            Some(bound) => {
                bound.detector.reset();
                debug!(event = name, "event re-armed");
                true
            }
            None => false,
        }
    }

    /// One tick: integrate, poll events and apply their transitions, check
    /// the stop condition, record. A stopped simulation does not advance.
    ///
    /// An event is latched and timestamped only once its transition has been
    /// applied. A rejected transition stops the run as
    /// [`StopReason::Aborted`] with the tick recorded and the error returned.
    pub fn step(&mut self) -> SimResult<RunStatus> {
        if let RunStatus::Stopped(_) = self.status {
            return Ok(self.status);
        }

        let prev = self.system.clone();
        let next = rk4_step(&self.dynamics, self.clock.time(), &self.system, self.clock.dt());
        self.clock.tick();
        self.system = next;

        let time = self.clock.time();
        let epsilon = self.clock.epsilon();

        for bound in &mut self.events {
            if bound.detector.has_fired() {
                continue;
            }
            let due = {
                let ctx = EventContext {
                    time,
                    epsilon,
                    prev: &prev,
                    current: &self.system,
                    times: &self.times,
                };
                bound.detector.evaluate(&ctx)
            };
            if !due {
                continue;
            }
            let name = bound.detector.name().to_string();
            let updates = bound.handler.updates(time, &self.system);
            if let Err(err) = apply_updates(&mut self.system, &updates) {
                warn!(event = %name, time, handler = bound.handler.name(), %err, "transition rejected");
                self.status = RunStatus::Stopped(StopReason::Aborted);
                self.recorder.observe(time, epsilon, &self.system, true);
                return Err(err);
            }

            bound.detector.latch(time);
            info!(event = %name, time, handler = bound.handler.name(), "event fired");
            if !self.times.record(&name, time) {
                warn!(event = %name, time, "event fired again; keeping its first time");
            }
            self.fired.push(FiredEvent { name, time });
        }

        if (self.stop)(time, &self.system) {
            self.status = RunStatus::Stopped(StopReason::Condition);
        } else if time >= self.config.max_time - epsilon {
            warn!(max_time = self.config.max_time, "time limit reached before stop condition");
            self.status = RunStatus::Stopped(StopReason::TimeLimit);
        }

        let stopped = !self.status.is_running();
        self.recorder.observe(time, epsilon, &self.system, stopped);
        if stopped {
            info!(time, steps = self.clock.steps(), status = ?self.status, "simulation stopped");
        }
        Ok(self.status)
    }

    /// Step until stopped.
    pub fn run(mut self) -> SimResult<FlightLog> {
        info!(dt = self.config.dt, max_time = self.config.max_time, "simulation started");
        let reason = loop {
            if let RunStatus::Stopped(reason) = self.step()? {
                break reason;
            }
        };
        Ok(FlightLog {
            fields: self.recorder.fields().to_vec(),
            final_time: self.clock.time(),
            steps: self.clock.steps(),
            snapshots: self.recorder.into_snapshots(),
            events: self.fired,
            stop_reason: reason,
            final_state: self.system,
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles and validates a [`Simulation`]. Every configuration error is
/// reported by [`SimulationBuilder::build`], before any step runs.
pub struct SimulationBuilder<D: SystemDynamics> {
    dynamics: D,
    system: CoupledSystem,
    config: SimConfig,
    initial: InitialConditions,
    required: Vec<FieldPath>,
    events: Vec<BoundEvent>,
    stop: Option<StopPredicate>,
    record: RecordConfig,
}

impl<D: SystemDynamics> SimulationBuilder<D> {
    pub fn new(dynamics: D, system: CoupledSystem) -> Self {
        Self {
            dynamics,
            system,
            config: SimConfig::default(),
            initial: InitialConditions::default(),
            required: vec![],
            events: vec![],
            stop: None,
            record: RecordConfig::default(),
        }
    }

    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_conditions(mut self, initial: InitialConditions) -> Self {
        self.initial = initial;
        self
    }

    /// Fields that must be present in the initial conditions.
    pub fn require(mut self, fields: &[FieldPath]) -> Self {
        self.required.extend_from_slice(fields);
        self
    }

    /// Register a detector and the handler it triggers. Registration order
    /// breaks priority ties.
    pub fn event(mut self, detector: EventDetector, handler: impl TransitionHandler + 'static) -> Self {
        self.events.push(BoundEvent { detector, handler: Box::new(handler) });
        self
    }

    pub fn stop_when(mut self, stop: StopPredicate) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn record(mut self, record: RecordConfig) -> Self {
        self.record = record;
        self
    }

    pub fn build(mut self) -> SimResult<Simulation<D>> {
        self.config.validate()?;
        self.initial.apply(&mut self.system, &self.required)?;
        self.dynamics.validate(&self.system)?;
        self.check_events()?;
        self.record.validate(&self.system)?;

        // Stable: equal priorities keep registration order
        self.events.sort_by_key(|e| e.detector.priority());
        for e in &self.events {
            debug!(event = e.detector.name(), priority = e.detector.priority(), "registered event");
        }

        let clock = SimulationClock::new(self.config.dt);
        let mut recorder = Recorder::new(self.record);
        recorder.observe(clock.time(), clock.epsilon(), &self.system, true);

        Ok(Simulation {
            dynamics: self.dynamics,
            config: self.config,
            clock,
            system: self.system,
            events: self.events,
            times: EventTimes::default(),
            fired: vec![],
            stop: self.stop.unwrap_or_else(|| Box::new(|_, _| false)),
            recorder,
            status: RunStatus::Running,
        })
    }

    fn check_events(&self) -> SimResult<()> {
        let mut names = HashSet::new();
        for e in &self.events {
            if !names.insert(e.detector.name()) {
                return Err(SimError::DuplicateEvent(e.detector.name().to_string()));
            }
        }
        for e in &self.events {
            let name = e.detector.name();
            match e.detector.trigger() {
                Trigger::SignChange { signal, .. } => self.check_body(signal.body())?,
                Trigger::AtTime(t) if !t.is_finite() => {
                    return Err(SimError::InvalidConfig(format!("event {} at time {}", name, t)));
                }
                Trigger::AfterEvent { reference, delay } => {
                    if !names.contains(reference.as_str()) {
                        return Err(SimError::UnknownEventReference {
                            event: name.to_string(),
                            reference: reference.clone(),
                        });
                    }
                    if !(delay.is_finite() && *delay >= 0.0) {
                        return Err(SimError::InvalidConfig(format!(
                            "event {} has delay {}",
                            name, delay
                        )));
                    }
                }
                Trigger::AtTime(_) => {}
            }
            for body in e.handler.bodies() {
                self.check_body(body)?;
            }
        }
        Ok(())
    }

    fn check_body(&self, body: BodyId) -> SimResult<()> {
        if self.system.contains(body) {
            Ok(())
        } else {
            Err(SimError::UnknownBody(body.to_string()))
        }
    }
}

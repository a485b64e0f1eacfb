pub mod clock;
pub mod event;
pub mod initial;
pub mod integrator;
pub mod recorder;
pub mod runner;
pub mod summary;
pub mod transition;

pub use clock::SimulationClock;
pub use event::{Crossing, EventDetector, EventTimes, FiredEvent, Signal, Trigger};
pub use initial::InitialConditions;
pub use integrator::{rk4_step, SystemDynamics};
pub use recorder::{FieldPath, FieldValue, Quantity, RecordConfig, Snapshot};
pub use runner::{stop_below, FlightLog, RunStatus, Simulation, SimulationBuilder, StopPredicate, StopReason};
pub use summary::FlightSummary;
pub use transition::{BeginDeployment, CompleteDeployment, RecordOnly, StateUpdate, TransitionHandler};

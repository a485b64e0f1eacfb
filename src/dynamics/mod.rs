pub mod flight;
pub mod state;
pub mod tether;

pub use flight::{Activation, BodyModel, FlightDynamics};
pub use state::{
    Attitude, BodyId, BodyRate, CoupledRate, CoupledSystem, DeploymentStatus, RigidBodyState, SimConfig,
};
pub use tether::TetherConstraint;

use thiserror::Error;

use crate::dynamics::state::DeploymentStatus;

/// Result type for simulation setup and stepping.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while assembling or running a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing initial condition for `{0}`")]
    MissingInitialCondition(String),

    #[error("unknown field path `{0}`")]
    UnknownField(String),

    #[error("unknown body `{0}`")]
    UnknownBody(String),

    #[error("event `{0}` registered twice")]
    DuplicateEvent(String),

    #[error("event `{event}` references unknown event `{reference}`")]
    UnknownEventReference { event: String, reference: String },

    #[error("illegal deployment transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
}

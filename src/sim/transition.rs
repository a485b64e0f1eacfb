use nalgebra::Vector3;
use tracing::debug;

use crate::dynamics::state::{BodyId, CoupledSystem, DeploymentStatus};
use crate::error::{SimError, SimResult};

// ---------------------------------------------------------------------------
// State updates
// ---------------------------------------------------------------------------

/// One explicit change to the coupled system, produced by a transition
/// handler and applied by the orchestrator between steps.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    SetPosition { body: BodyId, value: Vector3<f64> },
    SetVelocity { body: BodyId, value: Vector3<f64> },
    SetDeployment(DeploymentStatus),
    /// Stop integrating a body; its state stays as it is.
    Freeze(BodyId),
}

impl StateUpdate {
    pub fn body(&self) -> Option<BodyId> {
        match *self {
            StateUpdate::SetPosition { body, .. }
            | StateUpdate::SetVelocity { body, .. }
            | StateUpdate::Freeze(body) => Some(body),
            StateUpdate::SetDeployment(_) => None,
        }
    }

    pub fn apply(&self, system: &mut CoupledSystem) -> SimResult<()> {
        if let Some(body) = self.body() {
            if !system.contains(body) {
                return Err(SimError::UnknownBody(body.to_string()));
            }
        }
        match *self {
            StateUpdate::SetPosition { body, value } => system.body_mut(body).pos = value,
            StateUpdate::SetVelocity { body, value } => system.body_mut(body).vel = value,
            StateUpdate::SetDeployment(next) => {
                system.deployment = system.deployment.advance_to(next)?;
            }
            StateUpdate::Freeze(body) => system.frozen[body.index()] = true,
        }
        Ok(())
    }
}

/// Apply a batch of updates atomically: on error the system is untouched.
pub fn apply_updates(system: &mut CoupledSystem, updates: &[StateUpdate]) -> SimResult<()> {
    let mut next = system.clone();
    for update in updates {
        update.apply(&mut next)?;
        debug!(?update, "applied state update");
    }
    *system = next;
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Reaction to a fired event. Pure: describes the change instead of
/// performing it.
pub trait TransitionHandler {
    fn name(&self) -> &str;

    fn updates(&self, time: f64, system: &CoupledSystem) -> Vec<StateUpdate>;

    /// Bodies the handler writes, checked when the simulation is built.
    fn bodies(&self) -> Vec<BodyId> {
        vec![]
    }
}

/// Event that is only timestamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordOnly;

impl TransitionHandler for RecordOnly {
    fn name(&self) -> &str {
        "record-only"
    }

    fn updates(&self, _time: f64, _system: &CoupledSystem) -> Vec<StateUpdate> {
        vec![]
    }
}

/// Hands the rocket over to the tethered pair: the airframe takes the
/// rocket's place, the canopy sits one tether length ahead along the body
/// axis, both inherit the rocket's velocity and the rocket is frozen.
#[derive(Debug, Clone, Copy)]
pub struct BeginDeployment {
    pub rocket: BodyId,
    pub canopy: BodyId,
    pub airframe: BodyId,
    pub tether_length: f64,
}

impl TransitionHandler for BeginDeployment {
    fn name(&self) -> &str {
        "begin-deployment"
    }

    fn updates(&self, _time: f64, system: &CoupledSystem) -> Vec<StateUpdate> {
        let rocket = system.body(self.rocket);
        let offset = rocket.body_axis() * self.tether_length;
        vec![
            StateUpdate::SetPosition { body: self.airframe, value: rocket.pos },
            StateUpdate::SetPosition { body: self.canopy, value: rocket.pos + offset },
            StateUpdate::SetVelocity { body: self.airframe, value: rocket.vel },
            StateUpdate::SetVelocity { body: self.canopy, value: rocket.vel },
            StateUpdate::SetDeployment(DeploymentStatus::Deploying),
            StateUpdate::Freeze(self.rocket),
        ]
    }

    fn bodies(&self) -> Vec<BodyId> {
        vec![self.rocket, self.canopy, self.airframe]
    }
}

/// Canopy inflated: drag switches on.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompleteDeployment;

impl TransitionHandler for CompleteDeployment {
    fn name(&self) -> &str {
        "complete-deployment"
    }

    fn updates(&self, _time: f64, _system: &CoupledSystem) -> Vec<StateUpdate> {
        vec![StateUpdate::SetDeployment(DeploymentStatus::Deployed)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::{Attitude, RigidBodyState};
    use approx::assert_relative_eq;

    fn flight_system() -> CoupledSystem {
        let rocket = RigidBodyState::point(Vector3::new(40.0, 0.0, 900.0), Vector3::new(25.0, 0.0, 0.0), 11.6)
            .with_attitude(Attitude::from_euler(Vector3::zeros(), Vector3::zeros()));
        let pinned = Vector3::new(100.0, 0.0, 0.0);
        CoupledSystem::new(vec![
            rocket,
            RigidBodyState::point(pinned, Vector3::zeros(), 1.6),
            RigidBodyState::point(pinned, Vector3::zeros(), 10.0),
        ])
    }

    const BEGIN: BeginDeployment = BeginDeployment {
        rocket: BodyId::ROCKET,
        canopy: BodyId::CANOPY,
        airframe: BodyId::AIRFRAME,
        tether_length: 1.0,
    };

    #[test]
    fn begin_deployment_reparents_bodies() {
        let mut sys = flight_system();
        let updates = BEGIN.updates(10.0, &sys);
        apply_updates(&mut sys, &updates).unwrap();

        assert_eq!(sys.deployment, DeploymentStatus::Deploying);
        assert!(sys.is_frozen(BodyId::ROCKET));
        assert_relative_eq!(sys.body(BodyId::AIRFRAME).pos, Vector3::new(40.0, 0.0, 900.0));
        // Identity attitude: body axis is +x
        assert_relative_eq!(sys.body(BodyId::CANOPY).pos, Vector3::new(41.0, 0.0, 900.0));
        assert_eq!(sys.body(BodyId::CANOPY).vel, Vector3::new(25.0, 0.0, 0.0));
        assert_eq!(sys.body(BodyId::AIRFRAME).vel, Vector3::new(25.0, 0.0, 0.0));
    }

    #[test]
    fn skipping_a_stage_is_rejected_atomically() {
        let mut sys = flight_system();
        let before = sys.clone();
        let updates = vec![
            StateUpdate::SetPosition { body: BodyId::CANOPY, value: Vector3::zeros() },
            StateUpdate::SetDeployment(DeploymentStatus::Deployed),
        ];
        let err = apply_updates(&mut sys, &updates).unwrap_err();
        assert!(matches!(err, SimError::InvalidTransition { .. }));
        assert_eq!(sys, before);
    }

    #[test]
    fn unknown_body_is_an_error() {
        let mut sys = flight_system();
        let err = StateUpdate::Freeze(BodyId(9)).apply(&mut sys).unwrap_err();
        assert_eq!(err, SimError::UnknownBody("body9".into()));
    }

    #[test]
    fn complete_after_begin() {
        let mut sys = flight_system();
        let begin = BEGIN.updates(0.0, &sys);
        apply_updates(&mut sys, &begin).unwrap();
        let complete = CompleteDeployment.updates(0.1, &sys);
        apply_updates(&mut sys, &complete).unwrap();
        assert_eq!(sys.deployment, DeploymentStatus::Deployed);
        assert!(RecordOnly.updates(0.2, &sys).is_empty());
    }
}

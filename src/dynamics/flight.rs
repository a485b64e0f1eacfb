use nalgebra::{Quaternion, Vector3};

use super::state::{AttitudeRate, BodyId, BodyRate, CoupledRate, CoupledSystem};
use super::tether::TetherConstraint;
use crate::error::{SimError, SimResult};
use crate::physics::{BlockInput, EnvironmentModel, Load, PhysicsBlock};
use crate::sim::integrator::SystemDynamics;

// ---------------------------------------------------------------------------
// Per-body model
// ---------------------------------------------------------------------------

/// When a body starts responding to forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    FromLaunch,
    /// Pinned in place until the recovery sequence begins.
    OnRelease,
}

pub struct BodyModel {
    pub name: String,
    pub blocks: Vec<Box<dyn PhysicsBlock>>,
    /// Principal moments [Ixx, Iyy, Izz], kg·m^2. `None` for point masses.
    pub inertia: Option<Vector3<f64>>,
    pub activation: Activation,
}

impl BodyModel {
    pub fn new(name: impl Into<String>, activation: Activation) -> Self {
        Self { name: name.into(), blocks: vec![], inertia: None, activation }
    }

    pub fn block(mut self, block: impl PhysicsBlock + 'static) -> Self {
        self.blocks.push(Box::new(block));
        self
    }

    pub fn inertia(mut self, inertia: Vector3<f64>) -> Self {
        self.inertia = Some(inertia);
        self
    }
}

// ---------------------------------------------------------------------------
// Coupled equations of motion
// ---------------------------------------------------------------------------

/// Equations of motion for every body of the flight: block loads, the
/// tether coupling, translational and rigid-body rotational dynamics.
pub struct FlightDynamics {
    pub bodies: Vec<BodyModel>,
    pub tether: Option<TetherConstraint>,
    pub environment: EnvironmentModel,
}

impl FlightDynamics {
    pub fn new(environment: EnvironmentModel) -> Self {
        Self { bodies: vec![], tether: None, environment }
    }

    pub fn body(mut self, model: BodyModel) -> Self {
        self.bodies.push(model);
        self
    }

    pub fn tether(mut self, tether: TetherConstraint) -> Self {
        self.tether = Some(tether);
        self
    }

    /// Sum of block loads on one body, tether excluded.
    pub fn block_load(&self, time: f64, system: &CoupledSystem, id: BodyId) -> Load {
        let state = system.body(id);
        let env = self.environment.sample(time, &state.pos);
        let input = BlockInput {
            time,
            body: state,
            env: &env,
            deployment: system.deployment,
        };
        self.bodies[id.index()].blocks.iter().map(|b| b.compute(&input)).sum()
    }

    fn tether_force(&self, system: &CoupledSystem, id: BodyId) -> Vector3<f64> {
        match &self.tether {
            Some(t) if system.deployment.tether_attached() => {
                let f = t.force_on_upper(system.body(t.upper), system.body(t.lower));
                if id == t.upper {
                    f
                } else if id == t.lower {
                    -f
                } else {
                    Vector3::zeros()
                }
            }
            _ => Vector3::zeros(),
        }
    }

    pub fn body_rate(&self, time: f64, system: &CoupledSystem, id: BodyId) -> BodyRate {
        let model = &self.bodies[id.index()];
        let pinned = model.activation == Activation::OnRelease
            && !system.deployment.tether_attached();
        if pinned || system.is_frozen(id) {
            return BodyRate::zero();
        }

        let state = system.body(id);
        let load = self.block_load(time, system, id);
        let force = load.force + self.tether_force(system, id);
        let accel = if state.mass > 0.0 { force / state.mass } else { Vector3::zeros() };

        let attitude = match (&state.attitude, model.inertia) {
            (Some(att), Some(i_vec)) => {
                let w = att.omega;
                let t = load.moment;
                // Euler's equation: I * domega = torque - omega × (I * omega)
                let i_omega = i_vec.component_mul(&w);
                let gyro = w.cross(&i_omega);
                let domega = Vector3::new(
                    (t.x - gyro.x) / i_vec.x,
                    (t.y - gyro.y) / i_vec.y,
                    (t.z - gyro.z) / i_vec.z,
                );
                // Quaternion kinematics: dq/dt = 0.5 * q * omega_quat
                let omega_quat = Quaternion::new(0.0, w.x, w.y, w.z);
                let dquat = att.quat.quaternion() * omega_quat * 0.5;
                Some(AttitudeRate { dquat, domega })
            }
            _ => None,
        };

        BodyRate {
            dpos: state.vel,
            dvel: accel,
            dmass: load.mass_rate,
            attitude,
        }
    }
}

impl SystemDynamics for FlightDynamics {
    fn derivatives(&self, time: f64, system: &CoupledSystem) -> CoupledRate {
        CoupledRate(
            (0..system.len())
                .map(|i| self.body_rate(time, system, BodyId(i)))
                .collect(),
        )
    }

    fn validate(&self, system: &CoupledSystem) -> SimResult<()> {
        if self.bodies.len() != system.len() {
            return Err(SimError::InvalidConfig(format!(
                "{} body models for {} body states",
                self.bodies.len(),
                system.len()
            )));
        }
        for (i, (model, state)) in self.bodies.iter().zip(&system.bodies).enumerate() {
            if !(state.mass.is_finite() && state.mass > 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "body {} ({}) has non-positive mass {}",
                    i, model.name, state.mass
                )));
            }
            if let Some(inertia) = model.inertia {
                if inertia.iter().any(|&c| !(c.is_finite() && c > 0.0)) {
                    return Err(SimError::InvalidConfig(format!(
                        "body {} ({}) has non-positive inertia {:?}",
                        i, model.name, inertia
                    )));
                }
            }
        }
        if let Some(t) = &self.tether {
            for id in [t.upper, t.lower] {
                if !system.contains(id) {
                    return Err(SimError::UnknownBody(id.to_string()));
                }
            }
            if t.upper == t.lower {
                return Err(SimError::InvalidConfig("tether ends on the same body".into()));
            }
            if t.rest_length < 0.0 || t.stiffness < 0.0 || t.damping < 0.0 {
                return Err(SimError::InvalidConfig(format!("invalid tether {:?}", t)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::{Attitude, DeploymentStatus, RigidBodyState, G0};
    use crate::physics::{QuadraticDrag, Weight};
    use approx::assert_relative_eq;

    const TETHER: TetherConstraint = TetherConstraint {
        upper: BodyId(0),
        lower: BodyId(1),
        rest_length: 1.0,
        stiffness: 100.0,
        damping: 0.0,
    };

    fn recovery_pair() -> FlightDynamics {
        FlightDynamics::new(EnvironmentModel::default())
            .body(
                BodyModel::new("canopy", Activation::OnRelease)
                    .block(Weight)
                    .block(QuadraticDrag::canopy(0.1, 1.75)),
            )
            .body(BodyModel::new("airframe", Activation::OnRelease).block(Weight))
            .tether(TETHER)
    }

    fn pair_state(upper_z: f64, status: DeploymentStatus) -> CoupledSystem {
        let mut sys = CoupledSystem::new(vec![
            RigidBodyState::point(Vector3::new(0.0, 0.0, upper_z), Vector3::zeros(), 1.6),
            RigidBodyState::point(Vector3::zeros(), Vector3::zeros(), 10.0),
        ]);
        sys.deployment = status;
        sys
    }

    #[test]
    fn pinned_until_release() {
        let dyn_ = recovery_pair();
        let sys = pair_state(3.0, DeploymentStatus::NotDeployed);
        let rates = dyn_.derivatives(0.0, &sys);
        for r in &rates.0 {
            assert_eq!(*r, BodyRate::zero());
        }
    }

    #[test]
    fn tether_forces_are_equal_and_opposite() {
        let dyn_ = recovery_pair();
        let sys = pair_state(1.5, DeploymentStatus::Deploying);
        let rates = dyn_.derivatives(0.0, &sys);
        let f_upper = rates.0[0].dvel * 1.6;
        let f_lower = rates.0[1].dvel * 10.0;
        // Strip weight: tension 50 N
        assert_relative_eq!(f_upper.z, -50.0 - 1.6 * G0, epsilon = 1e-9);
        assert_relative_eq!(f_lower.z, 50.0 - 10.0 * G0, epsilon = 1e-9);
    }

    #[test]
    fn frozen_body_has_zero_rate() {
        let dyn_ = recovery_pair();
        let mut sys = pair_state(1.5, DeploymentStatus::Deploying);
        sys.frozen[1] = true;
        let rates = dyn_.derivatives(0.0, &sys);
        assert_eq!(rates.0[1], BodyRate::zero());
        assert!(rates.0[0].dvel.z < 0.0);
    }

    #[test]
    fn spinning_body_quaternion_rate() {
        let dyn_ = FlightDynamics::new(EnvironmentModel::default())
            .body(BodyModel::new("top", Activation::FromLaunch).inertia(Vector3::new(1.0, 2.0, 2.0)));
        let sys = CoupledSystem::new(vec![RigidBodyState::point(Vector3::zeros(), Vector3::zeros(), 1.0)
            .with_attitude(Attitude::from_euler(Vector3::zeros(), Vector3::new(2.0, 0.0, 0.0)))]);
        let rate = dyn_.derivatives(0.0, &sys).0.remove(0);
        let att = rate.attitude.expect("attitude rate");
        // Spin about a principal axis: no angular acceleration
        assert_relative_eq!(att.domega, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(att.dquat.i, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn validate_rejects_mismatched_bodies() {
        let dyn_ = recovery_pair();
        let sys = CoupledSystem::new(vec![RigidBodyState::point(Vector3::zeros(), Vector3::zeros(), 1.0)]);
        assert!(dyn_.validate(&sys).is_err());
        assert!(dyn_.validate(&pair_state(0.0, DeploymentStatus::NotDeployed)).is_ok());
    }
}

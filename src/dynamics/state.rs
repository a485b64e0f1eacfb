use std::fmt;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::{SimError, SimResult};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;
pub const EARTH_RADIUS: f64 = 6_371_000.0;

// ---------------------------------------------------------------------------
// Body identifiers
// ---------------------------------------------------------------------------

/// Index of a body inside a [`CoupledSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub usize);

impl BodyId {
    /// Powered ascent body (carries attitude).
    pub const ROCKET: BodyId = BodyId(0);
    /// Parachute + nosecone, upper end of the tether.
    pub const CANOPY: BodyId = BodyId(1);
    /// Rocket minus nosecone, lower end of the tether.
    pub const AIRFRAME: BodyId = BodyId(2);

    pub fn index(self) -> usize {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self {
            BodyId::ROCKET => "rocket",
            BodyId::CANOPY => "canopy",
            BodyId::AIRFRAME => "airframe",
            _ => "body",
        }
    }

    pub fn parse(name: &str) -> SimResult<BodyId> {
        match name {
            "rocket" => Ok(BodyId::ROCKET),
            "canopy" => Ok(BodyId::CANOPY),
            "airframe" => Ok(BodyId::AIRFRAME),
            other => Err(SimError::UnknownBody(other.to_string())),
        }
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            "body" => write!(f, "body{}", self.0),
            name => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Parachute deployment stage
// ---------------------------------------------------------------------------

/// Discrete recovery stage. Only ever moves forward, one stage at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DeploymentStatus {
    #[default]
    NotDeployed,
    /// Tether attached, canopy not yet inflated.
    Deploying,
    /// Canopy drag active.
    Deployed,
}

impl DeploymentStatus {
    /// Validate a transition to `next`. Re-entering the current stage is a no-op.
    pub fn advance_to(self, next: DeploymentStatus) -> SimResult<DeploymentStatus> {
        use DeploymentStatus::*;
        match (self, next) {
            (a, b) if a == b => Ok(a),
            (NotDeployed, Deploying) | (Deploying, Deployed) => Ok(next),
            (from, to) => Err(SimError::InvalidTransition { from, to }),
        }
    }

    pub fn tether_attached(self) -> bool {
        self != DeploymentStatus::NotDeployed
    }
}

// ---------------------------------------------------------------------------
// Rigid body state
// ---------------------------------------------------------------------------

/// Orientation and body-frame angular velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct Attitude {
    pub quat: UnitQuaternion<f64>,  // body→inertial rotation
    pub omega: Vector3<f64>,        // rad/s, body frame
}

impl Attitude {
    /// Build from extrinsic x-y-z Euler angles `[roll, pitch, yaw]` (rad).
    pub fn from_euler(angles: Vector3<f64>, omega: Vector3<f64>) -> Self {
        Self {
            quat: UnitQuaternion::from_euler_angles(angles.x, angles.y, angles.z),
            omega,
        }
    }

    pub fn euler(&self) -> Vector3<f64> {
        let (roll, pitch, yaw) = self.quat.euler_angles();
        Vector3::new(roll, pitch, yaw)
    }
}

/// State of one body. Frame: inertial, z up.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyState {
    pub pos: Vector3<f64>,              // m
    pub vel: Vector3<f64>,              // m/s
    pub mass: f64,                      // kg
    pub attitude: Option<Attitude>,
}

impl RigidBodyState {
    /// Translational-only body.
    pub fn point(pos: Vector3<f64>, vel: Vector3<f64>, mass: f64) -> Self {
        Self { pos, vel, mass, attitude: None }
    }

    pub fn with_attitude(mut self, attitude: Attitude) -> Self {
        self.attitude = Some(attitude);
        self
    }

    /// Advance by a rate scaled by dt (RK4 stages and final blend).
    pub fn apply(&self, d: &BodyRate, dt: f64) -> RigidBodyState {
        let attitude = match (&self.attitude, &d.attitude) {
            (Some(att), Some(rate)) => {
                let q_raw = att.quat.quaternion() + rate.dquat * dt;
                Some(Attitude {
                    quat: UnitQuaternion::new_normalize(q_raw),
                    omega: att.omega + rate.domega * dt,
                })
            }
            (att, _) => att.clone(),
        };
        RigidBodyState {
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            mass: (self.mass + d.dmass * dt).max(0.0),
            attitude,
        }
    }

    /// Longitudinal body axis (+x, towards the nose) in the inertial frame.
    pub fn body_axis(&self) -> Vector3<f64> {
        match &self.attitude {
            Some(att) => att.quat * Vector3::x(),
            None => Vector3::x(),
        }
    }

    pub fn euler(&self) -> Option<Vector3<f64>> {
        self.attitude.as_ref().map(Attitude::euler)
    }

    pub fn altitude(&self) -> f64 {
        self.pos.z
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeRate {
    pub dquat: Quaternion<f64>,   // not unit: raw quaternion derivative
    pub domega: Vector3<f64>,     // angular acceleration, body frame
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyRate {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dmass: f64,
    pub attitude: Option<AttitudeRate>,
}

impl BodyRate {
    /// Rate of a body that is held in place.
    pub fn zero() -> Self {
        Self {
            dpos: Vector3::zeros(),
            dvel: Vector3::zeros(),
            dmass: 0.0,
            attitude: None,
        }
    }

    /// Classical RK4 weighting: (k1 + 2 k2 + 2 k3 + k4) / 6.
    pub fn rk4_blend(k1: &BodyRate, k2: &BodyRate, k3: &BodyRate, k4: &BodyRate) -> BodyRate {
        let attitude = match (&k1.attitude, &k2.attitude, &k3.attitude, &k4.attitude) {
            (Some(a1), Some(a2), Some(a3), Some(a4)) => Some(AttitudeRate {
                dquat: (a1.dquat + a2.dquat * 2.0 + a3.dquat * 2.0 + a4.dquat) * (1.0 / 6.0),
                domega: (a1.domega + 2.0 * a2.domega + 2.0 * a3.domega + a4.domega) / 6.0,
            }),
            _ => None,
        };
        BodyRate {
            dpos: (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) / 6.0,
            dvel: (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) / 6.0,
            dmass: (k1.dmass + 2.0 * k2.dmass + 2.0 * k3.dmass + k4.dmass) / 6.0,
            attitude,
        }
    }
}

/// Rates for every body of a [`CoupledSystem`], in body order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoupledRate(pub Vec<BodyRate>);

// ---------------------------------------------------------------------------
// Coupled multi-body system
// ---------------------------------------------------------------------------

/// All bodies advanced together in one integration step, plus the discrete
/// mode that selects their equations of motion.
#[derive(Debug, Clone, PartialEq)]
pub struct CoupledSystem {
    pub bodies: Vec<RigidBodyState>,
    pub frozen: Vec<bool>,
    pub deployment: DeploymentStatus,
}

impl CoupledSystem {
    pub fn new(bodies: Vec<RigidBodyState>) -> Self {
        let frozen = vec![false; bodies.len()];
        Self { bodies, frozen, deployment: DeploymentStatus::NotDeployed }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, id: BodyId) -> bool {
        id.index() < self.bodies.len()
    }

    pub fn body(&self, id: BodyId) -> &RigidBodyState {
        &self.bodies[id.index()]
    }

    pub fn body_mut(&mut self, id: BodyId) -> &mut RigidBodyState {
        &mut self.bodies[id.index()]
    }

    pub fn is_frozen(&self, id: BodyId) -> bool {
        self.frozen[id.index()]
    }

    /// Advance every body by its rate; discrete fields are carried over.
    pub fn apply(&self, rates: &CoupledRate, dt: f64) -> CoupledSystem {
        CoupledSystem {
            bodies: self
                .bodies
                .iter()
                .zip(&rates.0)
                .map(|(b, d)| b.apply(d, dt))
                .collect(),
            frozen: self.frozen.clone(),
            deployment: self.deployment,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub dt: f64,
    pub max_time: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.005,          // 200 Hz (tether needs a tight step)
            max_time: 600.0,    // 10 min
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidConfig(format!("dt must be positive, got {}", self.dt)));
        }
        if !(self.max_time.is_finite() && self.max_time > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "max_time must be positive, got {}",
                self.max_time
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn deployment_only_moves_forward() {
        use DeploymentStatus::*;
        assert_eq!(NotDeployed.advance_to(Deploying), Ok(Deploying));
        assert_eq!(Deploying.advance_to(Deployed), Ok(Deployed));
        assert_eq!(Deployed.advance_to(Deployed), Ok(Deployed));
        assert!(NotDeployed.advance_to(Deployed).is_err(), "must not skip Deploying");
        assert!(Deployed.advance_to(NotDeployed).is_err());
        assert!(Deployed.advance_to(Deploying).is_err());
    }

    #[test]
    fn euler_round_trip_and_axis() {
        let angles = Vector3::new(0.0, -std::f64::consts::FRAC_PI_2 + 0.2, 0.0);
        let att = Attitude::from_euler(angles, Vector3::zeros());
        assert_relative_eq!(att.euler(), angles, epsilon = 1e-9);

        let body = RigidBodyState::point(Vector3::zeros(), Vector3::zeros(), 1.0)
            .with_attitude(att);
        let axis = body.body_axis();
        // Pitched 0.2 rad off vertical towards +x
        assert_relative_eq!(axis, Vector3::new(0.2_f64.sin(), 0.0, 0.2_f64.cos()), epsilon = 1e-9);
    }

    #[test]
    fn apply_keeps_discrete_fields() {
        let mut sys = CoupledSystem::new(vec![
            RigidBodyState::point(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0), 2.0),
        ]);
        sys.frozen[0] = true;
        sys.deployment = DeploymentStatus::Deploying;
        let rate = CoupledRate(vec![BodyRate {
            dpos: Vector3::new(1.0, 0.0, 0.0),
            dvel: Vector3::zeros(),
            dmass: -100.0,
            attitude: None,
        }]);
        let next = sys.apply(&rate, 0.5);
        assert_eq!(next.deployment, DeploymentStatus::Deploying);
        assert!(next.frozen[0]);
        assert_relative_eq!(next.bodies[0].pos.x, 0.5);
        assert_eq!(next.bodies[0].mass, 0.0, "mass clamps at zero");
    }

    #[test]
    fn config_rejects_bad_step() {
        let config = SimConfig { dt: 0.0, ..SimConfig::default() };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn body_names_parse() {
        assert_eq!(BodyId::parse("canopy"), Ok(BodyId::CANOPY));
        assert!(BodyId::parse("booster").is_err());
        assert_eq!(BodyId(7).to_string(), "body7");
    }
}

//! Stateless force and environment blocks plugged into the flight dynamics.

pub mod aerodynamics;
pub mod atmosphere;
pub mod gravity;
pub mod parachute;
pub mod propulsion;
pub mod wind;

use nalgebra::Vector3;

use crate::dynamics::state::{DeploymentStatus, RigidBodyState};
use atmosphere::{AtmosphereModel, Isa};
use gravity::{ConstantGravity, GravityModel};
use wind::{Calm, WindModel};

pub use aerodynamics::{AeroCoefficients, AeroInput, AerodynamicModel, Aerodynamics, LinearAerodynamics};
pub use parachute::QuadraticDrag;
pub use propulsion::{Motor, Thrust};
pub use gravity::Weight;

// ---------------------------------------------------------------------------
// Environment sampled at a body position
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub density: f64,          // kg/m^3
    pub pressure: f64,         // Pa
    pub temperature: f64,      // K
    pub sound_speed: f64,      // m/s
    pub gravity: Vector3<f64>, // m/s^2, inertial
    pub wind: Vector3<f64>,    // m/s, inertial
}

/// Atmosphere, gravity and wind models evaluated together for one position.
pub struct EnvironmentModel {
    pub atmosphere: Box<dyn AtmosphereModel>,
    pub gravity: Box<dyn GravityModel>,
    pub wind: Box<dyn WindModel>,
}

impl EnvironmentModel {
    pub fn new(
        atmosphere: Box<dyn AtmosphereModel>,
        gravity: Box<dyn GravityModel>,
        wind: Box<dyn WindModel>,
    ) -> Self {
        Self { atmosphere, gravity, wind }
    }

    pub fn with_wind(mut self, wind: Box<dyn WindModel>) -> Self {
        self.wind = wind;
        self
    }

    pub fn with_atmosphere(mut self, atmosphere: Box<dyn AtmosphereModel>) -> Self {
        self.atmosphere = atmosphere;
        self
    }

    pub fn with_gravity(mut self, gravity: Box<dyn GravityModel>) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn sample(&self, time: f64, pos: &Vector3<f64>) -> Environment {
        let atm = self.atmosphere.properties(pos.z);
        Environment {
            density: atm.density,
            pressure: atm.pressure,
            temperature: atm.temperature,
            sound_speed: atm.sound_speed,
            gravity: self.gravity.accel(pos),
            wind: self.wind.velocity(time, pos),
        }
    }
}

impl Default for EnvironmentModel {
    fn default() -> Self {
        Self::new(Box::new(Isa), Box::new(ConstantGravity::default()), Box::new(Calm))
    }
}

// ---------------------------------------------------------------------------
// Physics block interface
// ---------------------------------------------------------------------------

/// Everything a block may read. Blocks never see other bodies.
#[derive(Debug, Clone, Copy)]
pub struct BlockInput<'a> {
    pub time: f64,
    pub body: &'a RigidBodyState,
    pub env: &'a Environment,
    pub deployment: DeploymentStatus,
}

/// Contribution of one block to a body's equations of motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Load {
    pub force: Vector3<f64>,   // N, inertial frame
    pub moment: Vector3<f64>,  // N·m, body frame
    pub mass_rate: f64,        // kg/s
}

impl Load {
    pub fn zero() -> Self {
        Self { force: Vector3::zeros(), moment: Vector3::zeros(), mass_rate: 0.0 }
    }

    pub fn force(force: Vector3<f64>) -> Self {
        Self { force, ..Self::zero() }
    }
}

impl std::ops::Add for Load {
    type Output = Load;

    fn add(self, rhs: Load) -> Load {
        Load {
            force: self.force + rhs.force,
            moment: self.moment + rhs.moment,
            mass_rate: self.mass_rate + rhs.mass_rate,
        }
    }
}

impl std::iter::Sum for Load {
    fn sum<I: Iterator<Item = Load>>(iter: I) -> Load {
        iter.fold(Load::zero(), |acc, l| acc + l)
    }
}

/// A pure function from instantaneous body state and environment to a load.
pub trait PhysicsBlock {
    fn name(&self) -> &str;

    fn compute(&self, input: &BlockInput) -> Load;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::G0;
    use super::atmosphere::{AtmosphereModel, Troposphere};
    use super::gravity::{GravityModel, InverseSquare};
    use super::wind::ConstantWind;

    #[test]
    fn default_environment_at_sea_level() {
        let env = EnvironmentModel::default().sample(0.0, &Vector3::zeros());
        assert!((env.density - 1.225).abs() < 0.001);
        assert!((env.gravity.z + G0).abs() < 1e-12);
        assert_eq!(env.wind, Vector3::zeros());
    }

    #[test]
    fn swapped_models_are_sampled() {
        let model = EnvironmentModel::default()
            .with_atmosphere(Box::new(Troposphere::default()))
            .with_gravity(Box::new(InverseSquare))
            .with_wind(Box::new(ConstantWind(Vector3::new(3.0, 0.0, 0.0))));
        let high = Vector3::new(0.0, 0.0, 5_000.0);
        let env = model.sample(1.0, &high);
        let expected = Troposphere::default().properties(high.z);
        assert_eq!(env.density, expected.density);
        assert_eq!(env.gravity, InverseSquare.accel(&high));
        assert!(env.gravity.z.abs() < G0);
        assert_eq!(env.wind, Vector3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn loads_sum() {
        let total: Load = [
            Load::force(Vector3::new(1.0, 0.0, 0.0)),
            Load { mass_rate: -0.5, ..Load::force(Vector3::new(0.0, 2.0, 0.0)) },
        ]
        .into_iter()
        .sum();
        assert_eq!(total.force, Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(total.mass_rate, -0.5);
    }
}

use super::{BlockInput, Load, PhysicsBlock};
use crate::dynamics::state::G0;

/// Constant-thrust solid motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motor {
    pub thrust: f64,            // N
    pub isp: f64,               // s
    pub propellant_mass: f64,   // kg
}

impl Motor {
    pub fn mass_flow(&self) -> f64 {
        self.thrust / (self.isp * G0)
    }

    /// Self-consistent burn time from propellant and mass flow.
    pub fn burn_time(&self) -> f64 {
        if self.thrust > 0.0 {
            self.propellant_mass / self.mass_flow()
        } else {
            0.0
        }
    }

    pub fn total_impulse(&self) -> f64 {
        self.thrust * self.burn_time()
    }
}

/// Thrust along the body +x axis until the body is down to its dry mass.
#[derive(Debug, Clone, Copy)]
pub struct Thrust {
    pub motor: Motor,
    pub dry_mass: f64,
}

impl PhysicsBlock for Thrust {
    fn name(&self) -> &str {
        "thrust"
    }

    fn compute(&self, input: &BlockInput) -> Load {
        let remaining_prop = input.body.mass - self.dry_mass;
        if remaining_prop <= 1e-3 || self.motor.thrust <= 0.0 {
            return Load::zero();
        }
        Load {
            mass_rate: -self.motor.mass_flow(),
            ..Load::force(input.body.body_axis() * self.motor.thrust)
        }
    }
}

use nalgebra::Vector3;

use crate::dynamics::state::G0;
use crate::error::{SimError, SimResult};
use crate::physics::{LinearAerodynamics, Motor};

// ---------------------------------------------------------------------------
// Rocket definition (single-stage, ascent body)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Rocket {
    pub name: String,
    pub dry_mass: f64,            // kg, everything but propellant
    pub motor: Motor,
    pub diameter: f64,            // m
    pub length: f64,              // m
    pub center_of_mass: f64,      // m aft of the nose tip
    pub inertia: Vector3<f64>,    // [Ixx, Iyy, Izz] principal moments, kg·m^2 (x = roll axis)
    pub aero: LinearAerodynamics,
}

impl Rocket {
    pub fn total_mass(&self) -> f64 {
        self.dry_mass + self.motor.propellant_mass
    }

    pub fn reference_area(&self) -> f64 {
        std::f64::consts::PI * (self.diameter / 2.0).powi(2)
    }

    /// Thrust-to-weight ratio at ignition.
    pub fn twr(&self) -> f64 {
        self.motor.thrust / (self.total_mass() * G0)
    }

    pub fn delta_v(&self) -> f64 {
        self.motor.isp * G0 * (self.total_mass() / self.dry_mass).ln()
    }

    pub fn burn_time(&self) -> f64 {
        self.motor.burn_time()
    }

    /// Static margin in calibers; positive is stable.
    pub fn stability_margin(&self) -> f64 {
        (self.aero.center_of_pressure - self.center_of_mass) / self.diameter
    }

    pub fn validate(&self) -> SimResult<()> {
        let positive = [
            ("dry_mass", self.dry_mass),
            ("diameter", self.diameter),
            ("length", self.length),
            ("isp", self.motor.isp),
        ];
        for (what, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(SimError::InvalidConfig(format!("rocket {}: {} must be positive, got {}", self.name, what, v)));
            }
        }
        if self.motor.thrust < 0.0 || self.motor.propellant_mass < 0.0 {
            return Err(SimError::InvalidConfig(format!("rocket {}: negative motor parameters", self.name)));
        }
        if self.inertia.iter().any(|&c| !(c.is_finite() && c > 0.0)) {
            return Err(SimError::InvalidConfig(format!("rocket {}: inertia {:?}", self.name, self.inertia)));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rocket builder
// ---------------------------------------------------------------------------

pub struct RocketBuilder {
    name: String,
    dry_mass: f64,
    motor: Motor,
    diameter: f64,
    length: f64,
    center_of_mass: f64,
    inertia: Option<Vector3<f64>>,
    aero: LinearAerodynamics,
}

impl RocketBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dry_mass: 11.6,
            motor: Motor { thrust: 800.0, isp: 180.0, propellant_mass: 1.5 },
            diameter: 0.2,
            length: 2.2,
            center_of_mass: 1.2,
            inertia: None,
            aero: LinearAerodynamics::default(),
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.dry_mass = v; self }
    pub fn motor(mut self, v: Motor) -> Self { self.motor = v; self }
    pub fn thrust(mut self, v: f64) -> Self { self.motor.thrust = v; self }
    pub fn isp(mut self, v: f64) -> Self { self.motor.isp = v; self }
    pub fn propellant_mass(mut self, v: f64) -> Self { self.motor.propellant_mass = v; self }
    pub fn diameter(mut self, v: f64) -> Self { self.diameter = v; self }
    pub fn length(mut self, v: f64) -> Self { self.length = v; self }
    pub fn center_of_mass(mut self, v: f64) -> Self { self.center_of_mass = v; self }
    pub fn inertia(mut self, v: Vector3<f64>) -> Self { self.inertia = Some(v); self }
    pub fn aero(mut self, v: LinearAerodynamics) -> Self { self.aero = v; self }

    /// Without an explicit inertia the body is treated as a uniform
    /// cylinder of the wet mass.
    pub fn build(self) -> Rocket {
        let mass = self.dry_mass + self.motor.propellant_mass;
        let r = self.diameter / 2.0;
        let inertia = self.inertia.unwrap_or_else(|| {
            let roll = 0.5 * mass * r * r;
            let pitch = mass * (3.0 * r * r + self.length * self.length) / 12.0;
            Vector3::new(roll, pitch, pitch)
        });
        Rocket {
            name: self.name,
            dry_mass: self.dry_mass,
            motor: self.motor,
            diameter: self.diameter,
            length: self.length,
            center_of_mass: self.center_of_mass,
            inertia,
            aero: self.aero,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rocket_figures() {
        let r = RocketBuilder::new("test").build();
        assert!((r.total_mass() - 13.1).abs() < 1e-12);
        assert!(r.twr() > 6.0, "TWR {}", r.twr());
        assert!((r.burn_time() - 1.5 / (800.0 / (180.0 * G0))).abs() < 1e-12);
        assert!(r.delta_v() > 200.0 && r.delta_v() < 250.0, "dv {}", r.delta_v());
        assert!(r.stability_margin() > 1.0);
        let d = r.diameter;
        assert!((r.reference_area() - 0.25 * std::f64::consts::PI * d * d).abs() < 1e-15);
        // Slender cylinder: pitch inertia far above roll
        assert!(r.inertia.y > 50.0 * r.inertia.x);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let r = RocketBuilder::new("bad").diameter(0.0).build();
        assert!(matches!(r.validate(), Err(SimError::InvalidConfig(_))));
    }
}

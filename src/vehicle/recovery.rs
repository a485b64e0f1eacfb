use nalgebra::Vector3;

use crate::dynamics::state::BodyId;
use crate::dynamics::tether::TetherConstraint;
use crate::error::{SimError, SimResult};

// ---------------------------------------------------------------------------
// Recovery system: canopy + nosecone tethered to the airframe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Recovery {
    pub tether_length: f64,       // m, rest length
    pub stiffness: f64,           // N/m
    pub damping: f64,             // N·s/m
    pub canopy_mass: f64,         // kg, parachute + nosecone
    pub airframe_mass: f64,       // kg, rocket minus nosecone
    pub canopy_area: f64,         // m^2
    pub canopy_cd: f64,
    pub inflation_time: f64,      // s, deployment start to full canopy
    pub stowed_position: Vector3<f64>, // where both bodies wait before release
}

impl Recovery {
    pub fn tether(&self) -> TetherConstraint {
        TetherConstraint {
            upper: BodyId::CANOPY,
            lower: BodyId::AIRFRAME,
            rest_length: self.tether_length,
            stiffness: self.stiffness,
            damping: self.damping,
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.canopy_mass + self.airframe_mass
    }

    /// Steady sink rate of the pair under the full canopy at `density`.
    pub fn terminal_velocity(&self, density: f64, g: f64) -> f64 {
        (2.0 * self.total_mass() * g / (density * self.canopy_area * self.canopy_cd)).sqrt()
    }

    pub fn validate(&self) -> SimResult<()> {
        let positive = [
            ("canopy_mass", self.canopy_mass),
            ("airframe_mass", self.airframe_mass),
            ("canopy_area", self.canopy_area),
            ("canopy_cd", self.canopy_cd),
        ];
        for (what, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(SimError::InvalidConfig(format!("recovery {} must be positive, got {}", what, v)));
            }
        }
        let non_negative = [
            ("tether_length", self.tether_length),
            ("stiffness", self.stiffness),
            ("damping", self.damping),
            ("inflation_time", self.inflation_time),
        ];
        for (what, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(SimError::InvalidConfig(format!("recovery {} must be >= 0, got {}", what, v)));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recovery builder
// ---------------------------------------------------------------------------

pub struct RecoveryBuilder {
    inner: Recovery,
}

impl RecoveryBuilder {
    pub fn new() -> Self {
        Self {
            inner: Recovery {
                tether_length: 1.0,
                stiffness: 100.0,
                damping: 2.0,
                canopy_mass: 1.6,
                airframe_mass: 10.0,
                canopy_area: 0.1,
                canopy_cd: 1.75,
                inflation_time: 0.1,
                stowed_position: Vector3::new(100.0, 0.0, 0.0),
            },
        }
    }

    pub fn tether_length(mut self, v: f64) -> Self { self.inner.tether_length = v; self }
    pub fn stiffness(mut self, v: f64) -> Self { self.inner.stiffness = v; self }
    pub fn damping(mut self, v: f64) -> Self { self.inner.damping = v; self }
    pub fn canopy_mass(mut self, v: f64) -> Self { self.inner.canopy_mass = v; self }
    pub fn airframe_mass(mut self, v: f64) -> Self { self.inner.airframe_mass = v; self }
    pub fn canopy_area(mut self, v: f64) -> Self { self.inner.canopy_area = v; self }
    pub fn canopy_cd(mut self, v: f64) -> Self { self.inner.canopy_cd = v; self }
    pub fn inflation_time(mut self, v: f64) -> Self { self.inner.inflation_time = v; self }
    pub fn stowed_position(mut self, v: Vector3<f64>) -> Self { self.inner.stowed_position = v; self }

    pub fn build(self) -> Recovery {
        self.inner
    }
}

impl Default for RecoveryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::G0;

    #[test]
    fn tether_links_canopy_above_airframe() {
        let rec = RecoveryBuilder::new().build();
        let t = rec.tether();
        assert_eq!(t.upper, BodyId::CANOPY);
        assert_eq!(t.lower, BodyId::AIRFRAME);
        assert_eq!(t.rest_length, 1.0);
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn terminal_velocity_of_default_canopy() {
        let rec = RecoveryBuilder::new().build();
        let v = rec.terminal_velocity(1.225, G0);
        // sqrt(2 * 11.6 * 9.81 / (1.225 * 0.1 * 1.75))
        assert!((v - 32.6).abs() < 0.1, "v_t = {}", v);
    }

    #[test]
    fn rejects_negative_tether() {
        let rec = RecoveryBuilder::new().stiffness(-1.0).build();
        assert!(rec.validate().is_err());
    }
}

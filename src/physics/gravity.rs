use nalgebra::Vector3;

use super::{BlockInput, Load, PhysicsBlock};
use crate::dynamics::state::{EARTH_RADIUS, G0};

pub trait GravityModel {
    /// Gravitational acceleration (inertial frame, z up) at `pos`.
    fn accel(&self, pos: &Vector3<f64>) -> Vector3<f64>;
}

/// Uniform field, the usual model-rocket approximation.
#[derive(Debug, Clone, Copy)]
pub struct ConstantGravity {
    pub g: f64,
}

impl Default for ConstantGravity {
    fn default() -> Self {
        Self { g: G0 }
    }
}

impl GravityModel for ConstantGravity {
    fn accel(&self, _pos: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -self.g)
    }
}

/// Inverse-square fall-off with altitude above a spherical Earth.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseSquare;

impl GravityModel for InverseSquare {
    fn accel(&self, pos: &Vector3<f64>) -> Vector3<f64> {
        let alt = pos.z.max(0.0);
        let g = G0 * (EARTH_RADIUS / (EARTH_RADIUS + alt)).powi(2);
        Vector3::new(0.0, 0.0, -g)
    }
}

/// Weight of the body from the sampled gravity field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Weight;

impl PhysicsBlock for Weight {
    fn name(&self) -> &str {
        "weight"
    }

    fn compute(&self, input: &BlockInput) -> Load {
        Load::force(input.env.gravity * input.body.mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_gravity() {
        let g = InverseSquare.accel(&Vector3::zeros());
        assert!((g.z + G0).abs() < 1e-6);
        assert_eq!(ConstantGravity::default().accel(&Vector3::new(0.0, 0.0, 1e5)).z, -G0);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        let g0 = InverseSquare.accel(&Vector3::zeros()).z.abs();
        let g100k = InverseSquare.accel(&Vector3::new(0.0, 0.0, 100_000.0)).z.abs();
        assert!(g100k < g0);
    }
}

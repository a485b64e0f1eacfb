use nalgebra::Vector3;

use super::state::{BodyId, RigidBodyState};

/// Separations below this leave the tether direction undefined.
pub const MIN_SEPARATION: f64 = 1e-6;

/// Damped elastic line between two bodies. It only ever pulls: slack line
/// (separation at or below rest length) carries no load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TetherConstraint {
    pub upper: BodyId,
    pub lower: BodyId,
    pub rest_length: f64,   // m
    pub stiffness: f64,     // N/m
    pub damping: f64,       // N·s/m
}

impl TetherConstraint {
    /// Line tension (N, never negative).
    pub fn tension(&self, upper: &RigidBodyState, lower: &RigidBodyState) -> f64 {
        let d = upper.pos - lower.pos;
        let dist = d.norm();
        if dist < MIN_SEPARATION {
            return 0.0;
        }
        let stretch = dist - self.rest_length;
        if stretch <= 0.0 {
            return 0.0;
        }
        let stretch_rate = (upper.vel - lower.vel).dot(&(d / dist));
        (self.stiffness * stretch + self.damping * stretch_rate).max(0.0)
    }

    /// Force on the upper body; the lower body receives the opposite.
    pub fn force_on_upper(&self, upper: &RigidBodyState, lower: &RigidBodyState) -> Vector3<f64> {
        let d = upper.pos - lower.pos;
        let dist = d.norm();
        if dist < MIN_SEPARATION {
            return Vector3::zeros();
        }
        -(d / dist) * self.tension(upper, lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETHER: TetherConstraint = TetherConstraint {
        upper: BodyId::CANOPY,
        lower: BodyId::AIRFRAME,
        rest_length: 1.0,
        stiffness: 100.0,
        damping: 2.0,
    };

    fn at(pos: Vector3<f64>, vel: Vector3<f64>) -> RigidBodyState {
        RigidBodyState::point(pos, vel, 1.0)
    }

    #[test]
    fn coincident_bodies_give_exact_zero() {
        let a = at(Vector3::new(3.0, 4.0, 5.0), Vector3::new(0.0, 0.0, 10.0));
        let b = at(Vector3::new(3.0, 4.0, 5.0 + 1e-9), Vector3::zeros());
        let f = TETHER.force_on_upper(&a, &b);
        assert_eq!(f, Vector3::zeros());
        assert!(f.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn slack_line_does_not_push() {
        let a = at(Vector3::new(0.0, 0.0, 0.5), Vector3::new(0.0, 0.0, -3.0));
        let b = at(Vector3::zeros(), Vector3::zeros());
        assert_eq!(TETHER.force_on_upper(&a, &b), Vector3::zeros());
    }

    #[test]
    fn stretched_line_pulls_bodies_together() {
        let a = at(Vector3::new(0.0, 0.0, 1.5), Vector3::zeros());
        let b = at(Vector3::zeros(), Vector3::zeros());
        let f = TETHER.force_on_upper(&a, &b);
        assert!((f.z + 50.0).abs() < 1e-12, "k * 0.5 m downwards, got {}", f.z);
        assert_eq!(f.x, 0.0);
    }

    #[test]
    fn damping_adds_to_tension_while_stretching() {
        let a = at(Vector3::new(0.0, 0.0, 1.5), Vector3::new(0.0, 0.0, 1.0));
        let b = at(Vector3::zeros(), Vector3::zeros());
        assert!((TETHER.tension(&a, &b) - 52.0).abs() < 1e-12);

        // Fast recoil can't turn tension into compression
        let c = at(Vector3::new(0.0, 0.0, 1.01), Vector3::new(0.0, 0.0, -50.0));
        assert_eq!(TETHER.tension(&c, &b), 0.0);
    }
}

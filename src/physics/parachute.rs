use super::{BlockInput, Load, PhysicsBlock};
use crate::dynamics::state::DeploymentStatus;

/// Quadratic drag `-½ ρ S Cd |v_rel| v_rel`, switched on once the recovery
/// sequence reaches `active_from`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticDrag {
    pub reference_area: f64,    // m^2
    pub drag_coefficient: f64,
    pub active_from: DeploymentStatus,
}

impl QuadraticDrag {
    /// Canopy drag, active only once fully deployed.
    pub fn canopy(reference_area: f64, drag_coefficient: f64) -> Self {
        Self { reference_area, drag_coefficient, active_from: DeploymentStatus::Deployed }
    }
}

impl PhysicsBlock for QuadraticDrag {
    fn name(&self) -> &str {
        "quadratic-drag"
    }

    fn compute(&self, input: &BlockInput) -> Load {
        if input.deployment < self.active_from {
            return Load::zero();
        }
        let v_rel = input.body.vel - input.env.wind;
        let k = 0.5 * input.env.density * self.reference_area * self.drag_coefficient;
        Load::force(-k * v_rel.norm() * v_rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::RigidBodyState;
    use crate::physics::wind::ConstantWind;
    use crate::physics::EnvironmentModel;
    use nalgebra::Vector3;

    fn drag(status: DeploymentStatus, vel: Vector3<f64>) -> Load {
        drag_in(EnvironmentModel::default(), status, vel)
    }

    fn drag_in(model: EnvironmentModel, status: DeploymentStatus, vel: Vector3<f64>) -> Load {
        let body = RigidBodyState::point(Vector3::zeros(), vel, 1.6);
        let env = model.sample(0.0, &body.pos);
        QuadraticDrag::canopy(0.1, 1.75).compute(&BlockInput {
            time: 0.0,
            body: &body,
            env: &env,
            deployment: status,
        })
    }

    #[test]
    fn canopy_inactive_until_deployed() {
        let v = Vector3::new(0.0, 0.0, -20.0);
        assert_eq!(drag(DeploymentStatus::NotDeployed, v), Load::zero());
        assert_eq!(drag(DeploymentStatus::Deploying, v), Load::zero());
        let l = drag(DeploymentStatus::Deployed, v);
        // 0.5 * 1.225 * 0.1 * 1.75 * 400
        assert!((l.force.z - 42.875).abs() < 0.05, "got {}", l.force.z);
    }

    #[test]
    fn drag_acts_on_velocity_relative_to_wind() {
        let breeze = Vector3::new(6.0, -2.0, 0.0);
        let windy = || EnvironmentModel::default().with_wind(Box::new(ConstantWind(breeze)));

        // Drifting with the air: no drag at all
        assert_eq!(drag_in(windy(), DeploymentStatus::Deployed, breeze).force, Vector3::zeros());

        // Hanging still: pushed downwind
        let l = drag_in(windy(), DeploymentStatus::Deployed, Vector3::zeros());
        let k = 0.5 * 1.225 * 0.1 * 1.75;
        assert!((l.force - k * breeze.norm() * breeze).norm() < 1e-3 * k * breeze.norm_squared());
        assert!(l.force.x > 0.0 && l.force.y < 0.0 && l.force.z == 0.0);

        // Sinking through a crosswind: the horizontal part follows the wind
        let sink = Vector3::new(0.0, 0.0, -5.0);
        let l = drag_in(windy(), DeploymentStatus::Deployed, sink);
        assert!(l.force.z > 0.0);
        assert!((l.force.x / l.force.y - breeze.x / breeze.y).abs() < 1e-12);
        assert_eq!(drag_in(windy(), DeploymentStatus::Deploying, sink), Load::zero());
    }
}

use crate::dynamics::state::{BodyRate, CoupledRate, CoupledSystem};
use crate::error::SimResult;

// ---------------------------------------------------------------------------
// Coupled RK4 integrator
// ---------------------------------------------------------------------------

/// Right-hand side of the coupled equations of motion.
///
/// Implementations read the discrete mode carried by the system (deployment
/// status, frozen flags) but must not depend on anything mutated between
/// steps other than the system itself.
pub trait SystemDynamics {
    fn derivatives(&self, time: f64, system: &CoupledSystem) -> CoupledRate;

    /// Setup-time consistency check against the initial system.
    fn validate(&self, _system: &CoupledSystem) -> SimResult<()> {
        Ok(())
    }
}

impl<F> SystemDynamics for F
where
    F: Fn(f64, &CoupledSystem) -> CoupledRate,
{
    fn derivatives(&self, time: f64, system: &CoupledSystem) -> CoupledRate {
        self(time, system)
    }
}

/// Single RK4 step. All bodies are staged together so coupled forces see
/// consistent intermediate states.
pub fn rk4_step<D: SystemDynamics + ?Sized>(
    dynamics: &D,
    time: f64,
    system: &CoupledSystem,
    dt: f64,
) -> CoupledSystem {
    let half = dt * 0.5;
    let k1 = dynamics.derivatives(time, system);
    let k2 = dynamics.derivatives(time + half, &system.apply(&k1, half));
    let k3 = dynamics.derivatives(time + half, &system.apply(&k2, half));
    let k4 = dynamics.derivatives(time + dt, &system.apply(&k3, dt));

    let blended = CoupledRate(
        (0..system.len())
            .map(|i| BodyRate::rk4_blend(&k1.0[i], &k2.0[i], &k3.0[i], &k4.0[i]))
            .collect(),
    );
    system.apply(&blended, dt)
}

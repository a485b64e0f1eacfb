use nalgebra::{UnitQuaternion, Vector3};

use super::{BlockInput, Load, PhysicsBlock};

/// Below this airspeed the flow direction is undefined: zero angle of
/// attack and no aerodynamic load.
pub const MIN_AIRSPEED: f64 = 0.1;

/// Flow state seen by the airframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroInput {
    pub airspeed: f64,          // m/s
    pub mach: f64,
    pub alpha: f64,             // rad, total angle of attack
    pub density: f64,           // kg/m^3
    pub omega: Vector3<f64>,    // rad/s, body frame
}

/// Dimensionless coefficients referenced to the body cross-section and
/// diameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroCoefficients {
    pub drag: f64,
    pub normal: f64,
    /// Centre of pressure, m aft of the nose tip.
    pub center_of_pressure: f64,
    /// Pitch/yaw damping, positive opposes the rate.
    pub pitch_damping: f64,
    /// Roll damping, positive opposes the roll rate.
    pub roll_damping: f64,
    /// Roll forcing from fin cant.
    pub roll_forcing: f64,
}

/// Replaceable coefficient model.
pub trait AerodynamicModel {
    fn coefficients(&self, input: &AeroInput) -> AeroCoefficients;
}

/// Small-angle model with constant slopes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAerodynamics {
    pub cd0: f64,
    pub cd_alpha2: f64,         // induced drag growth per rad^2
    pub cn_alpha: f64,          // per rad
    pub center_of_pressure: f64,
    pub pitch_damping: f64,
    pub roll_damping: f64,
    pub roll_forcing: f64,
}

impl Default for LinearAerodynamics {
    fn default() -> Self {
        Self {
            cd0: 0.5,
            cd_alpha2: 2.0,
            cn_alpha: 10.0,
            center_of_pressure: 1.6,
            pitch_damping: 20.0,
            roll_damping: 2.0,
            roll_forcing: 0.0,
        }
    }
}

impl AerodynamicModel for LinearAerodynamics {
    fn coefficients(&self, input: &AeroInput) -> AeroCoefficients {
        AeroCoefficients {
            drag: self.cd0 + self.cd_alpha2 * input.alpha * input.alpha,
            normal: self.cn_alpha * input.alpha,
            center_of_pressure: self.center_of_pressure,
            pitch_damping: self.pitch_damping,
            roll_damping: self.roll_damping,
            roll_forcing: self.roll_forcing,
        }
    }
}

impl<M: AerodynamicModel + ?Sized> AerodynamicModel for Box<M> {
    fn coefficients(&self, input: &AeroInput) -> AeroCoefficients {
        (**self).coefficients(input)
    }
}

/// Angle between the body +x axis and the body-frame air velocity.
pub fn angle_of_attack(vel_body: &Vector3<f64>) -> f64 {
    let speed = vel_body.norm();
    if speed < MIN_AIRSPEED {
        return 0.0;
    }
    (vel_body.x / speed).clamp(-1.0, 1.0).acos()
}

// ---------------------------------------------------------------------------
// Aerodynamic load block
// ---------------------------------------------------------------------------

/// Drag, normal force and moments on a finned body of revolution.
///
/// Drag opposes the air-relative velocity. The normal force acts
/// perpendicular to the body axis against the cross-flow, at the centre of
/// pressure, which gives the restoring moment about the centre of mass.
pub struct Aerodynamics<M> {
    pub model: M,
    pub diameter: f64,          // m
    pub center_of_mass: f64,    // m aft of the nose tip
}

impl<M: AerodynamicModel> Aerodynamics<M> {
    pub fn new(model: M, diameter: f64, center_of_mass: f64) -> Self {
        Self { model, diameter, center_of_mass }
    }

    pub fn reference_area(&self) -> f64 {
        std::f64::consts::PI * (self.diameter / 2.0).powi(2)
    }
}

impl<M: AerodynamicModel> PhysicsBlock for Aerodynamics<M> {
    fn name(&self) -> &str {
        "aerodynamics"
    }

    fn compute(&self, input: &BlockInput) -> Load {
        let body = input.body;
        let env = input.env;
        let v_air = body.vel - env.wind;
        let speed = v_air.norm();
        if speed < MIN_AIRSPEED {
            return Load::zero();
        }

        let (quat, omega) = match &body.attitude {
            Some(att) => (att.quat, att.omega),
            None => (UnitQuaternion::identity(), Vector3::zeros()),
        };
        let vel_body = quat.inverse() * v_air;
        let alpha = angle_of_attack(&vel_body);
        let mach = if env.sound_speed > 0.0 { speed / env.sound_speed } else { 0.0 };

        let c = self.model.coefficients(&AeroInput {
            airspeed: speed,
            mach,
            alpha,
            density: env.density,
            omega,
        });

        let area = self.reference_area();
        let d = self.diameter;
        let q_dyn = 0.5 * env.density * speed * speed;

        let f_drag = -v_air / speed * (q_dyn * area * c.drag);

        // Cross-flow in the body y-z plane
        let cross = Vector3::new(0.0, vel_body.y, vel_body.z);
        let cross_norm = cross.norm();
        let f_normal_body = if cross_norm > 1e-9 {
            -cross / cross_norm * (q_dyn * area * c.normal)
        } else {
            Vector3::zeros()
        };

        // CP relative to CG along +x (towards the nose)
        let arm = Vector3::new(self.center_of_mass - c.center_of_pressure, 0.0, 0.0);
        let mut moment = arm.cross(&f_normal_body);

        let rate_scale = 0.5 * env.density * speed * area * d * d / 2.0;
        moment.y -= rate_scale * c.pitch_damping * omega.y;
        moment.z -= rate_scale * c.pitch_damping * omega.z;
        moment.x += q_dyn * area * d * c.roll_forcing - rate_scale * c.roll_damping * omega.x;

        Load {
            force: f_drag + quat * f_normal_body,
            moment,
            mass_rate: 0.0,
        }
    }
}

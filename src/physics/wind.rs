use nalgebra::Vector3;

pub trait WindModel {
    /// Air velocity (inertial frame) at `pos` and `time`.
    fn velocity(&self, time: f64, pos: &Vector3<f64>) -> Vector3<f64>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Calm;

impl WindModel for Calm {
    fn velocity(&self, _time: f64, _pos: &Vector3<f64>) -> Vector3<f64> {
        Vector3::zeros()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantWind(pub Vector3<f64>);

impl WindModel for ConstantWind {
    fn velocity(&self, _time: f64, _pos: &Vector3<f64>) -> Vector3<f64> {
        self.0
    }
}

/// Horizontal boundary-layer wind: `v(z) = v_ref · (z / z_ref)^alpha`.
/// Zero at and below ground level.
#[derive(Debug, Clone, Copy)]
pub struct PowerLawWind {
    pub reference_speed: f64,   // m/s at reference_height
    pub reference_height: f64,  // m
    pub exponent: f64,          // ~1/7 over open terrain
    pub heading: f64,           // rad from +x towards +y, direction the air moves
}

impl Default for PowerLawWind {
    fn default() -> Self {
        Self {
            reference_speed: 5.0,
            reference_height: 10.0,
            exponent: 1.0 / 7.0,
            heading: 0.0,
        }
    }
}

impl WindModel for PowerLawWind {
    fn velocity(&self, _time: f64, pos: &Vector3<f64>) -> Vector3<f64> {
        if pos.z <= 0.0 || self.reference_height <= 0.0 {
            return Vector3::zeros();
        }
        let speed = self.reference_speed * (pos.z / self.reference_height).powf(self.exponent);
        Vector3::new(speed * self.heading.cos(), speed * self.heading.sin(), 0.0)
    }
}

use crate::dynamics::state::G0;

const R_AIR: f64 = 287.052_87; // specific gas constant for dry air, J/(kg·K)
const GAMMA: f64 = 1.4;        // ratio of specific heats

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmo {
    pub density: f64,      // kg/m^3
    pub pressure: f64,     // Pa
    pub temperature: f64,  // K
    pub sound_speed: f64,  // m/s
}

impl Atmo {
    fn from_temperature_pressure(temperature: f64, pressure: f64) -> Self {
        let density = if temperature > 0.0 {
            pressure / (R_AIR * temperature)
        } else {
            0.0
        };
        Atmo {
            density,
            pressure,
            temperature,
            sound_speed: (GAMMA * R_AIR * temperature.max(0.0)).sqrt(),
        }
    }
}

pub trait AtmosphereModel {
    fn properties(&self, altitude: f64) -> Atmo;
}

// ---------------------------------------------------------------------------
// ISA 1976 (sea level to 86 km)
// ---------------------------------------------------------------------------

/// (base altitude m, base temperature K, lapse K/m, base pressure Pa)
const ISA_LAYERS: [(f64, f64, f64, f64); 7] = [
    (0.0, 288.15, -0.0065, 101_325.0),
    (11_000.0, 216.65, 0.0, 22_632.1),
    (20_000.0, 216.65, 0.001, 5_474.89),
    (32_000.0, 228.65, 0.0028, 868.019),
    (47_000.0, 270.65, 0.0, 110.906),
    (51_000.0, 270.65, -0.0028, 66.9389),
    (71_000.0, 214.65, -0.002, 3.956_42),
];

/// Layered standard atmosphere. Negative altitudes clamp to sea level;
/// above 86 km pressure decays exponentially at 186.87 K.
#[derive(Debug, Clone, Copy, Default)]
pub struct Isa;

impl AtmosphereModel for Isa {
    fn properties(&self, altitude: f64) -> Atmo {
        let h = altitude.max(0.0);
        if h >= 86_000.0 {
            let p = 0.3734 * (-0.000_15 * (h - 86_000.0)).exp();
            return Atmo::from_temperature_pressure(186.87, p.max(0.0));
        }

        let layer = ISA_LAYERS
            .iter()
            .rev()
            .find(|(base, ..)| h >= *base)
            .unwrap_or(&ISA_LAYERS[0]);
        let &(h_base, t_base, lapse, p_base) = layer;

        let (t, p) = if lapse == 0.0 {
            (t_base, p_base * ((-G0 / (R_AIR * t_base)) * (h - h_base)).exp())
        } else {
            let t = t_base + lapse * (h - h_base);
            (t, p_base * (t / t_base).powf(-G0 / (lapse * R_AIR)))
        };
        Atmo::from_temperature_pressure(t, p)
    }
}

// ---------------------------------------------------------------------------
// Single-gradient troposphere
// ---------------------------------------------------------------------------

/// Linear temperature lapse of 6.5 K/km from configurable sea-level values.
/// Density and pressure follow `x0 · (1 - 0.0065 h / T0)^5.226`.
#[derive(Debug, Clone, Copy)]
pub struct Troposphere {
    pub rho0: f64,  // kg/m^3
    pub p0: f64,    // Pa
    pub t0: f64,    // K
}

impl Default for Troposphere {
    fn default() -> Self {
        Self { rho0: 1.225, p0: 101_325.0, t0: 298.0 }
    }
}

impl AtmosphereModel for Troposphere {
    fn properties(&self, altitude: f64) -> Atmo {
        let h = altitude.max(0.0);
        let ratio = (1.0 - 0.0065 * h / self.t0).max(0.0);
        let factor = ratio.powf(5.226);
        let temperature = self.t0 * ratio;
        Atmo {
            density: self.rho0 * factor,
            pressure: self.p0 * factor,
            temperature,
            sound_speed: (GAMMA * R_AIR * temperature).sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_standard_values() {
        let a = Isa.properties(0.0);
        assert!((a.temperature - 288.15).abs() < 0.01);
        assert!((a.pressure - 101_325.0).abs() < 1.0);
        assert!((a.density - 1.225).abs() < 0.001);
        assert!((a.sound_speed - 340.29).abs() < 0.1);
    }

    #[test]
    fn tropopause_11km() {
        let a = Isa.properties(11_000.0);
        assert!((a.temperature - 216.65).abs() < 0.5);
        assert!((a.pressure - 22_632.0).abs() < 100.0);
    }

    #[test]
    fn density_monotonically_decreases() {
        let rho: Vec<f64> = [0.0, 10_000.0, 25_000.0, 50_000.0, 90_000.0]
            .iter()
            .map(|&h| Isa.properties(h).density)
            .collect();
        assert!(rho.windows(2).all(|w| w[0] > w[1]), "{:?}", rho);
        assert!(rho[4] > 0.0);
    }

    #[test]
    fn negative_altitude_clamps_to_sea_level() {
        let a = Isa.properties(-500.0);
        assert!((a.temperature - 288.15).abs() < 0.01);
        let t = Troposphere::default().properties(-10.0);
        assert_eq!(t.density, 1.225);
    }

    #[test]
    fn troposphere_thins_with_height() {
        let model = Troposphere::default();
        let low = model.properties(0.0);
        let high = model.properties(1_000.0);
        assert!(high.density < low.density);
        assert!(high.pressure < low.pressure);
        // 1 km: (1 - 6.5/298)^5.226 ≈ 0.891
        assert!((high.density / low.density - 0.891).abs() < 0.002);
    }

    #[test]
    fn troposphere_never_goes_nan() {
        let a = Troposphere::default().properties(100_000.0);
        assert_eq!(a.density, 0.0);
        assert!(a.sound_speed.is_finite());
    }
}

use nalgebra::Vector3;

use crate::dynamics::state::{BodyId, DeploymentStatus};
use crate::physics::atmosphere::AtmosphereModel;

use super::event::FiredEvent;
use super::recorder::{FieldPath, Quantity};
use super::runner::{FlightLog, StopReason};

/// Summary statistics of one flight. The tracked body is the rocket until
/// deployment starts and the airframe afterwards.
#[derive(Debug, Clone)]
pub struct FlightSummary {
    pub apogee_m: f64,
    pub apogee_time: f64,
    pub max_speed: f64,
    pub max_mach: f64,
    pub flight_time: f64,
    pub landing_point: Vector3<f64>,
    pub landing_speed: f64,
    /// Mean sink rate over the final recorded second, m/s (positive down).
    pub descent_rate: f64,
    pub events: Vec<FiredEvent>,
    pub stop_reason: StopReason,
}

struct TrackPoint {
    time: f64,
    pos: Vector3<f64>,
    vel: Vector3<f64>,
}

impl FlightSummary {
    /// Needs position and velocity of rocket and airframe plus the
    /// deployment status among the recorded fields; `None` otherwise.
    pub fn from_log(log: &FlightLog, atmosphere: &dyn AtmosphereModel) -> Option<Self> {
        let column = |path: FieldPath| log.fields.iter().position(|f| *f == path);
        let rocket_pos = column(FieldPath::body(BodyId::ROCKET, Quantity::Position))?;
        let rocket_vel = column(FieldPath::body(BodyId::ROCKET, Quantity::Velocity))?;
        let frame_pos = column(FieldPath::body(BodyId::AIRFRAME, Quantity::Position))?;
        let frame_vel = column(FieldPath::body(BodyId::AIRFRAME, Quantity::Velocity))?;
        let status = column(FieldPath::Deployment)?;

        let track: Vec<TrackPoint> = log
            .snapshots
            .iter()
            .filter_map(|s| {
                let deployed = s.values[status].as_ref()?.as_status()? != DeploymentStatus::NotDeployed;
                let (p, v) = if deployed { (frame_pos, frame_vel) } else { (rocket_pos, rocket_vel) };
                Some(TrackPoint {
                    time: s.time,
                    pos: s.values[p].as_ref()?.as_vector()?,
                    vel: s.values[v].as_ref()?.as_vector()?,
                })
            })
            .collect();

        let apogee = track.iter().max_by(|a, b| a.pos.z.total_cmp(&b.pos.z))?;
        let last = track.last()?;

        let max_speed = track.iter().map(|p| p.vel.norm()).fold(0.0_f64, f64::max);
        let max_mach = track
            .iter()
            .map(|p| p.vel.norm() / atmosphere.properties(p.pos.z.max(0.0)).sound_speed)
            .fold(0.0_f64, f64::max);

        let window: Vec<&TrackPoint> = track.iter().filter(|p| p.time >= last.time - 1.0).collect();
        let descent_rate = match (window.first(), window.last()) {
            (Some(a), Some(b)) if b.time > a.time => -(b.pos.z - a.pos.z) / (b.time - a.time),
            _ => -last.vel.z,
        };

        Some(FlightSummary {
            apogee_m: apogee.pos.z,
            apogee_time: apogee.time,
            max_speed,
            max_mach,
            flight_time: log.final_time,
            landing_point: Vector3::new(last.pos.x, last.pos.y, 0.0),
            landing_speed: last.vel.norm(),
            descent_rate,
            events: log.events.clone(),
            stop_reason: log.stop_reason,
        })
    }

    pub fn event_time(&self, name: &str) -> Option<f64> {
        self.events.iter().find(|e| e.name == name).map(|e| e.time)
    }

    /// Horizontal distance from the pad to the landing point.
    pub fn drift(&self) -> f64 {
        self.landing_point.xy().norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::{CoupledSystem, RigidBodyState};
    use crate::physics::atmosphere::Isa;
    use crate::sim::recorder::{FieldValue, RecordConfig, Snapshot};

    fn snap(time: f64, rocket: (f64, f64), frame: (f64, f64), status: DeploymentStatus) -> Snapshot {
        Snapshot {
            time,
            values: vec![
                Some(FieldValue::Vector(Vector3::new(0.0, 0.0, rocket.0))),
                Some(FieldValue::Vector(Vector3::new(0.0, 0.0, rocket.1))),
                Some(FieldValue::Vector(Vector3::new(3.0, 4.0, frame.0))),
                Some(FieldValue::Vector(Vector3::new(0.0, 0.0, frame.1))),
                Some(FieldValue::Status(status)),
            ],
        }
    }

    fn log() -> FlightLog {
        use DeploymentStatus::*;
        let fields = RecordConfig::parse(
            &["rocket.pos", "rocket.vel", "airframe.pos", "airframe.vel", "deployment"],
            0.5,
        )
        .unwrap()
        .fields;
        FlightLog {
            fields,
            snapshots: vec![
                snap(0.0, (0.0, 0.0), (0.0, 0.0), NotDeployed),
                snap(5.0, (300.0, 40.0), (0.0, 0.0), NotDeployed),
                snap(10.0, (500.0, 0.0), (0.0, 0.0), NotDeployed),
                // Rocket frozen at deployment, airframe carries on
                snap(20.0, (500.0, 0.0), (100.0, -5.0), Deployed),
                snap(21.0, (500.0, 0.0), (95.0, -5.0), Deployed),
            ],
            events: vec![FiredEvent { name: "apogee".into(), time: 10.0 }],
            stop_reason: StopReason::Condition,
            final_time: 21.0,
            steps: 4200,
            final_state: CoupledSystem::new(vec![RigidBodyState::point(Vector3::zeros(), Vector3::zeros(), 1.0)]),
        }
    }

    #[test]
    fn tracks_rocket_then_airframe() {
        let s = FlightSummary::from_log(&log(), &Isa).unwrap();
        assert_eq!(s.apogee_m, 500.0);
        assert_eq!(s.apogee_time, 10.0);
        assert_eq!(s.max_speed, 40.0);
        assert!(s.max_mach > 0.1 && s.max_mach < 0.13, "mach {}", s.max_mach);
        assert_eq!(s.descent_rate, 5.0);
        assert_eq!(s.drift(), 5.0);
        assert_eq!(s.event_time("apogee"), Some(10.0));
        assert_eq!(s.flight_time, 21.0);
    }

    #[test]
    fn needs_recorded_fields() {
        let mut l = log();
        l.fields.pop();
        assert!(FlightSummary::from_log(&l, &Isa).is_none());
    }
}

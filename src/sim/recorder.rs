use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;

use crate::dynamics::state::{BodyId, CoupledSystem, DeploymentStatus};
use crate::error::{SimError, SimResult};

// ---------------------------------------------------------------------------
// Field paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quantity {
    Position,
    Velocity,
    Euler,
    AngularVelocity,
    Mass,
}

impl Quantity {
    fn key(self) -> &'static str {
        match self {
            Quantity::Position => "pos",
            Quantity::Velocity => "vel",
            Quantity::Euler => "euler",
            Quantity::AngularVelocity => "omega",
            Quantity::Mass => "mass",
        }
    }

    fn parse(key: &str) -> Option<Quantity> {
        Some(match key {
            "pos" => Quantity::Position,
            "vel" => Quantity::Velocity,
            "euler" => Quantity::Euler,
            "omega" => Quantity::AngularVelocity,
            "mass" => Quantity::Mass,
            _ => return None,
        })
    }
}

/// Address of one observable of the coupled system, e.g. `"rocket.pos"` or
/// `"deployment"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldPath {
    Body { body: BodyId, quantity: Quantity },
    Deployment,
}

impl FieldPath {
    pub fn body(body: BodyId, quantity: Quantity) -> Self {
        FieldPath::Body { body, quantity }
    }

    /// Current value, or `None` when the body has no such quantity (e.g.
    /// Euler angles of a point mass).
    pub fn read(&self, system: &CoupledSystem) -> SimResult<Option<FieldValue>> {
        let (body, quantity) = match *self {
            FieldPath::Deployment => return Ok(Some(FieldValue::Status(system.deployment))),
            FieldPath::Body { body, quantity } => (body, quantity),
        };
        if !system.contains(body) {
            return Err(SimError::UnknownBody(body.to_string()));
        }
        let state = system.body(body);
        Ok(match quantity {
            Quantity::Position => Some(state.pos.into()),
            Quantity::Velocity => Some(state.vel.into()),
            Quantity::Mass => Some(state.mass.into()),
            Quantity::Euler => state.euler().map(FieldValue::from),
            Quantity::AngularVelocity => state.attitude.as_ref().map(|a| a.omega.into()),
        })
    }
}

impl FromStr for FieldPath {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "deployment" {
            return Ok(FieldPath::Deployment);
        }
        let (body, key) = s
            .split_once('.')
            .ok_or_else(|| SimError::UnknownField(s.to_string()))?;
        let body = BodyId::parse(body)?;
        let quantity = Quantity::parse(key).ok_or_else(|| SimError::UnknownField(s.to_string()))?;
        Ok(FieldPath::Body { body, quantity })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Deployment => f.write_str("deployment"),
            FieldPath::Body { body, quantity } => write!(f, "{}.{}", body, quantity.key()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Vector(Vector3<f64>),
    Scalar(f64),
    Status(DeploymentStatus),
}

impl FieldValue {
    pub fn as_vector(&self) -> Option<Vector3<f64>> {
        match self {
            FieldValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FieldValue::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<DeploymentStatus> {
        match self {
            FieldValue::Status(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<Vector3<f64>> for FieldValue {
    fn from(v: Vector3<f64>) -> Self {
        FieldValue::Vector(v)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Scalar(x)
    }
}

impl From<DeploymentStatus> for FieldValue {
    fn from(s: DeploymentStatus) -> Self {
        FieldValue::Status(s)
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordConfig {
    pub fields: Vec<FieldPath>,
    pub period: f64, // s, independent of dt
}

impl RecordConfig {
    pub fn new(fields: Vec<FieldPath>, period: f64) -> Self {
        Self { fields, period }
    }

    /// Parse field names like `"canopy.pos"`.
    pub fn parse(names: &[&str], period: f64) -> SimResult<Self> {
        let fields = names.iter().map(|n| n.parse()).collect::<SimResult<Vec<_>>>()?;
        Ok(Self { fields, period })
    }

    pub fn validate(&self, system: &CoupledSystem) -> SimResult<()> {
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "record period must be positive, got {}",
                self.period
            )));
        }
        for field in &self.fields {
            field.read(system)?;
        }
        Ok(())
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        use Quantity::*;
        Self {
            fields: vec![
                FieldPath::body(BodyId::ROCKET, Position),
                FieldPath::body(BodyId::ROCKET, Velocity),
                FieldPath::body(BodyId::ROCKET, Euler),
                FieldPath::body(BodyId::CANOPY, Position),
                FieldPath::body(BodyId::CANOPY, Velocity),
                FieldPath::body(BodyId::AIRFRAME, Position),
                FieldPath::body(BodyId::AIRFRAME, Velocity),
                FieldPath::Deployment,
            ],
            period: 0.05,
        }
    }
}

/// One sample of the recorded fields. `values[i]` belongs to `fields[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub values: Vec<Option<FieldValue>>,
}

/// Samples at its own period; sample `n` is due at `n * period`.
#[derive(Debug, Clone)]
pub struct Recorder {
    config: RecordConfig,
    next_index: u64,
    last_time: Option<f64>,
    snapshots: Vec<Snapshot>,
}

impl Recorder {
    pub fn new(config: RecordConfig) -> Self {
        Self { config, next_index: 0, last_time: None, snapshots: vec![] }
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.config.fields
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }

    fn next_sample(&self) -> f64 {
        self.next_index as f64 * self.config.period
    }

    /// Record if a sample is due (or `force` is set). Never records the same
    /// tick twice.
    pub fn observe(&mut self, time: f64, epsilon: f64, system: &CoupledSystem, force: bool) {
        if self.last_time == Some(time) {
            return;
        }
        let due = time >= self.next_sample() - epsilon;
        if !(due || force) {
            return;
        }
        let values = self
            .config
            .fields
            .iter()
            .map(|f| f.read(system).ok().flatten())
            .collect();
        self.snapshots.push(Snapshot { time, values });
        self.last_time = Some(time);
        while self.next_sample() <= time + epsilon {
            self.next_index += 1;
        }
    }
}

use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::dynamics::state::{Attitude, CoupledSystem};
use crate::error::{SimError, SimResult};

use super::recorder::{FieldPath, FieldValue, Quantity};

/// Initial values keyed by field path. Entries that are not given keep the
/// value already in the system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialConditions {
    values: BTreeMap<FieldPath, FieldValue>,
}

impl InitialConditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value by name, e.g. `.with("rocket.vel", Vector3::zeros())`.
    pub fn with(mut self, path: &str, value: impl Into<FieldValue>) -> SimResult<Self> {
        let path: FieldPath = path.parse()?;
        self.set(path, value);
        Ok(self)
    }

    pub fn set(&mut self, path: FieldPath, value: impl Into<FieldValue>) {
        self.values.insert(path, value.into());
    }

    pub fn get(&self, path: &FieldPath) -> Option<&FieldValue> {
        self.values.get(path)
    }

    /// Write every entry into `system`, after checking that `required` are
    /// all present.
    pub fn apply(&self, system: &mut CoupledSystem, required: &[FieldPath]) -> SimResult<()> {
        if let Some(missing) = required.iter().find(|p| !self.values.contains_key(p)) {
            return Err(SimError::MissingInitialCondition(missing.to_string()));
        }
        for (path, value) in &self.values {
            write_field(system, path, value)?;
        }
        Ok(())
    }
}

fn write_field(system: &mut CoupledSystem, path: &FieldPath, value: &FieldValue) -> SimResult<()> {
    let mismatch = || SimError::InvalidConfig(format!("{} cannot be set to {:?}", path, value));
    let (body, quantity) = match *path {
        FieldPath::Deployment => {
            system.deployment = value.as_status().ok_or_else(mismatch)?;
            return Ok(());
        }
        FieldPath::Body { body, quantity } => (body, quantity),
    };
    if !system.contains(body) {
        return Err(SimError::UnknownBody(body.to_string()));
    }
    let state = system.body_mut(body);
    match quantity {
        Quantity::Position => state.pos = value.as_vector().ok_or_else(mismatch)?,
        Quantity::Velocity => state.vel = value.as_vector().ok_or_else(mismatch)?,
        Quantity::Mass => state.mass = value.as_scalar().ok_or_else(mismatch)?,
        Quantity::Euler => {
            let angles = value.as_vector().ok_or_else(mismatch)?;
            let omega = state.attitude.as_ref().map_or_else(Vector3::zeros, |a| a.omega);
            state.attitude = Some(Attitude::from_euler(angles, omega));
        }
        Quantity::AngularVelocity => {
            let omega = value.as_vector().ok_or_else(mismatch)?;
            match state.attitude.as_mut() {
                Some(att) => att.omega = omega,
                None => state.attitude = Some(Attitude::from_euler(Vector3::zeros(), omega)),
            }
        }
    }
    Ok(())
}

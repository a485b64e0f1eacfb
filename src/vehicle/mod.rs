pub mod mission;
pub mod recovery;
pub mod rocket;

pub use mission::{presets, DeploymentTrigger, Mission, MissionBuilder};
pub use recovery::{Recovery, RecoveryBuilder};
pub use rocket::{Rocket, RocketBuilder};

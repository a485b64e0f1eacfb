pub mod error;
pub mod physics;
pub mod dynamics;
pub mod sim;
pub mod vehicle;

pub use error::{SimError, SimResult};

use nalgebra::Vector3;
use tracing::{info, warn};

use super::recovery::{Recovery, RecoveryBuilder};
use super::rocket::{Rocket, RocketBuilder};
use crate::dynamics::flight::{Activation, BodyModel, FlightDynamics};
use crate::dynamics::state::{BodyId, CoupledSystem, RigidBodyState, SimConfig};
use crate::error::{SimError, SimResult};
use crate::physics::{AerodynamicModel, Aerodynamics, EnvironmentModel, QuadraticDrag, Thrust, Weight};
use crate::sim::event::{Crossing, EventDetector, Signal, Trigger};
use crate::sim::initial::InitialConditions;
use crate::sim::recorder::{FieldPath, Quantity, RecordConfig};
use crate::sim::runner::{stop_below, FlightLog, Simulation};
use crate::sim::summary::FlightSummary;
use crate::sim::transition::{BeginDeployment, CompleteDeployment, RecordOnly};

/// Vertical velocity of the rocket crosses zero from above.
pub const APOGEE: &str = "apogee";
/// Deployment timer elapsed (timer-triggered missions only).
pub const DEPLOYMENT_TIMER: &str = "deployment_timer";
/// Canopy inflated after the configured delay.
pub const FULL_DEPLOYMENT: &str = "full_deployment";

// Within a tick, state crossings are evaluated before time thresholds.
const APOGEE_PRIORITY: i32 = 0;
const TIMER_PRIORITY: i32 = 1;
const FULL_DEPLOYMENT_PRIORITY: i32 = 2;

/// What starts the recovery sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeploymentTrigger {
    Apogee,
    /// Fixed time after launch, s.
    AtTime(f64),
}

// ---------------------------------------------------------------------------
// Mission: rocket + recovery + event graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Mission {
    pub name: String,
    pub rocket: Rocket,
    pub recovery: Recovery,
    pub deployment: DeploymentTrigger,
    /// The run ends once the canopy drops below this altitude, m.
    pub landing_altitude: f64,
}

impl Mission {
    /// Fields every flight must be given initial values for.
    pub fn required_fields() -> Vec<FieldPath> {
        use Quantity::*;
        [Position, Velocity, Euler, AngularVelocity]
            .into_iter()
            .map(|q| FieldPath::body(BodyId::ROCKET, q))
            .collect()
    }

    /// Rocket on the pad, 0.5 m up, tilted 0.2 rad off vertical towards +x.
    pub fn default_initial_conditions() -> SimResult<InitialConditions> {
        InitialConditions::new()
            .with("rocket.pos", Vector3::new(0.0, 0.0, 0.5))?
            .with("rocket.vel", Vector3::zeros())?
            .with("rocket.euler", Vector3::new(0.0, -std::f64::consts::FRAC_PI_2 + 0.2, 0.0))?
            .with("rocket.omega", Vector3::zeros())
    }

    /// Three bodies: rocket at the origin with its wet mass, canopy and
    /// airframe stowed until release.
    pub fn initial_system(&self) -> CoupledSystem {
        let stowed = self.recovery.stowed_position;
        CoupledSystem::new(vec![
            RigidBodyState::point(Vector3::zeros(), Vector3::zeros(), self.rocket.total_mass()),
            RigidBodyState::point(stowed, Vector3::zeros(), self.recovery.canopy_mass),
            RigidBodyState::point(stowed, Vector3::zeros(), self.recovery.airframe_mass),
        ])
    }

    pub fn dynamics(&self, environment: EnvironmentModel) -> FlightDynamics {
        self.dynamics_with_aero(environment, self.rocket.aero)
    }

    /// Same vehicle with a different aerodynamic coefficient model.
    pub fn dynamics_with_aero<M>(&self, environment: EnvironmentModel, model: M) -> FlightDynamics
    where
        M: AerodynamicModel + 'static,
    {
        let rocket = &self.rocket;
        let recovery = &self.recovery;
        FlightDynamics::new(environment)
            .body(
                BodyModel::new("rocket", Activation::FromLaunch)
                    .block(Weight)
                    .block(Thrust { motor: rocket.motor, dry_mass: rocket.dry_mass })
                    .block(Aerodynamics::new(model, rocket.diameter, rocket.center_of_mass))
                    .inertia(rocket.inertia),
            )
            .body(
                BodyModel::new("canopy", Activation::OnRelease)
                    .block(Weight)
                    .block(QuadraticDrag::canopy(recovery.canopy_area, recovery.canopy_cd)),
            )
            .body(BodyModel::new("airframe", Activation::OnRelease).block(Weight))
            .tether(recovery.tether())
    }

    pub fn validate(&self) -> SimResult<()> {
        self.rocket.validate()?;
        self.recovery.validate()?;
        if let DeploymentTrigger::AtTime(t) = self.deployment {
            if !(t.is_finite() && t >= 0.0) {
                return Err(SimError::InvalidConfig(format!("deployment time {}", t)));
            }
        }
        if self.rocket.twr() < 1.0 {
            warn!(twr = self.rocket.twr(), "thrust-to-weight below 1, rocket will not leave the pad");
        }
        let split = self.recovery.total_mass();
        if (split - self.rocket.dry_mass).abs() > 1e-6 {
            warn!(
                canopy_plus_airframe = split,
                dry_mass = self.rocket.dry_mass,
                "recovery bodies do not add up to the rocket dry mass"
            );
        }
        Ok(())
    }

    /// Simulation with the standard event graph: deployment start (apogee
    /// or timer), full deployment after the inflation delay, stop once the
    /// canopy is below the landing altitude.
    pub fn simulation(
        &self,
        environment: EnvironmentModel,
        config: SimConfig,
        initial: InitialConditions,
    ) -> SimResult<Simulation<FlightDynamics>> {
        self.simulation_with(self.dynamics(environment), config, initial)
    }

    pub fn simulation_with(
        &self,
        dynamics: FlightDynamics,
        config: SimConfig,
        initial: InitialConditions,
    ) -> SimResult<Simulation<FlightDynamics>> {
        self.validate()?;
        info!(mission = %self.name, deployment = ?self.deployment, "building simulation");

        let begin = BeginDeployment {
            rocket: BodyId::ROCKET,
            canopy: BodyId::CANOPY,
            airframe: BodyId::AIRFRAME,
            tether_length: self.recovery.tether_length,
        };
        let apogee = EventDetector::new(
            APOGEE,
            APOGEE_PRIORITY,
            Trigger::SignChange {
                signal: Signal::VerticalVelocity(BodyId::ROCKET),
                crossing: Crossing::Falling,
            },
        );

        let builder = Simulation::builder(dynamics, self.initial_system())
            .config(config)
            .initial_conditions(initial)
            .require(&Self::required_fields())
            .record(RecordConfig::default())
            .stop_when(stop_below(BodyId::CANOPY, self.landing_altitude));

        let (builder, deploy_event) = match self.deployment {
            DeploymentTrigger::Apogee => (builder.event(apogee, begin), APOGEE),
            DeploymentTrigger::AtTime(t) => (
                builder
                    .event(EventDetector::new(DEPLOYMENT_TIMER, TIMER_PRIORITY, Trigger::AtTime(t)), begin)
                    .event(apogee, RecordOnly),
                DEPLOYMENT_TIMER,
            ),
        };

        builder
            .event(
                EventDetector::new(
                    FULL_DEPLOYMENT,
                    FULL_DEPLOYMENT_PRIORITY,
                    Trigger::AfterEvent {
                        reference: deploy_event.to_string(),
                        delay: self.recovery.inflation_time,
                    },
                ),
                CompleteDeployment,
            )
            .build()
    }

    /// Summary using the atmosphere the flight ran in.
    pub fn summary(&self, log: &FlightLog, environment: &EnvironmentModel) -> Option<FlightSummary> {
        FlightSummary::from_log(log, environment.atmosphere.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Mission builder
// ---------------------------------------------------------------------------

pub struct MissionBuilder {
    name: String,
    rocket: Option<Rocket>,
    recovery: Option<Recovery>,
    deployment: DeploymentTrigger,
    landing_altitude: f64,
}

impl MissionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rocket: None,
            recovery: None,
            deployment: DeploymentTrigger::Apogee,
            landing_altitude: -1.0,
        }
    }

    pub fn rocket(mut self, rocket: Rocket) -> Self {
        self.rocket = Some(rocket);
        self
    }

    pub fn recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn deploy_at(mut self, trigger: DeploymentTrigger) -> Self {
        self.deployment = trigger;
        self
    }

    pub fn landing_altitude(mut self, z: f64) -> Self {
        self.landing_altitude = z;
        self
    }

    pub fn build(self) -> Mission {
        let rocket = self.rocket.unwrap_or_else(|| RocketBuilder::new(self.name.clone()).build());
        Mission {
            name: self.name,
            rocket,
            recovery: self.recovery.unwrap_or_else(|| RecoveryBuilder::new().build()),
            deployment: self.deployment,
            landing_altitude: self.landing_altitude,
        }
    }
}

// ---------------------------------------------------------------------------
// Preset missions
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Single-stage hobby rocket with an apogee-deployed parachute.
    pub fn hobby_rocket() -> Mission {
        MissionBuilder::new("Hobby-1")
            .rocket(
                RocketBuilder::new("Hobby-1")
                    .dry_mass(11.6)
                    .thrust(800.0)
                    .isp(180.0)
                    .propellant_mass(1.5)
                    .diameter(0.2)
                    .length(2.2)
                    .center_of_mass(1.2)
                    .build(),
            )
            .recovery(
                RecoveryBuilder::new()
                    .tether_length(1.0)
                    .stiffness(100.0)
                    .damping(2.0)
                    .canopy_mass(1.6)
                    .airframe_mass(10.0)
                    .canopy_area(0.1)
                    .canopy_cd(1.75)
                    .inflation_time(0.1)
                    .build(),
            )
            .build()
    }

    /// Same vehicle, parachute released by a fixed timer.
    pub fn timed_deployment(t: f64) -> Mission {
        let mut m = hobby_rocket();
        m.name = "Hobby-1 (timer)".into();
        m.deployment = DeploymentTrigger::AtTime(t);
        m
    }
}

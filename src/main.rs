use std::process;

use chute_sim::dynamics::state::{BodyId, DeploymentStatus, SimConfig};
use chute_sim::physics::EnvironmentModel;
use chute_sim::sim::{FieldPath, FlightLog, FlightSummary, Quantity};
use chute_sim::vehicle::{presets, Mission};
use chute_sim::SimResult;

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

fn run() -> SimResult<()> {
    let mission = presets::hobby_rocket();
    let config = SimConfig { dt: 0.005, max_time: 600.0 };

    let sim = mission.simulation(EnvironmentModel::default(), config.clone(), Mission::default_initial_conditions()?)?;
    let log = sim.run()?;

    let environment = EnvironmentModel::default();
    match mission.summary(&log, &environment) {
        Some(summary) => print_report(&mission, &config, &log, &summary),
        None => eprintln!("no samples recorded"),
    }
    Ok(())
}

fn print_report(mission: &Mission, config: &SimConfig, log: &FlightLog, summary: &FlightSummary) {
    let rocket = &mission.rocket;
    let recovery = &mission.recovery;

    println!();
    println!("====================================================================");
    println!("  ROCKET FLIGHT SIMULATION — {}", mission.name);
    println!("====================================================================");
    println!();
    println!("  Vehicle Parameters");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Dry mass:      {:>8.1} kg    Propellant:   {:>8.1} kg",
        rocket.dry_mass, rocket.motor.propellant_mass
    );
    println!(
        "  Total mass:    {:>8.1} kg    TWR:          {:>8.2}",
        rocket.total_mass(),
        rocket.twr()
    );
    println!(
        "  Burn time:     {:>8.2} s     Delta-v:      {:>8.0} m/s",
        rocket.burn_time(),
        rocket.delta_v()
    );
    println!(
        "  Diameter:      {:>8.3} m     Ref. area:    {:>8.4} m^2",
        rocket.diameter,
        rocket.reference_area()
    );
    println!(
        "  Canopy:        {:>8.2} m^2   Cd:           {:>8.2}",
        recovery.canopy_area, recovery.canopy_cd
    );
    println!(
        "  Tether:        {:>8.1} m     k:            {:>8.0} N/m",
        recovery.tether_length, recovery.stiffness
    );
    println!();

    println!("  Flight Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for event in &summary.events {
        println!("  {:<18} t={:>7.3}s", event.name.to_uppercase(), event.time);
    }
    println!(
        "  {:<18} t={:>7.3}s   ({:?})",
        "STOP", summary.flight_time, summary.stop_reason
    );
    println!();

    println!("  Performance Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Max altitude:  {:>8.1} m   at t={:.2} s",
        summary.apogee_m, summary.apogee_time
    );
    println!(
        "  Max speed:     {:>8.1} m/s (Mach {:.3})",
        summary.max_speed, summary.max_mach
    );
    println!("  Descent rate:  {:>8.2} m/s", summary.descent_rate);
    println!(
        "  Landing:       ({:.1}, {:.1}) m, drift {:.1} m, {:.2} m/s",
        summary.landing_point.x,
        summary.landing_point.y,
        summary.drift(),
        summary.landing_speed
    );
    println!("  Flight time:   {:>8.1} s", summary.flight_time);
    println!();

    print_trajectory(log);

    println!();
    println!("  Simulation: {} steps, dt={} s", log.steps, config.dt);
    println!("====================================================================");
    println!();
}

fn print_trajectory(log: &FlightLog) {
    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>9}  {:>9}  {:>12}",
        "t (s)", "rocket z", "canopy z", "frame z", "deployment"
    );
    println!("  {}", "─".repeat(56));

    let column = |path: FieldPath| log.fields.iter().position(|f| *f == path);
    let cols = [
        column(FieldPath::body(BodyId::ROCKET, Quantity::Position)),
        column(FieldPath::body(BodyId::CANOPY, Quantity::Position)),
        column(FieldPath::body(BodyId::AIRFRAME, Quantity::Position)),
    ];
    let status_col = column(FieldPath::Deployment);

    let sample_interval = (log.snapshots.len() / 30).max(1);
    for (i, s) in log.snapshots.iter().enumerate() {
        if i % sample_interval != 0 && i != log.snapshots.len() - 1 {
            continue;
        }
        let z: Vec<f64> = cols
            .iter()
            .map(|c| {
                c.and_then(|c| s.values[c].as_ref())
                    .and_then(|v| v.as_vector())
                    .map_or(f64::NAN, |p| p.z)
            })
            .collect();
        let status = status_col
            .and_then(|c| s.values[c].as_ref())
            .and_then(|v| v.as_status())
            .unwrap_or(DeploymentStatus::NotDeployed);
        println!(
            "  {:>7.2}  {:>9.1}  {:>9.1}  {:>9.1}  {:>12}",
            s.time,
            z[0],
            z[1],
            z[2],
            format!("{:?}", status)
        );
    }
}

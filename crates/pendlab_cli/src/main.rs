mod export;
mod plot;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info, warn};

use pendlab_core::analysis;
use pendlab_core::derivation::{derive, DerivedModel};
use pendlab_core::energy;
use pendlab_core::error::IntegrationError;
use pendlab_core::integrator::{integrate, IntegratorConfig, StepperKind};
use pendlab_core::params::SystemParameters;
use pendlab_core::trajectory::{State, Trajectory};

/// Double-pendulum laboratory: derives the equations of motion, integrates
/// them, validates energy conservation, and writes the data products.
#[derive(Parser)]
#[command(name = "pendlab")]
#[command(about = "Derive, integrate, and validate double-pendulum dynamics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct RunArgs {
    /// Initial angle of the first link (rad, from the downward vertical)
    #[arg(long, default_value_t = std::f64::consts::FRAC_PI_2)]
    theta1: f64,

    /// Initial angle of the second link (rad)
    #[arg(long, default_value_t = std::f64::consts::FRAC_PI_2)]
    theta2: f64,

    /// Initial angular velocity of the first link (rad/s)
    #[arg(long, default_value_t = 0.0)]
    omega1: f64,

    /// Initial angular velocity of the second link (rad/s)
    #[arg(long, default_value_t = 0.0)]
    omega2: f64,

    /// Mass of the first bob (kg)
    #[arg(long, default_value_t = 1.0)]
    m1: f64,

    /// Mass of the second bob (kg)
    #[arg(long, default_value_t = 1.0)]
    m2: f64,

    /// Length of the first link (m)
    #[arg(long, default_value_t = 1.0)]
    l1: f64,

    /// Length of the second link (m)
    #[arg(long, default_value_t = 1.0)]
    l2: f64,

    /// Gravitational acceleration (m/s^2)
    #[arg(long, default_value_t = 9.81)]
    g: f64,

    /// Simulated time span (s)
    #[arg(long, default_value_t = 20.0)]
    duration: f64,

    /// Number of stored samples over the span
    #[arg(long, default_value_t = 2000)]
    samples: usize,

    /// Solver steps per stored sample
    #[arg(long, default_value_t = 8)]
    substeps: usize,

    /// Fixed-step solver
    #[arg(long, value_enum, default_value_t = Solver::Rk4)]
    solver: Solver,

    /// Relative energy drift that triggers a warning (1.0 = 100%)
    #[arg(long, default_value_t = 0.01)]
    drift_threshold: f64,

    /// Output directory
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Solver {
    Rk4,
    Tsit5,
}

impl From<Solver> for StepperKind {
    fn from(solver: Solver) -> Self {
        match solver {
            Solver::Rk4 => StepperKind::Rk4,
            Solver::Tsit5 => StepperKind::Tsit5,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the full derive -> integrate -> validate pipeline (the default)
    Simulate,

    /// Integrate a base and a perturbed initial condition and track their
    /// phase-space divergence
    Butterfly {
        /// Perturbation applied to theta1 (rad)
        #[arg(long, default_value_t = 1e-6)]
        epsilon: f64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Simulate) {
        Command::Simulate => simulate(&cli.run),
        Command::Butterfly { epsilon } => butterfly(&cli.run, epsilon),
    }
}

/// Validates the physical and numerical configuration before anything runs.
fn build_setup(args: &RunArgs) -> Result<(SystemParameters, State, IntegratorConfig)> {
    let params = SystemParameters::new(args.m1, args.m2, args.l1, args.l2, args.g)
        .context("invalid system parameters")?;
    let cfg = IntegratorConfig {
        duration: args.duration,
        samples: args.samples,
        substeps: args.substeps,
        stepper: args.solver.into(),
    };
    cfg.validate().context("invalid integrator configuration")?;
    let initial = State::new(args.theta1, args.omega1, args.theta2, args.omega2);
    Ok((params, initial, cfg))
}

fn derive_model(params: &SystemParameters) -> Result<DerivedModel> {
    info!("deriving equations of motion");
    let model = derive(params).context("derivation failed")?;
    info!(
        "compiled {} opcodes across the state derivatives",
        model.eom().op_count()
    );
    Ok(model)
}

fn simulate(args: &RunArgs) -> Result<()> {
    let (params, initial, cfg) = build_setup(args)?;
    let model = derive_model(&params)?;

    let (slow, fast) = analysis::normal_mode_frequencies(&params)?;
    info!("small-angle normal modes: {slow:.4} rad/s and {fast:.4} rad/s");

    info!(
        "integrating {} samples over {:.3} s ({} substeps each)",
        cfg.samples, cfg.duration, cfg.substeps
    );
    let (trajectory, truncation) = match integrate(model.eom(), initial, &cfg) {
        Ok(trajectory) => (trajectory, None),
        Err(IntegrationError::NonFiniteState {
            time,
            sample,
            partial,
        }) => {
            error!(
                "integration aborted at t = {time:.6} (sample {sample}); \
                 keeping {} valid samples",
                partial.len()
            );
            (partial, Some((time, sample)))
        }
        Err(err @ IntegrationError::InvalidConfig(_)) => {
            return Err(err).context("integration failed");
        }
    };

    let report = energy::validate(&trajectory, &params);
    if report.exceeds(args.drift_threshold) {
        warn!(
            "energy drift {:.4}% exceeds the configured {:.4}% threshold",
            report.max_drift() * 100.0,
            args.drift_threshold * 100.0
        );
    }

    write_products(args, &params, &trajectory, &report)?;

    println!("samples:          {}", trajectory.len());
    if let Some((t, state)) = trajectory.last() {
        println!(
            "final state:      t = {:.3} s, theta = ({:.4}, {:.4}) rad",
            t, state.theta1, state.theta2
        );
    }
    println!("max energy drift: {:.6}%", report.max_drift() * 100.0);
    println!("output directory: {}", args.out_dir.display());

    if let Some((time, sample)) = truncation {
        anyhow::bail!(
            "trajectory truncated at t = {time:.6} (sample {sample}); partial results written"
        );
    }
    Ok(())
}

fn write_products(
    args: &RunArgs,
    params: &SystemParameters,
    trajectory: &Trajectory,
    report: &energy::EnergyReport,
) -> Result<()> {
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;

    export::write_trajectory(&args.out_dir.join("simulation_data.csv"), trajectory)?;
    export::write_energy(&args.out_dir.join("energy.csv"), trajectory, report)?;
    plot::phase_space(&args.out_dir.join("phase_space.png"), trajectory)?;
    plot::animate(&args.out_dir.join("pendulum.gif"), trajectory, params)?;
    Ok(())
}

fn butterfly(args: &RunArgs, epsilon: f64) -> Result<()> {
    let (params, initial, cfg) = build_setup(args)?;
    let model = derive_model(&params)?;

    let mut perturbed = initial;
    perturbed.theta1 += epsilon;

    info!("integrating base and perturbed runs (epsilon = {epsilon:e} rad)");
    let base = integrate(model.eom(), initial, &cfg).context("base run failed")?;
    let other = integrate(model.eom(), perturbed, &cfg).context("perturbed run failed")?;

    let separation = analysis::separation(&base, &other)?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;
    export::write_separation(
        &args.out_dir.join("separation.csv"),
        base.times(),
        &separation,
    )?;
    plot::divergence(&args.out_dir.join("butterfly.png"), base.times(), &separation)?;

    let final_sep = separation.last().copied().unwrap_or(0.0);
    println!("initial separation: {epsilon:.3e} rad");
    println!("final separation:   {final_sep:.3e}");
    if epsilon > 0.0 {
        println!("amplification:      {:.3e}x", final_sep / epsilon);
    }
    println!("output directory:   {}", args.out_dir.display());
    Ok(())
}

//! CSV export of trajectories and diagnostics.
//!
//! The column order of `simulation_data.csv` is a compatibility contract
//! with downstream analysis tooling: t, theta1, omega1, theta2, omega2.

use std::path::Path;

use anyhow::{Context, Result};
use pendlab_core::energy::EnergyReport;
use pendlab_core::trajectory::Trajectory;

fn open(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).with_context(|| format!("cannot open {}", path.display()))
}

pub fn write_trajectory(path: &Path, trajectory: &Trajectory) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(["t", "theta1", "omega1", "theta2", "omega2"])?;
    for (t, state) in trajectory.iter() {
        writer.write_record([
            t.to_string(),
            state.theta1.to_string(),
            state.omega1.to_string(),
            state.theta2.to_string(),
            state.omega2.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_energy(path: &Path, trajectory: &Trajectory, report: &EnergyReport) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(["t", "energy"])?;
    for (t, energy) in trajectory.times().iter().zip(report.energies()) {
        writer.write_record([t.to_string(), energy.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_separation(path: &Path, times: &[f64], separation: &[f64]) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(["t", "separation"])?;
    for (t, distance) in times.iter().zip(separation) {
        writer.write_record([t.to_string(), distance.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

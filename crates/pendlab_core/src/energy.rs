//! Total-energy diagnostics over a sampled trajectory.
//!
//! The true system conserves energy exactly, so drift of the computed total
//! energy is a direct proxy for combined derivation and integration error.
//! Everything here is diagnostic only: a report never mutates a trajectory
//! and never halts the pipeline.

use crate::params::SystemParameters;
use crate::trajectory::{State, Trajectory};
use serde::Serialize;

/// Kinetic energy of a state, from the closed-form planar kinematics.
pub fn kinetic_energy(params: &SystemParameters, s: &State) -> f64 {
    let delta = s.theta1 - s.theta2;
    let v1_sq = params.l1.powi(2) * s.omega1.powi(2);
    let v2_sq = v1_sq
        + params.l2.powi(2) * s.omega2.powi(2)
        + 2.0 * params.l1 * params.l2 * s.omega1 * s.omega2 * delta.cos();
    0.5 * params.m1 * v1_sq + 0.5 * params.m2 * v2_sq
}

/// Potential energy of a state, zero at the pivot height.
pub fn potential_energy(params: &SystemParameters, s: &State) -> f64 {
    let y1 = -params.l1 * s.theta1.cos();
    let y2 = y1 - params.l2 * s.theta2.cos();
    params.m1 * params.g * y1 + params.m2 * params.g * y2
}

/// Total mechanical energy of a state.
pub fn total_energy(params: &SystemParameters, s: &State) -> f64 {
    kinetic_energy(params, s) + potential_energy(params, s)
}

/// Per-sample total energy with a drift summary, aligned index-for-index
/// with the trajectory it was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyReport {
    energies: Vec<f64>,
    reference: f64,
    max_drift: f64,
}

impl EnergyReport {
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Energy of the first sample.
    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Largest |E(t) - E(0)| over the run, relative to the initial energy.
    /// When E(0) is numerically zero (the upright-release configurations sit
    /// exactly at the potential zero), the deviation is scaled by the
    /// characteristic energy of the run instead.
    pub fn max_drift(&self) -> f64 {
        self.max_drift
    }

    pub fn exceeds(&self, threshold: f64) -> bool {
        self.max_drift > threshold
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }
}

/// Recomputes total energy at every sample and quantifies drift.
pub fn validate(trajectory: &Trajectory, params: &SystemParameters) -> EnergyReport {
    let energies: Vec<f64> = trajectory
        .states()
        .iter()
        .map(|s| total_energy(params, s))
        .collect();
    let reference = energies.first().copied().unwrap_or(0.0);

    let mut deviation = 0.0f64;
    for &e in &energies {
        deviation = deviation.max((e - reference).abs());
    }

    let scale = drift_scale(trajectory, params, reference);
    let max_drift = if scale > 0.0 { deviation / scale } else { 0.0 };

    EnergyReport {
        energies,
        reference,
        max_drift,
    }
}

/// Normalization for the drift ratio: |E(0)| when it is a meaningful scale,
/// otherwise the initial kinetic energy plus the full potential swing.
fn drift_scale(trajectory: &Trajectory, params: &SystemParameters, reference: f64) -> f64 {
    let characteristic = match trajectory.states().first() {
        Some(initial) => {
            kinetic_energy(params, initial)
                + (params.m1 + params.m2) * params.g * (params.l1 + params.l2)
        }
        None => 0.0,
    };
    reference.abs().max(characteristic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::derive;
    use crate::integrator::{integrate, IntegratorConfig, StepperKind};

    #[test]
    fn hanging_rest_energy_is_the_potential_minimum() {
        let params = SystemParameters::default();
        let rest = State::new(0.0, 0.0, 0.0, 0.0);
        let expected = -(params.m1 + params.m2) * params.g * params.l1
            - params.m2 * params.g * params.l2;
        assert!((total_energy(&params, &rest) - expected).abs() < 1e-12);
        assert_eq!(kinetic_energy(&params, &rest), 0.0);
    }

    #[test]
    fn report_is_aligned_with_the_trajectory() {
        let params = SystemParameters::default();
        let model = derive(&params).unwrap();
        let cfg = IntegratorConfig {
            duration: 1.0,
            samples: 50,
            substeps: 4,
            stepper: StepperKind::Rk4,
        };
        let traj = integrate(model.eom(), State::new(0.5, 0.0, 0.5, 0.0), &cfg).unwrap();
        let report = validate(&traj, &params);
        assert_eq!(report.len(), traj.len());
        assert!((report.reference() - report.energies()[0]).abs() < 1e-15);
    }

    #[test]
    fn short_run_conserves_energy_tightly() {
        let params = SystemParameters::default();
        let model = derive(&params).unwrap();
        let cfg = IntegratorConfig {
            duration: 2.0,
            samples: 200,
            substeps: 4,
            stepper: StepperKind::Rk4,
        };
        let traj = integrate(model.eom(), State::new(1.0, 0.0, 0.5, 0.0), &cfg).unwrap();
        let report = validate(&traj, &params);
        // Well under the 0.1% bound expected at this resolution.
        assert!(report.max_drift() < 1e-3, "drift {}", report.max_drift());
        assert!(!report.exceeds(1e-3));
    }

    #[test]
    fn chaotic_reference_scenario_stays_below_one_percent_drift() {
        // m1 = m2 = 1 kg, l1 = l2 = 1 m, g = 9.81, released from both links
        // horizontal: twenty seconds of full-energy chaos.
        let params = SystemParameters::default();
        let model = derive(&params).unwrap();
        let half_pi = std::f64::consts::FRAC_PI_2;
        let initial = State::new(half_pi, 0.0, half_pi, 0.0);
        let cfg = IntegratorConfig {
            duration: 20.0,
            samples: 2000,
            substeps: 4,
            stepper: StepperKind::Rk4,
        };
        let traj = integrate(model.eom(), initial, &cfg).unwrap();
        assert_eq!(traj.len(), cfg.samples);

        let report = validate(&traj, &params);
        assert!(report.max_drift() < 0.01, "drift {}", report.max_drift());

        // The release point sits exactly at the potential zero, so the
        // drift normalization must not have divided by ~0.
        assert!(report.reference().abs() < 1e-9);

        // Sanity check that the motion is not settling into a small cycle:
        // this release has enough energy that the far link flips over.
        let max_theta2 = traj
            .states()
            .iter()
            .map(|s| s.theta2.abs())
            .fold(0.0f64, f64::max);
        assert!(max_theta2 > std::f64::consts::PI);
    }

    #[test]
    fn zero_gravity_energy_is_purely_kinetic_and_conserved() {
        let params = SystemParameters::new(1.0, 1.0, 1.0, 1.0, 0.0).unwrap();
        let model = derive(&params).unwrap();
        let initial = State::new(0.3, 0.7, -0.2, -0.3);
        let cfg = IntegratorConfig {
            duration: 5.0,
            samples: 500,
            substeps: 4,
            stepper: StepperKind::Rk4,
        };
        let traj = integrate(model.eom(), initial, &cfg).unwrap();
        let report = validate(&traj, &params);

        assert!((report.reference() - kinetic_energy(&params, &initial)).abs() < 1e-12);
        for (state, energy) in traj.states().iter().zip(report.energies()) {
            assert_eq!(potential_energy(&params, state), 0.0);
            assert!((energy - report.reference()).abs() < 1e-9);
        }
        assert!(report.max_drift() < 1e-9);
    }

    #[test]
    fn empty_trajectory_reports_zero_drift() {
        let params = SystemParameters::default();
        let report = validate(&Trajectory::default(), &params);
        assert!(report.is_empty());
        assert_eq!(report.max_drift(), 0.0);
    }
}

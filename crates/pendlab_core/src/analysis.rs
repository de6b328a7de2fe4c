//! Linearized-mode and trajectory-divergence diagnostics.

use crate::params::SystemParameters;
use crate::trajectory::Trajectory;
use anyhow::{anyhow, bail, Result};
use nalgebra::{Matrix2, Vector4};

/// Small-angle normal-mode angular frequencies (rad/s) about the hanging
/// equilibrium, slow mode first.
///
/// Linearizing the dynamics gives M theta_dd = -K theta with the mass matrix
/// evaluated at theta = 0 and the gravitational stiffness on the diagonal;
/// the squared frequencies are the eigenvalues of M^-1 K.
pub fn normal_mode_frequencies(params: &SystemParameters) -> Result<(f64, f64)> {
    let m_sum = params.m1 + params.m2;
    let mass = Matrix2::new(
        m_sum * params.l1 * params.l1,
        params.m2 * params.l1 * params.l2,
        params.m2 * params.l1 * params.l2,
        params.m2 * params.l2 * params.l2,
    );
    let stiffness = Matrix2::new(
        m_sum * params.g * params.l1,
        0.0,
        0.0,
        params.m2 * params.g * params.l2,
    );

    let inverse = mass
        .try_inverse()
        .ok_or_else(|| anyhow!("mass matrix is not invertible at the equilibrium"))?;
    let eigen = (inverse * stiffness)
        .eigenvalues()
        .ok_or_else(|| anyhow!("linearized system has complex eigenvalues"))?;

    let (a, b) = (eigen[0], eigen[1]);
    if a < -1e-12 || b < -1e-12 {
        bail!("linearization produced a negative squared frequency");
    }
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Ok((lo.max(0.0).sqrt(), hi.max(0.0).sqrt()))
}

/// Phase-space distance between paired samples of two trajectories
/// integrated on the same time grid. This is the butterfly-effect
/// diagnostic: for a chaotic system the distance between two nearby initial
/// conditions grows roughly exponentially until it saturates.
pub fn separation(a: &Trajectory, b: &Trajectory) -> Result<Vec<f64>> {
    if a.len() != b.len() {
        bail!(
            "trajectories have different sample counts ({} vs {})",
            a.len(),
            b.len()
        );
    }
    Ok(a.states()
        .iter()
        .zip(b.states())
        .map(|(sa, sb)| (Vector4::from(sa.to_array()) - Vector4::from(sb.to_array())).norm())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::derive;
    use crate::integrator::{integrate, IntegratorConfig, StepperKind};
    use crate::trajectory::State;

    #[test]
    fn equal_links_give_the_textbook_mode_frequencies() {
        // For m1 = m2 = m and l1 = l2 = l the squared mode frequencies are
        // (g/l)(2 -/+ sqrt(2)).
        let params = SystemParameters::default();
        let (slow, fast) = normal_mode_frequencies(&params).unwrap();
        let expected_slow = (params.g / params.l1 * (2.0 - 2.0f64.sqrt())).sqrt();
        let expected_fast = (params.g / params.l1 * (2.0 + 2.0f64.sqrt())).sqrt();
        assert!((slow - expected_slow).abs() < 1e-9);
        assert!((fast - expected_fast).abs() < 1e-9);
    }

    #[test]
    fn zero_gravity_modes_are_degenerate_at_zero() {
        let params = SystemParameters::new(1.0, 1.0, 1.0, 1.0, 0.0).unwrap();
        let (slow, fast) = normal_mode_frequencies(&params).unwrap();
        assert_eq!(slow, 0.0);
        assert_eq!(fast, 0.0);
    }

    #[test]
    fn identical_trajectories_have_zero_separation() {
        let model = derive(&SystemParameters::default()).unwrap();
        let cfg = IntegratorConfig {
            duration: 1.0,
            samples: 20,
            substeps: 4,
            stepper: StepperKind::Rk4,
        };
        let traj = integrate(model.eom(), State::new(0.2, 0.0, 0.1, 0.0), &cfg).unwrap();
        let sep = separation(&traj, &traj).unwrap();
        assert_eq!(sep.len(), traj.len());
        assert!(sep.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn mismatched_grids_are_rejected() {
        let model = derive(&SystemParameters::default()).unwrap();
        let initial = State::new(0.2, 0.0, 0.1, 0.0);
        let mut cfg = IntegratorConfig {
            duration: 1.0,
            samples: 20,
            substeps: 4,
            stepper: StepperKind::Rk4,
        };
        let a = integrate(model.eom(), initial, &cfg).unwrap();
        cfg.samples = 30;
        let b = integrate(model.eom(), initial, &cfg).unwrap();
        assert!(separation(&a, &b).is_err());
    }

    #[test]
    fn nearby_chaotic_trajectories_diverge_superlinearly() {
        let params = SystemParameters::default();
        let model = derive(&params).unwrap();
        let half_pi = std::f64::consts::FRAC_PI_2;
        let epsilon = 1e-6;

        let base = State::new(half_pi, 0.0, half_pi, 0.0);
        let perturbed = State::new(half_pi + epsilon, 0.0, half_pi, 0.0);
        let cfg = IntegratorConfig {
            duration: 12.0,
            samples: 1200,
            substeps: 4,
            stepper: StepperKind::Rk4,
        };

        let a = integrate(model.eom(), base, &cfg).unwrap();
        let b = integrate(model.eom(), perturbed, &cfg).unwrap();
        let sep = separation(&a, &b).unwrap();

        assert!((sep[0] - epsilon).abs() < 1e-12);
        let max_sep = sep.iter().copied().fold(0.0f64, f64::max);
        // Orders of magnitude beyond linear growth over this span.
        assert!(
            max_sep > 1e3 * epsilon,
            "separation only reached {max_sep:e}"
        );
    }
}

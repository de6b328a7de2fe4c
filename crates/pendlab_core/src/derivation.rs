//! Lagrangian derivation of the equations of motion.
//!
//! The textbook pipeline, carried out symbolically: Cartesian kinematics
//! from the two joint angles, kinetic and potential energy, L = T - V, one
//! Euler-Lagrange residual per coordinate, then a closed-form 2x2 solve for
//! the angular accelerations. Kinetic energy is quadratic in the velocities,
//! so the residuals are always linear in the accelerations and Cramer's rule
//! gives the unique solution outright. The results are compiled to bytecode
//! once and reused, read-only, for as many integrations as the caller wants.

use crate::engine::{compile, Bytecode, EquationsOfMotion};
use crate::error::DerivationError;
use crate::params::SystemParameters;
use crate::symbolic::{num, sym, Expr, Sym};
use crate::trajectory::State;
use std::cell::RefCell;

/// Everything one derivation produces: the compiled equations of motion plus
/// the compiled total-energy expression built from the same kinematics.
pub struct DerivedModel {
    eom: EquationsOfMotion<f64>,
    energy: Bytecode,
    params: SystemParameters,
    scratch: RefCell<Vec<f64>>,
}

impl DerivedModel {
    pub fn eom(&self) -> &EquationsOfMotion<f64> {
        &self.eom
    }

    pub fn parameters(&self) -> &SystemParameters {
        &self.params
    }

    /// Total mechanical energy at a state, evaluated through the compiled
    /// symbolic expression. The validator recomputes energy from closed-form
    /// kinematics instead; the two paths cross-check each other.
    pub fn energy_at(&self, state: &State) -> f64 {
        let mut stack = self.scratch.borrow_mut();
        self.energy
            .eval(&state.to_array(), &self.params.to_array(), &mut stack)
    }
}

struct Lagrangian {
    /// T - V.
    l: Expr,
    /// T + V, kept for energy diagnostics.
    energy: Expr,
}

/// Builds the Lagrangian from the planar two-link kinematics, pivot at the
/// origin, y up, angles measured from the downward vertical.
fn build_lagrangian() -> Lagrangian {
    let theta1 = sym(Sym::Theta1);
    let theta2 = sym(Sym::Theta2);
    let (m1, m2) = (sym(Sym::M1), sym(Sym::M2));
    let (l1, l2) = (sym(Sym::L1), sym(Sym::L2));
    let g = sym(Sym::G);

    let x1 = l1.clone() * theta1.clone().sin();
    let y1 = -(l1 * theta1.cos());
    let x2 = x1.clone() + l2.clone() * theta2.clone().sin();
    let y2 = y1.clone() - l2 * theta2.cos();

    // Squared bob speeds via total time derivatives of the coordinates.
    let v1_sq = x1.dt().powi(2) + y1.dt().powi(2);
    let v2_sq = x2.dt().powi(2) + y2.dt().powi(2);

    let t = num(0.5) * m1.clone() * v1_sq + num(0.5) * m2.clone() * v2_sq;
    let v = m1 * g.clone() * y1 + m2 * g * y2;

    Lagrangian {
        l: (t.clone() - v.clone()).simplify(),
        energy: (t + v).simplify(),
    }
}

/// One Euler-Lagrange residual d/dt(dL/d omega) - dL/d theta.
fn residual(l: &Expr, theta: Sym, omega: Sym) -> Expr {
    (l.diff(omega).dt() - l.diff(theta)).simplify()
}

/// Splits a residual that is linear in (alpha1, alpha2) into its coefficient
/// row and the constant term moved to the right-hand side.
fn linear_in_accelerations(
    r: &Expr,
    coordinate: &'static str,
) -> Result<(Expr, Expr, Expr), DerivationError> {
    let a1 = r.diff(Sym::Alpha1).simplify();
    let a2 = r.diff(Sym::Alpha2).simplify();
    for coeff in [&a1, &a2] {
        if coeff.contains(Sym::Alpha1) || coeff.contains(Sym::Alpha2) {
            return Err(DerivationError::NonlinearResidual { coordinate });
        }
    }
    let zero = num(0.0);
    let b = (-r
        .substitute(Sym::Alpha1, &zero)
        .substitute(Sym::Alpha2, &zero))
    .simplify();
    Ok((a1, a2, b))
}

fn check_nonsingular(det: &Expr, params: &SystemParameters) -> Result<(), DerivationError> {
    if matches!(det, Expr::Const(v) if *v == 0.0) {
        return Err(DerivationError::SingularMassMatrix { det: 0.0 });
    }
    let p = params.to_array();
    // Any non-degenerate probe works; the determinant depends on the state
    // only through theta1 - theta2.
    let probe = [0.3, 0.1, -0.2, -0.4];
    let value = det.eval(&|s| lookup(s, &probe, &p));
    let scale = params.m2 * params.l1.powi(2) * params.l2.powi(2) * (params.m1 + params.m2);
    if !value.is_finite() || value.abs() <= scale * 1e-9 {
        return Err(DerivationError::SingularMassMatrix { det: value });
    }
    Ok(())
}

fn lookup(s: Sym, vars: &[f64; 4], params: &[f64; 5]) -> f64 {
    match s {
        Sym::Theta1 => vars[0],
        Sym::Omega1 => vars[1],
        Sym::Theta2 => vars[2],
        Sym::Omega2 => vars[3],
        // Accelerations are eliminated before any probe evaluation.
        Sym::Alpha1 | Sym::Alpha2 => 0.0,
        Sym::M1 => params[0],
        Sym::M2 => params[1],
        Sym::L1 => params[2],
        Sym::L2 => params[3],
        Sym::G => params[4],
    }
}

/// Derives, solves, and compiles the equations of motion for one parameter
/// set. Deterministic and side-effect free; runs once per simulation run.
pub fn derive(params: &SystemParameters) -> Result<DerivedModel, DerivationError> {
    let lagrangian = build_lagrangian();

    let r1 = residual(&lagrangian.l, Sym::Theta1, Sym::Omega1);
    let r2 = residual(&lagrangian.l, Sym::Theta2, Sym::Omega2);

    let (a11, a12, b1) = linear_in_accelerations(&r1, "theta1")?;
    let (a21, a22, b2) = linear_in_accelerations(&r2, "theta2")?;

    // Cramer's rule on the 2x2 acceleration system.
    let det = (a11.clone() * a22.clone() - a12.clone() * a21.clone()).simplify();
    check_nonsingular(&det, params)?;

    let alpha1 = ((b1.clone() * a22 - b2.clone() * a12) / det.clone()).simplify();
    let alpha2 = ((a11 * b2 - a21 * b1) / det).simplify();

    for (name, expr) in [("alpha1", &alpha1), ("alpha2", &alpha2)] {
        if expr.contains(Sym::Alpha1) || expr.contains(Sym::Alpha2) {
            return Err(DerivationError::UnresolvedAcceleration { expression: name });
        }
    }

    // dState/dt in [theta1, omega1, theta2, omega2] slot order: the
    // velocities pass through, the accelerations come from the solve.
    let derivatives = [
        compile(&sym(Sym::Omega1)),
        compile(&alpha1),
        compile(&sym(Sym::Omega2)),
        compile(&alpha2),
    ];

    Ok(DerivedModel {
        eom: EquationsOfMotion::new(derivatives, params.to_array()),
        energy: compile(&lagrangian.energy),
        params: *params,
        scratch: RefCell::new(Vec::with_capacity(64)),
    })
}

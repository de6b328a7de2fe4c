//! Expression trees for the Lagrangian derivation.
//!
//! A small symbolic algebra: just enough calculus (partial derivatives, total
//! time derivatives, substitution) to carry a Lagrangian through the
//! Euler-Lagrange equations, plus the simplifier that keeps intermediate
//! trees from swelling before they are compiled to bytecode.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// The closed symbol set of the derivation: generalized coordinates and
/// velocities, the intermediate acceleration unknowns, and the physical
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sym {
    Theta1,
    Omega1,
    Theta2,
    Omega2,
    Alpha1,
    Alpha2,
    M1,
    M2,
    L1,
    L2,
    G,
}

impl Sym {
    /// Total time derivative of the symbol, under the conventions
    /// d(theta)/dt = omega and d(omega)/dt = alpha. Parameters are constants.
    fn dot(self) -> Expr {
        match self {
            Sym::Theta1 => Expr::Sym(Sym::Omega1),
            Sym::Theta2 => Expr::Sym(Sym::Omega2),
            Sym::Omega1 => Expr::Sym(Sym::Alpha1),
            Sym::Omega2 => Expr::Sym(Sym::Alpha2),
            Sym::M1 | Sym::M2 | Sym::L1 | Sym::L2 | Sym::G => Expr::Const(0.0),
            // The Lagrangian is a function of coordinates and velocities
            // only, so accelerations are never differentiated in time.
            Sym::Alpha1 | Sym::Alpha2 => {
                panic!("time derivative of an acceleration symbol requested")
            }
        }
    }
}

/// Symbolic expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    Const(f64),
    Sym(Sym),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
    /// Integer power; the derivation only ever needs small exponents.
    Powi(Box<Expr>, i32),
}

/// Shorthand constructors used throughout the derivation.
pub fn sym(s: Sym) -> Expr {
    Expr::Sym(s)
}

pub fn num(v: f64) -> Expr {
    Expr::Const(v)
}

impl Expr {
    pub fn sin(self) -> Expr {
        Expr::Sin(Box::new(self))
    }

    pub fn cos(self) -> Expr {
        Expr::Cos(Box::new(self))
    }

    pub fn powi(self, n: i32) -> Expr {
        Expr::Powi(Box::new(self), n)
    }

    /// Partial derivative with respect to one symbol.
    pub fn diff(&self, s: Sym) -> Expr {
        match self {
            Expr::Const(_) => num(0.0),
            Expr::Sym(v) => num(if *v == s { 1.0 } else { 0.0 }),
            Expr::Add(a, b) => a.diff(s) + b.diff(s),
            Expr::Sub(a, b) => a.diff(s) - b.diff(s),
            Expr::Mul(a, b) => a.diff(s) * (**b).clone() + (**a).clone() * b.diff(s),
            Expr::Div(a, b) => {
                (a.diff(s) * (**b).clone() - (**a).clone() * b.diff(s))
                    / (**b).clone().powi(2)
            }
            Expr::Neg(a) => -a.diff(s),
            Expr::Sin(a) => (**a).clone().cos() * a.diff(s),
            Expr::Cos(a) => -((**a).clone().sin() * a.diff(s)),
            Expr::Powi(a, n) => num(*n as f64) * (**a).clone().powi(n - 1) * a.diff(s),
        }
    }

    /// Total derivative with respect to time, chain-ruled through every
    /// symbol the expression mentions.
    pub fn dt(&self) -> Expr {
        match self {
            Expr::Const(_) => num(0.0),
            Expr::Sym(v) => v.dot(),
            Expr::Add(a, b) => a.dt() + b.dt(),
            Expr::Sub(a, b) => a.dt() - b.dt(),
            Expr::Mul(a, b) => a.dt() * (**b).clone() + (**a).clone() * b.dt(),
            Expr::Div(a, b) => {
                (a.dt() * (**b).clone() - (**a).clone() * b.dt()) / (**b).clone().powi(2)
            }
            Expr::Neg(a) => -a.dt(),
            Expr::Sin(a) => (**a).clone().cos() * a.dt(),
            Expr::Cos(a) => -((**a).clone().sin() * a.dt()),
            Expr::Powi(a, n) => num(*n as f64) * (**a).clone().powi(n - 1) * a.dt(),
        }
    }

    /// Replaces every occurrence of `target` with `replacement`.
    pub fn substitute(&self, target: Sym, replacement: &Expr) -> Expr {
        let recurse = |e: &Expr| Box::new(e.substitute(target, replacement));
        match self {
            Expr::Const(v) => num(*v),
            Expr::Sym(v) => {
                if *v == target {
                    replacement.clone()
                } else {
                    sym(*v)
                }
            }
            Expr::Add(a, b) => Expr::Add(recurse(a), recurse(b)),
            Expr::Sub(a, b) => Expr::Sub(recurse(a), recurse(b)),
            Expr::Mul(a, b) => Expr::Mul(recurse(a), recurse(b)),
            Expr::Div(a, b) => Expr::Div(recurse(a), recurse(b)),
            Expr::Neg(a) => Expr::Neg(recurse(a)),
            Expr::Sin(a) => Expr::Sin(recurse(a)),
            Expr::Cos(a) => Expr::Cos(recurse(a)),
            Expr::Powi(a, n) => Expr::Powi(recurse(a), *n),
        }
    }

    /// Whether the expression mentions `target` anywhere.
    pub fn contains(&self, target: Sym) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Sym(v) => *v == target,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.contains(target) || b.contains(target)
            }
            Expr::Neg(a) | Expr::Sin(a) | Expr::Cos(a) => a.contains(target),
            Expr::Powi(a, _) => a.contains(target),
        }
    }

    /// Evaluates the tree against a symbol valuation. Used for probe checks
    /// during derivation and for reference values in tests; the hot path
    /// goes through compiled bytecode instead.
    pub fn eval(&self, value_of: &impl Fn(Sym) -> f64) -> f64 {
        match self {
            Expr::Const(v) => *v,
            Expr::Sym(s) => value_of(*s),
            Expr::Add(a, b) => a.eval(value_of) + b.eval(value_of),
            Expr::Sub(a, b) => a.eval(value_of) - b.eval(value_of),
            Expr::Mul(a, b) => a.eval(value_of) * b.eval(value_of),
            Expr::Div(a, b) => a.eval(value_of) / b.eval(value_of),
            Expr::Neg(a) => -a.eval(value_of),
            Expr::Sin(a) => a.eval(value_of).sin(),
            Expr::Cos(a) => a.eval(value_of).cos(),
            Expr::Powi(a, n) => a.eval(value_of).powi(*n),
        }
    }

    /// Bottom-up structural simplification: constant folding plus the
    /// additive and multiplicative identities. No trigonometric rewriting is
    /// attempted; the bytecode evaluator copes fine with the residual size.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Const(v) => num(*v),
            Expr::Sym(v) => sym(*v),
            Expr::Add(a, b) => match (a.simplify(), b.simplify()) {
                (Expr::Const(x), Expr::Const(y)) => num(x + y),
                (Expr::Const(x), rhs) if x == 0.0 => rhs,
                (lhs, Expr::Const(y)) if y == 0.0 => lhs,
                (lhs, rhs) => Expr::Add(Box::new(lhs), Box::new(rhs)),
            },
            Expr::Sub(a, b) => match (a.simplify(), b.simplify()) {
                (Expr::Const(x), Expr::Const(y)) => num(x - y),
                (lhs, Expr::Const(y)) if y == 0.0 => lhs,
                (Expr::Const(x), rhs) if x == 0.0 => Expr::Neg(Box::new(rhs)).simplify(),
                (lhs, rhs) => Expr::Sub(Box::new(lhs), Box::new(rhs)),
            },
            Expr::Mul(a, b) => match (a.simplify(), b.simplify()) {
                (Expr::Const(x), Expr::Const(y)) => num(x * y),
                (Expr::Const(x), _) | (_, Expr::Const(x)) if x == 0.0 => num(0.0),
                (Expr::Const(x), rhs) if x == 1.0 => rhs,
                (lhs, Expr::Const(y)) if y == 1.0 => lhs,
                (lhs, rhs) => Expr::Mul(Box::new(lhs), Box::new(rhs)),
            },
            Expr::Div(a, b) => match (a.simplify(), b.simplify()) {
                (Expr::Const(x), Expr::Const(y)) if y != 0.0 => num(x / y),
                (Expr::Const(x), _) if x == 0.0 => num(0.0),
                (lhs, Expr::Const(y)) if y == 1.0 => lhs,
                (lhs, rhs) => Expr::Div(Box::new(lhs), Box::new(rhs)),
            },
            Expr::Neg(a) => match a.simplify() {
                Expr::Const(v) => num(-v),
                Expr::Neg(inner) => *inner,
                inner => Expr::Neg(Box::new(inner)),
            },
            Expr::Sin(a) => match a.simplify() {
                Expr::Const(v) => num(v.sin()),
                inner => Expr::Sin(Box::new(inner)),
            },
            Expr::Cos(a) => match a.simplify() {
                Expr::Const(v) => num(v.cos()),
                inner => Expr::Cos(Box::new(inner)),
            },
            Expr::Powi(a, n) => match (a.simplify(), *n) {
                (Expr::Const(v), n) => num(v.powi(n)),
                (_, 0) => num(1.0),
                (inner, 1) => inner,
                (inner, n) => Expr::Powi(Box::new(inner), n),
            },
        }
    }

    /// Node count; a cheap proxy for expression size in logs and tests.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::Sym(_) => 1,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                1 + a.node_count() + b.node_count()
            }
            Expr::Neg(a) | Expr::Sin(a) | Expr::Cos(a) => 1 + a.node_count(),
            Expr::Powi(a, _) => 1 + a.node_count(),
        }
    }
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valuation(s: Sym) -> f64 {
        match s {
            Sym::Theta1 => 0.7,
            Sym::Omega1 => -0.4,
            Sym::Theta2 => -1.1,
            Sym::Omega2 => 0.9,
            Sym::Alpha1 => 0.25,
            Sym::Alpha2 => -0.65,
            Sym::M1 => 1.5,
            Sym::M2 => 0.5,
            Sym::L1 => 2.0,
            Sym::L2 => 0.75,
            Sym::G => 9.81,
        }
    }

    #[test]
    fn differentiates_a_squared_sine() {
        // d/d(theta1) sin(theta1)^2 = 2 sin(theta1) cos(theta1)
        let expr = sym(Sym::Theta1).sin().powi(2);
        let derivative = expr.diff(Sym::Theta1).simplify();
        let expected = 2.0 * 0.7f64.sin() * 0.7f64.cos();
        assert!((derivative.eval(&valuation) - expected).abs() < 1e-14);
    }

    #[test]
    fn quotient_rule_matches_numeric_derivative() {
        // f = sin(theta1) / (1 + omega1^2), differentiated in theta1.
        let f = sym(Sym::Theta1).sin() / (num(1.0) + sym(Sym::Omega1).powi(2));
        let derivative = f.diff(Sym::Theta1).simplify();
        let expected = 0.7f64.cos() / (1.0 + 0.4f64 * 0.4);
        assert!((derivative.eval(&valuation) - expected).abs() < 1e-14);
    }

    #[test]
    fn time_derivative_chains_through_the_state() {
        // d/dt sin(theta1) = cos(theta1) * omega1
        let expr = sym(Sym::Theta1).sin();
        let rate = expr.dt().simplify();
        let expected = 0.7f64.cos() * -0.4;
        assert!((rate.eval(&valuation) - expected).abs() < 1e-14);

        // d/dt omega2^2 = 2 omega2 alpha2
        let expr = sym(Sym::Omega2).powi(2);
        let rate = expr.dt().simplify();
        assert!((rate.eval(&valuation) - 2.0 * 0.9 * -0.65).abs() < 1e-14);
    }

    #[test]
    fn substitution_eliminates_a_symbol() {
        let expr = sym(Sym::Alpha1) * sym(Sym::M1) + sym(Sym::Alpha2);
        let zeroed = expr
            .substitute(Sym::Alpha1, &num(0.0))
            .substitute(Sym::Alpha2, &num(0.0))
            .simplify();
        assert!(!zeroed.contains(Sym::Alpha1));
        assert!(!zeroed.contains(Sym::Alpha2));
        assert_eq!(zeroed.eval(&valuation), 0.0);
    }

    #[test]
    fn simplification_collapses_identities() {
        let expr = (num(0.0) * sym(Sym::G) + num(1.0) * sym(Sym::Theta1)) - num(0.0);
        let simplified = expr.simplify();
        assert!(matches!(simplified, Expr::Sym(Sym::Theta1)));

        let folded = (num(2.0) + num(3.0)) * num(4.0);
        assert!(matches!(folded.simplify(), Expr::Const(v) if v == 20.0));
    }

    #[test]
    fn simplification_preserves_value() {
        let expr = sym(Sym::Theta1).sin().powi(2)
            + sym(Sym::Theta1).cos().powi(2) * (num(1.0) + num(0.0) * sym(Sym::L1));
        let simplified = expr.simplify();
        assert!(simplified.node_count() <= expr.node_count());
        assert!((simplified.eval(&valuation) - expr.eval(&valuation)).abs() < 1e-15);
    }
}

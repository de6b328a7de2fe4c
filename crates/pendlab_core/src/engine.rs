//! Compilation of derived expressions into a stack bytecode, and the
//! evaluator the integrator drives.
//!
//! The split matters for performance: the symbolic derivation runs once per
//! parameter set, while the resulting opcode sequences are evaluated many
//! thousands of times inside the solver loop without ever touching the
//! expression trees again.

use crate::symbolic::{Expr, Sym};
use crate::traits::{Scalar, VectorField};
use std::cell::RefCell;

/// Opcodes for the stack evaluator.
#[derive(Debug, Clone, Copy)]
pub enum OpCode {
    /// Pushes a literal value.
    Const(f64),
    /// Pushes a state-vector component ([theta1, omega1, theta2, omega2]
    /// slot order).
    Var(usize),
    /// Pushes a parameter ([m1, m2, l1, l2, g] slot order).
    Param(usize),
    /// Pops (b, a), pushes a + b.
    Add,
    /// Pops (b, a), pushes a - b.
    Sub,
    /// Pops (b, a), pushes a * b.
    Mul,
    /// Pops (b, a), pushes a / b.
    Div,
    /// Pops a, pushes -a.
    Neg,
    /// Pops a, pushes sin(a).
    Sin,
    /// Pops a, pushes cos(a).
    Cos,
    /// Pops a, pushes a^n.
    Powi(i32),
}

/// A compiled expression: a flat opcode sequence that leaves its value on
/// the stack.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    ops: Vec<OpCode>,
}

impl Bytecode {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Evaluates against a state vector and parameter vector, reusing
    /// `stack` as scratch space so the hot loop never allocates.
    pub fn eval<T: Scalar>(&self, vars: &[T], params: &[T], stack: &mut Vec<T>) -> T {
        stack.clear();
        for op in &self.ops {
            match op {
                OpCode::Const(v) => stack.push(T::from_f64(*v).unwrap()),
                OpCode::Var(i) => stack.push(vars[*i]),
                OpCode::Param(i) => stack.push(params[*i]),
                OpCode::Add => {
                    let b = stack.pop().unwrap();
                    let a = stack.pop().unwrap();
                    stack.push(a + b);
                }
                OpCode::Sub => {
                    let b = stack.pop().unwrap();
                    let a = stack.pop().unwrap();
                    stack.push(a - b);
                }
                OpCode::Mul => {
                    let b = stack.pop().unwrap();
                    let a = stack.pop().unwrap();
                    stack.push(a * b);
                }
                OpCode::Div => {
                    let b = stack.pop().unwrap();
                    let a = stack.pop().unwrap();
                    stack.push(a / b);
                }
                OpCode::Neg => {
                    let a = stack.pop().unwrap();
                    stack.push(-a);
                }
                OpCode::Sin => {
                    let a = stack.pop().unwrap();
                    stack.push(a.sin());
                }
                OpCode::Cos => {
                    let a = stack.pop().unwrap();
                    stack.push(a.cos());
                }
                OpCode::Powi(n) => {
                    let a = stack.pop().unwrap();
                    stack.push(a.powi(*n));
                }
            }
        }
        stack.pop().unwrap_or_else(|| T::from_f64(0.0).unwrap())
    }
}

/// Flattens an expression into bytecode (post-order emission).
///
/// Accelerations must already have been eliminated by the linear solve;
/// encountering one here is a derivation bug, not a user error.
pub fn compile(expr: &Expr) -> Bytecode {
    let mut ops = Vec::new();
    emit(expr, &mut ops);
    Bytecode { ops }
}

fn emit(expr: &Expr, ops: &mut Vec<OpCode>) {
    match expr {
        Expr::Const(v) => ops.push(OpCode::Const(*v)),
        Expr::Sym(s) => ops.push(slot(*s)),
        Expr::Add(a, b) => {
            emit(a, ops);
            emit(b, ops);
            ops.push(OpCode::Add);
        }
        Expr::Sub(a, b) => {
            emit(a, ops);
            emit(b, ops);
            ops.push(OpCode::Sub);
        }
        Expr::Mul(a, b) => {
            emit(a, ops);
            emit(b, ops);
            ops.push(OpCode::Mul);
        }
        Expr::Div(a, b) => {
            emit(a, ops);
            emit(b, ops);
            ops.push(OpCode::Div);
        }
        Expr::Neg(a) => {
            emit(a, ops);
            ops.push(OpCode::Neg);
        }
        Expr::Sin(a) => {
            emit(a, ops);
            ops.push(OpCode::Sin);
        }
        Expr::Cos(a) => {
            emit(a, ops);
            ops.push(OpCode::Cos);
        }
        Expr::Powi(a, n) => {
            emit(a, ops);
            ops.push(OpCode::Powi(*n));
        }
    }
}

fn slot(s: Sym) -> OpCode {
    match s {
        Sym::Theta1 => OpCode::Var(0),
        Sym::Omega1 => OpCode::Var(1),
        Sym::Theta2 => OpCode::Var(2),
        Sym::Omega2 => OpCode::Var(3),
        Sym::M1 => OpCode::Param(0),
        Sym::M2 => OpCode::Param(1),
        Sym::L1 => OpCode::Param(2),
        Sym::L2 => OpCode::Param(3),
        Sym::G => OpCode::Param(4),
        Sym::Alpha1 | Sym::Alpha2 => {
            panic!("unresolved acceleration symbol in compiled expression")
        }
    }
}

/// The compiled equations of motion: one opcode sequence per state
/// component, in [theta1, omega1, theta2, omega2] order, evaluated against a
/// fixed parameter vector.
///
/// The scratch stack lives behind a `RefCell` so evaluation stays
/// allocation-free, which makes the type !Sync. Batch studies that
/// parallelize over initial conditions should clone one instance per worker;
/// the clone is cheap next to a single integration.
#[derive(Debug, Clone)]
pub struct EquationsOfMotion<T: Scalar> {
    derivatives: [Bytecode; 4],
    params: [T; 5],
    stack: RefCell<Vec<T>>,
}

impl<T: Scalar> EquationsOfMotion<T> {
    pub(crate) fn new(derivatives: [Bytecode; 4], params: [f64; 5]) -> Self {
        Self {
            derivatives,
            params: params.map(|v| T::from_f64(v).unwrap()),
            stack: RefCell::new(Vec::with_capacity(64)),
        }
    }

    /// Total opcode count across the four component expressions.
    pub fn op_count(&self) -> usize {
        self.derivatives.iter().map(Bytecode::len).sum()
    }
}

impl<T: Scalar> VectorField<T> for EquationsOfMotion<T> {
    fn dimension(&self) -> usize {
        4
    }

    fn eval(&self, _t: T, y: &[T], dydt: &mut [T]) {
        let mut stack = self.stack.borrow_mut();
        for (i, code) in self.derivatives.iter().enumerate() {
            dydt[i] = code.eval(y, &self.params, &mut stack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{num, sym};

    const VARS: [f64; 4] = [0.3, -0.8, 1.2, 0.5];
    const PARAMS: [f64; 5] = [1.0, 2.0, 0.5, 0.75, 9.81];

    fn run(expr: &Expr) -> f64 {
        let mut stack = Vec::new();
        compile(expr).eval(&VARS, &PARAMS, &mut stack)
    }

    #[test]
    fn compiles_arithmetic_and_trig() {
        let expr = sym(Sym::M2) * sym(Sym::Theta1).sin() + num(1.5);
        assert!((run(&expr) - (2.0 * 0.3f64.sin() + 1.5)).abs() < 1e-15);

        let expr = -(sym(Sym::Omega1).powi(2) / sym(Sym::L1));
        assert!((run(&expr) - -(0.64 / 0.5)).abs() < 1e-15);
    }

    #[test]
    fn slot_order_matches_state_and_parameter_layout() {
        assert_eq!(run(&sym(Sym::Theta1)), VARS[0]);
        assert_eq!(run(&sym(Sym::Omega1)), VARS[1]);
        assert_eq!(run(&sym(Sym::Theta2)), VARS[2]);
        assert_eq!(run(&sym(Sym::Omega2)), VARS[3]);
        assert_eq!(run(&sym(Sym::G)), PARAMS[4]);
    }

    #[test]
    fn compiled_code_agrees_with_tree_evaluation() {
        let expr = (sym(Sym::Theta1) - sym(Sym::Theta2)).cos() * sym(Sym::Omega2)
            + sym(Sym::L2) * sym(Sym::Omega1).powi(2);
        let tree = expr.eval(&|s| match slot(s) {
            OpCode::Var(i) => VARS[i],
            OpCode::Param(i) => PARAMS[i],
            _ => unreachable!(),
        });
        assert!((run(&expr) - tree).abs() < 1e-15);
    }

    #[test]
    fn equations_of_motion_evaluate_all_components() {
        let derivatives = [
            compile(&sym(Sym::Omega1)),
            compile(&num(2.0)),
            compile(&sym(Sym::Omega2)),
            compile(&(sym(Sym::G) * num(-1.0))),
        ];
        let eom: EquationsOfMotion<f64> = EquationsOfMotion::new(derivatives, PARAMS);
        assert_eq!(eom.dimension(), 4);
        assert!(eom.op_count() > 0);

        let mut dydt = [0.0; 4];
        eom.eval(0.0, &VARS, &mut dydt);
        assert_eq!(dydt, [-0.8, 2.0, 0.5, -9.81]);
    }
}

use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// Numeric type the solver layer operates on. `f64` everywhere in practice,
/// but the steppers only need float arithmetic, so they stay generic.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Right-hand side of a first-order ODE system dy/dt = f(t, y).
pub trait VectorField<T: Scalar> {
    /// Dimension of the state vector.
    fn dimension(&self) -> usize;

    /// Evaluates the field at (t, y) into `dydt`.
    fn eval(&self, t: T, y: &[T], dydt: &mut [T]);
}

/// A fixed-step solver advancing a system by one step.
pub trait Stepper<T: Scalar> {
    /// Advances `state` (and `t`) by a single step of size `dt`.
    fn step(&mut self, field: &impl VectorField<T>, t: &mut T, state: &mut [T], dt: T);
}

//! Fixed-step explicit Runge-Kutta steppers.

use crate::traits::{Scalar, Stepper, VectorField};

/// Classic fourth-order Runge-Kutta.
pub struct Rk4<T: Scalar> {
    k: [Vec<T>; 4],
    tmp: Vec<T>,
}

impl<T: Scalar> Rk4<T> {
    pub fn new(dim: usize) -> Self {
        let zero = T::from_f64(0.0).unwrap();
        Self {
            k: [
                vec![zero; dim],
                vec![zero; dim],
                vec![zero; dim],
                vec![zero; dim],
            ],
            tmp: vec![zero; dim],
        }
    }
}

impl<T: Scalar> Stepper<T> for Rk4<T> {
    fn step(&mut self, field: &impl VectorField<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let third = T::from_f64(1.0 / 3.0).unwrap();
        let t0 = *t;

        field.eval(t0, state, &mut self.k[0]);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * half * self.k[0][i];
        }
        field.eval(t0 + dt * half, &self.tmp, &mut self.k[1]);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * half * self.k[1][i];
        }
        field.eval(t0 + dt * half, &self.tmp, &mut self.k[2]);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k[2][i];
        }
        field.eval(t0 + dt, &self.tmp, &mut self.k[3]);

        for i in 0..state.len() {
            state[i] = state[i]
                + dt * (sixth * (self.k[0][i] + self.k[3][i])
                    + third * (self.k[1][i] + self.k[2][i]));
        }

        *t = t0 + dt;
    }
}

// Tsitouras 5(4) tableau; only the fifth-order update is used here since the
// step size is fixed by the caller.
const TSIT5_C: [f64; 5] = [0.161, 0.327, 0.9, 0.9800255409045097, 1.0];
const TSIT5_A: [[f64; 5]; 5] = [
    [0.161, 0.0, 0.0, 0.0, 0.0],
    [-0.008480655492356989, 0.335480655492357, 0.0, 0.0, 0.0],
    [2.898, -6.359447987781783, 4.361447987781783, 0.0, 0.0],
    [
        5.325864858437957,
        -11.748883564062828,
        7.495539342889693,
        -0.09249506636030195,
        0.0,
    ],
    [
        5.86145544294642,
        -12.92096931784711,
        8.159367898576159,
        -0.071584973281401,
        -0.02826857949054663,
    ],
];
const TSIT5_B: [f64; 6] = [
    0.09646076681806523,
    0.01,
    0.4798896504144996,
    1.379008574103742,
    -3.290069515436099,
    2.324710524099774,
];

/// Tsitouras 5th-order Runge-Kutta.
pub struct Tsit5<T: Scalar> {
    k: [Vec<T>; 6],
    tmp: Vec<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        let zero = T::from_f64(0.0).unwrap();
        Self {
            k: [
                vec![zero; dim],
                vec![zero; dim],
                vec![zero; dim],
                vec![zero; dim],
                vec![zero; dim],
                vec![zero; dim],
            ],
            tmp: vec![zero; dim],
        }
    }
}

impl<T: Scalar> Stepper<T> for Tsit5<T> {
    fn step(&mut self, field: &impl VectorField<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;

        field.eval(t0, state, &mut self.k[0]);

        for stage in 0..5 {
            for i in 0..state.len() {
                let mut acc = T::from_f64(0.0).unwrap();
                for j in 0..=stage {
                    acc = acc + T::from_f64(TSIT5_A[stage][j]).unwrap() * self.k[j][i];
                }
                self.tmp[i] = state[i] + dt * acc;
            }
            let tc = t0 + dt * T::from_f64(TSIT5_C[stage]).unwrap();
            field.eval(tc, &self.tmp, &mut self.k[stage + 1]);
        }

        for i in 0..state.len() {
            let mut acc = T::from_f64(0.0).unwrap();
            for (j, b) in TSIT5_B.iter().enumerate() {
                acc = acc + T::from_f64(*b).unwrap() * self.k[j][i];
            }
            state[i] = state[i] + dt * acc;
        }

        *t = t0 + dt;
    }
}

use serde::{Deserialize, Serialize};

/// A point in phase space: link angles (radians, measured from the downward
/// vertical) and angular velocities. Angles are never wrapped to a canonical
/// range, so trajectories stay continuous for phase-space work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub theta1: f64,
    pub omega1: f64,
    pub theta2: f64,
    pub omega2: f64,
}

impl State {
    pub fn new(theta1: f64, omega1: f64, theta2: f64, omega2: f64) -> Self {
        Self {
            theta1,
            omega1,
            theta2,
            omega2,
        }
    }

    /// Solver state vector, ordered [theta1, omega1, theta2, omega2].
    pub fn to_array(&self) -> [f64; 4] {
        [self.theta1, self.omega1, self.theta2, self.omega2]
    }

    pub fn from_array(y: [f64; 4]) -> Self {
        Self {
            theta1: y[0],
            omega1: y[1],
            theta2: y[2],
            omega2: y[3],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Time-ordered sequence of sampled states. Append-only while the integrator
/// runs; read-only for every consumer afterward.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<State>,
}

impl Trajectory {
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            times: Vec::with_capacity(samples),
            states: Vec::with_capacity(samples),
        }
    }

    pub(crate) fn push(&mut self, t: f64, state: State) {
        self.times.push(t);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn last(&self) -> Option<(f64, State)> {
        Some((*self.times.last()?, *self.states.last()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, State)> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.states.iter().copied())
    }
}

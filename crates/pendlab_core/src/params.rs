use crate::error::ConfigError;
use crate::trajectory::State;
use serde::{Deserialize, Serialize};

/// Physical constants of the two-link pendulum: bob masses, link lengths,
/// and gravitational acceleration. Immutable once constructed; shared
/// read-only by derivation, integration, and validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemParameters {
    pub m1: f64,
    pub m2: f64,
    pub l1: f64,
    pub l2: f64,
    pub g: f64,
}

impl SystemParameters {
    /// Validates and builds the parameter record. Masses and lengths must be
    /// strictly positive; gravity may be zero (free rotation) but not
    /// negative.
    pub fn new(m1: f64, m2: f64, l1: f64, l2: f64, g: f64) -> Result<Self, ConfigError> {
        for (name, value) in [("m1", m1), ("m2", m2), ("l1", l1), ("l2", l2)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name, value });
            }
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if !g.is_finite() {
            return Err(ConfigError::NonFinite { name: "g", value: g });
        }
        if g < 0.0 {
            return Err(ConfigError::NegativeGravity { value: g });
        }
        Ok(Self { m1, m2, l1, l2, g })
    }

    /// Parameter vector in the slot order the compiled bytecode expects.
    pub fn to_array(&self) -> [f64; 5] {
        [self.m1, self.m2, self.l1, self.l2, self.g]
    }

    /// Cartesian bob positions for a state, pivot at the origin, y up.
    pub fn bob_positions(&self, state: &State) -> [(f64, f64); 2] {
        let x1 = self.l1 * state.theta1.sin();
        let y1 = -self.l1 * state.theta1.cos();
        let x2 = x1 + self.l2 * state.theta2.sin();
        let y2 = y1 - self.l2 * state.theta2.cos();
        [(x1, y1), (x2, y2)]
    }
}

impl Default for SystemParameters {
    /// Unit masses and lengths under standard gravity.
    fn default() -> Self {
        Self {
            m1: 1.0,
            m2: 1.0,
            l1: 1.0,
            l2: 1.0,
            g: 9.81,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_valid() {
        let p = SystemParameters::default();
        assert!(SystemParameters::new(p.m1, p.m2, p.l1, p.l2, p.g).is_ok());
    }

    #[test]
    fn rejects_non_positive_mass_and_length() {
        assert!(matches!(
            SystemParameters::new(0.0, 1.0, 1.0, 1.0, 9.81),
            Err(ConfigError::NonPositive { name: "m1", .. })
        ));
        assert!(matches!(
            SystemParameters::new(1.0, 1.0, 1.0, -0.5, 9.81),
            Err(ConfigError::NonPositive { name: "l2", .. })
        ));
    }

    #[test]
    fn rejects_negative_gravity_but_allows_zero() {
        assert!(matches!(
            SystemParameters::new(1.0, 1.0, 1.0, 1.0, -9.81),
            Err(ConfigError::NegativeGravity { .. })
        ));
        assert!(SystemParameters::new(1.0, 1.0, 1.0, 1.0, 0.0).is_ok());
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(matches!(
            SystemParameters::new(f64::NAN, 1.0, 1.0, 1.0, 9.81),
            Err(ConfigError::NonFinite { name: "m1", .. })
        ));
        assert!(SystemParameters::new(1.0, 1.0, 1.0, 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn rest_state_hangs_straight_down() {
        let p = SystemParameters::default();
        let [(x1, y1), (x2, y2)] = p.bob_positions(&State::new(0.0, 0.0, 0.0, 0.0));
        assert!(x1.abs() < 1e-15 && x2.abs() < 1e-15);
        assert!((y1 + p.l1).abs() < 1e-15);
        assert!((y2 + p.l1 + p.l2).abs() < 1e-15);
    }
}

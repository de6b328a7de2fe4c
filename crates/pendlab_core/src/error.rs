use crate::trajectory::Trajectory;
use thiserror::Error;

/// Rejections raised while constructing parameters or run configuration.
/// These fail fast: no physically meaningful system can be built from them,
/// so nothing downstream (derivation included) ever runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be strictly positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("gravity must be non-negative, got {value}")]
    NegativeGravity { value: f64 },

    #[error("duration must be strictly positive, got {value}")]
    NonPositiveDuration { value: f64 },

    #[error("at least two samples are required, got {samples}")]
    TooFewSamples { samples: usize },

    #[error("substeps must be at least 1")]
    ZeroSubsteps,
}

/// Failures of the symbolic solve for the angular accelerations.
///
/// None of these can occur for validated parameters; hitting one means the
/// derivation itself is internally inconsistent, so callers should treat
/// every variant as fatal rather than retrying.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DerivationError {
    #[error("Euler-Lagrange residual for {coordinate} is not linear in the accelerations")]
    NonlinearResidual { coordinate: &'static str },

    #[error("acceleration symbol survived elimination in the {expression} expression")]
    UnresolvedAcceleration { expression: &'static str },

    #[error("mass matrix is singular (determinant {det:.3e} at the probe state)")]
    SingularMassMatrix { det: f64 },
}

/// Integration failure. `NonFiniteState` carries the partial trajectory up to
/// the last finite sample so the caller can decide whether truncated data is
/// still useful.
#[derive(Debug, Error, Clone)]
pub enum IntegrationError {
    #[error("invalid integrator configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("state became non-finite at t = {time:.6} (sample {sample}); trajectory truncated")]
    NonFiniteState {
        time: f64,
        sample: usize,
        partial: Trajectory,
    },
}

//! Sinkhorn balancing with deterministic annealing
//!
//! The inner loop alternates log-space row and column normalization at a
//! fixed temperature, relaxing an arbitrary score matrix toward a doubly
//! stochastic one. The outer loop re-runs the inner loop while geometrically
//! lowering the temperature, sharpening the relaxation toward a hard
//! permutation matrix.
//!
//! If the iteration count is too large or tau too small, gradients through
//! the layer vanish and downstream training NaNs out. That degradation is
//! silent: the solver raises no runtime errors, and callers are expected to
//! inspect outputs (see [`crate::layers::has_degraded`]). Misconfiguration
//! (non-positive tau, zero rounds) is rejected eagerly at construction.

use serde::{Deserialize, Serialize};

use super::log_norm::normalize_axis;
use crate::tensor::{BatchMatrix, NormAxis};
use crate::{PermMLError, Result};

/// Default temperature.
pub const DEFAULT_TAU: f32 = 0.01;
/// Default number of row/column balancing passes.
pub const DEFAULT_ITERATIONS: usize = 5;
/// Default floor added after exponentiation so downstream `log` stays finite.
pub const DEFAULT_EPS: f32 = 1e-6;

/// Configuration of one Sinkhorn balancing pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SinkhornConfig {
    /// Temperature; smaller values sharpen toward a hard permutation but
    /// must stay bounded away from zero or gradients destabilize
    pub tau: f32,
    /// Number of alternating row/column normalization passes
    pub iterations: usize,
    /// Additive floor applied after exponentiation
    pub eps: f32,
}

impl SinkhornConfig {
    /// Build a validated configuration with the default epsilon floor.
    pub fn new(tau: f32, iterations: usize) -> Result<Self> {
        let cfg = SinkhornConfig {
            tau,
            iterations,
            eps: DEFAULT_EPS,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the hyperparameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.tau > 0.0 && self.tau.is_finite()) {
            return Err(PermMLError::InvalidConfig(format!(
                "tau must be positive and finite, got {}",
                self.tau
            )));
        }
        if !(self.eps >= 0.0 && self.eps.is_finite()) {
            return Err(PermMLError::InvalidConfig(format!(
                "eps must be non-negative and finite, got {}",
                self.eps
            )));
        }
        Ok(())
    }
}

impl Default for SinkhornConfig {
    fn default() -> Self {
        SinkhornConfig {
            tau: DEFAULT_TAU,
            iterations: DEFAULT_ITERATIONS,
            eps: DEFAULT_EPS,
        }
    }
}

/// Whether each annealing round mixes the original input back in.
///
/// The residual variant was explored for warm-starting the next Sinkhorn
/// pass and is currently disabled by default; it is kept as an explicit
/// strategy choice rather than removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum SkipConnection {
    /// Each round's output feeds the next round unchanged
    #[default]
    Disabled,
    /// Add `weight * original_input` to the output of every non-final round
    Residual {
        /// Mixing weight for the original input
        weight: f32,
    },
}

/// Configuration of the deterministic-annealing outer loop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnealingConfig {
    /// Temperature of the first round
    pub initial_tau: f32,
    /// Multiplicative temperature decay applied between rounds, in (0, 1]
    pub decay_rate: f32,
    /// Number of annealing rounds
    pub rounds: usize,
    /// Sinkhorn iterations per round
    pub sinkhorn_iterations: usize,
    /// Additive floor applied after each round's exponentiation
    pub eps: f32,
    /// Skip-connection strategy between rounds
    pub skip: SkipConnection,
}

impl AnnealingConfig {
    /// Build a validated configuration with defaults for eps and skip.
    pub fn new(
        initial_tau: f32,
        decay_rate: f32,
        rounds: usize,
        sinkhorn_iterations: usize,
    ) -> Result<Self> {
        let cfg = AnnealingConfig {
            initial_tau,
            decay_rate,
            rounds,
            sinkhorn_iterations,
            eps: DEFAULT_EPS,
            skip: SkipConnection::Disabled,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the hyperparameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_tau > 0.0 && self.initial_tau.is_finite()) {
            return Err(PermMLError::InvalidConfig(format!(
                "initial_tau must be positive and finite, got {}",
                self.initial_tau
            )));
        }
        if !(self.decay_rate > 0.0 && self.decay_rate <= 1.0) {
            return Err(PermMLError::InvalidConfig(format!(
                "decay_rate must lie in (0, 1], got {}",
                self.decay_rate
            )));
        }
        if self.rounds == 0 {
            return Err(PermMLError::InvalidConfig(
                "rounds must be at least 1".to_string(),
            ));
        }
        if let SkipConnection::Residual { weight } = self.skip {
            if !weight.is_finite() {
                return Err(PermMLError::InvalidConfig(format!(
                    "skip-connection weight must be finite, got {}",
                    weight
                )));
            }
        }
        Ok(())
    }

    /// The per-round Sinkhorn configuration at temperature `tau`.
    fn inner(&self, tau: f32) -> SinkhornConfig {
        SinkhornConfig {
            tau,
            iterations: self.sinkhorn_iterations,
            eps: self.eps,
        }
    }
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            initial_tau: 1.0,
            decay_rate: 0.75,
            rounds: 4,
            sinkhorn_iterations: DEFAULT_ITERATIONS,
            eps: DEFAULT_EPS,
            skip: SkipConnection::Disabled,
        }
    }
}

/// One Sinkhorn balancing pass over a batch of score matrices.
///
/// Divides by `tau`, alternates row and column log-normalization
/// `iterations` times, exponentiates, and adds the `eps` floor. With
/// `iterations == 0` this is exactly `exp(x / tau) + eps`.
///
/// The output is non-negative with every row and column summing to
/// approximately `1 + eps * N`; callers needing exact doubly-stochastic
/// behavior must account for that additive bias.
pub fn sinkhorn(x: BatchMatrix, cfg: &SinkhornConfig) -> BatchMatrix {
    let mut x = x.div_scalar(cfg.tau);
    for _ in 0..cfg.iterations {
        x = normalize_axis(x, NormAxis::Rows);
        x = normalize_axis(x, NormAxis::Columns);
    }
    x.exp().add_scalar(cfg.eps)
}

/// Deterministic annealing: repeated Sinkhorn passes at a geometrically
/// decaying temperature.
///
/// Each round's output feeds the next round; the temperature is multiplied
/// by `decay_rate` between rounds (not after the last). With `rounds == 1`
/// this is a single [`sinkhorn`] call at `initial_tau`. The result
/// approximates a permutation matrix increasingly closely as the
/// temperature shrinks, at the cost of increasing gradient sharpness.
pub fn anneal(x: BatchMatrix, cfg: &AnnealingConfig) -> BatchMatrix {
    let original = match cfg.skip {
        SkipConnection::Residual { .. } => Some(x.clone()),
        SkipConnection::Disabled => None,
    };
    let mut tau = cfg.initial_tau;
    let mut q = x;
    for round in 0..cfg.rounds {
        q = sinkhorn(q, &cfg.inner(tau));
        if round + 1 < cfg.rounds {
            tau *= cfg.decay_rate;
            if let (SkipConnection::Residual { weight }, Some(orig)) = (cfg.skip, &original) {
                q = q.add_scaled(orig, weight);
            }
        }
    }
    q
}

//! Per-day portfolio optimizer.
//!
//! ```text
//! minimize    mu * w'Sigma w - alpha'w
//! subject to  beta'w = 0
//!             gamma <= w <= delta
//! ```

use nalgebra::DVector;

use crate::domain::constraints::BoundsPair;
use crate::domain::error::StatArbError;
use crate::domain::qp::{QuadraticProgram, SolveStatus, SolverSettings};
use crate::domain::risk::RiskModel;

pub const DEFAULT_RISK_AVERSION: f64 = 1.0;

impl SolveStatus {
    /// Maps a non-optimal outcome to its typed error.
    pub fn into_result(self) -> Result<DVector<f64>, StatArbError> {
        match self {
            SolveStatus::Optimal(w) => Ok(w),
            SolveStatus::Infeasible => Err(StatArbError::InfeasibleOptimization),
            SolveStatus::Unbounded => Err(StatArbError::UnboundedOptimization),
            SolveStatus::NumericalError { reason } => {
                Err(StatArbError::SolverNumericalError { reason })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioOptimizer {
    pub risk_aversion: f64,
    pub settings: SolverSettings,
}

impl PortfolioOptimizer {
    pub fn new(risk_aversion: f64, settings: SolverSettings) -> Self {
        Self {
            risk_aversion,
            settings,
        }
    }

    pub fn program(
        &self,
        alpha: &DVector<f64>,
        risk: &RiskModel,
        bounds: &BoundsPair,
    ) -> Result<QuadraticProgram, StatArbError> {
        let n = risk.n_assets();
        if alpha.len() != n || bounds.len() != n {
            return Err(StatArbError::misaligned(format!(
                "optimizer inputs disagree on size: alpha {}, risk model {}, bounds {}",
                alpha.len(),
                n,
                bounds.len()
            )));
        }
        Ok(QuadraticProgram {
            hessian: &risk.sigma * (2.0 * self.risk_aversion),
            linear: -alpha,
            equality: risk.beta.clone(),
            equality_rhs: 0.0,
            lower: bounds.gamma.clone(),
            upper: bounds.delta.clone(),
        })
    }

    pub fn solve(
        &self,
        alpha: &DVector<f64>,
        risk: &RiskModel,
        bounds: &BoundsPair,
    ) -> Result<SolveStatus, StatArbError> {
        Ok(self.program(alpha, risk, bounds)?.solve(&self.settings))
    }
}

impl Default for PortfolioOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_RISK_AVERSION, SolverSettings::default())
    }
}

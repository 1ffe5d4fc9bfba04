//! Static risk model: market beta, shrinkage covariance and transaction cost.
//!
//! Estimated once from the full return history before the rebalancing loop
//! starts and read-only afterwards.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::{debug, info};

use crate::domain::error::StatArbError;
use crate::domain::market_data::PanelMatrix;

pub const DEFAULT_TRANSACTION_COST_BPS: f64 = 2.0;

/// Uniform per-asset transaction cost rate (tau).
///
/// The optimizer objective does not use it. It only feeds the estimated
/// trading cost reported next to the P&L.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionCostModel {
    pub rate_bps: f64,
}

impl TransactionCostModel {
    pub fn new(rate_bps: f64) -> Self {
        Self { rate_bps }
    }

    pub fn rates(&self, n_assets: usize) -> DVector<f64> {
        DVector::from_element(n_assets, self.rate_bps * 1e-4)
    }
}

impl Default for TransactionCostModel {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSACTION_COST_BPS)
    }
}

#[derive(Debug, Clone)]
pub struct RiskModel {
    pub beta: DVector<f64>,
    pub sigma: DMatrix<f64>,
    pub tau: DVector<f64>,
    /// Ledoit-Wolf shrinkage intensity used for `sigma`.
    pub shrinkage: f64,
}

impl RiskModel {
    pub fn estimate(
        returns: &PanelMatrix,
        costs: &TransactionCostModel,
    ) -> Result<Self, StatArbError> {
        let beta = estimate_beta(returns)?;
        let (sigma, shrinkage) = estimate_sigma(returns.values())?;
        let tau = costs.rates(returns.n_assets());
        info!(
            "risk model estimated: {} assets, {} return periods, shrinkage {:.4}",
            returns.n_assets(),
            returns.n_dates(),
            shrinkage
        );
        Ok(Self {
            beta,
            sigma,
            tau,
            shrinkage,
        })
    }

    pub fn n_assets(&self) -> usize {
        self.beta.len()
    }
}

/// Slope of each asset's returns regressed on the equal-weighted market return.
pub fn estimate_beta(returns: &PanelMatrix) -> Result<DVector<f64>, StatArbError> {
    let values = returns.values();
    if values.nrows() < 2 {
        return Err(StatArbError::InsufficientHistory {
            context: "beta regression".into(),
            available: values.nrows(),
            required: 2,
        });
    }

    let market: Vec<f64> = values.row_iter().map(|r| r.mean()).collect();
    let mut beta = DVector::zeros(values.ncols());
    for j in 0..values.ncols() {
        let asset: Vec<f64> = values.column(j).iter().copied().collect();
        let (slope, _intercept): (f64, f64) = linreg::linear_regression(&market, &asset)
            .map_err(|e| {
                StatArbError::numerical(format!(
                    "beta regression failed for {}: {:?}",
                    returns.assets()[j],
                    e
                ))
            })?;
        if !slope.is_finite() {
            return Err(StatArbError::numerical(format!(
                "beta for {} is not finite",
                returns.assets()[j]
            )));
        }
        beta[j] = slope;
    }
    debug!("beta estimated: {:?}", beta.as_slice());
    Ok(beta)
}

/// Ledoit-Wolf covariance of a `T x N` return matrix, verified positive definite.
///
/// Returns the covariance and the shrinkage intensity.
pub fn estimate_sigma(returns: &DMatrix<f64>) -> Result<(DMatrix<f64>, f64), StatArbError> {
    let (t, n) = returns.shape();
    if n == 0 {
        return Err(StatArbError::numerical("covariance of an empty universe"));
    }
    if t < n + 1 {
        return Err(StatArbError::numerical(format!(
            "covariance of {} assets needs at least {} return periods, got {}",
            n,
            n + 1,
            t
        )));
    }

    if let Some(j) = (0..n).find(|&j| returns.column(j).max() <= returns.column(j).min()) {
        return Err(StatArbError::numerical(format!(
            "asset column {} has zero return variance",
            j
        )));
    }

    let (sigma, shrinkage) = ledoit_wolf(returns);

    let eigen = SymmetricEigen::new(sigma.clone());
    let min_eigenvalue = eigen.eigenvalues.min();
    if !min_eigenvalue.is_finite() || min_eigenvalue <= 0.0 {
        return Err(StatArbError::numerical(format!(
            "covariance is not positive definite (min eigenvalue {:e})",
            min_eigenvalue
        )));
    }
    debug!("covariance min eigenvalue {:e}", min_eigenvalue);

    Ok((sigma, shrinkage))
}

/// Shrinks the maximum-likelihood covariance toward `mu * I`, `mu` being the
/// average variance, with the Ledoit-Wolf optimal intensity.
pub fn ledoit_wolf(returns: &DMatrix<f64>) -> (DMatrix<f64>, f64) {
    let (t, n) = returns.shape();
    let nf = n as f64;
    let tf = t as f64;

    let means = returns.row_mean();
    let x = DMatrix::from_fn(t, n, |i, j| returns[(i, j)] - means[j]);

    let xtx = x.transpose() * &x;
    let emp_cov = &xtx / tf;
    let trace = emp_cov.trace();
    let mu = trace / nf;

    let x2 = x.map(|v| v * v);
    // sum over (X2' X2) == sum_t (sum_i x_ti^2)^2
    let beta_sum: f64 = x2.row_iter().map(|r| r.sum().powi(2)).sum();
    let delta_sum = xtx.iter().map(|v| v * v).sum::<f64>() / (tf * tf);

    let beta = (beta_sum / tf - delta_sum) / (nf * tf);
    let delta = (delta_sum - 2.0 * mu * trace + nf * mu * mu) / nf;
    let beta = beta.min(delta);
    let shrinkage = if beta <= 0.0 || delta <= 0.0 {
        0.0
    } else {
        beta / delta
    };

    let mut sigma = emp_cov * (1.0 - shrinkage);
    for i in 0..n {
        sigma[(i, i)] += shrinkage * mu;
    }
    (sigma, shrinkage)
}

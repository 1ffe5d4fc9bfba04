//! Backtest configuration, P&L evaluation and the end-to-end run.

use chrono::NaiveDate;
use tracing::info;

use crate::domain::alpha::{AlphaConfig, AlphaModel};
use crate::domain::constraints::{ConstraintBuilder, DEFAULT_MAX_TRADE};
use crate::domain::error::StatArbError;
use crate::domain::market_data::{MarketData, PanelMatrix};
use crate::domain::optimizer::{PortfolioOptimizer, DEFAULT_RISK_AVERSION};
use crate::domain::portfolio::PortfolioHistory;
use crate::domain::qp::SolverSettings;
use crate::domain::rebalance::{
    RebalanceContext, RebalanceFailure, Rebalancer, DEFAULT_NEUTRALITY_TOLERANCE,
};
use crate::domain::risk::{RiskModel, TransactionCostModel, DEFAULT_TRANSACTION_COST_BPS};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub alpha: AlphaConfig,
    pub max_trade: f64,
    pub risk_aversion: f64,
    pub transaction_cost_bps: f64,
    pub neutrality_tolerance: f64,
    pub solver: SolverSettings,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            alpha: AlphaConfig::default(),
            max_trade: DEFAULT_MAX_TRADE,
            risk_aversion: DEFAULT_RISK_AVERSION,
            transaction_cost_bps: DEFAULT_TRANSACTION_COST_BPS,
            neutrality_tolerance: DEFAULT_NEUTRALITY_TOLERANCE,
            solver: SolverSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Upper-cased tickers; empty selects every asset the data source has.
    pub assets: Vec<String>,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlPoint {
    pub date: NaiveDate,
    pub daily: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnlSeries {
    pub points: Vec<PnlPoint>,
}

impl PnlSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.points.last().map(|p| p.cumulative).unwrap_or(0.0)
    }

    pub fn daily(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.daily).collect()
    }
}

/// Daily P&L: each day's position dotted with the return realized on the
/// same date, accumulated in date order.
pub fn evaluate_pnl(
    history: &PortfolioHistory,
    returns: &PanelMatrix,
) -> Result<PnlSeries, StatArbError> {
    if history.assets() != returns.assets() {
        return Err(StatArbError::misaligned(
            "portfolio history and returns cover different assets",
        ));
    }
    let mut cumulative = 0.0;
    let mut points = Vec::with_capacity(history.len());
    for (date, w) in history.iter() {
        let t = returns.date_index(date).ok_or_else(|| {
            StatArbError::misaligned(format!("no realized return for {}", date))
        })?;
        let daily = w.dot(&returns.row(t));
        cumulative += daily;
        points.push(PnlPoint {
            date,
            daily,
            cumulative,
        });
    }
    Ok(PnlSeries { points })
}

/// Everything a run produced. `outcome` holds either the full history or
/// the failure with its partial history; `pnl` covers whichever history
/// exists.
#[derive(Debug)]
pub struct BacktestRun {
    pub risk: RiskModel,
    pub outcome: Result<PortfolioHistory, RebalanceFailure>,
    pub pnl: PnlSeries,
}

impl BacktestRun {
    pub fn history(&self) -> &PortfolioHistory {
        match &self.outcome {
            Ok(history) => history,
            Err(failure) => &failure.history,
        }
    }
}

/// Estimates the static risk model, runs the rebalancing loop and
/// evaluates P&L. Errors before the loop starts are returned directly;
/// a loop failure is reported inside the run.
pub fn run_backtest(data: &MarketData, model: &ModelConfig) -> Result<BacktestRun, StatArbError> {
    let returns = data.returns()?;
    let costs = TransactionCostModel::new(model.transaction_cost_bps);
    let risk = RiskModel::estimate(&returns, &costs)?;
    let alpha = AlphaModel::new(model.alpha.clone());

    let ctx = RebalanceContext {
        data,
        risk: &risk,
        alpha: &alpha,
        constraints: ConstraintBuilder::new(model.max_trade),
        optimizer: PortfolioOptimizer::new(model.risk_aversion, model.solver),
        neutrality_tolerance: model.neutrality_tolerance,
    };
    let outcome = Rebalancer::new(ctx).run();

    let history = match &outcome {
        Ok(history) => history,
        Err(failure) => &failure.history,
    };
    let pnl = evaluate_pnl(history, &returns)?;
    info!(
        "backtest finished: {} days, total P&L {:.2}",
        pnl.len(),
        pnl.total()
    );

    Ok(BacktestRun {
        risk,
        outcome,
        pnl,
    })
}

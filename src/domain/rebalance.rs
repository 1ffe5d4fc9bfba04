//! Sequential rebalancing loop.
//!
//! Each day is a pure step `(previous position, day t) -> position t`:
//! alpha for day t, bounds from the previous position, one QP solve, then
//! the market-neutrality and bounds checks. [`Rebalancer`] folds that step
//! over the trading days, starting at the first day with a full alpha
//! lookback, and halts on the first error while keeping the history built
//! so far.

use chrono::NaiveDate;
use nalgebra::DVector;
use tracing::{debug, info};

use crate::domain::alpha::AlphaModel;
use crate::domain::constraints::ConstraintBuilder;
use crate::domain::error::StatArbError;
use crate::domain::market_data::MarketData;
use crate::domain::optimizer::PortfolioOptimizer;
use crate::domain::portfolio::PortfolioHistory;
use crate::domain::risk::RiskModel;

pub const DEFAULT_NEUTRALITY_TOLERANCE: f64 = 0.01;

/// Relative slack allowed when checking a solved position against its bounds.
const BOUNDS_SLACK: f64 = 1e-6;

/// Read-only inputs shared by every day of a run.
#[derive(Debug, Clone, Copy)]
pub struct RebalanceContext<'a> {
    pub data: &'a MarketData,
    pub risk: &'a RiskModel,
    pub alpha: &'a AlphaModel,
    pub constraints: ConstraintBuilder,
    pub optimizer: PortfolioOptimizer,
    pub neutrality_tolerance: f64,
}

impl RebalanceContext<'_> {
    pub fn first_day(&self) -> usize {
        self.alpha.required_history()
    }
}

/// Computes the position for day `t` from the previous day's position.
pub fn rebalance_day(
    ctx: &RebalanceContext<'_>,
    prev: &DVector<f64>,
    t: usize,
) -> Result<DVector<f64>, StatArbError> {
    let alpha = ctx.alpha.compute(ctx.data, t)?;
    let bounds = ctx.constraints.build(prev);
    let w = ctx.optimizer.solve(&alpha, ctx.risk, &bounds)?.into_result()?;

    let dollar_beta = ctx.risk.beta.dot(&w);
    if !(dollar_beta.abs() < ctx.neutrality_tolerance) {
        return Err(StatArbError::invariant(
            "market-neutrality",
            format!(
                "|beta.w| = {:.6e} is not below {}",
                dollar_beta.abs(),
                ctx.neutrality_tolerance
            ),
        ));
    }

    let slack = BOUNDS_SLACK * (1.0 + bounds.gamma.amax().max(bounds.delta.amax()));
    if !bounds.contains(&w, slack) {
        return Err(StatArbError::invariant(
            "position-bounds",
            "solved position leaves [gamma, delta]",
        ));
    }

    Ok(w)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running { day: usize },
    Completed,
    Failed,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Completed | LoopState::Failed)
    }
}

/// A halted run: where it stopped, why, and what it had produced.
#[derive(Debug, thiserror::Error)]
#[error("rebalancing halted at day index {day_index}{}: {error}", on_date(.date))]
pub struct RebalanceFailure {
    pub day_index: usize,
    pub date: Option<NaiveDate>,
    #[source]
    pub error: StatArbError,
    pub history: PortfolioHistory,
}

fn on_date(date: &Option<NaiveDate>) -> String {
    date.map(|d| format!(" ({d})")).unwrap_or_default()
}

impl From<&RebalanceFailure> for std::process::ExitCode {
    fn from(failure: &RebalanceFailure) -> Self {
        (&failure.error).into()
    }
}

pub struct Rebalancer<'a> {
    ctx: RebalanceContext<'a>,
    state: LoopState,
    prev: DVector<f64>,
    history: PortfolioHistory,
    failure: Option<(usize, StatArbError)>,
}

impl<'a> Rebalancer<'a> {
    pub fn new(ctx: RebalanceContext<'a>) -> Self {
        let n = ctx.data.n_assets();
        Rebalancer {
            ctx,
            state: LoopState::NotStarted,
            prev: DVector::zeros(n),
            history: PortfolioHistory::new(ctx.data.assets().to_vec()),
            failure: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn history(&self) -> &PortfolioHistory {
        &self.history
    }

    /// Advances the state machine by one transition and returns the new state.
    pub fn step(&mut self) -> LoopState {
        self.state = match self.state {
            LoopState::NotStarted => self.start(),
            LoopState::Running { day } => self.advance(day),
            terminal => terminal,
        };
        self.state
    }

    fn start(&mut self) -> LoopState {
        let first = self.ctx.first_day();
        let n_dates = self.ctx.data.n_dates();
        info!(
            "rebalancing {} assets over days {}..{}",
            self.ctx.data.n_assets(),
            first,
            n_dates
        );
        if n_dates <= first {
            return self.fail(
                first,
                StatArbError::InsufficientHistory {
                    context: "rebalancing loop".into(),
                    available: n_dates,
                    required: first + 1,
                },
            );
        }
        LoopState::Running { day: first }
    }

    fn advance(&mut self, day: usize) -> LoopState {
        let date = self.ctx.data.dates()[day];
        let w = match rebalance_day(&self.ctx, &self.prev, day) {
            Ok(w) => w,
            Err(e) => return self.fail(day, e),
        };
        debug!(
            "{}: gross {:.2}, dollar beta {:.3e}",
            date,
            w.lp_norm(1),
            self.ctx.risk.beta.dot(&w)
        );
        if let Err(e) = self.history.push(date, w.clone()) {
            return self.fail(day, e);
        }
        self.prev = w;

        if day + 1 < self.ctx.data.n_dates() {
            LoopState::Running { day: day + 1 }
        } else {
            info!("rebalancing completed: {} days", self.history.len());
            LoopState::Completed
        }
    }

    fn fail(&mut self, day: usize, error: StatArbError) -> LoopState {
        tracing::warn!("rebalancing failed at day index {}: {}", day, error);
        self.failure = Some((day, error));
        LoopState::Failed
    }

    /// Runs to a terminal state.
    pub fn run(mut self) -> Result<PortfolioHistory, RebalanceFailure> {
        while !self.step().is_terminal() {}
        self.finish()
    }

    pub fn finish(self) -> Result<PortfolioHistory, RebalanceFailure> {
        match self.failure {
            None => Ok(self.history),
            Some((day_index, error)) => Err(RebalanceFailure {
                day_index,
                date: self.ctx.data.dates().get(day_index).copied(),
                error,
                history: self.history,
            }),
        }
    }
}

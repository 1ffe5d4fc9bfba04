//! Run summary statistics over the P&L series and the portfolio history.

use nalgebra::DVector;

use super::backtest::{PnlPoint, PnlSeries};
use super::portfolio::PortfolioHistory;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub days: usize,
    pub total_pnl: f64,
    pub mean_daily_pnl: f64,
    pub std_daily_pnl: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough fall of cumulative P&L, in dollars.
    pub max_drawdown: f64,
    /// Longest run of days spent below a previous cumulative P&L peak.
    pub max_drawdown_duration: usize,
    pub win_rate: f64,
    pub avg_gross_exposure: f64,
    pub avg_turnover: f64,
    /// Informational only; the optimizer does not price trades.
    pub estimated_cost: f64,
}

impl Metrics {
    pub fn compute(history: &PortfolioHistory, pnl: &PnlSeries, tau: &DVector<f64>) -> Self {
        let daily = pnl.daily();
        let days = daily.len();
        let n = days as f64;

        let (mean_daily_pnl, std_daily_pnl) = if days > 0 {
            let mean = daily.iter().sum::<f64>() / n;
            let variance = daily.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
            (mean, variance.sqrt())
        } else {
            (0.0, 0.0)
        };

        let sharpe_ratio = if std_daily_pnl > 0.0 {
            mean_daily_pnl / std_daily_pnl * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let win_rate = if days > 0 {
            daily.iter().filter(|&&p| p > 0.0).count() as f64 / n
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&pnl.points);

        let avg_gross_exposure = mean(&history.gross_exposure());
        let avg_turnover = mean(&history.turnover());
        let estimated_cost = history
            .trades()
            .iter()
            .map(|trade| trade.abs().dot(tau))
            .sum();

        Metrics {
            days,
            total_pnl: pnl.total(),
            mean_daily_pnl,
            std_daily_pnl,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
            win_rate,
            avg_gross_exposure,
            avg_turnover,
            estimated_cost,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn compute_drawdown(points: &[PnlPoint]) -> (f64, usize) {
    // Cumulative P&L starts from zero before the first day.
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    let mut duration = 0usize;
    let mut max_duration = 0usize;

    for point in points {
        if point.cumulative >= peak {
            peak = point.cumulative;
            duration = 0;
        } else {
            max_dd = max_dd.max(peak - point.cumulative);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

//! Result persistence port.

use crate::domain::backtest::PnlSeries;
use crate::domain::error::StatArbError;
use crate::domain::portfolio::PortfolioHistory;

/// Port for writing a run's portfolio history and P&L.
pub trait ReportPort {
    fn write(&self, history: &PortfolioHistory, pnl: &PnlSeries) -> Result<(), StatArbError>;
}

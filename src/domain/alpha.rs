//! Alpha aggregation.
//!
//! Three cross-sectional sub-signals, each winsorized with
//! [`normalize::winsorize`](crate::domain::normalize::winsorize):
//!
//! - momentum: `close[t-1] / close[t-L] - 1` over the `L`-day lookback that
//!   ends just before day `t`
//! - volume: mean volume over `volume_window` rows ending `volume_lag` rows
//!   before the last available day `t-1`
//! - value: negated book-to-market at day `t`
//!
//! The combined alpha is the weighted sum with weights scaled to sum to one.

use nalgebra::DVector;

use crate::domain::error::StatArbError;
use crate::domain::market_data::{MarketData, PanelMatrix};
use crate::domain::normalize::{winsorize, DEFAULT_ITERATIONS};

pub const DEFAULT_MOMENTUM_LOOKBACK: usize = 250;
pub const DEFAULT_VOLUME_WINDOW: usize = 4;
pub const DEFAULT_VOLUME_LAG: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaWeights {
    pub momentum: f64,
    pub volume: f64,
    pub value: f64,
}

impl AlphaWeights {
    pub fn total(&self) -> f64 {
        self.momentum + self.volume + self.value
    }
}

impl Default for AlphaWeights {
    fn default() -> Self {
        Self {
            momentum: 1.0,
            volume: 1.0,
            value: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlphaConfig {
    pub momentum_lookback: usize,
    pub volume_window: usize,
    pub volume_lag: usize,
    pub normalize_iterations: usize,
    pub weights: AlphaWeights,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        Self {
            momentum_lookback: DEFAULT_MOMENTUM_LOOKBACK,
            volume_window: DEFAULT_VOLUME_WINDOW,
            volume_lag: DEFAULT_VOLUME_LAG,
            normalize_iterations: DEFAULT_ITERATIONS,
            weights: AlphaWeights::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlphaModel {
    config: AlphaConfig,
}

impl AlphaModel {
    pub fn new(config: AlphaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlphaConfig {
        &self.config
    }

    /// First day index for which every sub-signal has its full lookback.
    pub fn required_history(&self) -> usize {
        self.config
            .momentum_lookback
            .max(self.config.volume_window + self.config.volume_lag)
    }

    fn check_history(&self, context: &str, t: usize, required: usize) -> Result<(), StatArbError> {
        if t < required {
            return Err(StatArbError::InsufficientHistory {
                context: context.to_string(),
                available: t,
                required,
            });
        }
        Ok(())
    }

    pub fn raw_momentum(
        &self,
        close: &PanelMatrix,
        t: usize,
    ) -> Result<DVector<f64>, StatArbError> {
        let lookback = self.config.momentum_lookback;
        self.check_history("momentum alpha", t, lookback)?;
        let latest = close.row(t - 1);
        let earliest = close.row(t - lookback);
        if earliest.iter().any(|&p| p == 0.0) {
            return Err(StatArbError::numerical(format!(
                "zero price at the start of the momentum window ({})",
                close.dates()[t - lookback]
            )));
        }
        Ok(latest.component_div(&earliest).add_scalar(-1.0))
    }

    pub fn raw_volume(&self, volume: &PanelMatrix, t: usize) -> Result<DVector<f64>, StatArbError> {
        let window = self.config.volume_window;
        let lag = self.config.volume_lag;
        self.check_history("volume alpha", t, window + lag)?;
        let end = t - lag;
        let start = end - window;
        let mut sum = DVector::<f64>::zeros(volume.n_assets());
        for row in start..end {
            sum += volume.row(row);
        }
        Ok(sum / window as f64)
    }

    pub fn raw_value(
        &self,
        book_to_market: &PanelMatrix,
        t: usize,
    ) -> Result<DVector<f64>, StatArbError> {
        if t >= book_to_market.n_dates() {
            return Err(StatArbError::InsufficientHistory {
                context: "value alpha".into(),
                available: book_to_market.n_dates(),
                required: t + 1,
            });
        }
        Ok(-book_to_market.row(t))
    }

    /// Combined alpha for day `t`, using information through row `t - 1`
    /// for prices and volume and row `t` for book-to-market.
    pub fn compute(&self, data: &MarketData, t: usize) -> Result<DVector<f64>, StatArbError> {
        let total = self.config.weights.total();
        if !(total > 0.0) {
            return Err(StatArbError::numerical("alpha weights must sum to a positive value"));
        }
        let iterations = self.config.normalize_iterations;

        let momentum = winsorize(&self.raw_momentum(&data.close, t)?, iterations)?;
        let volume = winsorize(&self.raw_volume(&data.volume, t)?, iterations)?;
        let value = winsorize(&self.raw_value(&data.book_to_market, t)?, iterations)?;

        let w = &self.config.weights;
        Ok(momentum * (w.momentum / total)
            + volume * (w.volume / total)
            + value * (w.value / total))
    }
}

impl Default for AlphaModel {
    fn default() -> Self {
        Self::new(AlphaConfig::default())
    }
}

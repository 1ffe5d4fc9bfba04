//! Date × asset panels and the aligned market-data bundle.
//!
//! Every input matrix (close, volume, book-to-market) is a [`PanelMatrix`]:
//! rows are trading dates in strictly increasing order, columns are assets.
//! [`MarketData`] guarantees the three panels share identical indices and
//! hold only finite values, so downstream code can index by position.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::StatArbError;
use crate::domain::universe::resolve_columns;
use crate::ports::data_port::{DataPort, Field};

#[derive(Debug, Clone, PartialEq)]
pub struct PanelMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    values: DMatrix<f64>,
}

impl PanelMatrix {
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self, StatArbError> {
        if values.nrows() != dates.len() || values.ncols() != assets.len() {
            return Err(StatArbError::misaligned(format!(
                "panel shape {}x{} does not match {} dates and {} assets",
                values.nrows(),
                values.ncols(),
                dates.len(),
                assets.len()
            )));
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(StatArbError::misaligned(format!(
                "dates must be strictly increasing ({} followed by {})",
                w[0], w[1]
            )));
        }
        Ok(Self {
            dates,
            assets,
            values,
        })
    }

    /// Builds a panel from date-major rows.
    pub fn from_rows(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: &[Vec<f64>],
    ) -> Result<Self, StatArbError> {
        let n_assets = assets.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_assets) {
            return Err(StatArbError::misaligned(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                n_assets
            )));
        }
        let values = DMatrix::from_fn(rows.len(), n_assets, |i, j| rows[i][j]);
        Self::new(dates, assets, values)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Cross-section at row `t`.
    pub fn row(&self, t: usize) -> DVector<f64> {
        self.values.row(t).transpose()
    }

    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn same_index(&self, other: &PanelMatrix) -> bool {
        self.dates == other.dates && self.assets == other.assets
    }

    /// Restricts the panel to the requested assets (all when empty).
    pub fn select_assets(&self, requested: &[String]) -> Result<Self, StatArbError> {
        let cols = resolve_columns(&self.assets, requested)?;
        let assets = cols.iter().map(|&j| self.assets[j].clone()).collect();
        let values = DMatrix::from_fn(self.n_dates(), cols.len(), |i, k| self.values[(i, cols[k])]);
        Self::new(self.dates.clone(), assets, values)
    }

    pub fn ensure_finite(&self, label: &str) -> Result<(), StatArbError> {
        for i in 0..self.n_dates() {
            for j in 0..self.n_assets() {
                if !self.values[(i, j)].is_finite() {
                    return Err(StatArbError::misaligned(format!(
                        "{} has a missing or non-finite value for {} on {}",
                        label, self.assets[j], self.dates[i]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Simple close-to-close returns `p[t] / p[t-1] - 1`, indexed by the later date.
    pub fn simple_returns(&self) -> Result<PanelMatrix, StatArbError> {
        if self.n_dates() < 2 {
            return Err(StatArbError::InsufficientHistory {
                context: "returns".into(),
                available: self.n_dates(),
                required: 2,
            });
        }
        for i in 0..self.n_dates() - 1 {
            for j in 0..self.n_assets() {
                if self.values[(i, j)] == 0.0 {
                    return Err(StatArbError::numerical(format!(
                        "zero price for {} on {}",
                        self.assets[j], self.dates[i]
                    )));
                }
            }
        }
        let values = DMatrix::from_fn(self.n_dates() - 1, self.n_assets(), |i, j| {
            self.values[(i + 1, j)] / self.values[(i, j)] - 1.0
        });
        Self::new(self.dates[1..].to_vec(), self.assets.clone(), values)
    }
}

/// Immutable, aligned inputs for one backtest.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub close: PanelMatrix,
    pub volume: PanelMatrix,
    pub book_to_market: PanelMatrix,
}

impl MarketData {
    pub fn new(
        close: PanelMatrix,
        volume: PanelMatrix,
        book_to_market: PanelMatrix,
    ) -> Result<Self, StatArbError> {
        if !close.same_index(&volume) {
            return Err(StatArbError::misaligned(
                "volume panel index differs from close panel",
            ));
        }
        if !close.same_index(&book_to_market) {
            return Err(StatArbError::misaligned(
                "book-to-market panel index differs from close panel",
            ));
        }
        close.ensure_finite("close")?;
        volume.ensure_finite("volume")?;
        book_to_market.ensure_finite("book-to-market")?;
        Ok(Self {
            close,
            volume,
            book_to_market,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.close.dates()
    }

    pub fn assets(&self) -> &[String] {
        self.close.assets()
    }

    pub fn n_dates(&self) -> usize {
        self.close.n_dates()
    }

    pub fn n_assets(&self) -> usize {
        self.close.n_assets()
    }

    pub fn returns(&self) -> Result<PanelMatrix, StatArbError> {
        self.close.simple_returns()
    }
}

/// Fetches all three panels through the data port and aligns them to the
/// configured universe.
pub fn load_market_data(
    port: &dyn DataPort,
    config: &BacktestConfig,
) -> Result<MarketData, StatArbError> {
    let fetch = |field: Field| -> Result<PanelMatrix, StatArbError> {
        let panel = port.fetch_panel(field, config.start_date, config.end_date)?;
        tracing::debug!(
            "fetched {}: {} dates x {} assets",
            field,
            panel.n_dates(),
            panel.n_assets()
        );
        panel.select_assets(&config.assets)
    };

    let close = fetch(Field::Close)?;
    let volume = fetch(Field::Volume)?;
    let book_to_market = fetch(Field::BookToMarket)?;
    MarketData::new(close, volume, book_to_market)
}

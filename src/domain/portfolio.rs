//! Portfolio history: one position vector per rebalanced day.

use chrono::NaiveDate;
use nalgebra::DVector;

use crate::domain::error::StatArbError;

/// Append-only, date-ordered sequence of dollar positions.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioHistory {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    positions: Vec<DVector<f64>>,
}

impl PortfolioHistory {
    pub fn new(assets: Vec<String>) -> Self {
        PortfolioHistory {
            assets,
            dates: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn push(&mut self, date: NaiveDate, position: DVector<f64>) -> Result<(), StatArbError> {
        if position.len() != self.assets.len() {
            return Err(StatArbError::misaligned(format!(
                "position for {} has {} entries, universe has {}",
                date,
                position.len(),
                self.assets.len()
            )));
        }
        if let Some(&last) = self.dates.last() {
            if date <= last {
                return Err(StatArbError::misaligned(format!(
                    "position for {} does not follow {}",
                    date, last
                )));
            }
        }
        self.dates.push(date);
        self.positions.push(position);
        Ok(())
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn positions(&self) -> &[DVector<f64>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn last(&self) -> Option<(NaiveDate, &DVector<f64>)> {
        self.dates.last().copied().zip(self.positions.last())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &DVector<f64>)> {
        self.dates.iter().copied().zip(self.positions.iter())
    }

    /// Sum of absolute positions per day.
    pub fn gross_exposure(&self) -> Vec<f64> {
        self.positions.iter().map(|w| w.lp_norm(1)).collect()
    }

    /// Per-asset trades per day; the first day trades from a flat book.
    pub fn trades(&self) -> Vec<DVector<f64>> {
        let mut prev = DVector::zeros(self.assets.len());
        self.positions
            .iter()
            .map(|w| {
                let trade = w - &prev;
                prev = w.clone();
                trade
            })
            .collect()
    }

    /// Sum of absolute trades per day.
    pub fn turnover(&self) -> Vec<f64> {
        self.trades().iter().map(|t| t.lp_norm(1)).collect()
    }
}

#![allow(dead_code)]

use chrono::NaiveDate;
use statarb::domain::error::StatArbError;
use statarb::domain::market_data::{MarketData, PanelMatrix};
use statarb::ports::data_port::{DataPort, Field};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

pub struct MockDataPort {
    pub panels: HashMap<Field, PanelMatrix>,
    pub errors: HashMap<Field, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            panels: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_panel(mut self, field: Field, panel: PanelMatrix) -> Self {
        self.panels.insert(field, panel);
        self
    }

    pub fn with_error(mut self, field: Field, reason: &str) -> Self {
        self.errors.insert(field, reason.to_string());
        self
    }

    fn panel(&self, field: Field) -> Result<&PanelMatrix, StatArbError> {
        if let Some(reason) = self.errors.get(&field) {
            return Err(StatArbError::Data {
                reason: reason.clone(),
            });
        }
        self.panels.get(&field).ok_or_else(|| StatArbError::Data {
            reason: format!("no {} panel", field),
        })
    }
}

impl DataPort for MockDataPort {
    fn fetch_panel(
        &self,
        field: Field,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PanelMatrix, StatArbError> {
        let panel = self.panel(field)?;
        let (dates, rows): (Vec<NaiveDate>, Vec<Vec<f64>>) = panel
            .dates()
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= start_date && **d <= end_date)
            .map(|(i, d)| (*d, panel.row(i).iter().copied().collect()))
            .unzip();
        PanelMatrix::from_rows(dates, panel.assets().to_vec(), &rows)
    }

    fn list_assets(&self, field: Field) -> Result<Vec<String>, StatArbError> {
        Ok(self.panel(field)?.assets().to_vec())
    }

    fn get_data_range(
        &self,
        field: Field,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StatArbError> {
        let panel = self.panel(field)?;
        Ok(panel
            .dates()
            .first()
            .zip(panel.dates().last())
            .map(|(a, b)| (*a, *b, panel.n_dates())))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub const START: (i32, u32, u32) = (2019, 1, 1);

/// Deterministic date × asset rows for the three inputs.
pub struct Synthetic {
    pub dates: Vec<NaiveDate>,
    pub assets: Vec<String>,
    pub close: Vec<Vec<f64>>,
    pub volume: Vec<Vec<f64>>,
    pub book_to_market: Vec<Vec<f64>>,
}

/// Prices driven by a smooth market factor with positive loadings plus an
/// asset-specific wave, daily volatility around one percent.
pub fn synthetic(n_assets: usize, n_days: usize) -> Synthetic {
    let start = date(START.0, START.1, START.2);
    let dates = (0..n_days)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();
    let assets = (0..n_assets).map(|j| format!("AS{j:02}")).collect();

    let mut close = Vec::with_capacity(n_days);
    let mut price: Vec<f64> = (0..n_assets).map(|j| 50.0 + 10.0 * j as f64).collect();
    for i in 0..n_days {
        let t = i as f64;
        let market = 0.008 * (0.23 * t).sin() + 0.004 * (0.71 * t).cos();
        for (j, p) in price.iter_mut().enumerate() {
            let loading = 0.8 + 0.4 * (j % 3) as f64 / 2.0 + 0.05 * j as f64;
            let idio = 0.006 * ((0.9 + 0.37 * j as f64) * t + j as f64).sin();
            *p *= 1.0 + loading * market + idio;
        }
        close.push(price.clone());
    }

    let volume = (0..n_days)
        .map(|i| {
            (0..n_assets)
                .map(|j| {
                    1.0e6 * (1.0 + 0.25 * j as f64)
                        * (1.0 + 0.3 * ((0.41 + 0.13 * j as f64) * i as f64).sin())
                })
                .collect()
        })
        .collect();

    let book_to_market = (0..n_days)
        .map(|i| {
            (0..n_assets)
                .map(|j| 0.3 + 0.07 * j as f64 + 0.05 * ((0.05 * i as f64) + j as f64).cos())
                .collect()
        })
        .collect();

    Synthetic {
        dates,
        assets,
        close,
        volume,
        book_to_market,
    }
}

impl Synthetic {
    pub fn rows(&self, field: Field) -> &[Vec<f64>] {
        match field {
            Field::Close => &self.close,
            Field::Volume => &self.volume,
            Field::BookToMarket => &self.book_to_market,
        }
    }

    pub fn panel(&self, field: Field) -> PanelMatrix {
        PanelMatrix::from_rows(self.dates.clone(), self.assets.clone(), self.rows(field)).unwrap()
    }

    pub fn market_data(&self) -> MarketData {
        MarketData::new(
            self.panel(Field::Close),
            self.panel(Field::Volume),
            self.panel(Field::BookToMarket),
        )
        .unwrap()
    }

    pub fn port(&self) -> MockDataPort {
        Field::ALL
            .iter()
            .fold(MockDataPort::new(), |port, f| port.with_panel(*f, self.panel(*f)))
    }

    /// Writes `close.csv`, `volume.csv` and `book_to_market.csv` into `dir`.
    pub fn write_csv(&self, dir: &Path) {
        for field in Field::ALL {
            let mut out = format!("date,{}\n", self.assets.join(","));
            for (d, row) in self.dates.iter().zip(self.rows(field)) {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                out.push_str(&format!("{},{}\n", d, cells.join(",")));
            }
            fs::write(dir.join(field.default_file_name()), out).unwrap();
        }
    }
}

/// `ExitCode` has no `PartialEq`; compare through its debug form.
pub fn same_exit_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}

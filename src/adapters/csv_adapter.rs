//! Wide CSV market-data adapter.
//!
//! One file per field. The header is `date,ASSET1,ASSET2,...`; each row is
//! an ISO date followed by one value per asset. Every cell must parse as a
//! number.

use crate::domain::error::StatArbError;
use crate::domain::market_data::PanelMatrix;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, Field};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;

struct Table {
    assets: Vec<String>,
    rows: Vec<(NaiveDate, Vec<f64>)>,
}

pub struct CsvAdapter {
    base_path: PathBuf,
    files: HashMap<Field, String>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        let files = Field::ALL
            .iter()
            .map(|f| (*f, f.default_file_name().to_string()))
            .collect();
        Self { base_path, files }
    }

    pub fn with_file(mut self, field: Field, file_name: impl Into<String>) -> Self {
        self.files.insert(field, file_name.into());
        self
    }

    /// Reads `[data] path` and the optional per-field file names.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StatArbError> {
        let path = config
            .get_string("data", "path")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| StatArbError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?;
        let mut adapter = CsvAdapter::new(PathBuf::from(path.trim()));
        for field in Field::ALL {
            if let Some(name) = config
                .get_string("data", field.config_key())
                .filter(|n| !n.trim().is_empty())
            {
                adapter = adapter.with_file(field, name.trim());
            }
        }
        Ok(adapter)
    }

    fn csv_path(&self, field: Field) -> PathBuf {
        let name = self
            .files
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.default_file_name());
        self.base_path.join(name)
    }

    fn read_table(&self, field: Field) -> Result<Table, StatArbError> {
        let path = self.csv_path(field);
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| StatArbError::data(format!("failed to read {}: {}", path.display(), e)))?;

        let headers = rdr
            .headers()
            .map_err(|e| StatArbError::data(format!("{}: bad header: {}", path.display(), e)))?
            .clone();
        if headers.len() < 2 {
            return Err(StatArbError::data(format!(
                "{}: expected a date column followed by asset columns",
                path.display()
            )));
        }
        let assets: Vec<String> = headers.iter().skip(1).map(|h| h.to_uppercase()).collect();

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| {
                StatArbError::data(format!("{}: CSV parse error: {}", path.display(), e))
            })?;

            let date_str = record.get(0).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                StatArbError::data(format!(
                    "{} row {}: invalid date '{}': {}",
                    path.display(),
                    line + 1,
                    date_str,
                    e
                ))
            })?;

            let values = record
                .iter()
                .skip(1)
                .zip(assets.iter())
                .map(|(cell, asset)| {
                    cell.parse::<f64>().map_err(|_| {
                        StatArbError::data(format!(
                            "{} on {}: missing or invalid value '{}' for {}",
                            field, date, cell, asset
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push((date, values));
        }

        rows.sort_by_key(|(date, _)| *date);
        Ok(Table { assets, rows })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_panel(
        &self,
        field: Field,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PanelMatrix, StatArbError> {
        let table = self.read_table(field)?;
        let (dates, values): (Vec<NaiveDate>, Vec<Vec<f64>>) = table
            .rows
            .into_iter()
            .filter(|(date, _)| *date >= start_date && *date <= end_date)
            .unzip();
        PanelMatrix::from_rows(dates, table.assets, &values)
    }

    fn list_assets(&self, field: Field) -> Result<Vec<String>, StatArbError> {
        Ok(self.read_table(field)?.assets)
    }

    fn get_data_range(
        &self,
        field: Field,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StatArbError> {
        let table = self.read_table(field)?;
        Ok(table
            .rows
            .first()
            .zip(table.rows.last())
            .map(|((first, _), (last, _))| (*first, *last, table.rows.len())))
    }
}

//! CSV result writer: `portfolio_history.csv` and `pnl.csv`.

use crate::domain::backtest::PnlSeries;
use crate::domain::error::StatArbError;
use crate::domain::portfolio::PortfolioHistory;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::{Path, PathBuf};

pub const HISTORY_FILE: &str = "portfolio_history.csv";
pub const PNL_FILE: &str = "pnl.csv";

pub struct CsvReportAdapter {
    directory: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn writer(&self, name: &str) -> Result<csv::Writer<fs::File>, StatArbError> {
        let path = self.directory.join(name);
        csv::Writer::from_path(&path).map_err(|e| to_io(&path, e))
    }
}

fn to_io(path: &Path, e: csv::Error) -> StatArbError {
    StatArbError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, history: &PortfolioHistory, pnl: &PnlSeries) -> Result<(), StatArbError> {
        fs::create_dir_all(&self.directory)?;

        let path = self.directory.join(HISTORY_FILE);
        let mut wtr = self.writer(HISTORY_FILE)?;
        let mut header = vec!["date".to_string()];
        header.extend(history.assets().iter().cloned());
        wtr.write_record(&header).map_err(|e| to_io(&path, e))?;
        for (date, w) in history.iter() {
            let mut record = vec![date.to_string()];
            record.extend(w.iter().map(|v| v.to_string()));
            wtr.write_record(&record).map_err(|e| to_io(&path, e))?;
        }
        wtr.flush()?;

        let path = self.directory.join(PNL_FILE);
        let mut wtr = self.writer(PNL_FILE)?;
        wtr.write_record(["date", "daily", "cumulative"])
            .map_err(|e| to_io(&path, e))?;
        for point in &pnl.points {
            wtr.write_record([
                point.date.to_string(),
                point.daily.to_string(),
                point.cumulative.to_string(),
            ])
            .map_err(|e| to_io(&path, e))?;
        }
        wtr.flush()?;

        Ok(())
    }
}

//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config parsing (build_backtest_config, build_model_config)
//! - The backtest pipeline with MockDataPort and a recording ReportPort
//! - The backtest, validate and info commands against INI and CSV files on disk

mod common;

use clap::Parser;
use common::*;
use statarb::adapters::csv_report_adapter::{HISTORY_FILE, PNL_FILE};
use statarb::adapters::file_config_adapter::FileConfigAdapter;
use statarb::cli::{self, Cli};
use statarb::domain::backtest::PnlSeries;
use statarb::domain::error::StatArbError;
use statarb::domain::portfolio::PortfolioHistory;
use statarb::ports::data_port::Field;
use statarb::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[data]
path = /srv/market

[backtest]
start_date = 2019-01-01
end_date = 2019-12-31
assets = as00, AS01, as02

[model]
max_trade = 100000
risk_aversion = 2.0
transaction_cost_bps = 5
neutrality_tolerance = 0.05
momentum_lookback = 120
volume_window = 5
volume_lag = 2
normalize_iterations = 8
momentum_weight = 2
volume_weight = 1
value_weight = 0.5

[solver]
max_iterations = 200
tolerance = 1e-8
show_progress = no
"#;

/// INI pointing at synthetic CSVs in `data_dir`.
fn pipeline_ini(data_dir: &Path, out_dir: &Path) -> String {
    format!(
        "[data]\npath = {}\n\n[backtest]\nstart_date = 2018-06-01\nend_date = 2030-01-01\n\n\
         [output]\ndirectory = {}\n",
        data_dir.display(),
        out_dir.display()
    )
}

struct RecordingReportPort {
    written: RefCell<Vec<(PortfolioHistory, PnlSeries)>>,
    fail: bool,
}

impl RecordingReportPort {
    fn new() -> Self {
        Self {
            written: RefCell::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            written: RefCell::new(Vec::new()),
            fail: true,
        }
    }
}

impl ReportPort for RecordingReportPort {
    fn write(&self, history: &PortfolioHistory, pnl: &PnlSeries) -> Result<(), StatArbError> {
        if self.fail {
            return Err(StatArbError::Io(std::io::Error::other("read-only disk")));
        }
        self.written
            .borrow_mut()
            .push((history.clone(), pnl.clone()));
        Ok(())
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_config_reads_every_section() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();

        assert_eq!(config.start_date, date(2019, 1, 1));
        assert_eq!(config.end_date, date(2019, 12, 31));
        assert_eq!(config.assets, vec!["AS00", "AS01", "AS02"]);

        let model = &config.model;
        assert_eq!(model.max_trade, 100_000.0);
        assert_eq!(model.risk_aversion, 2.0);
        assert_eq!(model.transaction_cost_bps, 5.0);
        assert_eq!(model.neutrality_tolerance, 0.05);
        assert_eq!(model.alpha.momentum_lookback, 120);
        assert_eq!(model.alpha.volume_window, 5);
        assert_eq!(model.alpha.volume_lag, 2);
        assert_eq!(model.alpha.normalize_iterations, 8);
        assert_eq!(model.alpha.weights.momentum, 2.0);
        assert_eq!(model.alpha.weights.value, 0.5);
        assert_eq!(model.solver.max_iterations, 200);
        assert_eq!(model.solver.tolerance, 1e-8);
        assert!(!model.solver.show_progress);
    }

    #[test]
    fn build_model_config_uses_defaults() {
        let adapter = FileConfigAdapter::from_string("[model]\n").unwrap();
        let model = cli::build_model_config(&adapter).unwrap();
        assert_eq!(model, statarb::domain::backtest::ModelConfig::default());
    }

    #[test]
    fn unparsable_number_is_config_invalid() {
        let adapter =
            FileConfigAdapter::from_string("[model]\nmax_trade = lots\n").unwrap();
        assert!(matches!(
            cli::build_model_config(&adapter),
            Err(StatArbError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn missing_start_date_is_config_missing() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nend_date = 2020-01-01\n").unwrap();
        assert!(matches!(
            cli::build_backtest_config(&adapter),
            Err(StatArbError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn load_config_reads_file_from_disk() {
        let file = write_temp_ini(VALID_INI);
        assert!(cli::load_config(&file.path().to_path_buf()).is_ok());
    }
}

mod pipeline {
    use super::*;

    fn config_for(assets: &[&str]) -> statarb::domain::backtest::BacktestConfig {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nstart_date = 2018-01-01\nend_date = 2030-01-01\n",
        )
        .unwrap();
        let mut config = cli::build_backtest_config(&adapter).unwrap();
        config.assets = assets.iter().map(|s| s.to_string()).collect();
        config
    }

    #[test]
    fn completed_run_writes_full_history() {
        let port = synthetic(3, 260).port();
        let report = RecordingReportPort::new();

        let code = cli::run_backtest_pipeline(&port, &report, &config_for(&[]));
        assert!(same_exit_code(code, ExitCode::SUCCESS));

        let written = report.written.borrow();
        assert_eq!(written.len(), 1);
        let (history, pnl) = &written[0];
        assert_eq!(history.len(), 10);
        assert_eq!(pnl.len(), 10);
    }

    #[test]
    fn halted_run_still_writes_reports() {
        let port = synthetic(3, 200).port();
        let report = RecordingReportPort::new();

        let code = cli::run_backtest_pipeline(&port, &report, &config_for(&[]));
        assert!(same_exit_code(code, ExitCode::from(5)));

        let written = report.written.borrow();
        assert_eq!(written.len(), 1);
        assert!(written[0].0.is_empty());
        assert!(written[0].1.is_empty());
    }

    #[test]
    fn unknown_asset_exits_with_config_code() {
        let port = synthetic(3, 260).port();
        let report = RecordingReportPort::new();

        let code = cli::run_backtest_pipeline(&port, &report, &config_for(&["NOPE"]));
        assert!(same_exit_code(code, ExitCode::from(2)));
        assert!(report.written.borrow().is_empty());
    }

    #[test]
    fn data_error_exits_with_data_code() {
        let port = synthetic(3, 260)
            .port()
            .with_error(Field::Volume, "truncated file");
        let report = RecordingReportPort::new();

        let code = cli::run_backtest_pipeline(&port, &report, &config_for(&[]));
        assert!(same_exit_code(code, ExitCode::from(3)));
    }

    #[test]
    fn report_failure_exits_with_io_code() {
        let port = synthetic(3, 260).port();
        let code =
            cli::run_backtest_pipeline(&port, &RecordingReportPort::failing(), &config_for(&[]));
        assert!(same_exit_code(code, ExitCode::from(1)));
    }
}

mod commands {
    use super::*;

    #[test]
    fn backtest_command_writes_csv_reports() {
        let data_dir = tempfile::TempDir::new().unwrap();
        let out_dir = tempfile::TempDir::new().unwrap();
        let out = out_dir.path().join("results");
        synthetic(3, 260).write_csv(data_dir.path());
        let ini = write_temp_ini(&pipeline_ini(data_dir.path(), &out));

        let cli = Cli::parse_from([
            "statarb",
            "backtest",
            "-c",
            ini.path().to_str().unwrap(),
        ]);
        let code = cli::run(cli);
        assert!(same_exit_code(code, ExitCode::SUCCESS));

        let history = fs::read_to_string(out.join(HISTORY_FILE)).unwrap();
        assert_eq!(history.lines().count(), 11);
        assert!(history.starts_with("date,AS00,AS01,AS02\n"));
        let pnl = fs::read_to_string(out.join(PNL_FILE)).unwrap();
        assert_eq!(pnl.lines().count(), 11);
    }

    #[test]
    fn output_flag_overrides_config_directory() {
        let data_dir = tempfile::TempDir::new().unwrap();
        let out_dir = tempfile::TempDir::new().unwrap();
        synthetic(3, 255).write_csv(data_dir.path());
        let ini = write_temp_ini(&pipeline_ini(data_dir.path(), &out_dir.path().join("unused")));
        let override_dir = out_dir.path().join("override");

        let cli = Cli::parse_from([
            "statarb",
            "backtest",
            "-c",
            ini.path().to_str().unwrap(),
            "-o",
            override_dir.to_str().unwrap(),
        ]);
        assert!(same_exit_code(cli::run(cli), ExitCode::SUCCESS));
        assert!(override_dir.join(HISTORY_FILE).exists());
        assert!(!out_dir.path().join("unused").exists());
    }

    #[test]
    fn validate_command_accepts_valid_config() {
        let ini = write_temp_ini(VALID_INI);
        let cli = Cli::parse_from(["statarb", "validate", "-c", ini.path().to_str().unwrap()]);
        assert!(same_exit_code(cli::run(cli), ExitCode::SUCCESS));
    }

    #[test]
    fn validate_command_rejects_reversed_dates() {
        let ini = write_temp_ini(
            "[data]\npath = /srv\n\n[backtest]\nstart_date = 2020-01-01\nend_date = 2019-01-01\n",
        );
        let cli = Cli::parse_from(["statarb", "validate", "-c", ini.path().to_str().unwrap()]);
        assert!(same_exit_code(cli::run(cli), ExitCode::from(2)));
    }

    #[test]
    fn info_command_reads_csv_ranges() {
        let data_dir = tempfile::TempDir::new().unwrap();
        synthetic(2, 20).write_csv(data_dir.path());
        let ini = write_temp_ini(&pipeline_ini(data_dir.path(), data_dir.path()));
        let cli = Cli::parse_from(["statarb", "info", "-c", ini.path().to_str().unwrap()]);
        assert!(same_exit_code(cli::run(cli), ExitCode::SUCCESS));
    }

    #[test]
    fn missing_config_file_exits_with_config_code() {
        let cli = Cli::parse_from(["statarb", "-v", "validate", "-c", "/nonexistent/statarb.ini"]);
        assert!(same_exit_code(cli::run(cli), ExitCode::from(2)));
    }
}

//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::alpha::{AlphaConfig, AlphaWeights};
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, ModelConfig};
use crate::domain::config_validation::{
    read_bool, read_count, read_date, read_double, validate_backtest_config,
    validate_model_config,
};
use crate::domain::error::StatArbError;
use crate::domain::market_data::load_market_data;
use crate::domain::metrics::Metrics;
use crate::domain::qp::SolverSettings;
use crate::domain::universe::parse_assets;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, Field};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "statarb",
    about = "Market-neutral statistical arbitrage backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Output directory (overrides [output] directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration and print the resolved model
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data dimensions and date ranges
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Cli {
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        // A subscriber may already be installed when run() is called more
        // than once in a process.
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

pub fn run(cli: Cli) -> ExitCode {
    cli.init_logging();
    match cli.command {
        Command::Backtest { config, output } => run_backtest(&config, output.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    }
}

fn fail(err: &StatArbError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn build_model_config(adapter: &dyn ConfigPort) -> Result<ModelConfig, StatArbError> {
    let defaults = ModelConfig::default();
    let alpha_defaults = AlphaConfig::default();

    let alpha = AlphaConfig {
        momentum_lookback: read_count(
            adapter,
            "model",
            "momentum_lookback",
            alpha_defaults.momentum_lookback,
        )?,
        volume_window: read_count(adapter, "model", "volume_window", alpha_defaults.volume_window)?,
        volume_lag: read_count(adapter, "model", "volume_lag", alpha_defaults.volume_lag)?,
        normalize_iterations: read_count(
            adapter,
            "model",
            "normalize_iterations",
            alpha_defaults.normalize_iterations,
        )?,
        weights: AlphaWeights {
            momentum: read_double(adapter, "model", "momentum_weight", 1.0)?,
            volume: read_double(adapter, "model", "volume_weight", 1.0)?,
            value: read_double(adapter, "model", "value_weight", 1.0)?,
        },
    };

    let solver = SolverSettings {
        max_iterations: read_count(
            adapter,
            "solver",
            "max_iterations",
            defaults.solver.max_iterations,
        )?,
        tolerance: read_double(adapter, "solver", "tolerance", defaults.solver.tolerance)?,
        show_progress: read_bool(adapter, "solver", "show_progress", false)?,
    };

    Ok(ModelConfig {
        alpha,
        max_trade: read_double(adapter, "model", "max_trade", defaults.max_trade)?,
        risk_aversion: read_double(adapter, "model", "risk_aversion", defaults.risk_aversion)?,
        transaction_cost_bps: read_double(
            adapter,
            "model",
            "transaction_cost_bps",
            defaults.transaction_cost_bps,
        )?,
        neutrality_tolerance: read_double(
            adapter,
            "model",
            "neutrality_tolerance",
            defaults.neutrality_tolerance,
        )?,
        solver,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, StatArbError> {
    let start_date = read_date(adapter, "start_date")?;
    let end_date = read_date(adapter, "end_date")?;

    let assets = match adapter
        .get_string("backtest", "assets")
        .filter(|s| !s.trim().is_empty())
    {
        Some(list) => parse_assets(&list)?,
        None => Vec::new(),
    };

    Ok(BacktestConfig {
        start_date,
        end_date,
        assets,
        model: build_model_config(adapter)?,
    })
}

fn output_directory(adapter: &dyn ConfigPort, output_override: Option<&PathBuf>) -> PathBuf {
    output_override.cloned().unwrap_or_else(|| {
        adapter
            .get_string("output", "directory")
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn load_and_validate(
    config_path: &PathBuf,
) -> Result<(FileConfigAdapter, BacktestConfig), ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter).map_err(|e| fail(&e))?;
    validate_model_config(&adapter).map_err(|e| fail(&e))?;
    let bt_config = build_backtest_config(&adapter).map_err(|e| fail(&e))?;
    Ok((adapter, bt_config))
}

fn run_backtest(config_path: &PathBuf, output_override: Option<&PathBuf>) -> ExitCode {
    // Stage 1-2: load, validate and build config
    let (adapter, bt_config) = match load_and_validate(config_path) {
        Ok(v) => v,
        Err(code) => return code,
    };

    // Stage 3: collaborators
    let data_port = match CsvAdapter::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let report_port = CsvReportAdapter::new(output_directory(&adapter, output_override));

    run_backtest_pipeline(&data_port, &report_port, &bt_config)
}

/// Loads data, runs the backtest, prints the summary and writes reports.
/// A halted loop still writes the partial history before exiting with the
/// failure's code.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    bt_config: &BacktestConfig,
) -> ExitCode {
    // Stage 4: market data
    let data = match load_market_data(data_port, bt_config) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    eprintln!(
        "Loaded {} assets x {} dates ({} to {})",
        data.n_assets(),
        data.n_dates(),
        bt_config.start_date,
        bt_config.end_date
    );

    // Stage 5: risk model, rebalancing loop, P&L
    eprintln!("Running backtest...");
    let run = match backtest_engine::run_backtest(&data, &bt_config.model) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    // Stage 6: console summary
    let metrics = Metrics::compute(run.history(), &run.pnl, &run.risk.tau);
    eprintln!("\n=== Results ===");
    eprintln!("Days Rebalanced:  {}", metrics.days);
    eprintln!("Total P&L:        {:.2}", metrics.total_pnl);
    eprintln!("Mean Daily P&L:   {:.2}", metrics.mean_daily_pnl);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!(
        "Max Drawdown:     {:.2} ({} days)",
        metrics.max_drawdown, metrics.max_drawdown_duration
    );
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Avg Gross:        {:.2}", metrics.avg_gross_exposure);
    eprintln!("Avg Turnover:     {:.2}", metrics.avg_turnover);
    eprintln!("Est. Trade Cost:  {:.2}", metrics.estimated_cost);
    eprintln!("Shrinkage:        {:.4}", run.risk.shrinkage);

    // Stage 7: reports, partial or complete
    if let Err(e) = report_port.write(run.history(), &run.pnl) {
        return fail(&e);
    }
    eprintln!("\nReports written ({} rows)", run.history().len());

    match &run.outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {failure}");
            failure.into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let (adapter, bt_config) = match load_and_validate(config_path) {
        Ok(v) => v,
        Err(code) => return code,
    };
    let model = &bt_config.model;

    eprintln!("Config validated successfully");
    eprintln!("\nBacktest:");
    eprintln!("  dates:  {} to {}", bt_config.start_date, bt_config.end_date);
    if bt_config.assets.is_empty() {
        eprintln!("  assets: all");
    } else {
        eprintln!("  assets: {}", bt_config.assets.join(", "));
    }
    eprintln!("\nModel:");
    eprintln!("  max_trade:            {}", model.max_trade);
    eprintln!("  risk_aversion:        {}", model.risk_aversion);
    eprintln!("  transaction_cost_bps: {}", model.transaction_cost_bps);
    eprintln!("  neutrality_tolerance: {}", model.neutrality_tolerance);
    eprintln!(
        "  alpha:                momentum {} days, volume {} days (lag {}), {} iterations",
        model.alpha.momentum_lookback,
        model.alpha.volume_window,
        model.alpha.volume_lag,
        model.alpha.normalize_iterations
    );
    eprintln!(
        "  weights:              momentum {}, volume {}, value {}",
        model.alpha.weights.momentum, model.alpha.weights.volume, model.alpha.weights.value
    );
    eprintln!(
        "  solver:               {} iterations, tolerance {:e}",
        model.solver.max_iterations, model.solver.tolerance
    );
    eprintln!(
        "\nOutput directory: {}",
        output_directory(&adapter, None).display()
    );
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_port = match CsvAdapter::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    for field in Field::ALL {
        let assets = match data_port.list_assets(field) {
            Ok(a) => a,
            Err(e) => return fail(&e),
        };
        match data_port.get_data_range(field) {
            Ok(Some((first, last, rows))) => {
                println!(
                    "{:<15} {:>5} assets  {:>6} rows  {} to {}",
                    field,
                    assets.len(),
                    rows,
                    first,
                    last
                );
            }
            Ok(None) => println!("{:<15} {:>5} assets  no rows", field, assets.len()),
            Err(e) => return fail(&e),
        }
    }
    ExitCode::SUCCESS
}

//! Configuration validation.
//!
//! Validates every config value before a backtest runs. The typed readers
//! here also back the config builder, so a value that fails to parse is an
//! error instead of silently falling back to its default.

use crate::domain::error::StatArbError;
use crate::domain::universe::parse_assets;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StatArbError {
    StatArbError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, StatArbError> {
    match present(config, section, key) {
        None => Ok(default),
        Some(s) => s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("'{}' is not a number", s))),
    }
}

pub fn read_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, StatArbError> {
    match present(config, section, key) {
        None => Ok(default),
        Some(s) => s
            .parse::<usize>()
            .map_err(|_| invalid(section, key, format!("'{}' is not a non-negative integer", s))),
    }
}

pub fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, StatArbError> {
    match present(config, section, key) {
        None => Ok(default),
        Some(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(invalid(section, key, format!("'{}' is not a boolean", s))),
        },
    }
}

pub fn read_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, StatArbError> {
    match present(config, "backtest", key) {
        None => Err(StatArbError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                key,
                format!("invalid {} format, expected YYYY-MM-DD", key),
            )
        }),
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    validate_data_path(config)?;
    validate_dates(config)?;
    validate_assets(config)?;
    Ok(())
}

pub fn validate_model_config(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    validate_max_trade(config)?;
    validate_non_negative(config, "model", "risk_aversion", 1.0)?;
    validate_non_negative(config, "model", "transaction_cost_bps", 2.0)?;
    validate_positive(config, "model", "neutrality_tolerance", 0.01)?;
    validate_at_least_one(config, "model", "momentum_lookback", 250)?;
    validate_at_least_one(config, "model", "volume_window", 4)?;
    read_count(config, "model", "volume_lag", 1)?;
    validate_at_least_one(config, "model", "normalize_iterations", 10)?;
    validate_weights(config)?;
    validate_solver(config)?;
    Ok(())
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    match present(config, "data", "path") {
        Some(_) => Ok(()),
        None => Err(StatArbError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let start_date = read_date(config, "start_date")?;
    let end_date = read_date(config, "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    if let Some(list) = present(config, "backtest", "assets") {
        parse_assets(&list).map_err(|e| invalid("backtest", "assets", e.to_string()))?;
    }
    Ok(())
}

fn validate_max_trade(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let value = read_double(config, "model", "max_trade", 150_000.0)?;
    if value <= 0.0 {
        return Err(invalid("model", "max_trade", "max_trade must be positive"));
    }
    Ok(())
}

fn validate_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), StatArbError> {
    let value = read_double(config, section, key, default)?;
    if value < 0.0 {
        return Err(invalid(section, key, format!("{} must be non-negative", key)));
    }
    Ok(())
}

fn validate_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), StatArbError> {
    let value = read_double(config, section, key, default)?;
    if value <= 0.0 {
        return Err(invalid(section, key, format!("{} must be positive", key)));
    }
    Ok(())
}

fn validate_at_least_one(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<(), StatArbError> {
    if read_count(config, section, key, default)? < 1 {
        return Err(invalid(section, key, format!("{} must be at least 1", key)));
    }
    Ok(())
}

fn validate_weights(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    let mut total = 0.0;
    for key in ["momentum_weight", "volume_weight", "value_weight"] {
        let value = read_double(config, "model", key, 1.0)?;
        if value < 0.0 {
            return Err(invalid("model", key, format!("{} must be non-negative", key)));
        }
        total += value;
    }
    if total <= 0.0 {
        return Err(invalid(
            "model",
            "momentum_weight",
            "alpha weights must not all be zero",
        ));
    }
    Ok(())
}

fn validate_solver(config: &dyn ConfigPort) -> Result<(), StatArbError> {
    validate_at_least_one(config, "solver", "max_iterations", 5_000)?;
    validate_positive(config, "solver", "tolerance", 1e-8)?;
    read_bool(config, "solver", "show_progress", false)?;
    Ok(())
}

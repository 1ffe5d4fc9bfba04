//! Core domain types and numerical logic.

pub mod error;
pub mod universe;
pub mod market_data;
pub mod normalize;
pub mod alpha;
pub mod risk;
pub mod constraints;
pub mod qp;
pub mod optimizer;
pub mod portfolio;
pub mod rebalance;
pub mod backtest;
pub mod metrics;
pub mod config_validation;

//! statarb: market-neutral statistical arbitrage backtester.
//!
//! Each trading day a cross-sectional alpha is built from momentum, volume
//! and value signals, and a convex quadratic program picks the next
//! dollar-beta-neutral portfolio under turnover and position caps.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;

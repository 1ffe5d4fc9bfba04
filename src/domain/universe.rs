//! Asset universe selection.
//!
//! Parses asset lists from configuration and resolves them against the
//! columns of a loaded panel.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in asset list")]
    EmptyToken,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),

    #[error("asset not present in market data: {0}")]
    UnknownAsset(String),

    #[error("universe is empty")]
    Empty,
}

pub fn parse_assets(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut assets = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let asset = trimmed.to_uppercase();
        if !seen.insert(asset.clone()) {
            return Err(UniverseError::DuplicateAsset(asset));
        }
        assets.push(asset);
    }

    Ok(assets)
}

/// Column positions of `requested` inside `available`, in the requested order.
///
/// An empty request selects every available asset.
pub fn resolve_columns(
    available: &[String],
    requested: &[String],
) -> Result<Vec<usize>, UniverseError> {
    if available.is_empty() {
        return Err(UniverseError::Empty);
    }
    if requested.is_empty() {
        return Ok((0..available.len()).collect());
    }

    requested
        .iter()
        .map(|asset| {
            available
                .iter()
                .position(|a| a.eq_ignore_ascii_case(asset))
                .ok_or_else(|| UniverseError::UnknownAsset(asset.clone()))
        })
        .collect()
}

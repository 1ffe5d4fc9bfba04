//! Cross-sectional signal normalizer.
//!
//! Repeats `iterations` times: standardize (subtract mean, divide by the
//! sample standard deviation), then winsorize every value whose magnitude
//! exceeds [`CLIP_BOUND`] back to the bound with its sign kept. Each pass
//! re-standardizes the previous clip, so the output approaches a bounded,
//! unit-scale vector. The iteration budget is fixed; there is no
//! convergence test.
//!
//! After the last pass the result must satisfy
//! `|mean| < 0.01`, `|std - 1| < 0.01` and `max|v| - 3 < 0.01`,
//! otherwise the call fails with `InvariantViolation`.

use nalgebra::DVector;

use crate::domain::error::StatArbError;

pub const CLIP_BOUND: f64 = 3.0;
pub const DEFAULT_ITERATIONS: usize = 10;
pub const POSTCONDITION_TOLERANCE: f64 = 0.01;

/// Sample mean and sample (n - 1) standard deviation.
pub fn mean_and_std(v: &DVector<f64>) -> (f64, f64) {
    let n = v.len() as f64;
    let mean = v.sum() / n;
    let ss: f64 = v.iter().map(|x| (x - mean) * (x - mean)).sum();
    (mean, (ss / (n - 1.0)).sqrt())
}

fn standardize(v: &DVector<f64>) -> Result<DVector<f64>, StatArbError> {
    let (mean, std) = mean_and_std(v);
    if !std.is_finite() || std <= 0.0 {
        return Err(StatArbError::numerical(format!(
            "cannot standardize a vector with zero variance (n = {}, std = {})",
            v.len(),
            std
        )));
    }
    Ok(v.map(|x| (x - mean) / std))
}

fn clip(v: &mut DVector<f64>) {
    for x in v.iter_mut() {
        if x.abs() > CLIP_BOUND {
            *x = CLIP_BOUND.copysign(*x);
        }
    }
}

pub fn winsorize(raw: &DVector<f64>, iterations: usize) -> Result<DVector<f64>, StatArbError> {
    if raw.len() < 2 {
        return Err(StatArbError::numerical(format!(
            "cannot standardize a cross-section of {} value(s)",
            raw.len()
        )));
    }
    if raw.iter().any(|x| !x.is_finite()) {
        return Err(StatArbError::numerical(
            "cross-section contains non-finite values",
        ));
    }

    let mut out = raw.clone();
    for _ in 0..iterations {
        out = standardize(&out)?;
        clip(&mut out);
    }

    check_postconditions(&out)?;
    Ok(out)
}

fn check_postconditions(v: &DVector<f64>) -> Result<(), StatArbError> {
    let (mean, std) = mean_and_std(v);
    if mean.abs() >= POSTCONDITION_TOLERANCE {
        return Err(StatArbError::invariant(
            "normalized-mean",
            format!("|mean| = {:.6} after winsorizing", mean.abs()),
        ));
    }
    if (std - 1.0).abs() >= POSTCONDITION_TOLERANCE {
        return Err(StatArbError::invariant(
            "normalized-std",
            format!("std = {:.6} after winsorizing", std),
        ));
    }
    let max_abs = v.amax();
    if max_abs - CLIP_BOUND >= POSTCONDITION_TOLERANCE {
        return Err(StatArbError::invariant(
            "normalized-bound",
            format!("max |value| = {:.6} exceeds {}", max_abs, CLIP_BOUND),
        ));
    }
    Ok(())
}

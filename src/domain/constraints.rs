//! Per-asset trade and position bounds derived from the previous portfolio.
//!
//! theta caps the day-over-day trade per asset, pi caps the absolute
//! position. From a flat book theta is the fixed `max_trade` and pi is ten
//! times that; afterwards both scale with the size of the book:
//!
//! - theta = min(max_trade, 1% of gross exposure)
//! - pi = min(10 * theta, sum of long positions)
//!
//! Bounds are `gamma = max(w - theta, -pi)` and `delta = min(w + theta, pi)`.
//! A position already beyond the shrinking cap makes those two candidates
//! cross; the bounds are then taken in order, which forces a move of at
//! least theta toward the cap without requiring the cap to be reached in
//! one day.

use nalgebra::DVector;

pub const DEFAULT_MAX_TRADE: f64 = 150_000.0;
pub const POSITION_CAP_MULTIPLE: f64 = 10.0;
pub const TRADE_FRACTION_OF_GROSS: f64 = 0.01;

/// Elementwise lower (`gamma`) and upper (`delta`) bounds for the next position.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsPair {
    pub gamma: DVector<f64>,
    pub delta: DVector<f64>,
}

impl BoundsPair {
    pub fn len(&self) -> usize {
        self.gamma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gamma.is_empty()
    }

    pub fn contains(&self, w: &DVector<f64>, tolerance: f64) -> bool {
        w.len() == self.len()
            && w.iter()
                .zip(self.gamma.iter().zip(self.delta.iter()))
                .all(|(x, (lo, hi))| *x >= lo - tolerance && *x <= hi + tolerance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintBuilder {
    max_trade: f64,
}

impl ConstraintBuilder {
    pub fn new(max_trade: f64) -> Self {
        Self { max_trade }
    }

    pub fn max_trade(&self) -> f64 {
        self.max_trade
    }

    /// Returns `(theta, pi)` for the given previous position.
    pub fn limits(&self, prev: &DVector<f64>) -> (f64, f64) {
        let gross = prev.lp_norm(1);
        if gross == 0.0 {
            return (self.max_trade, POSITION_CAP_MULTIPLE * self.max_trade);
        }
        let theta = self.max_trade.min(gross * TRADE_FRACTION_OF_GROSS);
        let long: f64 = prev.iter().filter(|&&x| x > 0.0).sum();
        let pi = (POSITION_CAP_MULTIPLE * theta).min(long);
        (theta, pi)
    }

    pub fn build(&self, prev: &DVector<f64>) -> BoundsPair {
        let (theta, pi) = self.limits(prev);
        let mut gamma = DVector::zeros(prev.len());
        let mut delta = DVector::zeros(prev.len());
        for (i, &w) in prev.iter().enumerate() {
            let lo = (w - theta).max(-pi);
            let hi = (w + theta).min(pi);
            gamma[i] = lo.min(hi);
            delta[i] = lo.max(hi);
        }
        BoundsPair { gamma, delta }
    }
}

impl Default for ConstraintBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRADE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn flat_book_gets_fixed_trade_cap() {
        let bounds = ConstraintBuilder::default().build(&DVector::zeros(4));
        assert_eq!(bounds.gamma, DVector::from_element(4, -150_000.0));
        assert_eq!(bounds.delta, DVector::from_element(4, 150_000.0));
    }

    #[test]
    fn limits_scale_with_gross_exposure() {
        let prev = DVector::from_vec(vec![600_000.0, -300_000.0, -300_000.0]);
        let (theta, pi) = ConstraintBuilder::default().limits(&prev);
        assert_relative_eq!(theta, 12_000.0, epsilon = 1e-6);
        assert_relative_eq!(pi, 120_000.0, epsilon = 1e-6);
    }

    #[test]
    fn limits_cap_theta_at_max_trade() {
        let prev = DVector::from_element(100, 1_000_000.0);
        let (theta, pi) = ConstraintBuilder::default().limits(&prev);
        assert_relative_eq!(theta, 150_000.0, epsilon = 1e-6);
        assert_relative_eq!(pi, 1_500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn pi_limited_by_long_book() {
        let prev = DVector::from_vec(vec![1_000.0, -99_000.0]);
        let (theta, pi) = ConstraintBuilder::default().limits(&prev);
        assert_relative_eq!(theta, 1_000.0, epsilon = 1e-6);
        assert_relative_eq!(pi, 1_000.0, epsilon = 1e-6);
    }

    #[test]
    fn bounds_inside_cap_follow_turnover_band() {
        let prev = DVector::from_vec(vec![
            5_000.0, -5_000.0, 20_000.0, -20_000.0, 500_000.0, -500_000.0,
        ]);
        // gross 1.05M: theta 10.5k, pi 105k
        let bounds = ConstraintBuilder::default().build(&prev);
        assert_relative_eq!(bounds.gamma[0], -5_500.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.delta[0], 15_500.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.gamma[3], -30_500.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.delta[3], -9_500.0, epsilon = 1e-6);
    }

    #[test]
    fn position_beyond_cap_must_shrink() {
        let prev = DVector::from_vec(vec![5_000.0, -2_000.0, -3_000.0]);
        // gross 10k: theta 100, pi 1000
        let bounds = ConstraintBuilder::default().build(&prev);
        assert_relative_eq!(bounds.gamma[0], 1_000.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.delta[0], 4_900.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.gamma[1], -1_900.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.delta[1], -1_000.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.gamma[2], -2_900.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.delta[2], -1_000.0, epsilon = 1e-6);
    }

    #[test]
    fn contains_respects_tolerance() {
        let bounds = BoundsPair {
            gamma: DVector::from_vec(vec![-1.0, 0.0]),
            delta: DVector::from_vec(vec![1.0, 2.0]),
        };
        assert!(bounds.contains(&DVector::from_vec(vec![1.0, 0.0]), 0.0));
        assert!(!bounds.contains(&DVector::from_vec(vec![1.1, 0.0]), 0.0));
        assert!(bounds.contains(&DVector::from_vec(vec![1.1, 0.0]), 0.2));
    }

    proptest! {
        #[test]
        fn gamma_never_exceeds_delta(
            prev in prop::collection::vec(-5.0e6f64..5.0e6, 1..40)
        ) {
            let bounds = ConstraintBuilder::default().build(&DVector::from_vec(prev));
            for (lo, hi) in bounds.gamma.iter().zip(bounds.delta.iter()) {
                prop_assert!(lo <= hi);
            }
        }

        #[test]
        fn bounds_agree_with_formula_when_band_and_cap_overlap(
            prev in prop::collection::vec(-5.0e6f64..5.0e6, 1..40)
        ) {
            let prev = DVector::from_vec(prev);
            let builder = ConstraintBuilder::default();
            let (theta, pi) = builder.limits(&prev);
            let bounds = builder.build(&prev);
            for i in 0..prev.len() {
                let lo = (prev[i] - theta).max(-pi);
                let hi = (prev[i] + theta).min(pi);
                if lo <= hi {
                    prop_assert_eq!(bounds.gamma[i], lo);
                    prop_assert_eq!(bounds.delta[i], hi);
                }
            }
        }
    }
}

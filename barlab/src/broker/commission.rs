use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Commission and valuation contract between the broker and an instrument.
///
/// The broker treats this interface abstractly; concrete schemes
/// (per-unit, percentage, futures-style multipliers) plug in per data feed.
pub trait CommissionInfo: Debug {
    /// Commission charged for executing `size` at `price` (size sign is
    /// irrelevant).
    fn commission(&self, size: f64, price: f64) -> f64;

    /// Realised gross profit of closing `size` units opened at
    /// `open_price` against `close_price`. Positive `size` values a long
    /// exposure.
    fn profit_and_loss(&self, size: f64, open_price: f64, close_price: f64) -> f64;

    /// Cash needed to take on `size` at `price`, before commission.
    fn operation_cost(&self, size: f64, price: f64) -> f64;

    /// Mark-to-market value of a signed position size at `price`.
    fn position_value(&self, size: f64, price: f64) -> f64;
}

/// Per-unit or percentage commission with a contract multiplier.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommissionScheme {
    /// Rate: absolute currency per unit, or a fraction of notional when
    /// `percent` is set.
    pub rate: f64,
    pub percent: bool,
    /// Contract multiplier applied to PnL and valuation.
    pub mult: f64,
}

impl CommissionScheme {
    pub fn per_unit(rate: f64) -> Self {
        Self {
            rate,
            percent: false,
            mult: 1.0,
        }
    }

    pub fn percentage(rate: f64) -> Self {
        Self {
            rate,
            percent: true,
            mult: 1.0,
        }
    }

    pub fn with_mult(mut self, mult: f64) -> Self {
        self.mult = mult;
        self
    }
}

impl Default for CommissionScheme {
    fn default() -> Self {
        Self::percentage(0.0)
    }
}

impl CommissionInfo for CommissionScheme {
    fn commission(&self, size: f64, price: f64) -> f64 {
        if self.percent {
            size.abs() * price * self.rate
        } else {
            size.abs() * self.rate
        }
    }

    fn profit_and_loss(&self, size: f64, open_price: f64, close_price: f64) -> f64 {
        size * (close_price - open_price) * self.mult
    }

    fn operation_cost(&self, size: f64, price: f64) -> f64 {
        size.abs() * price * self.mult
    }

    fn position_value(&self, size: f64, price: f64) -> f64 {
        size * price * self.mult
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_schemes() {
        struct TestCase {
            scheme: CommissionScheme,
            size: f64,
            price: f64,
            expected_commission: f64,
        }

        let cases = vec![
            // TC0: per-unit commission ignores price
            TestCase {
                scheme: CommissionScheme::per_unit(0.5),
                size: 10.0,
                price: 100.0,
                expected_commission: 5.0,
            },
            // TC1: percentage commission scales with notional
            TestCase {
                scheme: CommissionScheme::percentage(0.001),
                size: 10.0,
                price: 100.0,
                expected_commission: 1.0,
            },
            // TC2: sell sizes charge the same
            TestCase {
                scheme: CommissionScheme::percentage(0.001),
                size: -10.0,
                price: 100.0,
                expected_commission: 1.0,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = test.scheme.commission(test.size, test.price);
            assert!(
                (actual - test.expected_commission).abs() < 1e-12,
                "TC{index} failed: {actual}"
            );
        }
    }

    #[test]
    fn test_pnl_signs() {
        let scheme = CommissionScheme::default();
        // Long in profit
        assert_eq!(scheme.profit_and_loss(10.0, 100.0, 110.0), 100.0);
        // Long in loss
        assert_eq!(scheme.profit_and_loss(10.0, 100.0, 90.0), -100.0);
        // Short in profit (negative size, falling price)
        assert_eq!(scheme.profit_and_loss(-10.0, 100.0, 90.0), 100.0);
    }

    #[test]
    fn test_multiplier_scales_value() {
        let scheme = CommissionScheme::per_unit(0.0).with_mult(10.0);
        assert_eq!(scheme.position_value(2.0, 50.0), 1000.0);
        assert_eq!(scheme.operation_cost(2.0, 50.0), 1000.0);
        assert_eq!(scheme.profit_and_loss(2.0, 50.0, 55.0), 100.0);
    }
}

use crate::observer::{ObsCtx, Observer};
use barlab_ta::series::LineSeries;

/// Percentage drawdown of portfolio value from its running peak, plus the
/// running maximum drawdown.
#[derive(Debug, Clone, Default)]
pub struct DrawDown {
    peak: f64,
    max_drawdown: f64,
}

impl DrawDown {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for DrawDown {
    fn line_names(&self) -> &'static [&'static str] {
        &["drawdown", "maxdrawdown"]
    }

    fn start(&mut self, starting_cash: f64) {
        self.peak = starting_cash;
        self.max_drawdown = 0.0;
    }

    fn next(&mut self, ctx: &ObsCtx<'_>, out: &mut LineSeries) {
        if ctx.value > self.peak {
            self.peak = ctx.value;
        }
        let drawdown = if self.peak > 0.0 {
            100.0 * (self.peak - ctx.value) / self.peak
        } else {
            0.0
        };
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
        out.set(0, 0, drawdown);
        out.set(1, 0, self.max_drawdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_drawdown_tracks_peak() {
        struct TestCase {
            value: f64,
            expected_drawdown: f64,
            expected_max: f64,
        }

        let cases = vec![
            // TC0: new peak, no drawdown
            TestCase {
                value: 110.0,
                expected_drawdown: 0.0,
                expected_max: 0.0,
            },
            // TC1: 10% off the peak
            TestCase {
                value: 99.0,
                expected_drawdown: 10.0,
                expected_max: 10.0,
            },
            // TC2: partial recovery keeps the max
            TestCase {
                value: 104.5,
                expected_drawdown: 5.0,
                expected_max: 10.0,
            },
            // TC3: new peak resets the current drawdown only
            TestCase {
                value: 121.0,
                expected_drawdown: 0.0,
                expected_max: 10.0,
            },
        ];

        let mut observer = DrawDown::new();
        observer.start(100.0);
        let mut out = LineSeries::new(["drawdown", "maxdrawdown"]);

        for (index, test) in cases.into_iter().enumerate() {
            out.append_nan_row();
            let ctx = ObsCtx {
                bar_index: index,
                time: Utc.timestamp_opt(index as i64 * 60, 0).unwrap(),
                cash: 0.0,
                value: test.value,
                notifications: &[],
            };
            observer.next(&ctx, &mut out);
            assert!(
                (out.get(0, 0) - test.expected_drawdown).abs() < 1e-9,
                "TC{index} drawdown failed"
            );
            assert!(
                (out.get(1, 0) - test.expected_max).abs() < 1e-9,
                "TC{index} max failed"
            );
        }
    }
}

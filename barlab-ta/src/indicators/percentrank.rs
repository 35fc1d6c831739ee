use crate::arena::Ctx;
use crate::indicator::Indicator;
use crate::series::LineSeries;

/// Fraction of the trailing `period` values (current included) strictly
/// below the current value. Results lie in `[0, (period-1)/period]`.
#[derive(Debug, Clone)]
pub struct PercentRank {
    period: usize,
}

impl PercentRank {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "PercentRank period must be >= 1");
        Self { period }
    }
}

impl Indicator for PercentRank {
    fn line_names(&self) -> &'static [&'static str] {
        &["pctrank"]
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        if i + 1 < self.period {
            return;
        }
        let current = ctx.at(0, i as isize);
        if current.is_nan() {
            return;
        }
        let mut below = 0usize;
        for k in 0..self.period {
            let v = ctx.at(0, i as isize - k as isize);
            if v.is_nan() {
                return;
            }
            if v < current {
                below += 1;
            }
        }
        out.set_abs(0, i, below as f64 / self.period as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{LineRef, SeriesArena};

    #[test]
    fn test_percent_rank() {
        struct TestCase {
            values: Vec<f64>,
            period: usize,
            expected_last: f64,
        }

        let cases = vec![
            // TC0: current is the largest of the window
            TestCase {
                values: vec![1.0, 2.0, 3.0, 4.0],
                period: 4,
                expected_last: 0.75,
            },
            // TC1: current is the smallest of the window
            TestCase {
                values: vec![4.0, 3.0, 2.0, 1.0],
                period: 4,
                expected_last: 0.0,
            },
            // TC2: ties are not counted as below
            TestCase {
                values: vec![2.0, 2.0, 1.0, 2.0],
                period: 4,
                expected_last: 0.25,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let mut arena = SeriesArena::new();
            let id = arena.alloc(LineSeries::new(["x"]));
            for v in &test.values {
                arena.series_mut(id).line_mut(0).append(*v);
            }
            let inputs = [LineRef::new(id, 0)];
            let ctx = Ctx::new(&arena, &inputs);

            let mut rank = PercentRank::new(test.period);
            let mut out = LineSeries::new(["pctrank"]);
            out.extend_nan(test.values.len());
            rank.once(&ctx, &mut out, 0, test.values.len());

            let last = out.get_abs(0, test.values.len() as isize - 1);
            assert_eq!(last, test.expected_last, "TC{index} failed");
            for i in 0..test.period - 1 {
                assert!(out.get_abs(0, i as isize).is_nan(), "TC{index} warm-up failed");
            }
        }
    }
}

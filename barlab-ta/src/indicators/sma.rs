use crate::arena::Ctx;
use crate::indicator::{window_mean, Indicator};
use crate::series::LineSeries;

/// Arithmetic mean of the trailing `period` input values.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
}

impl SimpleMovingAverage {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SimpleMovingAverage period must be >= 1");
        Self { period }
    }
}

impl Indicator for SimpleMovingAverage {
    fn line_names(&self) -> &'static [&'static str] {
        &["sma"]
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        out.set_abs(0, i, window_mean(ctx, 0, i, self.period));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{LineRef, SeriesArena};

    #[test]
    fn test_sma_streaming() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let expected = [
            f64::NAN,
            f64::NAN,
            2.0,
            3.0,
            4.0,
            5.0,
            6.0,
            7.0,
            8.0,
            9.0,
        ];

        let mut arena = SeriesArena::new();
        let id = arena.alloc(LineSeries::new(["close"]));
        let mut sma = SimpleMovingAverage::new(3);
        let mut out = LineSeries::new(["sma"]);

        for (i, close) in closes.iter().enumerate() {
            arena.series_mut(id).line_mut(0).append(*close);
            out.append_nan_row();
            let inputs = [LineRef::new(id, 0)];
            let ctx = Ctx::new(&arena, &inputs);
            sma.update(&ctx, &mut out, i);

            let actual = out.get(0, 0);
            if expected[i].is_nan() {
                assert!(actual.is_nan(), "bar {i} expected NaN, got {actual}");
            } else {
                assert_eq!(actual, expected[i], "bar {i} failed");
            }
        }
    }
}

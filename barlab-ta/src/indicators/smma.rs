use crate::arena::Ctx;
use crate::indicator::{window_mean, Indicator};
use crate::series::LineSeries;

/// Wilder's smoothed moving average.
///
/// The first defined value is the simple mean of the first `period` inputs;
/// every later value is `y[t] = (y[t-1]·(period-1) + x[t]) / period`. The
/// seed is detected from the output line itself (previous value still NaN),
/// so the kernel re-seeds correctly on inputs that carry their own warm-up.
#[derive(Debug, Clone)]
pub struct SmoothedMovingAverage {
    period: usize,
}

impl SmoothedMovingAverage {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SmoothedMovingAverage period must be >= 1");
        Self { period }
    }
}

impl Indicator for SmoothedMovingAverage {
    fn line_names(&self) -> &'static [&'static str] {
        &["smma"]
    }

    fn min_period(&self) -> usize {
        self.period
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        let prev = out.get_abs(0, i as isize - 1);
        if prev.is_nan() {
            let seed = window_mean(ctx, 0, i, self.period);
            if !seed.is_nan() {
                out.set_abs(0, i, seed);
            }
            return;
        }
        let x = ctx.at(0, i as isize);
        let p = self.period as f64;
        out.set_abs(0, i, (prev * (p - 1.0) + x) / p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{LineRef, SeriesArena};

    #[test]
    fn test_smma_seed_and_recursion() {
        let closes = [2.0, 4.0, 6.0, 8.0, 10.0];
        let expected = [f64::NAN, f64::NAN, 4.0, 16.0 / 3.0, 62.0 / 9.0];

        let mut arena = SeriesArena::new();
        let id = arena.alloc(LineSeries::new(["close"]));
        let mut smma = SmoothedMovingAverage::new(3);
        let mut out = LineSeries::new(["smma"]);

        for (i, close) in closes.iter().enumerate() {
            arena.series_mut(id).line_mut(0).append(*close);
            out.append_nan_row();
            let inputs = [LineRef::new(id, 0)];
            let ctx = Ctx::new(&arena, &inputs);
            smma.update(&ctx, &mut out, i);

            let actual = out.get(0, 0);
            if expected[i].is_nan() {
                assert!(actual.is_nan(), "bar {i} expected NaN, got {actual}");
            } else {
                assert!(
                    (actual - expected[i]).abs() < 1e-12,
                    "bar {i} failed: {actual} vs {}",
                    expected[i]
                );
            }
        }
    }
}

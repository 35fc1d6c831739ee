use crate::arena::Ctx;
use crate::indicator::Indicator;
use crate::series::LineSeries;

const INPUT_HIGH: usize = 0;
const INPUT_LOW: usize = 1;
const INPUT_CLOSE: usize = 2;

/// Vortex indicator over `(high, low, close)`.
///
/// Over the trailing `period` window:
/// `VM+ = Σ|H[t] - L[t-1]|`, `VM- = Σ|L[t] - H[t-1]|`, `TR = Σ TrueRange`;
/// the lines are `VI± = VM± / TR`. A zero true-range sum leaves both lines
/// NaN.
#[derive(Debug, Clone)]
pub struct Vortex {
    period: usize,
}

impl Vortex {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Vortex period must be >= 1");
        Self { period }
    }
}

impl Indicator for Vortex {
    fn line_names(&self) -> &'static [&'static str] {
        &["vi_plus", "vi_minus"]
    }

    fn num_inputs(&self) -> usize {
        3
    }

    fn min_period(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        if i + 1 < self.min_period() {
            return;
        }

        let mut vm_plus = 0.0;
        let mut vm_minus = 0.0;
        let mut tr_sum = 0.0;
        for k in 0..self.period as isize {
            let j = i as isize - k;
            let high = ctx.at(INPUT_HIGH, j);
            let low = ctx.at(INPUT_LOW, j);
            let high_prev = ctx.at(INPUT_HIGH, j - 1);
            let low_prev = ctx.at(INPUT_LOW, j - 1);
            let close_prev = ctx.at(INPUT_CLOSE, j - 1);
            if high.is_nan()
                || low.is_nan()
                || high_prev.is_nan()
                || low_prev.is_nan()
                || close_prev.is_nan()
            {
                return;
            }
            vm_plus += (high - low_prev).abs();
            vm_minus += (low - high_prev).abs();
            tr_sum += (high - low)
                .max((high - close_prev).abs())
                .max((low - close_prev).abs());
        }

        if tr_sum == 0.0 {
            return;
        }
        out.set_abs(0, i, vm_plus / tr_sum);
        out.set_abs(1, i, vm_minus / tr_sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{LineRef, SeriesArena};

    fn run(period: usize, highs: &[f64], lows: &[f64], closes: &[f64]) -> LineSeries {
        let mut arena = SeriesArena::new();
        let id = arena.alloc(LineSeries::new(["high", "low", "close"]));
        for k in 0..highs.len() {
            arena.series_mut(id).line_mut(0).append(highs[k]);
            arena.series_mut(id).line_mut(1).append(lows[k]);
            arena.series_mut(id).line_mut(2).append(closes[k]);
        }
        let inputs = [
            LineRef::new(id, 0),
            LineRef::new(id, 1),
            LineRef::new(id, 2),
        ];
        let ctx = Ctx::new(&arena, &inputs);

        let mut vortex = Vortex::new(period);
        let mut out = LineSeries::new(["vi_plus", "vi_minus"]);
        out.extend_nan(highs.len());
        vortex.once(&ctx, &mut out, 0, highs.len());
        out
    }

    #[test]
    fn test_vortex() {
        let highs = [10.0, 11.0, 12.0];
        let lows = [9.0, 10.0, 11.0];
        let closes = [9.5, 10.5, 11.5];

        let out = run(2, &highs, &lows, &closes);

        assert!(out.get_abs(0, 1).is_nan());
        // Window bars 1..=2: VM+ = |11-9| + |12-10| = 4,
        // VM- = |10-10| + |11-11| = 0, TR = 1.5 + 1.5 = 3
        assert!((out.get_abs(0, 2) - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(out.get_abs(1, 2), 0.0);
    }

    #[test]
    fn test_vortex_zero_true_range() {
        let highs = [10.0, 10.0, 10.0];
        let lows = [10.0, 10.0, 10.0];
        let closes = [10.0, 10.0, 10.0];

        let out = run(2, &highs, &lows, &closes);

        assert!(out.get_abs(0, 2).is_nan());
        assert!(out.get_abs(1, 2).is_nan());
    }
}

use crate::arena::Ctx;
use crate::indicator::Indicator;
use crate::series::LineSeries;

/// True range over `(high, low, close)` inputs:
/// `max(H - L, |H - C[t-1]|, |L - C[t-1]|)`.
#[derive(Debug, Clone)]
pub struct TrueRange;

impl TrueRange {
    pub const INPUT_HIGH: usize = 0;
    pub const INPUT_LOW: usize = 1;
    pub const INPUT_CLOSE: usize = 2;

    pub fn new() -> Self {
        Self
    }
}

impl Default for TrueRange {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for TrueRange {
    fn line_names(&self) -> &'static [&'static str] {
        &["tr"]
    }

    fn num_inputs(&self) -> usize {
        3
    }

    fn min_period(&self) -> usize {
        2
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        let high = ctx.at(Self::INPUT_HIGH, i as isize);
        let low = ctx.at(Self::INPUT_LOW, i as isize);
        let close_prev = ctx.at(Self::INPUT_CLOSE, i as isize - 1);
        if high.is_nan() || low.is_nan() || close_prev.is_nan() {
            return;
        }
        let tr = (high - low)
            .max((high - close_prev).abs())
            .max((low - close_prev).abs());
        out.set_abs(0, i, tr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{LineRef, SeriesArena};

    #[test]
    fn test_true_range() {
        let highs = [10.0, 12.0, 11.0];
        let lows = [9.0, 10.5, 8.0];
        let closes = [9.5, 11.0, 9.0];
        // bar 1: max(1.5, |12-9.5|, |10.5-9.5|) = 2.5
        // bar 2: max(3.0, |11-11|, |8-11|) = 3.0

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

        let mut tr = TrueRange::new();
        let mut out = LineSeries::new(["tr"]);
        out.extend_nan(3);
        tr.once(&ctx, &mut out, 0, 3);

        assert!(out.get_abs(0, 0).is_nan());
        assert_eq!(out.get_abs(0, 1), 2.5);
        assert_eq!(out.get_abs(0, 2), 3.0);
    }
}

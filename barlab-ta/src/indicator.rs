use crate::arena::Ctx;
use crate::series::LineSeries;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Errors raised when binding an indicator into the series graph.
///
/// These are programming preconditions: they abort bootstrap rather than
/// surface per bar.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum BindError {
    #[error("indicator expects {expected} input line(s), {got} bound")]
    InputCount { expected: usize, got: usize },

    #[error("input references unknown series index {series}")]
    UnknownSeries { series: usize },

    #[error("input references line {line} of a series with {lines} line(s)")]
    UnknownLine { line: usize, lines: usize },
}

/// A per-bar computation over one or more input lines, producing one or
/// more output lines.
///
/// Kernels are written against absolute bar indices: `update(ctx, out, i)`
/// computes bar `i` and writes through [`LineSeries::set_abs`]. The engine
/// routes warm-up (values below the min-period stay NaN) and drives either
/// the streaming path (one `update` per new bar) or the batch path
/// ([`once`](Indicator::once) over the whole range). The default `once`
/// replays the streaming kernel, so both modes agree bit for bit; kernels
/// may override it with a vectorized fill as long as that equivalence is
/// preserved.
///
/// A kernel may read its own output at earlier indices (recursive
/// smoothers), but must never read an input beyond bar `i`.
pub trait Indicator: Debug {
    /// Names of the output lines, in slot order.
    fn line_names(&self) -> &'static [&'static str];

    /// Number of input lines the kernel expects.
    fn num_inputs(&self) -> usize {
        1
    }

    /// This kernel's own warm-up in bars of its input clock: the first bar
    /// count at which an output is defined, assuming inputs with no warm-up
    /// of their own.
    fn min_period(&self) -> usize;

    /// Reset any internal state before a (re)run.
    fn start(&mut self) {}

    fn stop(&mut self) {}

    /// Compute bar `i`.
    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize);

    /// Compute the half-open range `[start, end)` in one pass.
    fn once(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, start: usize, end: usize) {
        for i in start..end {
            self.update(ctx, out, i);
        }
    }
}

/// Effective min-period of an indicator bound to inputs with their own
/// warm-ups: the deepest input warm-up plus the kernel's own window, minus
/// their one-bar overlap.
pub fn propagate_min_period(input_min_periods: &[usize], own: usize) -> usize {
    let deepest = input_min_periods.iter().copied().max().unwrap_or(1);
    deepest + own - 1
}

/// NaN-strict sum of the `period` input values ending at bar `i`
/// (inclusive). NaN when the window is incomplete or any member is NaN.
pub fn window_sum(ctx: &Ctx<'_>, input: usize, i: usize, period: usize) -> f64 {
    debug_assert!(period >= 1);
    if (i as isize) - (period as isize) + 1 < 0 {
        return f64::NAN;
    }
    let mut sum = 0.0;
    for k in 0..period {
        sum += ctx.at(input, i as isize - k as isize);
    }
    sum
}

/// NaN-strict mean over the trailing `period` window at bar `i`.
pub fn window_mean(ctx: &Ctx<'_>, input: usize, i: usize, period: usize) -> f64 {
    window_sum(ctx, input, i, period) / period as f64
}

/// NaN-strict maximum over the trailing `period` window at bar `i`.
pub fn window_max(ctx: &Ctx<'_>, input: usize, i: usize, period: usize) -> f64 {
    window_extreme(ctx, input, i, period, f64::max)
}

/// NaN-strict minimum over the trailing `period` window at bar `i`.
pub fn window_min(ctx: &Ctx<'_>, input: usize, i: usize, period: usize) -> f64 {
    window_extreme(ctx, input, i, period, f64::min)
}

fn window_extreme(
    ctx: &Ctx<'_>,
    input: usize,
    i: usize,
    period: usize,
    pick: fn(f64, f64) -> f64,
) -> f64 {
    debug_assert!(period >= 1);
    if (i as isize) - (period as isize) + 1 < 0 {
        return f64::NAN;
    }
    let mut extreme = ctx.at(input, i as isize);
    for k in 1..period {
        let v = ctx.at(input, i as isize - k as isize);
        // f64::max/min silently skip NaN operands; warm-up must poison
        if v.is_nan() {
            return f64::NAN;
        }
        extreme = pick(extreme, v);
    }
    extreme
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{LineRef, SeriesArena};

    fn arena_with(values: &[f64]) -> (SeriesArena, [LineRef; 1]) {
        let mut arena = SeriesArena::new();
        let id = arena.alloc(LineSeries::new(["x"]));
        for v in values {
            arena.series_mut(id).line_mut(0).append(*v);
        }
        (arena, [LineRef::new(id, 0)])
    }

    #[test]
    fn test_propagate_min_period() {
        struct TestCase {
            inputs: Vec<usize>,
            own: usize,
            expected: usize,
        }

        let cases = vec![
            // TC0: raw input, SMA(3)
            TestCase {
                inputs: vec![1],
                own: 3,
                expected: 3,
            },
            // TC1: chained window: SMA(2) feeding PercentRank(4)
            TestCase {
                inputs: vec![2],
                own: 4,
                expected: 5,
            },
            // TC2: multi-input takes the deepest warm-up
            TestCase {
                inputs: vec![3, 7, 2],
                own: 5,
                expected: 11,
            },
            // TC3: no declared inputs defaults to a raw clock
            TestCase {
                inputs: vec![],
                own: 4,
                expected: 4,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = propagate_min_period(&test.inputs, test.own);
            assert_eq!(actual, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_window_helpers() {
        let (arena, inputs) = arena_with(&[1.0, 2.0, 3.0, 4.0]);
        let ctx = Ctx::new(&arena, &inputs);

        assert_eq!(window_sum(&ctx, 0, 2, 3), 6.0);
        assert_eq!(window_mean(&ctx, 0, 3, 2), 3.5);
        assert_eq!(window_max(&ctx, 0, 3, 3), 4.0);
        assert_eq!(window_min(&ctx, 0, 3, 3), 2.0);

        // Incomplete windows are NaN
        assert!(window_sum(&ctx, 0, 1, 3).is_nan());
        assert!(window_max(&ctx, 0, 0, 2).is_nan());
    }

    #[test]
    fn test_window_helpers_poison_on_nan() {
        let (arena, inputs) = arena_with(&[f64::NAN, 2.0, 3.0]);
        let ctx = Ctx::new(&arena, &inputs);

        assert!(window_sum(&ctx, 0, 2, 3).is_nan());
        assert!(window_max(&ctx, 0, 2, 3).is_nan());
        assert!(window_min(&ctx, 0, 2, 3).is_nan());
        // Windows clear of the NaN head are defined
        assert_eq!(window_max(&ctx, 0, 2, 2), 3.0);
    }
}

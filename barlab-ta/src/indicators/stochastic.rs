use crate::arena::Ctx;
use crate::indicator::{window_max, window_min, Indicator};
use crate::series::LineSeries;

const INPUT_HIGH: usize = 0;
const INPUT_LOW: usize = 1;
const INPUT_CLOSE: usize = 2;

/// Raw %K at bar `i`: `100 · (C - L_p) / (H_p - L_p)`.
///
/// A flat window (`H_p == L_p`) is degenerate: with `safe_div` enabled the
/// configured `safe_zero` value is returned, otherwise NaN. Both
/// configurations are valid; the default is `safe_div` with a midpoint of
/// 50.
fn raw_percent_k(
    ctx: &Ctx<'_>,
    i: usize,
    period: usize,
    safe_div: bool,
    safe_zero: f64,
) -> f64 {
    let highest = window_max(ctx, INPUT_HIGH, i, period);
    let lowest = window_min(ctx, INPUT_LOW, i, period);
    let close = ctx.at(INPUT_CLOSE, i as isize);
    if highest.is_nan() || lowest.is_nan() || close.is_nan() {
        return f64::NAN;
    }
    let range = highest - lowest;
    if range == 0.0 {
        return if safe_div { safe_zero } else { f64::NAN };
    }
    100.0 * (close - lowest) / range
}

/// NaN-strict mean of `count` raw %K values ending at bar `i`.
fn mean_raw_k(
    ctx: &Ctx<'_>,
    i: usize,
    count: usize,
    period: usize,
    safe_div: bool,
    safe_zero: f64,
) -> f64 {
    if i + 1 < count {
        return f64::NAN;
    }
    let mut sum = 0.0;
    for k in 0..count {
        sum += raw_percent_k(ctx, i - k, period, safe_div, safe_zero);
    }
    sum / count as f64
}

/// Slow stochastic oscillator over `(high, low, close)`.
///
/// `percK` is the `period_dfast`-mean of raw %K; `percD` the
/// `period_dslow`-mean of `percK`.
#[derive(Debug, Clone)]
pub struct Stochastic {
    period: usize,
    period_dfast: usize,
    period_dslow: usize,
    safe_div: bool,
    safe_zero: f64,
}

impl Stochastic {
    pub fn new(period: usize, period_dfast: usize, period_dslow: usize) -> Self {
        assert!(
            period >= 1 && period_dfast >= 1 && period_dslow >= 1,
            "Stochastic periods must be >= 1"
        );
        Self {
            period,
            period_dfast,
            period_dslow,
            safe_div: true,
            safe_zero: 50.0,
        }
    }

    /// Configure the flat-window policy (see [`raw_percent_k`]).
    pub fn with_safe_div(mut self, safe_div: bool, safe_zero: f64) -> Self {
        self.safe_div = safe_div;
        self.safe_zero = safe_zero;
        self
    }
}

impl Indicator for Stochastic {
    fn line_names(&self) -> &'static [&'static str] {
        &["percK", "percD"]
    }

    fn num_inputs(&self) -> usize {
        3
    }

    fn min_period(&self) -> usize {
        self.period + self.period_dfast + self.period_dslow - 2
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        let k = mean_raw_k(
            ctx,
            i,
            self.period_dfast,
            self.period,
            self.safe_div,
            self.safe_zero,
        );
        out.set_abs(0, i, k);

        if i + 1 < self.period_dslow {
            return;
        }
        let mut sum = 0.0;
        for n in 0..self.period_dslow {
            sum += out.get_abs(0, i as isize - n as isize);
        }
        out.set_abs(1, i, sum / self.period_dslow as f64);
    }
}

/// Fast stochastic oscillator: `percK` is raw %K, `percD` its
/// `period_dfast`-mean.
#[derive(Debug, Clone)]
pub struct StochasticFast {
    period: usize,
    period_dfast: usize,
    safe_div: bool,
    safe_zero: f64,
}

impl StochasticFast {
    pub fn new(period: usize, period_dfast: usize) -> Self {
        assert!(
            period >= 1 && period_dfast >= 1,
            "StochasticFast periods must be >= 1"
        );
        Self {
            period,
            period_dfast,
            safe_div: true,
            safe_zero: 50.0,
        }
    }

    pub fn with_safe_div(mut self, safe_div: bool, safe_zero: f64) -> Self {
        self.safe_div = safe_div;
        self.safe_zero = safe_zero;
        self
    }
}

impl Indicator for StochasticFast {
    fn line_names(&self) -> &'static [&'static str] {
        &["percK", "percD"]
    }

    fn num_inputs(&self) -> usize {
        3
    }

    fn min_period(&self) -> usize {
        self.period + self.period_dfast - 1
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        out.set_abs(
            0,
            i,
            raw_percent_k(ctx, i, self.period, self.safe_div, self.safe_zero),
        );

        if i + 1 < self.period_dfast {
            return;
        }
        let mut sum = 0.0;
        for n in 0..self.period_dfast {
            sum += out.get_abs(0, i as isize - n as isize);
        }
        out.set_abs(1, i, sum / self.period_dfast as f64);
    }
}

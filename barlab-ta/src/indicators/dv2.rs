use crate::arena::Ctx;
use crate::indicator::Indicator;
use crate::series::LineSeries;

const INPUT_HIGH: usize = 0;
const INPUT_LOW: usize = 1;
const INPUT_CLOSE: usize = 2;

/// DV2 bounded oscillator over `(high, low, close)`.
///
/// `CHL[t] = C[t] / ((H[t] + L[t]) / 2)` is smoothed with an
/// `ma_period`-mean, then ranked against its own trailing `period` window:
/// the output is `100 · PercentRank(DVU, period)`.
#[derive(Debug, Clone)]
pub struct Dv2 {
    period: usize,
    ma_period: usize,
}

impl Dv2 {
    pub fn new(period: usize) -> Self {
        Self::with_ma(period, 2)
    }

    pub fn with_ma(period: usize, ma_period: usize) -> Self {
        assert!(
            period >= 1 && ma_period >= 1,
            "Dv2 periods must be >= 1"
        );
        Self { period, ma_period }
    }

    fn chl(ctx: &Ctx<'_>, j: isize) -> f64 {
        let high = ctx.at(INPUT_HIGH, j);
        let low = ctx.at(INPUT_LOW, j);
        let close = ctx.at(INPUT_CLOSE, j);
        close / ((high + low) / 2.0)
    }

    fn dvu(&self, ctx: &Ctx<'_>, j: isize) -> f64 {
        if j + 1 < self.ma_period as isize {
            return f64::NAN;
        }
        let mut sum = 0.0;
        for k in 0..self.ma_period as isize {
            sum += Self::chl(ctx, j - k);
        }
        sum / self.ma_period as f64
    }
}

impl Indicator for Dv2 {
    fn line_names(&self) -> &'static [&'static str] {
        &["dv2"]
    }

    fn num_inputs(&self) -> usize {
        3
    }

    fn min_period(&self) -> usize {
        self.period + self.ma_period - 1
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        if i + 1 < self.min_period() {
            return;
        }
        let current = self.dvu(ctx, i as isize);
        if current.is_nan() {
            return;
        }
        let mut below = 0usize;
        for k in 0..self.period as isize {
            let v = self.dvu(ctx, i as isize - k);
            if v.is_nan() {
                return;
            }
            if v < current {
                below += 1;
            }
        }
        out.set_abs(0, i, 100.0 * below as f64 / self.period as f64);
    }
}

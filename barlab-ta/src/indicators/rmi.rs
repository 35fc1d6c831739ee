use crate::arena::Ctx;
use crate::indicator::Indicator;
use crate::series::LineSeries;

/// Relative momentum index: an RSI whose momentum is measured `lookback`
/// bars apart instead of one.
///
/// Up and down moves are Wilder-smoothed with `period`; the output is
/// `100 · up / (up + down)` (equivalent to `100 - 100/(1 + up/down)`). With
/// zero down-momentum the output saturates at 100; with both sides zero it
/// is NaN.
#[derive(Debug, Clone)]
pub struct RelativeMomentumIndex {
    period: usize,
    lookback: usize,
    seed_up: f64,
    seed_down: f64,
    seeded: usize,
    up_smma: f64,
    down_smma: f64,
}

impl RelativeMomentumIndex {
    pub fn new(period: usize, lookback: usize) -> Self {
        assert!(
            period >= 1 && lookback >= 1,
            "RelativeMomentumIndex periods must be >= 1"
        );
        Self {
            period,
            lookback,
            seed_up: 0.0,
            seed_down: 0.0,
            seeded: 0,
            up_smma: f64::NAN,
            down_smma: f64::NAN,
        }
    }

    fn write(&self, out: &mut LineSeries, i: usize) {
        let total = self.up_smma + self.down_smma;
        out.set_abs(0, i, 100.0 * self.up_smma / total);
    }
}

impl Indicator for RelativeMomentumIndex {
    fn line_names(&self) -> &'static [&'static str] {
        &["rmi"]
    }

    fn min_period(&self) -> usize {
        self.period + self.lookback
    }

    fn start(&mut self) {
        self.seed_up = 0.0;
        self.seed_down = 0.0;
        self.seeded = 0;
        self.up_smma = f64::NAN;
        self.down_smma = f64::NAN;
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        let current = ctx.at(0, i as isize);
        let base = ctx.at(0, i as isize - self.lookback as isize);
        if current.is_nan() || base.is_nan() {
            return;
        }
        let up = (current - base).max(0.0);
        let down = (base - current).max(0.0);

        if self.seeded < self.period {
            self.seed_up += up;
            self.seed_down += down;
            self.seeded += 1;
            if self.seeded == self.period {
                self.up_smma = self.seed_up / self.period as f64;
                self.down_smma = self.seed_down / self.period as f64;
                self.write(out, i);
            }
            return;
        }

        let p = self.period as f64;
        self.up_smma = (self.up_smma * (p - 1.0) + up) / p;
        self.down_smma = (self.down_smma * (p - 1.0) + down) / p;
        self.write(out, i);
    }
}

use crate::arena::Ctx;
use crate::indicator::Indicator;
use crate::series::LineSeries;

/// Positive part of the one-bar difference: `max(0, x[t] - x[t-1])`.
#[derive(Debug, Clone)]
pub struct UpMove;

impl UpMove {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UpMove {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for UpMove {
    fn line_names(&self) -> &'static [&'static str] {
        &["upmove"]
    }

    fn min_period(&self) -> usize {
        2
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        let current = ctx.at(0, i as isize);
        let previous = ctx.at(0, i as isize - 1);
        if current.is_nan() || previous.is_nan() {
            return;
        }
        out.set_abs(0, i, (current - previous).max(0.0));
    }
}

/// Positive part of the one-bar fall: `max(0, x[t-1] - x[t])`.
#[derive(Debug, Clone)]
pub struct DownMove;

impl DownMove {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DownMove {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for DownMove {
    fn line_names(&self) -> &'static [&'static str] {
        &["downmove"]
    }

    fn min_period(&self) -> usize {
        2
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        let current = ctx.at(0, i as isize);
        let previous = ctx.at(0, i as isize - 1);
        if current.is_nan() || previous.is_nan() {
            return;
        }
        out.set_abs(0, i, (previous - current).max(0.0));
    }
}

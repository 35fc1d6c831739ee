use crate::observer::{ObsCtx, Observer};
use barlab_ta::series::LineSeries;

/// Broker cash and total portfolio value, per bar.
#[derive(Debug, Clone, Default)]
pub struct CashValue;

impl CashValue {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for CashValue {
    fn line_names(&self) -> &'static [&'static str] {
        &["cash", "value"]
    }

    fn next(&mut self, ctx: &ObsCtx<'_>, out: &mut LineSeries) {
        out.set(0, 0, ctx.cash);
        out.set(1, 0, ctx.value);
    }
}

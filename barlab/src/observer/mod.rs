use crate::broker::BrokerNotification;
use barlab_ta::series::LineSeries;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

mod buysell;
mod cashvalue;
mod drawdown;
mod trades;

pub use buysell::BuySell;
pub use cashvalue::CashValue;
pub use drawdown::DrawDown;
pub use trades::TradesPnl;

/// Per-bar snapshot handed to observers and analyzers after the broker
/// step: broker marks plus everything the broker emitted this bar.
///
/// Observers receive broker state by injection only; the flow is strictly
/// broker to observer, never back.
#[derive(Debug, Copy, Clone)]
pub struct ObsCtx<'a> {
    pub bar_index: usize,
    pub time: DateTime<Utc>,
    pub cash: f64,
    pub value: f64,
    pub notifications: &'a [BrokerNotification],
}

/// Indicator-shaped consumer of broker state: one or more output lines
/// computed once per engine bar.
pub trait Observer: Debug {
    fn line_names(&self) -> &'static [&'static str];

    fn start(&mut self, starting_cash: f64) {
        let _ = starting_cash;
    }

    /// Compute this bar's outputs; the engine has already appended a NaN
    /// row to `out`.
    fn next(&mut self, ctx: &ObsCtx<'_>, out: &mut LineSeries);
}

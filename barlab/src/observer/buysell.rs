use crate::broker::BrokerNotification;
use crate::data::DataId;
use crate::observer::{ObsCtx, Observer};
use crate::order::OrderStatus;
use barlab_ta::series::LineSeries;

/// Executed buy/sell prices on one data, per bar.
///
/// NaN on bars without executions; the last fill of the bar wins when
/// several land on the same side.
#[derive(Debug, Clone)]
pub struct BuySell {
    data: DataId,
}

impl BuySell {
    pub fn new(data: DataId) -> Self {
        Self { data }
    }
}

impl Observer for BuySell {
    fn line_names(&self) -> &'static [&'static str] {
        &["buy", "sell"]
    }

    fn next(&mut self, ctx: &ObsCtx<'_>, out: &mut LineSeries) {
        for notification in ctx.notifications {
            let BrokerNotification::Order(order) = notification else {
                continue;
            };
            if order.data != self.data
                || !matches!(order.status, OrderStatus::Partial | OrderStatus::Completed)
            {
                continue;
            }
            if let Some(bit) = order.executed.bits.last() {
                let line = if bit.size > 0.0 { 0 } else { 1 };
                out.set(line, 0, bit.price);
            }
        }
    }
}

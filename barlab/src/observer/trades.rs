use crate::broker::BrokerNotification;
use crate::observer::{ObsCtx, Observer};
use barlab_ta::series::LineSeries;

/// Realized net PnL of trades closed this bar, split into winning and
/// losing lines.
#[derive(Debug, Clone, Default)]
pub struct TradesPnl;

impl TradesPnl {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for TradesPnl {
    fn line_names(&self) -> &'static [&'static str] {
        &["pnlplus", "pnlminus"]
    }

    fn next(&mut self, ctx: &ObsCtx<'_>, out: &mut LineSeries) {
        for notification in ctx.notifications {
            let BrokerNotification::Trade(trade) = notification else {
                continue;
            };
            if !trade.is_closed() {
                continue;
            }
            let line = if trade.pnlcomm >= 0.0 { 0 } else { 1 };
            out.set(line, 0, trade.pnlcomm);
        }
    }
}

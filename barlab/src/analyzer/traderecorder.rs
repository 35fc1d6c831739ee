use crate::analyzer::Analyzer;
use crate::trade::Trade;
use serde::Serialize;

/// Tally of closed trades: counts, win/loss split, gross and net PnL.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TradeStats {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub pnl_gross: f64,
    pub pnl_net: f64,
    pub won_pnl: f64,
    pub lost_pnl: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TradeRecorder {
    stats: TradeStats,
}

impl TradeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &TradeStats {
        &self.stats
    }
}

impl Analyzer for TradeRecorder {
    fn name(&self) -> &'static str {
        "trades"
    }

    fn notify_trade(&mut self, trade: &Trade) {
        if !trade.is_closed() {
            return;
        }
        self.stats.total += 1;
        self.stats.pnl_gross += trade.pnl;
        self.stats.pnl_net += trade.pnlcomm;
        if trade.pnlcomm >= 0.0 {
            self.stats.won += 1;
            self.stats.won_pnl += trade.pnlcomm;
        } else {
            self.stats.lost += 1;
            self.stats.lost_pnl += trade.pnlcomm;
        }
    }

    fn analysis(&self) -> serde_json::Value {
        serde_json::to_value(&self.stats).unwrap_or(serde_json::Value::Null)
    }
}

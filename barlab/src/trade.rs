use crate::data::DataId;
use crate::order::OrderId;
use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Monotonic unique trade identifier.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
    Constructor,
    Display,
)]
pub struct TradeId(pub u64);

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum TradeStatus {
    Created,
    Open,
    Closed,
}

/// Snapshot of a [`Trade`] after one update, plus the fill that caused it.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeHistory {
    pub status: TradeStatus,
    pub time: DateTime<Utc>,
    pub barlen: usize,
    pub size: f64,
    pub price: f64,
    pub value: f64,
    pub pnl: f64,
    pub pnlcomm: f64,
    pub event_order: OrderId,
    pub event_size: f64,
    pub event_price: f64,
    pub event_commission: f64,
}

/// Lifecycle of one position on one instrument, from the first fill that
/// moves net exposure away from zero to the fill that returns it to zero.
///
/// Adding exposure re-weights `price` by size; reducing leaves it
/// untouched; flattening closes the trade and stamps `time_close`. Every
/// update appends a [`TradeHistory`] record, so the final record of a
/// closed trade always carries `TradeStatus::Closed`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub data: DataId,
    pub status: TradeStatus,
    /// Signed net size.
    pub size: f64,
    /// Size-weighted average entry price of the open exposure.
    pub price: f64,
    /// Notional of the open exposure (`price * size`).
    pub value: f64,
    pub commission: f64,
    /// Realised gross PnL accumulated by reducing fills.
    pub pnl: f64,
    /// `pnl - commission`.
    pub pnlcomm: f64,
    pub is_long: bool,
    pub bar_open: usize,
    pub bar_close: Option<usize>,
    pub time_open: Option<DateTime<Utc>>,
    pub time_close: Option<DateTime<Utc>>,
    /// Bars held so far (updated on every fill).
    pub barlen: usize,
    pub just_opened: bool,
    pub history: Vec<TradeHistory>,
}

impl Trade {
    pub fn new(id: TradeId, data: DataId) -> Self {
        Self {
            id,
            data,
            status: TradeStatus::Created,
            size: 0.0,
            price: 0.0,
            value: 0.0,
            commission: 0.0,
            pnl: 0.0,
            pnlcomm: 0.0,
            is_long: true,
            bar_open: 0,
            bar_close: None,
            time_open: None,
            time_close: None,
            barlen: 0,
            just_opened: false,
            history: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Apply one fill.
    ///
    /// `pnl` is the realised gross profit of the portion this fill closed
    /// (zero for fills that only add exposure), as computed by the broker's
    /// commission scheme against the pre-fill entry price.
    pub fn update(
        &mut self,
        order: OrderId,
        size: f64,
        price: f64,
        commission: f64,
        pnl: f64,
        time: DateTime<Utc>,
        bar: usize,
    ) {
        debug_assert!(size != 0.0, "trade update with zero size");
        let before = self.size;
        self.size += size;
        self.commission += commission;
        self.pnl += pnl;
        self.pnlcomm = self.pnl - self.commission;

        if before == 0.0 {
            // Opening fill
            self.status = TradeStatus::Open;
            self.price = price;
            self.is_long = size > 0.0;
            self.bar_open = bar;
            self.time_open = Some(time);
            self.just_opened = true;
        } else {
            self.just_opened = false;
            if (before > 0.0) == (size > 0.0) {
                // Adding exposure: size-weighted average entry
                self.price = (self.price * before + price * size) / self.size;
            }
            // Reducing fills leave the entry price untouched
        }

        self.barlen = bar - self.bar_open;
        self.value = self.price * self.size;

        if self.size == 0.0 {
            self.status = TradeStatus::Closed;
            self.bar_close = Some(bar);
            self.time_close = Some(time);
        }

        self.history.push(TradeHistory {
            status: self.status,
            time,
            barlen: self.barlen,
            size: self.size,
            price: self.price,
            value: self.value,
            pnl: self.pnl,
            pnlcomm: self.pnlcomm,
            event_order: order,
            event_size: size,
            event_price: price,
            event_commission: commission,
        });
    }
}

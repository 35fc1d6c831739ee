use crate::data::{Bar, DataId};
use crate::order::{ExecutionBit, Order, OrderData, OrderId, OrderKind, OrderRequest, OrderStatus};
use crate::position::Position;
use crate::trade::{Trade, TradeId};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Commission contracts between broker and instruments.
pub mod commission;

/// Partial-fill policies.
pub mod fillers;

pub use commission::{CommissionInfo, CommissionScheme};
pub use fillers::{BarPointPerc, Filler, FixedBarPerc, FixedSize};

/// Everything the broker tells the outside world, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerNotification {
    Order(Order),
    Trade(Trade),
    CashValue { cash: f64, value: f64 },
}

/// One data feed's bar for a broker step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BrokerBar {
    pub data: DataId,
    pub bar: Bar,
    /// Bar count of this data (0-based index of `bar`).
    pub index: usize,
    /// Whether this data produced a new or updated bar this step; orders
    /// only match against advanced bars, but all bars mark value.
    pub advanced: bool,
}

/// The simulated broker.
///
/// Matches live orders against each new bar of their data, applies
/// commissions and fillers, maintains cash, positions and trade
/// lifecycles, and queues notifications for the engine to deliver.
///
/// Cancellation is deferred: a cancel request is applied at the end of the
/// broker step, so an order that was already matchable on the current bar
/// may still fill before the cancellation lands.
#[derive(Debug)]
pub struct BacktestBroker {
    cash: f64,
    starting_cash: f64,
    value: f64,
    next_order_id: u64,
    next_trade_id: u64,
    orders: FnvHashMap<OrderId, Order>,
    /// Alive orders in submission order (ascending id): the FIFO tie-break.
    pending: Vec<OrderId>,
    cancel_queue: Vec<OrderId>,
    positions: FnvHashMap<DataId, Position>,
    open_trades: FnvHashMap<DataId, Trade>,
    closed_trades: Vec<Trade>,
    notifications: VecDeque<BrokerNotification>,
    commission: Box<dyn CommissionInfo>,
    commission_per_data: FnvHashMap<DataId, Box<dyn CommissionInfo>>,
    filler: Option<Box<dyn Filler>>,
    check_submit: bool,
}

impl Default for BacktestBroker {
    fn default() -> Self {
        Self::new(10_000.0)
    }
}

impl BacktestBroker {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            starting_cash: cash,
            value: cash,
            next_order_id: 1,
            next_trade_id: 1,
            orders: FnvHashMap::default(),
            pending: Vec::new(),
            cancel_queue: Vec::new(),
            positions: FnvHashMap::default(),
            open_trades: FnvHashMap::default(),
            closed_trades: Vec::new(),
            notifications: VecDeque::new(),
            commission: Box::new(CommissionScheme::default()),
            commission_per_data: FnvHashMap::default(),
            filler: None,
            check_submit: true,
        }
    }

    pub fn set_cash(&mut self, cash: f64) {
        self.cash = cash;
        self.starting_cash = cash;
        self.value = cash;
    }

    pub fn set_commission(&mut self, commission: Box<dyn CommissionInfo>) {
        self.commission = commission;
    }

    pub fn set_commission_for(&mut self, data: DataId, commission: Box<dyn CommissionInfo>) {
        self.commission_per_data.insert(data, commission);
    }

    pub fn set_filler(&mut self, filler: Box<dyn Filler>) {
        self.filler = Some(filler);
    }

    /// Toggle the notional cash reservation check at submission.
    pub fn set_check_submit(&mut self, check: bool) {
        self.check_submit = check;
    }

    pub fn get_cash(&self) -> f64 {
        self.cash
    }

    /// Portfolio value as of the last broker step.
    pub fn get_value(&self) -> f64 {
        self.value
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn get_position(&self, data: DataId) -> Position {
        self.positions.get(&data).copied().unwrap_or_default()
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn closed_trades(&self) -> &[Trade] {
        &self.closed_trades
    }

    /// The currently open trade on `data`, if any.
    pub fn open_trade(&self, data: DataId) -> Option<&Trade> {
        self.open_trades.get(&data)
    }

    fn comm_for(&self, data: DataId) -> &dyn CommissionInfo {
        self.commission_per_data
            .get(&data)
            .map_or(self.commission.as_ref(), Box::as_ref)
    }

    fn notify_order(&mut self, order: &Order) {
        self.notifications
            .push_back(BrokerNotification::Order(order.clone()));
    }

    /// Submit an order built from `request`.
    ///
    /// `ref_price` (usually the data's current close) prices the cash
    /// reservation for market orders and seeds trailing stops. The order is
    /// validated, cash-checked, and either queued as Accepted or finalised
    /// as Rejected/Margin; every transition is notified.
    pub fn submit(
        &mut self,
        request: OrderRequest,
        ref_price: f64,
        time: DateTime<Utc>,
    ) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;

        let est_price = request.price.unwrap_or(ref_price);
        let mut order = Order {
            id,
            data: request.data,
            size: request.size,
            price: request.price,
            price_limit: request.price_limit,
            trail_amount: request.trail_amount,
            trail_percent: request.trail_percent,
            kind: request.kind,
            status: OrderStatus::Created,
            parent: request.parent,
            valid: request.valid,
            created: OrderData {
                time: Some(time),
                size: request.size,
                price: est_price,
                remaining: request.size,
                ..OrderData::default()
            },
            executed: OrderData {
                remaining: request.size,
                ..OrderData::default()
            },
            trail_price: None,
            triggered: false,
        };

        if order.size == 0.0 || !order.size.is_finite() {
            warn!(order = %id, size = order.size, "rejecting order with invalid size");
            order.status = OrderStatus::Rejected;
            self.notify_order(&order);
            self.orders.insert(id, order);
            return id;
        }

        let missing_price = match order.kind {
            OrderKind::Limit => order.price.is_none(),
            OrderKind::Stop => {
                order.price.is_none()
                    && order.trail_amount.is_none()
                    && order.trail_percent.is_none()
            }
            OrderKind::StopLimit => order.price.is_none() || order.price_limit.is_none(),
            OrderKind::Market | OrderKind::Close => false,
        };
        if missing_price {
            warn!(order = %id, kind = %order.kind, "rejecting order without a price");
            order.status = OrderStatus::Rejected;
            self.notify_order(&order);
            self.orders.insert(id, order);
            return id;
        }

        if self.check_submit {
            let comminfo = self.comm_for(order.data);
            let cost = order.size * est_price + comminfo.commission(order.size, est_price);
            if cost > self.cash {
                debug!(order = %id, cost, cash = self.cash, "order exceeds available cash");
                order.status = OrderStatus::Margin;
                self.notify_order(&order);
                self.orders.insert(id, order);
                return id;
            }
        }

        if order.trail_amount.is_some() || order.trail_percent.is_some() {
            order.trail_price = Some(initial_trail(&order, ref_price));
        }

        order.status = OrderStatus::Submitted;
        self.notify_order(&order);
        order.status = OrderStatus::Accepted;
        self.notify_order(&order);

        debug!(order = %id, data = %order.data, size = order.size, kind = %order.kind, "order accepted");
        self.pending.push(id);
        self.orders.insert(id, order);
        id
    }

    /// Request cancellation; applied at the end of the next broker step.
    pub fn cancel(&mut self, id: OrderId) {
        self.cancel_queue.push(id);
    }

    /// One broker step: match every pending order against its data's
    /// current bar, then apply queued cancellations, then mark value.
    pub fn next(&mut self, bars: &[BrokerBar]) {
        for broker_bar in bars.iter().filter(|b| b.advanced) {
            let candidates: Vec<OrderId> = self
                .pending
                .iter()
                .copied()
                .filter(|id| {
                    self.orders
                        .get(id)
                        .is_some_and(|o| o.data == broker_bar.data)
                })
                .collect();

            for id in candidates {
                self.step_order(id, broker_bar);
            }
        }

        // Deferred cancellations land after matching: an order matchable on
        // this bar has already filled
        let cancels = std::mem::take(&mut self.cancel_queue);
        for id in cancels {
            if let Some(order) = self.orders.get_mut(&id) {
                if order.alive() {
                    order.status = OrderStatus::Canceled;
                    let snapshot = order.clone();
                    self.remove_pending(id);
                    self.notify_order(&snapshot);
                    info!(order = %id, "order canceled");
                }
            }
        }

        self.value = self.cash
            + bars
                .iter()
                .map(|b| {
                    let position = self.get_position(b.data);
                    self.comm_for(b.data)
                        .position_value(position.size, b.bar.close)
                })
                .sum::<f64>();
        self.notifications.push_back(BrokerNotification::CashValue {
            cash: self.cash,
            value: self.value,
        });
    }

    fn step_order(&mut self, id: OrderId, broker_bar: &BrokerBar) {
        let Some(mut order) = self.orders.remove(&id) else {
            return;
        };
        if !order.alive() {
            self.orders.insert(id, order);
            return;
        }

        let bar = &broker_bar.bar;

        // 1. Expiry before anything else
        if let Some(valid) = order.valid {
            if bar.time > valid {
                order.status = OrderStatus::Expired;
                self.remove_pending(id);
                self.notify_order(&order);
                self.orders.insert(id, order);
                return;
            }
        }

        // 2. Price discovery per order kind
        if let Some(price) = match_price(&mut order, bar) {
            let remaining_abs = order.remaining().abs();
            let fill_abs = match &self.filler {
                Some(filler) => filler.fill_size(&order, price, bar).min(remaining_abs),
                None => remaining_abs,
            };
            if fill_abs > 0.0 {
                self.apply_fill(&mut order, price, fill_abs, broker_bar);
            }
        }

        // 3. Trailing stops re-arm from this bar's extremes (post-fill)
        if order.alive() && (order.trail_amount.is_some() || order.trail_percent.is_some()) {
            update_trail(&mut order, bar);
        }

        self.orders.insert(id, order);
    }

    /// Execution effects of one (possibly partial) fill.
    fn apply_fill(&mut self, order: &mut Order, price: f64, fill_abs: f64, broker_bar: &BrokerBar) {
        let data = order.data;
        let bar = &broker_bar.bar;
        let size = if order.is_buy() { fill_abs } else { -fill_abs };

        let comminfo = self.comm_for(data);
        let commission = comminfo.commission(size, price);

        let position = self.positions.entry(data).or_default();
        let split = position.update(size, price);
        let psize = position.size;
        let pprice = position.price;

        let pnl = if split.closed != 0.0 {
            self.comm_for(data)
                .profit_and_loss(-split.closed, split.price_before, price)
        } else {
            0.0
        };

        self.cash -= size * price + commission;

        order.executed.add_bit(ExecutionBit::new(
            bar.time, size, price, size * price, commission, pnl, psize, pprice,
        ));
        order.status = if order.is_filled() {
            self.remove_pending(order.id);
            OrderStatus::Completed
        } else {
            OrderStatus::Partial
        };

        info!(
            order = %order.id,
            data = %data,
            size,
            price,
            status = %order.status,
            "order executed"
        );

        // Trade bookkeeping; a fill flipping through zero splits notionally:
        // the closing portion ends the old trade at the fill price, the
        // opening portion starts the next one at the same price
        if split.closed != 0.0 {
            let fraction = split.closed.abs() / size.abs();
            if let Some(trade) = self.open_trades.get_mut(&data) {
                trade.update(
                    order.id,
                    split.closed,
                    price,
                    commission * fraction,
                    pnl,
                    bar.time,
                    broker_bar.index,
                );
                if trade.is_closed() {
                    let done = self
                        .open_trades
                        .remove(&data)
                        .unwrap_or_else(|| unreachable!("trade present above"));
                    self.notifications
                        .push_back(BrokerNotification::Trade(done.clone()));
                    self.closed_trades.push(done);
                }
            } else {
                warn!(data = %data, "closing fill without an open trade");
            }
        }
        if split.opened != 0.0 {
            let fraction = split.opened.abs() / size.abs();
            let trade = self.open_trades.entry(data).or_insert_with(|| {
                let id = TradeId(self.next_trade_id);
                self.next_trade_id += 1;
                Trade::new(id, data)
            });
            trade.update(
                order.id,
                split.opened,
                price,
                commission * fraction,
                0.0,
                bar.time,
                broker_bar.index,
            );
            if trade.just_opened {
                let snapshot = trade.clone();
                self.notifications
                    .push_back(BrokerNotification::Trade(snapshot));
            }
        }

        let snapshot = order.clone();
        self.notify_order(&snapshot);
    }

    fn remove_pending(&mut self, id: OrderId) {
        self.pending.retain(|p| *p != id);
    }

    /// Drain queued notifications in emission order.
    pub fn drain_notifications(&mut self) -> Vec<BrokerNotification> {
        self.notifications.drain(..).collect()
    }
}

/// Execution price of `order` against `bar`, if it matches.
///
/// Implements the per-kind matching rules: Market at the open, Close at
/// the close, Limit with open-gap price improvement, Stop triggering at
/// market, StopLimit converting to a Limit from the trigger bar onwards
/// (the trigger price acting as that bar's effective open).
fn match_price(order: &mut Order, bar: &Bar) -> Option<f64> {
    let buy = order.is_buy();
    match order.kind {
        OrderKind::Market => Some(bar.open),
        OrderKind::Close => Some(bar.close),
        OrderKind::Limit => {
            let limit = order.price?;
            limit_price(buy, limit, bar.open, bar.high, bar.low)
        }
        OrderKind::Stop => {
            let stop = order.trail_price.or(order.price)?;
            stop_price(buy, stop, bar.open, bar.high, bar.low)
        }
        OrderKind::StopLimit => {
            if order.triggered {
                let limit = order.price_limit?;
                limit_price(buy, limit, bar.open, bar.high, bar.low)
            } else {
                let stop = order.trail_price.or(order.price)?;
                let trigger = stop_price(buy, stop, bar.open, bar.high, bar.low)?;
                order.triggered = true;
                let limit = order.price_limit?;
                limit_price(buy, limit, trigger, bar.high, bar.low)
            }
        }
    }
}

fn limit_price(buy: bool, limit: f64, open: f64, high: f64, low: f64) -> Option<f64> {
    if buy {
        if open <= limit {
            Some(open)
        } else if low <= limit {
            Some(limit)
        } else {
            None
        }
    } else if open >= limit {
        Some(open)
    } else if high >= limit {
        Some(limit)
    } else {
        None
    }
}

fn stop_price(buy: bool, stop: f64, open: f64, high: f64, low: f64) -> Option<f64> {
    if buy {
        if open >= stop {
            Some(open)
        } else if high >= stop {
            Some(stop)
        } else {
            None
        }
    } else if open <= stop {
        Some(open)
    } else if low <= stop {
        Some(stop)
    } else {
        None
    }
}

fn initial_trail(order: &Order, ref_price: f64) -> f64 {
    trail_level(order, ref_price, ref_price)
}

/// Stop level implied by a favorable extreme.
fn trail_level(order: &Order, high: f64, low: f64) -> f64 {
    if order.is_sell() {
        // Protective stop under the price, ratcheting up with highs
        if let Some(amount) = order.trail_amount {
            high - amount
        } else {
            high * (1.0 - order.trail_percent.unwrap_or(0.0) / 100.0)
        }
    } else {
        // Protective stop above the price, ratcheting down with lows
        if let Some(amount) = order.trail_amount {
            low + amount
        } else {
            low * (1.0 + order.trail_percent.unwrap_or(0.0) / 100.0)
        }
    }
}

fn update_trail(order: &mut Order, bar: &Bar) {
    let candidate = trail_level(order, bar.high, bar.low);
    let current = order.trail_price.unwrap_or(candidate);
    order.trail_price = Some(if order.is_sell() {
        current.max(candidate)
    } else {
        current.min(candidate)
    });
}

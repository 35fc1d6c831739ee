use crate::broker::BacktestBroker;
use crate::data::DataId;
use crate::engine::SetupCtx;
use crate::error::EngineError;
use crate::order::{OrderId, OrderRequest};
use crate::position::Position;
use crate::trade::Trade;
use barlab_ta::arena::{SeriesArena, SeriesId};
use barlab_ta::series::{DataSeries, LineSeries};
use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Debug;

/// Index of a registered indicator node.
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
pub struct IndicatorId(pub usize);

/// Strategy-visible binding of a data feed slot.
#[derive(Debug, Clone)]
pub struct DataBinding {
    pub id: DataId,
    pub series: SeriesId,
    pub name: SmolStr,
}

/// Strategy-visible binding of an indicator node.
#[derive(Debug, Clone)]
pub struct IndicatorBinding {
    pub output: SeriesId,
    pub min_period: usize,
}

/// Read view over one indicator's output lines.
#[derive(Debug, Copy, Clone)]
pub struct IndicatorView<'a> {
    series: &'a LineSeries,
    min_period: usize,
}

impl IndicatorView<'_> {
    /// Cursor-relative read of output line `line`.
    pub fn get(&self, line: usize, ago: isize) -> f64 {
        self.series.get(line, ago)
    }

    /// First output line at offset `ago`.
    pub fn value(&self, ago: isize) -> f64 {
        self.get(0, ago)
    }

    pub fn min_period(&self) -> usize {
        self.min_period
    }

    pub fn size(&self) -> usize {
        self.series.size()
    }
}

/// Per-bar context handed to strategy hooks: data views, indicator views,
/// broker queries and order helpers.
#[derive(Debug)]
pub struct StrategyCtx<'a> {
    arena: &'a SeriesArena,
    datas: &'a [DataBinding],
    indicators: &'a [IndicatorBinding],
    broker: &'a mut BacktestBroker,
    time: DateTime<Utc>,
    bar_index: usize,
}

impl<'a> StrategyCtx<'a> {
    pub fn new(
        arena: &'a SeriesArena,
        datas: &'a [DataBinding],
        indicators: &'a [IndicatorBinding],
        broker: &'a mut BacktestBroker,
        time: DateTime<Utc>,
        bar_index: usize,
    ) -> Self {
        Self {
            arena,
            datas,
            indicators,
            broker,
            time,
            bar_index,
        }
    }

    /// Engine bar index on the strategy clock (first data).
    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    /// Timestamp of the current bar on the strategy clock.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn num_datas(&self) -> usize {
        self.datas.len()
    }

    pub fn data(&self, id: DataId) -> DataSeries<'a> {
        DataSeries::new(self.arena.series(self.datas[id.0].series))
    }

    /// The strategy clock data.
    pub fn data0(&self) -> DataSeries<'a> {
        self.data(DataId(0))
    }

    pub fn ind(&self, id: IndicatorId) -> IndicatorView<'a> {
        let binding = &self.indicators[id.0];
        IndicatorView {
            series: self.arena.series(binding.output),
            min_period: binding.min_period,
        }
    }

    pub fn cash(&self) -> f64 {
        self.broker.get_cash()
    }

    pub fn value(&self) -> f64 {
        self.broker.get_value()
    }

    pub fn position(&self, data: DataId) -> Position {
        self.broker.get_position(data)
    }

    /// Submit an arbitrary order.
    pub fn order(&mut self, request: OrderRequest) -> OrderId {
        let ref_price = self.data(request.data).close(0);
        self.broker.submit(request, ref_price, self.time)
    }

    /// Market buy.
    pub fn buy(&mut self, data: DataId, size: f64) -> OrderId {
        self.order(OrderRequest::market(data, size.abs()))
    }

    /// Market sell.
    pub fn sell(&mut self, data: DataId, size: f64) -> OrderId {
        self.order(OrderRequest::market(data, -size.abs()))
    }

    pub fn buy_limit(&mut self, data: DataId, size: f64, price: f64) -> OrderId {
        self.order(OrderRequest::limit(data, size.abs(), price))
    }

    pub fn sell_limit(&mut self, data: DataId, size: f64, price: f64) -> OrderId {
        self.order(OrderRequest::limit(data, -size.abs(), price))
    }

    /// Flatten the current position with a market order.
    pub fn close(&mut self, data: DataId) -> Option<OrderId> {
        let position = self.broker.get_position(data);
        if position.size == 0.0 {
            return None;
        }
        Some(self.order(OrderRequest::market(data, -position.size)))
    }

    /// Request cancellation; applied at the next broker step, so a
    /// matchable order may still fill on the current bar.
    pub fn cancel(&mut self, id: OrderId) {
        self.broker.cancel(id);
    }
}

/// A user-defined trading strategy.
///
/// The engine drives the lifecycle: `init` (register indicators), `start`,
/// then per bar `prenext` while below the strategy min-period, exactly one
/// `nextstart` at the boundary, `next` afterwards, and finally `stop`.
/// Broker events arrive through the `notify_*` hooks after observers and
/// analyzers have seen the bar.
#[allow(unused_variables)]
pub trait Strategy: Debug {
    /// Register indicators and capture their ids. Runs once at bootstrap.
    fn init(&mut self, ctx: &mut SetupCtx<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    fn start(&mut self) {}

    /// Called per bar while the strategy clock is below the min-period.
    fn prenext(&mut self, ctx: &mut StrategyCtx<'_>) {}

    /// Called exactly once when the min-period is first satisfied.
    fn nextstart(&mut self, ctx: &mut StrategyCtx<'_>) {
        self.next(ctx);
    }

    /// Called per bar once warmed up; may submit orders.
    fn next(&mut self, ctx: &mut StrategyCtx<'_>) {}

    fn stop(&mut self, ctx: &mut StrategyCtx<'_>) {}

    fn notify_order(&mut self, order: &crate::order::Order) {}

    fn notify_trade(&mut self, trade: &Trade) {}

    fn notify_cash_value(&mut self, cash: f64, value: f64) {}
}

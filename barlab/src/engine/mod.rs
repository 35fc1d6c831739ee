use crate::analyzer::Analyzer;
use crate::broker::{BacktestBroker, BrokerBar, BrokerNotification};
use crate::data::{Bar, BarFeed, DataId, FeedEvent, FeedPoll, ResampleParams};
use crate::data::resample::{ReplayedFeed, ResampledFeed};
use crate::error::{EngineError, GraphError};
use crate::observer::{ObsCtx, Observer};
use crate::strategy::{DataBinding, IndicatorBinding, IndicatorId, Strategy, StrategyCtx};
use barlab_ta::arena::{Ctx, LineRef, SeriesArena, SeriesId};
use barlab_ta::indicator::{propagate_min_period, BindError, Indicator};
use barlab_ta::series::{self, DataSlot, LineSeries};
use chrono::DateTime;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// One indicator mounted into the series graph.
#[derive(Debug)]
struct IndicatorNode {
    kernel: Box<dyn Indicator>,
    inputs: Vec<LineRef>,
    output: SeriesId,
    /// The node advances when this series grows (its first input's series).
    clock: SeriesId,
}

#[derive(Debug)]
struct FeedSlot {
    feed: Box<dyn BarFeed>,
    data: DataId,
    series: SeriesId,
    exhausted: bool,
    current: Option<Bar>,
    advanced: bool,
    replaced: bool,
}

#[derive(Debug)]
struct StrategySlot {
    strategy: Box<dyn Strategy>,
    min_period: usize,
    /// `nextstart` fires exactly once, even when replay re-delivers bars at
    /// the boundary length.
    warmed: bool,
}

#[derive(Debug)]
struct ObserverSlot {
    observer: Box<dyn Observer>,
    lines: LineSeries,
}

/// Bars recorded during preload, replayed by the batch sweep.
#[derive(Debug, Clone)]
struct TimelineEntry {
    slot: usize,
    bar: Bar,
    index: usize,
}

/// Registration context handed to [`Strategy::init`].
#[derive(Debug)]
pub struct SetupCtx<'a> {
    arena: &'a mut SeriesArena,
    datas: &'a [DataBinding],
    nodes: &'a mut Vec<IndicatorNode>,
    bindings: &'a mut Vec<IndicatorBinding>,
    series_min_periods: &'a mut Vec<usize>,
}

impl SetupCtx<'_> {
    pub fn num_datas(&self) -> usize {
        self.datas.len()
    }

    /// One line of a data feed, addressable as an indicator input.
    pub fn line(&self, data: DataId, slot: DataSlot) -> LineRef {
        LineRef::new(self.datas[data.0].series, slot.index())
    }

    /// The `(high, low, close)` triple most OHLC indicators consume.
    pub fn ohlc_lines(&self, data: DataId) -> Vec<LineRef> {
        vec![
            self.line(data, DataSlot::High),
            self.line(data, DataSlot::Low),
            self.line(data, DataSlot::Close),
        ]
    }

    /// A line of a previously registered indicator, for composition.
    pub fn indicator_line(&self, id: IndicatorId, line: usize) -> LineRef {
        LineRef::new(self.bindings[id.0].output, line)
    }

    /// Mount `kernel` over `inputs`, allocating its output series and
    /// propagating the min-period bottom-up.
    pub fn indicator(
        &mut self,
        kernel: Box<dyn Indicator>,
        inputs: Vec<LineRef>,
    ) -> Result<IndicatorId, EngineError> {
        if inputs.len() != kernel.num_inputs() {
            return Err(BindError::InputCount {
                expected: kernel.num_inputs(),
                got: inputs.len(),
            }
            .into());
        }
        for input in &inputs {
            if !self.arena.contains(input.series) {
                return Err(BindError::UnknownSeries {
                    series: input.series.0,
                }
                .into());
            }
            let lines = self.arena.series(input.series).num_lines();
            if input.line >= lines {
                return Err(BindError::UnknownLine {
                    line: input.line,
                    lines,
                }
                .into());
            }
        }

        let input_min_periods: Vec<usize> = inputs
            .iter()
            .map(|input| self.series_min_periods[input.series.0])
            .collect();
        let min_period = propagate_min_period(&input_min_periods, kernel.min_period());

        let output = self
            .arena
            .alloc(LineSeries::new(kernel.line_names().iter().copied()));
        self.series_min_periods.push(min_period);

        let clock = inputs[0].series;
        let id = IndicatorId(self.nodes.len());
        self.nodes.push(IndicatorNode {
            kernel,
            inputs,
            output,
            clock,
        });
        self.bindings.push(IndicatorBinding { output, min_period });
        Ok(id)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Bars processed on the strategy clock (first data).
    pub bars: usize,
    pub final_cash: f64,
    pub final_value: f64,
    /// Analyzer results keyed by analyzer name.
    pub analyses: IndexMap<String, serde_json::Value>,
}

/// Top-level driver: owns the series graph, data feeds, strategies,
/// broker, observers and analyzers, and runs the per-bar loop.
///
/// Per bar, in this fixed order: feeds advance, resamplers aggregate,
/// indicators update in topological order, strategies run
/// (prenext/nextstart/next by min-period), the broker matches pending
/// orders against the bar just advanced, observers and analyzers see the
/// bar, and queued notifications are delivered.
#[derive(Debug)]
pub struct Cerebro {
    arena: SeriesArena,
    feeds: Vec<FeedSlot>,
    datas: Vec<DataBinding>,
    nodes: Vec<IndicatorNode>,
    bindings: Vec<IndicatorBinding>,
    series_min_periods: Vec<usize>,
    topo: Vec<usize>,
    strategies: Vec<StrategySlot>,
    observers: Vec<ObserverSlot>,
    analyzers: Vec<Box<dyn Analyzer>>,
    broker: BacktestBroker,
    run_once: bool,
    strict_data: bool,
    run_id: Uuid,
}

impl Default for Cerebro {
    fn default() -> Self {
        Self::new()
    }
}

impl Cerebro {
    pub fn new() -> Self {
        Self {
            arena: SeriesArena::new(),
            feeds: Vec::new(),
            datas: Vec::new(),
            nodes: Vec::new(),
            bindings: Vec::new(),
            series_min_periods: Vec::new(),
            topo: Vec::new(),
            strategies: Vec::new(),
            observers: Vec::new(),
            analyzers: Vec::new(),
            broker: BacktestBroker::default(),
            run_once: true,
            strict_data: false,
            run_id: Uuid::new_v4(),
        }
    }

    /// Mount a data feed; the first one becomes the strategy clock.
    pub fn add_data(&mut self, feed: Box<dyn BarFeed>) -> DataId {
        let series = self.arena.alloc(series::ohlcv_series());
        self.series_min_periods.push(1);
        let data = DataId(self.feeds.len());
        self.datas.push(DataBinding {
            id: data,
            series,
            name: feed.name().into(),
        });
        self.feeds.push(FeedSlot {
            feed,
            data,
            series,
            exhausted: false,
            current: None,
            advanced: false,
            replaced: false,
        });
        data
    }

    /// Mount `feed` re-binned to a coarser timeframe.
    pub fn resample_data(&mut self, feed: Box<dyn BarFeed>, params: ResampleParams) -> DataId {
        self.add_data(Box::new(ResampledFeed::new(feed, params)))
    }

    /// Mount `feed` replayed at a coarser timeframe (transient bars).
    pub fn replay_data(&mut self, feed: Box<dyn BarFeed>, params: ResampleParams) -> DataId {
        self.add_data(Box::new(ReplayedFeed::new(feed, params)))
    }

    pub fn add_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.push(StrategySlot {
            strategy,
            min_period: 1,
            warmed: false,
        });
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        let lines = LineSeries::new(observer.line_names().iter().copied());
        self.observers.push(ObserverSlot { observer, lines });
    }

    pub fn add_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn broker(&self) -> &BacktestBroker {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut BacktestBroker {
        &mut self.broker
    }

    /// Prefer the vectorized batch path when every feed is fully
    /// materialized at start (defaults on; live or replaying feeds force
    /// streaming regardless).
    pub fn set_run_once(&mut self, run_once: bool) {
        self.run_once = run_once;
    }

    /// Abort on invalid bars instead of skipping them.
    pub fn set_strict_data(&mut self, strict: bool) {
        self.strict_data = strict;
    }

    /// Output lines of observer `index`, post-run.
    pub fn observer_lines(&self, index: usize) -> &LineSeries {
        &self.observers[index].lines
    }

    /// Series view of data `id`, post-run.
    pub fn data_series(&self, id: DataId) -> barlab_ta::series::DataSeries<'_> {
        barlab_ta::series::DataSeries::new(self.arena.series(self.datas[id.0].series))
    }

    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        self.bootstrap()?;

        let batch = self.run_once
            && !self
                .feeds
                .iter()
                .any(|slot| slot.feed.is_live() || slot.feed.replays());

        info!(
            run_id = %self.run_id,
            feeds = %self.datas.iter().map(|d| d.name.as_str()).join(", "),
            indicators = self.nodes.len(),
            strategies = self.strategies.len(),
            mode = if batch { "batch" } else { "streaming" },
            "engine starting"
        );

        if batch {
            let timeline = self.preload()?;
            self.compute_once();
            self.rewind_cursors();
            for step in timeline {
                self.apply_timeline_step(&step);
                self.process_bar(false);
            }
        } else {
            loop {
                let any_advanced = self.poll_feeds()?;
                if !any_advanced {
                    if self.feeds.iter().all(|slot| slot.exhausted) {
                        break;
                    }
                    continue;
                }
                self.process_bar(true);
            }
        }

        Ok(self.shutdown())
    }

    fn bootstrap(&mut self) -> Result<(), EngineError> {
        if self.feeds.is_empty() {
            return Err(EngineError::Config("no data feeds mounted".into()));
        }

        // Strategies resolve their indicator graphs by construction
        for slot_index in 0..self.strategies.len() {
            let first_node = self.nodes.len();
            let mut ctx = SetupCtx {
                arena: &mut self.arena,
                datas: &self.datas,
                nodes: &mut self.nodes,
                bindings: &mut self.bindings,
                series_min_periods: &mut self.series_min_periods,
            };
            self.strategies[slot_index].strategy.init(&mut ctx)?;
            let min_period = self.bindings[first_node..]
                .iter()
                .map(|b| b.min_period)
                .max()
                .unwrap_or(1);
            self.strategies[slot_index].min_period = min_period;
        }

        self.topo = self.topo_sort()?;

        for slot in &mut self.feeds {
            slot.feed.start().map_err(|source| EngineError::Feed {
                feed: slot.feed.name().into(),
                source,
            })?;
        }
        for node in &mut self.nodes {
            node.kernel.start();
        }
        for slot in &mut self.strategies {
            slot.strategy.start();
        }
        let starting_cash = self.broker.starting_cash();
        for slot in &mut self.observers {
            slot.observer.start(starting_cash);
        }
        for analyzer in &mut self.analyzers {
            analyzer.start(starting_cash);
        }
        Ok(())
    }

    /// Kahn's algorithm over indicator nodes; edges run input to consumer.
    fn topo_sort(&self) -> Result<Vec<usize>, GraphError> {
        let producer_of: IndexMap<usize, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.output.0, i))
            .collect();

        let mut indegree = vec![0usize; self.nodes.len()];
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                if input.series.0 >= self.arena.len() {
                    return Err(GraphError::DanglingInput {
                        node: i,
                        series: input.series.0,
                    });
                }
                if let Some(&producer) = producer_of.get(&input.series.0) {
                    indegree[i] += 1;
                    consumers[producer].push(i);
                }
            }
        }

        let mut ready: Vec<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop() {
            order.push(node);
            for &consumer in &consumers[node] {
                indegree[consumer] -= 1;
                if indegree[consumer] == 0 {
                    ready.push(consumer);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let node = indegree
                .iter()
                .position(|d| *d > 0)
                .unwrap_or_default();
            return Err(GraphError::Cycle { node });
        }
        // Registration order is itself topological (inputs must exist when
        // a node binds), so sorting keeps dependencies first and makes the
        // processing order stable
        order.sort_unstable();
        Ok(order)
    }

    /// Advance every feed one step; apply events to the data series.
    fn poll_feeds(&mut self) -> Result<bool, EngineError> {
        let mut any = false;
        for slot_index in 0..self.feeds.len() {
            self.feeds[slot_index].advanced = false;
            self.feeds[slot_index].replaced = false;
            if self.feeds[slot_index].exhausted {
                continue;
            }
            match self.feeds[slot_index].feed.next() {
                FeedPoll::Event(event) => {
                    if self.apply_event(slot_index, event)? {
                        any = true;
                    }
                }
                FeedPoll::Pending => {}
                FeedPoll::Finished => {
                    self.feeds[slot_index].exhausted = true;
                }
            }
        }
        Ok(any)
    }

    /// Write one feed event into its series; false when the bar was
    /// skipped by the data-integrity policy.
    fn apply_event(&mut self, slot_index: usize, event: FeedEvent) -> Result<bool, EngineError> {
        let slot = &mut self.feeds[slot_index];
        let bar = *event.bar();
        if !bar.is_valid() {
            let series_len = self.arena.series(slot.series).data_size();
            if self.strict_data {
                return Err(EngineError::DataIntegrity {
                    feed: slot.feed.name().into(),
                    index: series_len,
                    bar,
                });
            }
            warn!(feed = slot.feed.name(), index = series_len, ?bar, "skipping invalid bar");
            return Ok(false);
        }

        let series = self.arena.series_mut(slot.series);
        match event {
            FeedEvent::Bar(_) => {
                series::append_row(
                    series,
                    bar.time,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.open_interest,
                );
                slot.advanced = true;
            }
            FeedEvent::Replace(_) => {
                if series.size() == 0 {
                    warn!(feed = slot.feed.name(), "replace event before any bar; appending");
                    series::append_row(
                        series,
                        bar.time,
                        bar.open,
                        bar.high,
                        bar.low,
                        bar.close,
                        bar.volume,
                        bar.open_interest,
                    );
                } else {
                    series::replace_row(
                        series,
                        bar.time,
                        bar.open,
                        bar.high,
                        bar.low,
                        bar.close,
                        bar.volume,
                        bar.open_interest,
                    );
                }
                slot.advanced = true;
                slot.replaced = true;
            }
        }
        slot.current = Some(bar);
        Ok(true)
    }

    /// Drain every feed up front (batch mode), recording the advance
    /// timeline so the sweep can replay engine iterations faithfully.
    fn preload(&mut self) -> Result<Vec<Vec<TimelineEntry>>, EngineError> {
        let mut timeline = Vec::new();
        loop {
            if !self.poll_feeds()? {
                if self.feeds.iter().all(|slot| slot.exhausted) {
                    break;
                }
                continue;
            }
            let step: Vec<TimelineEntry> = self
                .feeds
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.advanced)
                .map(|(slot_index, slot)| TimelineEntry {
                    slot: slot_index,
                    bar: slot.current.unwrap_or_else(|| unreachable!("advanced slot has a bar")),
                    index: self.arena.series(slot.series).data_size() - 1,
                })
                .collect();
            timeline.push(step);
        }
        Ok(timeline)
    }

    /// Batch-fill every indicator over its fully loaded inputs.
    fn compute_once(&mut self) {
        for &node_index in &self.topo {
            let node = &mut self.nodes[node_index];
            let len = self.arena.series(node.clock).data_size();
            let mut out = self.arena.take(node.output);
            out.extend_nan(len);
            let ctx = Ctx::new(&self.arena, &node.inputs);
            node.kernel.once(&ctx, &mut out, 0, len);
            self.arena.restore(node.output, out);
        }
    }

    fn rewind_cursors(&mut self) {
        for slot in &mut self.feeds {
            self.arena.series_mut(slot.series).set_cursor(-1);
            slot.current = None;
            slot.advanced = false;
            slot.replaced = false;
        }
        for node in &self.nodes {
            self.arena.series_mut(node.output).set_cursor(-1);
        }
    }

    fn apply_timeline_step(&mut self, step: &[TimelineEntry]) {
        for slot in &mut self.feeds {
            slot.advanced = false;
            slot.replaced = false;
        }
        for entry in step {
            let slot = &mut self.feeds[entry.slot];
            self.arena
                .series_mut(slot.series)
                .set_cursor(entry.index as isize);
            slot.current = Some(entry.bar);
            slot.advanced = true;
        }
        // Indicator cursors follow their clocks
        for node in &self.nodes {
            let cursor = self.arena.series(node.clock).cursor();
            self.arena.series_mut(node.output).set_cursor(cursor);
        }
    }

    /// One engine bar: indicators, strategies, broker, observers,
    /// analyzers, notification delivery — in that fixed order.
    fn process_bar(&mut self, compute_indicators: bool) {
        if compute_indicators {
            self.update_indicators();
        }

        let clock = &self.feeds[0];
        let clock_advanced = clock.advanced;
        let bar_index = self.arena.series(clock.series).size().wrapping_sub(1);
        let time = clock
            .current
            .map_or(DateTime::UNIX_EPOCH, |bar| bar.time);

        // Strategy hooks run before the broker matches the same bar
        if clock_advanced {
            let Self {
                arena,
                datas,
                bindings,
                broker,
                strategies,
                ..
            } = self;
            for slot in strategies.iter_mut() {
                let mut ctx = StrategyCtx::new(arena, datas, bindings, broker, time, bar_index);
                let length = bar_index + 1;
                if length < slot.min_period {
                    slot.strategy.prenext(&mut ctx);
                } else if !slot.warmed {
                    slot.warmed = true;
                    slot.strategy.nextstart(&mut ctx);
                } else {
                    slot.strategy.next(&mut ctx);
                }
            }
        }

        let broker_bars: Vec<BrokerBar> = self
            .feeds
            .iter()
            .filter_map(|slot| {
                slot.current.map(|bar| BrokerBar {
                    data: slot.data,
                    bar,
                    index: self.arena.series(slot.series).size().wrapping_sub(1),
                    advanced: slot.advanced,
                })
            })
            .collect();
        self.broker.next(&broker_bars);

        let notifications = self.broker.drain_notifications();
        let cash = self.broker.get_cash();
        let value = self.broker.get_value();
        let ctx = ObsCtx {
            bar_index,
            time,
            cash,
            value,
            notifications: &notifications,
        };

        if clock_advanced {
            for slot in &mut self.observers {
                slot.lines.append_nan_row();
                slot.observer.next(&ctx, &mut slot.lines);
            }
            for analyzer in &mut self.analyzers {
                analyzer.on_bar(&ctx);
            }
        }

        // Deliver queued notifications last
        for notification in &notifications {
            match notification {
                BrokerNotification::Order(order) => {
                    for slot in &mut self.strategies {
                        slot.strategy.notify_order(order);
                    }
                    for analyzer in &mut self.analyzers {
                        analyzer.notify_order(order);
                    }
                }
                BrokerNotification::Trade(trade) => {
                    for slot in &mut self.strategies {
                        slot.strategy.notify_trade(trade);
                    }
                    for analyzer in &mut self.analyzers {
                        analyzer.notify_trade(trade);
                    }
                }
                BrokerNotification::CashValue { cash, value } => {
                    for slot in &mut self.strategies {
                        slot.strategy.notify_cash_value(*cash, *value);
                    }
                    for analyzer in &mut self.analyzers {
                        analyzer.notify_cash_value(*cash, *value);
                    }
                }
            }
        }
    }

    /// Streaming indicator advance: a node computes one bar whenever its
    /// clock grew, and recomputes in place when its clock's current row
    /// was replaced (replay).
    fn update_indicators(&mut self) {
        for &node_index in &self.topo {
            let node = &mut self.nodes[node_index];
            let clock_len = self.arena.series(node.clock).data_size();
            let out_len = self.arena.series(node.output).data_size();
            let replaced = self
                .feeds
                .iter()
                .any(|slot| slot.series == node.clock && slot.replaced);

            if out_len < clock_len {
                let mut out = self.arena.take(node.output);
                while out.data_size() < clock_len {
                    out.append_nan_row();
                }
                let i = clock_len - 1;
                let ctx = Ctx::new(&self.arena, &node.inputs);
                node.kernel.update(&ctx, &mut out, i);
                self.arena.restore(node.output, out);
            } else if replaced && out_len == clock_len && clock_len > 0 {
                let i = clock_len - 1;
                let mut out = self.arena.take(node.output);
                // Transient bar: recompute the current row in place
                for line in 0..out.num_lines() {
                    out.set(line, 0, f64::NAN);
                }
                let ctx = Ctx::new(&self.arena, &node.inputs);
                node.kernel.update(&ctx, &mut out, i);
                self.arena.restore(node.output, out);
            }
        }
    }

    /// Reverse-order shutdown; collects analyzer results.
    fn shutdown(&mut self) -> RunSummary {
        let bar_index = self.arena.series(self.feeds[0].series).size().wrapping_sub(1);
        let time = self.feeds[0]
            .current
            .map_or(DateTime::UNIX_EPOCH, |bar| bar.time);
        {
            let Self {
                arena,
                datas,
                bindings,
                broker,
                strategies,
                ..
            } = self;
            for slot in strategies.iter_mut() {
                let mut ctx = StrategyCtx::new(arena, datas, bindings, broker, time, bar_index);
                slot.strategy.stop(&mut ctx);
            }
        }
        for analyzer in &mut self.analyzers {
            analyzer.stop();
        }
        for node in &mut self.nodes {
            node.kernel.stop();
        }
        for slot in &mut self.feeds {
            slot.feed.stop();
        }

        let analyses: IndexMap<String, serde_json::Value> = self
            .analyzers
            .iter()
            .map(|analyzer| (analyzer.name().to_string(), analyzer.analysis()))
            .collect();

        let bars = self.arena.series(self.feeds[0].series).data_size();
        let summary = RunSummary {
            run_id: self.run_id,
            bars,
            final_cash: self.broker.get_cash(),
            final_value: self.broker.get_value(),
            analyses,
        };
        info!(
            run_id = %self.run_id,
            bars,
            final_value = summary.final_value,
            "engine stopped"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeedParams, MemoryFeed, TimeFrame};
    use barlab_ta::indicators::{SimpleMovingAverage, SmoothedMovingAverage};
    use chrono::TimeZone;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Bar::new(
                    Utc.timestamp_opt(i as i64 * 86_400, 0).unwrap(),
                    *c,
                    *c + 0.5,
                    *c - 0.5,
                    *c,
                    1000.0,
                    0.0,
                )
            })
            .collect()
    }

    fn feed(closes: &[f64]) -> Box<MemoryFeed> {
        Box::new(MemoryFeed::new("test", bars(closes)).with_params(FeedParams {
            timeframe: TimeFrame::Days,
            ..FeedParams::default()
        }))
    }

    #[derive(Debug, Default)]
    struct Chained {
        sma: Option<IndicatorId>,
        smma_of_sma: Option<IndicatorId>,
    }

    impl Strategy for Chained {
        fn init(&mut self, ctx: &mut SetupCtx<'_>) -> Result<(), EngineError> {
            let close = ctx.line(DataId(0), DataSlot::Close);
            let sma = ctx.indicator(Box::new(SimpleMovingAverage::new(3)), vec![close])?;
            let sma_line = ctx.indicator_line(sma, 0);
            let smma = ctx.indicator(Box::new(SmoothedMovingAverage::new(2)), vec![sma_line])?;
            self.sma = Some(sma);
            self.smma_of_sma = Some(smma);
            Ok(())
        }
    }

    #[test]
    fn test_min_period_propagates_through_chain() {
        let mut cerebro = Cerebro::new();
        cerebro.add_data(feed(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        cerebro.add_strategy(Box::<Chained>::default());
        cerebro.run().unwrap();

        // SMA(3) chained into SMMA(2): 3 + 2 - 1
        assert_eq!(cerebro.bindings[1].min_period, 4);
        assert_eq!(cerebro.strategies[0].min_period, 4);

        let out = cerebro.arena.series(cerebro.bindings[1].output);
        for i in 0..3 {
            assert!(out.get_abs(0, i).is_nan(), "bar {i} leaked");
        }
        assert!(!out.get_abs(0, 3).is_nan());
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        #[derive(Debug)]
        struct Bad;
        impl Strategy for Bad {
            fn init(&mut self, ctx: &mut SetupCtx<'_>) -> Result<(), EngineError> {
                // Reference a series that does not exist yet
                let phantom = LineRef::new(SeriesId(99), 0);
                ctx.indicator(Box::new(SimpleMovingAverage::new(3)), vec![phantom])?;
                Ok(())
            }
        }

        let mut cerebro = Cerebro::new();
        cerebro.add_data(feed(&[1.0, 2.0, 3.0]));
        cerebro.add_strategy(Box::new(Bad));
        let err = cerebro.run().unwrap_err();
        assert!(matches!(err, EngineError::Bind(BindError::UnknownSeries { .. })));
    }

    #[test]
    fn test_no_feeds_is_a_config_error() {
        let mut cerebro = Cerebro::new();
        assert!(matches!(
            cerebro.run(),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_strict_data_aborts_on_invalid_bar() {
        let time = Utc.timestamp_opt(0, 0).unwrap();
        let broken = vec![Bar::new(time, 10.0, 9.0, 11.0, 10.0, 100.0, 0.0)];

        let mut cerebro = Cerebro::new();
        cerebro.add_data(Box::new(MemoryFeed::new("broken", broken)));
        cerebro.set_strict_data(true);
        assert!(matches!(
            cerebro.run(),
            Err(EngineError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_lenient_data_skips_invalid_bar() {
        let good = bars(&[1.0, 2.0]);
        let mut all = vec![good[0], Bar::new(good[1].time, 10.0, 9.0, 11.0, 10.0, 100.0, 0.0), good[1]];
        all[2].time = Utc.timestamp_opt(2 * 86_400, 0).unwrap();

        let mut cerebro = Cerebro::new();
        cerebro.add_data(Box::new(MemoryFeed::new("mixed", all)));
        let summary = cerebro.run().unwrap();
        assert_eq!(summary.bars, 2);
    }
}

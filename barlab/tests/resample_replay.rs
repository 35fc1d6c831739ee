//! Resample and replay filters mounted through the engine: window
//! aggregation, volume conservation, timestamp ordering, and transient-bar
//! recomputation of indicators.

use barlab::data::{Bar, DataId, MemoryFeed, ResampleParams, TimeFrame};
use barlab::engine::{Cerebro, SetupCtx};
use barlab::error::EngineError;
use barlab::strategy::{IndicatorId, Strategy, StrategyCtx};
use barlab_ta::indicators::SimpleMovingAverage;
use barlab_ta::series::DataSlot;
use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::rc::Rc;

fn minute_bars(count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = 10.0 + i as f64;
            Bar::new(
                Utc.timestamp_opt(i as i64 * 60, 0).unwrap(),
                close,
                close + 0.5,
                close - 0.5,
                close,
                100.0,
                0.0,
            )
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
struct SeenBar {
    time: DateTime<Utc>,
    close: f64,
    volume: f64,
    sma: f64,
    bar_index: usize,
}

#[derive(Debug)]
struct Watcher {
    sma: Option<IndicatorId>,
    seen: Rc<RefCell<Vec<SeenBar>>>,
}

impl Strategy for Watcher {
    fn init(&mut self, ctx: &mut SetupCtx<'_>) -> Result<(), EngineError> {
        let close = ctx.line(DataId(0), DataSlot::Close);
        self.sma = Some(ctx.indicator(Box::new(SimpleMovingAverage::new(2)), vec![close])?);
        Ok(())
    }

    fn prenext(&mut self, ctx: &mut StrategyCtx<'_>) {
        self.record(ctx);
    }

    fn next(&mut self, ctx: &mut StrategyCtx<'_>) {
        self.record(ctx);
    }
}

impl Watcher {
    fn record(&mut self, ctx: &mut StrategyCtx<'_>) {
        let data = ctx.data0();
        self.seen.borrow_mut().push(SeenBar {
            time: data.datetime(0).expect("bar has a time"),
            close: data.close(0),
            volume: data.volume(0),
            sma: self.sma.map_or(f64::NAN, |id| ctx.ind(id).value(0)),
            bar_index: ctx.bar_index(),
        });
    }
}

#[test]
fn test_resampled_engine_run() {
    // 15 minute bars resampled into three 5-minute bars
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut cerebro = Cerebro::new();
    cerebro.resample_data(
        Box::new(MemoryFeed::new("m1", minute_bars(15))),
        ResampleParams::new(TimeFrame::Minutes, 5),
    );
    cerebro.add_strategy(Box::new(Watcher {
        sma: None,
        seen: Rc::clone(&seen),
    }));
    let summary = cerebro.run().unwrap();

    assert_eq!(summary.bars, 3);
    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);

    // Window closes carry the last input close and the summed volume
    assert_eq!(seen[0].close, 14.0);
    assert_eq!(seen[1].close, 19.0);
    assert_eq!(seen[2].close, 24.0);
    for bar in seen.iter() {
        assert_eq!(bar.volume, 500.0);
    }

    // Right-edge timestamps, strictly increasing
    assert_eq!(seen[0].time, Utc.timestamp_opt(300, 0).unwrap());
    for pair in seen.windows(2) {
        assert!(pair[0].time < pair[1].time);
    }

    // SMA(2) on the resampled closes
    assert!(seen[0].sma.is_nan());
    assert_eq!(seen[1].sma, 16.5);
    assert_eq!(seen[2].sma, 21.5);
}

#[test]
fn test_replayed_engine_run() {
    // 10 minute bars replayed as two 5-minute bars with transient states
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut cerebro = Cerebro::new();
    cerebro.replay_data(
        Box::new(MemoryFeed::new("m1", minute_bars(10))),
        ResampleParams::new(TimeFrame::Minutes, 5),
    );
    cerebro.add_strategy(Box::new(Watcher {
        sma: None,
        seen: Rc::clone(&seen),
    }));
    let summary = cerebro.run().unwrap();

    // Two completed output bars, each delivered five times
    assert_eq!(summary.bars, 2);
    let seen = seen.borrow();
    assert_eq!(seen.len(), 10);
    assert_eq!(seen.iter().filter(|b| b.bar_index == 0).count(), 5);
    assert_eq!(seen.iter().filter(|b| b.bar_index == 1).count(), 5);

    // Transient closes walk forward within the window
    let first_window: Vec<f64> = seen
        .iter()
        .filter(|b| b.bar_index == 0)
        .map(|b| b.close)
        .collect();
    assert_eq!(first_window, vec![10.0, 11.0, 12.0, 13.0, 14.0]);

    // The replayed bar keeps its stable window timestamp across updates
    assert!(seen
        .iter()
        .filter(|b| b.bar_index == 0)
        .all(|b| b.time == Utc.timestamp_opt(300, 0).unwrap()));

    // Timestamps never regress across the whole run
    for pair in seen.windows(2) {
        assert!(pair[0].time <= pair[1].time);
    }

    // SMA(2) is recomputed on every transient state of bar 1: the last
    // update of the second window averages the two final closes
    let last = seen.last().unwrap();
    assert_eq!(last.close, 19.0);
    assert_eq!(last.sma, (14.0 + 19.0) / 2.0);

    // Mid-window transient: sma reflects the partial close at that moment
    let mid = seen
        .iter()
        .filter(|b| b.bar_index == 1)
        .nth(2)
        .unwrap();
    assert_eq!(mid.close, 17.0);
    assert_eq!(mid.sma, (14.0 + 17.0) / 2.0);
}

#[test]
fn test_resample_volume_conservation_through_engine() {
    let bars = minute_bars(13); // a ragged tail: last window holds 3 bars
    let input_volume: f64 = bars.iter().map(|b| b.volume).sum();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut cerebro = Cerebro::new();
    cerebro.resample_data(
        Box::new(MemoryFeed::new("m1", bars)),
        ResampleParams::new(TimeFrame::Minutes, 5),
    );
    cerebro.add_strategy(Box::new(Watcher {
        sma: None,
        seen: Rc::clone(&seen),
    }));
    cerebro.run().unwrap();

    let output_volume: f64 = seen.borrow().iter().map(|b| b.volume).sum();
    assert_eq!(output_volume, input_volume);
}

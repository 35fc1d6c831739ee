use crate::data::{Bar, BarFeed, FeedEvent, FeedParams, FeedPoll};
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::warn;

const DAY_SECS: i64 = 86_400;

/// Granularity of a bar stream.
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
    Display,
)]
pub enum TimeFrame {
    Ticks,
    Seconds,
    Minutes,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeFrame {
    /// Window length in seconds for sub-day frames.
    pub fn subday_seconds(self) -> Option<i64> {
        match self {
            Self::Seconds => Some(1),
            Self::Minutes => Some(60),
            _ => None,
        }
    }
}

/// Window policy of a [`Resampler`] / [`Replayer`].
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResampleParams {
    pub timeframe: TimeFrame,
    pub compression: u32,
    /// Align sub-day windows to canonical clock edges; when false, windows
    /// anchor at the first bar seen.
    pub bar2edge: bool,
    /// Stamp emitted bars with the window edge instead of the last input
    /// time.
    pub adjbartime: bool,
    /// Use the right window edge as the canonical timestamp.
    pub rightedge: bool,
    /// Shift of the sub-day window grid, in seconds.
    pub boundoff: i64,
    /// Merge late input (at or before the last emitted timestamp) into the
    /// open window instead of dropping it.
    pub takelate: bool,
    /// Clamp daily right edges to the session end instead of midnight.
    pub session_end: Option<NaiveTime>,
}

impl ResampleParams {
    pub fn new(timeframe: TimeFrame, compression: u32) -> Self {
        Self {
            timeframe,
            compression,
            bar2edge: true,
            adjbartime: true,
            rightedge: true,
            boundoff: 0,
            takelate: true,
            session_end: None,
        }
    }
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self::new(TimeFrame::Days, 1)
    }
}

/// OHLCV accumulation over one window.
#[derive(Debug, Clone)]
struct BarAccum {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    open_interest: f64,
    count: usize,
    last_time: DateTime<Utc>,
}

impl BarAccum {
    fn start(bar: &Bar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            open_interest: bar.open_interest,
            count: 1,
            last_time: bar.time,
        }
    }

    fn update(&mut self, bar: &Bar) {
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        self.close = bar.close;
        self.volume += bar.volume;
        self.open_interest = bar.open_interest;
        self.count += 1;
        if bar.time > self.last_time {
            self.last_time = bar.time;
        }
    }

    fn to_bar(&self, time: DateTime<Utc>) -> Bar {
        Bar {
            time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            open_interest: self.open_interest,
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    accum: BarAccum,
    left: DateTime<Utc>,
    right: DateTime<Utc>,
}

fn dt_from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

fn month_start(month_index: i64) -> DateTime<Utc> {
    let year = month_index.div_euclid(12) as i32;
    let month = (month_index.rem_euclid(12) + 1) as u32;
    chrono::NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Shared window mechanics of [`Resampler`] and [`Replayer`].
#[derive(Debug)]
struct ResampleCore {
    params: ResampleParams,
    window: Option<Window>,
    last_emit: Option<DateTime<Utc>>,
}

impl ResampleCore {
    fn new(params: ResampleParams) -> Self {
        assert!(params.compression >= 1, "compression must be >= 1");
        Self {
            params,
            window: None,
            last_emit: None,
        }
    }

    /// Membership window `[left, right)` of the calendar/clock grid cell
    /// containing `t`.
    fn window_bounds(&self, t: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let comp = self.params.compression as i64;
        let ts = t.timestamp();
        match self.params.timeframe {
            TimeFrame::Ticks => (t, t),
            TimeFrame::Seconds | TimeFrame::Minutes => {
                let length = self
                    .params
                    .timeframe
                    .subday_seconds()
                    .unwrap_or(1)
                    * comp;
                if self.params.bar2edge {
                    let key = (ts - self.params.boundoff).div_euclid(length);
                    let left = key * length + self.params.boundoff;
                    (dt_from_secs(left), dt_from_secs(left + length))
                } else {
                    (t, dt_from_secs(ts + length))
                }
            }
            TimeFrame::Days => {
                let day = ts.div_euclid(DAY_SECS);
                let start = day.div_euclid(comp) * comp;
                (
                    dt_from_secs(start * DAY_SECS),
                    dt_from_secs((start + comp) * DAY_SECS),
                )
            }
            TimeFrame::Weeks => {
                // Epoch day 0 was a Thursday; +3 aligns week indices to Monday
                let day = ts.div_euclid(DAY_SECS);
                let week = (day + 3).div_euclid(7);
                let start_week = week.div_euclid(comp) * comp;
                let start_day = start_week * 7 - 3;
                (
                    dt_from_secs(start_day * DAY_SECS),
                    dt_from_secs((start_day + 7 * comp) * DAY_SECS),
                )
            }
            TimeFrame::Months => {
                let month_index = t.year() as i64 * 12 + (t.month0() as i64);
                let start = month_index.div_euclid(comp) * comp;
                (month_start(start), month_start(start + comp))
            }
            TimeFrame::Years => {
                let start = (t.year() as i64).div_euclid(comp) * comp;
                (month_start(start * 12), month_start((start + comp) * 12))
            }
        }
    }

    fn open_window(&mut self, bar: &Bar) {
        let (left, right) = self.window_bounds(bar.time);
        self.window = Some(Window {
            accum: BarAccum::start(bar),
            left,
            right,
        });
    }

    fn emit_time(&self, window: &Window) -> DateTime<Utc> {
        if self.params.timeframe == TimeFrame::Ticks || !self.params.adjbartime {
            return window.accum.last_time;
        }
        if !self.params.rightedge {
            return window.left;
        }
        if self.params.timeframe == TimeFrame::Days {
            if let Some(session_end) = self.params.session_end {
                return window.left.date_naive().and_time(session_end).and_utc();
            }
        }
        window.right
    }

    fn close_window(&mut self) -> Option<Bar> {
        let window = self.window.take()?;
        let time = self.emit_time(&window);
        self.last_emit = Some(time);
        Some(window.accum.to_bar(time))
    }

    /// Fold a late bar into the open window, preserving the accumulated
    /// high-water timestamp.
    fn merge_late(&mut self, bar: &Bar) -> bool {
        match &mut self.window {
            Some(window) => {
                let kept = window.accum.last_time;
                window.accum.update(bar);
                window.accum.last_time = kept;
                true
            }
            None => {
                warn!(time = %bar.time, "late bar with no open window dropped");
                false
            }
        }
    }

    fn is_late(&self, bar: &Bar) -> bool {
        self.last_emit.is_some_and(|last| bar.time <= last)
    }

    fn tick_window_full(&self) -> bool {
        self.params.timeframe == TimeFrame::Ticks
            && self
                .window
                .as_ref()
                .is_some_and(|w| w.accum.count >= self.params.compression as usize)
    }
}

/// Aggregates an input bar stream into one output bar per window, emitted
/// on window close. Downstream only ever sees completed bars.
#[derive(Debug)]
pub struct Resampler {
    core: ResampleCore,
}

impl Resampler {
    pub fn new(params: ResampleParams) -> Self {
        Self {
            core: ResampleCore::new(params),
        }
    }

    /// Feed one input bar; returns the completed previous window, if this
    /// input closed it.
    pub fn on_bar(&mut self, bar: Bar) -> Option<Bar> {
        if self.core.is_late(&bar) {
            if self.core.params.takelate {
                self.core.merge_late(&bar);
            } else {
                warn!(time = %bar.time, "late bar dropped (takelate disabled)");
            }
            return None;
        }

        let emitted = match &mut self.core.window {
            Some(window)
                if self.core.params.timeframe != TimeFrame::Ticks && bar.time < window.right =>
            {
                window.accum.update(&bar);
                None
            }
            Some(_) if self.core.params.timeframe != TimeFrame::Ticks => {
                let done = self.core.close_window();
                self.core.open_window(&bar);
                done
            }
            Some(window) => {
                window.accum.update(&bar);
                None
            }
            None => {
                self.core.open_window(&bar);
                None
            }
        };

        // Tick windows complete by count, not by the next input
        if emitted.is_none() && self.core.tick_window_full() {
            return self.core.close_window();
        }
        emitted
    }

    /// Emit the open partial window (end of stream or session end).
    pub fn flush(&mut self) -> Option<Bar> {
        self.core.close_window()
    }
}

/// Re-emits the accumulating bar on every input within the window: a new
/// row when a window opens, a replacement of that row on every further
/// input. The last replacement before the next window carries the final
/// state.
#[derive(Debug)]
pub struct Replayer {
    core: ResampleCore,
}

impl Replayer {
    pub fn new(params: ResampleParams) -> Self {
        Self {
            core: ResampleCore::new(params),
        }
    }

    /// Feed one input bar; `None` means a late input was dropped.
    pub fn on_bar(&mut self, bar: Bar) -> Option<FeedEvent> {
        if self.core.is_late(&bar) {
            if self.core.params.takelate && self.core.merge_late(&bar) {
                return Some(FeedEvent::Replace(self.partial()));
            }
            warn!(time = %bar.time, "late bar dropped (takelate disabled)");
            return None;
        }

        match &mut self.core.window {
            Some(window)
                if self.core.params.timeframe != TimeFrame::Ticks && bar.time < window.right =>
            {
                window.accum.update(&bar);
                Some(FeedEvent::Replace(self.partial()))
            }
            Some(window)
                if self.core.params.timeframe == TimeFrame::Ticks
                    && window.accum.count < self.core.params.compression as usize =>
            {
                window.accum.update(&bar);
                Some(FeedEvent::Replace(self.partial()))
            }
            Some(_) => {
                // Final state of the previous window was already delivered
                // as its last replacement
                if let Some(window) = self.core.window.take() {
                    self.core.last_emit = Some(self.core.emit_time(&window));
                }
                self.core.open_window(&bar);
                Some(FeedEvent::Bar(self.partial()))
            }
            None => {
                self.core.open_window(&bar);
                Some(FeedEvent::Bar(self.partial()))
            }
        }
    }

    fn partial(&self) -> Bar {
        let window = self
            .core
            .window
            .as_ref()
            .expect("partial() with no open window");
        window.accum.to_bar(self.core.emit_time(window))
    }
}

/// [`BarFeed`] adapter aggregating an inner feed to a coarser timeframe.
#[derive(Debug)]
pub struct ResampledFeed {
    name: SmolStr,
    params: FeedParams,
    inner: Box<dyn BarFeed>,
    resampler: Resampler,
    inner_done: bool,
    done: bool,
}

impl ResampledFeed {
    pub fn new(inner: Box<dyn BarFeed>, resample: ResampleParams) -> Self {
        let name = SmolStr::new(format!("{}_{}{}", inner.name(), resample.timeframe, resample.compression));
        let params = FeedParams {
            timeframe: resample.timeframe,
            compression: resample.compression,
            ..*inner.params()
        };
        Self {
            name,
            params,
            inner,
            resampler: Resampler::new(resample),
            inner_done: false,
            done: false,
        }
    }
}

impl BarFeed for ResampledFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &FeedParams {
        &self.params
    }

    fn start(&mut self) -> Result<(), crate::data::FeedError> {
        self.inner.start()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }

    fn next(&mut self) -> FeedPoll {
        if self.done {
            return FeedPoll::Finished;
        }
        if self.inner_done {
            self.done = true;
            return match self.resampler.flush() {
                Some(bar) => FeedPoll::Event(FeedEvent::Bar(bar)),
                None => FeedPoll::Finished,
            };
        }
        match self.inner.next() {
            FeedPoll::Event(FeedEvent::Bar(bar)) => match self.resampler.on_bar(bar) {
                Some(out) => FeedPoll::Event(FeedEvent::Bar(out)),
                None => FeedPoll::Pending,
            },
            FeedPoll::Event(FeedEvent::Replace(_)) => {
                warn!(feed = %self.name, "resampling a replaying feed is unsupported; update ignored");
                FeedPoll::Pending
            }
            FeedPoll::Pending => FeedPoll::Pending,
            FeedPoll::Finished => {
                self.inner_done = true;
                FeedPoll::Pending
            }
        }
    }

    fn is_live(&self) -> bool {
        self.inner.is_live()
    }
}

/// [`BarFeed`] adapter replaying an inner feed at a coarser timeframe,
/// transient states included.
#[derive(Debug)]
pub struct ReplayedFeed {
    name: SmolStr,
    params: FeedParams,
    inner: Box<dyn BarFeed>,
    replayer: Replayer,
}

impl ReplayedFeed {
    pub fn new(inner: Box<dyn BarFeed>, resample: ResampleParams) -> Self {
        let name = SmolStr::new(format!("{}_{}{}r", inner.name(), resample.timeframe, resample.compression));
        let params = FeedParams {
            timeframe: resample.timeframe,
            compression: resample.compression,
            ..*inner.params()
        };
        Self {
            name,
            params,
            inner,
            replayer: Replayer::new(resample),
        }
    }
}

impl BarFeed for ReplayedFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &FeedParams {
        &self.params
    }

    fn start(&mut self) -> Result<(), crate::data::FeedError> {
        self.inner.start()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }

    fn next(&mut self) -> FeedPoll {
        match self.inner.next() {
            FeedPoll::Event(event) => match self.replayer.on_bar(*event.bar()) {
                Some(out) => FeedPoll::Event(out),
                None => FeedPoll::Pending,
            },
            FeedPoll::Pending => FeedPoll::Pending,
            FeedPoll::Finished => FeedPoll::Finished,
        }
    }

    fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    fn replays(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(secs: i64, o: f64, h: f64, l: f64, c: f64, v: f64) -> Bar {
        Bar::new(Utc.timestamp_opt(secs, 0).unwrap(), o, h, l, c, v, 0.0)
    }

    #[test]
    fn test_minute_to_five_minute_window() {
        let inputs = [
            bar(0, 10.0, 10.5, 9.9, 10.0, 100.0),
            bar(60, 11.0, 11.2, 10.8, 11.0, 150.0),
            bar(120, 12.0, 12.5, 11.5, 12.0, 200.0),
            bar(180, 11.0, 11.3, 10.9, 11.0, 120.0),
            bar(240, 13.0, 13.1, 12.8, 13.0, 180.0),
        ];

        let mut resampler = Resampler::new(ResampleParams::new(TimeFrame::Minutes, 5));
        for input in inputs {
            assert_eq!(resampler.on_bar(input), None);
        }
        let out = resampler.flush().expect("window should flush");

        assert_eq!(out.open, 10.0);
        assert_eq!(out.high, 13.1);
        assert_eq!(out.low, 9.9);
        assert_eq!(out.close, 13.0);
        assert_eq!(out.volume, 750.0);
        assert_eq!(out.time, Utc.timestamp_opt(300, 0).unwrap());
    }

    #[test]
    fn test_volume_conservation_and_monotonic_timestamps() {
        let mut resampler = Resampler::new(ResampleParams::new(TimeFrame::Minutes, 3));
        let mut outputs = Vec::new();
        let mut input_volume = 0.0;

        for i in 0..10 {
            let input = bar(i * 60, 10.0, 10.0 + i as f64, 9.0, 9.5, 10.0 + i as f64);
            input_volume += input.volume;
            if let Some(out) = resampler.on_bar(input) {
                outputs.push(out);
            }
        }
        outputs.extend(resampler.flush());

        assert_eq!(outputs.len(), 4);
        let output_volume: f64 = outputs.iter().map(|b| b.volume).sum();
        assert_eq!(output_volume, input_volume);

        for pair in outputs.windows(2) {
            assert!(pair[0].time < pair[1].time, "timestamps must not regress");
        }
    }

    #[test]
    fn test_left_edge_stamping() {
        let mut params = ResampleParams::new(TimeFrame::Minutes, 5);
        params.rightedge = false;

        let mut resampler = Resampler::new(params);
        resampler.on_bar(bar(60, 10.0, 10.5, 9.9, 10.0, 100.0));
        let out = resampler.flush().unwrap();
        assert_eq!(out.time, Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn test_unadjusted_time_keeps_last_input() {
        let mut params = ResampleParams::new(TimeFrame::Minutes, 5);
        params.adjbartime = false;

        let mut resampler = Resampler::new(params);
        resampler.on_bar(bar(60, 10.0, 10.5, 9.9, 10.0, 100.0));
        resampler.on_bar(bar(120, 10.0, 10.5, 9.9, 10.0, 100.0));
        let out = resampler.flush().unwrap();
        assert_eq!(out.time, Utc.timestamp_opt(120, 0).unwrap());
    }

    #[test]
    fn test_week_boundary() {
        // 2024-01-05 is a Friday, 2024-01-08 a Monday
        let friday = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap();

        let mut resampler = Resampler::new(ResampleParams::new(TimeFrame::Weeks, 1));
        assert_eq!(
            resampler.on_bar(Bar::new(friday, 1.0, 1.0, 1.0, 1.0, 10.0, 0.0)),
            None
        );
        let closed = resampler
            .on_bar(Bar::new(monday, 2.0, 2.0, 2.0, 2.0, 20.0, 0.0))
            .expect("monday input closes the friday week");

        assert_eq!(closed.close, 1.0);
        assert_eq!(
            closed.time,
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_session_end_clamps_daily_edge() {
        let mut params = ResampleParams::new(TimeFrame::Days, 1);
        params.session_end = NaiveTime::from_hms_opt(17, 0, 0);

        let mut resampler = Resampler::new(params);
        let morning = Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap();
        resampler.on_bar(Bar::new(morning, 1.0, 1.0, 1.0, 1.0, 5.0, 0.0));
        let out = resampler.flush().unwrap();

        assert_eq!(
            out.time,
            Utc.with_ymd_and_hms(2024, 3, 14, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_late_input_policies() {
        // takelate merges into the open window
        let mut resampler = Resampler::new(ResampleParams::new(TimeFrame::Minutes, 1));
        assert!(resampler.on_bar(bar(0, 1.0, 1.0, 1.0, 1.0, 5.0)).is_none());
        let first = resampler
            .on_bar(bar(60, 2.0, 2.0, 2.0, 2.0, 5.0))
            .expect("second minute closes the first");
        assert_eq!(first.time, Utc.timestamp_opt(60, 0).unwrap());

        assert!(resampler.on_bar(bar(30, 9.0, 9.0, 0.5, 1.0, 7.0)).is_none());
        let second = resampler.flush().unwrap();
        assert_eq!(second.volume, 12.0);
        assert_eq!(second.low, 0.5);

        // takelate disabled drops the late bar
        let mut params = ResampleParams::new(TimeFrame::Minutes, 1);
        params.takelate = false;
        let mut strict = Resampler::new(params);
        strict.on_bar(bar(0, 1.0, 1.0, 1.0, 1.0, 5.0));
        strict.on_bar(bar(60, 2.0, 2.0, 2.0, 2.0, 5.0));
        strict.on_bar(bar(30, 9.0, 9.0, 0.5, 1.0, 7.0));
        let out = strict.flush().unwrap();
        assert_eq!(out.volume, 5.0);
    }

    #[test]
    fn test_tick_compression_by_count() {
        let mut resampler = Resampler::new(ResampleParams::new(TimeFrame::Ticks, 3));
        assert!(resampler.on_bar(bar(1, 1.0, 1.0, 1.0, 1.0, 1.0)).is_none());
        assert!(resampler.on_bar(bar(2, 2.0, 2.0, 2.0, 2.0, 1.0)).is_none());
        let out = resampler
            .on_bar(bar(3, 3.0, 3.0, 3.0, 3.0, 1.0))
            .expect("third tick completes the window");
        assert_eq!(out.open, 1.0);
        assert_eq!(out.close, 3.0);
        assert_eq!(out.volume, 3.0);
        assert_eq!(out.time, Utc.timestamp_opt(3, 0).unwrap());
    }

    #[test]
    fn test_replayer_transient_sequence() {
        let mut replayer = Replayer::new(ResampleParams::new(TimeFrame::Minutes, 5));

        let first = replayer.on_bar(bar(0, 10.0, 10.5, 9.9, 10.0, 100.0)).unwrap();
        let FeedEvent::Bar(opening) = first else {
            panic!("first input must open a new bar");
        };
        assert_eq!(opening.close, 10.0);
        assert_eq!(opening.time, Utc.timestamp_opt(300, 0).unwrap());

        let second = replayer.on_bar(bar(60, 11.0, 11.2, 10.8, 11.0, 150.0)).unwrap();
        let FeedEvent::Replace(partial) = second else {
            panic!("second input must replace the accumulating bar");
        };
        assert_eq!(partial.open, 10.0);
        assert_eq!(partial.close, 11.0);
        assert_eq!(partial.volume, 250.0);
        assert_eq!(partial.time, opening.time);

        let third = replayer.on_bar(bar(300, 12.0, 12.5, 11.5, 12.0, 200.0)).unwrap();
        let FeedEvent::Bar(next_window) = third else {
            panic!("window-crossing input must open a new bar");
        };
        assert_eq!(next_window.open, 12.0);
        assert_eq!(next_window.time, Utc.timestamp_opt(600, 0).unwrap());
    }
}

use chrono::{DateTime, NaiveTime, Utc};
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Debug;
use thiserror::Error;

/// Live feeds: the cross-thread bar queue and the feed draining it.
pub mod live;

/// Re-binning of bar streams to coarser timeframes.
pub mod resample;

pub use resample::{ReplayedFeed, ResampleParams, ResampledFeed, TimeFrame};

/// Index of a data feed slot inside the engine.
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
pub struct DataId(pub usize);

/// One OHLCV record stamped with a UTC timestamp.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_interest: f64,
}

impl Bar {
    /// A bar is valid iff `low <= min(open, close) <= max(open, close) <= high`
    /// and `volume >= 0`. NaN anywhere fails the comparisons and therefore
    /// the check.
    pub fn is_valid(&self) -> bool {
        self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
            && self.volume >= 0.0
    }
}

/// One step of a bar stream.
///
/// `Replace` carries a transient update of the current (still accumulating)
/// bar: downstream series overwrite their last row instead of appending.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub enum FeedEvent {
    Bar(Bar),
    Replace(Bar),
}

impl FeedEvent {
    pub fn bar(&self) -> &Bar {
        match self {
            Self::Bar(bar) | Self::Replace(bar) => bar,
        }
    }
}

/// Result of advancing a feed by one step.
///
/// `Pending` means input was consumed without producing an output bar yet
/// (a resampler mid-window); the stream is still alive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FeedPoll {
    Event(FeedEvent),
    Pending,
    Finished,
}

/// Source-side failure; the engine only ever sees the feed as exhausted or
/// this error at `start`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
#[error("{0}")]
pub struct FeedError(pub String);

/// Static parameters of a bar feed.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedParams {
    pub timeframe: TimeFrame,
    pub compression: u32,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub session_start: Option<NaiveTime>,
    pub session_end: Option<NaiveTime>,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            timeframe: TimeFrame::Days,
            compression: 1,
            from: None,
            to: None,
            session_start: None,
            session_end: None,
        }
    }
}

/// A source of bars.
///
/// `next` is polled once per engine iteration; after it returns `Finished`
/// the feed is never polled again.
pub trait BarFeed: Debug {
    fn name(&self) -> &str;

    fn params(&self) -> &FeedParams;

    /// Open the underlying source.
    fn start(&mut self) -> Result<(), FeedError> {
        Ok(())
    }

    fn stop(&mut self) {}

    /// Advance one step.
    fn next(&mut self) -> FeedPoll;

    /// Live feeds produce bars on their own threads and are never preloaded.
    fn is_live(&self) -> bool {
        false
    }

    /// Replaying feeds emit transient `Replace` events and force streaming
    /// mode.
    fn replays(&self) -> bool {
        false
    }
}

/// Historical feed over an in-memory bar vector.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    name: SmolStr,
    params: FeedParams,
    bars: Vec<Bar>,
    cursor: usize,
}

impl MemoryFeed {
    pub fn new(name: impl Into<SmolStr>, bars: Vec<Bar>) -> Self {
        Self {
            name: name.into(),
            params: FeedParams::default(),
            bars,
            cursor: 0,
        }
    }

    pub fn with_params(mut self, params: FeedParams) -> Self {
        self.params = params;
        self
    }
}

impl BarFeed for MemoryFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &FeedParams {
        &self.params
    }

    fn next(&mut self) -> FeedPoll {
        while self.cursor < self.bars.len() {
            let bar = self.bars[self.cursor];
            self.cursor += 1;

            if let Some(from) = self.params.from {
                if bar.time < from {
                    continue;
                }
            }
            if let Some(to) = self.params.to {
                if bar.time > to {
                    self.cursor = self.bars.len();
                    return FeedPoll::Finished;
                }
            }
            return FeedPoll::Event(FeedEvent::Bar(bar));
        }
        FeedPoll::Finished
    }
}

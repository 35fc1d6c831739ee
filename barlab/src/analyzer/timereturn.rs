use crate::analyzer::{is_bucket_boundary, Analyzer};
use crate::data::TimeFrame;
use crate::observer::ObsCtx;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Portfolio returns bucketed by timeframe.
///
/// Each bucket's return is `value_end / value_start - 1`, where the start
/// value is the final value of the previous bucket (or the starting cash
/// for the first one). Buckets are keyed by the RFC 3339 timestamp of
/// their last bar.
#[derive(Debug, Clone)]
pub struct TimeReturn {
    timeframe: TimeFrame,
    bucket_start_value: f64,
    last_value: f64,
    last_time: Option<DateTime<Utc>>,
    returns: IndexMap<String, f64>,
}

impl TimeReturn {
    pub fn new(timeframe: TimeFrame) -> Self {
        Self {
            timeframe,
            bucket_start_value: f64::NAN,
            last_value: f64::NAN,
            last_time: None,
            returns: IndexMap::new(),
        }
    }

    pub fn returns(&self) -> &IndexMap<String, f64> {
        &self.returns
    }

    fn finalize_bucket(&mut self) {
        if let Some(time) = self.last_time {
            let ret = self.last_value / self.bucket_start_value - 1.0;
            self.returns.insert(time.to_rfc3339(), ret);
        }
    }
}

impl Analyzer for TimeReturn {
    fn name(&self) -> &'static str {
        "timereturn"
    }

    fn start(&mut self, starting_cash: f64) {
        self.bucket_start_value = starting_cash;
        self.last_value = starting_cash;
        self.last_time = None;
        self.returns.clear();
    }

    fn on_bar(&mut self, ctx: &ObsCtx<'_>) {
        if let Some(prev) = self.last_time {
            if is_bucket_boundary(prev, ctx.time, self.timeframe) {
                self.finalize_bucket();
                self.bucket_start_value = self.last_value;
            }
        }
        self.last_time = Some(ctx.time);
        self.last_value = ctx.value;
    }

    fn stop(&mut self) {
        self.finalize_bucket();
        self.last_time = None;
    }

    fn analysis(&self) -> serde_json::Value {
        serde_json::to_value(&self.returns).unwrap_or(serde_json::Value::Null)
    }
}

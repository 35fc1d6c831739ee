use crate::buffer::LineBuffer;
use chrono::{DateTime, Utc};
use smol_str::SmolStr;

/// Ordered set of named [`LineBuffer`]s advancing in lockstep.
///
/// All lines of a series share one logical clock: `append_nan_row`,
/// `extend_nan`, `forward` and `set_cursor` apply uniformly to every line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineSeries {
    names: Vec<SmolStr>,
    lines: Vec<LineBuffer>,
}

impl LineSeries {
    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<SmolStr>,
    {
        let names: Vec<SmolStr> = names.into_iter().map(Into::into).collect();
        let lines = names.iter().map(|_| LineBuffer::new()).collect();
        Self { names, lines }
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn line_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(SmolStr::as_str)
    }

    pub fn line(&self, line: usize) -> &LineBuffer {
        &self.lines[line]
    }

    pub fn line_mut(&mut self, line: usize) -> &mut LineBuffer {
        &mut self.lines[line]
    }

    pub fn line_by_name(&self, name: &str) -> Option<&LineBuffer> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.lines[i])
    }

    /// Cursor-relative read of `line` at offset `ago`.
    pub fn get(&self, line: usize, ago: isize) -> f64 {
        self.lines[line].get(ago)
    }

    /// Cursor-relative write to `line` at offset `ago`.
    pub fn set(&mut self, line: usize, ago: isize, value: f64) {
        self.lines[line].set(ago, value);
    }

    pub fn get_abs(&self, line: usize, i: isize) -> f64 {
        self.lines[line].get_abs(i)
    }

    pub fn set_abs(&mut self, line: usize, i: usize, value: f64) {
        self.lines[line].set_abs(i, value);
    }

    /// Append one NaN slot to every line, cursors following (streaming).
    pub fn append_nan_row(&mut self) {
        for line in &mut self.lines {
            line.append(f64::NAN);
        }
    }

    /// Append `n` NaN slots to every line without moving cursors (batch).
    pub fn extend_nan(&mut self, n: usize) {
        for line in &mut self.lines {
            line.extend_nan(n);
        }
    }

    /// Advance every line's cursor by `n`.
    pub fn forward(&mut self, n: usize) {
        for line in &mut self.lines {
            line.forward(n);
        }
    }

    /// Park every line's cursor at absolute index `i` (`-1` rewinds fully).
    pub fn set_cursor(&mut self, i: isize) {
        for line in &mut self.lines {
            line.set_idx(i);
        }
    }

    /// Shared cursor-relative length.
    pub fn size(&self) -> usize {
        self.lines.first().map_or(0, LineBuffer::size)
    }

    /// Shared appended length regardless of cursors.
    pub fn data_size(&self) -> usize {
        self.lines.first().map_or(0, LineBuffer::data_size)
    }

    pub fn cursor(&self) -> isize {
        self.lines.first().map_or(-1, LineBuffer::get_idx)
    }

    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
    }
}

/// The seven pinned line slots of an OHLCV data series.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(usize)]
pub enum DataSlot {
    DateTime = 0,
    Open = 1,
    High = 2,
    Low = 3,
    Close = 4,
    Volume = 5,
    OpenInterest = 6,
}

impl DataSlot {
    pub const COUNT: usize = 7;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Construct the [`LineSeries`] backing one data feed, with the
/// conventional slot layout of [`DataSlot`].
pub fn ohlcv_series() -> LineSeries {
    LineSeries::new([
        "datetime",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "openinterest",
    ])
}

/// Datetimes share the `f64` line substrate as epoch seconds (UTC), with
/// microsecond resolution.
pub fn dt_to_num(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1e6
}

/// Inverse of [`dt_to_num`]; `None` for NaN or out-of-range values.
pub fn num_to_dt(num: f64) -> Option<DateTime<Utc>> {
    if !num.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((num * 1e6).round() as i64)
}

/// Read view over a data [`LineSeries`] exposing the pinned slots.
#[derive(Debug, Copy, Clone)]
pub struct DataSeries<'a> {
    series: &'a LineSeries,
}

impl<'a> DataSeries<'a> {
    pub fn new(series: &'a LineSeries) -> Self {
        debug_assert!(series.num_lines() >= DataSlot::COUNT);
        Self { series }
    }

    pub fn series(&self) -> &'a LineSeries {
        self.series
    }

    pub fn size(&self) -> usize {
        self.series.size()
    }

    pub fn datetime_num(&self, ago: isize) -> f64 {
        self.series.get(DataSlot::DateTime.index(), ago)
    }

    pub fn datetime(&self, ago: isize) -> Option<DateTime<Utc>> {
        num_to_dt(self.datetime_num(ago))
    }

    pub fn open(&self, ago: isize) -> f64 {
        self.series.get(DataSlot::Open.index(), ago)
    }

    pub fn high(&self, ago: isize) -> f64 {
        self.series.get(DataSlot::High.index(), ago)
    }

    pub fn low(&self, ago: isize) -> f64 {
        self.series.get(DataSlot::Low.index(), ago)
    }

    pub fn close(&self, ago: isize) -> f64 {
        self.series.get(DataSlot::Close.index(), ago)
    }

    pub fn volume(&self, ago: isize) -> f64 {
        self.series.get(DataSlot::Volume.index(), ago)
    }

    pub fn open_interest(&self, ago: isize) -> f64 {
        self.series.get(DataSlot::OpenInterest.index(), ago)
    }
}

/// Append one OHLCV row to a data series, cursors following.
#[allow(clippy::too_many_arguments)]
pub fn append_row(
    series: &mut LineSeries,
    dt: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    open_interest: f64,
) {
    debug_assert!(series.num_lines() >= DataSlot::COUNT);
    series.line_mut(DataSlot::DateTime.index()).append(dt_to_num(dt));
    series.line_mut(DataSlot::Open.index()).append(open);
    series.line_mut(DataSlot::High.index()).append(high);
    series.line_mut(DataSlot::Low.index()).append(low);
    series.line_mut(DataSlot::Close.index()).append(close);
    series.line_mut(DataSlot::Volume.index()).append(volume);
    series
        .line_mut(DataSlot::OpenInterest.index())
        .append(open_interest);
}

/// Overwrite the current OHLCV row in place (replay transient updates).
///
/// The series must already hold at least one row.
#[allow(clippy::too_many_arguments)]
pub fn replace_row(
    series: &mut LineSeries,
    dt: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    open_interest: f64,
) {
    debug_assert!(series.size() > 0, "replace_row on an empty series");
    series.set(DataSlot::DateTime.index(), 0, dt_to_num(dt));
    series.set(DataSlot::Open.index(), 0, open);
    series.set(DataSlot::High.index(), 0, high);
    series.set(DataSlot::Low.index(), 0, low);
    series.set(DataSlot::Close.index(), 0, close);
    series.set(DataSlot::Volume.index(), 0, volume);
    series.set(DataSlot::OpenInterest.index(), 0, open_interest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_lockstep_rows() {
        let mut series = ohlcv_series();
        append_row(&mut series, dt(60), 10.0, 10.5, 9.9, 10.2, 100.0, 0.0);
        append_row(&mut series, dt(120), 10.2, 11.2, 10.1, 11.0, 150.0, 0.0);

        let view = DataSeries::new(&series);
        assert_eq!(view.size(), 2);
        assert_eq!(view.open(0), 10.2);
        assert_eq!(view.close(-1), 10.2);
        assert_eq!(view.high(0), 11.2);
        assert_eq!(view.volume(-1), 100.0);
        assert_eq!(view.datetime(0), Some(dt(120)));
        assert!(view.close(-2).is_nan());
    }

    #[test]
    fn test_replace_row_keeps_length() {
        let mut series = ohlcv_series();
        append_row(&mut series, dt(60), 10.0, 10.5, 9.9, 10.2, 100.0, 0.0);
        replace_row(&mut series, dt(60), 10.0, 11.0, 9.8, 10.9, 180.0, 0.0);

        let view = DataSeries::new(&series);
        assert_eq!(view.size(), 1);
        assert_eq!(view.high(0), 11.0);
        assert_eq!(view.low(0), 9.8);
        assert_eq!(view.volume(0), 180.0);
    }

    #[test]
    fn test_datetime_roundtrip() {
        let original = Utc.timestamp_micros(1_700_000_000_123_456).unwrap();
        assert_eq!(num_to_dt(dt_to_num(original)), Some(original));
        assert_eq!(num_to_dt(f64::NAN), None);
    }

    #[test]
    fn test_line_lookup_by_name() {
        let series = ohlcv_series();
        assert!(series.line_by_name("close").is_some());
        assert!(series.line_by_name("vwap").is_none());
        assert_eq!(series.num_lines(), DataSlot::COUNT);
    }
}

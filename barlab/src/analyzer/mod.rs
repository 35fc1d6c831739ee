use crate::data::TimeFrame;
use crate::observer::ObsCtx;
use crate::order::Order;
use crate::trade::Trade;
use chrono::{DateTime, Datelike, Utc};
use std::fmt::Debug;

mod timereturn;
mod traderecorder;
mod transactions;

pub use timereturn::TimeReturn;
pub use traderecorder::TradeRecorder;
pub use transactions::Transactions;

/// Stateful aggregator over a run; its result is collected once at stop.
pub trait Analyzer: Debug {
    fn name(&self) -> &'static str;

    fn start(&mut self, starting_cash: f64) {
        let _ = starting_cash;
    }

    /// Per-bar hook, after the broker step.
    fn on_bar(&mut self, ctx: &ObsCtx<'_>) {
        let _ = ctx;
    }

    fn notify_order(&mut self, order: &Order) {
        let _ = order;
    }

    fn notify_trade(&mut self, trade: &Trade) {
        let _ = trade;
    }

    fn notify_cash_value(&mut self, cash: f64, value: f64) {
        let _ = (cash, value);
    }

    fn stop(&mut self) {}

    /// The accumulated result as a serializable map.
    fn analysis(&self) -> serde_json::Value;
}

/// Whether `now` starts a new aggregation bucket relative to `prev` for
/// the given timeframe. Sub-day frames bucket per calendar day.
pub fn is_bucket_boundary(prev: DateTime<Utc>, now: DateTime<Utc>, timeframe: TimeFrame) -> bool {
    match timeframe {
        TimeFrame::Years => now.year() != prev.year(),
        TimeFrame::Months => (now.year(), now.month()) != (prev.year(), prev.month()),
        TimeFrame::Weeks => now.iso_week() != prev.iso_week(),
        _ => now.date_naive() != prev.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_boundaries() {
        struct TestCase {
            prev: DateTime<Utc>,
            now: DateTime<Utc>,
            timeframe: TimeFrame,
            expected: bool,
        }

        let cases = vec![
            // TC0: same day, daily bucket
            TestCase {
                prev: Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap(),
                now: Utc.with_ymd_and_hms(2024, 3, 14, 17, 0, 0).unwrap(),
                timeframe: TimeFrame::Days,
                expected: false,
            },
            // TC1: day rollover
            TestCase {
                prev: Utc.with_ymd_and_hms(2024, 3, 14, 17, 0, 0).unwrap(),
                now: Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap(),
                timeframe: TimeFrame::Days,
                expected: true,
            },
            // TC2: Friday to Monday crosses an ISO week
            TestCase {
                prev: Utc.with_ymd_and_hms(2024, 1, 5, 17, 0, 0).unwrap(),
                now: Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap(),
                timeframe: TimeFrame::Weeks,
                expected: true,
            },
            // TC3: month rollover
            TestCase {
                prev: Utc.with_ymd_and_hms(2024, 1, 31, 17, 0, 0).unwrap(),
                now: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
                timeframe: TimeFrame::Months,
                expected: true,
            },
            // TC4: same year, yearly bucket
            TestCase {
                prev: Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
                now: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
                timeframe: TimeFrame::Years,
                expected: false,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            assert_eq!(
                is_bucket_boundary(test.prev, test.now, test.timeframe),
                test.expected,
                "TC{index} failed"
            );
        }
    }
}

use crate::data::DataId;
use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Monotonic unique order identifier assigned by the broker at submission.
///
/// Ids double as the FIFO tie-break: orders that could fill on the same bar
/// fill in ascending id order.
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
pub struct OrderId(pub u64);

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
    Close,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OrderStatus {
    Created,
    Submitted,
    Accepted,
    Partial,
    Completed,
    Canceled,
    Expired,
    Margin,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Canceled | Self::Expired | Self::Margin | Self::Rejected
        )
    }
}

/// One fill event inside an order's execution record.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct ExecutionBit {
    pub time: DateTime<Utc>,
    /// Signed executed size of this fill.
    pub size: f64,
    pub price: f64,
    /// Signed notional of this fill (`size * price`).
    pub value: f64,
    pub commission: f64,
    /// Realised PnL of the position portion this fill closed.
    pub pnl: f64,
    /// Position size after this fill.
    pub psize: f64,
    /// Position average price after this fill.
    pub pprice: f64,
}

/// Creation or execution side of an [`Order`].
///
/// On the executed side, `size`/`value`/`commission`/`pnl` accumulate over
/// the [`ExecutionBit`]s and `price` is the volume-weighted fill price.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OrderData {
    pub time: Option<DateTime<Utc>>,
    pub size: f64,
    pub price: f64,
    pub remaining: f64,
    pub value: f64,
    pub commission: f64,
    pub pnl: f64,
    pub psize: f64,
    pub pprice: f64,
    pub bits: Vec<ExecutionBit>,
}

impl OrderData {
    pub fn add_bit(&mut self, bit: ExecutionBit) {
        let filled = self.size + bit.size;
        if filled != 0.0 {
            self.price = (self.price * self.size + bit.price * bit.size) / filled;
        }
        self.size = filled;
        self.value += bit.value;
        self.commission += bit.commission;
        self.pnl += bit.pnl;
        self.remaining -= bit.size;
        self.psize = bit.psize;
        self.pprice = bit.pprice;
        self.time = Some(bit.time);
        self.bits.push(bit);
    }
}

/// Size tolerance below which an order counts as fully executed.
const SIZE_EPSILON: f64 = 1e-9;

/// An instruction to trade, and its lifecycle record.
///
/// State machine:
///
/// ```text
/// Created ─submit→ Submitted ─accept→ Accepted ─fill→ Partial ─fill→ Completed
///                                │                │
///                                ├─cancel→ Canceled┘
///                                ├─expire→ Expired
///                                ├─margin→ Margin
///                                └─reject→ Rejected
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub data: DataId,
    /// Signed size: positive buys, negative sells.
    pub size: f64,
    /// Limit price (Limit and triggered StopLimit), or stop trigger (Stop).
    pub price: Option<f64>,
    /// Limit price of a StopLimit once its stop trigger fires.
    pub price_limit: Option<f64>,
    pub trail_amount: Option<f64>,
    pub trail_percent: Option<f64>,
    pub kind: OrderKind,
    pub status: OrderStatus,
    pub parent: Option<OrderId>,
    /// Expiry; the order expires on the first bar whose time is beyond it.
    pub valid: Option<DateTime<Utc>>,
    pub created: OrderData,
    pub executed: OrderData,
    /// Running stop level of a trailing stop.
    pub trail_price: Option<f64>,
    /// A StopLimit that has fired behaves as a Limit from that bar on.
    pub triggered: bool,
}

impl Order {
    pub fn is_buy(&self) -> bool {
        self.size > 0.0
    }

    pub fn is_sell(&self) -> bool {
        self.size < 0.0
    }

    pub fn alive(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Created
                | OrderStatus::Submitted
                | OrderStatus::Accepted
                | OrderStatus::Partial
        )
    }

    /// Signed size still to execute.
    pub fn remaining(&self) -> f64 {
        self.size - self.executed.size
    }

    pub fn is_filled(&self) -> bool {
        self.remaining().abs() <= SIZE_EPSILON
    }
}

/// Parameters of an order being submitted; everything the broker does not
/// assign itself.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderRequest {
    pub data: DataId,
    pub size: f64,
    pub kind: OrderKind,
    pub price: Option<f64>,
    pub price_limit: Option<f64>,
    pub trail_amount: Option<f64>,
    pub trail_percent: Option<f64>,
    pub parent: Option<OrderId>,
    pub valid: Option<DateTime<Utc>>,
}

impl OrderRequest {
    pub fn market(data: DataId, size: f64) -> Self {
        Self {
            data,
            size,
            kind: OrderKind::Market,
            price: None,
            price_limit: None,
            trail_amount: None,
            trail_percent: None,
            parent: None,
            valid: None,
        }
    }

    pub fn limit(data: DataId, size: f64, price: f64) -> Self {
        Self {
            kind: OrderKind::Limit,
            price: Some(price),
            ..Self::market(data, size)
        }
    }

    pub fn stop(data: DataId, size: f64, price: f64) -> Self {
        Self {
            kind: OrderKind::Stop,
            price: Some(price),
            ..Self::market(data, size)
        }
    }

    pub fn stop_limit(data: DataId, size: f64, stop: f64, limit: f64) -> Self {
        Self {
            kind: OrderKind::StopLimit,
            price: Some(stop),
            price_limit: Some(limit),
            ..Self::market(data, size)
        }
    }

    pub fn close(data: DataId, size: f64) -> Self {
        Self {
            kind: OrderKind::Close,
            ..Self::market(data, size)
        }
    }

    pub fn stop_trail(data: DataId, size: f64, amount: f64) -> Self {
        Self {
            kind: OrderKind::Stop,
            trail_amount: Some(amount),
            ..Self::market(data, size)
        }
    }

    pub fn stop_trail_percent(data: DataId, size: f64, percent: f64) -> Self {
        Self {
            kind: OrderKind::Stop,
            trail_percent: Some(percent),
            ..Self::market(data, size)
        }
    }

    pub fn with_valid(mut self, valid: DateTime<Utc>) -> Self {
        self.valid = Some(valid);
        self
    }

    pub fn with_parent(mut self, parent: OrderId) -> Self {
        self.parent = Some(parent);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(size: f64) -> Order {
        Order {
            id: OrderId(1),
            data: DataId(0),
            size,
            price: None,
            price_limit: None,
            trail_amount: None,
            trail_percent: None,
            kind: OrderKind::Market,
            status: OrderStatus::Accepted,
            parent: None,
            valid: None,
            created: OrderData {
                size,
                remaining: size,
                ..OrderData::default()
            },
            executed: OrderData {
                remaining: size,
                ..OrderData::default()
            },
            trail_price: None,
            triggered: false,
        }
    }

    #[test]
    fn test_status_liveness() {
        struct TestCase {
            status: OrderStatus,
            alive: bool,
        }

        let cases = vec![
            TestCase {
                status: OrderStatus::Created,
                alive: true,
            },
            TestCase {
                status: OrderStatus::Submitted,
                alive: true,
            },
            TestCase {
                status: OrderStatus::Accepted,
                alive: true,
            },
            TestCase {
                status: OrderStatus::Partial,
                alive: true,
            },
            TestCase {
                status: OrderStatus::Completed,
                alive: false,
            },
            TestCase {
                status: OrderStatus::Canceled,
                alive: false,
            },
            TestCase {
                status: OrderStatus::Expired,
                alive: false,
            },
            TestCase {
                status: OrderStatus::Margin,
                alive: false,
            },
            TestCase {
                status: OrderStatus::Rejected,
                alive: false,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let mut o = order(10.0);
            o.status = test.status;
            assert_eq!(o.alive(), test.alive, "TC{index} failed");
            assert_eq!(o.status.is_terminal(), !test.alive, "TC{index} failed");
        }
    }

    #[test]
    fn test_execution_bits_accumulate() {
        let time = Utc.timestamp_opt(0, 0).unwrap();
        let mut o = order(100.0);

        o.executed.add_bit(ExecutionBit::new(
            time, 40.0, 50.0, 2000.0, 1.0, 0.0, 40.0, 50.0,
        ));
        assert_eq!(o.remaining(), 60.0);
        assert!(!o.is_filled());
        assert_eq!(o.executed.price, 50.0);

        o.executed.add_bit(ExecutionBit::new(
            time, 60.0, 51.0, 3060.0, 1.5, 0.0, 100.0, 50.6,
        ));
        assert!(o.is_filled());
        assert_eq!(o.executed.commission, 2.5);
        // Volume-weighted fill price
        assert!((o.executed.price - 50.6).abs() < 1e-12);
        assert_eq!(o.executed.bits.len(), 2);
    }
}

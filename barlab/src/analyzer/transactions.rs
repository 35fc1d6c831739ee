use crate::analyzer::Analyzer;
use crate::order::{Order, OrderStatus};
use indexmap::IndexMap;
use serde::Serialize;

/// One fill, as recorded by [`Transactions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub data: usize,
    pub size: f64,
    pub price: f64,
    /// Signed notional of the fill.
    pub value: f64,
}

/// Every execution of the run, keyed by fill timestamp.
#[derive(Debug, Clone, Default)]
pub struct Transactions {
    records: IndexMap<String, Vec<TransactionRecord>>,
}

impl Transactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &IndexMap<String, Vec<TransactionRecord>> {
        &self.records
    }
}

impl Analyzer for Transactions {
    fn name(&self) -> &'static str {
        "transactions"
    }

    fn notify_order(&mut self, order: &Order) {
        if !matches!(order.status, OrderStatus::Partial | OrderStatus::Completed) {
            return;
        }
        // Each fill notification carries its bit as the latest entry
        let Some(bit) = order.executed.bits.last() else {
            return;
        };
        self.records
            .entry(bit.time.to_rfc3339())
            .or_default()
            .push(TransactionRecord {
                data: order.data.0,
                size: bit.size,
                price: bit.price,
                value: bit.value,
            });
    }

    fn analysis(&self) -> serde_json::Value {
        serde_json::to_value(&self.records).unwrap_or(serde_json::Value::Null)
    }
}

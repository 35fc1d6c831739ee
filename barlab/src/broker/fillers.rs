use crate::data::Bar;
use crate::order::Order;
use std::fmt::Debug;

/// Policy deciding the executable size of one order against one bar.
///
/// Returns an absolute size; the broker caps it at the order's remaining
/// size and applies the order's sign. Every filler sees the full bar
/// volume: the budget is per order, not shared across the queue.
pub trait Filler: Debug {
    fn fill_size(&self, order: &Order, price: f64, bar: &Bar) -> f64;
}

/// `min(remaining, volume, size)`; no `size` means volume-only capping.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FixedSize {
    pub size: Option<f64>,
}

impl FixedSize {
    pub fn new(size: f64) -> Self {
        Self { size: Some(size) }
    }

    pub fn unlimited() -> Self {
        Self { size: None }
    }
}

impl Filler for FixedSize {
    fn fill_size(&self, order: &Order, _price: f64, bar: &Bar) -> f64 {
        let cap = self.size.unwrap_or(f64::INFINITY);
        order.remaining().abs().min(bar.volume).min(cap)
    }
}

/// `min(remaining, floor(volume * perc / 100))`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FixedBarPerc {
    pub perc: f64,
}

impl FixedBarPerc {
    pub fn new(perc: f64) -> Self {
        Self {
            perc: perc.clamp(0.0, 100.0),
        }
    }
}

impl Filler for FixedBarPerc {
    fn fill_size(&self, order: &Order, _price: f64, bar: &Bar) -> f64 {
        let max_size = (bar.volume * self.perc / 100.0).floor();
        order.remaining().abs().min(max_size)
    }
}

/// Distributes the bar volume uniformly over price slots of width `minmov`
/// between low and high, granting one slot's allocation scaled by `perc`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BarPointPerc {
    pub minmov: f64,
    pub perc: f64,
}

impl BarPointPerc {
    pub fn new(minmov: f64, perc: f64) -> Self {
        Self {
            minmov,
            perc: perc.clamp(0.0, 100.0),
        }
    }

    fn parts(&self, high: f64, low: f64) -> f64 {
        if self.minmov <= 0.0 {
            return 1.0;
        }
        ((high - low + self.minmov) / self.minmov).floor()
    }
}

impl Filler for BarPointPerc {
    fn fill_size(&self, order: &Order, _price: f64, bar: &Bar) -> f64 {
        let parts = self.parts(bar.high, bar.low);
        let allocated = (bar.volume / parts * self.perc / 100.0).floor();
        order.remaining().abs().min(allocated)
    }
}

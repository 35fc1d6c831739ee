use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Net position on one instrument: signed cumulative size and
/// volume-weighted average entry price.
#[derive(Debug, Copy, Clone, Default, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Position {
    pub size: f64,
    pub price: f64,
}

/// How one fill split against the existing position.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PositionUpdate {
    /// Signed portion of the fill that opened or increased exposure.
    pub opened: f64,
    /// Signed portion of the fill that reduced or closed exposure.
    pub closed: f64,
    /// Average entry price before the fill (basis of the closed portion).
    pub price_before: f64,
}

impl Position {
    /// Apply a signed fill at `price`, returning the opened/closed split.
    ///
    /// Increasing exposure re-weights the average entry price; reducing
    /// leaves it unchanged; flattening zeroes it; flipping through zero
    /// restarts the position at the fill price with the leftover size.
    pub fn update(&mut self, size: f64, price: f64) -> PositionUpdate {
        let before = *self;
        let after_size = self.size + size;

        if before.size == 0.0 || (before.size > 0.0) == (size > 0.0) {
            // Opening or increasing
            if after_size != 0.0 {
                self.price = (before.price * before.size + price * size) / after_size;
            }
            self.size = after_size;
            PositionUpdate {
                opened: size,
                closed: 0.0,
                price_before: before.price,
            }
        } else if after_size == 0.0 || (after_size > 0.0) == (before.size > 0.0) {
            // Reducing or flattening
            self.size = after_size;
            if after_size == 0.0 {
                self.price = 0.0;
            }
            PositionUpdate {
                opened: 0.0,
                closed: size,
                price_before: before.price,
            }
        } else {
            // Flipping through zero
            self.size = after_size;
            self.price = price;
            PositionUpdate {
                opened: after_size,
                closed: -before.size,
                price_before: before.price,
            }
        }
    }
}

//! Concrete indicator kernels.
//!
//! Every kernel implements [`Indicator`](crate::indicator::Indicator) and
//! relies on NaN-strict window arithmetic for its warm-up: any window that
//! is incomplete, or that still overlaps an upstream warm-up, evaluates to
//! NaN without explicit bookkeeping.

mod dv2;
mod hilo;
mod moves;
mod percentrank;
mod rmi;
mod roc;
mod sma;
mod smma;
mod stochastic;
mod truerange;
mod vortex;

pub use dv2::Dv2;
pub use hilo::{Highest, Lowest};
pub use moves::{DownMove, UpMove};
pub use percentrank::PercentRank;
pub use rmi::RelativeMomentumIndex;
pub use roc::{PercentChange, RateOfChange};
pub use sma::SimpleMovingAverage;
pub use smma::SmoothedMovingAverage;
pub use stochastic::{Stochastic, StochasticFast};
pub use truerange::TrueRange;
pub use vortex::Vortex;

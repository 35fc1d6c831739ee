#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! # Barlab-TA
//! Line-buffer data model and technical indicator framework for the Barlab
//! bar-driven trading engine.
//!
//! Every time series (prices, indicator outputs, observer outputs) is a
//! growable, relatively-indexed column of `f64` ([`LineBuffer`]). Named
//! bundles of buffers form a [`LineSeries`]; OHLCV data pins the seven
//! conventional slots via [`DataSlot`]. Series live in a [`SeriesArena`] and
//! are addressed by [`SeriesId`], so indicators reference their inputs by
//! index instead of shared pointers.
//!
//! Indicators implement the [`Indicator`] trait: a per-bar streaming kernel
//! plus an optional vectorized batch kernel (`once`) that must produce
//! bit-identical output. Warm-up is expressed through min-period
//! propagation; values before an indicator's min-period are NaN.

/// Growable column of doubles with relative (ago) indexing and a movable
/// logical cursor.
pub mod buffer;

/// Named bundles of [`LineBuffer`]s, and the OHLCV slot convention.
pub mod series;

/// Index-addressed storage for every series in a run.
pub mod arena;

/// The [`Indicator`] trait, kernel context and min-period propagation.
pub mod indicator;

/// Deferred line arithmetic as a tagged-variant expression tree.
pub mod expr;

/// Concrete indicator kernels.
pub mod indicators;

pub use arena::{Ctx, LineRef, SeriesArena, SeriesId};
pub use buffer::{safe_div, LineBuffer};
pub use expr::{ExprIndicator, LineExpr};
pub use indicator::{BindError, Indicator};
pub use series::{dt_to_num, num_to_dt, ohlcv_series, DataSeries, DataSlot, LineSeries};

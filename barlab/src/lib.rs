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
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Barlab
//! Barlab is a bar-driven backtesting and live-trading engine.
//!
//! A strategy consumes one or more time-indexed OHLCV bar streams, computes
//! derived signals through the `barlab-ta` indicator framework, and issues
//! orders; a simulated broker matches those orders against the bar stream,
//! tracks positions, realises trades and feeds performance observers and
//! analyzers.
//!
//! At a high level it provides:
//! * Data feeds ([`data`]) with resample/replay filters that re-bin an
//!   input stream to a coarser timeframe while preserving event ordering.
//! * A broker simulator ([`broker`]) with a full order state machine
//!   (market/limit/stop/stop-limit/close, trailing stops), volume-aware
//!   partial fills and pluggable commission schemes.
//! * Trade lifecycle tracking ([`trade`]) from position open to flat.
//! * The engine ([`engine`]) that drives feeds, indicators, strategy
//!   callbacks, broker matching and observer/analyzer notifications in a
//!   fixed, deterministic per-bar order.
//!
//! The engine is single-threaded and cooperative: live feeds hand bars
//! over through a queue ([`data::live`]), and everything downstream of the
//! queue runs on the engine thread.

/// Passive aggregate statistics collected over a run.
///
/// eg/ `Transactions`, `TimeReturn`, `TradeRecorder`.
pub mod analyzer;

/// The simulated broker: order matching, fillers, commission schemes.
pub mod broker;

/// Bar streams: feed traits, in-memory and live feeds, resample/replay.
pub mod data;

/// The engine (`Cerebro`): graph bootstrap and the per-bar loop.
pub mod engine;

/// Defines all possible errors in Barlab core.
pub mod error;

/// Provides default Barlab Tracing logging initialisers.
pub mod logging;

/// Per-bar indicator-shaped consumers of broker state.
///
/// eg/ `CashValue`, `BuySell`, `TradesPnl`, `DrawDown`.
pub mod observer;

/// The order state machine and execution records.
pub mod order;

/// Net position per instrument with weighted-average entry price.
pub mod position;

/// Strategy trait and the per-bar context handed to it.
pub mod strategy;

/// Trade lifecycle accumulator: open to flat, with full history.
pub mod trade;

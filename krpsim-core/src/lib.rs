//! Process-selection core for `krpsim`, a discrete-cycle resource-flow optimizer.
//!
//! Given a parsed process graph (names, `needs`, `results`, `delay`) and a set of
//! target resources to maximize, this crate decides, once per simulation cycle,
//! which runnable process the simulator should start next. It does not parse
//! `.krpsim` files, does not advance cycles, and does not apply the stock deltas
//! of a chosen process — all of that belongs to the host simulator.
//!
//! ## Subsystems
//!
//! - `analysis`   One-shot graph analysis at startup: high-value classification,
//!                value-chain depth, bulk targets, target reserves.
//! - `phase`      Per-cycle Gathering/Production/Conversion/Selling state machine.
//! - `scoring`    Pure scoring function composing base efficiency, target-production
//!                bonus, bulk modifiers, reservation penalties, and phase multipliers.
//! - `bottleneck` Pre-scoring short-circuit for value-chain and high-value starvation.
//! - `optimizer`  The `Optimizer` facade (`initialize` + `select`) tying the above
//!                together with stall detection and cash-flow-mode recovery.
//!
//! `initialize` runs the Graph Analyzer once; every subsequent `select` call
//! consults the Phase Controller, Bottleneck Detector, Scoring Engine, and
//! Selector in that order, and is a pure function of `(analysis, phase_state,
//! cycle, stocks)` — see the crate's invariant tests for the determinism
//! guarantee this implies.

pub mod analysis;
pub mod bottleneck;
pub mod error;
#[cfg(feature = "instrument")]
pub use instrument;
pub mod optimizer;
pub mod phase;
pub mod scoring;
pub mod types;

pub use analysis::Analysis;
pub use error::{KrpsimError, KrpsimResult};
pub use optimizer::{Optimizer, Snapshot};
pub use types::{KrpsimTuning, Phase, Process, ProcessId, Quantity, ResourceId};

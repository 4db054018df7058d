//! Phase state machine (§4.2): decides which of the four operating phases
//! is in effect for the current cycle, which in turn drives the scoring
//! multiplier table in [`crate::scoring`].

use crate::analysis::Analysis;
use crate::types::{CompiledProcess, KrpsimTuning, Phase, Quantity};

/// Evaluate the ordered phase rules for the current cycle.
///
/// Rules are checked in order; the first that matches wins. `stocks` is
/// indexed by [`ResourceId`]; `value_chain_stock_ratio` is
/// `sum(stocks[r]) / sum(bulk_targets[r])` over `value_chain_resources`,
/// used by the Conversion/Production cycle-or-ratio rules.
#[allow(clippy::too_many_arguments)]
pub fn detect_phase(
    cycle: u64,
    horizon: u64,
    stocks: &[Quantity],
    processes: &[CompiledProcess],
    analysis: &Analysis,
    any_high_value_ever_runnable: bool,
    tuning: &KrpsimTuning,
    gathering_limit_cycle: u64,
) -> Phase {
    // Rule 1: long-horizon selling override.
    if horizon > tuning.long_horizon_cycle_threshold {
        let threshold = (horizon as f64 * tuning.selling_horizon_fraction) as u64;
        if cycle >= threshold && any_high_value_ever_runnable {
            return Phase::Selling;
        }
    }

    // Rule 2: any high-value process currently executable -> Selling.
    let can_execute_hv = processes.iter().any(|p| analysis.is_high_value(p.id) && p.can_execute(stocks));
    if can_execute_hv {
        return Phase::Selling;
    }

    let ratio = value_chain_stock_ratio(stocks, analysis);

    // Rule 3: deep into the run with thin reserves -> Conversion.
    if cycle > tuning.conversion_cycle_threshold && ratio > tuning.conversion_ratio_threshold {
        return Phase::Conversion;
    }

    // Rule 4: moderately into the run with thin reserves -> Production.
    if cycle > tuning.production_cycle_threshold && ratio > tuning.production_ratio_threshold {
        return Phase::Production;
    }

    // Rule 5: default to Gathering until the gathering limit, then Production.
    if cycle > gathering_limit_cycle {
        Phase::Production
    } else {
        Phase::Gathering
    }
}

/// §4.2's `value_chain_stock_ratio`: `sum(stocks[r]) / sum(bulk_targets[r])`
/// over every resource in `value_chain_resources`. `0.0` when there are no
/// value-chain resources (degraded `NoHighValue` mode) or no bulk targets
/// to compare against, so the ratio rules never spuriously fire.
fn value_chain_stock_ratio(stocks: &[Quantity], analysis: &Analysis) -> f64 {
    let mut have = 0i64;
    let mut need = 0i64;
    for &r in &analysis.value_chain_resources {
        have += stocks.get(r.0 as usize).copied().unwrap_or(0);
        need += analysis.bulk_target(r).unwrap_or(0);
    }
    if need <= 0 {
        0.0
    } else {
        have as f64 / need as f64
    }
}

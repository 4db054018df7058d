//! Scoring Engine (§4.3): a pure function from `(process, stocks, phase,
//! analysis, flags)` to a non-negative real score. No step here holds state;
//! everything needed is passed in or read from [`Analysis`].

use crate::analysis::Analysis;
use crate::types::{CompiledProcess, Phase, Quantity, ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseCategory {
    HighValue,
    Gatherer,
    Depth1Producer,
    DeepProducer,
    Other,
}

/// Score a single runnable candidate. `all_processes` is needed only for the
/// step-7 conversion-loop guard, which must look at other processes' needs
/// and results to detect a two-cycle.
pub fn score(
    process: &CompiledProcess,
    stocks: &[Quantity],
    phase: Phase,
    analysis: &Analysis,
    targets: &[ResourceId],
    time_resource: Option<ResourceId>,
    all_processes: &[CompiledProcess],
    cash_flow_mode: bool,
) -> f64 {
    let stock_of = |r: ResourceId| stocks.get(r.0 as usize).copied().unwrap_or(0);

    let mut s = base_efficiency(process, targets);
    s += target_production_bonus(process, targets);
    s *= bulk_consumption_penalty(process, analysis, targets, &stock_of);
    s *= bulk_production_bonus(process, analysis, &stock_of);

    if !matches!(phase, Phase::Gathering) && !cash_flow_mode {
        s *= target_reservation_penalty(process, analysis, targets, &stock_of);
    }

    s *= phase_multiplier(process, phase, analysis, time_resource, cash_flow_mode);
    s *= conversion_loop_guard(process, analysis, all_processes);

    if !s.is_finite() {
        return 0.0;
    }
    s.max(0.0)
}

fn base_efficiency(process: &CompiledProcess, targets: &[ResourceId]) -> f64 {
    let output_value: Quantity = targets.iter().map(|&t| process.result_of(t)).sum();
    let input_cost = process.total_input_units();

    if process.needs.is_empty() {
        100_000.0
    } else if input_cost > 0 {
        (output_value as f64 / input_cost as f64) * 100.0
    } else {
        output_value as f64 * 100.0
    }
}

fn target_production_bonus(process: &CompiledProcess, targets: &[ResourceId]) -> f64 {
    let np: Quantity = targets.iter().map(|&t| process.net(t)).sum();
    let mut bonus = np as f64 * 50_000.0;
    let multiplier = if np > 10_000 {
        200.0
    } else if np > 1_000 {
        80.0
    } else if np > 100 {
        30.0
    } else if np > 0 {
        10.0
    } else {
        1.0
    };
    bonus *= multiplier;
    bonus
}

fn bulk_consumption_penalty(
    process: &CompiledProcess,
    analysis: &Analysis,
    targets: &[ResourceId],
    stock_of: &impl Fn(ResourceId) -> Quantity,
) -> f64 {
    let mut factor = 1.0;
    for &(r, _) in &process.needs {
        let Some(bulk_target) = analysis.bulk_target(r) else {
            continue;
        };
        if stock_of(r) >= bulk_target {
            continue;
        }
        let rescue = targets.iter().any(|&t| {
            stock_of(t) < analysis.target_reserve(t) && process.net(t) > 0
        });
        factor *= if rescue { 1.0 } else { 0.0001 };
    }
    factor
}

fn bulk_production_bonus(
    process: &CompiledProcess,
    analysis: &Analysis,
    stock_of: &impl Fn(ResourceId) -> Quantity,
) -> f64 {
    let mut factor = 1.0;
    for &(r, _) in &process.results {
        let Some(bulk_target) = analysis.bulk_target(r) else {
            continue;
        };
        let have = stock_of(r);
        if have < bulk_target {
            let shortage = (bulk_target - have) as f64 / bulk_target as f64;
            factor *= 1000.0 + shortage * 100_000.0;
        } else {
            factor *= 0.0001;
        }
    }
    factor
}

fn target_reservation_penalty(
    process: &CompiledProcess,
    analysis: &Analysis,
    targets: &[ResourceId],
    stock_of: &impl Fn(ResourceId) -> Quantity,
) -> f64 {
    let mut factor = 1.0;
    for &t in targets {
        let needed = process.need_of(t);
        if needed == 0 {
            continue;
        }
        let available = stock_of(t) - analysis.target_reserve(t);

        factor *= if available < needed {
            if analysis.is_high_value(process.id) {
                1.0
            } else if process
                .results
                .iter()
                .any(|&(r, _)| analysis.value_chain_resources.contains(&r))
            {
                1.0 / 1000.0
            } else {
                1.0 / 10_000_000.0
            }
        } else if available < 100 {
            1.0 / 10_000.0
        } else if available < 1_000 {
            1.0 / 1_000.0
        } else if available < 10_000 {
            1.0 / 100.0
        } else {
            1.0 / 10.0
        };
    }
    factor
}

fn phase_category(
    process: &CompiledProcess,
    analysis: &Analysis,
    time_resource: Option<ResourceId>,
) -> PhaseCategory {
    if analysis.is_high_value(process.id) {
        return PhaseCategory::HighValue;
    }
    if process.is_gatherer(time_resource) {
        return PhaseCategory::Gatherer;
    }
    let min_depth = process
        .results
        .iter()
        .filter_map(|&(r, _)| analysis.depth(r))
        .min();
    match min_depth {
        Some(1) => PhaseCategory::Depth1Producer,
        Some(_) => PhaseCategory::DeepProducer,
        None => PhaseCategory::Other,
    }
}

fn phase_multiplier(
    process: &CompiledProcess,
    phase: Phase,
    analysis: &Analysis,
    time_resource: Option<ResourceId>,
    cash_flow_mode: bool,
) -> f64 {
    let category = phase_category(process, analysis, time_resource);

    if cash_flow_mode && category == PhaseCategory::Gatherer {
        return 2.0;
    }

    match (phase, category) {
        (Phase::Gathering, PhaseCategory::Gatherer) => 2.0,
        (Phase::Gathering, _) => 1.0,

        (Phase::Production, PhaseCategory::DeepProducer) => 50.0,
        (Phase::Production, PhaseCategory::Gatherer) => 0.0001,
        (Phase::Production, _) => 1.0,

        (Phase::Conversion, PhaseCategory::Depth1Producer) => 500.0,
        (Phase::Conversion, PhaseCategory::DeepProducer) => 100.0,
        (Phase::Conversion, PhaseCategory::Gatherer) => 0.000001,
        (Phase::Conversion, _) => 1.0,

        (Phase::Selling, PhaseCategory::HighValue) => 10_000_000.0,
        (Phase::Selling, PhaseCategory::Gatherer) => 0.00000001,
        (Phase::Selling, _) => 1.0,
    }
}

/// §4.3 step 7: penalize a two-process cycle (`p` consumes what `q`
/// produces and vice versa) when neither side is high-value, so the
/// selector doesn't thrash between a split/rejoin pair forever.
///
/// The spec requires breaking the symmetry "by preferring the direction
/// that moves closer to a value-chain resource": only the side whose
/// output sits *deeper* (further upstream, less refined) than its own
/// input is undoing progress and gets penalized; the side refining toward
/// depth 1 is left alone.
fn conversion_loop_guard(process: &CompiledProcess, analysis: &Analysis, all_processes: &[CompiledProcess]) -> f64 {
    if analysis.is_high_value(process.id) {
        return 1.0;
    }

    let p_needs: Vec<ResourceId> = process.needs.iter().map(|&(r, _)| r).collect();
    let p_results: Vec<ResourceId> = process.results.iter().map(|&(r, _)| r).collect();

    for q in all_processes {
        if q.id == process.id || analysis.is_high_value(q.id) {
            continue;
        }
        let q_produces_p_need = q.results.iter().any(|&(r, _)| p_needs.contains(&r));
        let q_consumes_p_result = q.needs.iter().any(|&(r, _)| p_results.contains(&r));
        if q_produces_p_need && q_consumes_p_result {
            return if moves_away_from_value_chain(process, analysis) { 0.00001 } else { 1.0 };
        }
    }
    1.0
}

/// Shallowest `value_chain_depth` among a set of resources, or `None` if
/// none of them are in the value chain at all.
fn min_depth(resources: &[(ResourceId, Quantity)], analysis: &Analysis) -> Option<u32> {
    resources.iter().filter_map(|&(r, _)| analysis.depth(r)).min()
}

/// True when `process` converts something closer to the value chain
/// (shallower depth) into something farther from it (deeper depth, or
/// entirely outside the value chain) -- i.e. it undoes refinement rather
/// than contributing to it.
fn moves_away_from_value_chain(process: &CompiledProcess, analysis: &Analysis) -> bool {
    match (min_depth(&process.needs, analysis), min_depth(&process.results, analysis)) {
        (Some(needs_depth), Some(results_depth)) => results_depth > needs_depth,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

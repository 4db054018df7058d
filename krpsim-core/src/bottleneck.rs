//! Bottleneck Detector (§4.4): runs before scoring and may short-circuit
//! the Selector with a priority decision when a value-chain resource is
//! running thin, or when a high-value process is starved of bulk input.

use crate::analysis::Analysis;
use crate::types::{CompiledProcess, Phase, ProcessId, Quantity, ResourceId};

struct Candidate {
    process: ProcessId,
    priority: f64,
    produced_depth: u32,
    delay: u32,
}

/// Returns the highest-priority bottleneck-breaking process, if any
/// affordable candidate exists.
pub fn detect(
    processes: &[CompiledProcess],
    stocks: &[Quantity],
    analysis: &Analysis,
    targets: &[ResourceId],
    phase: Phase,
    multiplier: u32,
) -> Option<ProcessId> {
    let mut candidates = Vec::new();

    candidates.extend(value_chain_candidates(processes, stocks, analysis, targets));

    if matches!(phase, Phase::Conversion | Phase::Selling) {
        candidates.extend(high_value_blocker_candidates(processes, stocks, analysis, multiplier));
    }

    candidates
        .into_iter()
        .filter(|c| {
            processes
                .iter()
                .find(|p| p.id == c.process)
                .is_some_and(|p| p.can_execute(stocks))
        })
        .max_by(|a, b| {
            a.priority
                .partial_cmp(&b.priority)
                .unwrap()
                .then_with(|| b.produced_depth.cmp(&a.produced_depth))
                .then_with(|| b.delay.cmp(&a.delay))
        })
        .map(|c| c.process)
}

fn value_chain_candidates(
    processes: &[CompiledProcess],
    stocks: &[Quantity],
    analysis: &Analysis,
    targets: &[ResourceId],
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for &r in &analysis.value_chain_resources {
        let Some(bulk_target) = analysis.bulk_target(r) else {
            continue;
        };
        let have = stocks.get(r.0 as usize).copied().unwrap_or(0);
        if have >= bulk_target {
            continue;
        }

        let downstream_value = downstream_value_of(processes, analysis, targets);
        let urgency = (bulk_target - have) as f64 * 1000.0 + downstream_value;

        for p in processes.iter().filter(|p| p.result_of(r) > 0) {
            out.push(Candidate {
                process: p.id,
                priority: urgency,
                produced_depth: analysis.depth(r).unwrap_or(u32::MAX),
                delay: p.delay,
            });
        }
    }
    out
}

/// Sum of net target production of every high-value process. Every
/// value-chain resource is, by construction, on the dependency path of at
/// least one high-value process; this sums across all of them rather than
/// attempting to attribute a share of downstream value per branch of the
/// graph (see DESIGN.md).
fn downstream_value_of(processes: &[CompiledProcess], analysis: &Analysis, targets: &[ResourceId]) -> f64 {
    processes
        .iter()
        .enumerate()
        .filter(|(idx, _)| analysis.is_high_value(ProcessId(*idx as u32)))
        .map(|(_, p)| targets.iter().map(|&t| p.net(t)).sum::<Quantity>() as f64)
        .sum::<f64>()
        .max(0.0)
}

fn high_value_blocker_candidates(
    processes: &[CompiledProcess],
    stocks: &[Quantity],
    analysis: &Analysis,
    multiplier: u32,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (idx, hv) in processes.iter().enumerate() {
        if !analysis.is_high_value(ProcessId(idx as u32)) {
            continue;
        }
        for &(r, need_qty) in &hv.needs {
            let threshold = need_qty * multiplier as Quantity;
            let have = stocks.get(r.0 as usize).copied().unwrap_or(0);
            if have >= threshold {
                continue;
            }
            let shortage = threshold - have;
            let priority = 10_000_000.0 + shortage as f64 * 10_000.0;

            for p in processes.iter().filter(|p| p.result_of(r) > 0) {
                out.push(Candidate {
                    process: p.id,
                    priority,
                    produced_depth: analysis.depth(r).unwrap_or(u32::MAX),
                    delay: p.delay,
                });
            }
        }
    }
    out
}

//! One-shot static analysis of the process graph (§4.1).
//!
//! Runs exactly once, inside [`crate::Optimizer::initialize`]. Everything it
//! produces is immutable for the remainder of the run; the scoring and
//! bottleneck-detection hot paths only ever read from [`Analysis`].

use std::collections::HashSet;

use crate::types::{CompiledProcess, KrpsimTuning, ProcessId, Quantity, ResourceId};

/// The full analysis artifact bundle (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub high_value: Vec<bool>,
    pub value_chain_resources: HashSet<ResourceId>,
    value_chain_depth: Vec<Option<u32>>,
    bulk_targets: Vec<Option<Quantity>>,
    pub intermediate_needs: Vec<(ProcessId, Vec<(ResourceId, Quantity)>)>,
    target_reserve_needed: Vec<Option<Quantity>>,
    pub bulk_multiplier: u32,
    max_production_for_target: Vec<Option<Quantity>>,
}

impl Analysis {
    pub fn is_high_value(&self, process: ProcessId) -> bool {
        self.high_value.get(process.0 as usize).copied().unwrap_or(false)
    }

    pub fn depth(&self, resource: ResourceId) -> Option<u32> {
        self.value_chain_depth.get(resource.0 as usize).copied().flatten()
    }

    pub fn bulk_target(&self, resource: ResourceId) -> Option<Quantity> {
        self.bulk_targets.get(resource.0 as usize).copied().flatten()
    }

    pub fn target_reserve(&self, resource: ResourceId) -> Quantity {
        self.target_reserve_needed
            .get(resource.0 as usize)
            .copied()
            .flatten()
            .unwrap_or(0)
    }

    pub fn max_production_for_target(&self, resource: ResourceId) -> Quantity {
        self.max_production_for_target
            .get(resource.0 as usize)
            .copied()
            .flatten()
            .unwrap_or(0)
    }

    pub fn has_high_value(&self) -> bool {
        self.high_value.iter().any(|&b| b)
    }
}

/// Build the analysis bundle for a compiled process list.
///
/// `num_resources` must be the interner length at the time of `initialize` --
/// every `ResourceId` referenced by `processes`/`targets` must be `< num_resources`.
pub fn analyze(
    processes: &[CompiledProcess],
    targets: &[ResourceId],
    horizon: u64,
    tuning: &KrpsimTuning,
    num_resources: usize,
) -> (Analysis, u64) {
    let high_value = classify_high_value(processes, targets);

    let (bulk_multiplier, gathering_limit_cycle) = adaptive_bulk_multiplier(processes, targets, horizon, tuning);

    let value_chain_depth = compute_depth(processes, &high_value, num_resources, tuning);

    let value_chain_resources: HashSet<ResourceId> = value_chain_depth
        .iter()
        .enumerate()
        .filter_map(|(idx, d)| d.map(|_| ResourceId(idx as u32)))
        .collect();

    let bulk_targets = compute_bulk_targets(
        processes,
        &high_value,
        &value_chain_depth,
        bulk_multiplier,
        num_resources,
        tuning,
    );

    let target_reserve_needed = compute_target_reserves(
        processes,
        targets,
        &high_value,
        &value_chain_resources,
        bulk_multiplier,
        num_resources,
    );

    let max_production_for_target = compute_max_production(processes, targets, num_resources);

    let intermediate_needs = processes
        .iter()
        .enumerate()
        .filter(|(idx, _)| high_value[*idx])
        .map(|(_, p)| (p.id, p.needs.clone()))
        .collect();

    let analysis = Analysis {
        high_value,
        value_chain_resources,
        value_chain_depth,
        bulk_targets,
        intermediate_needs,
        target_reserve_needed,
        bulk_multiplier,
        max_production_for_target,
    };

    (analysis, gathering_limit_cycle)
}

/// §4.1 high-value classification.
fn classify_high_value(processes: &[CompiledProcess], targets: &[ResourceId]) -> Vec<bool> {
    let mut high_value = vec![false; processes.len()];

    // M_t = max over all processes of net(p, t), per target.
    let max_net: Vec<Quantity> = targets
        .iter()
        .map(|&t| processes.iter().map(|p| p.net(t)).max().unwrap_or(0))
        .collect();

    for (idx, p) in processes.iter().enumerate() {
        let input_units = p.total_input_units();
        for (t_idx, &t) in targets.iter().enumerate() {
            let net = p.net(t);
            let m_t = max_net[t_idx];
            let result_t = p.result_of(t);

            let qualifies = net > 1000
                || (m_t > 0 && net as f64 >= 0.5 * m_t as f64)
                || (m_t > 0 && net == m_t)
                || (!p.needs.is_empty() && net > 50 * input_units)
                || result_t > 10_000;

            if qualifies {
                high_value[idx] = true;
                break;
            }
        }
    }

    high_value
}

/// §4.1 adaptive bulk multiplier, plus the long-horizon `gathering_limit_cycle`.
fn adaptive_bulk_multiplier(
    processes: &[CompiledProcess],
    targets: &[ResourceId],
    horizon: u64,
    tuning: &KrpsimTuning,
) -> (u32, u64) {
    let p = targets
        .iter()
        .map(|&t| processes.iter().map(|proc| proc.result_of(t)).max().unwrap_or(0))
        .max()
        .unwrap_or(0);

    let mut multiplier = tuning
        .bulk_multiplier_thresholds
        .iter()
        .find(|(threshold, _)| p >= *threshold)
        .map(|(_, m)| *m)
        .unwrap_or(tuning.bulk_multiplier_floor);

    let long_horizon = horizon > tuning.long_horizon_cycle_threshold;
    if long_horizon {
        multiplier *= tuning.long_horizon_multiplier_scale;
    }

    let gathering_limit_cycle = if long_horizon {
        tuning.gathering_limit_cycle_long_horizon
    } else {
        tuning.gathering_limit_cycle_default
    };

    (multiplier, gathering_limit_cycle)
}

/// §4.1 depth calculation: depth 1 for direct inputs of high-value
/// processes, then iterative relaxation upstream, bounded at
/// `tuning.max_depth_iterations` passes.
fn compute_depth(
    processes: &[CompiledProcess],
    high_value: &[bool],
    num_resources: usize,
    tuning: &KrpsimTuning,
) -> Vec<Option<u32>> {
    let mut depth: Vec<Option<u32>> = vec![None; num_resources];

    for (idx, p) in processes.iter().enumerate() {
        if !high_value[idx] {
            continue;
        }
        for &(r, _) in &p.needs {
            depth[r.0 as usize] = Some(1);
        }
    }

    for _ in 0..tuning.max_depth_iterations {
        let mut changed = false;
        for p in processes {
            let produced_depths: Vec<u32> = p
                .results
                .iter()
                .filter_map(|&(r, _)| depth[r.0 as usize])
                .collect();
            let Some(&d) = produced_depths.iter().min() else {
                continue;
            };
            for &(r_in, _) in &p.needs {
                let candidate = d + 1;
                let slot = &mut depth[r_in.0 as usize];
                if slot.is_none_or(|existing| candidate < existing) {
                    *slot = Some(candidate);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    depth
}

/// §4.1 bulk targets: direct assignment for depth-1 resources from
/// high-value processes' needs, then upstream propagation with a 0.5-per-
/// level reduction, capped at `tuning.max_value_chain_depth`.
fn compute_bulk_targets(
    processes: &[CompiledProcess],
    high_value: &[bool],
    depth: &[Option<u32>],
    multiplier: u32,
    num_resources: usize,
    tuning: &KrpsimTuning,
) -> Vec<Option<Quantity>> {
    let mut bulk_targets: Vec<Option<Quantity>> = vec![None; num_resources];

    for (idx, p) in processes.iter().enumerate() {
        if !high_value[idx] {
            continue;
        }
        for &(r, qty) in &p.needs {
            let candidate = qty * multiplier as Quantity;
            let slot = &mut bulk_targets[r.0 as usize];
            *slot = Some(slot.map_or(candidate, |existing| existing.max(candidate)));
        }
    }

    for d in 2..=tuning.max_value_chain_depth {
        for q in processes {
            for &(r_out, _) in &q.results {
                if depth[r_out.0 as usize] != Some(d - 1) {
                    continue;
                }
                let Some(bt_downstream) = bulk_targets[r_out.0 as usize] else {
                    continue;
                };
                let produced = q.result_of(r_out).max(1);
                for &(r_in, need_qty) in &q.needs {
                    if depth[r_in.0 as usize] != Some(d) {
                        continue;
                    }
                    let scale = 0.5f64.powi(d as i32 - 1);
                    let candidate = (need_qty as f64 * bt_downstream as f64 / produced as f64 * scale)
                        .round()
                        .max(1.0) as Quantity;
                    let slot = &mut bulk_targets[r_in.0 as usize];
                    *slot = Some(slot.map_or(candidate, |existing| existing.max(candidate)));
                }
            }
        }
    }

    bulk_targets
}

/// §4.1 target reserves: max over high-value consumers, never a sum, with a
/// 5x factor for targets that are themselves value-chain intermediates
/// (they get consumed repeatedly by the conversion chain, not just once).
fn compute_target_reserves(
    processes: &[CompiledProcess],
    targets: &[ResourceId],
    high_value: &[bool],
    value_chain_resources: &HashSet<ResourceId>,
    multiplier: u32,
    num_resources: usize,
) -> Vec<Option<Quantity>> {
    let mut reserves: Vec<Option<Quantity>> = vec![None; num_resources];

    for &t in targets {
        let base = processes
            .iter()
            .enumerate()
            .filter(|(idx, _)| high_value[*idx])
            .map(|(_, p)| p.need_of(t) * multiplier as Quantity)
            .max()
            .unwrap_or(0);

        if base == 0 {
            continue;
        }

        let reserve = if value_chain_resources.contains(&t) {
            base * 5
        } else {
            base
        };

        reserves[t.0 as usize] = Some(reserve);
    }

    reserves
}

fn compute_max_production(
    processes: &[CompiledProcess],
    targets: &[ResourceId],
    num_resources: usize,
) -> Vec<Option<Quantity>> {
    let mut max_production: Vec<Option<Quantity>> = vec![None; num_resources];
    for &t in targets {
        let m = processes.iter().map(|p| p.net(t)).max().unwrap_or(0);
        max_production[t.0 as usize] = Some(m);
    }
    max_production
}

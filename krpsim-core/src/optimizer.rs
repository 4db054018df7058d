//! Selector (§4.5) and the public `Optimizer` facade (§6): `initialize`
//! once, then `select` once per simulation cycle.

use std::collections::HashMap;

use crate::analysis::{self, Analysis};
use crate::bottleneck;
use crate::error::{KrpsimError, KrpsimResult};
use crate::phase;
use crate::scoring;
use crate::types::{CompiledProcess, Interner, KrpsimTuning, Phase, Process, ProcessId, Quantity, ResourceId, TIME_PSEUDO_RESOURCE};

/// A read-only record of the last `select` decision, for test introspection
/// and (optionally) a host trace generator. Purely additive: nothing reads
/// this back into the decision path.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub cycle: u64,
    pub phase: Phase,
    pub chosen: Option<String>,
    pub bottleneck_fired: bool,
    pub cash_flow_mode: bool,
    pub stuck_counter: u32,
    /// Highest-scoring candidates considered this cycle, best first.
    pub top_candidates: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Default)]
struct PhaseState {
    current_phase: Phase,
    stuck_counter: u32,
    cash_flow_mode: bool,
    any_high_value_ever_runnable: bool,
}

/// The process-selection core. Built once via [`Optimizer::initialize`],
/// then driven with one [`Optimizer::select`] call per simulation cycle.
pub struct Optimizer {
    interner: Interner,
    processes: Vec<CompiledProcess>,
    targets: Vec<ResourceId>,
    time_resource: Option<ResourceId>,
    tuning: KrpsimTuning,
    analysis: Analysis,
    gathering_limit_cycle: u64,
    horizon: u64,
    phase_state: PhaseState,
    last_snapshot: Option<Snapshot>,
    /// `(cycle, indexed stocks, decision)` of the most recent `select` call.
    /// A repeated call with the identical `(cycle, stocks)` pair replays the
    /// cached decision instead of re-running the selection pipeline, so
    /// `stuck_counter`/`cash_flow_mode` advance only once per genuinely new
    /// cycle/stock observation (§8: "no hidden state advances").
    last_call: Option<(u64, Vec<Quantity>, Option<String>)>,
}

impl Optimizer {
    /// Build an optimizer with the default [`KrpsimTuning`].
    pub fn initialize(processes: Vec<Process>, targets: Vec<String>, horizon: u64) -> KrpsimResult<Self> {
        Self::initialize_with_tuning(processes, targets, horizon, KrpsimTuning::default())
    }

    /// Build an optimizer, overriding the tunable constants (§A.5).
    pub fn initialize_with_tuning(
        processes: Vec<Process>,
        targets: Vec<String>,
        horizon: u64,
        tuning: KrpsimTuning,
    ) -> KrpsimResult<Self> {
        let mut seen_names = std::collections::HashSet::new();
        for p in &processes {
            if p.delay == 0 {
                return Err(KrpsimError::NonPositiveDelay(p.name.clone()));
            }
            if !seen_names.insert(p.name.as_str()) {
                return Err(KrpsimError::DuplicateProcess(p.name.clone()));
            }
        }

        // `Process::needs`/`results` are `HashMap`s, whose iteration order is
        // not guaranteed stable across equal-content instances. Intern each
        // process's resource names in name-sorted order so the ResourceId a
        // given name receives -- and therefore every downstream analysis
        // artifact -- is identical run-to-run for identical inputs (§8:
        // "re-running initialize on the same inputs produces byte-identical
        // analysis artifacts").
        let mut interner = Interner::new();
        let compiled: Vec<CompiledProcess> = processes
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let mut need_names: Vec<&str> = p.needs.keys().map(String::as_str).collect();
                need_names.sort_unstable();
                let mut needs: Vec<(ResourceId, Quantity)> =
                    need_names.into_iter().map(|n| (ResourceId(interner.intern(n)), p.needs[n])).collect();

                let mut result_names: Vec<&str> = p.results.keys().map(String::as_str).collect();
                result_names.sort_unstable();
                let mut results: Vec<(ResourceId, Quantity)> =
                    result_names.into_iter().map(|n| (ResourceId(interner.intern(n)), p.results[n])).collect();

                needs.sort_by_key(|(r, _)| r.0);
                results.sort_by_key(|(r, _)| r.0);
                CompiledProcess {
                    id: ProcessId(idx as u32),
                    name: p.name.clone(),
                    needs,
                    results,
                    delay: p.delay,
                }
            })
            .collect();

        let time_resource = targets
            .iter()
            .find(|t| t.as_str() == TIME_PSEUDO_RESOURCE)
            .map(|_| interner.intern(TIME_PSEUDO_RESOURCE))
            .map(ResourceId);

        let mut effective_targets = Vec::new();
        for t in &targets {
            if t == TIME_PSEUDO_RESOURCE {
                continue;
            }
            match interner.get(t) {
                Some(id) => effective_targets.push(ResourceId(id)),
                None => return Err(KrpsimError::DanglingTarget(t.clone())),
            }
        }

        let num_resources = interner.len();
        let (analysis, gathering_limit_cycle) = analysis::analyze(&compiled, &effective_targets, horizon, &tuning, num_resources);

        if !analysis.has_high_value() {
            tracing::warn!("no high-value process classified; running in degraded NoHighValue mode");
        }
        if compiled.is_empty() {
            tracing::warn!("initialized with zero processes; select will always return none");
        }

        Ok(Self {
            interner,
            processes: compiled,
            targets: effective_targets,
            time_resource,
            tuning,
            analysis,
            gathering_limit_cycle,
            horizon,
            phase_state: PhaseState::default(),
            last_snapshot: None,
            last_call: None,
        })
    }

    /// Choose the process to start this cycle, or `None` to idle.
    ///
    /// Pure with respect to `(analysis, phase_state, cycle, stocks)`: see
    /// §8 P1. `cycle` must be monotonically non-decreasing across calls.
    #[tracing::instrument(skip(self, stocks), fields(cycle))]
    pub fn select(&mut self, cycle: u64, stocks: &HashMap<String, Quantity>) -> Option<String> {
        let stock_vec = self.index_stocks(stocks);

        if let Some((last_cycle, last_stocks, last_decision)) = &self.last_call {
            if *last_cycle == cycle && last_stocks == &stock_vec {
                return last_decision.clone();
            }
        }

        let decision = self.select_uncached(cycle, &stock_vec);
        self.last_call = Some((cycle, stock_vec, decision.clone()));
        decision
    }

    /// The actual selection pipeline (§4.5), run only the first time a given
    /// `(cycle, stocks)` pair is observed.
    fn select_uncached(&mut self, cycle: u64, stock_vec: &[Quantity]) -> Option<String> {
        let runnable: Vec<&CompiledProcess> = self.processes.iter().filter(|p| p.can_execute(stock_vec)).collect();

        let can_execute_hv = runnable.iter().any(|p| self.analysis.is_high_value(p.id));
        if can_execute_hv {
            self.phase_state.any_high_value_ever_runnable = true;
        }

        self.phase_state.current_phase = phase::detect_phase(
            cycle,
            self.horizon,
            stock_vec,
            &self.processes,
            &self.analysis,
            self.phase_state.any_high_value_ever_runnable,
            &self.tuning,
            self.gathering_limit_cycle,
        );
        tracing::debug!(cycle, phase = ?self.phase_state.current_phase, "phase refreshed");

        if let Some(decision) = bottleneck::detect(
            &self.processes,
            stock_vec,
            &self.analysis,
            &self.targets,
            self.phase_state.current_phase,
            self.analysis.bulk_multiplier,
        ) {
            self.phase_state.stuck_counter = 0;
            let name = self.processes[decision.0 as usize].name.clone();
            tracing::debug!(cycle, process = %name, "bottleneck short-circuit");
            self.record_snapshot(cycle, Some(name.clone()), true, Vec::new());
            return Some(name);
        }

        if let Some(name) = self.run_scoring_pass(cycle, stock_vec, &runnable) {
            return Some(name);
        }

        self.phase_state.stuck_counter += 1;
        if self.phase_state.stuck_counter >= self.tuning.stall_threshold && !self.phase_state.cash_flow_mode {
            self.phase_state.cash_flow_mode = true;
            tracing::debug!(cycle, "entering cash-flow-mode after stall");
            if let Some(name) = self.run_scoring_pass(cycle, stock_vec, &runnable) {
                return Some(name);
            }
        }

        self.record_snapshot(cycle, None, false, Vec::new());
        None
    }

    /// Score + boost + sort all runnable candidates once; returns the
    /// chosen process name if the top score is positive.
    fn run_scoring_pass(&mut self, cycle: u64, stock_vec: &[Quantity], runnable: &[&CompiledProcess]) -> Option<String> {
        let mut scored: Vec<(ProcessId, f64, bool, u32, &str)> = runnable
            .iter()
            .map(|&p| {
                let mut s = scoring::score(
                    p,
                    stock_vec,
                    self.phase_state.current_phase,
                    &self.analysis,
                    &self.targets,
                    self.time_resource,
                    &self.processes,
                    self.phase_state.cash_flow_mode,
                );

                s *= self.high_value_boost(p, stock_vec);
                let (critical_boost, produces_critical) = self.critical_resource_boost(p, stock_vec);
                s *= critical_boost;

                let depth = self.producer_depth(p);
                (p.id, s, produces_critical, depth, p.name.as_str())
            })
            .collect();

        scored.sort_by(|a, b| {
            b.2.cmp(&a.2)
                .then_with(|| a.3.cmp(&b.3))
                .then_with(|| b.1.partial_cmp(&a.1).unwrap())
                .then_with(|| a.4.cmp(b.4))
        });

        let top_candidates: Vec<(String, f64)> = scored.iter().take(5).map(|(_, s, _, _, n)| (n.to_string(), *s)).collect();

        let winner = scored.first().filter(|(_, s, ..)| *s > 0.0);
        if let Some((id, score, ..)) = winner {
            let name = self.processes[id.0 as usize].name.clone();
            self.phase_state.stuck_counter = 0;
            if self.phase_state.cash_flow_mode {
                self.phase_state.cash_flow_mode = false;
            }
            tracing::debug!(cycle, process = %name, score, "selected");
            self.record_snapshot(cycle, Some(name.clone()), false, top_candidates);
            Some(name)
        } else {
            self.record_snapshot(cycle, None, false, top_candidates);
            None
        }
    }

    fn high_value_boost(&self, p: &CompiledProcess, stock_vec: &[Quantity]) -> f64 {
        if !self.analysis.is_high_value(p.id) {
            return 1.0;
        }
        let bulk_available = p.needs.iter().all(|&(r, _)| match self.analysis.bulk_target(r) {
            Some(target) => stock_vec.get(r.0 as usize).copied().unwrap_or(0) >= target,
            None => true,
        });
        if bulk_available {
            if matches!(self.phase_state.current_phase, Phase::Conversion | Phase::Selling) {
                10_000_000.0
            } else {
                1_000_000.0
            }
        } else {
            100.0
        }
    }

    fn critical_resource_boost(&self, p: &CompiledProcess, stock_vec: &[Quantity]) -> (f64, bool) {
        let mut boost = 1.0;
        let mut produces_critical = false;
        for &(r, _) in &p.results {
            let Some(target) = self.analysis.bulk_target(r) else {
                continue;
            };
            let have = stock_vec.get(r.0 as usize).copied().unwrap_or(0);
            if have < target {
                produces_critical = true;
                let shortfall = (target - have) as f64 / 10.0;
                boost = boost.max(100.0 + shortfall.min(1000.0));
            }
        }
        (boost, produces_critical)
    }

    fn producer_depth(&self, p: &CompiledProcess) -> u32 {
        p.results
            .iter()
            .filter_map(|&(r, _)| self.analysis.depth(r))
            .min()
            .unwrap_or(u32::MAX)
    }

    fn index_stocks(&self, stocks: &HashMap<String, Quantity>) -> Vec<Quantity> {
        let mut stock_vec = vec![0; self.interner.len()];
        for (name, &qty) in stocks {
            if let Some(id) = self.interner.get(name) {
                stock_vec[id as usize] = qty;
            }
        }
        stock_vec
    }

    fn record_snapshot(&mut self, cycle: u64, chosen: Option<String>, bottleneck_fired: bool, top_candidates: Vec<(String, f64)>) {
        self.last_snapshot = Some(Snapshot {
            cycle,
            phase: self.phase_state.current_phase,
            chosen,
            bottleneck_fired,
            cash_flow_mode: self.phase_state.cash_flow_mode,
            stuck_counter: self.phase_state.stuck_counter,
            top_candidates,
        });
    }

    /// The analysis bundle built at `initialize`, for inspection by tests
    /// or a host trace generator.
    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// A read-only record of the last `select` decision.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn current_phase(&self) -> Phase {
        self.phase_state.current_phase
    }
}

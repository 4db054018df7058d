//! Core data model: resources, processes, interning, and tunables.
//!
//! Dynamic `name -> value` maps are the natural shape to hand this crate from
//! a `.krpsim` file parser, but the hot path (scoring every runnable process,
//! every cycle) wants flat arrays indexed by small integers instead of string
//! keys. [`Interner`] performs that conversion once, during
//! [`crate::Optimizer::initialize`], and everything downstream works in terms
//! of [`ResourceId`]/[`ProcessId`].

use std::collections::HashMap;

/// Integer quantity of a resource. Negative values only ever appear as
/// intermediate `net` computations (output minus input); stocks themselves
/// are always non-negative.
pub type Quantity = i64;

/// A dense index assigned to a resource name the first time it is seen.
/// Stable for the lifetime of an [`crate::Optimizer`]; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u32);

/// A dense index assigned to a process, in the order processes were passed
/// to `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

/// Bidirectional name <-> dense-id table.
///
/// Unlike the teacher's `slotmap`-backed entity ids, there is no removal or
/// generational-safety concern here: resources and processes are registered
/// exactly once, at `initialize`, and never torn down mid-run.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    names: Vec<String>,
    index: HashMap<String, u32>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or assign an id for `name`.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    /// Look up an existing id without assigning one.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The pseudo-resource that, when present in the target list, signals
/// "optimize for speed" rather than a real stock to maximize. Always
/// stripped from the effective target set used by scoring (§3, Open
/// Questions).
pub const TIME_PSEUDO_RESOURCE: &str = "time";

/// Caller-supplied, immutable process definition (§3).
///
/// The core never mutates this; it is converted once, during `initialize`,
/// into a [`CompiledProcess`] indexed by [`ResourceId`].
#[derive(Debug, Clone)]
pub struct Process {
    pub name: String,
    pub needs: HashMap<String, Quantity>,
    pub results: HashMap<String, Quantity>,
    pub delay: u32,
}

impl Process {
    pub fn new(name: impl Into<String>, delay: u32) -> Self {
        Self {
            name: name.into(),
            needs: HashMap::new(),
            results: HashMap::new(),
            delay,
        }
    }

    pub fn with_need(mut self, resource: impl Into<String>, qty: Quantity) -> Self {
        self.needs.insert(resource.into(), qty);
        self
    }

    pub fn with_result(mut self, resource: impl Into<String>, qty: Quantity) -> Self {
        self.results.insert(resource.into(), qty);
        self
    }
}

/// Interned form of [`Process`] used throughout analysis, scoring, and
/// selection. `needs`/`results` are sorted by `ResourceId` for deterministic
/// iteration.
#[derive(Debug, Clone)]
pub struct CompiledProcess {
    pub id: ProcessId,
    pub name: String,
    pub needs: Vec<(ResourceId, Quantity)>,
    pub results: Vec<(ResourceId, Quantity)>,
    pub delay: u32,
}

impl CompiledProcess {
    pub fn need_of(&self, resource: ResourceId) -> Quantity {
        self.needs
            .iter()
            .find(|(r, _)| *r == resource)
            .map(|(_, q)| *q)
            .unwrap_or(0)
    }

    pub fn result_of(&self, resource: ResourceId) -> Quantity {
        self.results
            .iter()
            .find(|(r, _)| *r == resource)
            .map(|(_, q)| *q)
            .unwrap_or(0)
    }

    /// `results[r] - needs[r]`, the net production of `resource` by one
    /// execution of this process.
    pub fn net(&self, resource: ResourceId) -> Quantity {
        self.result_of(resource) - self.need_of(resource)
    }

    pub fn total_input_units(&self) -> Quantity {
        self.needs.iter().map(|(_, q)| *q).sum()
    }

    /// A "gatherer" has no inputs, or its only input is the time/currency
    /// pseudo-target (§4.3 step 6).
    pub fn is_gatherer(&self, time_resource: Option<ResourceId>) -> bool {
        match time_resource {
            None => self.needs.is_empty(),
            Some(t) => self.needs.is_empty() || self.needs.iter().all(|(r, _)| *r == t),
        }
    }

    pub fn can_execute(&self, stocks: &[Quantity]) -> bool {
        self.needs
            .iter()
            .all(|(r, qty)| stocks.get(r.0 as usize).copied().unwrap_or(0) >= *qty)
    }
}

/// The four-phase state machine driving scoring multipliers (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Gathering,
    Production,
    Conversion,
    Selling,
}

/// Every numeric constant the spec's §4.1/§4.2/§4.3/§4.4 algorithms treat as
/// fixed, gathered into one overridable struct (Design Notes §9, Open
/// Questions). `Default` reproduces the spec's literal values exactly; a host
/// wanting the "100" bulk multiplier or the "500" gathering limit in the
/// non-long-horizon case can override the relevant field without touching the
/// selection algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct KrpsimTuning {
    /// `(P threshold, multiplier)` pairs, highest threshold first; the first
    /// pair whose threshold is met wins. The base adaptive scale is
    /// 2/5/10/20; long-horizon mode multiplies the chosen value again.
    pub bulk_multiplier_thresholds: Vec<(Quantity, u32)>,
    pub bulk_multiplier_floor: u32,
    /// Horizon above which "long-horizon mode" kicks in (multiplier x5,
    /// `gathering_limit_cycle` raised).
    pub long_horizon_cycle_threshold: u64,
    pub long_horizon_multiplier_scale: u32,
    pub gathering_limit_cycle_default: u64,
    pub gathering_limit_cycle_long_horizon: u64,
    /// Fraction of the horizon after which, in long-horizon mode, the
    /// controller forces Selling if any high-value process has ever been
    /// runnable.
    pub selling_horizon_fraction: f64,
    pub conversion_cycle_threshold: u64,
    pub conversion_ratio_threshold: f64,
    pub production_cycle_threshold: u64,
    pub production_ratio_threshold: f64,
    /// Consecutive "none" selections before cash-flow mode engages.
    pub stall_threshold: u32,
    /// Max upstream recursion depth for the bulk-target reduction pass and
    /// the depth-assignment pass.
    pub max_value_chain_depth: u32,
    pub max_depth_iterations: u32,
}

impl Default for KrpsimTuning {
    fn default() -> Self {
        Self {
            bulk_multiplier_thresholds: vec![(10_000, 20), (1_000, 10), (100, 5)],
            bulk_multiplier_floor: 2,
            long_horizon_cycle_threshold: 50_000,
            long_horizon_multiplier_scale: 5,
            gathering_limit_cycle_default: 300,
            gathering_limit_cycle_long_horizon: 500,
            selling_horizon_fraction: 0.8,
            conversion_cycle_threshold: 1000,
            conversion_ratio_threshold: 0.2,
            production_cycle_threshold: 500,
            production_ratio_threshold: 0.02,
            stall_threshold: 3,
            max_value_chain_depth: 3,
            max_depth_iterations: 10,
        }
    }
}

//! The six concrete scenarios named in the selection-core design notes,
//! each driving an `Optimizer` through a small hand-rolled simulation loop
//! (apply `needs`/`results` immediately; delay is ignored here since these
//! scenarios only care about final stock, not cycle-accurate completion).

use std::collections::HashMap;

use krpsim_core::{Optimizer, Process};

fn run(mut opt: Optimizer, mut stocks: HashMap<String, i64>, horizon: u64) -> HashMap<String, i64> {
    for cycle in 0..horizon {
        let Some(chosen) = opt.select(cycle, &stocks) else {
            continue;
        };
        // caller applies the chosen process's deltas; look it up back out of
        // the optimizer's own process list isn't exposed, so scenarios below
        // hardcode the known needs/results for the process they expect.
        apply(&chosen, &mut stocks);
    }
    stocks
}

fn apply(name: &str, stocks: &mut HashMap<String, i64>) {
    let mut delta = |resource: &str, amount: i64| {
        *stocks.entry(resource.to_string()).or_insert(0) += amount;
    };
    match name {
        "buy" => {
            delta("euro", -100);
            delta("item", 1);
        }
        "sell" => {
            delta("item", -1);
            delta("euro", 300);
        }
        "make" => {
            delta("wood", -1);
            delta("plank", 1);
        }
        "assemble" => {
            delta("plank", -10);
            delta("coin", 50);
        }
        "sell_cheap" => {
            delta("euro", -1);
            delta("junk", 1);
        }
        "buy_elite" => {
            delta("euro", -100);
            delta("gem", 1);
        }
        "work" => {
            delta("euro", 1);
        }
        "spend" => {
            delta("euro", -100);
            delta("goal", 1);
        }
        "split" => {
            delta("egg", -1);
            delta("yolk", 1);
            delta("white", 1);
        }
        "rejoin" => {
            delta("yolk", -1);
            delta("white", -1);
            delta("egg", 1);
        }
        "use" => {
            delta("yolk", -10);
            delta("euro", 1000);
        }
        "dig" => {
            delta("ore", 1);
        }
        "smelt" => {
            delta("ore", -3);
            delta("bar", 1);
        }
        "forge" => {
            delta("bar", -5);
            delta("sword", 1);
        }
        other => panic!("scenario test has no delta table entry for process `{other}`"),
    }
}

#[test]
fn two_stage_trade_grows_euro() {
    let processes = vec![
        Process::new("buy", 1).with_need("euro", 100).with_result("item", 1),
        Process::new("sell", 1).with_need("item", 1).with_result("euro", 300),
    ];
    let opt = Optimizer::initialize(processes, vec!["euro".into()], 10).unwrap();
    let stocks = HashMap::from([("euro".to_string(), 1000)]);
    let result = run(opt, stocks, 10);
    assert!(result["euro"] >= 1000, "trading should never lose money: {}", result["euro"]);
}

#[test]
fn bulk_gate_eventually_fires_assemble() {
    let processes = vec![
        Process::new("make", 1).with_need("wood", 1).with_result("plank", 1),
        Process::new("assemble", 1).with_need("plank", 10).with_result("coin", 50),
    ];
    let opt = Optimizer::initialize(processes, vec!["coin".into()], 100).unwrap();
    let stocks = HashMap::from([("wood".to_string(), 100)]);
    let result = run(opt, stocks, 100);
    assert!(result.get("coin").copied().unwrap_or(0) >= 50, "assemble must fire at least once: {result:?}");
}

#[test]
fn reservation_protects_euro_for_high_value_buyer() {
    let processes = vec![
        Process::new("sell_cheap", 1).with_need("euro", 1).with_result("junk", 1),
        Process::new("buy_elite", 1).with_need("euro", 100).with_result("gem", 1),
    ];
    let opt = Optimizer::initialize(processes, vec!["gem".into()], 10).unwrap();
    let stocks = HashMap::from([("euro".to_string(), 200)]);
    let result = run(opt, stocks, 10);
    assert!(result.get("gem").copied().unwrap_or(0) >= 1, "buy_elite should fire at least once: {result:?}");
}

#[test]
fn stall_recovery_bootstraps_cash_before_spending() {
    let processes = vec![
        Process::new("work", 1).with_result("euro", 1),
        Process::new("spend", 1).with_need("euro", 100).with_result("goal", 1),
    ];
    let opt = Optimizer::initialize(processes, vec!["goal".into()], 500).unwrap();
    let stocks = HashMap::from([("euro".to_string(), 0)]);
    let result = run(opt, stocks, 500);
    assert!(result.get("goal").copied().unwrap_or(0) >= 1, "spend should eventually fire: {result:?}");
}

#[test]
fn conversion_loop_guard_lets_high_value_chain_proceed() {
    let processes = vec![
        Process::new("split", 1).with_need("egg", 1).with_result("yolk", 1).with_result("white", 1),
        Process::new("rejoin", 1).with_need("yolk", 1).with_need("white", 1).with_result("egg", 1),
        Process::new("use", 1).with_need("yolk", 10).with_result("euro", 1000),
    ];
    let opt = Optimizer::initialize(processes, vec!["euro".into()], 100).unwrap();
    let stocks = HashMap::from([("egg".to_string(), 20)]);
    let result = run(opt, stocks, 100);
    assert!(result.get("euro").copied().unwrap_or(0) >= 1000, "use should fire once yolks accumulate: {result:?}");
}

#[test]
fn multi_depth_value_chain_reaches_the_target() {
    let processes = vec![
        Process::new("dig", 1).with_result("ore", 1),
        Process::new("smelt", 1).with_need("ore", 3).with_result("bar", 1),
        Process::new("forge", 1).with_need("bar", 5).with_result("sword", 1),
    ];
    let opt = Optimizer::initialize(processes, vec!["sword".into()], 1000).unwrap();
    let stocks = HashMap::new();
    let result = run(opt, stocks, 1000);
    assert!(result.get("sword").copied().unwrap_or(0) >= 1, "forge should fire by the end of the horizon: {result:?}");
}

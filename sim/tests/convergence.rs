use gatesim_netlist::{BuildWarning, CellKind, CircuitBuilder, CircuitGraph, LogicValue, NetId};
use gatesim_sim::{SignalChange, SimConfig, Simulator, StepErrorKind};

use LogicValue::{One, Unknown, Zero};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_self_inverting() {
    init_tracing();
    let mut builder = CircuitBuilder::new();
    let y = builder.add_net("y").unwrap();
    builder.add_instance("inv", CellKind::Inv, &[("A", y), ("Y", y)]).unwrap();
    let (graph, warnings) = builder.build().unwrap();
    assert_eq!(warnings, vec![BuildWarning::CombinationalLoop(vec!["inv".to_owned()])]);

    let mut sim = Simulator::new(&graph);
    let error = sim.step(0, &[]).unwrap_err();
    assert_eq!(error.kind, StepErrorKind::NonConvergent { nets: vec![y] });
    assert_eq!(error.oscillating_nets(), Some(&[y][..]));
    assert_eq!(error.changes, vec![]);
    assert_eq!(sim.time(), Some(0));

    assert_eq!(sim.recover(&[y]).unwrap(), vec![]);
    assert_eq!(sim.net_value(y), Unknown);
    assert_eq!(sim.settle(1).unwrap(), vec![]);
}

struct Ring {
    graph: CircuitGraph,
    en: NetId,
    nets: [NetId; 3],
}

/// Three inverting stages in a loop; the first one is a NAND gate that breaks the loop while `en` is low.
fn ring() -> Ring {
    let mut builder = CircuitBuilder::new();
    let en = builder.add_input("en").unwrap();
    let x = builder.add_net("x").unwrap();
    let w = builder.add_net("w").unwrap();
    let y = builder.add_net("y").unwrap();
    builder.add_instance("gate", CellKind::Nand2, &[("A", en), ("B", y), ("Y", x)]).unwrap();
    builder.add_instance("inv0", CellKind::Inv, &[("A", x), ("Y", w)]).unwrap();
    builder.add_instance("inv1", CellKind::Inv, &[("A", w), ("Y", y)]).unwrap();
    let (graph, warnings) = builder.build().unwrap();
    assert_eq!(warnings.len(), 1);
    Ring { graph, en, nets: [x, w, y] }
}

#[test]
fn test_ring_oscillator() {
    init_tracing();
    let Ring { graph, en, nets } = ring();
    let [x, w, y] = nets;
    let mut sim = Simulator::with_config(&graph, SimConfig::default().with_max_deltas(30));
    sim.step(0, &[(en, Zero)]).unwrap();
    assert_eq!((sim.net_value(x), sim.net_value(w), sim.net_value(y)), (One, Zero, One));

    let error = sim.step(1, &[(en, One)]).unwrap_err();
    let StepErrorKind::NonConvergent { nets: changing } = &error.kind else {
        panic!("unexpected error {error}");
    };
    assert!(!changing.is_empty());
    assert!(changing.iter().all(|net| nets.contains(net)));
    assert_eq!(error.changes.first(), Some(&SignalChange { time: 1, net: en, value: One }));

    sim.recover(changing).unwrap();
    assert_eq!((sim.net_value(x), sim.net_value(w), sim.net_value(y)), (Unknown, Unknown, Unknown));
    assert_eq!(sim.settle(2).unwrap(), vec![]);

    // breaking the loop brings it back to known values, and closing it oscillates again
    sim.step(3, &[(en, Zero)]).unwrap();
    assert_eq!((sim.net_value(x), sim.net_value(w), sim.net_value(y)), (One, Zero, One));
    assert!(matches!(sim.step(4, &[(en, One)]).unwrap_err().kind, StepErrorKind::NonConvergent { .. }));
}

#[test]
fn test_ring_enabled_from_start() {
    let Ring { graph, en, nets } = ring();
    let mut sim = Simulator::new(&graph);
    let error = sim.step(0, &[(en, One)]).unwrap_err();
    assert_eq!(error.kind, StepErrorKind::NonConvergent { nets: nets.to_vec() });
    assert_eq!(error.changes, vec![SignalChange { time: 0, net: en, value: One }]);
    sim.recover(&nets).unwrap();
    sim.step(1, &[(en, Zero)]).unwrap();
    assert_eq!(sim.net_value(nets[0]), One);
}

#[test]
fn test_cross_coupled_latch() {
    let mut builder = CircuitBuilder::new();
    let sn = builder.add_input("sn").unwrap();
    let rn = builder.add_input("rn").unwrap();
    let q = builder.add_net("q").unwrap();
    let qn = builder.add_net("qn").unwrap();
    builder.add_instance("set", CellKind::Nand2, &[("A", sn), ("B", qn), ("Y", q)]).unwrap();
    builder.add_instance("reset", CellKind::Nand2, &[("A", rn), ("B", q), ("Y", qn)]).unwrap();
    let (graph, warnings) = builder.build().unwrap();
    assert_eq!(warnings, vec![BuildWarning::CombinationalLoop(vec!["set".to_owned(), "reset".to_owned()])]);

    // an unknown, but stable, state is not an oscillation
    let mut sim = Simulator::new(&graph);
    sim.step(0, &[(sn, One), (rn, One)]).unwrap();
    assert_eq!((sim.net_value(q), sim.net_value(qn)), (Unknown, Unknown));
    sim.step(1, &[(sn, Zero)]).unwrap();
    assert_eq!((sim.net_value(q), sim.net_value(qn)), (One, Zero));
    sim.step(2, &[(sn, One)]).unwrap();
    assert_eq!((sim.net_value(q), sim.net_value(qn)), (One, Zero));
    sim.step(3, &[(rn, Zero)]).unwrap();
    assert_eq!((sim.net_value(q), sim.net_value(qn)), (Zero, One));
}

#[test]
fn test_delta_budget() {
    let mut builder = CircuitBuilder::new();
    let a = builder.add_input("a").unwrap();
    let mut net = a;
    for index in 0..10 {
        let next = builder.add_net(format!("n{index}")).unwrap();
        builder.add_instance(format!("buf{index}"), CellKind::Buf, &[("A", net), ("Y", next)]).unwrap();
        net = next;
    }
    let (graph, _) = builder.build().unwrap();

    let mut sim = Simulator::with_config(&graph, SimConfig::default().with_max_deltas(10));
    sim.step(0, &[(a, One)]).unwrap();
    assert_eq!(sim.net_value(net), One);

    // a chain deeper than the budget looks like an oscillation
    let mut sim = Simulator::with_config(&graph, SimConfig::default().with_max_deltas(5));
    let error = sim.step(0, &[(a, One)]).unwrap_err();
    let StepErrorKind::NonConvergent { nets } = error.kind else {
        panic!("unexpected error");
    };
    assert_eq!(nets, vec![graph.find_net("n5").unwrap()]);
}

use gatesim_netlist::{CellKind, CircuitBuilder, CircuitGraph, InstanceId, LogicValue, NetId};
use gatesim_sim::{SignalChange, Simulator, Stimulus};

use LogicValue::{One, Zero};

const WIDTH: usize = 4;

/// A register that either loads `b` or accumulates `b` into itself on every rising edge of `clk`.
fn accumulator() -> CircuitGraph {
    let mut builder = CircuitBuilder::new();
    let clk = builder.add_input("clk").unwrap();
    let add = builder.add_input("add").unwrap();
    let ci = builder.add_input("ci").unwrap();
    let b = Vec::from_iter((0..WIDTH).map(|index| builder.add_input(format!("b{index}")).unwrap()));
    let q = Vec::from_iter((0..WIDTH).map(|index| builder.add_net(format!("q{index}")).unwrap()));
    let mut carry = ci;
    for index in 0..WIDTH {
        let sum = builder.add_net(format!("sum{index}")).unwrap();
        let next_carry = builder.add_net(format!("carry{index}")).unwrap();
        let mux = builder.add_net(format!("mux{index}")).unwrap();
        let d = builder.add_net(format!("d{index}")).unwrap();
        let qn = builder.add_net(format!("qn{index}")).unwrap();
        builder
            .add_instance(format!("fa{index}"), CellKind::FullAdder, &[
                ("A", q[index]),
                ("B", b[index]),
                ("C", carry),
                ("YS", sum),
                ("YC", next_carry),
            ])
            .unwrap();
        builder
            .add_instance(format!("mux{index}"), CellKind::Mux2, &[("A", sum), ("B", b[index]), ("S", add), ("Y", mux)])
            .unwrap();
        builder.add_instance(format!("inv{index}"), CellKind::Inv, &[("A", mux), ("Y", d)]).unwrap();
        builder
            .add_instance(format!("ff{index}"), CellKind::DffPos, &[("D", d), ("CLK", clk), ("Q", q[index]), ("QN", qn)])
            .unwrap();
        builder.add_output(q[index]).unwrap();
        carry = next_carry;
    }
    // some status logic on the side
    let zero_low = builder.add_net("zero_low").unwrap();
    let zero_high = builder.add_net("zero_high").unwrap();
    let zero = builder.add_net("zero").unwrap();
    builder.add_instance("nor_low", CellKind::Nor2, &[("A", q[0]), ("B", q[1]), ("Y", zero_low)]).unwrap();
    builder.add_instance("nor_high", CellKind::Nor2, &[("A", q[2]), ("B", q[3]), ("Y", zero_high)]).unwrap();
    builder.add_instance("and_zero", CellKind::And2, &[("A", zero_low), ("B", zero_high), ("Y", zero)]).unwrap();
    let odd_or_top = builder.add_net("odd_or_top").unwrap();
    builder
        .add_instance("oai", CellKind::Oai22, &[("A", q[0]), ("B", q[3]), ("C", carry), ("D", add), ("Y", odd_or_top)])
        .unwrap();
    builder.add_output(zero).unwrap();
    builder.add_output(odd_or_top).unwrap();
    let (graph, warnings) = builder.build().unwrap();
    assert!(warnings.is_empty());
    graph
}

fn net(graph: &CircuitGraph, name: &str) -> NetId {
    graph.find_net(name).unwrap()
}

/// Loads `initial`, then adds `step` on every following clock cycle.
fn program(graph: &CircuitGraph, initial: u32, step: u32, cycles: u64) -> Vec<Stimulus> {
    let mut stimuli = Vec::new();
    let mut apply = |time: u64, add: bool, value: u32| {
        stimuli.push(Stimulus::new(time, net(graph, "clk"), Zero));
        stimuli.push(Stimulus::new(time, net(graph, "add"), add.into()));
        stimuli.push(Stimulus::new(time, net(graph, "ci"), Zero));
        for index in 0..WIDTH {
            let bit = value & (1 << index) != 0;
            stimuli.push(Stimulus::new(time, net(graph, &format!("b{index}")), bit.into()));
        }
        stimuli.push(Stimulus::new(time + 5, net(graph, "clk"), One));
    };
    apply(0, false, initial);
    for cycle in 1..=cycles {
        apply(cycle * 10, true, step);
    }
    stimuli
}

fn register(sim: &Simulator) -> u32 {
    let mut value = 0;
    for index in 0..WIDTH {
        match sim.value_of(&format!("q{index}")) {
            Some(One) => value |= 1 << index,
            Some(Zero) => (),
            other => panic!("q{index} is {other:?}"),
        }
    }
    value
}

fn run(graph: &CircuitGraph, stimuli: &[Stimulus], order: Option<Box<dyn FnMut(&mut [InstanceId])>>) -> (Vec<SignalChange>, u32) {
    let mut sim = Simulator::new(graph);
    if let Some(order) = order {
        sim.set_delta_order(order);
    }
    let changes = sim.run(stimuli.iter().copied()).unwrap();
    (changes, register(&sim))
}

fn shuffler(seed: u64) -> Box<dyn FnMut(&mut [InstanceId])> {
    let mut state = seed;
    Box::new(move |batch: &mut [InstanceId]| {
        for index in (1..batch.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            batch.swap(index, (state % (index as u64 + 1)) as usize);
        }
    })
}

#[test]
fn test_accumulate() {
    let graph = accumulator();
    let stimuli = program(&graph, 5, 3, 3);
    let (changes, value) = run(&graph, &stimuli, None);
    assert_eq!(value, (5 + 3 * 3) % 16);
    assert!(changes.windows(2).all(|pair| pair[0].time <= pair[1].time));
    assert!(changes.iter().any(|change| change.net == net(&graph, "zero")));
}

#[test]
fn test_order_independence() {
    let graph = accumulator();
    let stimuli = program(&graph, 9, 7, 6);
    let (expected, value) = run(&graph, &stimuli, None);
    assert_eq!(value, (9 + 7 * 6) % 16);

    let reverse: Box<dyn FnMut(&mut [InstanceId])> = Box::new(|batch: &mut [InstanceId]| batch.reverse());
    assert_eq!(run(&graph, &stimuli, Some(reverse)), (expected.clone(), value));
    for seed in [1, 0x2545f4914f6cdd1d, 0xdeadbeef] {
        assert_eq!(run(&graph, &stimuli, Some(shuffler(seed))), (expected.clone(), value));
    }
}

#[test]
fn test_fresh_runs_agree() {
    let graph = accumulator();
    let stimuli = program(&graph, 1, 1, 20);
    let first = run(&graph, &stimuli, None);
    let second = run(&graph, &stimuli, None);
    assert_eq!(first, second);
    // a graph built again from scratch behaves the same
    let rebuilt = accumulator();
    assert_eq!(run(&rebuilt, &program(&rebuilt, 1, 1, 20), None), first);
}

#[test]
fn test_shared_graph() {
    let graph = accumulator();
    let graph = &graph;
    let programs = Vec::from_iter((0..4).map(|index| program(graph, index, index + 1, 5)));
    let sequential = Vec::from_iter(programs.iter().map(|stimuli| run(graph, stimuli, None)));
    let parallel = std::thread::scope(|scope| {
        let handles =
            Vec::from_iter(programs.iter().map(|stimuli| scope.spawn(move || run(graph, stimuli, Some(shuffler(7))))));
        Vec::from_iter(handles.into_iter().map(|handle| handle.join().unwrap()))
    });
    assert_eq!(parallel, sequential);
    for (index, (_, value)) in sequential.iter().enumerate() {
        let index = index as u32;
        assert_eq!(*value, (index + (index + 1) * 5) % 16);
    }
}

use gatesim_netlist::{CellKind, CircuitBuilder, CircuitGraph, LogicValue};
use gatesim_sim::{Simulator, Stimulus};
use gatesim_trace_json::{JsonError, export_changes, import_stimulus};
use std::io;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn counter() -> CircuitGraph {
    let mut builder = CircuitBuilder::new();
    let clk = builder.add_input("clk").unwrap();
    let rn = builder.add_input("rn").unwrap();
    let high = builder.add_input("high").unwrap();
    let q0 = builder.add_net("q0").unwrap();
    let qn0 = builder.add_net("qn0").unwrap();
    let q1 = builder.add_net("q1").unwrap();
    let qn1 = builder.add_net("qn1").unwrap();
    let d1 = builder.add_net("d1").unwrap();
    builder
        .add_instance("ff0", CellKind::DffSr, &[("D", qn0), ("CLK", clk), ("S", high), ("R", rn), ("Q", q0), ("QN", qn0)])
        .unwrap();
    builder.add_instance("xor", CellKind::Xor2, &[("A", q0), ("B", q1), ("Y", d1)]).unwrap();
    builder
        .add_instance("ff1", CellKind::DffSr, &[("D", d1), ("CLK", clk), ("S", high), ("R", rn), ("Q", q1), ("QN", qn1)])
        .unwrap();
    let (graph, warnings) = builder.build().unwrap();
    assert!(warnings.is_empty());
    graph
}

fn import(graph: &CircuitGraph, text: &str) -> Result<Vec<Stimulus>, JsonError> {
    import_stimulus(graph, &mut io::Cursor::new(text.as_bytes()))
}

#[test]
fn test_import_and_run() {
    init_tracing();
    let graph = counter();
    let stimuli = import(
        &graph,
        r#"[
            {"time": 0, "net": "clk", "value": "0"},
            {"time": 0, "net": "rn", "value": "0"},
            {"time": 0, "net": "high", "value": "1"},
            {"time": 1, "net": "rn", "value": "1"},
            {"time": 2, "net": "clk", "value": "1"},
            {"time": 3, "net": "clk", "value": "0"},
            {"time": 4, "net": "clk", "value": "1"},
            {"time": 5, "net": "clk", "value": "0"},
            {"time": 6, "net": "clk", "value": "1"}
        ]"#,
    )
    .unwrap();
    assert_eq!(stimuli.len(), 9);
    assert_eq!(stimuli[3], Stimulus::new(1, graph.find_net("rn").unwrap(), LogicValue::One));

    let mut sim = Simulator::new(&graph);
    sim.run(stimuli).unwrap();
    // three rising edges after reset
    assert_eq!(sim.value_of("q0"), Some(LogicValue::One));
    assert_eq!(sim.value_of("q1"), Some(LogicValue::One));
}

#[test]
fn test_roundtrip() {
    let graph = counter();
    let clk = graph.find_net("clk").unwrap();
    let mut stimuli = vec![
        Stimulus::new(0, clk, LogicValue::Zero),
        Stimulus::named(&graph, "rn", 0, LogicValue::Zero).unwrap(),
        Stimulus::named(&graph, "high", 0, LogicValue::One).unwrap(),
        Stimulus::named(&graph, "rn", 5, LogicValue::One).unwrap(),
    ];
    for cycle in 1..=4 {
        stimuli.push(Stimulus::new(cycle * 10, clk, LogicValue::One));
        stimuli.push(Stimulus::new(cycle * 10 + 5, clk, LogicValue::Zero));
    }
    let mut sim = Simulator::new(&graph);
    let changes = sim.run(stimuli).unwrap();

    let mut buffer = Vec::<u8>::new();
    export_changes(&mut buffer, &graph, &changes).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains("\"q1\""));

    let events = import(&graph, &text).unwrap();
    assert_eq!(
        Vec::from_iter(events.iter().map(|event| (event.time, event.net, event.value))),
        Vec::from_iter(changes.iter().map(|change| (change.time, change.net, change.value)))
    );
}

#[test]
fn test_high_z_value() {
    let graph = counter();
    let stimuli = import(&graph, r#"[{"time": 7, "net": "high", "value": "z"}]"#).unwrap();
    assert_eq!(stimuli, vec![Stimulus::new(7, graph.find_net("high").unwrap(), LogicValue::HighZ)]);
}

#[test]
fn test_import_errors() {
    let graph = counter();
    assert!(matches!(import(&graph, "[{"), Err(JsonError::Syntax(_))));
    assert!(matches!(import(&graph, r#"{"time": 0}"#), Err(JsonError::Shape { index: None, .. })));
    assert!(matches!(import(&graph, r#"[1]"#), Err(JsonError::Shape { index: Some(0), .. })));
    assert!(matches!(
        import(&graph, r#"[{"time": 0, "net": "clk", "value": "0"}, {"time": -1, "net": "clk", "value": "0"}]"#),
        Err(JsonError::Shape { index: Some(1), .. })
    ));
    match import(&graph, r#"[{"time": 0, "net": "nope", "value": "0"}]"#) {
        Err(JsonError::UnknownNet { index: 0, name }) => assert_eq!(name, "nope"),
        other => panic!("unexpected {other:?}"),
    }
    match import(&graph, r#"[{"time": 0, "net": "clk", "value": "01"}]"#) {
        Err(error @ JsonError::BadValue { .. }) => {
            assert_eq!(error.to_string(), r#"event 0: invalid logic value "01""#)
        }
        other => panic!("unexpected {other:?}"),
    }
}

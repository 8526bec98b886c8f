use std::io::Write;

use gatesim_netlist::CircuitGraph;
use gatesim_sim::SignalChange;
use jzon::JsonValue;

pub fn export_changes(writer: &mut impl Write, graph: &CircuitGraph, changes: &[SignalChange]) -> std::io::Result<()> {
    let mut events = Vec::with_capacity(changes.len());
    for change in changes {
        let mut event = JsonValue::new_object();
        event["time"] = change.time.into();
        event["net"] = change.name(graph).into();
        event["value"] = change.value.to_string().into();
        events.push(event);
    }
    writer.write_all(JsonValue::Array(events).pretty(2).as_bytes())?;
    writer.write_all(b"\n")
}

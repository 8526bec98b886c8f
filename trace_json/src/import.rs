use std::io::Read;

use gatesim_netlist::{CircuitGraph, LogicValue};
use gatesim_sim::Stimulus;
use jzon::JsonValue;

use crate::JsonError;

fn shape(index: usize, message: &'static str) -> JsonError {
    JsonError::Shape { index: Some(index), message }
}

fn import_event(graph: &CircuitGraph, index: usize, event: &JsonValue) -> Result<Stimulus, JsonError> {
    let JsonValue::Object(object) = event else {
        return Err(shape(index, "expected an object"));
    };
    let time = object.get("time").and_then(JsonValue::as_u64).ok_or_else(|| shape(index, "missing or invalid `time`"))?;
    let name = object.get("net").and_then(JsonValue::as_str).ok_or_else(|| shape(index, "missing or invalid `net`"))?;
    let value = object.get("value").and_then(JsonValue::as_str).ok_or_else(|| shape(index, "missing or invalid `value`"))?;
    let Some(net) = graph.find_net(name) else {
        return Err(JsonError::UnknownNet { index, name: name.to_owned() });
    };
    let Ok(value) = value.parse::<LogicValue>() else {
        return Err(JsonError::BadValue { index, value: value.to_owned() });
    };
    Ok(Stimulus::new(time, net, value))
}

/// Reads a list of stimuli, resolving net names against `graph`.
///
/// Stimuli are returned in document order; [`Simulator::run`] rejects them if time goes backwards.
///
/// [`Simulator::run`]: gatesim_sim::Simulator::run
pub fn import_stimulus(graph: &CircuitGraph, reader: &mut impl Read) -> Result<Vec<Stimulus>, JsonError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let root = jzon::parse(&text)?;
    let JsonValue::Array(events) = &root else {
        return Err(JsonError::Shape { index: None, message: "expected an array of events" });
    };
    let stimuli = events
        .iter()
        .enumerate()
        .map(|(index, event)| import_event(graph, index, event))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!("imported {} stimuli", stimuli.len());
    Ok(stimuli)
}

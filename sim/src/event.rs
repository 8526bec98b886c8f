use std::fmt::Display;

use gatesim_netlist::{CircuitGraph, InstanceId, LogicValue, NetId};

/// A value applied to a primary input at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stimulus {
    pub time: u64,
    pub net: NetId,
    pub value: LogicValue,
}

impl Stimulus {
    pub fn new(time: u64, net: NetId, value: LogicValue) -> Self {
        Stimulus { time, net, value }
    }

    /// Looks up the net by name.
    pub fn named(graph: &CircuitGraph, name: &str, time: u64, value: LogicValue) -> Result<Self, UnknownNet> {
        match graph.find_net(name) {
            Some(net) => Ok(Stimulus { time, net, value }),
            None => Err(UnknownNet(name.to_owned())),
        }
    }
}

/// A net took a new settled value at the end of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalChange {
    pub time: u64,
    pub net: NetId,
    pub value: LogicValue,
}

impl SignalChange {
    pub fn name<'g>(&self, graph: &'g CircuitGraph) -> &'g str {
        graph.net_name(self.net)
    }
}

impl Display for SignalChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} = {}", self.time, self.net, self.value)
    }
}

/// A non-fatal condition observed while simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// Preset and clear of a set/reset flip-flop became active at the same time.
    IllegalPresetClear { time: u64, instance: InstanceId },
    /// Two enabled drivers of a net present opposite values.
    BusContention { time: u64, net: NetId },
}

impl Diagnostic {
    pub fn time(&self) -> u64 {
        match *self {
            Diagnostic::IllegalPresetClear { time, .. } | Diagnostic::BusContention { time, .. } => time,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::IllegalPresetClear { time, instance } => {
                write!(f, "#{time}: preset and clear of {instance} are both active")
            }
            Diagnostic::BusContention { time, net } => write!(f, "#{time}: contention on {net}"),
        }
    }
}

/// A stimulus named a net that is not part of the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNet(pub String);

impl Display for UnknownNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown net {:?}", self.0)
    }
}

impl std::error::Error for UnknownNet {}

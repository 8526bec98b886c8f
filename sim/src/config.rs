use gatesim_netlist::LogicValue;

/// Parameters of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// The number of delta cycles (and clock phases) a single step may take before the circuit is
    /// considered to oscillate.
    pub max_deltas: usize,
    /// The value read from a net that has no drivers at all.
    pub floating: LogicValue,
}

impl SimConfig {
    pub const DEFAULT_MAX_DELTAS: usize = 1000;

    pub fn new() -> Self {
        SimConfig { max_deltas: Self::DEFAULT_MAX_DELTAS, floating: LogicValue::Unknown }
    }

    pub fn with_max_deltas(self, max_deltas: usize) -> Self {
        Self { max_deltas, ..self }
    }

    pub fn with_floating(self, floating: LogicValue) -> Self {
        Self { floating, ..self }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig::new()
    }
}

use gatesim_netlist::{CircuitGraph, Storage};

/// Latched state of every flip-flop and latch of one simulation run, indexed by storage slot.
///
/// Slots are assigned by the graph builder (see [`CircuitGraph::storage_slot`]); the store itself is
/// owned by a single simulator and is never shared between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStore {
    cells: Vec<Storage>,
}

impl StateStore {
    pub fn new(graph: &CircuitGraph) -> Self {
        StateStore { cells: vec![Storage::INIT; graph.storage_cells().len()] }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, slot: usize) -> Storage {
        self.cells[slot]
    }

    /// Replaces the state in `slot`, returning the previous one.
    pub(crate) fn set(&mut self, slot: usize, state: Storage) -> Storage {
        std::mem::replace(&mut self.cells[slot], state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Storage)> + '_ {
        self.cells.iter().copied().enumerate()
    }
}

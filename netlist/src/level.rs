use std::collections::VecDeque;

use crate::{CircuitGraph, Driver, InstanceId};

impl CircuitGraph {
    /// Assigns a combinational depth to every gate, treating primary inputs and storage cells as level 0.
    ///
    /// Returns the gates that could not be ordered, i.e. those on or downstream of a combinational loop.
    pub(crate) fn levelize(&mut self) -> Vec<InstanceId> {
        let is_gate = |graph: &CircuitGraph, instance: InstanceId| !graph.instance_kind(instance).is_sequential();

        // one pending edge per (input pin, gate driver of that pin's net)
        let mut pending = vec![0usize; self.instance_count()];
        let mut queue = VecDeque::new();
        for instance in self.instances() {
            if !is_gate(self, instance) {
                continue;
            }
            for &net in self.instance_inputs(instance) {
                for &driver in self.net_drivers(net) {
                    if let Driver::Pin(pin) = self.driver(driver)
                        && is_gate(self, pin.instance)
                    {
                        pending[instance.index()] += 1;
                    }
                }
            }
            if pending[instance.index()] == 0 {
                queue.push_back(instance);
            }
        }

        let mut levels = vec![0u32; self.instance_count()];
        let mut resolved = vec![false; self.instance_count()];
        while let Some(instance) = queue.pop_front() {
            resolved[instance.index()] = true;
            let level = levels[instance.index()] + 1;
            self.instances[instance.index()].level = Some(level);
            for &driver in self.instance_outputs(instance) {
                let net = self.driver_net(driver);
                for load in self.net_loads(net) {
                    let target = load.instance;
                    if !is_gate(self, target) {
                        continue;
                    }
                    levels[target.index()] = levels[target.index()].max(level);
                    pending[target.index()] -= 1;
                    if pending[target.index()] == 0 {
                        queue.push_back(target);
                    }
                }
            }
        }

        Vec::from_iter(self.instances().filter(|&instance| is_gate(self, instance) && !resolved[instance.index()]))
    }
}

/// Iterative Tarjan's algorithm over the gate-to-gate edges of a set of candidate gates.
struct Tarjan<'a> {
    graph: &'a CircuitGraph,
    member: Vec<bool>,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<InstanceId>,
    counter: usize,
    components: Vec<Vec<InstanceId>>,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a CircuitGraph, candidates: &[InstanceId]) -> Self {
        let count = graph.instance_count();
        let mut member = vec![false; count];
        for &instance in candidates {
            member[instance.index()] = true;
        }
        Tarjan {
            graph,
            member,
            index: vec![None; count],
            lowlink: vec![0; count],
            on_stack: vec![false; count],
            stack: Vec::new(),
            counter: 0,
            components: Vec::new(),
        }
    }

    fn successors(&self, instance: InstanceId) -> Vec<InstanceId> {
        let mut result = Vec::new();
        for &driver in self.graph.instance_outputs(instance) {
            for &target in self.graph.net_fanout(self.graph.driver_net(driver)) {
                if self.member[target.index()] && !result.contains(&target) {
                    result.push(target);
                }
            }
        }
        result
    }

    fn enter(&mut self, instance: InstanceId) -> (InstanceId, Vec<InstanceId>, usize) {
        self.index[instance.index()] = Some(self.counter);
        self.lowlink[instance.index()] = self.counter;
        self.counter += 1;
        self.stack.push(instance);
        self.on_stack[instance.index()] = true;
        (instance, self.successors(instance), 0)
    }

    fn run(&mut self, root: InstanceId) {
        if self.index[root.index()].is_some() {
            return;
        }
        let mut frames = vec![self.enter(root)];
        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if let Some(&next) = frame.1.get(frame.2) {
                frame.2 += 1;
                match self.index[next.index()] {
                    None => frames.push(self.enter(next)),
                    Some(next_index) if self.on_stack[next.index()] => {
                        self.lowlink[node.index()] = self.lowlink[node.index()].min(next_index);
                    }
                    Some(_) => (),
                }
                continue;
            }
            frames.pop();
            if let Some(parent) = frames.last() {
                let parent = parent.0.index();
                self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[node.index()]);
            }
            if Some(self.lowlink[node.index()]) == self.index[node.index()] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack[member.index()] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }
}

impl CircuitGraph {
    /// Finds the strongly connected sets of gates among `candidates`.
    ///
    /// Each cycle is sorted by instance id; a single gate is only reported if it feeds itself.
    pub(crate) fn find_cycles(&self, candidates: &[InstanceId]) -> Vec<Vec<InstanceId>> {
        let mut tarjan = Tarjan::new(self, candidates);
        for &instance in candidates {
            tarjan.run(instance);
        }
        let mut cycles = Vec::new();
        for mut component in std::mem::take(&mut tarjan.components) {
            if component.len() == 1 && !tarjan.successors(component[0]).contains(&component[0]) {
                continue;
            }
            component.sort();
            cycles.push(component);
        }
        cycles.sort();
        cycles
    }
}

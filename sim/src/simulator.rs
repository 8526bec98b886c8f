use std::collections::BTreeSet;

use gatesim_netlist::{
    CircuitGraph, DriverId, InstanceId, InvalidInput, LogicValue, NetId, Outputs, Override, Sample, Storage,
    StorageCell, Trit,
};

use crate::{Diagnostic, InvalidSite, SignalChange, SimConfig, StateStore, StepError, StepErrorKind, Stimulus};

trait Keyed: Copy {
    fn key(self) -> usize;
}

impl Keyed for NetId {
    fn key(self) -> usize {
        self.index()
    }
}

impl Keyed for InstanceId {
    fn key(self) -> usize {
        self.index()
    }
}

impl Keyed for usize {
    fn key(self) -> usize {
        self
    }
}

/// A set of pending items that remembers insertion order and ignores duplicates.
#[derive(Debug)]
struct WorkList<T> {
    items: Vec<T>,
    queued: Vec<bool>,
}

impl<T: Keyed> WorkList<T> {
    fn new(capacity: usize) -> Self {
        WorkList { items: Vec::new(), queued: vec![false; capacity] }
    }

    fn push(&mut self, item: T) {
        if !std::mem::replace(&mut self.queued[item.key()], true) {
            self.items.push(item);
        }
    }

    fn take(&mut self) -> Vec<T> {
        let items = std::mem::take(&mut self.items);
        for item in &items {
            self.queued[item.key()] = false;
        }
        items
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn retain(&mut self, mut keep: impl FnMut(T) -> bool) {
        let queued = &mut self.queued;
        self.items.retain(|&item| {
            let kept = keep(item);
            if !kept {
                queued[item.key()] = false;
            }
            kept
        });
    }

    fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.items.iter().copied()
    }
}

/// Remembers the value each net had when a convergence round started.
#[derive(Debug)]
struct Round {
    origin: Vec<Option<LogicValue>>,
    touched: Vec<NetId>,
}

impl Round {
    fn new(net_count: usize) -> Self {
        Round { origin: vec![None; net_count], touched: Vec::new() }
    }

    fn touch(&mut self, net: NetId, old: LogicValue) {
        let origin = &mut self.origin[net.index()];
        if origin.is_none() {
            *origin = Some(old);
            self.touched.push(net);
        }
    }

    /// Emits a change for every net whose value differs from the one it had at the start of the round.
    fn finish(&mut self, time: u64, nets: &[LogicValue], changes: &mut Vec<SignalChange>) {
        self.touched.sort();
        for net in self.touched.drain(..) {
            let value = nets[net.index()];
            if self.origin[net.index()].take() != Some(value) {
                changes.push(SignalChange { time, net, value });
            }
        }
    }
}

type DeltaOrder<'a> = Box<dyn FnMut(&mut [InstanceId]) + 'a>;

fn evaluate_gate(graph: &CircuitGraph, nets: &[LogicValue], instance: InstanceId) -> Result<Outputs, InvalidInput> {
    let inputs = graph.instance_inputs(instance);
    let mut values = [LogicValue::Unknown; 4];
    for (value, net) in values.iter_mut().zip(inputs) {
        *value = nets[net.index()];
    }
    graph.instance_kind(instance).evaluate(&values[..inputs.len()])
}

/// Resolves a net from the values presented by its drivers; also returns whether they conflict.
fn resolve_net(graph: &CircuitGraph, presented: &[LogicValue], floating: LogicValue, net: NetId) -> (LogicValue, bool) {
    let drivers = graph.net_drivers(net);
    if drivers.is_empty() {
        (floating, false)
    } else {
        LogicValue::resolve_bus(drivers.iter().map(|driver| presented[driver.index()]))
    }
}

/// Event-driven evaluator of a [`CircuitGraph`].
///
/// Every step applies stimuli to primary inputs and then runs delta cycles until no net changes.
/// Within a delta cycle all scheduled gates read the net values frozen at the start of the cycle, so
/// the settled result does not depend on the order in which they are evaluated. Once the
/// combinational logic is quiescent, a clock phase samples every storage cell whose inputs changed
/// and commits their new states together; this repeats until the whole circuit is stable.
///
/// A combinational cycle that settles at `X` may only be stable because its value is unknown, as
/// with an inverter driving its own input. Whenever such a cycle is disturbed, it is probed by
/// seeding one of its unknown nets with `0` and `1`; if either seed oscillates, the step fails with
/// [`StepErrorKind::NonConvergent`] like a loop that oscillates between known values.
pub struct Simulator<'a> {
    graph: &'a CircuitGraph,
    config: SimConfig,
    time: Option<u64>,
    nets: Vec<LogicValue>,
    presented: Vec<LogicValue>,
    contended: Vec<bool>,
    store: StateStore,
    diagnostics: Vec<Diagnostic>,
    gates: WorkList<InstanceId>,
    storage: WorkList<usize>,
    dirty: WorkList<NetId>,
    round: Round,
    cycle_of: Vec<Option<usize>>,
    suspects: WorkList<usize>,
    /// Nets set to `X` by [`Simulator::recover`] that have not taken a known value since.
    forced: Vec<bool>,
    order: Option<DeltaOrder<'a>>,
}

impl<'a> Simulator<'a> {
    pub fn new(graph: &'a CircuitGraph) -> Self {
        Self::with_config(graph, SimConfig::default())
    }

    pub fn with_config(graph: &'a CircuitGraph, config: SimConfig) -> Self {
        let cycles = graph.combinational_cycles();
        let mut cycle_of = vec![None; graph.instance_count()];
        for (index, cycle) in cycles.iter().enumerate() {
            for &instance in cycle {
                cycle_of[instance.index()] = Some(index);
            }
        }
        let mut presented = vec![LogicValue::Unknown; graph.driver_count()];
        for &net in graph.inputs() {
            if let Some(driver) = graph.input_driver(net)
                && graph.net_drivers(net).len() > 1
            {
                presented[driver.index()] = LogicValue::HighZ;
            }
        }
        Simulator {
            graph,
            config,
            time: None,
            nets: vec![LogicValue::Unknown; graph.net_count()],
            presented,
            contended: vec![false; graph.net_count()],
            store: StateStore::new(graph),
            diagnostics: Vec::new(),
            gates: WorkList::new(graph.instance_count()),
            storage: WorkList::new(graph.storage_cells().len()),
            dirty: WorkList::new(graph.net_count()),
            round: Round::new(graph.net_count()),
            cycle_of,
            suspects: WorkList::new(cycles.len()),
            forced: vec![false; graph.net_count()],
            order: None,
        }
    }

    /// Installs a hook that may permute the gates scheduled for each delta cycle before they are
    /// evaluated.
    pub fn set_delta_order(&mut self, order: impl FnMut(&mut [InstanceId]) + 'a) {
        self.order = Some(Box::new(order));
    }

    pub fn graph(&self) -> &'a CircuitGraph {
        self.graph
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Returns the time of the last step, or `None` if the simulation has not started.
    pub fn time(&self) -> Option<u64> {
        self.time
    }

    pub fn net_value(&self, net: NetId) -> LogicValue {
        self.nets[net.index()]
    }

    pub fn value_of(&self, name: &str) -> Option<LogicValue> {
        self.graph.find_net(name).map(|net| self.net_value(net))
    }

    /// Returns the state of a flip-flop or latch, or `None` for a combinational instance.
    pub fn state(&self, instance: InstanceId) -> Option<Storage> {
        self.graph.storage_slot(instance).map(|slot| self.store.get(slot))
    }

    pub fn state_store(&self) -> &StateStore {
        &self.store
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Applies `stimuli` to primary inputs at `time` and propagates them until the circuit is stable.
    ///
    /// If the same input appears more than once, the last value wins. The first step also evaluates
    /// every cell once, so its changes include the initial values of all nets that settle to
    /// something other than `X`.
    pub fn step(&mut self, time: u64, stimuli: &[(NetId, LogicValue)]) -> Result<Vec<SignalChange>, StepError> {
        if let Some(now) = self.time
            && time < now
        {
            return Err(StepError::new(time, StepErrorKind::TimeReversal { now }));
        }
        let mut drivers = Vec::with_capacity(stimuli.len());
        for &(net, value) in stimuli {
            if net.index() >= self.graph.net_count() {
                return Err(StepError::new(time, StepErrorKind::NotAnInput(net)));
            }
            match self.graph.input_driver(net) {
                Some(driver) => drivers.push((driver, value)),
                None => return Err(StepError::new(time, StepErrorKind::NotAnInput(net))),
            }
        }

        if self.time.is_none() {
            self.schedule_all();
        }
        self.time = Some(time);
        tracing::debug!("step #{time}: {} stimuli", stimuli.len());
        for (driver, value) in drivers {
            self.present(driver, value);
        }
        self.propagate(time)
    }

    /// Propagates pending activity without applying stimuli.
    pub fn settle(&mut self, time: u64) -> Result<Vec<SignalChange>, StepError> {
        self.step(time, &[])
    }

    /// Applies a sequence of stimuli, grouping those with equal timestamps into one step.
    ///
    /// Stimuli must be ordered by time. On failure, the error carries every change produced up to
    /// and including the failing step.
    pub fn run(&mut self, stimuli: impl IntoIterator<Item = Stimulus>) -> Result<Vec<SignalChange>, StepError> {
        let mut changes = Vec::new();
        let mut stimuli = stimuli.into_iter().peekable();
        while let Some(first) = stimuli.next() {
            let mut batch = vec![(first.net, first.value)];
            while let Some(next) = stimuli.next_if(|next| next.time == first.time) {
                batch.push((next.net, next.value));
            }
            match self.step(first.time, &batch) {
                Ok(step_changes) => changes.extend(step_changes),
                Err(mut error) => {
                    changes.append(&mut error.changes);
                    error.changes = changes;
                    return Err(error);
                }
            }
        }
        Ok(changes)
    }

    /// Forces `nets` to `X` and settles the circuit again.
    ///
    /// Intended for the nets reported by [`StepErrorKind::NonConvergent`]: a loop that oscillates
    /// between known values is usually stable once one of its nets is unknown. Pending evaluations
    /// of the cells driving `nets` are discarded; the nets keep `X` until one of their drivers
    /// presents a new value.
    pub fn recover(&mut self, nets: &[NetId]) -> Result<Vec<SignalChange>, StepError> {
        let graph = self.graph;
        let time = self.time.unwrap_or_default();
        let mut forced = vec![false; graph.net_count()];
        for &net in nets {
            forced[net.index()] = true;
        }
        let drives_forced = |drivers: &[DriverId]| drivers.iter().any(|&driver| forced[graph.driver_net(driver).index()]);
        self.gates.retain(|instance| !drives_forced(graph.instance_outputs(instance)));
        self.storage.retain(|slot| {
            let cell = &graph.storage_cells()[slot];
            !drives_forced(&[cell.q, cell.qn])
        });
        for &net in nets {
            tracing::debug!("forcing {:?} to X", graph.net_name(net));
            self.forced[net.index()] = true;
            for &driver in graph.net_drivers(net) {
                self.present(driver, LogicValue::Unknown);
            }
        }
        self.propagate(time)
    }

    fn schedule_all(&mut self) {
        let graph = self.graph;
        for net in graph.nets() {
            self.dirty.push(net);
        }
        for instance in graph.instances() {
            match graph.storage_slot(instance) {
                Some(slot) => self.storage.push(slot),
                None => self.gates.push(instance),
            }
        }
    }

    fn schedule_fanout(&mut self, net: NetId) {
        let graph = self.graph;
        for &instance in graph.net_fanout(net) {
            match graph.storage_slot(instance) {
                Some(slot) => self.storage.push(slot),
                None => self.gates.push(instance),
            }
        }
    }

    fn present(&mut self, driver: DriverId, value: LogicValue) {
        let presented = &mut self.presented[driver.index()];
        if *presented != value {
            *presented = value;
            self.dirty.push(self.graph.driver_net(driver));
        }
    }

    fn propagate(&mut self, time: u64) -> Result<Vec<SignalChange>, StepError> {
        let mut changes = Vec::new();
        let mut invalid = Vec::new();
        let mut budget = self.config.max_deltas;
        let mut result = self.settle_rounds(time, &mut budget, &mut changes, &mut invalid);
        if result.is_ok() && invalid.is_empty() {
            result = self.check_cycles();
        }
        let kind = match result {
            Ok(()) if invalid.is_empty() => {
                tracing::debug!(
                    "settled #{time} after {} deltas, {} changes",
                    self.config.max_deltas - budget,
                    changes.len()
                );
                return Ok(changes);
            }
            Ok(()) => {
                invalid.sort_by_key(|site: &InvalidSite| (site.instance, site.pin));
                invalid.dedup();
                StepErrorKind::InvalidSignal(invalid)
            }
            Err(kind) => kind,
        };
        let error = StepError { time, kind, changes };
        tracing::warn!("{error}");
        Err(error)
    }

    fn settle_rounds(
        &mut self,
        time: u64,
        budget: &mut usize,
        changes: &mut Vec<SignalChange>,
        invalid: &mut Vec<InvalidSite>,
    ) -> Result<(), StepErrorKind> {
        loop {
            let converged = self.converge(time, budget, invalid);
            self.round.finish(time, &self.nets, changes);
            converged?;
            if self.storage.is_empty() {
                return Ok(());
            }
            if *budget == 0 {
                return Err(self.non_convergent());
            }
            *budget -= 1;
            self.clock(time, invalid);
            if self.dirty.is_empty() {
                return Ok(());
            }
        }
    }

    /// Runs delta cycles until no gate is scheduled.
    fn converge(&mut self, time: u64, budget: &mut usize, invalid: &mut Vec<InvalidSite>) -> Result<(), StepErrorKind> {
        loop {
            self.resolve_dirty(time);
            if self.gates.is_empty() {
                return Ok(());
            }
            if *budget == 0 {
                return Err(self.non_convergent());
            }
            *budget -= 1;
            let mut batch = self.gates.take();
            if let Some(order) = &mut self.order {
                order(&mut batch);
            }
            tracing::trace!("delta #{time}+{}: {} gates", self.config.max_deltas - *budget, batch.len());
            for instance in batch {
                self.evaluate(instance, invalid);
            }
        }
    }

    fn evaluate(&mut self, instance: InstanceId, invalid: &mut Vec<InvalidSite>) {
        let graph = self.graph;
        if let Some(cycle) = self.cycle_of[instance.index()] {
            self.suspects.push(cycle);
        }
        match evaluate_gate(graph, &self.nets, instance) {
            Ok(outputs) => {
                for (&driver, &value) in graph.instance_outputs(instance).iter().zip(outputs.iter()) {
                    self.present(driver, value);
                }
            }
            Err(error) => invalid.push(InvalidSite { instance, pin: error.pin }),
        }
    }

    fn resolve_dirty(&mut self, time: u64) {
        let graph = self.graph;
        for net in self.dirty.take() {
            let (value, conflict) = resolve_net(graph, &self.presented, self.config.floating, net);
            if conflict && !self.contended[net.index()] {
                tracing::warn!("#{time}: contention on net {:?}", graph.net_name(net));
                self.diagnostics.push(Diagnostic::BusContention { time, net });
            }
            self.contended[net.index()] = conflict;
            if value != LogicValue::Unknown {
                self.forced[net.index()] = false;
            }
            let old = self.nets[net.index()];
            if value != old {
                self.round.touch(net, old);
                self.nets[net.index()] = value;
                self.schedule_fanout(net);
            }
        }
    }

    /// Samples every scheduled storage cell, then presents their new outputs.
    fn clock(&mut self, time: u64, invalid: &mut Vec<InvalidSite>) {
        let graph = self.graph;
        let slots = self.storage.take();
        tracing::trace!("clock #{time}: {} storage cells", slots.len());
        for slot in slots {
            let cell = &graph.storage_cells()[slot];
            let prev = self.store.get(slot);
            let sample = match self.sample(cell) {
                Ok(sample) => sample,
                Err(pin) => {
                    invalid.push(InvalidSite { instance: cell.instance, pin });
                    // the output holds, but a readable clock level still counts for the next edge
                    if let Ok(clock) = self.nets[cell.clock.net().index()].as_trit() {
                        self.store.set(slot, Storage { clock: cell.clock.active(clock), ..prev });
                    }
                    continue;
                }
            };
            let next = prev.next(cell.trigger, sample);
            if next.forced == Override::Illegal && prev.forced != Override::Illegal {
                tracing::warn!("#{time}: preset and clear of {:?} are both active", graph.instance_name(cell.instance));
                self.diagnostics.push(Diagnostic::IllegalPresetClear { time, instance: cell.instance });
            }
            self.store.set(slot, next);
            self.present(cell.q, next.q.into());
            self.present(cell.qn, next.qn().into());
        }
    }

    fn sample(&self, cell: &StorageCell) -> Result<Sample, &'static str> {
        let pins = self.graph.instance_kind(cell.instance).inputs();
        let read = |net: NetId, pin: usize| -> Result<Trit, &'static str> {
            self.nets[net.index()].as_trit().map_err(|_| pins[pin])
        };
        let mut sample = Sample::new(read(cell.data, 0)?, cell.clock.active(read(cell.clock.net(), 1)?));
        if let Some(preset) = cell.preset {
            sample = sample.with_preset(preset.active(read(preset.net(), 2)?));
        }
        if let Some(clear) = cell.clear {
            sample = sample.with_clear(clear.active(read(clear.net(), 3)?));
        }
        Ok(sample)
    }

    /// Probes every disturbed combinational cycle that rests at `X`.
    fn check_cycles(&mut self) -> Result<(), StepErrorKind> {
        let graph = self.graph;
        for index in self.suspects.take() {
            let cycle = &graph.combinational_cycles()[index];
            let nets = BTreeSet::from_iter(
                cycle.iter().flat_map(|&instance| graph.instance_outputs(instance)).map(|&driver| graph.driver_net(driver)),
            );
            // a cycle that was recovered stays at `X` until it settles to known values on its own
            if nets.iter().any(|net| self.forced[net.index()]) {
                continue;
            }
            let Some(&seed) = nets.iter().find(|net| self.nets[net.index()] == LogicValue::Unknown) else {
                continue;
            };
            if self.oscillates(index, seed, LogicValue::Zero) || self.oscillates(index, seed, LogicValue::One) {
                tracing::debug!("cycle through {:?} oscillates once resolved", graph.net_name(seed));
                return Err(StepErrorKind::NonConvergent { nets: Vec::from_iter(nets) });
            }
        }
        Ok(())
    }

    /// Runs the gates of one cycle on a scratch copy of the nets, with `seed` set to `value`, and
    /// reports whether they are still changing once the delta budget is spent.
    fn oscillates(&self, cycle: usize, seed: NetId, value: LogicValue) -> bool {
        let graph = self.graph;
        let mut nets = self.nets.clone();
        let mut presented = self.presented.clone();
        let mut pending = WorkList::new(graph.instance_count());
        let mut dirty = WorkList::new(graph.net_count());
        let schedule = |pending: &mut WorkList<InstanceId>, net: NetId| {
            for &instance in graph.net_fanout(net) {
                if self.cycle_of[instance.index()] == Some(cycle) {
                    pending.push(instance);
                }
            }
        };
        nets[seed.index()] = value;
        schedule(&mut pending, seed);
        for _ in 0..self.config.max_deltas {
            if pending.is_empty() {
                return false;
            }
            for instance in pending.take() {
                let Ok(outputs) = evaluate_gate(graph, &nets, instance) else {
                    return false;
                };
                for (&driver, &value) in graph.instance_outputs(instance).iter().zip(outputs.iter()) {
                    if presented[driver.index()] != value {
                        presented[driver.index()] = value;
                        dirty.push(graph.driver_net(driver));
                    }
                }
            }
            for net in dirty.take() {
                let (value, _) = resolve_net(graph, &presented, self.config.floating, net);
                if nets[net.index()] != value {
                    nets[net.index()] = value;
                    schedule(&mut pending, net);
                }
            }
        }
        !pending.is_empty()
    }

    /// Collects the nets that the pending work would have changed.
    fn non_convergent(&self) -> StepErrorKind {
        let graph = self.graph;
        let mut nets = BTreeSet::new();
        for instance in self.gates.iter() {
            nets.extend(graph.instance_outputs(instance).iter().map(|&driver| graph.driver_net(driver)));
        }
        for slot in self.storage.iter() {
            let cell = &graph.storage_cells()[slot];
            nets.insert(graph.driver_net(cell.q));
            nets.insert(graph.driver_net(cell.qn));
        }
        nets.extend(self.dirty.iter());
        StepErrorKind::NonConvergent { nets: Vec::from_iter(nets) }
    }
}

impl std::fmt::Debug for Simulator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("time", &self.time)
            .field("nets", &self.nets)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

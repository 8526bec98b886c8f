use std::fmt::Display;

use indexmap::IndexMap;

use crate::{CellKind, ControlNet, DriverId, InstanceId, NetId, PinRef, Trigger, UnknownCellKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    UnknownCellKind(String),
    /// A net or instance name was used twice.
    DuplicateName(String),
    DuplicateBinding { instance: String, pin: &'static str },
    UnknownPin { instance: String, pin: String },
    UnboundPin { instance: String, pin: &'static str },
    InvalidNet(NetId),
    InvalidInstance(InstanceId),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::UnknownCellKind(name) => write!(f, "unknown cell kind {name:?}"),
            BuildError::DuplicateName(name) => write!(f, "name {name:?} is already in use"),
            BuildError::DuplicateBinding { instance, pin } => {
                write!(f, "pin {pin} of instance {instance:?} is bound more than once")
            }
            BuildError::UnknownPin { instance, pin } => write!(f, "instance {instance:?} has no pin {pin:?}"),
            BuildError::UnboundPin { instance, pin } => write!(f, "pin {pin} of instance {instance:?} is not bound"),
            BuildError::InvalidNet(net) => write!(f, "net {net} does not belong to this circuit"),
            BuildError::InvalidInstance(instance) => write!(f, "instance {instance} does not belong to this circuit"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<UnknownCellKind> for BuildError {
    fn from(error: UnknownCellKind) -> Self {
        BuildError::UnknownCellKind(error.0)
    }
}

/// A suspicious, but simulatable, property of a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The net has no drivers; its loads read the floating value chosen by the simulator.
    DanglingNet(String),
    /// The named instances lie on, or downstream of, a cycle of combinational cells.
    CombinationalLoop(Vec<String>),
}

impl Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildWarning::DanglingNet(name) => write!(f, "net {name:?} has no drivers"),
            BuildWarning::CombinationalLoop(names) => {
                write!(f, "combinational loop through {}", names.join(", "))
            }
        }
    }
}

/// Where the value presented by a driver comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    Pin(PinRef),
    /// The stimulus of a primary input.
    Input(NetId),
}

/// Pins of a flip-flop or latch, resolved to nets and polarities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageCell {
    pub instance: InstanceId,
    pub trigger: Trigger,
    pub data: NetId,
    pub clock: ControlNet,
    pub preset: Option<ControlNet>,
    pub clear: Option<ControlNet>,
    pub q: DriverId,
    pub qn: DriverId,
}

#[derive(Debug, Clone)]
struct PendingInstance {
    kind: CellKind,
    pins: Vec<Option<NetId>>,
}

#[derive(Debug, Clone, Default)]
struct PendingNet {
    input: bool,
    output: bool,
}

/// Collects nets and instances, and checks them into an immutable [`CircuitGraph`].
#[derive(Debug, Clone, Default)]
pub struct CircuitBuilder {
    nets: IndexMap<String, PendingNet>,
    instances: IndexMap<String, PendingInstance>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_net(&mut self, name: impl Into<String>) -> Result<NetId, BuildError> {
        let name = name.into();
        if self.nets.contains_key(&name) {
            return Err(BuildError::DuplicateName(name));
        }
        let (index, _) = self.nets.insert_full(name, PendingNet::default());
        Ok(NetId::from_index(index))
    }

    /// Adds a primary input: a net with an additional driver controlled by stimulus.
    ///
    /// Before any stimulus reaches it, the external driver presents `X` if it is the only driver of
    /// the net, and `Z` if cells drive the net as well.
    pub fn add_input(&mut self, name: impl Into<String>) -> Result<NetId, BuildError> {
        let net = self.add_net(name)?;
        self.nets[net.index()].input = true;
        Ok(net)
    }

    pub fn add_output(&mut self, net: NetId) -> Result<(), BuildError> {
        self.nets.get_index_mut(net.index()).ok_or(BuildError::InvalidNet(net))?.1.output = true;
        Ok(())
    }

    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.nets.get_index_of(name).map(NetId::from_index)
    }

    /// Adds an instance of `kind`, binding the listed pins. Pins that are not listed must be bound with
    /// [`connect`] before the circuit is built.
    ///
    /// [`connect`]: CircuitBuilder::connect
    pub fn add_instance(
        &mut self,
        name: impl Into<String>,
        kind: CellKind,
        bindings: &[(&str, NetId)],
    ) -> Result<InstanceId, BuildError> {
        let name = name.into();
        if self.instances.contains_key(&name) {
            return Err(BuildError::DuplicateName(name));
        }
        let mut pins = vec![None; kind.pin_count()];
        for &(pin_name, net) in bindings {
            self.check_net(net)?;
            let Some(pin) = kind.pin_index(pin_name) else {
                return Err(BuildError::UnknownPin { instance: name, pin: pin_name.to_owned() });
            };
            if pins[pin].is_some() {
                let pin = kind.pins().nth(pin).unwrap_or_default();
                return Err(BuildError::DuplicateBinding { instance: name, pin });
            }
            pins[pin] = Some(net);
        }
        let (index, _) = self.instances.insert_full(name, PendingInstance { kind, pins });
        Ok(InstanceId::from_index(index))
    }

    /// Like [`add_instance`], with the kind given by its library cell name, e.g. `"AOI21_X1"`.
    ///
    /// [`add_instance`]: CircuitBuilder::add_instance
    pub fn add_instance_named(
        &mut self,
        name: impl Into<String>,
        kind: &str,
        bindings: &[(&str, NetId)],
    ) -> Result<InstanceId, BuildError> {
        let kind = CellKind::from_library_name(kind)?;
        self.add_instance(name, kind, bindings)
    }

    pub fn pin(&self, instance: InstanceId, pin: &str) -> Result<PinRef, BuildError> {
        let (name, pending) = self.instances.get_index(instance.index()).ok_or(BuildError::InvalidInstance(instance))?;
        match pending.kind.pin_index(pin) {
            Some(index) => Ok(PinRef::new(instance, index)),
            None => Err(BuildError::UnknownPin { instance: name.clone(), pin: pin.to_owned() }),
        }
    }

    pub fn connect(&mut self, pin: PinRef, net: NetId) -> Result<(), BuildError> {
        self.check_net(net)?;
        let (name, pending) =
            self.instances.get_index_mut(pin.instance.index()).ok_or(BuildError::InvalidInstance(pin.instance))?;
        let Some(slot) = pending.pins.get_mut(pin.pin) else {
            return Err(BuildError::UnknownPin { instance: name.clone(), pin: format!("#{}", pin.pin) });
        };
        if slot.is_some() {
            let pin = pending.kind.pins().nth(pin.pin).unwrap_or_default();
            return Err(BuildError::DuplicateBinding { instance: name.clone(), pin });
        }
        *slot = Some(net);
        Ok(())
    }

    fn check_net(&self, net: NetId) -> Result<(), BuildError> {
        if net.index() < self.nets.len() { Ok(()) } else { Err(BuildError::InvalidNet(net)) }
    }

    pub fn build(self) -> Result<(CircuitGraph, Vec<BuildWarning>), BuildError> {
        let nets = self.nets.into_iter().map(|(name, pending)| {
            let net = NetData {
                drivers: Vec::new(),
                loads: Vec::new(),
                fanout: Vec::new(),
                input: None,
                output: pending.output,
            };
            (name, (net, pending.input))
        });
        let mut nets: IndexMap<String, (NetData, bool)> = IndexMap::from_iter(nets);
        let mut drivers = Vec::new();
        let mut instances = IndexMap::new();
        let mut storage = Vec::new();

        for (index, (name, pending)) in self.instances.into_iter().enumerate() {
            let id = InstanceId::from_index(index);
            let kind = pending.kind;
            let mut bound = Vec::with_capacity(pending.pins.len());
            for (pin, net) in kind.pins().zip(&pending.pins) {
                match net {
                    Some(net) => bound.push(*net),
                    None => return Err(BuildError::UnboundPin { instance: name, pin }),
                }
            }
            let (inputs, outputs) = bound.split_at(kind.inputs().len());
            for (pin, &net) in inputs.iter().enumerate() {
                let (data, _) = &mut nets[net.index()];
                data.loads.push(PinRef::new(id, pin));
                if data.fanout.last() != Some(&id) {
                    data.fanout.push(id);
                }
            }
            let mut output_drivers = Vec::with_capacity(outputs.len());
            for (offset, &net) in outputs.iter().enumerate() {
                let driver = DriverId::from_index(drivers.len());
                drivers.push((Driver::Pin(PinRef::new(id, inputs.len() + offset)), net));
                nets[net.index()].0.drivers.push(driver);
                output_drivers.push(driver);
            }
            let slot = kind.trigger().map(|trigger| {
                storage.push(StorageCell {
                    instance: id,
                    trigger,
                    data: inputs[0],
                    clock: ControlNet::from_net_invert(inputs[1], kind == CellKind::DffNeg),
                    preset: (kind == CellKind::DffSr).then(|| ControlNet::Neg(inputs[2])),
                    clear: (kind == CellKind::DffSr).then(|| ControlNet::Neg(inputs[3])),
                    q: output_drivers[0],
                    qn: output_drivers[1],
                });
                storage.len() - 1
            });
            let data = InstanceData { kind, inputs: inputs.to_vec(), outputs: output_drivers, storage: slot, level: None };
            instances.insert(name, data);
        }

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for (index, (_, (data, is_input))) in nets.iter_mut().enumerate() {
            let net = NetId::from_index(index);
            if *is_input {
                let driver = DriverId::from_index(drivers.len());
                drivers.push((Driver::Input(net), net));
                data.drivers.push(driver);
                data.input = Some(driver);
                inputs.push(net);
            }
            if data.output {
                outputs.push(net);
            }
        }

        let mut graph = CircuitGraph {
            nets: IndexMap::from_iter(nets.into_iter().map(|(name, (data, _))| (name, data))),
            instances,
            drivers,
            storage,
            inputs,
            outputs,
            cycles: Vec::new(),
        };

        let mut warnings = Vec::new();
        for net in graph.nets() {
            if graph.is_dangling(net) {
                tracing::warn!("net {:?} has no drivers", graph.net_name(net));
                warnings.push(BuildWarning::DanglingNet(graph.net_name(net).to_owned()));
            }
        }
        let unresolved = graph.levelize();
        graph.cycles = graph.find_cycles(&unresolved);
        for cycle in &graph.cycles {
            let names = Vec::from_iter(cycle.iter().map(|&instance| graph.instance_name(instance).to_owned()));
            tracing::warn!("combinational loop through {}", names.join(", "));
            warnings.push(BuildWarning::CombinationalLoop(names));
        }
        Ok((graph, warnings))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InstanceData {
    pub(crate) kind: CellKind,
    pub(crate) inputs: Vec<NetId>,
    pub(crate) outputs: Vec<DriverId>,
    storage: Option<usize>,
    pub(crate) level: Option<u32>,
}

#[derive(Debug, Clone)]
pub(crate) struct NetData {
    pub(crate) drivers: Vec<DriverId>,
    pub(crate) loads: Vec<PinRef>,
    fanout: Vec<InstanceId>,
    input: Option<DriverId>,
    output: bool,
}

/// The static topology of a circuit: instances, nets, and the connections between them.
///
/// A graph is immutable once built, and may be shared between any number of concurrent simulations.
#[derive(Debug, Clone)]
pub struct CircuitGraph {
    pub(crate) nets: IndexMap<String, NetData>,
    pub(crate) instances: IndexMap<String, InstanceData>,
    drivers: Vec<(Driver, NetId)>,
    storage: Vec<StorageCell>,
    inputs: Vec<NetId>,
    outputs: Vec<NetId>,
    cycles: Vec<Vec<InstanceId>>,
}

impl CircuitGraph {
    fn net(&self, net: NetId) -> &NetData {
        &self.nets[net.index()]
    }

    fn instance(&self, instance: InstanceId) -> &InstanceData {
        &self.instances[instance.index()]
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn nets(&self) -> impl Iterator<Item = NetId> + use<> {
        (0..self.nets.len()).map(NetId::from_index)
    }

    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + use<> {
        (0..self.instances.len()).map(InstanceId::from_index)
    }

    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.nets.get_index_of(name).map(NetId::from_index)
    }

    pub fn find_instance(&self, name: &str) -> Option<InstanceId> {
        self.instances.get_index_of(name).map(InstanceId::from_index)
    }

    pub fn net_name(&self, net: NetId) -> &str {
        self.nets.get_index(net.index()).map(|(name, _)| name.as_str()).unwrap()
    }

    pub fn instance_name(&self, instance: InstanceId) -> &str {
        self.instances.get_index(instance.index()).map(|(name, _)| name.as_str()).unwrap()
    }

    pub fn instance_kind(&self, instance: InstanceId) -> CellKind {
        self.instance(instance).kind
    }

    /// Nets bound to the input pins of `instance`, in [`CellKind::inputs`] order.
    pub fn instance_inputs(&self, instance: InstanceId) -> &[NetId] {
        &self.instance(instance).inputs
    }

    /// Drivers of the output pins of `instance`, in [`CellKind::outputs`] order.
    pub fn instance_outputs(&self, instance: InstanceId) -> &[DriverId] {
        &self.instance(instance).outputs
    }

    pub fn pin_net(&self, pin: PinRef) -> NetId {
        let data = self.instance(pin.instance);
        match data.inputs.get(pin.pin) {
            Some(&net) => net,
            None => self.driver_net(data.outputs[pin.pin - data.inputs.len()]),
        }
    }

    pub fn net_drivers(&self, net: NetId) -> &[DriverId] {
        &self.net(net).drivers
    }

    pub fn net_loads(&self, net: NetId) -> &[PinRef] {
        &self.net(net).loads
    }

    /// Instances with at least one input pin bound to `net`, each listed once.
    pub fn net_fanout(&self, net: NetId) -> &[InstanceId] {
        &self.net(net).fanout
    }

    pub fn is_dangling(&self, net: NetId) -> bool {
        self.net(net).drivers.is_empty()
    }

    pub fn driver(&self, driver: DriverId) -> Driver {
        self.drivers[driver.index()].0
    }

    pub fn driver_net(&self, driver: DriverId) -> NetId {
        self.drivers[driver.index()].1
    }

    pub fn inputs(&self) -> &[NetId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NetId] {
        &self.outputs
    }

    pub fn is_output(&self, net: NetId) -> bool {
        self.net(net).output
    }

    /// The driver through which stimulus reaches `net`, if it is a primary input.
    pub fn input_driver(&self, net: NetId) -> Option<DriverId> {
        self.net(net).input
    }

    /// Flip-flops and latches, indexed by storage slot.
    pub fn storage_cells(&self) -> &[StorageCell] {
        &self.storage
    }

    pub fn storage_slot(&self, instance: InstanceId) -> Option<usize> {
        self.instance(instance).storage
    }

    /// The combinational depth of `instance`: `1` for a gate fed only by primary inputs and storage cells.
    ///
    /// Storage cells have no level, nor do gates on or downstream of a combinational loop.
    pub fn level(&self, instance: InstanceId) -> Option<u32> {
        self.instance(instance).level
    }

    /// Sets of gates that feed each other without passing through a storage cell.
    pub fn combinational_cycles(&self) -> &[Vec<InstanceId>] {
        &self.cycles
    }
}

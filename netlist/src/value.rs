use std::fmt::{Debug, Display};

use crate::Trit;

/// Identifies a net (a wire) of a [`CircuitGraph`].
///
/// Nets are numbered densely in the order they were added to the [`CircuitBuilder`].
///
/// [`CircuitGraph`]: crate::CircuitGraph
/// [`CircuitBuilder`]: crate::CircuitBuilder
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetId {
    pub(crate) index: u32,
}

impl NetId {
    pub(crate) fn from_index(index: usize) -> NetId {
        assert!(index < u32::MAX as usize);
        NetId { index: index as u32 }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl Debug for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "NetId({})", self.index)
    }
}

impl Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "%{}", self.index)
    }
}

/// Identifies a placed cell of a [`CircuitGraph`].
///
/// [`CircuitGraph`]: crate::CircuitGraph
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId {
    pub(crate) index: u32,
}

impl InstanceId {
    pub(crate) fn from_index(index: usize) -> InstanceId {
        assert!(index < u32::MAX as usize);
        InstanceId { index: index as u32 }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl Debug for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "InstanceId({})", self.index)
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "@{}", self.index)
    }
}

/// Identifies a single source of value on a net: either an output pin of an instance, or the external
/// driver of a primary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverId {
    pub(crate) index: u32,
}

impl DriverId {
    pub(crate) fn from_index(index: usize) -> DriverId {
        assert!(index < u32::MAX as usize);
        DriverId { index: index as u32 }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// A pin of an instance, numbered in the order of [`CellKind::pins`]: inputs first, then outputs.
///
/// [`CellKind::pins`]: crate::CellKind::pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinRef {
    pub instance: InstanceId,
    pub pin: usize,
}

impl PinRef {
    pub fn new(instance: InstanceId, pin: usize) -> Self {
        PinRef { instance, pin }
    }
}

/// A control net is a [`NetId`] together with the level at which it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlNet {
    Pos(NetId),
    Neg(NetId),
}

impl ControlNet {
    pub fn from_net_invert(net: NetId, invert: bool) -> Self {
        match invert {
            false => ControlNet::Pos(net),
            true => ControlNet::Neg(net),
        }
    }

    pub fn net(self) -> NetId {
        match self {
            Self::Pos(net) => net,
            Self::Neg(net) => net,
        }
    }

    /// Converts the level `value` observed on the net into whether the control is asserted.
    pub fn active(self, value: Trit) -> Trit {
        match self {
            Self::Pos(_) => value,
            Self::Neg(_) => !value,
        }
    }
}

impl std::ops::Not for ControlNet {
    type Output = ControlNet;

    fn not(self) -> Self::Output {
        match self {
            ControlNet::Pos(net) => ControlNet::Neg(net),
            ControlNet::Neg(net) => ControlNet::Pos(net),
        }
    }
}

impl From<NetId> for ControlNet {
    fn from(net: NetId) -> Self {
        ControlNet::Pos(net)
    }
}

impl Display for ControlNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlNet::Pos(net) => write!(f, "{net}"),
            ControlNet::Neg(net) => write!(f, "!{net}"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{ControlNet, NetId, Trit};

    #[test]
    fn test_net_display() {
        assert_eq!(format!("{}", NetId::from_index(3)), "%3");
        assert_eq!(format!("{:?}", NetId::from_index(0)), "NetId(0)");
        assert_eq!(format!("{}", ControlNet::Neg(NetId::from_index(7))), "!%7");
    }

    #[test]
    fn test_control_active() {
        let net = NetId::from_index(0);
        assert_eq!(ControlNet::Pos(net).active(Trit::One), Trit::One);
        assert_eq!(ControlNet::Neg(net).active(Trit::Zero), Trit::One);
        assert_eq!(ControlNet::Neg(net).active(Trit::Undef), Trit::Undef);
        assert_eq!(!ControlNet::Pos(net), ControlNet::Neg(net));
        assert_eq!(ControlNet::from_net_invert(net, true), ControlNet::Neg(net));
    }
}

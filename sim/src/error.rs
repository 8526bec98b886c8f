use std::fmt::Display;

use gatesim_netlist::{InstanceId, NetId};

use crate::SignalChange;

/// A cell input that read a high-impedance value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvalidSite {
    pub instance: InstanceId,
    pub pin: &'static str,
}

impl Display for InvalidSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.instance, self.pin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepErrorKind {
    /// High-impedance values reached the listed inputs. The affected cells kept their previous
    /// outputs; the rest of the circuit settled normally.
    InvalidSignal(Vec<InvalidSite>),
    /// The delta budget was exhausted; the listed nets were still changing.
    NonConvergent { nets: Vec<NetId> },
    NotAnInput(NetId),
    TimeReversal { now: u64 },
}

/// Why a simulation step did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub time: u64,
    pub kind: StepErrorKind,
    /// Changes that were settled before the error was detected.
    pub changes: Vec<SignalChange>,
}

impl StepError {
    pub(crate) fn new(time: u64, kind: StepErrorKind) -> Self {
        StepError { time, kind, changes: Vec::new() }
    }

    /// Returns the nets to pass to [`Simulator::recover`] if the circuit failed to converge.
    ///
    /// [`Simulator::recover`]: crate::Simulator::recover
    pub fn oscillating_nets(&self) -> Option<&[NetId]> {
        match &self.kind {
            StepErrorKind::NonConvergent { nets } => Some(nets),
            _ => None,
        }
    }
}

impl Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}: ", self.time)?;
        match &self.kind {
            StepErrorKind::InvalidSignal(sites) => {
                write!(f, "high-impedance value on cell input")?;
                for (index, site) in sites.iter().enumerate() {
                    write!(f, "{}{site}", if index == 0 { " " } else { ", " })?;
                }
                Ok(())
            }
            StepErrorKind::NonConvergent { nets } => {
                write!(f, "circuit did not converge")?;
                for (index, net) in nets.iter().enumerate() {
                    write!(f, "{}{net}", if index == 0 { "; changing: " } else { ", " })?;
                }
                Ok(())
            }
            StepErrorKind::NotAnInput(net) => write!(f, "net {net} is not a primary input"),
            StepErrorKind::TimeReversal { now } => write!(f, "simulation time is already {now}"),
        }
    }
}

impl std::error::Error for StepError {}

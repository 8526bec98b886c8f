//! This library simulates a [`CircuitGraph`] at the functional level: cells have no propagation delay,
//! time advances only when stimuli are applied, and within one instant the circuit is settled by
//! repeated delta cycles.
//!
//! A [`Simulator`] borrows the graph and owns all mutable state of one run (net values, the
//! [`StateStore`] of flip-flops and latches, and pending work), so any number of independent runs can
//! share the same graph.
//!
//! [`CircuitGraph`]: gatesim_netlist::CircuitGraph

mod config;
mod state;
mod event;
mod error;
mod simulator;

pub use config::SimConfig;
pub use state::StateStore;
pub use event::{Stimulus, SignalChange, Diagnostic, UnknownNet};
pub use error::{StepError, StepErrorKind, InvalidSite};
pub use simulator::Simulator;

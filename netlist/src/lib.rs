//! This library provides the static model of a gate-level circuit built from a fixed standard-cell library.
//!
//! A [`CircuitGraph`] is a set of instances of [`CellKind`]s connected by named nets. It is assembled with a
//! [`CircuitBuilder`], which checks that every pin is bound exactly once, and is immutable afterwards.
//! Values on nets are [`LogicValue`]s; gates compute on [`Trit`]s, so a high-impedance value can never
//! silently enter a logic function.

mod logic;
mod value;
mod cell;
mod graph;
mod level;

pub use logic::{Trit, LogicValue, InvalidSignal, ParseLogicValueError};
pub use value::{NetId, InstanceId, DriverId, PinRef, ControlNet};
pub use cell::{CellKind, Outputs, InvalidInput, UnknownCellKind, Override, Sample, Storage, Trigger};
pub use graph::{CircuitBuilder, CircuitGraph, BuildError, BuildWarning, Driver, StorageCell};

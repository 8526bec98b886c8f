use std::fmt::Display;
use std::str::FromStr;

use crate::{LogicValue, Trit};

mod storage;

pub use storage::{Override, Sample, Storage, Trigger};

/// The fixed catalog of library cells.
///
/// Drive strength variants of a library cell (e.g. `NAND2_X1` and `NAND2_X4`) share a kind, since they
/// compute the same logic function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellKind {
    And2,
    Aoi21,
    Aoi22,
    Buf,
    ClkBuf,
    Inv,
    Nand2,
    Nand3,
    Nor2,
    Nor3,
    Oai21,
    Oai22,
    Or2,
    Xor2,
    Xnor2,
    /// Inverting 2:1 multiplexer: `Y = !(S ? A : B)`.
    Mux2,
    /// Inverting tri-state buffer: `Y = EN ? !A : Z`.
    TBuf,
    HalfAdder,
    FullAdder,
    DffPos,
    DffNeg,
    /// Rising edge flip-flop with asynchronous active-low preset (`S`) and clear (`R`).
    DffSr,
    /// Transparent latch, open while `CLK` is high.
    Latch,
}

/// Output values computed by [`CellKind::evaluate`]; one or two depending on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    values: [LogicValue; 2],
    len: usize,
}

impl Outputs {
    fn one(y: impl Into<LogicValue>) -> Self {
        Outputs { values: [y.into(), LogicValue::HighZ], len: 1 }
    }

    fn two(y0: impl Into<LogicValue>, y1: impl Into<LogicValue>) -> Self {
        Outputs { values: [y0.into(), y1.into()], len: 2 }
    }

    pub fn as_slice(&self) -> &[LogicValue] {
        &self.values[..self.len]
    }
}

impl std::ops::Deref for Outputs {
    type Target = [LogicValue];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

/// A high-impedance value reached an input of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidInput {
    pub kind: CellKind,
    pub pin: &'static str,
}

impl Display for InvalidInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "high-impedance value on input {} of {}", self.pin, self.kind)
    }
}

impl std::error::Error for InvalidInput {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCellKind(pub String);

impl Display for UnknownCellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown cell kind {:?}", self.0)
    }
}

impl std::error::Error for UnknownCellKind {}

impl CellKind {
    pub const ALL: [CellKind; 23] = [
        CellKind::And2,
        CellKind::Aoi21,
        CellKind::Aoi22,
        CellKind::Buf,
        CellKind::ClkBuf,
        CellKind::Inv,
        CellKind::Nand2,
        CellKind::Nand3,
        CellKind::Nor2,
        CellKind::Nor3,
        CellKind::Oai21,
        CellKind::Oai22,
        CellKind::Or2,
        CellKind::Xor2,
        CellKind::Xnor2,
        CellKind::Mux2,
        CellKind::TBuf,
        CellKind::HalfAdder,
        CellKind::FullAdder,
        CellKind::DffPos,
        CellKind::DffNeg,
        CellKind::DffSr,
        CellKind::Latch,
    ];

    /// The library name of the cell, without a drive strength suffix.
    pub fn name(self) -> &'static str {
        match self {
            CellKind::And2 => "AND2",
            CellKind::Aoi21 => "AOI21",
            CellKind::Aoi22 => "AOI22",
            CellKind::Buf => "BUF",
            CellKind::ClkBuf => "CLKBUF",
            CellKind::Inv => "INV",
            CellKind::Nand2 => "NAND2",
            CellKind::Nand3 => "NAND3",
            CellKind::Nor2 => "NOR2",
            CellKind::Nor3 => "NOR3",
            CellKind::Oai21 => "OAI21",
            CellKind::Oai22 => "OAI22",
            CellKind::Or2 => "OR2",
            CellKind::Xor2 => "XOR2",
            CellKind::Xnor2 => "XNOR2",
            CellKind::Mux2 => "MUX2",
            CellKind::TBuf => "TBUF",
            CellKind::HalfAdder => "HA",
            CellKind::FullAdder => "FA",
            CellKind::DffPos => "DFF_POS",
            CellKind::DffNeg => "DFF_NEG",
            CellKind::DffSr => "DFF_SR",
            CellKind::Latch => "LATCH",
        }
    }

    /// Looks up a library cell name such as `nand2_x4`, ignoring case and any drive strength suffix.
    pub fn from_library_name(name: &str) -> Result<CellKind, UnknownCellKind> {
        let upper = name.to_ascii_uppercase();
        let base = match upper.rsplit_once("_X") {
            Some((base, strength)) if !strength.is_empty() && strength.bytes().all(|b| b.is_ascii_digit()) => base,
            _ => &upper[..],
        };
        CellKind::ALL.into_iter().find(|kind| kind.name() == base).ok_or_else(|| UnknownCellKind(name.to_owned()))
    }

    pub fn inputs(self) -> &'static [&'static str] {
        match self {
            CellKind::Buf | CellKind::ClkBuf | CellKind::Inv => &["A"],
            CellKind::And2
            | CellKind::Nand2
            | CellKind::Nor2
            | CellKind::Or2
            | CellKind::Xor2
            | CellKind::Xnor2
            | CellKind::HalfAdder => &["A", "B"],
            CellKind::Nand3 | CellKind::Nor3 | CellKind::Aoi21 | CellKind::Oai21 | CellKind::FullAdder => {
                &["A", "B", "C"]
            }
            CellKind::Aoi22 | CellKind::Oai22 => &["A", "B", "C", "D"],
            CellKind::Mux2 => &["A", "B", "S"],
            CellKind::TBuf => &["A", "EN"],
            CellKind::DffPos | CellKind::DffNeg | CellKind::Latch => &["D", "CLK"],
            CellKind::DffSr => &["D", "CLK", "S", "R"],
        }
    }

    pub fn outputs(self) -> &'static [&'static str] {
        match self {
            CellKind::HalfAdder | CellKind::FullAdder => &["YS", "YC"],
            CellKind::DffPos | CellKind::DffNeg | CellKind::DffSr | CellKind::Latch => &["Q", "QN"],
            _ => &["Y"],
        }
    }

    /// All pins of the cell: inputs first, then outputs. A [`PinRef`] indexes into this sequence.
    ///
    /// [`PinRef`]: crate::PinRef
    pub fn pins(self) -> impl Iterator<Item = &'static str> {
        self.inputs().iter().chain(self.outputs()).copied()
    }

    pub fn pin_count(self) -> usize {
        self.inputs().len() + self.outputs().len()
    }

    pub fn pin_index(self, name: &str) -> Option<usize> {
        self.pins().position(|pin| pin.eq_ignore_ascii_case(name))
    }

    pub fn is_output(self, pin: usize) -> bool {
        pin >= self.inputs().len() && pin < self.pin_count()
    }

    pub fn is_sequential(self) -> bool {
        self.trigger().is_some()
    }

    pub fn trigger(self) -> Option<Trigger> {
        match self {
            CellKind::DffPos | CellKind::DffNeg | CellKind::DffSr => Some(Trigger::Edge),
            CellKind::Latch => Some(Trigger::Level),
            _ => None,
        }
    }

    /// Computes the outputs of a combinational cell from the values on its inputs, in [`inputs`] order.
    ///
    /// Panics if called on a sequential cell or with the wrong number of inputs; these are handled by
    /// the graph builder.
    ///
    /// [`inputs`]: CellKind::inputs
    pub fn evaluate(self, inputs: &[LogicValue]) -> Result<Outputs, InvalidInput> {
        let pins = self.inputs();
        assert_eq!(inputs.len(), pins.len(), "wrong number of inputs for {self}");
        let mut trits = [Trit::Undef; 4];
        for ((trit, &value), &pin) in trits.iter_mut().zip(inputs).zip(pins) {
            *trit = value.as_trit().map_err(|_| InvalidInput { kind: self, pin })?;
        }
        let [a, b, c, d] = trits;
        Ok(match self {
            CellKind::And2 => Outputs::one(a & b),
            CellKind::Aoi21 => Outputs::one(!((a & b) | c)),
            CellKind::Aoi22 => Outputs::one(!((c & d) | (a & b))),
            CellKind::Buf | CellKind::ClkBuf => Outputs::one(a),
            CellKind::Inv => Outputs::one(!a),
            CellKind::Nand2 => Outputs::one(!(a & b)),
            CellKind::Nand3 => Outputs::one(!(a & b & c)),
            CellKind::Nor2 => Outputs::one(!(a | b)),
            CellKind::Nor3 => Outputs::one(!(a | b | c)),
            CellKind::Oai21 => Outputs::one(!((a | b) & c)),
            CellKind::Oai22 => Outputs::one(!((c | d) & (a | b))),
            CellKind::Or2 => Outputs::one(a | b),
            CellKind::Xor2 => Outputs::one(a ^ b),
            CellKind::Xnor2 => Outputs::one(!(a ^ b)),
            CellKind::Mux2 => {
                let s = c;
                let selected = match s {
                    Trit::One => a,
                    Trit::Zero => b,
                    Trit::Undef => a.merge(b),
                };
                Outputs::one(!selected)
            }
            CellKind::TBuf => {
                let en = b;
                match en {
                    Trit::One => Outputs::one(!a),
                    Trit::Zero => Outputs::one(LogicValue::HighZ),
                    Trit::Undef => Outputs::one(LogicValue::Unknown),
                }
            }
            CellKind::HalfAdder => Outputs::two(a ^ b, a & b),
            CellKind::FullAdder => Outputs::two(a ^ b ^ c, (a & b) | (b & c) | (c & a)),
            CellKind::DffPos | CellKind::DffNeg | CellKind::DffSr | CellKind::Latch => {
                panic!("{self} is a sequential cell")
            }
        })
    }
}

impl Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CellKind {
    type Err = UnknownCellKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellKind::from_library_name(s)
    }
}

use std::fmt::Display;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::str::FromStr;

/// A three-valued logic level, used as the operand of every gate function.
///
/// `Undef` is absorbing except where the result is forced by the other operand, e.g. `0 & X` is `0`
/// and `1 | X` is `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trit {
    Undef = -1,
    Zero = 0,
    One = 1,
}

impl Trit {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Trit::Undef => None,
            Trit::Zero => Some(false),
            Trit::One => Some(true),
        }
    }

    /// Returns `self` if both operands agree, and `Undef` otherwise.
    pub fn merge(self, other: Trit) -> Trit {
        if self == other { self } else { Trit::Undef }
    }
}

impl From<bool> for Trit {
    fn from(value: bool) -> Self {
        match value {
            false => Trit::Zero,
            true => Trit::One,
        }
    }
}

impl Not for Trit {
    type Output = Trit;

    fn not(self) -> Self::Output {
        match self {
            Trit::Undef => Trit::Undef,
            Trit::Zero => Trit::One,
            Trit::One => Trit::Zero,
        }
    }
}

impl BitAnd for Trit {
    type Output = Trit;

    fn bitand(self, rhs: Trit) -> Self::Output {
        match (self, rhs) {
            (Trit::Zero, _) | (_, Trit::Zero) => Trit::Zero,
            (Trit::One, Trit::One) => Trit::One,
            _ => Trit::Undef,
        }
    }
}

impl BitOr for Trit {
    type Output = Trit;

    fn bitor(self, rhs: Trit) -> Self::Output {
        match (self, rhs) {
            (Trit::One, _) | (_, Trit::One) => Trit::One,
            (Trit::Zero, Trit::Zero) => Trit::Zero,
            _ => Trit::Undef,
        }
    }
}

impl BitXor for Trit {
    type Output = Trit;

    fn bitxor(self, rhs: Trit) -> Self::Output {
        match (self.as_bool(), rhs.as_bool()) {
            (Some(lhs), Some(rhs)) => Trit::from(lhs ^ rhs),
            _ => Trit::Undef,
        }
    }
}

impl Display for Trit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&LogicValue::from(*self), f)
    }
}

/// The value carried by a net: a logic level, or the absence of any driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogicValue {
    Zero,
    One,
    #[default]
    Unknown,
    HighZ,
}

/// A high-impedance value was used where a logic level is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSignal;

impl Display for InvalidSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "high-impedance value used as a logic operand")
    }
}

impl std::error::Error for InvalidSignal {}

impl LogicValue {
    pub fn is_high_z(self) -> bool {
        self == LogicValue::HighZ
    }

    pub fn is_known(self) -> bool {
        matches!(self, LogicValue::Zero | LogicValue::One)
    }

    pub fn as_trit(self) -> Result<Trit, InvalidSignal> {
        Trit::try_from(self)
    }

    /// Resolves the values presented by every driver of a net into the value of the net.
    ///
    /// Drivers presenting `HighZ` do not participate. With no participating drivers the net is `HighZ`;
    /// if every participating driver agrees the net takes that value, and otherwise it is `Unknown`.
    pub fn resolve(values: impl IntoIterator<Item = LogicValue>) -> LogicValue {
        Self::resolve_bus(values).0
    }

    /// Like [`LogicValue::resolve`], but also reports whether two drivers fought with opposite levels.
    pub fn resolve_bus(values: impl IntoIterator<Item = LogicValue>) -> (LogicValue, bool) {
        let mut resolved = LogicValue::HighZ;
        let (mut seen_zero, mut seen_one) = (false, false);
        for value in values {
            match value {
                LogicValue::HighZ => continue,
                LogicValue::Zero => seen_zero = true,
                LogicValue::One => seen_one = true,
                LogicValue::Unknown => (),
            }
            resolved = match resolved {
                LogicValue::HighZ => value,
                _ if resolved == value => resolved,
                _ => LogicValue::Unknown,
            };
        }
        (resolved, seen_zero && seen_one)
    }

    pub fn try_and(self, other: LogicValue) -> Result<LogicValue, InvalidSignal> {
        Ok((self.as_trit()? & other.as_trit()?).into())
    }

    pub fn try_or(self, other: LogicValue) -> Result<LogicValue, InvalidSignal> {
        Ok((self.as_trit()? | other.as_trit()?).into())
    }

    pub fn try_xor(self, other: LogicValue) -> Result<LogicValue, InvalidSignal> {
        Ok((self.as_trit()? ^ other.as_trit()?).into())
    }

    pub fn try_not(self) -> Result<LogicValue, InvalidSignal> {
        Ok((!self.as_trit()?).into())
    }

    pub fn from_char(chr: char) -> Option<LogicValue> {
        match chr {
            '0' => Some(LogicValue::Zero),
            '1' => Some(LogicValue::One),
            'X' | 'x' => Some(LogicValue::Unknown),
            'Z' | 'z' => Some(LogicValue::HighZ),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            LogicValue::Zero => '0',
            LogicValue::One => '1',
            LogicValue::Unknown => 'X',
            LogicValue::HighZ => 'Z',
        }
    }
}

impl From<Trit> for LogicValue {
    fn from(trit: Trit) -> Self {
        match trit {
            Trit::Undef => LogicValue::Unknown,
            Trit::Zero => LogicValue::Zero,
            Trit::One => LogicValue::One,
        }
    }
}

impl From<bool> for LogicValue {
    fn from(value: bool) -> Self {
        Trit::from(value).into()
    }
}

impl TryFrom<LogicValue> for Trit {
    type Error = InvalidSignal;

    fn try_from(value: LogicValue) -> Result<Self, Self::Error> {
        match value {
            LogicValue::Zero => Ok(Trit::Zero),
            LogicValue::One => Ok(Trit::One),
            LogicValue::Unknown => Ok(Trit::Undef),
            LogicValue::HighZ => Err(InvalidSignal),
        }
    }
}

impl Display for LogicValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLogicValueError(String);

impl Display for ParseLogicValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid logic value {:?}", self.0)
    }
}

impl std::error::Error for ParseLogicValueError {}

impl FromStr for LogicValue {
    type Err = ParseLogicValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next().and_then(LogicValue::from_char), chars.next()) {
            (Some(value), None) => Ok(value),
            _ => Err(ParseLogicValueError(s.to_owned())),
        }
    }
}

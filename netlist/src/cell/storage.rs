use crate::Trit;

/// What causes a storage cell to load its data input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The cell loads `D` when its (active-high) clock goes from `0` or `X` to `1`.
    Edge,
    /// The cell loads `D` continuously while its clock is `1`.
    Level,
}

/// The asynchronous override currently forcing a set/reset flip-flop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Override {
    #[default]
    None,
    Preset,
    Clear,
    /// Preset and clear are asserted at the same time; the output is undefined.
    Illegal,
}

/// Control and data inputs of a storage cell, sampled at one instant.
///
/// `clock`, `preset` and `clear` are *activity* levels, i.e. already corrected for the polarity of the
/// pin; a flip-flop without preset or clear samples them as `Zero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sample {
    pub data: Trit,
    pub clock: Trit,
    pub preset: Trit,
    pub clear: Trit,
}

impl Sample {
    pub fn new(data: Trit, clock: Trit) -> Self {
        Sample { data, clock, preset: Trit::Zero, clear: Trit::Zero }
    }

    pub fn with_preset(self, preset: Trit) -> Self {
        Self { preset, ..self }
    }

    pub fn with_clear(self, clear: Trit) -> Self {
        Self { clear, ..self }
    }
}

/// The state of a flip-flop or latch.
///
/// The output is determined by the following rules:
///
/// - at the beginning of time, the output is `X`
/// - for [`Trigger::Edge`], whenever the clock goes from `0` or `X` to `1`, the output is set to `data`
/// - for [`Trigger::Level`], whenever the clock is `1`, the output is set to `data`
/// - whenever `preset` is active, the output is set to `1`; whenever `clear` is active, it is set to `0`;
///   if both are active, it is set to `X`
/// - otherwise, the output value is unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Storage {
    pub q: Trit,
    /// The clock activity level seen at the previous sample.
    pub clock: Trit,
    pub forced: Override,
}

impl Storage {
    pub const INIT: Storage = Storage { q: Trit::Undef, clock: Trit::Undef, forced: Override::None };

    pub fn qn(&self) -> Trit {
        !self.q
    }

    /// Computes the state after observing `sample`.
    pub fn next(self, trigger: Trigger, sample: Sample) -> Storage {
        let loaded = match trigger {
            Trigger::Edge if self.clock != Trit::One && sample.clock == Trit::One => sample.data,
            Trigger::Edge => self.q,
            Trigger::Level => match sample.clock {
                Trit::One => sample.data,
                Trit::Zero => self.q,
                Trit::Undef => self.q.merge(sample.data),
            },
        };
        let (q, forced) = match (sample.preset, sample.clear) {
            (Trit::Zero, Trit::Zero) => (loaded, Override::None),
            (Trit::One, Trit::Zero) => (Trit::One, Override::Preset),
            (Trit::Zero, Trit::One) => (Trit::Zero, Override::Clear),
            (Trit::One, Trit::One) => (Trit::Undef, Override::Illegal),
            // an override that may or may not be asserted leaves the output defined only if it agrees
            (Trit::Undef, Trit::Zero) => (loaded.merge(Trit::One), Override::None),
            (Trit::Zero, Trit::Undef) => (loaded.merge(Trit::Zero), Override::None),
            (Trit::One, Trit::Undef) => (Trit::Undef, Override::Preset),
            (Trit::Undef, Trit::One) => (Trit::Undef, Override::Clear),
            (Trit::Undef, Trit::Undef) => (Trit::Undef, Override::None),
        };
        Storage { q, clock: sample.clock, forced }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Storage::INIT
    }
}

#[cfg(test)]
mod test {
    use super::{Override, Sample, Storage, Trigger};
    use crate::Trit;

    fn run(trigger: Trigger, samples: &[Sample]) -> Vec<Trit> {
        let mut state = Storage::INIT;
        let mut result = Vec::new();
        for &sample in samples {
            state = state.next(trigger, sample);
            result.push(state.q);
        }
        result
    }

    #[test]
    fn test_rising_edge() {
        use Trit::*;
        let samples =
            [Sample::new(One, Zero), Sample::new(One, One), Sample::new(Zero, One), Sample::new(Zero, Zero)];
        assert_eq!(run(Trigger::Edge, &samples), vec![Undef, One, One, One]);
    }

    #[test]
    fn test_edge_from_undef_clock() {
        use Trit::*;
        assert_eq!(run(Trigger::Edge, &[Sample::new(Zero, One)]), vec![Zero]);
        assert_eq!(run(Trigger::Edge, &[Sample::new(Zero, Undef), Sample::new(One, One)]), vec![Undef, One]);
    }

    #[test]
    fn test_level() {
        use Trit::*;
        let samples = [
            Sample::new(Zero, One),
            Sample::new(One, One),
            Sample::new(Zero, One),
            Sample::new(One, Zero),
            Sample::new(One, Undef),
        ];
        assert_eq!(run(Trigger::Level, &samples), vec![Zero, One, Zero, Zero, Undef]);
    }

    #[test]
    fn test_overrides() {
        use Trit::*;
        let state = Storage::INIT.next(Trigger::Edge, Sample::new(One, One).with_clear(One));
        assert_eq!((state.q, state.qn(), state.forced), (Zero, One, Override::Clear));
        let state = state.next(Trigger::Edge, Sample::new(Zero, Zero).with_preset(One));
        assert_eq!((state.q, state.forced), (One, Override::Preset));
        let state = state.next(Trigger::Edge, Sample::new(Zero, Zero).with_preset(One).with_clear(One));
        assert_eq!((state.q, state.qn(), state.forced), (Undef, Undef, Override::Illegal));
        let state = state.next(Trigger::Edge, Sample::new(One, One));
        assert_eq!((state.q, state.forced), (One, Override::None));
    }

    #[test]
    fn test_override_blocks_capture() {
        use Trit::*;
        let state = Storage::INIT.next(Trigger::Edge, Sample::new(One, Zero).with_clear(One));
        let state = state.next(Trigger::Edge, Sample::new(One, One).with_clear(One));
        assert_eq!(state.q, Zero);
        // the edge was consumed while clear was held
        let state = state.next(Trigger::Edge, Sample::new(One, One));
        assert_eq!(state.q, Zero);
    }

    #[test]
    fn test_undef_override() {
        use Trit::*;
        let one = Storage { q: One, clock: Zero, forced: Override::None };
        assert_eq!(one.next(Trigger::Edge, Sample::new(One, Zero).with_preset(Undef)).q, One);
        assert_eq!(one.next(Trigger::Edge, Sample::new(One, Zero).with_clear(Undef)).q, Undef);
    }
}

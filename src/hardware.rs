//! Adapter for pulse-counter peripherals with hardware quadrature decode.
//!
//! [`HardwareCounterAdapter`] wraps one [`PulseCounter`] channel. The
//! peripheral counts every decoded edge, so raw counts are divided by the
//! decode mode's counts-per-detent before they reach the caller.

use core::num::NonZeroI32;

use crate::adapter::{EncoderAdapter, PinId};
use crate::backend::PulseCounter;
use crate::config::HardwareCounterConfig;
use crate::error::EncoderError;
use crate::pulls::WeakPulls;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Active,
}

/// Encoder adapter backed by a hardware pulse-counter channel.
///
/// The backend handle is owned from construction; the counting unit is only
/// claimed in [`begin`](EncoderAdapter::begin). Dropping the adapter detaches
/// the unit so another adapter can claim it.
///
/// Positions are `raw / divisor` truncated toward zero, so raw counts
/// `-5, -4, -3, 3, 4, 5` read as `-1, -1, 0, 0, 1, 1` in full-quadrature
/// mode.
///
/// # Example
///
/// ```no_run
/// use encoder_adapter::{
///     EncoderAdapter, EncoderError, HardwareCounterAdapter, PinId, PullMode, PulseCounter, WeakPulls,
/// };
///
/// fn rezero<C: PulseCounter>(channel: C) -> Result<(), EncoderError<C::Error>> {
///     let pulls = WeakPulls::configure(PullMode::Up).expect("pull mode set twice");
///     let mut knob = HardwareCounterAdapter::new(channel, PinId(4), PinId(5), pulls);
///     knob.begin()?;
///     knob.set_position(-2)?;
///     assert_eq!(knob.raw_count()?, -8);
///     Ok(())
/// }
/// ```
pub struct HardwareCounterAdapter<C: PulseCounter> {
    counter: C,
    pin_a: PinId,
    pin_b: PinId,
    pulls: WeakPulls,
    config: HardwareCounterConfig,
    divisor: NonZeroI32,
    state: State,
}

impl<C> HardwareCounterAdapter<C>
where
    C: PulseCounter,
{
    /// Create an adapter with full-quadrature decode and the maximum filter.
    ///
    /// # Arguments
    /// * `counter` — peripheral channel handle (takes ownership)
    /// * `pin_a`, `pin_b` — the two quadrature signal lines
    /// * `pulls` — token for the process-wide weak pull mode
    pub fn new(counter: C, pin_a: PinId, pin_b: PinId, pulls: WeakPulls) -> Self {
        Self::with_config(counter, pin_a, pin_b, pulls, HardwareCounterConfig::default())
    }

    /// Create an adapter with an explicit decode mode and filter.
    pub fn with_config(
        counter: C,
        pin_a: PinId,
        pin_b: PinId,
        pulls: WeakPulls,
        config: HardwareCounterConfig,
    ) -> Self {
        Self {
            counter,
            pin_a,
            pin_b,
            pulls,
            config,
            divisor: config.decode_mode.counts_per_detent(),
            state: State::Uninitialized,
        }
    }

    /// The `(A, B)` pin pair.
    pub fn pins(&self) -> (PinId, PinId) {
        (self.pin_a, self.pin_b)
    }

    /// Raw counts per logical detent.
    pub fn count_divisor(&self) -> NonZeroI32 {
        self.divisor
    }

    /// Settings applied in `begin()`.
    pub fn config(&self) -> HardwareCounterConfig {
        self.config
    }

    /// Unscaled peripheral count.
    pub fn raw_count(&self) -> Result<i32, EncoderError<C::Error>> {
        self.ensure_active()?;
        Ok(self.counter.count())
    }

    // Pull mode must be written before attach.
    fn start(&mut self) -> Result<(), EncoderError<C::Error>> {
        if self.pin_a == self.pin_b {
            return Err(EncoderError::InvalidPins);
        }

        self.counter.set_weak_pulls(self.pulls.mode());
        self.counter.attach(self.pin_a, self.pin_b, self.config.decode_mode)?;

        let threshold = self.config.filter.resolve(C::MAX_FILTER);
        if let Err(e) = self.counter.set_filter(threshold) {
            // Give the unit back so a retry (or another adapter) can claim it.
            self.counter.detach();
            return Err(EncoderError::Backend(e));
        }

        self.counter.set_count(0);
        self.state = State::Active;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), EncoderError<C::Error>> {
        match self.state {
            State::Active => Ok(()),
            State::Uninitialized => Err(EncoderError::NotStarted),
        }
    }
}

impl<C> EncoderAdapter for HardwareCounterAdapter<C>
where
    C: PulseCounter,
{
    type Error = EncoderError<C::Error>;

    fn begin(&mut self) -> Result<(), Self::Error> {
        if self.state == State::Active {
            return Err(EncoderError::AlreadyStarted);
        }

        let result = self.start();

        #[cfg(feature = "defmt")]
        match &result {
            Ok(()) => defmt::debug!(
                "pcnt encoder on {}/{} started ({}, filter {})",
                self.pin_a,
                self.pin_b,
                self.config.decode_mode,
                self.config.filter.resolve(C::MAX_FILTER)
            ),
            Err(_) => defmt::warn!("pcnt encoder on {}/{} failed to start", self.pin_a, self.pin_b),
        }

        result
    }

    fn position(&self) -> Result<i32, Self::Error> {
        self.ensure_active()?;
        // Integer division truncates toward zero for negative counts too.
        Ok(self.counter.count() / self.divisor.get())
    }

    fn set_position(&mut self, pos: i32) -> Result<(), Self::Error> {
        self.ensure_active()?;
        let raw = pos
            .checked_mul(self.divisor.get())
            .ok_or(EncoderError::PositionOutOfRange)?;
        self.counter.set_count(raw);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.state == State::Active
    }
}

impl<C> Drop for HardwareCounterAdapter<C>
where
    C: PulseCounter,
{
    fn drop(&mut self) {
        if self.state == State::Active {
            self.counter.detach();
        }
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::backend::{DecodeMode, PullMode};
    use crate::config::FilterThreshold;
    use crate::mock::{MockPcntError, MockPulseUnit};

    const PIN_A: PinId = PinId(4);
    const PIN_B: PinId = PinId(5);

    fn pulls() -> WeakPulls {
        WeakPulls::configure(PullMode::Up).unwrap()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    #[test]
    fn begin_attaches_in_full_quad_with_max_filter() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());

        assert!(!enc.is_started());
        assert_eq!(enc.begin(), Ok(()));
        assert!(enc.is_started());

        assert_eq!(unit.claimed(), 1);
        assert_eq!(unit.decode_mode(PIN_A), Some(DecodeMode::Full));
        assert_eq!(unit.filter(PIN_A), Some(1023));
        assert_eq!(unit.pulls(), Some(PullMode::Up));
        assert_eq!(unit.raw(PIN_A), Some(0));
    }

    #[test]
    fn begin_zeroes_stale_count() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();
        unit.set_raw(PIN_A, 40);
        drop(enc);

        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();
        assert_eq!(enc.position(), Ok(0));
    }

    #[test]
    fn begin_twice_is_rejected() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();
        assert_eq!(enc.begin(), Err(EncoderError::AlreadyStarted));
        assert_eq!(unit.claimed(), 1);
    }

    #[test]
    fn duplicate_pins_fail_begin() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_A, pulls());
        assert_eq!(enc.begin(), Err(EncoderError::InvalidPins));
        assert!(!enc.is_started());
        assert_eq!(unit.claimed(), 0);
    }

    #[test]
    fn position_before_begin_is_reported() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        assert_eq!(enc.position(), Err(EncoderError::NotStarted));
        assert_eq!(enc.set_position(3), Err(EncoderError::NotStarted));
        assert_eq!(enc.raw_count(), Err(EncoderError::NotStarted));
    }

    #[test]
    fn channel_exhaustion_fails_begin_and_recovers_after_drop() {
        let unit = MockPulseUnit::<2>::new();
        let mut first = HardwareCounterAdapter::new(unit.channel(), PinId(1), PinId(2), pulls());
        let mut second = HardwareCounterAdapter::new(unit.channel(), PinId(3), PinId(4), pulls());
        let mut third = HardwareCounterAdapter::new(unit.channel(), PinId(5), PinId(6), pulls());

        first.begin().unwrap();
        second.begin().unwrap();
        assert_eq!(third.begin(), Err(EncoderError::Backend(MockPcntError::NoFreeUnit)));
        assert!(!third.is_started());

        drop(first);
        assert_eq!(unit.claimed(), 1);
        assert_eq!(third.begin(), Ok(()));
        assert_eq!(unit.claimed(), 2);
    }

    #[test]
    fn drop_without_begin_releases_nothing_and_leaks_nothing() {
        let unit = MockPulseUnit::<2>::new();
        for _ in 0..5 {
            let enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
            drop(enc);
        }
        assert_eq!(unit.claimed(), 0);

        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        assert_eq!(enc.begin(), Ok(()));
    }

    #[test]
    fn repeated_construct_begin_drop_cycles_reuse_channel() {
        let unit = MockPulseUnit::<2>::new();
        for _ in 0..10 {
            let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
            enc.begin().unwrap();
            assert_eq!(unit.claimed(), 1);
        }
        assert_eq!(unit.claimed(), 0);
    }

    /// Records the order of peripheral calls made by the adapter.
    struct RecordingCounter<'a> {
        log: &'a RefCell<Vec<&'static str>>,
        attached: bool,
    }

    impl PulseCounter for RecordingCounter<'_> {
        type Error = ();

        const MAX_FILTER: u16 = 1023;

        fn attach(&mut self, _: PinId, _: PinId, _: DecodeMode) -> Result<(), Self::Error> {
            self.log.borrow_mut().push("attach");
            self.attached = true;
            Ok(())
        }

        fn detach(&mut self) {
            if self.attached {
                self.log.borrow_mut().push("detach");
                self.attached = false;
            }
        }

        fn set_weak_pulls(&mut self, _: PullMode) {
            self.log.borrow_mut().push("pulls");
        }

        fn set_filter(&mut self, _: u16) -> Result<(), Self::Error> {
            self.log.borrow_mut().push("filter");
            Ok(())
        }

        fn count(&self) -> i32 {
            0
        }

        fn set_count(&mut self, _: i32) {
            self.log.borrow_mut().push("count");
        }
    }

    #[test]
    fn begin_configures_pulls_before_attach() {
        let log = RefCell::new(Vec::new());
        let counter = RecordingCounter { log: &log, attached: false };
        let mut enc = HardwareCounterAdapter::new(counter, PIN_A, PIN_B, pulls());
        enc.begin().unwrap();
        assert_eq!(*log.borrow(), ["pulls", "attach", "filter", "count"]);

        drop(enc);
        assert_eq!(log.borrow().last(), Some(&"detach"));
    }

    // ── Scaling ──────────────────────────────────────────────────────

    #[test]
    fn raw_counts_truncate_toward_zero() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();

        let cases = [(-5, -1), (-4, -1), (-3, 0), (3, 0), (4, 1), (5, 1)];
        for (raw, expected) in cases {
            unit.set_raw(PIN_A, raw);
            assert_eq!(enc.position(), Ok(expected), "raw count {}", raw);
        }
    }

    #[test]
    fn set_position_round_trips() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();

        for p in [0, 1, -1, 7, -250, i32::MAX / 4, i32::MIN / 4] {
            enc.set_position(p).unwrap();
            assert_eq!(enc.position(), Ok(p));
            assert_eq!(enc.raw_count(), Ok(p * 4));
        }
    }

    #[test]
    fn set_position_rejects_overflowing_raw_count() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();
        enc.set_position(9).unwrap();

        assert_eq!(enc.set_position(i32::MAX), Err(EncoderError::PositionOutOfRange));
        assert_eq!(enc.set_position(i32::MIN / 4 - 1), Err(EncoderError::PositionOutOfRange));
        // Rejected writes leave the count untouched.
        assert_eq!(enc.position(), Ok(9));
    }

    #[test]
    fn reset_rezeroes_from_any_state() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();

        for raw in [-13, 0, 2, 999] {
            unit.set_raw(PIN_A, raw);
            enc.reset().unwrap();
            assert_eq!(enc.position(), Ok(0));
        }
    }

    #[test]
    fn forward_and_reverse_detents_are_monotonic() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PIN_A, PIN_B, pulls());
        enc.begin().unwrap();

        let mut last = enc.position().unwrap();
        for _ in 0..25 {
            unit.step(PIN_A, 4);
            let now = enc.position().unwrap();
            assert_eq!(now, last + 1);
            last = now;
        }
        for _ in 0..40 {
            unit.step(PIN_A, -4);
            let now = enc.position().unwrap();
            assert_eq!(now, last - 1);
            last = now;
        }
        assert_eq!(last, -15);
    }

    #[test]
    fn half_quad_config_divides_by_two() {
        let unit = MockPulseUnit::<2>::new();
        let config = HardwareCounterConfig {
            decode_mode: DecodeMode::Half,
            filter: FilterThreshold::Value(200),
        };
        let mut enc = HardwareCounterAdapter::with_config(unit.channel(), PIN_A, PIN_B, pulls(), config);
        enc.begin().unwrap();

        assert_eq!(enc.count_divisor().get(), 2);
        assert_eq!(unit.filter(PIN_A), Some(200));
        unit.set_raw(PIN_A, -7);
        assert_eq!(enc.position(), Ok(-3));
    }

    // ── End-to-end ───────────────────────────────────────────────────

    #[test]
    fn end_to_end_pins_4_5() {
        let unit = MockPulseUnit::<2>::new();
        let mut enc = HardwareCounterAdapter::new(unit.channel(), PinId(4), PinId(5), pulls());
        assert_eq!(enc.begin(), Ok(()));

        // Three detents, each four full-quadrature edges.
        for _ in 0..12 {
            unit.step(PinId(4), 1);
        }
        assert_eq!(enc.raw_count(), Ok(12));
        assert_eq!(enc.position(), Ok(3));

        enc.set_position(-2).unwrap();
        assert_eq!(enc.position(), Ok(-2));
        assert_eq!(enc.raw_count(), Ok(-8));
        assert_eq!(unit.raw(PinId(4)), Some(-8));
    }
}

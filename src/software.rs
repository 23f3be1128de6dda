//! Adapter for interrupt-driven software quadrature decoders.
//!
//! The decoder starts consuming pin interrupts as soon as it is
//! constructed and cannot be detached, so [`SoftwareDecoderAdapter`] holds a
//! one-shot [`DecoderBuilder`] until [`begin`](EncoderAdapter::begin) and
//! only then builds the decoder.

use core::mem;
use core::num::NonZeroI32;

use crate::adapter::{EncoderAdapter, PinId};
use crate::backend::{DecoderBuilder, QuadratureDecoder};
use crate::error::EncoderError;

const COUNT_DIVISOR: NonZeroI32 = match NonZeroI32::new(1) {
    Some(n) => n,
    None => unreachable!(),
};

enum Lifecycle<B: DecoderBuilder> {
    /// Builder not yet used; no interrupts registered.
    Uninitialized(B),
    /// Decoder live and counting.
    Active(B::Decoder),
    /// The builder was consumed by a failed `begin()`.
    Spent,
}

/// Encoder adapter backed by an interrupt-driven decoder.
///
/// The decoder already reports one count per detent, so positions pass
/// through unscaled. Reads and writes go straight to the decoder's guarded
/// count without an intermediate copy.
pub struct SoftwareDecoderAdapter<B: DecoderBuilder> {
    pin_a: PinId,
    pin_b: PinId,
    state: Lifecycle<B>,
}

impl<B> SoftwareDecoderAdapter<B>
where
    B: DecoderBuilder,
{
    /// Create an adapter; the decoder is not built until `begin()`.
    ///
    /// # Arguments
    /// * `builder` — one-shot decoder constructor (takes ownership)
    /// * `pin_a`, `pin_b` — the two quadrature signal lines
    pub fn new(builder: B, pin_a: PinId, pin_b: PinId) -> Self {
        Self {
            pin_a,
            pin_b,
            state: Lifecycle::Uninitialized(builder),
        }
    }

    /// The `(A, B)` pin pair.
    pub fn pins(&self) -> (PinId, PinId) {
        (self.pin_a, self.pin_b)
    }

    /// Raw decoder counts per logical detent (always 1).
    pub fn count_divisor(&self) -> NonZeroI32 {
        COUNT_DIVISOR
    }

    /// The live decoder, if started.
    pub fn decoder(&self) -> Option<&B::Decoder> {
        match &self.state {
            Lifecycle::Active(decoder) => Some(decoder),
            _ => None,
        }
    }
}

impl<B> EncoderAdapter for SoftwareDecoderAdapter<B>
where
    B: DecoderBuilder,
{
    type Error = EncoderError<B::Error>;

    fn begin(&mut self) -> Result<(), Self::Error> {
        if !matches!(self.state, Lifecycle::Uninitialized(_)) {
            return Err(EncoderError::AlreadyStarted);
        }
        if self.pin_a == self.pin_b {
            return Err(EncoderError::InvalidPins);
        }

        let Lifecycle::Uninitialized(builder) = mem::replace(&mut self.state, Lifecycle::Spent) else {
            return Err(EncoderError::AlreadyStarted);
        };

        match builder.build(self.pin_a, self.pin_b) {
            Ok(mut decoder) => {
                decoder.write(0);
                self.state = Lifecycle::Active(decoder);
                #[cfg(feature = "defmt")]
                defmt::debug!("isr encoder on {}/{} started", self.pin_a, self.pin_b);
                Ok(())
            }
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("isr encoder on {}/{} failed to start", self.pin_a, self.pin_b);
                Err(EncoderError::Backend(e))
            }
        }
    }

    fn position(&self) -> Result<i32, Self::Error> {
        match &self.state {
            Lifecycle::Active(decoder) => Ok(decoder.read()),
            _ => Err(EncoderError::NotStarted),
        }
    }

    fn set_position(&mut self, pos: i32) -> Result<(), Self::Error> {
        match &mut self.state {
            Lifecycle::Active(decoder) => {
                decoder.write(pos);
                Ok(())
            }
            _ => Err(EncoderError::NotStarted),
        }
    }

    fn is_started(&self) -> bool {
        matches!(self.state, Lifecycle::Active(_))
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDecoderBus, MockDecoderError};

    const PIN_A: PinId = PinId(12);
    const PIN_B: PinId = PinId(13);

    // ── Lifecycle ────────────────────────────────────────────────────

    #[test]
    fn construction_defers_decoder() {
        let bus = MockDecoderBus::new();
        let enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        assert_eq!(bus.builds(), 0);
        assert_eq!(bus.bound(), None);
        assert!(!enc.is_started());
        assert_eq!(enc.position(), Err(EncoderError::NotStarted));
    }

    #[test]
    fn begin_builds_decoder_on_both_pins() {
        let bus = MockDecoderBus::new();
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        assert_eq!(enc.begin(), Ok(()));
        assert!(enc.is_started());
        assert!(enc.decoder().is_some());
        assert_eq!(bus.bound(), Some((PIN_A, PIN_B)));
        assert_eq!(enc.position(), Ok(0));
    }

    #[test]
    fn begin_zeroes_decoder_count() {
        let bus = MockDecoderBus::new();
        bus.preset(7);
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        enc.begin().unwrap();
        assert_eq!(enc.position(), Ok(0));
        assert_eq!(enc.decoder().map(|d| d.read()), Some(0));
    }

    #[test]
    fn begin_is_one_shot() {
        let bus = MockDecoderBus::new();
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        enc.begin().unwrap();
        assert_eq!(enc.begin(), Err(EncoderError::AlreadyStarted));
        assert_eq!(bus.builds(), 1);
        assert!(enc.is_started());
    }

    #[test]
    fn failed_build_spends_the_builder() {
        let bus = MockDecoderBus::new();
        let mut holder = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        holder.begin().unwrap();

        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        assert_eq!(enc.begin(), Err(EncoderError::Backend(MockDecoderError::InterruptsBusy)));
        assert!(!enc.is_started());
        assert_eq!(enc.set_position(1), Err(EncoderError::NotStarted));

        drop(holder);
        assert_eq!(enc.begin(), Err(EncoderError::AlreadyStarted));
    }

    #[test]
    fn duplicate_pins_keep_builder_unused() {
        let bus = MockDecoderBus::new();
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_A);
        assert_eq!(enc.begin(), Err(EncoderError::InvalidPins));
        assert_eq!(bus.builds(), 0);
    }

    #[test]
    fn drop_releases_interrupts_for_next_adapter() {
        let bus = MockDecoderBus::new();
        for _ in 0..3 {
            let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
            assert_eq!(enc.begin(), Ok(()));
            bus.turn(5);
            assert_eq!(enc.position(), Ok(5));
        }
        assert_eq!(bus.bound(), None);
        assert_eq!(bus.builds(), 3);

        // Never-started adapters release nothing and block nothing.
        drop(SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B));
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        assert_eq!(enc.begin(), Ok(()));
    }

    // ── Positions ────────────────────────────────────────────────────

    #[test]
    fn set_position_round_trips_unscaled() {
        let bus = MockDecoderBus::new();
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        enc.begin().unwrap();
        assert_eq!(enc.count_divisor().get(), 1);

        for p in [0, 1, -1, 42, -9000, i32::MAX, i32::MIN] {
            enc.set_position(p).unwrap();
            assert_eq!(enc.position(), Ok(p));
            assert_eq!(enc.decoder().map(|d| d.read()), Some(p));
        }
    }

    #[test]
    fn detents_are_monotonic() {
        let bus = MockDecoderBus::new();
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        enc.begin().unwrap();

        for n in 1..=20 {
            bus.turn(1);
            assert_eq!(enc.position(), Ok(n));
        }
        for n in (-10..20).rev() {
            bus.turn(-1);
            assert_eq!(enc.position(), Ok(n));
        }
    }

    #[test]
    fn reset_rezeroes() {
        let bus = MockDecoderBus::new();
        let mut enc = SoftwareDecoderAdapter::new(bus.builder(), PIN_A, PIN_B);
        enc.begin().unwrap();
        bus.turn(-17);
        enc.reset().unwrap();
        assert_eq!(enc.position(), Ok(0));
    }
}

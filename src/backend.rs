//! Collaborator interfaces implemented by board support code.
//!
//! The adapters never touch registers or interrupt vectors themselves. A
//! board crate implements [`PulseCounter`] for its counting peripheral, or
//! [`DecoderBuilder`] / [`QuadratureDecoder`] for its interrupt-driven
//! decoder, and hands the result to the matching adapter.

use core::num::NonZeroI32;

use crate::adapter::PinId;

// ---------------------------------------------------------------------------
// Shared configuration enums
// ---------------------------------------------------------------------------

/// Edge-counting mode of a hardware quadrature decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeMode {
    /// Count one edge of channel A per detent.
    Single,
    /// Count both edges of channel A: two counts per detent.
    Half,
    /// Count every edge of both channels: four counts per detent.
    #[default]
    Full,
}

impl DecodeMode {
    /// Raw counts the peripheral produces for one physical detent.
    pub const fn counts_per_detent(self) -> NonZeroI32 {
        match self {
            DecodeMode::Single => ONE,
            DecodeMode::Half => TWO,
            DecodeMode::Full => FOUR,
        }
    }
}

const ONE: NonZeroI32 = match NonZeroI32::new(1) {
    Some(n) => n,
    None => unreachable!(),
};
const TWO: NonZeroI32 = match NonZeroI32::new(2) {
    Some(n) => n,
    None => unreachable!(),
};
const FOUR: NonZeroI32 = match NonZeroI32::new(4) {
    Some(n) => n,
    None => unreachable!(),
};

/// Weak pull-resistor biasing on the encoder signal lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PullMode {
    /// No internal pull; the board has external resistors.
    Floating,
    /// Weak pull-up (switch-to-ground encoders).
    Up,
    /// Weak pull-down.
    Down,
}

// ---------------------------------------------------------------------------
// Pulse-counter peripheral
// ---------------------------------------------------------------------------

/// One channel of a pulse-counting peripheral with hardware quadrature decode.
///
/// The implementor owns the channel handle. Dropping it must return the
/// channel to the peripheral so a later instance can claim it again.
pub trait PulseCounter {
    /// Peripheral error type.
    type Error;

    /// Largest glitch-filter threshold the peripheral accepts.
    const MAX_FILTER: u16;

    /// Route both pins into a counting unit in the given decode mode.
    ///
    /// # Errors
    /// Returns an error when no counting unit is free or the pins cannot be
    /// routed to the peripheral.
    fn attach(&mut self, pin_a: PinId, pin_b: PinId, mode: DecodeMode) -> Result<(), Self::Error>;

    /// Release the counting unit claimed by [`attach`](Self::attach).
    fn detach(&mut self);

    /// Set the peripheral-wide weak pull mode.
    ///
    /// This affects every channel of the peripheral block, not just this one.
    /// Some peripherals only apply the mode to pins routed by a later
    /// [`attach`](Self::attach), so it is written before attaching.
    fn set_weak_pulls(&mut self, mode: PullMode);

    /// Set the glitch-filter threshold (`0..=MAX_FILTER`).
    fn set_filter(&mut self, threshold: u16) -> Result<(), Self::Error>;

    /// Current raw count.
    fn count(&self) -> i32;

    /// Overwrite the raw count.
    fn set_count(&mut self, count: i32);
}

// ---------------------------------------------------------------------------
// Interrupt-driven software decoder
// ---------------------------------------------------------------------------

/// A live interrupt-driven quadrature decoder reporting one count per detent.
///
/// `read` and `write` must be atomic with respect to the decoder's interrupt
/// handlers. Dropping the decoder releases its interrupt registrations.
pub trait QuadratureDecoder {
    /// Current count.
    fn read(&self) -> i32;

    /// Overwrite the count.
    fn write(&mut self, count: i32);
}

/// One-shot constructor for a [`QuadratureDecoder`].
///
/// Building the decoder registers its interrupt handlers, after which it
/// starts counting immediately. Since most decoders cannot be detached and
/// re-attached, the builder is consumed.
pub trait DecoderBuilder {
    /// Decoder produced by [`build`](Self::build).
    type Decoder: QuadratureDecoder;
    /// Error returned when the decoder cannot be started.
    type Error;

    /// Bind the decoder to both pins and start consuming their interrupts.
    fn build(self, pin_a: PinId, pin_b: PinId) -> Result<Self::Decoder, Self::Error>;
}

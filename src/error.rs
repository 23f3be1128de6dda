//! Error types for the encoder adapters.

use core::fmt;

use crate::backend::PullMode;

/// Errors that can occur when driving an encoder adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderError<E> {
    /// Underlying backend error (includes peripheral channel exhaustion).
    Backend(E),

    /// Both quadrature lines were assigned the same pin.
    InvalidPins,

    /// A position operation was issued before `begin()` succeeded.
    NotStarted,

    /// `begin()` was called on an adapter that is already started (or whose
    /// one-shot backend construction was already attempted).
    AlreadyStarted,

    /// The requested position cannot be represented as a raw backend count.
    PositionOutOfRange,
}

// Allow ergonomic `?` propagation from raw backend errors.
impl<E> From<E> for EncoderError<E> {
    fn from(error: E) -> Self {
        EncoderError::Backend(error)
    }
}

impl<E: fmt::Debug> fmt::Display for EncoderError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncoderError::Backend(e) => write!(f, "Backend error: {:?}", e),
            EncoderError::InvalidPins => write!(f, "Encoder pins A and B must differ"),
            EncoderError::NotStarted => write!(f, "Encoder used before begin()"),
            EncoderError::AlreadyStarted => write!(f, "Encoder already started"),
            EncoderError::PositionOutOfRange => write!(f, "Position out of raw count range"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for EncoderError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            EncoderError::Backend(e) => defmt::write!(f, "Backend error: {}", e),
            EncoderError::InvalidPins => defmt::write!(f, "Encoder pins A and B must differ"),
            EncoderError::NotStarted => defmt::write!(f, "Encoder used before begin()"),
            EncoderError::AlreadyStarted => defmt::write!(f, "Encoder already started"),
            EncoderError::PositionOutOfRange => defmt::write!(f, "Position out of raw count range"),
        }
    }
}

/// Errors from configuring the peripheral-wide weak pull resistors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PullConfigError {
    /// The pulls were already configured with a different mode.
    AlreadyConfigured(PullMode),
}

impl fmt::Display for PullConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PullConfigError::AlreadyConfigured(mode) => {
                write!(f, "Weak pulls already configured as {:?}", mode)
            }
        }
    }
}

/// Errors from building an [`IsrDecoder`](crate::IsrDecoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsrDecoderError<E> {
    /// Another live decoder already owns the counter.
    CounterClaimed,
    /// The interrupt registration hook failed.
    Attach(E),
}

impl<E: fmt::Debug> fmt::Display for IsrDecoderError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IsrDecoderError::CounterClaimed => write!(f, "Quadrature counter already in use"),
            IsrDecoderError::Attach(e) => write!(f, "Interrupt attach failed: {:?}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for IsrDecoderError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            IsrDecoderError::CounterClaimed => defmt::write!(f, "Quadrature counter already in use"),
            IsrDecoderError::Attach(e) => defmt::write!(f, "Interrupt attach failed: {}", e),
        }
    }
}

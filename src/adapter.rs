//! The capability contract shared by every encoder backend.

use core::fmt;

/// Board-level identifier of one quadrature signal line (GPIO number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// A rotary encoder that reports an accumulated detent position.
///
/// Implementations are constructed with two distinct pins and must be
/// started with [`begin`](Self::begin) before the position can be read or
/// written. Calling a position operation before a successful `begin` is a
/// precondition violation and is reported as an error rather than reading
/// from an unattached backend.
///
/// Positions are signed and move in opposite directions for the two
/// rotation directions. They never clamp or wrap inside the `i32` range.
pub trait EncoderAdapter {
    /// Error returned by lifecycle and position operations.
    type Error;

    /// Configure and attach the backend, then zero the position.
    ///
    /// # Errors
    /// Fails when the pin assignment is invalid, when the backend resource
    /// (peripheral channel, interrupt line) cannot be claimed, or when the
    /// adapter was already started.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Current logical position in detents.
    fn position(&self) -> Result<i32, Self::Error>;

    /// Overwrite the logical position.
    ///
    /// The write is atomic with respect to the backend's own update path, so
    /// a concurrent edge either lands before the write or after it.
    fn set_position(&mut self, pos: i32) -> Result<(), Self::Error>;

    /// Whether [`begin`](Self::begin) has succeeded.
    fn is_started(&self) -> bool;

    /// Re-zero the position.
    fn reset(&mut self) -> Result<(), Self::Error> {
        self.set_position(0)
    }
}

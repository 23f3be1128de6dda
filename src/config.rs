//! Configuration for the hardware-counter adapter.

use crate::backend::DecodeMode;

/// Glitch-filter threshold applied in `begin()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterThreshold {
    /// The backend's largest supported threshold.
    ///
    /// Rejects the most contact bounce and electrical noise, at the cost of
    /// the lowest maximum edge rate.
    #[default]
    Max,
    /// An explicit threshold, clamped to the backend's maximum.
    Value(u16),
}

impl FilterThreshold {
    /// Resolve to a concrete threshold for a backend with the given maximum.
    pub const fn resolve(self, max: u16) -> u16 {
        match self {
            FilterThreshold::Max => max,
            FilterThreshold::Value(v) if v > max => max,
            FilterThreshold::Value(v) => v,
        }
    }
}

/// Settings applied by [`HardwareCounterAdapter::begin`](crate::HardwareCounterAdapter).
///
/// The default is full-quadrature decode (4 counts per detent) with the
/// maximum filter threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareCounterConfig {
    /// Peripheral decode mode; also fixes the count divisor.
    pub decode_mode: DecodeMode,
    /// Glitch-filter threshold.
    pub filter: FilterThreshold,
}

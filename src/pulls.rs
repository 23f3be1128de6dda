//! Process-wide weak pull-resistor configuration.
//!
//! Pulse-counter peripherals typically have a single pull setting for the
//! whole block. Letting each adapter write it in `begin()` means the last
//! writer silently wins. Instead the mode is set exactly once, here, and a
//! [`WeakPulls`] token proving it was set is required to construct a
//! [`HardwareCounterAdapter`](crate::HardwareCounterAdapter).

use core::cell::Cell;

use critical_section::Mutex;

use crate::backend::PullMode;
use crate::error::PullConfigError;

static WEAK_PULLS: Mutex<Cell<Option<PullMode>>> = Mutex::new(Cell::new(None));

/// Proof that the peripheral-wide pull mode has been configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WeakPulls {
    mode: PullMode,
}

impl WeakPulls {
    /// Configure the weak pull mode for all hardware-counter adapters.
    ///
    /// The first call fixes the mode. Repeating the call with the same mode
    /// returns an equal token, so independent init paths can each ask for it.
    ///
    /// # Errors
    /// [`PullConfigError::AlreadyConfigured`] if a different mode was set.
    pub fn configure(mode: PullMode) -> Result<Self, PullConfigError> {
        critical_section::with(|cs| {
            let cell = WEAK_PULLS.borrow(cs);
            match cell.get() {
                None => {
                    cell.set(Some(mode));
                    Ok(Self { mode })
                }
                Some(existing) if existing == mode => Ok(Self { mode }),
                Some(existing) => Err(PullConfigError::AlreadyConfigured(existing)),
            }
        })
    }

    /// The token for the already-configured mode, if any.
    pub fn current() -> Option<Self> {
        critical_section::with(|cs| WEAK_PULLS.borrow(cs).get()).map(|mode| Self { mode })
    }

    /// The configured pull mode.
    pub fn mode(&self) -> PullMode {
        self.mode
    }
}

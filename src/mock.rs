//! Mock backends for host testing.
//!
//! These stand in for the pulse-counter peripheral, an interrupt-driven
//! decoder and GPIO input pins, so adapter and caller logic can be exercised
//! without hardware. All state lives in `Cell`s behind shared references;
//! nothing allocates.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin};
use embedded_hal_async::digital::Wait;

use crate::adapter::PinId;
use crate::backend::{DecodeMode, DecoderBuilder, PulseCounter, PullMode, QuadratureDecoder};

// ---------------------------------------------------------------------------
// Pulse-counter peripheral
// ---------------------------------------------------------------------------

/// Highest filter threshold accepted by [`MockPulseCounter`].
pub const MOCK_MAX_FILTER: u16 = 1023;

/// Errors reported by the mock pulse-counter peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MockPcntError {
    /// Every counting unit is already claimed.
    NoFreeUnit,
    /// This handle already owns a unit.
    AlreadyAttached,
    /// Operation needs an attached unit.
    NotAttached,
    /// Filter threshold above [`MOCK_MAX_FILTER`].
    FilterOutOfRange,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    pins: Option<(PinId, PinId)>,
    mode: DecodeMode,
    filter: u16,
    // Like the real count register, survives detach/attach.
    count: i32,
}

impl Slot {
    const FREE: Slot = Slot {
        pins: None,
        mode: DecodeMode::Full,
        filter: 0,
        count: 0,
    };
}

/// A pulse-counter peripheral block with `N` counting units.
///
/// Hand out channel handles with [`channel`](Self::channel) and drive counts
/// from the test with [`step`](Self::step) or [`set_raw`](Self::set_raw).
pub struct MockPulseUnit<const N: usize> {
    slots: [Cell<Slot>; N],
    pulls: Cell<Option<PullMode>>,
}

impl<const N: usize> Default for MockPulseUnit<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MockPulseUnit<N> {
    /// A peripheral with every unit free.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Cell::new(Slot::FREE)),
            pulls: Cell::new(None),
        }
    }

    /// A new, unattached channel handle.
    pub fn channel(&self) -> MockPulseCounter<'_, N> {
        MockPulseCounter { unit: self, slot: None }
    }

    /// Number of claimed counting units.
    pub fn claimed(&self) -> usize {
        self.slots.iter().filter(|s| s.get().pins.is_some()).count()
    }

    /// Last pull mode written to the block.
    pub fn pulls(&self) -> Option<PullMode> {
        self.pulls.get()
    }

    /// Add `edges` to the unit attached to `pin_a` (negative for reverse).
    pub fn step(&self, pin_a: PinId, edges: i32) {
        self.update(pin_a, |slot| slot.count += edges);
    }

    /// Overwrite the raw count of the unit attached to `pin_a`.
    pub fn set_raw(&self, pin_a: PinId, raw: i32) {
        self.update(pin_a, |slot| slot.count = raw);
    }

    /// Raw count of the unit attached to `pin_a`.
    pub fn raw(&self, pin_a: PinId) -> Option<i32> {
        self.find(pin_a).map(|i| self.slots[i].get().count)
    }

    /// Filter threshold of the unit attached to `pin_a`.
    pub fn filter(&self, pin_a: PinId) -> Option<u16> {
        self.find(pin_a).map(|i| self.slots[i].get().filter)
    }

    /// Decode mode of the unit attached to `pin_a`.
    pub fn decode_mode(&self, pin_a: PinId) -> Option<DecodeMode> {
        self.find(pin_a).map(|i| self.slots[i].get().mode)
    }

    fn find(&self, pin_a: PinId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s.get().pins, Some((a, _)) if a == pin_a))
    }

    fn update(&self, pin_a: PinId, f: impl FnOnce(&mut Slot)) {
        if let Some(i) = self.find(pin_a) {
            let mut slot = self.slots[i].get();
            f(&mut slot);
            self.slots[i].set(slot);
        }
    }
}

/// Channel handle into a [`MockPulseUnit`]. Detaches on drop.
pub struct MockPulseCounter<'a, const N: usize> {
    unit: &'a MockPulseUnit<N>,
    slot: Option<usize>,
}

impl<const N: usize> MockPulseCounter<'_, N> {
    fn with_slot<R>(&self, f: impl FnOnce(&Cell<Slot>) -> R) -> Option<R> {
        self.slot.map(|i| f(&self.unit.slots[i]))
    }
}

impl<const N: usize> PulseCounter for MockPulseCounter<'_, N> {
    type Error = MockPcntError;

    const MAX_FILTER: u16 = MOCK_MAX_FILTER;

    fn attach(&mut self, pin_a: PinId, pin_b: PinId, mode: DecodeMode) -> Result<(), Self::Error> {
        if self.slot.is_some() {
            return Err(MockPcntError::AlreadyAttached);
        }
        let free = self
            .unit
            .slots
            .iter()
            .position(|s| s.get().pins.is_none())
            .ok_or(MockPcntError::NoFreeUnit)?;

        let mut slot = self.unit.slots[free].get();
        slot.pins = Some((pin_a, pin_b));
        slot.mode = mode;
        self.unit.slots[free].set(slot);
        self.slot = Some(free);
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(i) = self.slot.take() {
            let mut slot = self.unit.slots[i].get();
            slot.pins = None;
            self.unit.slots[i].set(slot);
        }
    }

    fn set_weak_pulls(&mut self, mode: PullMode) {
        self.unit.pulls.set(Some(mode));
    }

    fn set_filter(&mut self, threshold: u16) -> Result<(), Self::Error> {
        if threshold > MOCK_MAX_FILTER {
            return Err(MockPcntError::FilterOutOfRange);
        }
        self.with_slot(|cell| {
            let mut slot = cell.get();
            slot.filter = threshold;
            cell.set(slot);
        })
        .ok_or(MockPcntError::NotAttached)
    }

    fn count(&self) -> i32 {
        self.with_slot(|cell| cell.get().count).unwrap_or(0)
    }

    fn set_count(&mut self, count: i32) {
        self.with_slot(|cell| {
            let mut slot = cell.get();
            slot.count = count;
            cell.set(slot);
        });
    }
}

impl<const N: usize> Drop for MockPulseCounter<'_, N> {
    fn drop(&mut self) {
        self.detach();
    }
}

// ---------------------------------------------------------------------------
// Interrupt-driven decoder
// ---------------------------------------------------------------------------

/// Errors reported by the mock interrupt decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MockDecoderError {
    /// A live decoder already holds the interrupt lines.
    InterruptsBusy,
}

/// Interrupt lines and count storage shared by mock decoders.
#[derive(Default)]
pub struct MockDecoderBus {
    bound: Cell<Option<(PinId, PinId)>>,
    count: Cell<i32>,
    builds: Cell<u32>,
}

impl MockDecoderBus {
    /// A bus with no decoder bound.
    pub const fn new() -> Self {
        Self {
            bound: Cell::new(None),
            count: Cell::new(0),
            builds: Cell::new(0),
        }
    }

    /// A one-shot builder for a decoder on this bus.
    pub fn builder(&self) -> MockDecoderBuilder<'_> {
        MockDecoderBuilder { bus: self }
    }

    /// Pins currently bound to a live decoder.
    pub fn bound(&self) -> Option<(PinId, PinId)> {
        self.bound.get()
    }

    /// Number of decoders ever constructed.
    pub fn builds(&self) -> u32 {
        self.builds.get()
    }

    /// Leave `count` in the decoder storage, as stale state from before a
    /// reset would.
    pub fn preset(&self, count: i32) {
        self.count.set(count);
    }

    /// Simulate `detents` of rotation (negative for reverse) from the ISR.
    ///
    /// Ignored while no decoder is bound.
    pub fn turn(&self, detents: i32) {
        if self.bound.get().is_some() {
            self.count.set(self.count.get() + detents);
        }
    }
}

/// Builder that binds a [`MockDecoder`] to a [`MockDecoderBus`].
pub struct MockDecoderBuilder<'a> {
    bus: &'a MockDecoderBus,
}

impl<'a> DecoderBuilder for MockDecoderBuilder<'a> {
    type Decoder = MockDecoder<'a>;
    type Error = MockDecoderError;

    fn build(self, pin_a: PinId, pin_b: PinId) -> Result<Self::Decoder, Self::Error> {
        if self.bus.bound.get().is_some() {
            return Err(MockDecoderError::InterruptsBusy);
        }
        self.bus.bound.set(Some((pin_a, pin_b)));
        self.bus.builds.set(self.bus.builds.get() + 1);
        Ok(MockDecoder { bus: self.bus })
    }
}

/// Live mock decoder. Unbinds its interrupt lines on drop.
pub struct MockDecoder<'a> {
    bus: &'a MockDecoderBus,
}

impl QuadratureDecoder for MockDecoder<'_> {
    fn read(&self) -> i32 {
        self.bus.count.get()
    }

    fn write(&mut self, count: i32) {
        self.bus.count.set(count);
    }
}

impl Drop for MockDecoder<'_> {
    fn drop(&mut self) {
        self.bus.bound.set(None);
    }
}

// ---------------------------------------------------------------------------
// GPIO input pins
// ---------------------------------------------------------------------------

/// Returned by [`ScriptedPin`] once its level script is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScriptEnd;

impl Error for ScriptEnd {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Input pin that replays a fixed sequence of levels.
///
/// Each `is_high`/`is_low` call consumes one level; every wait completes
/// immediately.
pub struct ScriptedPin<'a> {
    levels: &'a [bool],
    next: usize,
}

impl<'a> ScriptedPin<'a> {
    /// A pin that will report `levels` in order.
    pub fn new(levels: &'a [bool]) -> Self {
        Self { levels, next: 0 }
    }

    /// Levels not yet consumed.
    pub fn remaining(&self) -> usize {
        self.levels.len() - self.next
    }

    fn level(&mut self) -> Result<bool, ScriptEnd> {
        let level = *self.levels.get(self.next).ok_or(ScriptEnd)?;
        self.next += 1;
        Ok(level)
    }
}

impl ErrorType for ScriptedPin<'_> {
    type Error = ScriptEnd;
}

impl InputPin for ScriptedPin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.level()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.level().map(|high| !high)
    }
}

impl Wait for ScriptedPin<'_> {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Input pin fixed at one level that never errors.
pub struct StaticPin(pub bool);

impl ErrorType for StaticPin {
    type Error = Infallible;
}

impl InputPin for StaticPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0)
    }
}

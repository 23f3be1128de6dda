//! Interrupt-safe quadrature decoding core.
//!
//! [`QuadratureCounter`] turns A/B level samples into detent counts. It is
//! meant to live in a `static` fed from the GPIO interrupt handlers of both
//! pins, or from the [`track_edges`] task on targets with async GPIO.
//! [`IsrDecoderBuilder`] wraps a counter as a [`DecoderBuilder`] so it can
//! back a [`SoftwareDecoderAdapter`](crate::SoftwareDecoderAdapter).

use core::cell::Cell;
use core::convert::Infallible;
use core::marker::PhantomData;

use critical_section::Mutex;
use embassy_futures::select::{select, Either};
use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal_async::digital::Wait;

use crate::adapter::PinId;
use crate::backend::{DecoderBuilder, QuadratureDecoder};
use crate::error::IsrDecoderError;

/// Valid Gray-code transitions per detent.
const STEPS_PER_DETENT: i8 = 4;

/// Direction of each `(previous << 2) | current` transition, where a state
/// is `(A << 1) | B`. Zero for no change and for invalid double steps.
const TRANSITIONS: [i8; 16] = [
    0, -1, 1, 0, //
    1, 0, 0, -1, //
    -1, 0, 0, 1, //
    0, 1, -1, 0, //
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DecoderState {
    levels: u8,
    sub_steps: i8,
    count: i32,
    claimed: bool,
}

impl DecoderState {
    const fn new() -> Self {
        Self {
            // Pulled-up encoders rest with both lines high.
            levels: 0b11,
            sub_steps: 0,
            count: 0,
            claimed: false,
        }
    }

    fn step(&mut self, levels: u8) {
        let delta = TRANSITIONS[((self.levels << 2) | levels) as usize];
        self.levels = levels;
        self.sub_steps += delta;

        if self.sub_steps >= STEPS_PER_DETENT {
            self.sub_steps = 0;
            self.count = self.count.saturating_add(1);
        } else if self.sub_steps <= -STEPS_PER_DETENT {
            self.sub_steps = 0;
            self.count = self.count.saturating_sub(1);
        }
    }
}

const fn levels(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | b as u8
}

/// Detent counter decoded from A/B pin levels.
///
/// Every method runs inside a critical section, so it is safe to call
/// [`on_edge`](Self::on_edge) from an interrupt while main-line code reads or
/// writes the count.
///
/// A detent is counted after four valid transitions in the same direction.
/// Bounce that steps back and forth cancels out, and transitions where both
/// lines change at once are discarded. The count saturates at the `i32`
/// limits.
///
/// # Example
///
/// ```no_run
/// use encoder_adapter::QuadratureCounter;
///
/// static KNOB: QuadratureCounter = QuadratureCounter::new();
///
/// // Called from both pins' edge interrupt handler.
/// fn on_encoder_edge(a: bool, b: bool) {
///     KNOB.on_edge(a, b);
/// }
///
/// on_encoder_edge(false, true);
/// assert_eq!(KNOB.read(), 0);
/// ```
pub struct QuadratureCounter {
    state: Mutex<Cell<DecoderState>>,
}

impl Default for QuadratureCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadratureCounter {
    /// A counter at zero, assuming both lines idle high.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(DecoderState::new())),
        }
    }

    /// Record the current levels without counting, discarding partial steps.
    pub fn seed(&self, a: bool, b: bool) {
        self.modify(|state| {
            state.levels = levels(a, b);
            state.sub_steps = 0;
        });
    }

    /// Feed a new level sample after an edge on either line.
    pub fn on_edge(&self, a: bool, b: bool) {
        self.modify(|state| state.step(levels(a, b)));
    }

    /// Sample both pins and feed the result to [`on_edge`](Self::on_edge).
    pub fn sample<A, B>(&self, pin_a: &mut A, pin_b: &mut B) -> Result<(), A::Error>
    where
        A: InputPin,
        B: InputPin + ErrorType<Error = A::Error>,
    {
        let a = pin_a.is_high()?;
        let b = pin_b.is_high()?;
        self.on_edge(a, b);
        Ok(())
    }

    /// Current detent count.
    pub fn read(&self) -> i32 {
        critical_section::with(|cs| self.state.borrow(cs).get().count)
    }

    /// Overwrite the detent count and discard any partial detent.
    pub fn write(&self, count: i32) {
        self.modify(|state| {
            state.count = count;
            state.sub_steps = 0;
        });
    }

    /// Whether a live [`IsrDecoder`] currently owns this counter.
    pub fn is_claimed(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().claimed)
    }

    fn try_claim(&self) -> bool {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            if state.claimed {
                return false;
            }
            state.claimed = true;
            cell.set(state);
            true
        })
    }

    fn unclaim(&self) {
        self.modify(|state| state.claimed = false);
    }

    fn modify(&self, f: impl FnOnce(&mut DecoderState)) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            f(&mut state);
            cell.set(state);
        });
    }
}

/// Decode both pins from async edge notifications.
///
/// Seeds `counter` from the current pin levels, then waits for an edge on
/// either pin and samples both, forever. Only returns on a pin error.
pub async fn track_edges<A, B>(
    counter: &QuadratureCounter,
    pin_a: &mut A,
    pin_b: &mut B,
) -> Result<Infallible, A::Error>
where
    A: Wait + InputPin,
    B: Wait + InputPin + ErrorType<Error = A::Error>,
{
    let a = pin_a.is_high()?;
    let b = pin_b.is_high()?;
    counter.seed(a, b);

    loop {
        match select(pin_a.wait_for_any_edge(), pin_b.wait_for_any_edge()).await {
            Either::First(result) => result?,
            Either::Second(result) => result?,
        }
        counter.sample(pin_a, pin_b)?;
    }
}

// ---------------------------------------------------------------------------
// DecoderBuilder glue
// ---------------------------------------------------------------------------

/// [`DecoderBuilder`] over a [`QuadratureCounter`].
///
/// `attach` registers the board's edge interrupts for both pins and returns
/// their current levels, which seed the counter. `release` undoes the
/// registration when the decoder is dropped. A counter backs at most one
/// live decoder; building a second one fails with
/// [`IsrDecoderError::CounterClaimed`] and leaves the first untouched.
pub struct IsrDecoderBuilder<'a, F, R, E> {
    counter: &'a QuadratureCounter,
    attach: F,
    release: R,
    _error: PhantomData<fn() -> E>,
}

impl<'a, F, R, E> IsrDecoderBuilder<'a, F, R, E>
where
    F: FnOnce(PinId, PinId) -> Result<(bool, bool), E>,
    R: FnOnce(PinId, PinId),
{
    /// Bind `counter` to interrupt registration and release hooks.
    pub fn new(counter: &'a QuadratureCounter, attach: F, release: R) -> Self {
        Self {
            counter,
            attach,
            release,
            _error: PhantomData,
        }
    }
}

impl<'a, F, R, E> DecoderBuilder for IsrDecoderBuilder<'a, F, R, E>
where
    F: FnOnce(PinId, PinId) -> Result<(bool, bool), E>,
    R: FnOnce(PinId, PinId),
{
    type Decoder = IsrDecoder<'a, R>;
    type Error = IsrDecoderError<E>;

    fn build(self, pin_a: PinId, pin_b: PinId) -> Result<Self::Decoder, Self::Error> {
        if !self.counter.try_claim() {
            return Err(IsrDecoderError::CounterClaimed);
        }

        let (a, b) = match (self.attach)(pin_a, pin_b) {
            Ok(levels) => levels,
            Err(e) => {
                self.counter.unclaim();
                return Err(IsrDecoderError::Attach(e));
            }
        };
        self.counter.seed(a, b);

        Ok(IsrDecoder {
            counter: self.counter,
            pin_a,
            pin_b,
            release: Some(self.release),
        })
    }
}

/// Live decoder produced by [`IsrDecoderBuilder`].
///
/// Dropping it runs the release hook and frees the counter for the next
/// decoder.
pub struct IsrDecoder<'a, R>
where
    R: FnOnce(PinId, PinId),
{
    counter: &'a QuadratureCounter,
    pin_a: PinId,
    pin_b: PinId,
    release: Option<R>,
}

impl<R> QuadratureDecoder for IsrDecoder<'_, R>
where
    R: FnOnce(PinId, PinId),
{
    fn read(&self) -> i32 {
        self.counter.read()
    }

    fn write(&mut self, count: i32) {
        self.counter.write(count);
    }
}

impl<R> Drop for IsrDecoder<'_, R>
where
    R: FnOnce(PinId, PinId),
{
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.pin_a, self.pin_b);
        }
        self.counter.unclaim();
    }
}

// ── Unit Tests ───────────────────────────────────────────────────────

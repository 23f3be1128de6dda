//! Backend-agnostic rotary encoder adapters.
//!
//! This crate gives firmware a single [`EncoderAdapter`] contract for reading
//! and overriding the detent position of a rotary quadrature encoder,
//! regardless of which backend does the actual edge counting.
//!
//! # Architecture
//!
//! - **[`EncoderAdapter`]** — the capability contract: `begin`, `position`,
//!   `set_position`.
//! - **[`HardwareCounterAdapter`]** — wraps a [`PulseCounter`] peripheral
//!   channel with hardware quadrature decode. Raw counts are scaled down by
//!   the decode mode's counts-per-detent (4 in full-quadrature mode).
//! - **[`SoftwareDecoderAdapter`]** — wraps an interrupt-driven
//!   [`QuadratureDecoder`] that already reports one count per detent.
//! - **[`QuadratureCounter`]** — an ISR-safe decoder core that board code can
//!   feed from pin-change interrupts (or from [`track_edges`]) to back a
//!   software adapter.
//!
//! Pick one adapter per physical encoder at build time and hold it through
//! the trait:
//!
//! ```no_run
//! use encoder_adapter::{
//!     EncoderAdapter, EncoderError, HardwareCounterAdapter, PinId, PullMode, PulseCounter, WeakPulls,
//! };
//!
//! fn read_knob<C: PulseCounter>(pcnt_channel: C) -> Result<i32, EncoderError<C::Error>> {
//!     let pulls = WeakPulls::configure(PullMode::Up).expect("pull mode set twice");
//!     let mut knob = HardwareCounterAdapter::new(pcnt_channel, PinId(4), PinId(5), pulls);
//!     knob.begin()?;
//!     knob.position()
//! }
//! ```
//!
//! # Features
//!
//! - **`defmt`** — [`defmt::Format`] implementations on public types and
//!   lifecycle logging from the adapters.
//! - **`mock`** — host-side mock backends in [`mock`] for testing caller code.

#![cfg_attr(not(test), no_std)]

pub use adapter::{EncoderAdapter, PinId};
pub use backend::{DecodeMode, DecoderBuilder, PulseCounter, PullMode, QuadratureDecoder};
pub use config::{FilterThreshold, HardwareCounterConfig};
pub use error::{EncoderError, IsrDecoderError, PullConfigError};
pub use hardware::HardwareCounterAdapter;
pub use pulls::WeakPulls;
pub use quadrature::{track_edges, IsrDecoder, IsrDecoderBuilder, QuadratureCounter};
pub use software::SoftwareDecoderAdapter;

mod adapter;
mod backend;
mod config;
mod error;
mod hardware;
mod pulls;
mod quadrature;
mod software;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

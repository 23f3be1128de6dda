//! Simple encoder example
//!
//! Demonstrates the software-decoder adapter on the Raspberry Pi Pico 2.
//! A task decodes the encoder's A/B lines from GPIO edge events; the main
//! loop polls the adapter and logs every position change via defmt.
//!
//! # Wiring
//!
//! | Signal    | Pico 2 Pin | Notes                        |
//! |-----------|------------|------------------------------|
//! | ENC A     | GP14       | Pull-up enabled              |
//! | ENC B     | GP15       | Pull-up enabled              |
//! | ENC COM   | GND        |                              |

#![no_std]
#![no_main]

use core::convert::Infallible;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp as hal;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Input, Pull};
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use encoder_adapter::{
    track_edges, EncoderAdapter, IsrDecoderBuilder, PinId, QuadratureCounter, SoftwareDecoderAdapter,
};

/// Tell the Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = hal::block::ImageDef::secure_exe();

/// Detent counter shared between the edge task and the adapter.
static KNOB: QuadratureCounter = QuadratureCounter::new();

/// Positions beyond this wrap the menu back to the start.
const MENU_ITEMS: i32 = 8;

#[embassy_executor::task]
async fn edge_task(mut pin_a: Input<'static>, mut pin_b: Input<'static>) {
    // GPIO reads on the RP2350 cannot fail.
    match track_edges(&KNOB, &mut pin_a, &mut pin_b).await {
        Ok(never) | Err(never) => match never {},
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // --- Encoder lines (GP14 = A, GP15 = B, switch to ground) ---
    let pin_a = Input::new(p.PIN_14, Pull::Up);
    let pin_b = Input::new(p.PIN_15, Pull::Up);

    // The edge task runs for the whole program; each adapter built on KNOB
    // only claims the counter and re-zeroes it in `begin()`.
    let levels = (pin_a.is_high(), pin_b.is_high());
    unwrap!(spawner.spawn(edge_task(pin_a, pin_b)));

    let builder = IsrDecoderBuilder::new(
        &KNOB,
        move |a: PinId, b: PinId| {
            info!("Attaching encoder on {}/{}", a, b);
            Ok::<_, Infallible>(levels)
        },
        |a: PinId, b: PinId| info!("Released encoder on {}/{}", a, b),
    );

    let mut knob = SoftwareDecoderAdapter::new(builder, PinId(14), PinId(15));

    if let Err(e) = knob.begin() {
        error!("Encoder failed to start: {}", e);
        return;
    }

    info!("Encoder example started — rotate the knob to see position changes");

    let mut last = 0;

    // Main loop: poll, log changes, wrap the menu index.
    loop {
        match knob.position() {
            Ok(pos) if pos != last => {
                let item = pos.rem_euclid(MENU_ITEMS);
                info!("Position: {} (menu item {})", pos, item);

                // Re-zero on a full lap so the count never runs away.
                if pos.abs() >= MENU_ITEMS {
                    if let Err(e) = knob.set_position(item) {
                        warn!("Re-zero failed: {}", e);
                    }
                    last = item;
                } else {
                    last = pos;
                }
            }
            Ok(_) => {}
            Err(e) => error!("Read failed: {}", e),
        }

        Timer::after(Duration::from_millis(20)).await;
    }
}

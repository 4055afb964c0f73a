//! uBITX Transceiver Main Application
//!
//! Entry point for the STM32G474 board. Brings up the synthesizer and the
//! calibration EEPROM, then runs the radio from a single control loop fed by
//! the encoder and PTT input tasks.

#![no_std]
#![no_main]

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Delay;
use {defmt_rtt as _, panic_probe as _};

use ubitx_firmware::drivers::eeprom::I2cEeprom;
use ubitx_firmware::drivers::encoder::{Encoder, StepAccumulator};
use ubitx_firmware::drivers::si5351::{CrystalLoad, Si5351};
use ubitx_firmware::prelude::*;
use ubitx_firmware::ui::map_encoder_event;

/// Events from the input tasks to the control loop
static EVENTS: Channel<CriticalSectionRawMutex, RadioEvent, 8> = Channel::new();

/// Input polling period
const INPUT_POLL_MS: u64 = 1;

/// PTT debounce period
const PTT_POLL_MS: u64 = 5;

type Knob = Encoder<Input<'static>, Input<'static>, Input<'static>>;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("uBITX firmware v{}", env!("CARGO_PKG_VERSION"));

    let config = embassy_stm32::Config::default();
    let p = embassy_stm32::init(config);

    // I2C1: Si5351A on PB8/PB9
    let synth_bus: I2c<'static, Blocking> = I2c::new_blocking(
        p.I2C1,
        p.PB8,
        p.PB9,
        Hertz(I2C_FREQUENCY_HZ),
        Default::default(),
    );
    // I2C2: calibration EEPROM on PA9/PA8
    let eeprom_bus: I2c<'static, Blocking> = I2c::new_blocking(
        p.I2C2,
        p.PA9,
        p.PA8,
        Hertz(I2C_FREQUENCY_HZ),
        Default::default(),
    );
    info!("I2C buses up at {} Hz", I2C_FREQUENCY_HZ);

    let mut synth = unwrap!(Si5351::new(synth_bus));
    unwrap!(synth.init(CrystalLoad::Load8pF));
    let eeprom = I2cEeprom::new(eeprom_bus, Delay);

    let mut tx_line = Output::new(p.PB0, Level::Low, Speed::Low);

    let knob = Encoder::new(
        Input::new(p.PA0, Pull::Up),
        Input::new(p.PA1, Pull::Up),
        Input::new(p.PA2, Pull::Up),
    );
    let ptt = Input::new(p.PA3, Pull::Up);

    unwrap!(spawner.spawn(encoder_task(knob)));
    unwrap!(spawner.spawn(ptt_task(ptt)));

    let mut radio = Radio::start(synth, eeprom);
    let mut shown = radio.display_lines();
    info!("{}", shown);

    let mut last_tick = Instant::now();
    loop {
        let event = match select(
            EVENTS.receive(),
            Timer::after(Duration::from_millis(CONTROL_TICK_MS)),
        )
        .await
        {
            Either::First(event) => Some(event),
            Either::Second(()) => None,
        };

        if let Some(event) = event {
            match radio.handle(event) {
                Ok(action) => drive_tx_line(&mut tx_line, action),
                Err(err) => warn!("{} failed: {}", event, err),
            }
        }

        let now = Instant::now();
        let elapsed = u32::try_from((now - last_tick).as_millis()).unwrap_or(u32::MAX);
        last_tick = now;
        match radio.tick(elapsed) {
            Ok(action) => drive_tx_line(&mut tx_line, action),
            Err(err) => warn!("deferred event failed: {}", err),
        }

        let lines = radio.display_lines();
        if lines != shown {
            info!("{}", lines);
            shown = lines;
        }
    }
}

fn drive_tx_line(line: &mut Output<'static>, action: TxAction) {
    match action {
        TxAction::TxLineOn => line.set_high(),
        TxAction::TxLineOff => line.set_low(),
        TxAction::None | TxAction::OscillatorsOff | TxAction::OscillatorsOn => {}
    }
}

/// Poll the tuning knob and forward gestures
#[embassy_executor::task]
async fn encoder_task(mut knob: Knob) {
    let mut steps = StepAccumulator::new();
    let start = Instant::now();
    loop {
        let now_ms = u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX);
        if let Some(event) = knob.poll(now_ms) {
            if event.tune_steps().is_some() {
                steps.push(event);
            } else if let Some(radio_event) = map_encoder_event(event) {
                EVENTS.send(radio_event).await;
            }
        }
        if let Some(delta) = steps.take() {
            EVENTS.send(RadioEvent::Tune(delta)).await;
        }
        Timer::after(Duration::from_millis(INPUT_POLL_MS)).await;
    }
}

/// Watch the PTT line (active low) and report changes
#[embassy_executor::task]
async fn ptt_task(ptt: Input<'static>) {
    let mut pressed = false;
    loop {
        let level = ptt.is_low();
        if level != pressed {
            Timer::after(Duration::from_millis(PTT_POLL_MS)).await;
            if ptt.is_low() == level {
                pressed = level;
                EVENTS.send(RadioEvent::Ptt(pressed)).await;
            }
        }
        Timer::after(Duration::from_millis(PTT_POLL_MS)).await;
    }
}

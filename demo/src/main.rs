mod config;

use crate::config::{Config, Mode};
use dotenv::dotenv;
use hd44780_gpio::gpiod::GpiodDriver;
use hd44780_gpio::i2c;
use hd44780_gpio::lcd::hd44780::driver::{
    GpioHD44780Transport, HD44780Transport, I2cHD44780Transport,
};
use hd44780_gpio::lcd::hd44780::{DisplayController, DisplayGeometry};
use hd44780_gpio::{GpioDriver, GpioOutput, GpioResult};
use linux_embedded_hal::I2cdev;
use log::{debug, info, warn};
use std::thread::sleep;
use std::time::Duration;
use sysinfo::System;

const UNKNOWN_STR: &str = "???";

/// A small bell, shown in front of the counter.
const BELL: [u8; 8] = [
    0b00100,
    0b01110,
    0b01110,
    0b01110,
    0b11111,
    0b00000,
    0b00100,
    0b00000,
];

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());

    let config = Config::from_env()?;
    debug!("{:?}", config);

    let geometry = DisplayGeometry::new(config.rows, config.columns)?;

    match config.mode {
        Mode::Gpio => run_gpio(&config, geometry),
        Mode::I2c => run_i2c(&config, geometry),
    }
}

fn run_gpio(config: &Config, geometry: DisplayGeometry) -> eyre::Result<()> {
    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&config.chip)?;
    debug!("{:?} initialized.", gpio);

    info!("LCD @ pins {:?}, backlight: {:?}", config.pins, config.pin_backlight);

    let mut pins = config
        .pins
        .iter()
        .map(|&n| gpio.get_pin(n))
        .collect::<GpioResult<Vec<_>>>()?;
    let outputs = pins
        .iter_mut()
        .map(|pin| pin.as_output())
        .collect::<GpioResult<Vec<_>>>()?;
    let outputs: Vec<&dyn GpioOutput> = outputs.iter().map(|out| &**out).collect();

    let mut backlight_pin = config.pin_backlight.map(|n| gpio.get_pin(n)).transpose()?;
    let backlight_out = backlight_pin.as_mut().map(|pin| pin.as_output()).transpose()?;

    let mut transport = GpioHD44780Transport::new(&outputs)?;
    if let Some(out) = &backlight_out {
        transport = transport.with_backlight(&**out);
    }

    run(DisplayController::new(transport, geometry, config.font)?, config)
}

fn run_i2c(config: &Config, geometry: DisplayGeometry) -> eyre::Result<()> {
    info!("LCD @ I2C {:#04x} on {}", config.i2c_address, config.i2c_bus);

    let mut bus = I2cdev::new(&config.i2c_bus)?;
    info!("I2C devices: {:02x?}", i2c::scan(&mut bus)?);

    let transport = I2cHD44780Transport::new(bus, config.i2c_address)?;
    run(DisplayController::new(transport, geometry, config.font)?, config)
}

fn run<T: HD44780Transport>(mut lcd: DisplayController<T>, config: &Config) -> eyre::Result<()> {
    debug!("{:?} initialized.", lcd);

    if let Err(err) = lcd.set_backlight(true) {
        warn!("No backlight control: {}", err);
    }

    lcd.define_custom_glyph(0, &BELL)?;

    let columns = lcd.geometry().columns() as usize;
    let last_row = lcd.geometry().rows() - 1;

    let host_name = System::host_name().unwrap_or_else(|| UNKNOWN_STR.to_string());
    lcd.set_cursor(0, 0)?;
    lcd.print(host_name.chars().take(columns).collect::<String>())?;

    info!("Starting counter...");

    let mut seconds = 0u64;
    loop {
        let text = seconds.to_string();
        // Right-aligned, with the glyph in front
        let column = columns.saturating_sub(text.len() + 1) as u8;
        lcd.set_cursor(last_row, column)?;
        lcd.write_glyph(0)?;
        lcd.print(&text)?;

        if config.seconds.is_some_and(|limit| seconds >= limit) {
            break;
        }

        sleep(Duration::from_secs(1));
        seconds += 1;
    }

    info!("Done.");
    lcd.release();
    Ok(())
}

use crate::expander::{PIN_COUNT, PinMode, PortExpander};
use crate::lcd::hd44780::driver::{DataWidth, HD44780Transport, LcdResult};
use embedded_hal::i2c::I2c;
use log::{debug, trace};
use std::fmt::{Debug, Formatter};
use std::thread::sleep;
use std::time::Duration;

/// HD44780 transport through a PCF8574 backpack.
///
/// Expander pin roles are fixed by the backpack wiring:
///
/// | P7..P4  | P3        | P2 | P1 | P0 |
/// |---------|-----------|----|----|----|
/// | D7..D4  | backlight | E  | RW | RS |
///
/// Only D4–D7 are wired, so the bus is always 4 bits wide. Every pin change is one expander
/// write; the backlight bit lives in the expander's output buffer and survives all of them.
pub struct I2cHD44780Transport<B> {
    expander: PortExpander<B>,
}

impl<B: I2c> I2cHD44780Transport<B> {
    pub const PIN_RS: u8 = 0;
    pub const PIN_RW: u8 = 1;
    pub const PIN_E: u8 = 2;
    pub const PIN_BACKLIGHT: u8 = 3;
    /// First of the four data pins, carrying D4.
    pub const PIN_DATA: u8 = 4;

    /// Minimum time E is held high.
    pub const ENABLE_HOLD: Duration = Duration::from_micros(40);

    /// Finds the expander at `address` on `bus` and configures all of its pins as outputs.
    pub fn new(bus: B, address: u8) -> LcdResult<Self> {
        Self::from_expander(PortExpander::new(bus, address)?)
    }

    /// Uses an already found expander, configuring all of its pins as outputs.
    pub fn from_expander(mut expander: PortExpander<B>) -> LcdResult<Self> {
        for pin in 0..PIN_COUNT {
            expander.set_pin_mode(pin, PinMode::Output)?;
        }
        debug!("I2C transport on {:?}", expander);
        Ok(I2cHD44780Transport { expander })
    }

    pub fn expander(&self) -> &PortExpander<B> {
        &self.expander
    }

    /// Hands the bus back to the caller.
    pub fn release(self) -> B {
        self.expander.release()
    }

    fn pulse_e(&mut self) -> LcdResult<()> {
        self.expander.write_pin(Self::PIN_E, true)?;
        sleep(Self::ENABLE_HOLD);
        self.expander.write_pin(Self::PIN_E, false)?;
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8, register_select: bool) -> LcdResult<()> {
        trace!("Writing nibble: {:04b}, RS: {}", nibble, register_select);

        self.expander.write_pin(Self::PIN_RS, register_select)?;
        self.expander.write_pin(Self::PIN_RW, false)?;
        for bit in 0..4 {
            self.expander
                .write_pin(Self::PIN_DATA + bit, (nibble >> bit) & 0x01 != 0)?;
        }

        self.pulse_e()
    }
}

impl<B> Debug for I2cHD44780Transport<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "I2cHD44780Transport({:?})", self.expander)
    }
}

impl<B: I2c> HD44780Transport for I2cHD44780Transport<B> {
    fn data_width(&self) -> DataWidth {
        DataWidth::Four
    }

    fn send_instruction(&mut self, byte: u8, register_select: bool) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", byte, register_select);
        self.write_nibble((byte >> 4) & 0x0F, register_select)?;
        self.write_nibble(byte & 0x0F, register_select)
    }

    fn send_nibble(&mut self, nibble: u8, register_select: bool) -> LcdResult<()> {
        self.write_nibble(nibble & 0x0F, register_select)
    }

    fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        self.expander.write_pin(Self::PIN_BACKLIGHT, on)
    }
}

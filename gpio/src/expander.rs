//! PCF8574-family 8-bit I2C port expander.
//!
//! The chip has no direction register: every pin is quasi-bidirectional. A pin reads back
//! correctly only while it is written high, so every byte sent to the device carries a 1 on
//! each input pin. The driver keeps the direction of each pin itself and refuses to write an
//! input or read an output.
use crate::i2c::{bus_error, scan};
use crate::lcd::hd44780::driver::{LcdError, LcdResult};
use embedded_hal::i2c::I2c;
use log::{debug, trace};
use std::fmt::{Debug, Formatter};
use std::ops::RangeInclusive;

/// Address of a PCF8574 with all address pins pulled high, as on most LCD backpacks.
pub const DEFAULT_ADDRESS: u8 = 0x27;
/// Addresses of the PCF8574.
pub const ADDRESSES: RangeInclusive<u8> = 0x20..=0x27;
/// Addresses of the PCF8574A.
pub const ADDRESSES_A: RangeInclusive<u8> = 0x38..=0x3F;
pub const PIN_COUNT: u8 = 8;

pub fn is_valid_address(address: u8) -> bool {
    ADDRESSES.contains(&address) || ADDRESSES_A.contains(&address)
}

/// Direction of an expander pin.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PinMode {
    Input,
    Output,
}

/// A PCF8574 on bus `B`.
///
/// The expander does not need the bus to itself: pass `&mut bus`, or share the bus between
/// several devices with `embedded_hal_bus::i2c::RefCellDevice`.
pub struct PortExpander<B> {
    bus: B,
    address: u8,
    /// 1 = input, 0 = output
    io_config: u8,
    /// Last written output levels
    io_write: u8,
}

impl<B: I2c> PortExpander<B> {
    /// Checks the address and that the device answers on the bus. All pins start as low outputs.
    ///
    /// # Errors
    /// - `LcdError::InvalidAddress` if `address` is outside both PCF8574 ranges. The bus is not
    ///   touched.
    /// - `LcdError::DeviceNotFound` if no device answered the scan at `address`.
    /// - `LcdError::Transport` if the scan itself failed.
    pub fn new(mut bus: B, address: u8) -> LcdResult<Self> {
        if !is_valid_address(address) {
            return Err(LcdError::InvalidAddress(address));
        }

        if !scan(&mut bus)?.contains(&address) {
            return Err(LcdError::DeviceNotFound(address));
        }

        debug!("Port expander found at {:#04x}", address);

        Ok(PortExpander {
            bus,
            address,
            io_config: 0x00,
            io_write: 0x00,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Direction bitmask, 1 for input.
    pub fn io_config(&self) -> u8 {
        self.io_config
    }

    /// Last written output levels.
    pub fn io_write(&self) -> u8 {
        self.io_write
    }

    fn check_pin(pin: u8) -> LcdResult<()> {
        if pin >= PIN_COUNT {
            return Err(LcdError::InvalidPin(pin));
        }
        Ok(())
    }

    pub fn pin_mode(&self, pin: u8) -> LcdResult<PinMode> {
        Self::check_pin(pin)?;
        Ok(if (self.io_config >> pin) & 0x01 != 0 {
            PinMode::Input
        } else {
            PinMode::Output
        })
    }

    /// Sets the direction of `pin` and writes the port with the new direction mask applied.
    ///
    /// The stored masks only change once the device acknowledged the write.
    pub fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> LcdResult<()> {
        Self::check_pin(pin)?;

        let io_config = match mode {
            PinMode::Input => self.io_config | (1 << pin),
            PinMode::Output => self.io_config & !(1 << pin),
        };

        self.write_device(self.io_write | io_config)?;
        self.io_config = io_config;
        Ok(())
    }

    /// Sets the level of one output pin, keeping the stored levels of all other pins.
    ///
    /// # Errors
    /// - `LcdError::InvalidPin` if `pin` is not 0 to 7.
    /// - `LcdError::NotConfiguredAsOutput` if `pin` is an input.
    pub fn write_pin(&mut self, pin: u8, level: bool) -> LcdResult<()> {
        if self.pin_mode(pin)? != PinMode::Output {
            return Err(LcdError::NotConfiguredAsOutput(pin));
        }

        let io_write = (self.io_write & !(1 << pin)) | ((level as u8) << pin);
        self.write_device(io_write | self.io_config)?;
        self.io_write = io_write;
        Ok(())
    }

    /// Reads the level of one input pin.
    ///
    /// # Errors
    /// - `LcdError::InvalidPin` if `pin` is not 0 to 7.
    /// - `LcdError::NotConfiguredAsInput` if `pin` is an output.
    pub fn read_pin(&mut self, pin: u8) -> LcdResult<bool> {
        if self.pin_mode(pin)? != PinMode::Input {
            return Err(LcdError::NotConfiguredAsInput(pin));
        }

        let status = self.read_port()?;
        Ok((status >> pin) & 0x01 != 0)
    }

    /// Reads the state of all eight pins.
    pub fn read_port(&mut self) -> LcdResult<u8> {
        let mut buffer = [0u8];
        self.bus
            .read(self.address, &mut buffer)
            .map_err(|err| bus_error(self.address, err))?;
        trace!("Expander {:#04x} read: {:08b}", self.address, buffer[0]);
        Ok(buffer[0])
    }

    /// Replaces all stored output levels at once. Input pins stay high on the wire.
    pub fn write_port(&mut self, byte: u8) -> LcdResult<()> {
        self.write_device(byte | self.io_config)?;
        self.io_write = byte;
        Ok(())
    }

    fn write_device(&mut self, byte: u8) -> LcdResult<()> {
        trace!("Expander {:#04x} write: {:08b}", self.address, byte);
        self.bus
            .write(self.address, &[byte])
            .map_err(|err| bus_error(self.address, err))?;
        Ok(())
    }

    /// Hands the bus back to the caller.
    pub fn release(self) -> B {
        debug!("Releasing port expander at {:#04x}", self.address);
        self.bus
    }
}

impl<B> Debug for PortExpander<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PortExpander({:#04x}, config: {:08b}, write: {:08b})",
            self.address, self.io_config, self.io_write
        )
    }
}

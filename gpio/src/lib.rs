//! Pin and bus primitives plus an HD44780 character LCD driver built on top of them.
//!
//! The layers, leaves first:
//! - [GpioDriver] / [GpioPin]: digital pins, implemented by [gpiod::GpiodDriver].
//! - [embedded_hal::i2c::I2c]: any I2C bus, with [i2c::scan] and error mapping on top.
//! - [expander::PortExpander]: a PCF8574-family 8-bit I2C port expander.
//! - [lcd::hd44780::driver::HD44780Transport]: byte framing, either over dedicated pins or
//!   through the port expander.
//! - [lcd::hd44780::DisplayController]: the high-level display API.
pub mod expander;
pub mod gpiod;
pub mod i2c;
pub mod lcd;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("no acknowledge from device at {0:#04x}")]
    Nack(u8),
    #[error("I2C bus error: {0:?}")]
    Bus(embedded_hal::i2c::ErrorKind),
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin at the given index.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the pin is still held elsewhere.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;
}

/// Specifies the bias of the GPIO pin.
///
/// You can use this to enable pull-up or pull-down resistors, e.g. on the lines of a
/// bit-banged bus without external pull-ups.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to input, allowing reading its state.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>>;
    /// Sets the GPIO pin function to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Gets whether the GPIO pin supports bias (pull-up/pull-down resistors).
    fn supports_bias(&self) -> bool {
        false
    }
    /// Gets the bias of the GPIO pin.
    fn bias(&self) -> GpioBias {
        GpioBias::None
    }
    /// Sets the bias of the GPIO pin.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the pin does not support bias.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
    fn with_bias(mut self, bias: GpioBias) -> GpioResult<Self>
    where
        Self: Sized,
    {
        self.set_bias(bias)?;
        Ok(self)
    }
}

pub trait GpioInput: Debug {
    /// Reads the state of the GPIO pin.
    fn read(&self) -> GpioResult<bool>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

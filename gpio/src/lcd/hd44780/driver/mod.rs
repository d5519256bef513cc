//! HD44780 instruction set and transport layer.
//!
//! A transport frames one instruction byte onto the physical bus, either over dedicated GPIO pins
//! ([GpioHD44780Transport]) or through a PCF8574 port expander ([I2cHD44780Transport]). Everything
//! above the framing lives in [DisplayController](super::DisplayController).

mod gpio;
mod i2c;

use crate::GpioError;
use std::fmt::Debug;
use thiserror::Error;
pub use gpio::*;
pub use i2c::*;

/// Instruction opcodes and their sub-flags. A full instruction is an opcode OR-ed with flags of
/// the same group.
pub mod instruction {
    pub const CLEAR_DISPLAY: u8 = 0x01;
    pub const RETURN_HOME: u8 = 0x02;

    pub const ENTRY_MODE_SET: u8 = 0x04;
    pub const INCREMENT: u8 = 0x02;
    pub const SHIFT: u8 = 0x01;

    pub const DISPLAY_CONTROL: u8 = 0x08;
    pub const DISPLAY: u8 = 0x04;
    pub const CURSOR: u8 = 0x02;
    pub const BLINK: u8 = 0x01;

    pub const CURSOR_DISPLAY_SHIFT: u8 = 0x10;
    pub const CURSOR_MOVE: u8 = 0x00;
    pub const DISPLAY_SHIFT: u8 = 0x08;
    pub const SHIFT_RIGHT: u8 = 0x04;
    pub const SHIFT_LEFT: u8 = 0x00;

    pub const FUNCTION_SET: u8 = 0x20;
    pub const LEN_8BIT: u8 = 0x10;
    pub const LEN_4BIT: u8 = 0x00;
    pub const LINES_2: u8 = 0x08;
    pub const LINES_1: u8 = 0x00;
    pub const FONT_5X10: u8 = 0x04;
    pub const FONT_5X8: u8 = 0x00;

    pub const CGRAM_ADDRESS: u8 = 0x40;
    pub const DDRAM_ADDRESS: u8 = 0x80;
}

/// Width of the data bus between the transport and the controller.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataWidth {
    /// D4–D7 only; every byte is sent as two nibbles, high nibble first.
    Four,
    Eight,
}

impl DataWidth {
    pub fn flag(self) -> u8 {
        match self {
            DataWidth::Four => instruction::LEN_4BIT,
            DataWidth::Eight => instruction::LEN_8BIT,
        }
    }
}

/// Character font of the display.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Font {
    #[default]
    Font5x8,
    Font5x10,
}

impl Font {
    /// Function set flag for this font.
    pub fn flag(self) -> u8 {
        match self {
            Font::Font5x8 => instruction::FONT_5X8,
            Font::Font5x10 => instruction::FONT_5X10,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    Right,
}

/// Broad class of an [LcdError].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Rejected at construction.
    Configuration,
    /// An argument out of bounds. Rejected before anything is written to the bus.
    Range,
    Device,
}

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error("invalid geometry {rows}x{columns}, expected 1, 2 or 4 rows of 16 or 20 columns")]
    InvalidGeometry { rows: u8, columns: u8 },
    #[error("invalid pin count {0}, expected 7 (4-bit) or 11 (8-bit)")]
    InvalidPinCount(usize),
    #[error("invalid device address {0:#04x}")]
    InvalidAddress(u8),
    #[error("device not found at {0:#04x}")]
    DeviceNotFound(u8),
    #[error("invalid expander pin {0}, expected 0 to 7")]
    InvalidPin(u8),
    #[error("expander pin {0} is not configured as an output")]
    NotConfiguredAsOutput(u8),
    #[error("expander pin {0} is not configured as an input")]
    NotConfiguredAsInput(u8),
    #[error("cursor position ({row}, {column}) is outside the display")]
    CursorOutOfRange { row: u8, column: u8 },
    #[error("invalid glyph slot {0}, expected 0 to 7")]
    InvalidGlyphSlot(u8),
    #[error("invalid glyph bitmap of {0} rows, expected at most 8")]
    InvalidBitmap(usize),
    #[error("transport error: {0}")]
    Transport(#[from] GpioError),
}

impl LcdError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LcdError::InvalidGeometry { .. }
            | LcdError::InvalidPinCount(_)
            | LcdError::InvalidAddress(_) => ErrorKind::Configuration,
            LcdError::InvalidPin(_)
            | LcdError::NotConfiguredAsOutput(_)
            | LcdError::NotConfiguredAsInput(_)
            | LcdError::CursorOutOfRange { .. }
            | LcdError::InvalidGlyphSlot(_)
            | LcdError::InvalidBitmap(_) => ErrorKind::Range,
            LcdError::DeviceNotFound(_) | LcdError::Transport(_) => ErrorKind::Device,
        }
    }
}

pub type LcdResult<T> = Result<T, LcdError>;

/// Byte framing between the [DisplayController](super::DisplayController) and the physical bus.
///
/// Implementations are write-only; the R/W line is always held low. Every call blocks until the
/// controller has latched the data, so instructions reach the display strictly in call order.
pub trait HD44780Transport: Debug {
    /// Width of the data bus, used for the function set instruction.
    fn data_width(&self) -> DataWidth;

    /// Sends one instruction (`register_select == false`) or data byte (`true`).
    fn send_instruction(&mut self, byte: u8, register_select: bool) -> LcdResult<()>;

    /// Sends the low nibble of `nibble` on D4–D7 with a single enable strobe.
    ///
    /// Only meaningful during initialization, while the controller may still be in 8-bit mode.
    /// On an 8-bit bus D4–D7 are the upper half of the byte, so the default sends `nibble << 4`.
    fn send_nibble(&mut self, nibble: u8, register_select: bool) -> LcdResult<()> {
        self.send_instruction((nibble & 0x0F) << 4, register_select)
    }

    /// Turns the backlight on or off.
    fn set_backlight(&mut self, on: bool) -> LcdResult<()>;
}

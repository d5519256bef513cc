//! HD44780 character LCD module.
//!
//! [DisplayController] is the transport-agnostic API: it composes instruction bytes and hands them
//! to any [HD44780Transport]. Two transports are provided in [driver]: dedicated GPIO pins in
//! 4-bit or 8-bit mode, and a PCF8574 I2C backpack.
//!
//! ```no_run
//! # use embedded_hal::i2c::I2c;
//! # use hd44780_gpio::lcd::hd44780::{DisplayController, DisplayGeometry};
//! # use hd44780_gpio::lcd::hd44780::driver::{Font, I2cHD44780Transport, LcdResult};
//! # fn demo(bus: impl I2c) -> LcdResult<()> {
//! let transport = I2cHD44780Transport::new(bus, 0x27)?;
//! let geometry = DisplayGeometry::new(2, 16)?;
//! let mut lcd = DisplayController::new(transport, geometry, Font::Font5x8)?;
//! lcd.set_backlight(true)?;
//! lcd.print("Hello, World!")?;
//! let _bus = lcd.release().release();
//! # Ok(())
//! # }
//! ```

pub mod driver;

use driver::{instruction, CursorDirection, DataWidth, Font, HD44780Transport, LcdError, LcdResult};
use log::{debug, warn};
use std::fmt::Display;
use std::thread::sleep;
use std::time::Duration;

/// Rows and columns of the display. Fixed for the lifetime of a controller.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DisplayGeometry {
    rows: u8,
    columns: u8,
}

impl DisplayGeometry {
    pub const SUPPORTED_ROWS: [u8; 3] = [1, 2, 4];
    pub const SUPPORTED_COLUMNS: [u8; 2] = [16, 20];

    /// DDRAM address of the first column of each row.
    pub const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

    pub fn new(rows: u8, columns: u8) -> LcdResult<Self> {
        if !Self::SUPPORTED_ROWS.contains(&rows) || !Self::SUPPORTED_COLUMNS.contains(&columns) {
            return Err(LcdError::InvalidGeometry { rows, columns });
        }
        Ok(DisplayGeometry { rows, columns })
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    /// Line count flag of the function set instruction. 4-row modules are wired as two long lines.
    pub fn line_flag(&self) -> u8 {
        if self.rows >= 2 {
            instruction::LINES_2
        } else {
            instruction::LINES_1
        }
    }

    /// DDRAM address of a cell.
    ///
    /// # Errors
    /// - `LcdError::CursorOutOfRange` if the cell is not on the display.
    pub fn ddram_address(&self, row: u8, column: u8) -> LcdResult<u8> {
        if row >= self.rows || column >= self.columns {
            return Err(LcdError::CursorOutOfRange { row, column });
        }
        Ok(Self::ROW_OFFSETS[row as usize] + column)
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        DisplayGeometry { rows: 2, columns: 16 }
    }
}

/// High-level driver for an HD44780 display behind any [HD44780Transport].
///
/// The controller is initialized on construction. The display cannot be polled for its busy flag
/// through a write-only transport, so slow instructions are followed by fixed waits instead.
#[derive(Debug)]
pub struct DisplayController<T: HD44780Transport> {
    transport: T,
    geometry: DisplayGeometry,
    font: Font,
}

impl<T: HD44780Transport> DisplayController<T> {
    /// Wait after power-on before the first instruction. The datasheet asks for 40 ms after VCC
    /// reaches 2.7 V.
    pub const POWER_ON_DELAY: Duration = Duration::from_millis(50);
    /// Wait after the first wake-up instruction (datasheet: 4.1 ms).
    pub const FIRST_WAKE_DELAY: Duration = Duration::from_millis(5);
    /// Wait after the second wake-up instruction (datasheet: 100 µs).
    pub const SECOND_WAKE_DELAY: Duration = Duration::from_micros(100);
    /// Execution time of clear display and return home (datasheet: 1.52 ms).
    pub const CLEAR_DELAY: Duration = Duration::from_millis(2);

    pub const GLYPH_SLOTS: u8 = 8;
    pub const GLYPH_ROWS: usize = 8;

    /// Function set with 8-bit interface, in the nibble placed on D4–D7.
    const WAKE_UP: u8 = (instruction::FUNCTION_SET | instruction::LEN_8BIT) >> 4;
    /// Function set with 4-bit interface, in the nibble placed on D4–D7.
    const FOUR_BIT: u8 = instruction::FUNCTION_SET >> 4;

    /// Takes ownership of `transport` and initializes the display.
    ///
    /// After initialization the display is on and empty, the cursor is hidden and not blinking, and
    /// it moves right after each character without shifting the display.
    pub fn new(transport: T, geometry: DisplayGeometry, font: Font) -> LcdResult<Self> {
        let mut controller = DisplayController {
            transport,
            geometry,
            font,
        };
        controller.init()?;
        Ok(controller)
    }

    fn init(&mut self) -> LcdResult<()> {
        let data_width = self.transport.data_width();
        debug!(
            "Initializing {}x{} display over {:?}-bit bus",
            self.geometry.rows, self.geometry.columns, data_width
        );

        sleep(Self::POWER_ON_DELAY);

        // Forces 8-bit mode whatever state the controller powered up in, including halfway
        // through a 4-bit transfer.
        self.transport.send_nibble(Self::WAKE_UP, false)?;
        sleep(Self::FIRST_WAKE_DELAY);
        self.transport.send_nibble(Self::WAKE_UP, false)?;
        sleep(Self::SECOND_WAKE_DELAY);
        self.transport.send_nibble(Self::WAKE_UP, false)?;

        if data_width == DataWidth::Four {
            self.transport.send_nibble(Self::FOUR_BIT, false)?;
        }

        self.send_command(
            instruction::FUNCTION_SET
                | data_width.flag()
                | self.geometry.line_flag()
                | self.font.flag(),
        )?;
        self.display_on()?;
        self.clear_display()?;
        self.set_entry_mode(CursorDirection::Right, false)?;

        debug!("Display initialized");
        Ok(())
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    pub fn font(&self) -> Font {
        self.font
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sends a raw instruction byte.
    pub fn send_command(&mut self, command: u8) -> LcdResult<()> {
        self.transport.send_instruction(command, false)
    }

    /// Writes a raw byte to DDRAM or CGRAM, whichever was addressed last.
    pub fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.transport.send_instruction(data, true)
    }

    /// Clears the display and moves the cursor home. Blocks until the controller is done.
    pub fn clear_display(&mut self) -> LcdResult<()> {
        self.send_command(instruction::CLEAR_DISPLAY)?;
        sleep(Self::CLEAR_DELAY);
        Ok(())
    }

    /// Moves the cursor home and undoes any display shift. Blocks until the controller is done.
    pub fn return_home(&mut self) -> LcdResult<()> {
        self.send_command(instruction::RETURN_HOME)?;
        sleep(Self::CLEAR_DELAY);
        Ok(())
    }

    /// Sets the direction the cursor moves after each character, and whether the display shifts
    /// along with it.
    pub fn set_entry_mode(&mut self, direction: CursorDirection, shift: bool) -> LcdResult<()> {
        let mut command = instruction::ENTRY_MODE_SET;
        if direction == CursorDirection::Right {
            command |= instruction::INCREMENT;
        }
        if shift {
            command |= instruction::SHIFT;
        }
        self.send_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    pub fn set_display_control(
        &mut self,
        display: bool,
        cursor: bool,
        blink: bool,
    ) -> LcdResult<()> {
        let mut command = instruction::DISPLAY_CONTROL;
        if display {
            command |= instruction::DISPLAY;
        }
        if cursor {
            command |= instruction::CURSOR;
        }
        if blink {
            command |= instruction::BLINK;
        }
        self.send_command(command)
    }

    /// Turns the display on with the cursor hidden.
    pub fn display_on(&mut self) -> LcdResult<()> {
        self.set_display_control(true, false, false)
    }

    /// Blanks the display. DDRAM is kept.
    pub fn display_off(&mut self) -> LcdResult<()> {
        self.set_display_control(false, false, false)
    }

    pub fn cursor_show(&mut self) -> LcdResult<()> {
        self.set_display_control(true, true, false)
    }

    pub fn cursor_hide(&mut self) -> LcdResult<()> {
        self.set_display_control(true, false, false)
    }

    /// Shows the cursor, blinking.
    pub fn cursor_blink_on(&mut self) -> LcdResult<()> {
        self.set_display_control(true, true, true)
    }

    /// Shows the cursor, steady.
    pub fn cursor_blink_off(&mut self) -> LcdResult<()> {
        self.set_display_control(true, true, false)
    }

    /// Moves the cursor or shifts the whole display by one cell.
    pub fn cursor_shift(
        &mut self,
        display_shift: bool,
        direction: CursorDirection,
    ) -> LcdResult<()> {
        let mut command = instruction::CURSOR_DISPLAY_SHIFT;
        command |= if display_shift {
            instruction::DISPLAY_SHIFT
        } else {
            instruction::CURSOR_MOVE
        };
        command |= match direction {
            CursorDirection::Right => instruction::SHIFT_RIGHT,
            CursorDirection::Left => instruction::SHIFT_LEFT,
        };
        self.send_command(command)
    }

    pub fn display_shift_left(&mut self) -> LcdResult<()> {
        self.cursor_shift(true, CursorDirection::Left)
    }

    pub fn display_shift_right(&mut self) -> LcdResult<()> {
        self.cursor_shift(true, CursorDirection::Right)
    }

    pub fn cursor_shift_left(&mut self) -> LcdResult<()> {
        self.cursor_shift(false, CursorDirection::Left)
    }

    pub fn cursor_shift_right(&mut self) -> LcdResult<()> {
        self.cursor_shift(false, CursorDirection::Right)
    }

    /// Moves the cursor to a cell, both zero-based.
    ///
    /// # Errors
    /// - `LcdError::CursorOutOfRange` if the cell is not on the display. Nothing is sent.
    pub fn set_cursor(&mut self, row: u8, column: u8) -> LcdResult<()> {
        let address = self.geometry.ddram_address(row, column)?;
        self.send_command(instruction::DDRAM_ADDRESS | address)
    }

    /// Writes the text form of `value` from the cursor on.
    ///
    /// Each character is sent as its code point; the controller advances the cursor by itself and
    /// nothing wraps between rows. Characters above U+00FF have no single-byte code and are
    /// replaced by `?`.
    pub fn print(&mut self, value: impl Display) -> LcdResult<()> {
        for c in value.to_string().chars() {
            let code = match u8::try_from(u32::from(c)) {
                Ok(code) => code,
                Err(_) => {
                    warn!("Unsupported character: {}", c);
                    b'?'
                }
            };
            self.send_data(code)?;
        }
        Ok(())
    }

    /// Stores a 5-pixel wide glyph in CGRAM slot 0 to 7.
    ///
    /// Each bitmap byte is one pixel row, top first, using its low 5 bits. Up to 8 rows are
    /// written; an empty bitmap only selects the slot. Afterwards data writes go to CGRAM, so move
    /// the cursor with [DisplayController::set_cursor] before printing again.
    ///
    /// # Errors
    /// - `LcdError::InvalidGlyphSlot` if `slot` is above 7.
    /// - `LcdError::InvalidBitmap` if `bitmap` has more than 8 rows.
    pub fn define_custom_glyph(&mut self, slot: u8, bitmap: &[u8]) -> LcdResult<()> {
        if slot >= Self::GLYPH_SLOTS {
            return Err(LcdError::InvalidGlyphSlot(slot));
        }
        if bitmap.len() > Self::GLYPH_ROWS {
            return Err(LcdError::InvalidBitmap(bitmap.len()));
        }

        self.send_command(instruction::CGRAM_ADDRESS | ((slot & 0x07) << 3))?;
        for &row in bitmap {
            self.send_data(row)?;
        }
        Ok(())
    }

    /// Writes the glyph stored in CGRAM `slot` at the cursor.
    pub fn write_glyph(&mut self, slot: u8) -> LcdResult<()> {
        if slot >= Self::GLYPH_SLOTS {
            return Err(LcdError::InvalidGlyphSlot(slot));
        }
        self.send_data(slot)
    }

    pub fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        self.transport.set_backlight(on)
    }

    /// Gives up the display and returns its transport.
    pub fn release(self) -> T {
        debug!("Releasing display");
        self.transport
    }
}

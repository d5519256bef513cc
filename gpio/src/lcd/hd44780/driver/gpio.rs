use crate::lcd::hd44780::driver::{DataWidth, HD44780Transport, LcdError, LcdResult};
use crate::{GpioError, GpioOutput, GpioResult};
use log::{debug, trace};
use std::thread::sleep;
use std::time::Duration;

/// HD44780 transport over dedicated GPIO output pins.
///
/// The pin list is ordered `[RS, RW, E, data...]`, with the data lines least significant first:
/// 7 pins give a 4-bit bus on D4–D7, 11 pins an 8-bit bus on D0–D7. Bit *k* of whatever is
/// presented on the bus drives data pin *k*.
#[derive(Debug)]
pub struct GpioHD44780Transport<'a> {
    pin_rs: &'a dyn GpioOutput,
    pin_rw: &'a dyn GpioOutput,
    pin_e: &'a dyn GpioOutput,
    data_pins: Vec<&'a dyn GpioOutput>,
    pin_backlight: Option<&'a dyn GpioOutput>,
    data_width: DataWidth,
}

impl<'a> GpioHD44780Transport<'a> {
    /// Pin list length for a 4-bit bus.
    pub const PINS_4BIT: usize = 7;
    /// Pin list length for an 8-bit bus.
    pub const PINS_8BIT: usize = 11;

    /// Minimum time the E pin is held at each level. The controller does not latch the bus
    /// without it.
    pub const ENABLE_HOLD: Duration = Duration::from_micros(40);

    /// Creates the transport, inferring the data width from the number of pins.
    ///
    /// # Errors
    /// - `LcdError::InvalidPinCount` unless `pins` holds 7 or 11 entries.
    pub fn new(pins: &[&'a dyn GpioOutput]) -> LcdResult<Self> {
        let data_width = match pins.len() {
            Self::PINS_4BIT => DataWidth::Four,
            Self::PINS_8BIT => DataWidth::Eight,
            n => return Err(LcdError::InvalidPinCount(n)),
        };

        debug!("GPIO transport with {:?}-bit data bus", data_width);

        Ok(GpioHD44780Transport {
            pin_rs: pins[0],
            pin_rw: pins[1],
            pin_e: pins[2],
            data_pins: pins[3..].to_vec(),
            pin_backlight: None,
            data_width,
        })
    }

    /// Attaches the pin switching the backlight. It is driven on its own, outside the bus.
    pub fn with_backlight(mut self, pin: &'a dyn GpioOutput) -> Self {
        self.pin_backlight = Some(pin);
        self
    }

    fn pulse_e(&self) -> GpioResult<()> {
        self.pin_e.write(false)?;
        sleep(Self::ENABLE_HOLD);
        self.pin_e.write(true)?;
        sleep(Self::ENABLE_HOLD);
        self.pin_e.write(false)?;
        Ok(())
    }

    fn set_control(&self, register_select: bool) -> GpioResult<()> {
        self.pin_rs.write(register_select)?;
        // Write-only driver
        self.pin_rw.write(false)?;
        Ok(())
    }

    /// Presents `value` on the data pins, bit *k* on pin *k*, and strobes it in.
    fn write_bus(&self, value: u8) -> GpioResult<()> {
        for (bit, pin) in self.data_pins.iter().enumerate() {
            pin.write((value >> bit) & 0x01 != 0)?;
        }
        self.pulse_e()
    }
}

impl HD44780Transport for GpioHD44780Transport<'_> {
    fn data_width(&self) -> DataWidth {
        self.data_width
    }

    fn send_instruction(&mut self, byte: u8, register_select: bool) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", byte, register_select);

        self.set_control(register_select)?;

        match self.data_width {
            DataWidth::Eight => self.write_bus(byte)?,
            DataWidth::Four => {
                let high_nibble = (byte >> 4) & 0x0F;
                let low_nibble = byte & 0x0F;
                trace!("Writing HN: {:04b}", high_nibble);
                self.write_bus(high_nibble)?;
                trace!("Writing LN: {:04b}", low_nibble);
                self.write_bus(low_nibble)?;
            }
        }

        Ok(())
    }

    fn send_nibble(&mut self, nibble: u8, register_select: bool) -> LcdResult<()> {
        match self.data_width {
            DataWidth::Eight => self.send_instruction((nibble & 0x0F) << 4, register_select),
            DataWidth::Four => {
                trace!("Sending nibble: {:04b}, RS: {}", nibble & 0x0F, register_select);
                self.set_control(register_select)?;
                self.write_bus(nibble & 0x0F)?;
                Ok(())
            }
        }
    }

    fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        let pin = self.pin_backlight.ok_or(GpioError::NotSupported)?;
        pin.write(on)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::driver::ErrorKind;
    use crate::mock::{BrokenOutput, MockOutput, PinLog, PinWrite};

    const NAMES: [&str; 12] = [
        "rs", "rw", "e", "d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7", "bl",
    ];

    fn outputs(log: &PinLog) -> Vec<MockOutput> {
        NAMES.iter().map(|&name| MockOutput::new(name, log)).collect()
    }

    /// Reassembles the values presented on the data pins at each rising edge of E.
    fn latched(writes: &[PinWrite], data_pins: &[&str]) -> Vec<u8> {
        let mut levels = vec![false; data_pins.len()];
        let mut values = Vec::new();
        for write in writes {
            if let Some(bit) = data_pins.iter().position(|&name| name == write.pin) {
                levels[bit] = write.level;
            } else if write.pin == "e" && write.level {
                let value = levels
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (bit, &high)| acc | ((high as u8) << bit));
                values.push(value);
            }
        }
        values
    }

    #[test]
    fn pin_count_selects_data_width() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let pins: Vec<&dyn GpioOutput> = outs.iter().map(|o| o as &dyn GpioOutput).collect();

        let four = GpioHD44780Transport::new(&pins[..7]).unwrap();
        assert_eq!(four.data_width(), DataWidth::Four);
        let eight = GpioHD44780Transport::new(&pins[..11]).unwrap();
        assert_eq!(eight.data_width(), DataWidth::Eight);
    }

    #[test]
    fn other_pin_counts_are_rejected() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let pins: Vec<&dyn GpioOutput> = outs.iter().map(|o| o as &dyn GpioOutput).collect();

        for count in [0, 3, 8, 10, 12] {
            let err = GpioHD44780Transport::new(&pins[..count]).unwrap_err();
            assert_eq!(err, LcdError::InvalidPinCount(count));
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn four_bit_bus_sends_high_nibble_then_low_nibble() {
        let log = PinLog::default();
        let outs = outputs(&log);
        // RS, RW, E followed by D4..D7
        let pins: Vec<&dyn GpioOutput> = [0, 1, 2, 7, 8, 9, 10]
            .iter()
            .map(|&i| &outs[i] as &dyn GpioOutput)
            .collect();
        let mut transport = GpioHD44780Transport::new(&pins).unwrap();

        transport.send_instruction(0xA5, true).unwrap();

        let writes = log.borrow();
        let nibbles = latched(&writes, &["d4", "d5", "d6", "d7"]);
        assert_eq!(nibbles, vec![0x0A, 0x05]);
        assert_eq!((nibbles[0] << 4) | nibbles[1], 0xA5);
        assert_eq!(writes[0].pin, "rs");
        assert!(writes[0].level);
        assert_eq!(writes[1].pin, "rw");
        assert!(!writes[1].level);
    }

    #[test]
    fn eight_bit_bus_sends_whole_byte_in_one_strobe() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let pins: Vec<&dyn GpioOutput> = outs[..11].iter().map(|o| o as &dyn GpioOutput).collect();
        let mut transport = GpioHD44780Transport::new(&pins).unwrap();

        transport.send_instruction(0x3C, false).unwrap();

        let writes = log.borrow();
        assert_eq!(latched(&writes, &NAMES[3..11]), vec![0x3C]);
        assert!(!writes[0].level);
    }

    #[test]
    fn nibble_splitting_is_lossless() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let pins: Vec<&dyn GpioOutput> = [0, 1, 2, 7, 8, 9, 10]
            .iter()
            .map(|&i| &outs[i] as &dyn GpioOutput)
            .collect();
        let mut transport = GpioHD44780Transport::new(&pins).unwrap();

        for byte in [0x00, 0x0F, 0xF0, 0x5A, 0x80, 0xFF] {
            log.borrow_mut().clear();
            transport.send_instruction(byte, false).unwrap();
            let nibbles = latched(&log.borrow(), &["d4", "d5", "d6", "d7"]);
            assert_eq!(nibbles, vec![(byte >> 4) & 0x0F, byte & 0x0F]);
        }
    }

    #[test]
    fn single_nibble_uses_one_strobe() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let pins: Vec<&dyn GpioOutput> = [0, 1, 2, 7, 8, 9, 10]
            .iter()
            .map(|&i| &outs[i] as &dyn GpioOutput)
            .collect();
        let mut transport = GpioHD44780Transport::new(&pins).unwrap();

        transport.send_nibble(0x03, false).unwrap();

        assert_eq!(latched(&log.borrow(), &["d4", "d5", "d6", "d7"]), vec![0x03]);
    }

    #[test]
    fn enable_pulse_holds_each_level() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let pins: Vec<&dyn GpioOutput> = outs[..11].iter().map(|o| o as &dyn GpioOutput).collect();
        let mut transport = GpioHD44780Transport::new(&pins).unwrap();

        transport.send_instruction(0x01, false).unwrap();

        let writes = log.borrow();
        let e: Vec<&PinWrite> = writes.iter().filter(|w| w.pin == "e").collect();
        assert_eq!(e.iter().map(|w| w.level).collect::<Vec<_>>(), vec![false, true, false]);
        assert!(e[1].at - e[0].at >= GpioHD44780Transport::ENABLE_HOLD);
        assert!(e[2].at - e[1].at >= GpioHD44780Transport::ENABLE_HOLD);
    }

    #[test]
    fn backlight_needs_a_dedicated_pin() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let pins: Vec<&dyn GpioOutput> = outs[..7].iter().map(|o| o as &dyn GpioOutput).collect();

        let mut bare = GpioHD44780Transport::new(&pins).unwrap();
        assert_eq!(
            bare.set_backlight(true),
            Err(LcdError::Transport(GpioError::NotSupported))
        );

        let mut lit = GpioHD44780Transport::new(&pins).unwrap().with_backlight(&outs[11]);
        lit.set_backlight(true).unwrap();
        let writes = log.borrow();
        assert_eq!(writes.len(), 1);
        assert_eq!((writes[0].pin, writes[0].level), ("bl", true));
    }

    #[test]
    fn pin_failures_surface_as_transport_errors() {
        let log = PinLog::default();
        let outs = outputs(&log);
        let broken = BrokenOutput;
        let mut pins: Vec<&dyn GpioOutput> =
            outs[..7].iter().map(|o| o as &dyn GpioOutput).collect();
        pins[2] = &broken;
        let mut transport = GpioHD44780Transport::new(&pins).unwrap();

        let err = transport.send_instruction(0x01, false).unwrap_err();
        assert_eq!(err, LcdError::Transport(GpioError::Io(std::io::ErrorKind::BrokenPipe)));
        assert_eq!(err.kind(), ErrorKind::Device);
    }
}

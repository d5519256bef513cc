//! Recording test doubles shared by the unit tests.
use crate::lcd::hd44780::driver::{DataWidth, HD44780Transport, LcdResult};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use crate::{GpioError, GpioOutput, GpioResult};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: &'static str,
    pub level: bool,
    pub at: Instant,
}

pub type PinLog = Rc<RefCell<Vec<PinWrite>>>;

/// Output pin that appends every write to a log shared with its siblings.
#[derive(Debug)]
pub struct MockOutput {
    pub name: &'static str,
    pub log: PinLog,
}

impl MockOutput {
    pub fn new(name: &'static str, log: &PinLog) -> Self {
        MockOutput { name, log: log.clone() }
    }
}

impl GpioOutput for MockOutput {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.log.borrow_mut().push(PinWrite {
            pin: self.name,
            level: value,
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Output pin that always fails.
#[derive(Debug)]
pub struct BrokenOutput;

impl GpioOutput for BrokenOutput {
    fn write(&self, _value: bool) -> GpioResult<()> {
        Err(GpioError::Io(std::io::ErrorKind::BrokenPipe))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cWrite {
    pub address: u8,
    pub bytes: Vec<u8>,
    pub at: Instant,
}

#[derive(Debug, Default)]
pub struct I2cState {
    pub present: Vec<u8>,
    /// Non-empty writes, in order.
    pub writes: Vec<I2cWrite>,
    /// Empty writes, as used to check for a device.
    pub presence_checks: usize,
    pub reads: usize,
    pub port: u8,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

impl I2cState {
    /// Every byte written so far, flattened in order.
    pub fn bytes(&self) -> Vec<u8> {
        self.writes.iter().flat_map(|write| write.bytes.iter().copied()).collect()
    }
}

/// I2C bus with a fixed set of present devices. Its state stays observable through
/// [MockI2cBus::state] while the bus itself is lent to a driver.
#[derive(Debug)]
pub struct MockI2cBus {
    state: Rc<RefCell<I2cState>>,
}

impl MockI2cBus {
    pub fn with_devices(present: &[u8]) -> Self {
        MockI2cBus {
            state: Rc::new(RefCell::new(I2cState {
                present: present.to_vec(),
                ..Default::default()
            })),
        }
    }

    pub fn state(&self) -> Rc<RefCell<I2cState>> {
        self.state.clone()
    }
}

impl ErrorType for MockI2cBus {
    type Error = ErrorKind;
}

impl I2c for MockI2cBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        let mut state = self.state.borrow_mut();
        let absent = !state.present.contains(&address);
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if state.fail_writes {
                        return Err(ErrorKind::Bus);
                    }
                    if bytes.is_empty() {
                        state.presence_checks += 1;
                    }
                    if absent {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }
                    if !bytes.is_empty() {
                        state.writes.push(I2cWrite {
                            address,
                            bytes: bytes.to_vec(),
                            at: Instant::now(),
                        });
                    }
                }
                Operation::Read(buffer) => {
                    if state.fail_reads {
                        return Err(ErrorKind::Bus);
                    }
                    if absent {
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }
                    state.reads += 1;
                    buffer.fill(state.port);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sent {
    Byte(u8, bool),
    Nibble(u8, bool),
    Backlight(bool),
}

pub type SentLog = Rc<RefCell<Vec<Sent>>>;

/// Transport that records what the controller asked it to send.
#[derive(Debug)]
pub struct RecordingTransport {
    pub width: DataWidth,
    pub log: SentLog,
}

impl RecordingTransport {
    pub fn new(width: DataWidth) -> Self {
        RecordingTransport {
            width,
            log: SentLog::default(),
        }
    }

    /// Only the full bytes, in order.
    pub fn bytes(log: &SentLog) -> Vec<(u8, bool)> {
        log.borrow()
            .iter()
            .filter_map(|sent| match *sent {
                Sent::Byte(byte, rs) => Some((byte, rs)),
                _ => None,
            })
            .collect()
    }
}

impl HD44780Transport for RecordingTransport {
    fn data_width(&self) -> DataWidth {
        self.width
    }

    fn send_instruction(&mut self, byte: u8, register_select: bool) -> LcdResult<()> {
        self.log.borrow_mut().push(Sent::Byte(byte, register_select));
        Ok(())
    }

    fn send_nibble(&mut self, nibble: u8, register_select: bool) -> LcdResult<()> {
        match self.width {
            DataWidth::Four => {
                self.log.borrow_mut().push(Sent::Nibble(nibble, register_select));
                Ok(())
            }
            DataWidth::Eight => self.send_instruction((nibble & 0x0F) << 4, register_select),
        }
    }

    fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        self.log.borrow_mut().push(Sent::Backlight(on));
        Ok(())
    }
}

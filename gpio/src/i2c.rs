//! I2C helpers on top of [embedded_hal::i2c::I2c].
//!
//! Drivers in this crate take their bus by value. Pass `&mut bus` to lend it, or an
//! `embedded_hal_bus::i2c::RefCellDevice` to share one bus between several devices. Callers that
//! share a bus serialize access themselves.
use crate::{GpioError, GpioResult};
use embedded_hal::i2c::{Error, ErrorKind, I2c};
use log::trace;

/// Lowest 7-bit address tried by [scan]. Addresses below are reserved.
pub const SCAN_FIRST_ADDRESS: u8 = 0x08;
/// Highest 7-bit address tried by [scan]. Addresses above are reserved.
pub const SCAN_LAST_ADDRESS: u8 = 0x77;

/// Maps a bus error of a transfer to `address` onto [GpioError].
pub fn bus_error(address: u8, err: impl Error) -> GpioError {
    match err.kind() {
        ErrorKind::NoAcknowledge(_) => GpioError::Nack(address),
        kind => GpioError::Bus(kind),
    }
}

/// Returns every address that acknowledged an empty write, in ascending order.
///
/// # Errors
/// - `GpioError::Bus` if a write failed for any reason other than a missing acknowledge.
pub fn scan<B: I2c>(bus: &mut B) -> GpioResult<Vec<u8>> {
    let mut found = Vec::new();
    for address in SCAN_FIRST_ADDRESS..=SCAN_LAST_ADDRESS {
        match bus.write(address, &[]).map_err(|err| bus_error(address, err)) {
            Ok(()) => found.push(address),
            Err(GpioError::Nack(_)) => {}
            Err(err) => return Err(err),
        }
    }
    trace!("I2C scan: {:02x?}", found);
    Ok(found)
}

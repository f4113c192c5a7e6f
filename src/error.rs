//! Errors that can occur when using the INA219 device.
//!
//! This module provides an error type that encapsulates all possible errors
//! that can occur during communication with the INA219. It is generic over
//! the underlying I2C bus error type.

use crate::calibration::CalibrationError;
use crate::register::InvalidRegisterField;

/// This represents all possible errors that can occur when using the INA219
/// device.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ina219Error<BusError> {
    /// An error has occurred in the I2C driver
    Bus(BusError),

    /// A custom calibration was requested with inputs the engine rejects.
    ///
    /// Raised before any register write, so the device state is unchanged.
    Calibration(CalibrationError),

    /// A current or power value was requested before any calibration routine
    /// has run, so the driver holds no scale factors to convert with.
    NotCalibrated,

    /// Reading from a register returned unexpected data. This should not happen in normal circumstances.
    ///
    /// Could possibly indicate a bug in the driver, or less likely, a faulty chip or interference.
    UnexpectedRegisterData(InvalidRegisterField),
}

impl<BusError> From<CalibrationError> for Ina219Error<BusError> {
    fn from(e: CalibrationError) -> Self {
        Ina219Error::Calibration(e)
    }
}

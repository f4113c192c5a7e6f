//! Async driver for the Texas Instruments INA219 high-side current, voltage
//! and power monitor, over I2C via `embedded-hal-async`.
//!
//! The chip measures the voltage across an external shunt resistor and the
//! bus voltage, and multiplies them into current and power using a
//! calibration word this driver derives for you - either from one of three
//! fixed presets for the stock 0.1 Ω shunt, or from arbitrary
//! shunt/voltage/current targets via [`calibration::Calibration::custom`].
//!
//! ```rust,no_run
//! # use embedded_hal_async::delay::DelayNs;
//! # use embedded_hal_async::i2c::I2c;
//! # use ina219_rs::{Ina219, Ina219Result, DEFAULT_ADDRESS};
//! # async fn demo<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Ina219Result<(), I::Error> {
//! let mut device = Ina219::new_i2c(i2c, DEFAULT_ADDRESS, delay);
//! device.calibrate_32v_2a().await?;
//!
//! let volts = device.bus_voltage().await?;
//! let milliamps = device.current_ma().await?;
//! let milliwatts = device.power_mw().await?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod calibration;
pub mod error;
pub mod ina219;
pub mod register;
pub mod testing;

pub use crate::calibration::{Calibration, CalibrationError, CalibrationParams, TraceEvent};
pub use crate::error::Ina219Error;
pub use crate::ina219::{
    address_for_pins, AddressPin, Ina219, Ina219I2c, Ina219Result, DEFAULT_ADDRESS,
};

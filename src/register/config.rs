//! ### CONFIG - operating configuration (`0x00`, 16 bits, R/W)
//!
//! Holds the bus voltage range, shunt PGA gain, the two ADC
//! resolution/averaging fields and the operating mode.
//!
//! ### Default value
//! 0x399F (32 V range, gain ×8, 12-bit conversions, continuous shunt and bus)
//!
//! ### Examples
//! ```rust,no_run
//! # use crate::ina219_rs::{Ina219, Ina219Result};
//! # use crate::ina219_rs::bus::Bus;
//! # async fn demo<B: Bus>(mut device: Ina219<B>)
//! #     -> Ina219Result<(), B::Error> {
//! use ina219_rs::register::config::{AdcResolution, Config};
//!
//! // Print the current shunt ADC setting
//! let fields = device.read::<Config>().await?;
//!
//! // Switch the shunt ADC to 128-sample averaging, leaving the rest untouched
//! let mut fields = fields;
//! fields.shunt_resolution = AdcResolution::Samples128;
//! device.write::<Config>(&fields).await?;
//! # Ok(()) }
//! ```

use crate::register::{InvalidRegisterField, Readable, Reg, UnexpectedValue, Writable};

/// Marker type for the CONFIG (0x00) register
pub struct Config;
impl Reg for Config { const ADDR: u8 = 0x00; }

const BRNG_OFFSET: u16 = 13;
const PG_OFFSET: u16 = 11;
const BADC_OFFSET: u16 = 7;
const SADC_OFFSET: u16 = 3;

/// The payload for the CONFIG (0x00) register.
///
/// One field per chip bit-field; [`Config::encode`] packs them into the
/// 16-bit word and [`Config::decode`] unpacks it again, which is what the
/// read-modify-write sampling adjustments rely on. The RST bit (15) is not
/// represented and always written as zero.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigFields {
    pub bus_voltage_range: BusVoltageRange,
    pub gain: Gain,
    pub bus_resolution: AdcResolution,
    pub shunt_resolution: AdcResolution,
    pub mode: OperatingMode,
}

impl Readable for Config {
    type Out = ConfigFields;

    fn decode(b: &[u8]) -> Result<Self::Out, InvalidRegisterField> {
        let v = u16::from_be_bytes([b[0], b[1]]);
        Ok(ConfigFields {
            bus_voltage_range: BusVoltageRange::from(((v >> BRNG_OFFSET) & 0b1) as u8),
            gain: Gain::from(((v >> PG_OFFSET) & 0b11) as u8),
            bus_resolution: AdcResolution::try_from(((v >> BADC_OFFSET) & 0b1111) as u8)
                .map_err(|e| InvalidRegisterField::new(Self::ADDR, e.0 as u16, BADC_OFFSET as u8))?,
            shunt_resolution: AdcResolution::try_from(((v >> SADC_OFFSET) & 0b1111) as u8)
                .map_err(|e| InvalidRegisterField::new(Self::ADDR, e.0 as u16, SADC_OFFSET as u8))?,
            mode: OperatingMode::from((v & 0b111) as u8),
        })
    }
}

impl Writable for Config {
    type In = ConfigFields;

    fn encode(v: &Self::In, out: &mut [u8]) {
        let range: u8 = v.bus_voltage_range.into();
        let gain: u8 = v.gain.into();
        let badc: u8 = v.bus_resolution.into();
        let sadc: u8 = v.shunt_resolution.into();
        let mode: u8 = v.mode.into();

        let word = ((range as u16) << BRNG_OFFSET)
            | ((gain as u16) << PG_OFFSET)
            | ((badc as u16) << BADC_OFFSET)
            | ((sadc as u16) << SADC_OFFSET)
            | mode as u16;

        out[..2].copy_from_slice(&word.to_be_bytes());
    }
}

/// Bus voltage full-scale range (BRNG, bit 13).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusVoltageRange {
    /// 16 V full scale
    Range16v,
    /// 32 V full scale. This is the chip default.
    Range32v,
}

impl From<u8> for BusVoltageRange {
    fn from(field: u8) -> Self {
        match field {
            0 => BusVoltageRange::Range16v,
            _ => BusVoltageRange::Range32v,
        }
    }
}

impl Into<u8> for BusVoltageRange {
    fn into(self) -> u8 {
        match self {
            BusVoltageRange::Range16v => 0,
            BusVoltageRange::Range32v => 1,
        }
    }
}

/// Shunt PGA gain and range (PG, bits 12:11).
///
/// The gain divides the shunt ADC input, so each step doubles the
/// measurable shunt voltage range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// Gain ×1, ±40 mV shunt range
    X1,
    /// Gain ×2, ±80 mV shunt range
    X2,
    /// Gain ×4, ±160 mV shunt range
    X4,
    /// Gain ×8, ±320 mV shunt range. This is the chip default.
    X8,
}

impl From<u8> for Gain {
    fn from(field: u8) -> Self {
        match field {
            0b00 => Gain::X1,
            0b01 => Gain::X2,
            0b10 => Gain::X4,
            _ => Gain::X8,
        }
    }
}

impl Into<u8> for Gain {
    fn into(self) -> u8 {
        match self {
            Gain::X1 => 0b00,
            Gain::X2 => 0b01,
            Gain::X4 => 0b10,
            Gain::X8 => 0b11,
        }
    }
}

/// ADC resolution / averaging (BADC bits 10:7, SADC bits 6:3).
///
/// The low codes select a single conversion at 9 to 12 bits; the high codes
/// keep 12-bit resolution and average 1 to 128 samples. Codes
/// `0b0100..=0b0111` are unused on the chip and rejected by the decoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcResolution {
    /// 9-bit single conversion, 84 µs
    Bits9       = 0b0000,
    /// 10-bit single conversion, 148 µs
    Bits10      = 0b0001,
    /// 11-bit single conversion, 276 µs
    Bits11      = 0b0010,
    /// 12-bit single conversion, 532 µs. This is the chip default.
    Bits12      = 0b0011,
    /// 12-bit, 1 sample (same conversion time as [`AdcResolution::Bits12`])
    Samples1    = 0b1000,
    /// 12-bit average of 2 samples, 1.06 ms
    Samples2    = 0b1001,
    /// 12-bit average of 4 samples, 2.13 ms
    Samples4    = 0b1010,
    /// 12-bit average of 8 samples, 4.26 ms
    Samples8    = 0b1011,
    /// 12-bit average of 16 samples, 8.51 ms
    Samples16   = 0b1100,
    /// 12-bit average of 32 samples, 17.02 ms
    Samples32   = 0b1101,
    /// 12-bit average of 64 samples, 34.05 ms
    Samples64   = 0b1110,
    /// 12-bit average of 128 samples, 68.10 ms
    Samples128  = 0b1111,
}

impl TryFrom<u8> for AdcResolution {
    type Error = UnexpectedValue;

    fn try_from(field: u8) -> Result<Self, Self::Error> {
        match field {
            0b0000 => Ok(AdcResolution::Bits9),
            0b0001 => Ok(AdcResolution::Bits10),
            0b0010 => Ok(AdcResolution::Bits11),
            0b0011 => Ok(AdcResolution::Bits12),
            0b1000 => Ok(AdcResolution::Samples1),
            0b1001 => Ok(AdcResolution::Samples2),
            0b1010 => Ok(AdcResolution::Samples4),
            0b1011 => Ok(AdcResolution::Samples8),
            0b1100 => Ok(AdcResolution::Samples16),
            0b1101 => Ok(AdcResolution::Samples32),
            0b1110 => Ok(AdcResolution::Samples64),
            0b1111 => Ok(AdcResolution::Samples128),
            other => Err(UnexpectedValue(other)),
        }
    }
}

impl Into<u8> for AdcResolution {
    fn into(self) -> u8 {
        self as u8
    }
}

/// Operating mode (MODE, bits 2:0).
///
/// This driver always writes [`OperatingMode::ShuntAndBusContinuous`], but
/// the decoder accepts the full table so read-modify-write cycles preserve
/// whatever the register holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    PowerDown               = 0b000,
    ShuntTriggered          = 0b001,
    BusTriggered            = 0b010,
    ShuntAndBusTriggered    = 0b011,
    AdcOff                  = 0b100,
    ShuntContinuous         = 0b101,
    BusContinuous           = 0b110,
    /// Continuous shunt and bus conversions. This is the chip default.
    ShuntAndBusContinuous   = 0b111,
}

impl From<u8> for OperatingMode {
    fn from(field: u8) -> Self {
        match field {
            0b000 => OperatingMode::PowerDown,
            0b001 => OperatingMode::ShuntTriggered,
            0b010 => OperatingMode::BusTriggered,
            0b011 => OperatingMode::ShuntAndBusTriggered,
            0b100 => OperatingMode::AdcOff,
            0b101 => OperatingMode::ShuntContinuous,
            0b110 => OperatingMode::BusContinuous,
            _ => OperatingMode::ShuntAndBusContinuous,
        }
    }
}

impl Into<u8> for OperatingMode {
    fn into(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_decode() {
        // Chip power-on default
        let reg = Config::decode(&[0x39, 0x9F]).unwrap();
        assert_eq!(BusVoltageRange::Range32v, reg.bus_voltage_range);
        assert_eq!(Gain::X8, reg.gain);
        assert_eq!(AdcResolution::Bits12, reg.bus_resolution);
        assert_eq!(AdcResolution::Bits12, reg.shunt_resolution);
        assert_eq!(OperatingMode::ShuntAndBusContinuous, reg.mode);

        let reg = Config::decode(&[0x01, 0x9F]).unwrap();
        assert_eq!(BusVoltageRange::Range16v, reg.bus_voltage_range);
        assert_eq!(Gain::X1, reg.gain);

        // SADC = 0b1111 (128-sample averaging)
        let reg = Config::decode(&[0x39, 0xFF]).unwrap();
        assert_eq!(AdcResolution::Samples128, reg.shunt_resolution);
        assert_eq!(AdcResolution::Bits12, reg.bus_resolution);

        // BADC = 0b1111
        let reg = Config::decode(&[0x3F, 0x9F]).unwrap();
        assert_eq!(AdcResolution::Samples128, reg.bus_resolution);
        assert_eq!(AdcResolution::Bits12, reg.shunt_resolution);
    }

    #[test]
    fn config_decode_rejects_reserved_adc_code() {
        // SADC = 0b0100
        let err = Config::decode(&[0x39, 0xA7]).unwrap_err();
        assert_eq!(Config::ADDR, err.register);
        assert_eq!(SADC_OFFSET as u8, err.bit_offset);
    }

    #[test]
    fn config_encode() {
        let mut buffer = [0u8; 2];
        Config::encode(&ConfigFields {
            bus_voltage_range: BusVoltageRange::Range32v,
            gain: Gain::X8,
            bus_resolution: AdcResolution::Bits12,
            shunt_resolution: AdcResolution::Bits12,
            mode: OperatingMode::ShuntAndBusContinuous,
        }, &mut buffer);
        assert_eq!([0x39, 0x9F], buffer);

        Config::encode(&ConfigFields {
            bus_voltage_range: BusVoltageRange::Range16v,
            gain: Gain::X1,
            bus_resolution: AdcResolution::Bits12,
            shunt_resolution: AdcResolution::Bits12,
            mode: OperatingMode::ShuntAndBusContinuous,
        }, &mut buffer);
        assert_eq!([0x01, 0x9F], buffer);

        Config::encode(&ConfigFields {
            bus_voltage_range: BusVoltageRange::Range32v,
            gain: Gain::X8,
            bus_resolution: AdcResolution::Bits12,
            shunt_resolution: AdcResolution::Samples128,
            mode: OperatingMode::ShuntAndBusContinuous,
        }, &mut buffer);
        assert_eq!([0x39, 0xFF], buffer);
    }

    #[test]
    fn config_roundtrip() {
        let fields = ConfigFields {
            bus_voltage_range: BusVoltageRange::Range16v,
            gain: Gain::X4,
            bus_resolution: AdcResolution::Samples64,
            shunt_resolution: AdcResolution::Bits10,
            mode: OperatingMode::ShuntTriggered,
        };

        let mut buffer = [0u8; 2];
        Config::encode(&fields, &mut buffer);
        assert_eq!(fields, Config::decode(&buffer).unwrap());
    }
}

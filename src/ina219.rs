use crate::bus::{Bus, I2c};
use crate::calibration::{Calibration, CalibrationParams, TraceEvent};
use crate::error::Ina219Error;
use crate::register::bus_voltage::{BusVoltage, BusVoltageData};
use crate::register::calibration::CalValue;
use crate::register::config::{AdcResolution, Config, ConfigFields, OperatingMode};
use crate::register::current::Current;
use crate::register::power::Power;
use crate::register::shunt_voltage::ShuntVoltage;
use crate::register::{Readable, Writable};
use embedded_hal::i2c::SevenBitAddress;
use embedded_hal_async::delay::DelayNs;

/// Type alias for an Ina219 chip communicating over I2C
pub type Ina219I2c<T, D> = Ina219<I2c<T, D>>;

/// Bus address with both address pins strapped to ground.
pub const DEFAULT_ADDRESS: SevenBitAddress = 0x40;

/// Max 12-bit 128-sample conversion time in milliseconds.
const AVERAGING_SETTLE_MS: u32 = 69;

/// Type alias used to simplify return types throughout the driver
pub type Ina219Result<T, BusError> = Result<T, Ina219Error<BusError>>;

/// Main Ina219 driver struct
///
/// Wraps a [`Bus`] and the most recently applied [`Calibration`]. Current
/// and power conversions are refused with [`Ina219Error::NotCalibrated`]
/// until one of the calibrate methods has run.
pub struct Ina219<B> {
    bus: B,
    calibration: Option<Calibration>,
}

/// What an INA219 address pin is strapped to. A1 and A0 each select two bits
/// of the 7-bit bus address, giving 16 addresses from 0x40 to 0x4F.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressPin {
    /// Pin tied to GND
    Gnd,
    /// Pin tied to VS+
    Vs,
    /// Pin tied to the SDA line
    Sda,
    /// Pin tied to the SCL line
    Scl,
}

impl AddressPin {
    fn code(self) -> u8 {
        match self {
            AddressPin::Gnd => 0b00,
            AddressPin::Vs => 0b01,
            AddressPin::Sda => 0b10,
            AddressPin::Scl => 0b11,
        }
    }
}

/// Returns the 7-bit bus address selected by the A1/A0 pin strapping.
///
/// Both pins to GND gives [`DEFAULT_ADDRESS`].
pub fn address_for_pins(a1: AddressPin, a0: AddressPin) -> SevenBitAddress {
    0x40 | (a1.code() << 2) | a0.code()
}

impl<T, D> Ina219I2c<T, D>
where
    T: embedded_hal_async::i2c::I2c,
    D: DelayNs,
{
    /// Constructs a new Ina219 driver instance that communicates over I2C.
    ///
    /// The address is fixed for the lifetime of the handle; construct a new
    /// one to talk to a different chip. `delay` is used to respect the
    /// chip's conversion latency on register reads.
    ///
    /// No bus traffic happens here. The chip powers up with its calibration
    /// register zeroed, so call one of the calibrate methods before reading
    /// current or power.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use embedded_hal_async::delay::DelayNs;
    /// # use embedded_hal_async::i2c::I2c;
    /// # use ina219_rs::{Ina219, Ina219Result, DEFAULT_ADDRESS};
    /// # async fn demo<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Ina219Result<(), I::Error> {
    /// let mut device = Ina219::new_i2c(i2c, DEFAULT_ADDRESS, delay);
    ///
    /// device.calibrate_32v_2a().await?;
    /// let milliamps = device.current_ma().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_i2c(i2c: T, address: SevenBitAddress, delay: D) -> Self {
        Ina219::new(I2c::new(i2c, address, delay))
    }
}

impl<B> Ina219<B>
where
    B: Bus,
{
    /// Creates a new driver instance on an already-constructed [`Bus`].
    pub fn new(bus: B) -> Self {
        Ina219 {
            bus,
            calibration: None,
        }
    }

    /// Consumes the driver and hands back the underlying bus.
    pub fn release(self) -> B {
        self.bus
    }

    /// The most recently applied calibration, if any.
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Read a register using a **typed marker**.
    ///
    /// You pass a marker type from [`crate::register`] (e.g.
    /// `register::config::Config`) and get back its decoded value
    /// (`R::Out`). The transfer length and address come from `R::N` and
    /// `R::ADDR`; bytes are decoded by `R::decode(...)`.
    ///
    /// For most users the convenience methods (e.g.
    /// [`bus_voltage`](Self::bus_voltage)) are easier to discover and have
    /// concrete return types. This generic is here when you want full
    /// control.
    pub async fn read<R: Readable>(&mut self) -> Ina219Result<R::Out, B::Error> {
        self.bus.read::<R>().await
    }

    /// Write a register using a **typed marker**.
    ///
    /// You pass a marker type from [`crate::register`] and a value of its
    /// input type (`W::In`). This performs a **direct write** of the
    /// provided fields; if you need to preserve unrelated bits, prefer a
    /// read-modify-write: read the struct, change the fields you care
    /// about, then write it back.
    pub async fn write<W: Writable>(&mut self, v: &W::In) -> Ina219Result<(), B::Error> {
        self.bus.write::<W>(v).await
    }

    /// Calibrates for up to 32 V and 2 A across the stock 0.1 Ω shunt
    /// (0.1 mA / 2 mW per count). See [`Calibration::range_32v_2a`].
    pub async fn calibrate_32v_2a(&mut self) -> Ina219Result<(), B::Error> {
        self.apply_calibration(&Calibration::range_32v_2a()).await
    }

    /// Calibrates for up to 32 V and 1 A across the stock 0.1 Ω shunt
    /// (0.04 mA / 0.8 mW per count). See [`Calibration::range_32v_1a`].
    pub async fn calibrate_32v_1a(&mut self) -> Ina219Result<(), B::Error> {
        self.apply_calibration(&Calibration::range_32v_1a()).await
    }

    /// Calibrates for up to 16 V and 400 mA across the stock 0.1 Ω shunt
    /// (0.05 mA / 1 mW per count). See [`Calibration::range_16v_400ma`].
    pub async fn calibrate_16v_400ma(&mut self) -> Ina219Result<(), B::Error> {
        self.apply_calibration(&Calibration::range_16v_400ma()).await
    }

    /// Derives a calibration from user-defined shunt/voltage/current targets
    /// and applies it. Use this when the board does not carry the stock
    /// 0.1 Ω shunt.
    ///
    /// Invalid inputs are rejected before any register write, so the device
    /// state is unchanged on error.
    pub async fn calibrate_custom(
        &mut self,
        params: &CalibrationParams,
    ) -> Ina219Result<(), B::Error> {
        let calibration = Calibration::custom(params)?;
        self.apply_calibration(&calibration).await
    }

    /// Like [`calibrate_custom`](Self::calibrate_custom), reporting every
    /// derivation checkpoint to `trace`.
    pub async fn calibrate_custom_traced(
        &mut self,
        params: &CalibrationParams,
        trace: &mut dyn FnMut(TraceEvent),
    ) -> Ina219Result<(), B::Error> {
        let calibration = Calibration::custom_traced(params, trace)?;
        self.apply_calibration(&calibration).await
    }

    /// Writes a calibration to the device: first the CALIBRATION register,
    /// then the CONFIG word (the calibration's voltage range and gain,
    /// 12-bit conversions on both ADCs, continuous shunt-and-bus mode).
    ///
    /// There is no rollback: if the CONFIG write fails, the calibration
    /// register keeps the value already written, and the driver stays
    /// unconfigured.
    pub async fn apply_calibration(
        &mut self,
        calibration: &Calibration,
    ) -> Ina219Result<(), B::Error> {
        self.bus.write::<CalValue>(&calibration.value()).await?;

        self.bus
            .write::<Config>(&ConfigFields {
                bus_voltage_range: calibration.bus_voltage_range(),
                gain: calibration.gain(),
                bus_resolution: AdcResolution::Bits12,
                shunt_resolution: AdcResolution::Bits12,
                mode: OperatingMode::ShuntAndBusContinuous,
            })
            .await?;

        self.calibration = Some(*calibration);

        Ok(())
    }

    /// Returns the raw shunt voltage reading, signed, at 10 µV per count.
    pub async fn shunt_voltage_raw(&mut self) -> Ina219Result<i16, B::Error> {
        self.bus.read::<ShuntVoltage>().await
    }

    /// Returns the bus voltage in millivolts, with the flag bits stripped.
    pub async fn bus_voltage_raw(&mut self) -> Ina219Result<i16, B::Error> {
        Ok(self.bus.read::<BusVoltage>().await?.millivolts())
    }

    /// Returns the full decoded BUS_VOLTAGE register, including the
    /// conversion-ready and overflow flags.
    pub async fn bus_voltage_reading(&mut self) -> Ina219Result<BusVoltageData, B::Error> {
        self.bus.read::<BusVoltage>().await
    }

    /// Returns the raw current reading, signed, scaled by the calibration's
    /// current LSB.
    ///
    /// A sharp load transient can brown the chip out and zero its
    /// calibration register, which silently zeroes CURRENT and POWER. This
    /// method re-writes the stored calibration value before every read to
    /// guard against that, at the cost of one extra bus write.
    pub async fn current_raw(&mut self) -> Ina219Result<i16, B::Error> {
        let calibration = self.calibration.ok_or(Ina219Error::NotCalibrated)?;

        self.bus.write::<CalValue>(&calibration.value()).await?;
        self.bus.read::<Current>().await
    }

    /// Returns the raw power reading, signed, scaled by the calibration's
    /// power LSB.
    pub async fn power_raw(&mut self) -> Ina219Result<i16, B::Error> {
        self.bus.read::<Power>().await
    }

    /// Returns the bus voltage in volts.
    pub async fn bus_voltage(&mut self) -> Ina219Result<f32, B::Error> {
        Ok(self.bus_voltage_raw().await? as f32 * 0.001)
    }

    /// Returns the shunt voltage in millivolts.
    pub async fn shunt_voltage_mv(&mut self) -> Ina219Result<f32, B::Error> {
        Ok(self.shunt_voltage_raw().await? as f32 * 0.01)
    }

    /// Returns the current in milliamps, using the active calibration's
    /// current LSB. Includes the calibration re-assert described in
    /// [`current_raw`](Self::current_raw).
    pub async fn current_ma(&mut self) -> Ina219Result<f32, B::Error> {
        let lsb = self
            .calibration
            .ok_or(Ina219Error::NotCalibrated)?
            .current_lsb_ma();

        Ok(self.current_raw().await? as f32 * lsb)
    }

    /// Returns the power in milliwatts, using the active calibration's
    /// power LSB.
    pub async fn power_mw(&mut self) -> Ina219Result<f32, B::Error> {
        let lsb = self
            .calibration
            .ok_or(Ina219Error::NotCalibrated)?
            .power_lsb_mw();

        Ok(self.power_raw().await? as f32 * lsb)
    }

    /// Returns the decoded CONFIG (0x00) register.
    pub async fn configuration(&mut self) -> Ina219Result<ConfigFields, B::Error> {
        self.bus.read::<Config>().await
    }

    /// Writes the CONFIG (0x00) register.
    pub async fn set_configuration(&mut self, fields: &ConfigFields) -> Ina219Result<(), B::Error> {
        self.bus.write::<Config>(fields).await
    }

    /// Switches the shunt ADC to single 12-bit conversions, so current
    /// readings come from individual samples. Only the shunt resolution
    /// field of the config register is changed.
    pub async fn set_current_instant(&mut self) -> Ina219Result<(), B::Error> {
        let mut fields = self.bus.read::<Config>().await?;
        fields.shunt_resolution = AdcResolution::Bits12;
        self.bus.write::<Config>(&fields).await
    }

    /// Switches the shunt ADC to averaging 128 samples, so current readings
    /// come from a 69 ms rolling window. Only the shunt resolution field of
    /// the config register is changed.
    ///
    /// Waits out the first full averaging window before returning. Readings
    /// taken earlier would not be wrong, just averaged over fewer samples.
    pub async fn set_current_averaged<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Ina219Result<(), B::Error> {
        let mut fields = self.bus.read::<Config>().await?;
        fields.shunt_resolution = AdcResolution::Samples128;
        self.bus.write::<Config>(&fields).await?;

        delay.delay_ms(AVERAGING_SETTLE_MS).await;

        Ok(())
    }

    /// Switches the bus ADC to single 12-bit conversions. Only the bus
    /// resolution field of the config register is changed.
    pub async fn set_bus_voltage_instant(&mut self) -> Ina219Result<(), B::Error> {
        let mut fields = self.bus.read::<Config>().await?;
        fields.bus_resolution = AdcResolution::Bits12;
        self.bus.write::<Config>(&fields).await
    }

    /// Switches the bus ADC to averaging 128 samples. Only the bus
    /// resolution field of the config register is changed.
    ///
    /// Waits out the first full averaging window before returning, like
    /// [`set_current_averaged`](Self::set_current_averaged).
    pub async fn set_bus_voltage_averaged<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Ina219Result<(), B::Error> {
        let mut fields = self.bus.read::<Config>().await?;
        fields.bus_resolution = AdcResolution::Samples128;
        self.bus.write::<Config>(&fields).await?;

        delay.delay_ms(AVERAGING_SETTLE_MS).await;

        Ok(())
    }
}
